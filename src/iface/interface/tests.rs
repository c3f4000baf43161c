use std::vec::Vec as StdVec;

use super::*;
use crate::iface::rpl::AttachState;
use crate::iface::NeighborState;
use crate::phy::{DataRequest, FatalError, RcpBus, RxInd, TxStatus};
use crate::time::{Duration, Instant};
use crate::wire::{
    AddressRegistration, AroStatus, Eui64, Icmpv6Packet, Icmpv6Repr, IpProtocol, Ipv6Address,
    Ipv6Packet, Ipv6Repr, NdiscNeighborFlags, NdiscRepr, RplInstanceId, RplModeOfOperation,
    RplOptionRepr, RplRepr,
};

pub(crate) const OUR_EUI64: Eui64 = Eui64([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x01]);
pub(crate) const CHILD_EUI64: Eui64 = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
pub(crate) const PARENT_EUI64: Eui64 = Eui64([0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a]);

pub(crate) fn parent_ll_addr() -> Ipv6Address {
    PARENT_EUI64.link_local_address()
}

/// An in-memory RCP bus capturing every data request.
#[derive(Debug, Default)]
pub(crate) struct MockRcp {
    pub tx: StdVec<(u8, Option<Eui64>, StdVec<u8>)>,
}

impl RcpBus for MockRcp {
    fn data_tx(&mut self, request: &DataRequest) -> Result<(), FatalError> {
        self.tx
            .push((request.handle, request.dst, request.frame.to_vec()));
        Ok(())
    }

    fn set_sec_key(&mut self, _index: u8, _gak: &[u8; 16], _frame_counter: u32) {}
    fn set_radio(&mut self, _config_index: u8) {}
    fn set_fhss_uc(&mut self, _dwell_ms: u8, _chan_mask: &[u8]) {}
    fn set_fhss_async(&mut self, _dwell_ms: u16, _chan_mask: &[u8]) {}
    fn radio_enable(&mut self) {}
    fn reset(&mut self) {}
}

pub(crate) fn create() -> Interface<'static> {
    let mut config = Config::new(OUR_EUI64);
    config.pan_id = 0x0fab;
    config.random_seed = 0x1234_5678;
    Interface::new(config, vec![None; 16], Instant::ZERO)
}

/// Frame an ICMPv6 message into an IPv6 packet as the RCP would hand
/// it up.
pub(crate) fn build_frame(ip_repr: Ipv6Repr, icmp: &Icmpv6Repr) -> StdVec<u8> {
    let mut bytes = vec![0u8; ip_repr.buffer_len() + icmp.buffer_len()];
    let mut ipv6 = Ipv6Packet::new_unchecked(&mut bytes[..]);
    ip_repr.emit(&mut ipv6);
    let mut packet = Icmpv6Packet::new_unchecked(&mut bytes[ip_repr.buffer_len()..]);
    icmp.emit(&ip_repr.src_addr, &ip_repr.dst_addr, &mut packet);
    bytes
}

pub(crate) fn inject(
    iface: &mut Interface<'_>,
    now: Instant,
    src: Eui64,
    multicast: bool,
    frame: &[u8],
) {
    iface.rx_ind(
        now,
        &RxInd {
            frame,
            src,
            security_ok: true,
            multicast,
            lqi: 255,
            rssi_dbm: -40,
            timestamp_us: now.total_micros() as u64,
        },
    );
}

/// Drain the egress queue and return the decoded ICMPv6 messages,
/// asserting on basic IPv6 well-formedness.
pub(crate) fn drain(iface: &mut Interface<'_>) -> StdVec<(Ipv6Repr, StdVec<u8>)> {
    let mut rcp = MockRcp::default();
    iface.dispatch(&mut rcp).unwrap();
    rcp.tx
        .into_iter()
        .map(|(_, _, frame)| {
            let packet = Ipv6Packet::new_checked(&frame[..]).unwrap();
            let repr = Ipv6Repr::parse(&packet).unwrap();
            (repr, packet.payload().to_vec())
        })
        .collect()
}

fn parse_icmp<'f>(ip_repr: &Ipv6Repr, payload: &'f [u8]) -> Icmpv6Repr<'f> {
    let packet = Icmpv6Packet::new_unchecked(payload);
    Icmpv6Repr::parse(&ip_repr.src_addr, &ip_repr.dst_addr, &packet).unwrap()
}

fn ns_with_earo(src: Ipv6Address, target: Ipv6Address) -> StdVec<u8> {
    let icmp = Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
        target_addr: target,
        lladdr: None,
        registration: Some(AddressRegistration::new(AroStatus::Success, 3600, CHILD_EUI64)),
    });
    build_frame(
        Ipv6Repr {
            src_addr: src,
            dst_addr: target.solicited_node(),
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    )
}

pub(crate) fn dio_from_parent() -> StdVec<u8> {
    let mut options = heapless::Vec::new();
    options
        .push(RplOptionRepr::DodagConfiguration {
            authentication_enabled: false,
            path_control_size: 0,
            dio_interval_doublings: 2,
            dio_interval_min: 15,
            dio_redundancy_constant: 0,
            max_rank_increase: 0,
            minimum_hop_rank_increase: 128,
            objective_code_point: 0,
            default_lifetime: 60,
            lifetime_unit: 60,
        })
        .unwrap();
    let icmp = Icmpv6Repr::Rpl(RplRepr::DodagInformationObject {
        rpl_instance_id: RplInstanceId::Global(0x1e),
        version_number: 1,
        rank: 256,
        grounded: true,
        mode_of_operation: RplModeOfOperation::NonStoringMode,
        dodag_preference: 0,
        dtsn: 0,
        dodag_id: Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
        options,
    });
    build_frame(
        Ipv6Repr {
            src_addr: parent_ll_addr(),
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    )
}

/// Install a parent and a global address: the common preamble of the
/// attached-node tests.
pub(crate) fn attach(iface: &mut Interface<'static>, now: Instant) -> Ipv6Address {
    let frame = dio_from_parent();
    inject(iface, now, PARENT_EUI64, true, &frame);
    assert!(iface.rpl().preferred_parent().is_some());

    let global = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5);
    iface.set_global_address(global, now);
    global
}

#[test]
fn s1_ns_with_earo_triggers_na_with_earo() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let target = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

    let frame = ns_with_earo(src, target);
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);

    let out = drain(&mut iface);
    assert_eq!(out.len(), 1);
    let (ip_repr, payload) = &out[0];
    assert_eq!(ip_repr.dst_addr, src);
    assert_eq!(ip_repr.hop_limit, 255);

    match parse_icmp(ip_repr, payload) {
        Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert {
            flags,
            target_addr,
            lladdr,
            registration,
        }) => {
            assert_eq!(target_addr, target);
            assert_eq!(
                flags,
                NdiscNeighborFlags::ROUTER
                    | NdiscNeighborFlags::SOLICITED
                    | NdiscNeighborFlags::OVERRIDE
            );
            assert_eq!(lladdr, Some(OUR_EUI64));
            let reg = registration.unwrap();
            assert_eq!(reg.status, AroStatus::Success);
            assert_eq!(reg.lifetime, 3600);
            assert_eq!(reg.eui64, CHILD_EUI64);
        }
        other => panic!("expected NA, got {other:?}"),
    }

    // The registration landed in the neighbor cache.
    let handle = iface.neighbor_cache().lookup(&target).unwrap();
    let neighbor = iface.neighbor_cache().get(handle).unwrap();
    assert!(neighbor.is_registered());
    assert_eq!(neighbor.ll_addr(), Some(CHILD_EUI64));
}

#[test]
fn s1_validation_idempotence() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let target = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);
    let frame = ns_with_earo(src, target);

    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);
    let first = drain(&mut iface);
    let used = iface.neighbor_cache().used();
    let state = {
        let handle = iface.neighbor_cache().lookup(&target).unwrap();
        iface.neighbor_cache().get(handle).unwrap().state()
    };

    // A second identical dispatch produces the same answer and leaves
    // the cache at its fixed point.
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);
    let second = drain(&mut iface);
    assert_eq!(first, second);
    assert_eq!(iface.neighbor_cache().used(), used);
    let handle = iface.neighbor_cache().lookup(&target).unwrap();
    assert_eq!(iface.neighbor_cache().get(handle).unwrap().state(), state);
}

#[test]
fn duplicate_registration_is_refused_to_reconstructed_lladdr() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let target = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

    inject(
        &mut iface,
        Instant::ZERO,
        CHILD_EUI64,
        true,
        &ns_with_earo(src, target),
    );
    drain(&mut iface);

    // Another node claims the same address.
    let other = Eui64([0x02, 0x99, 0x99, 0x99, 0x99, 0x99, 0x99, 0x99]);
    let icmp = Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
        target_addr: target,
        lladdr: None,
        registration: Some(AddressRegistration::new(AroStatus::Success, 3600, other)),
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: src,
            dst_addr: target.solicited_node(),
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    );
    inject(&mut iface, Instant::ZERO, other, true, &frame);

    let out = drain(&mut iface);
    assert_eq!(out.len(), 1);
    let (ip_repr, payload) = &out[0];
    // The refusal goes to the link-local address reconstructed from
    // the solicitor's EUI-64, not to the (contested) source address.
    assert_eq!(ip_repr.dst_addr, other.link_local_address());
    match parse_icmp(ip_repr, payload) {
        Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert { registration, .. }) => {
            assert_eq!(registration.unwrap().status, AroStatus::Duplicate);
        }
        other => panic!("expected NA, got {other:?}"),
    }

    // The original registration is untouched.
    let handle = iface.neighbor_cache().lookup(&target).unwrap();
    assert_eq!(
        iface.neighbor_cache().get(handle).unwrap().ll_addr(),
        Some(CHILD_EUI64)
    );
}

#[test]
fn ns_with_bad_hop_limit_is_dropped() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let target = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

    let icmp = Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
        target_addr: target,
        lladdr: None,
        registration: Some(AddressRegistration::new(AroStatus::Success, 3600, CHILD_EUI64)),
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: src,
            dst_addr: target.solicited_node(),
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 64,
        },
        &icmp,
    );
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);

    assert!(drain(&mut iface).is_empty());
    assert_eq!(iface.neighbor_cache().used(), 0);
}

#[test]
fn s5_na_on_multicast_with_solicited_flag_is_dropped() {
    let mut iface = create();
    let target = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 9);

    let icmp = Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert {
        flags: NdiscNeighborFlags::SOLICITED,
        target_addr: target,
        lladdr: Some(CHILD_EUI64),
        registration: None,
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: target,
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    );
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);

    assert!(drain(&mut iface).is_empty());
    assert_eq!(iface.neighbor_cache().used(), 0);
}

#[test]
fn s2_dio_installs_preferred_parent() {
    let mut iface = create();
    let now = Instant::ZERO;

    let frame = dio_from_parent();
    inject(&mut iface, now, PARENT_EUI64, true, &frame);

    // Parent installed, exactly one parent-change event.
    let parent = iface.rpl().preferred_parent().expect("preferred parent");
    assert_eq!(parent.ipv6_addr(), parent_ll_addr());
    assert_eq!(
        iface.poll_event(),
        Some(Event::PrimaryParentChanged {
            parent: Some(parent_ll_addr())
        })
    );
    assert_eq!(iface.poll_event(), None);

    // Our rank: parent rank + rank increase, within the window the
    // objective function allows.
    let rank = iface.rpl().rank().raw_value();
    assert!((384..=768).contains(&rank), "rank {rank}");

    // Once the global address arrives, registration and DAO go out
    // promptly.
    let global = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5);
    iface.set_global_address(global, now + Duration::from_millis(100));

    let out = drain(&mut iface);
    let mut saw_ns_earo = false;
    let mut saw_dao = false;
    for (ip_repr, payload) in &out {
        match parse_icmp(ip_repr, payload) {
            Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
                target_addr,
                registration,
                ..
            }) => {
                assert_eq!(ip_repr.dst_addr, parent_ll_addr());
                assert_eq!(ip_repr.hop_limit, 255);
                assert_eq!(target_addr, global);
                let reg = registration.unwrap();
                assert_eq!(reg.eui64, OUR_EUI64);
                // default_lifetime * lifetime_unit = 3600 s = 60 min
                assert_eq!(reg.lifetime, 60);
                saw_ns_earo = true;
            }
            Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObject {
                expect_ack,
                ref options,
                ..
            }) => {
                assert_eq!(ip_repr.dst_addr, parent_ll_addr());
                assert!(expect_ack);
                assert!(options.iter().any(|o| matches!(
                    o,
                    RplOptionRepr::RplTarget { prefix_length: 128, prefix } if *prefix == global
                )));
                assert!(options.iter().any(|o| matches!(
                    o,
                    RplOptionRepr::TransitInformation { parent_address: Some(p), .. }
                        if *p == parent_ll_addr()
                )));
                saw_dao = true;
            }
            _ => (),
        }
    }
    assert!(saw_ns_earo, "no NS with EARO emitted");
    assert!(saw_dao, "no DAO emitted");
    assert_eq!(iface.rpl().state(), AttachState::Registering);
}

#[test]
fn dao_ack_completes_attachment() {
    let mut iface = create();
    let now = Instant::ZERO;
    attach(&mut iface, now);
    let out = drain(&mut iface);
    let sequence = out
        .iter()
        .find_map(|(ip_repr, payload)| match parse_icmp(ip_repr, payload) {
            Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObject { sequence, .. }) => {
                Some(sequence)
            }
            _ => None,
        })
        .unwrap();

    let ack = Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObjectAck {
        rpl_instance_id: RplInstanceId::Global(0x1e),
        sequence,
        status: 0,
        dodag_id: None,
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: parent_ll_addr(),
            dst_addr: iface.link_local_addr(),
            next_header: IpProtocol::Icmpv6,
            payload_len: ack.buffer_len(),
            hop_limit: 64,
        },
        &ack,
    );
    inject(&mut iface, now, PARENT_EUI64, false, &frame);

    assert_eq!(iface.rpl().state(), AttachState::Registered);
    assert!(iface.rpl().preferred_parent().unwrap().is_preferred_parent());
}

#[test]
fn s3_icmpv6_error_bucket() {
    let mut iface = create();
    let our_addr = iface.link_local_addr();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

    let udp_payload = [0u8; 12];
    let mut frame = vec![0u8; 40 + udp_payload.len()];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: our_addr,
            next_header: IpProtocol::Udp,
            payload_len: udp_payload.len(),
            hop_limit: 64,
        }
        .emit(&mut ipv6);
    }

    // 30 packets inside one second: exactly 10 parameter problems.
    for i in 0..30 {
        inject(
            &mut iface,
            Instant::from_millis(i),
            CHILD_EUI64,
            false,
            &frame,
        );
    }
    let out = drain(&mut iface);
    assert_eq!(out.len(), 10);
    for (ip_repr, payload) in &out {
        assert_eq!(ip_repr.dst_addr, src);
        match parse_icmp(ip_repr, payload) {
            Icmpv6Repr::ParamProblem { reason, pointer, .. } => {
                assert_eq!(reason, crate::wire::Icmpv6ParamProblem::UnrecognizedNxtHdr);
                assert_eq!(pointer, 6);
            }
            other => panic!("expected parameter problem, got {other:?}"),
        }
    }

    // After a second of quiet the bucket has refilled.
    for i in 0..30 {
        inject(
            &mut iface,
            Instant::from_millis(1100 + i),
            CHILD_EUI64,
            false,
            &frame,
        );
    }
    assert_eq!(drain(&mut iface).len(), 10);
}

#[test]
fn error_suppressed_for_icmpv6_and_multicast() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);

    // A malformed ICMPv6 error must never provoke an error.
    let mut frame = vec![0u8; 48];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: iface.link_local_addr(),
            next_header: IpProtocol::Icmpv6,
            payload_len: 8,
            hop_limit: 64,
        }
        .emit(&mut ipv6);
    }
    frame[40] = 0x01; // destination unreachable, bogus checksum
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, false, &frame);
    assert!(drain(&mut iface).is_empty());

    // An unknown transport to a multicast destination: rule e.3.
    let mut frame = vec![0u8; 44];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_NODES,
            next_header: IpProtocol::Udp,
            payload_len: 4,
            hop_limit: 64,
        }
        .emit(&mut ipv6);
    }
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, true, &frame);
    assert!(drain(&mut iface).is_empty());
}

#[test]
fn s4_parent_loss_on_silence() {
    let mut iface = create();
    let now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);
    while iface.poll_event().is_some() {}

    // No DIO for default_lifetime * lifetime_unit = 3600 s.
    let expiry = now + Duration::from_secs(3600);
    iface.poll(expiry);

    assert!(iface.rpl().preferred_parent().is_none());
    assert_eq!(
        iface.poll_event(),
        Some(Event::PrimaryParentChanged { parent: None })
    );

    // A poisoning DIO with infinite rank went out (possibly next to a
    // final Trickle-paced one).
    let out = drain(&mut iface);
    assert!(out
        .iter()
        .any(|(ip_repr, payload)| matches!(
            parse_icmp(ip_repr, payload),
            Icmpv6Repr::Rpl(RplRepr::DodagInformationObject { rank: 0xffff, .. })
        )));

    // Reattachment is held down for at least Imin (2^15 ms): the same
    // parent advertising again immediately is not taken back.
    let frame = dio_from_parent();
    inject(&mut iface, expiry + Duration::from_secs(1), PARENT_EUI64, true, &frame);
    assert!(iface.rpl().preferred_parent().is_none());

    // After the hold-down it is.
    let later = expiry + Duration::from_millis(1 << 15) + Duration::from_secs(1);
    iface.poll(later);
    inject(&mut iface, later, PARENT_EUI64, true, &frame);
    assert!(iface.rpl().preferred_parent().is_some());
}

#[test]
fn s4_parent_loss_on_dao_retry_exhaustion() {
    let mut iface = create();
    let mut now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);

    // Never acknowledge the DAO; keep the parent's DIOs flowing so
    // liveness does not interfere.
    for _ in 0..20 {
        now += Duration::from_secs(70);
        let frame = dio_from_parent();
        inject(&mut iface, now, PARENT_EUI64, true, &frame);
        iface.poll(now);
        drain(&mut iface);
        if iface.rpl().preferred_parent().is_none() {
            break;
        }
    }

    assert!(iface.rpl().preferred_parent().is_none());
}

#[test]
fn infinite_rank_dio_from_parent_poisons() {
    let mut iface = create();
    let now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);

    let icmp = Icmpv6Repr::Rpl(RplRepr::DodagInformationObject {
        rpl_instance_id: RplInstanceId::Global(0x1e),
        version_number: 1,
        rank: 0xffff,
        grounded: true,
        mode_of_operation: RplModeOfOperation::NonStoringMode,
        dodag_preference: 0,
        dtsn: 0,
        dodag_id: Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
        options: heapless::Vec::new(),
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: parent_ll_addr(),
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    );
    inject(&mut iface, now + Duration::from_secs(1), PARENT_EUI64, true, &frame);

    assert!(iface.rpl().preferred_parent().is_none());
    assert!(iface.rpl().rank().is_infinite());
}

#[test]
fn aro_failure_in_na_demotes_parent() {
    let mut iface = create();
    let now = Instant::ZERO;
    let global = attach(&mut iface, now);
    drain(&mut iface);
    while iface.poll_event().is_some() {}

    let icmp = Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert {
        flags: NdiscNeighborFlags::ROUTER | NdiscNeighborFlags::SOLICITED,
        target_addr: global,
        lladdr: Some(PARENT_EUI64),
        registration: Some(AddressRegistration::new(
            AroStatus::NeighborCacheFull,
            0,
            OUR_EUI64,
        )),
    });
    let frame = build_frame(
        Ipv6Repr {
            src_addr: parent_ll_addr(),
            dst_addr: iface.link_local_addr(),
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    );
    inject(&mut iface, now + Duration::from_secs(1), PARENT_EUI64, false, &frame);

    assert_eq!(
        iface.poll_event(),
        Some(Event::AroFailure {
            eui64: PARENT_EUI64,
            status: AroStatus::NeighborCacheFull,
        })
    );
    assert!(iface.rpl().preferred_parent().is_none());
}

#[test]
fn mac_ack_confirms_registration() {
    let mut iface = create();
    let now = Instant::ZERO;
    attach(&mut iface, now);

    let mut rcp = MockRcp::default();
    iface.dispatch(&mut rcp).unwrap();
    // The NS(EARO) request goes out first; acknowledge it at the MAC
    // level.
    let handle = rcp.tx[0].0;

    iface.tx_cnf(
        now + Duration::from_millis(10),
        &crate::phy::TxCnf {
            handle,
            status: TxStatus::Success,
            timestamp_us: 0,
        },
    );

    let parent_nce = iface
        .neighbor_cache()
        .lookup(&parent_ll_addr())
        .expect("parent nce");
    let neighbor = iface.neighbor_cache().get(parent_nce).unwrap();
    assert!(neighbor.is_registered());
    assert_eq!(neighbor.state(), NeighborState::Reachable);
}

#[test]
fn parent_unreachable_via_nud_triggers_loss() {
    let mut iface = create();
    let mut now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);

    // Force the parent entry through REACHABLE -> STALE -> DELAY ->
    // PROBE -> UNREACHABLE without ever answering a probe.
    let handle = iface.neighbor_cache().lookup(&parent_ll_addr()).unwrap();
    iface.inner.neighbor_cache.confirm_reachable(handle, now);

    // Past any possible reachable_time draw (at most 45 s).
    now += Duration::from_secs(50);
    iface.poll(now);
    iface.inner.neighbor_cache.mark_used(handle, now);

    for _ in 0..12 {
        now += Duration::from_secs(2);
        iface.poll(now);
        drain(&mut iface);
    }

    assert!(iface.rpl().preferred_parent().is_none());
}

#[test]
fn forward_too_big_answers_packet_too_big() {
    let mut config = Config::new(OUR_EUI64);
    config.random_seed = 0x1234_5678;
    config.mtu = 200;
    let mut iface = Interface::new(config, vec![None; 16], Instant::ZERO);

    let now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);

    let src = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x99);
    let dst = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x42);
    let payload_len = 300;
    let mut frame = vec![0u8; 40 + payload_len];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: dst,
            next_header: IpProtocol::Udp,
            payload_len,
            hop_limit: 7,
        }
        .emit(&mut ipv6);
    }
    // Received as a link-layer multicast: Packet Too Big is exempt
    // from the e.3/e.4 suppression and still goes out.
    inject(&mut iface, now, CHILD_EUI64, true, &frame);

    let out = drain(&mut iface);
    assert_eq!(out.len(), 1);
    let (ip_repr, payload) = &out[0];
    assert_eq!(ip_repr.dst_addr, src);
    match parse_icmp(ip_repr, payload) {
        Icmpv6Repr::PktTooBig { mtu, header, .. } => {
            assert_eq!(mtu, 200);
            assert_eq!(header.dst_addr, dst);
        }
        other => panic!("expected packet too big, got {other:?}"),
    };
}

#[test]
fn forward_no_route_answers_dst_unreachable() {
    let mut iface = create();
    let src = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    let dst = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x42);

    // Unattached: no default route exists yet.
    let mut frame = vec![0u8; 44];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: dst,
            next_header: IpProtocol::Udp,
            payload_len: 4,
            hop_limit: 7,
        }
        .emit(&mut ipv6);
    }
    inject(&mut iface, Instant::ZERO, CHILD_EUI64, false, &frame);

    assert_eq!(iface.stats().tx_no_route, 1);
    let out = drain(&mut iface);
    assert_eq!(out.len(), 1);
    let (ip_repr, payload) = &out[0];
    assert_eq!(ip_repr.dst_addr, src);
    match parse_icmp(ip_repr, payload) {
        Icmpv6Repr::DstUnreachable { reason, header, .. } => {
            assert_eq!(reason, crate::wire::Icmpv6DstUnreachable::NoRoute);
            assert_eq!(header.dst_addr, dst);
        }
        other => panic!("expected destination unreachable, got {other:?}"),
    };
}

#[test]
fn forwards_off_link_unicast_through_parent() {
    let mut iface = create();
    let now = Instant::ZERO;
    attach(&mut iface, now);
    drain(&mut iface);

    let src = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x99);
    let dst = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x42);
    let mut frame = vec![0u8; 44];
    {
        let mut ipv6 = Ipv6Packet::new_unchecked(&mut frame[..]);
        Ipv6Repr {
            src_addr: src,
            dst_addr: dst,
            next_header: IpProtocol::Udp,
            payload_len: 4,
            hop_limit: 7,
        }
        .emit(&mut ipv6);
    }
    inject(&mut iface, now, CHILD_EUI64, false, &frame);

    let mut rcp = MockRcp::default();
    iface.dispatch(&mut rcp).unwrap();
    assert_eq!(rcp.tx.len(), 1);
    let (_, ll_dst, forwarded) = &rcp.tx[0];
    assert_eq!(*ll_dst, Some(PARENT_EUI64));
    let packet = Ipv6Packet::new_checked(&forwarded[..]).unwrap();
    assert_eq!(packet.hop_limit(), 6);
    assert_eq!(packet.dst_addr(), dst);
}
