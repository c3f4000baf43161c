//! End-to-end exercise of a router node against an in-memory RCP bus:
//! boot, hear a root, attach, acquire an address, register and
//! advertise, then survive losing the parent.

use smolfan::iface::{Config, Event, Interface};
use smolfan::phy::{DataRequest, FatalError, RcpBus, RxInd, TxCnf, TxStatus};
use smolfan::sched::TimerQueue;
use smolfan::time::{Duration, Instant};
use smolfan::wire::{
    AddressRegistration, AroStatus, Eui64, Icmpv6Packet, Icmpv6Repr, IpProtocol, Ipv6Address,
    Ipv6Packet, Ipv6Repr, NdiscRepr, RplInstanceId, RplModeOfOperation, RplOptionRepr, RplRepr,
};

const NODE_EUI64: Eui64 = Eui64([0x02, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, 0x01]);
const ROOT_EUI64: Eui64 = Eui64([0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a]);
const DODAG_ID: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);
const GLOBAL: Ipv6Address = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5);

#[derive(Debug, Default)]
struct Radio {
    tx: Vec<(u8, Option<Eui64>, Vec<u8>)>,
}

impl RcpBus for Radio {
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

fn build_frame(ip_repr: Ipv6Repr, icmp: &Icmpv6Repr) -> Vec<u8> {
    let mut bytes = vec![0u8; ip_repr.buffer_len() + icmp.buffer_len()];
    let mut ipv6 = Ipv6Packet::new_unchecked(&mut bytes[..]);
    ip_repr.emit(&mut ipv6);
    let mut packet = Icmpv6Packet::new_unchecked(&mut bytes[ip_repr.buffer_len()..]);
    icmp.emit(&ip_repr.src_addr, &ip_repr.dst_addr, &mut packet);
    bytes
}

fn root_dio() -> Vec<u8> {
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
        dodag_id: DODAG_ID,
        options,
    });
    build_frame(
        Ipv6Repr {
            src_addr: ROOT_EUI64.link_local_address(),
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: icmp.buffer_len(),
            hop_limit: 255,
        },
        &icmp,
    )
}

fn inject(iface: &mut Interface<'_>, now: Instant, src: Eui64, frame: &[u8]) {
    iface.rx_ind(
        now,
        &RxInd {
            frame,
            src,
            security_ok: true,
            multicast: true,
            lqi: 200,
            rssi_dbm: -55,
            timestamp_us: now.total_micros() as u64,
        },
    );
}

fn decode(frame: &[u8]) -> (Ipv6Repr, Icmpv6Repr<'_>) {
    let packet = Ipv6Packet::new_checked(frame).unwrap();
    let ip_repr = Ipv6Repr::parse(&packet).unwrap();
    let icmp = Icmpv6Packet::new_unchecked(packet.payload());
    let icmp_repr = Icmpv6Repr::parse(&ip_repr.src_addr, &ip_repr.dst_addr, &icmp).unwrap();
    (ip_repr, icmp_repr)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerToken {
    StackPoll,
}

#[test]
fn full_attach_cycle() {
    let mut radio = Radio::default();
    let mut timers: TimerQueue<TimerToken> = TimerQueue::new();

    let mut config = Config::new(NODE_EUI64);
    config.pan_id = 0x0fab;
    config.random_seed = 0xfeed_beef;
    let mut iface = Interface::new(config, vec![None; 16], Instant::ZERO);

    // Boot: nothing heard, the node multicasts a DIS eventually.
    let mut now = Instant::ZERO;
    for _ in 0..10 {
        if let Some(at) = iface.poll_at() {
            timers.arm(TimerToken::StackPoll, at);
        }
        let Some(deadline) = timers.poll_at() else { break };
        now = deadline;
        while timers.poll(now).is_some() {}
        iface.poll(now);
        iface.dispatch(&mut radio).unwrap();
        if !radio.tx.is_empty() {
            break;
        }
    }
    let dis_seen = radio.tx.iter().any(|(_, _, frame)| {
        matches!(
            decode(frame).1,
            Icmpv6Repr::Rpl(RplRepr::DodagInformationSolicitation { .. })
        )
    });
    assert!(dis_seen, "no DIS while unattached");
    radio.tx.clear();

    // The root answers with a DIO; the node attaches and asks for an
    // address (PrimaryParentChanged drives the DHCPv6 client).
    let dio = root_dio();
    inject(&mut iface, now, ROOT_EUI64, &dio);
    assert_eq!(
        iface.poll_event(),
        Some(Event::PrimaryParentChanged {
            parent: Some(ROOT_EUI64.link_local_address())
        })
    );

    // Address acquired: registration NS and DAO leave for the parent.
    now += Duration::from_millis(100);
    iface.set_global_address(GLOBAL, now);
    iface.dispatch(&mut radio).unwrap();

    let mut ns_handle = None;
    let mut dao_sequence = None;
    for (handle, dst, frame) in &radio.tx {
        match decode(frame).1 {
            Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
                target_addr,
                registration: Some(reg),
                ..
            }) => {
                assert_eq!(target_addr, GLOBAL);
                assert_eq!(reg.eui64, NODE_EUI64);
                assert_eq!(*dst, Some(ROOT_EUI64));
                ns_handle = Some(*handle);
            }
            Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObject { sequence, .. }) => {
                dao_sequence = Some(sequence);
            }
            _ => (),
        }
    }
    let ns_handle = ns_handle.expect("no registration NS");
    let dao_sequence = dao_sequence.expect("no DAO");
    radio.tx.clear();

    // The MAC acknowledges the NS; the root acknowledges the DAO.
    iface.tx_cnf(
        now,
        &TxCnf {
            handle: ns_handle,
            status: TxStatus::Success,
            timestamp_us: 0,
        },
    );
    let ack = Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObjectAck {
        rpl_instance_id: RplInstanceId::Global(0x1e),
        sequence: dao_sequence,
        status: 0,
        dodag_id: None,
    });
    let ack_frame = build_frame(
        Ipv6Repr {
            src_addr: ROOT_EUI64.link_local_address(),
            dst_addr: iface.link_local_addr(),
            next_header: IpProtocol::Icmpv6,
            payload_len: ack.buffer_len(),
            hop_limit: 64,
        },
        &ack,
    );
    inject(&mut iface, now, ROOT_EUI64, &ack_frame);

    assert_eq!(
        iface.rpl().state(),
        smolfan::iface::AttachState::Registered
    );

    // A child registers through us.
    let child = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
    let child_addr = child.link_local_address();
    let ns = Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
        target_addr: child_addr,
        lladdr: None,
        registration: Some(AddressRegistration::new(AroStatus::Success, 60, child)),
    });
    let ns_frame = build_frame(
        Ipv6Repr {
            src_addr: child_addr,
            dst_addr: child_addr.solicited_node(),
            next_header: IpProtocol::Icmpv6,
            payload_len: ns.buffer_len(),
            hop_limit: 255,
        },
        &ns,
    );
    inject(&mut iface, now, child, &ns_frame);
    iface.dispatch(&mut radio).unwrap();

    let na_ok = radio.tx.iter().any(|(_, _, frame)| {
        matches!(
            decode(frame).1,
            Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert {
                registration: Some(reg),
                ..
            }) if reg.status == AroStatus::Success
        )
    });
    assert!(na_ok, "child registration not acknowledged");
    radio.tx.clear();

    // Silence from the root for the whole DODAG lifetime: poison and
    // detach.
    now += Duration::from_secs(3600);
    iface.poll(now);
    iface.dispatch(&mut radio).unwrap();

    assert!(iface.rpl().preferred_parent().is_none());
    let poisoned = radio.tx.iter().any(|(_, _, frame)| {
        matches!(
            decode(frame).1,
            Icmpv6Repr::Rpl(RplRepr::DodagInformationObject { rank: 0xffff, .. })
        )
    });
    assert!(poisoned, "no poison DIO after parent loss");
}
