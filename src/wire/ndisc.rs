use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};

use super::{Error, Result};
use crate::time::Duration;
use crate::wire::icmpv6::{field, Message, Packet};
use crate::wire::{AddressRegistration, Eui64, Ipv6Address};
use crate::wire::{NdiscOption, NdiscOptionRepr};
use crate::wire::{NdiscPrefixInformation, NdiscRedirectedHeader};

bitflags! {
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct RouterFlags: u8 {
        const MANAGED = 0b1000_0000;
        const OTHER   = 0b0100_0000;
    }
}

bitflags! {
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct NeighborFlags: u8 {
        const ROUTER    = 0b1000_0000;
        const SOLICITED = 0b0100_0000;
        const OVERRIDE  = 0b0010_0000;
    }
}

/// Getters for the Router Advertisement message header.
/// See [RFC 4861 § 4.2].
///
/// [RFC 4861 § 4.2]: https://tools.ietf.org/html/rfc4861#section-4.2
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the current hop limit field.
    #[inline]
    pub fn current_hop_limit(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::CUR_HOP_LIMIT]
    }

    /// Return the Router Advertisement flags.
    #[inline]
    pub fn router_flags(&self) -> RouterFlags {
        let data = self.buffer.as_ref();
        RouterFlags::from_bits_truncate(data[field::ROUTER_FLAGS])
    }

    /// Return the router lifetime field.
    #[inline]
    pub fn router_lifetime(&self) -> Duration {
        let data = self.buffer.as_ref();
        Duration::from_secs(NetworkEndian::read_u16(&data[field::ROUTER_LT]) as u64)
    }

    /// Return the reachable time field.
    #[inline]
    pub fn reachable_time(&self) -> Duration {
        let data = self.buffer.as_ref();
        Duration::from_millis(NetworkEndian::read_u32(&data[field::REACHABLE_TM]) as u64)
    }

    /// Return the retransmit time field.
    #[inline]
    pub fn retrans_time(&self) -> Duration {
        let data = self.buffer.as_ref();
        Duration::from_millis(NetworkEndian::read_u32(&data[field::RETRANS_TM]) as u64)
    }
}

/// Common getters for the [Neighbor Solicitation], [Neighbor
/// Advertisement], and [Redirect] message types.
///
/// [Neighbor Solicitation]: https://tools.ietf.org/html/rfc4861#section-4.3
/// [Neighbor Advertisement]: https://tools.ietf.org/html/rfc4861#section-4.4
/// [Redirect]: https://tools.ietf.org/html/rfc4861#section-4.5
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the target address field.
    #[inline]
    pub fn target_addr(&self) -> Ipv6Address {
        let data = self.buffer.as_ref();
        Ipv6Address::from_bytes(&data[field::TARGET_ADDR])
    }
}

/// Getters for the Neighbor Advertisement message header.
/// See [RFC 4861 § 4.4].
///
/// [RFC 4861 § 4.4]: https://tools.ietf.org/html/rfc4861#section-4.4
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the Neighbor Advertisement flags.
    #[inline]
    pub fn neighbor_flags(&self) -> NeighborFlags {
        let data = self.buffer.as_ref();
        NeighborFlags::from_bits_truncate(data[field::NEIGH_FLAGS])
    }
}

/// Getters for the Redirect message header.
/// See [RFC 4861 § 4.5].
///
/// [RFC 4861 § 4.5]: https://tools.ietf.org/html/rfc4861#section-4.5
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the destination address field.
    #[inline]
    pub fn dest_addr(&self) -> Ipv6Address {
        let data = self.buffer.as_ref();
        Ipv6Address::from_bytes(&data[field::DEST_ADDR])
    }
}

/// Setters for the Router Advertisement message header.
/// See [RFC 4861 § 4.2].
///
/// [RFC 4861 § 4.2]: https://tools.ietf.org/html/rfc4861#section-4.2
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the current hop limit field.
    #[inline]
    pub fn set_current_hop_limit(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::CUR_HOP_LIMIT] = value;
    }

    /// Set the Router Advertisement flags.
    #[inline]
    pub fn set_router_flags(&mut self, flags: RouterFlags) {
        self.buffer.as_mut()[field::ROUTER_FLAGS] = flags.bits();
    }

    /// Set the router lifetime field.
    #[inline]
    pub fn set_router_lifetime(&mut self, value: Duration) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::ROUTER_LT], value.secs() as u16);
    }

    /// Set the reachable time field.
    #[inline]
    pub fn set_reachable_time(&mut self, value: Duration) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::REACHABLE_TM], value.total_millis() as u32);
    }

    /// Set the retransmit time field.
    #[inline]
    pub fn set_retrans_time(&mut self, value: Duration) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::RETRANS_TM], value.total_millis() as u32);
    }
}

/// Common setters for the [Neighbor Solicitation], [Neighbor
/// Advertisement], and [Redirect] message types.
///
/// [Neighbor Solicitation]: https://tools.ietf.org/html/rfc4861#section-4.3
/// [Neighbor Advertisement]: https://tools.ietf.org/html/rfc4861#section-4.4
/// [Redirect]: https://tools.ietf.org/html/rfc4861#section-4.5
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the target address field.
    #[inline]
    pub fn set_target_addr(&mut self, value: Ipv6Address) {
        let data = self.buffer.as_mut();
        data[field::TARGET_ADDR].copy_from_slice(value.as_bytes());
    }
}

/// Setters for the Neighbor Advertisement message header.
/// See [RFC 4861 § 4.4].
///
/// [RFC 4861 § 4.4]: https://tools.ietf.org/html/rfc4861#section-4.4
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the Neighbor Advertisement flags.
    #[inline]
    pub fn set_neighbor_flags(&mut self, flags: NeighborFlags) {
        self.buffer.as_mut()[field::NEIGH_FLAGS] = flags.bits();
    }
}

/// Setters for the Redirect message header.
/// See [RFC 4861 § 4.5].
///
/// [RFC 4861 § 4.5]: https://tools.ietf.org/html/rfc4861#section-4.5
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the destination address field.
    #[inline]
    pub fn set_dest_addr(&mut self, value: Ipv6Address) {
        let data = self.buffer.as_mut();
        data[field::DEST_ADDR].copy_from_slice(value.as_bytes());
    }
}

/// A high-level representation of a Neighbor Discovery packet header.
///
/// The NS and NA forms carry the Wi-SUN extended address registration
/// option next to the classic link-layer address options.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Repr<'a> {
    RouterSolicit {
        lladdr: Option<Eui64>,
    },
    RouterAdvert {
        hop_limit: u8,
        flags: RouterFlags,
        router_lifetime: Duration,
        reachable_time: Duration,
        retrans_time: Duration,
        lladdr: Option<Eui64>,
        mtu: Option<u32>,
        prefix_info: Option<NdiscPrefixInformation>,
    },
    NeighborSolicit {
        target_addr: Ipv6Address,
        lladdr: Option<Eui64>,
        registration: Option<AddressRegistration>,
    },
    NeighborAdvert {
        flags: NeighborFlags,
        target_addr: Ipv6Address,
        lladdr: Option<Eui64>,
        registration: Option<AddressRegistration>,
    },
    Redirect {
        target_addr: Ipv6Address,
        dest_addr: Ipv6Address,
        lladdr: Option<Eui64>,
        redirected_hdr: Option<NdiscRedirectedHeader<'a>>,
    },
}

impl<'a> Repr<'a> {
    /// Parse an NDISC packet and return a high-level representation of
    /// the packet.
    ///
    /// The option chain must be well formed: every option has a
    /// non-zero length and the chain consumes exactly the remaining
    /// octets of the message.
    pub fn parse<T>(packet: &Packet<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        match packet.msg_type() {
            Message::RouterSolicit => {
                let mut lladdr = None;
                let mut offset = 0;
                while packet.payload().len() > offset {
                    let pkt = NdiscOption::new_checked(&packet.payload()[offset..])?;
                    let opt = NdiscOptionRepr::parse(&pkt)?;
                    match opt {
                        NdiscOptionRepr::SourceLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::Unknown { .. } => (),
                        _ => return Err(Error),
                    }
                    offset += opt.buffer_len();
                }
                Ok(Repr::RouterSolicit { lladdr })
            }
            Message::RouterAdvert => {
                let mut offset = 0;
                let (mut lladdr, mut mtu, mut prefix_info) = (None, None, None);
                while packet.payload().len() > offset {
                    let pkt = NdiscOption::new_checked(&packet.payload()[offset..])?;
                    let opt = NdiscOptionRepr::parse(&pkt)?;
                    match opt {
                        NdiscOptionRepr::SourceLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::Mtu(val) => mtu = Some(val),
                        NdiscOptionRepr::PrefixInformation(info) => prefix_info = Some(info),
                        NdiscOptionRepr::Unknown { .. } => (),
                        _ => return Err(Error),
                    }
                    offset += opt.buffer_len();
                }
                Ok(Repr::RouterAdvert {
                    hop_limit: packet.current_hop_limit(),
                    flags: packet.router_flags(),
                    router_lifetime: packet.router_lifetime(),
                    reachable_time: packet.reachable_time(),
                    retrans_time: packet.retrans_time(),
                    lladdr,
                    mtu,
                    prefix_info,
                })
            }
            Message::NeighborSolicit => {
                let (mut lladdr, mut registration) = (None, None);
                let mut offset = 0;
                while packet.payload().len() > offset {
                    let pkt = NdiscOption::new_checked(&packet.payload()[offset..])?;
                    let opt = NdiscOptionRepr::parse(&pkt)?;
                    match opt {
                        NdiscOptionRepr::SourceLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::AddressRegistration(reg) => registration = Some(reg),
                        NdiscOptionRepr::Unknown { .. } => (),
                        _ => return Err(Error),
                    }
                    offset += opt.buffer_len();
                }
                Ok(Repr::NeighborSolicit {
                    target_addr: packet.target_addr(),
                    lladdr,
                    registration,
                })
            }
            Message::NeighborAdvert => {
                let (mut lladdr, mut registration) = (None, None);
                let mut offset = 0;
                while packet.payload().len() > offset {
                    let pkt = NdiscOption::new_checked(&packet.payload()[offset..])?;
                    let opt = NdiscOptionRepr::parse(&pkt)?;
                    match opt {
                        NdiscOptionRepr::TargetLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::AddressRegistration(reg) => registration = Some(reg),
                        NdiscOptionRepr::Unknown { .. } => (),
                        _ => return Err(Error),
                    }
                    offset += opt.buffer_len();
                }
                Ok(Repr::NeighborAdvert {
                    flags: packet.neighbor_flags(),
                    target_addr: packet.target_addr(),
                    lladdr,
                    registration,
                })
            }
            Message::Redirect => {
                let (mut lladdr, mut redirected_hdr) = (None, None);
                let mut offset = 0;
                while packet.payload().len() > offset {
                    let pkt = NdiscOption::new_checked(&packet.payload()[offset..])?;
                    let opt = NdiscOptionRepr::parse(&pkt)?;
                    match opt {
                        NdiscOptionRepr::TargetLinkLayerAddr(addr) => lladdr = Some(addr),
                        NdiscOptionRepr::RedirectedHeader(rh) => redirected_hdr = Some(rh),
                        NdiscOptionRepr::Unknown { .. } => (),
                        _ => return Err(Error),
                    }
                    offset += opt.buffer_len();
                }
                Ok(Repr::Redirect {
                    target_addr: packet.target_addr(),
                    dest_addr: packet.dest_addr(),
                    lladdr,
                    redirected_hdr,
                })
            }
            _ => Err(Error),
        }
    }

    pub fn buffer_len(&self) -> usize {
        match self {
            &Repr::RouterSolicit { lladdr } => match lladdr {
                Some(_) => field::UNUSED.end + NdiscOptionRepr::SourceLinkLayerAddr(Eui64::default()).buffer_len(),
                None => field::UNUSED.end,
            },
            &Repr::RouterAdvert {
                lladdr,
                mtu,
                prefix_info,
                ..
            } => {
                let mut offset = 0;
                if let Some(lladdr) = lladdr {
                    offset += NdiscOptionRepr::SourceLinkLayerAddr(lladdr).buffer_len();
                }
                if mtu.is_some() {
                    offset += 8;
                }
                if prefix_info.is_some() {
                    offset += 32;
                }
                field::RETRANS_TM.end + offset
            }
            &Repr::NeighborSolicit {
                lladdr,
                registration,
                ..
            }
            | &Repr::NeighborAdvert {
                lladdr,
                registration,
                ..
            } => {
                let mut offset = field::TARGET_ADDR.end;
                if let Some(lladdr) = lladdr {
                    offset += NdiscOptionRepr::SourceLinkLayerAddr(lladdr).buffer_len();
                }
                if let Some(reg) = registration {
                    offset += NdiscOptionRepr::AddressRegistration(reg).buffer_len();
                }
                offset
            }
            &Repr::Redirect {
                lladdr,
                redirected_hdr,
                ..
            } => {
                let mut offset = field::DEST_ADDR.end;
                if let Some(lladdr) = lladdr {
                    offset += NdiscOptionRepr::TargetLinkLayerAddr(lladdr).buffer_len();
                }
                if let Some(NdiscRedirectedHeader { header, data }) = redirected_hdr {
                    offset += 8 + header.buffer_len() + data.len();
                }
                offset
            }
        }
    }

    pub fn emit<T>(&self, packet: &mut Packet<&mut T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]> + ?Sized,
    {
        match *self {
            Repr::RouterSolicit { lladdr } => {
                packet.set_msg_type(Message::RouterSolicit);
                packet.set_msg_code(0);
                packet.clear_reserved();
                if let Some(lladdr) = lladdr {
                    let mut opt_pkt = NdiscOption::new_unchecked(packet.payload_mut());
                    NdiscOptionRepr::SourceLinkLayerAddr(lladdr).emit(&mut opt_pkt);
                }
            }

            Repr::RouterAdvert {
                hop_limit,
                flags,
                router_lifetime,
                reachable_time,
                retrans_time,
                lladdr,
                mtu,
                prefix_info,
            } => {
                packet.set_msg_type(Message::RouterAdvert);
                packet.set_msg_code(0);
                packet.set_current_hop_limit(hop_limit);
                packet.set_router_flags(flags);
                packet.set_router_lifetime(router_lifetime);
                packet.set_reachable_time(reachable_time);
                packet.set_retrans_time(retrans_time);
                let mut offset = 0;
                if let Some(lladdr) = lladdr {
                    let opt = NdiscOptionRepr::SourceLinkLayerAddr(lladdr);
                    let mut opt_pkt = NdiscOption::new_unchecked(packet.payload_mut());
                    opt.emit(&mut opt_pkt);
                    offset += opt.buffer_len();
                }
                if let Some(mtu) = mtu {
                    let mut opt_pkt =
                        NdiscOption::new_unchecked(&mut packet.payload_mut()[offset..]);
                    NdiscOptionRepr::Mtu(mtu).emit(&mut opt_pkt);
                    offset += 8;
                }
                if let Some(prefix_info) = prefix_info {
                    let mut opt_pkt =
                        NdiscOption::new_unchecked(&mut packet.payload_mut()[offset..]);
                    NdiscOptionRepr::PrefixInformation(prefix_info).emit(&mut opt_pkt)
                }
            }

            Repr::NeighborSolicit {
                target_addr,
                lladdr,
                registration,
            } => {
                packet.set_msg_type(Message::NeighborSolicit);
                packet.set_msg_code(0);
                packet.clear_reserved();
                packet.set_target_addr(target_addr);
                let mut offset = 0;
                if let Some(lladdr) = lladdr {
                    let opt = NdiscOptionRepr::SourceLinkLayerAddr(lladdr);
                    let mut opt_pkt = NdiscOption::new_unchecked(packet.payload_mut());
                    opt.emit(&mut opt_pkt);
                    offset += opt.buffer_len();
                }
                if let Some(reg) = registration {
                    let mut opt_pkt =
                        NdiscOption::new_unchecked(&mut packet.payload_mut()[offset..]);
                    NdiscOptionRepr::AddressRegistration(reg).emit(&mut opt_pkt);
                }
            }

            Repr::NeighborAdvert {
                flags,
                target_addr,
                lladdr,
                registration,
            } => {
                packet.set_msg_type(Message::NeighborAdvert);
                packet.set_msg_code(0);
                packet.clear_reserved();
                packet.set_neighbor_flags(flags);
                packet.set_target_addr(target_addr);
                let mut offset = 0;
                if let Some(lladdr) = lladdr {
                    let opt = NdiscOptionRepr::TargetLinkLayerAddr(lladdr);
                    let mut opt_pkt = NdiscOption::new_unchecked(packet.payload_mut());
                    opt.emit(&mut opt_pkt);
                    offset += opt.buffer_len();
                }
                if let Some(reg) = registration {
                    let mut opt_pkt =
                        NdiscOption::new_unchecked(&mut packet.payload_mut()[offset..]);
                    NdiscOptionRepr::AddressRegistration(reg).emit(&mut opt_pkt);
                }
            }

            Repr::Redirect {
                target_addr,
                dest_addr,
                lladdr,
                redirected_hdr,
            } => {
                packet.set_msg_type(Message::Redirect);
                packet.set_msg_code(0);
                packet.clear_reserved();
                packet.set_target_addr(target_addr);
                packet.set_dest_addr(dest_addr);
                let mut offset = 0;
                if let Some(lladdr) = lladdr {
                    let opt = NdiscOptionRepr::TargetLinkLayerAddr(lladdr);
                    let mut opt_pkt = NdiscOption::new_unchecked(packet.payload_mut());
                    opt.emit(&mut opt_pkt);
                    offset += opt.buffer_len();
                }
                if let Some(redirected_hdr) = redirected_hdr {
                    let mut opt_pkt =
                        NdiscOption::new_unchecked(&mut packet.payload_mut()[offset..]);
                    NdiscOptionRepr::RedirectedHeader(redirected_hdr).emit(&mut opt_pkt);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wire::ipv6::test::{MOCK_IP_ADDR_1, MOCK_IP_ADDR_2};
    use crate::wire::{AroStatus, Icmpv6Packet, Icmpv6Repr};

    const EUI64: Eui64 = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);

    static NS_EARO_BYTES: [u8; 40] = [
        0x87, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x02, 0x21, 0x02, 0x00, 0x00, 0x00, 0x00,
        0x0e, 0x10, 0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77,
    ];

    fn ns_earo_repr() -> Repr<'static> {
        Repr::NeighborSolicit {
            target_addr: MOCK_IP_ADDR_2,
            lladdr: None,
            registration: Some(AddressRegistration::new(AroStatus::Success, 3600, EUI64)),
        }
    }

    #[test]
    fn test_ns_earo_parse() {
        let packet = Packet::new_unchecked(&NS_EARO_BYTES[..]);
        assert_eq!(Repr::parse(&packet).unwrap(), ns_earo_repr());
    }

    #[test]
    fn test_ns_earo_emit() {
        let repr = ns_earo_repr();
        assert_eq!(repr.buffer_len(), 40);
        let mut bytes = vec![0x2a; repr.buffer_len()];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        repr.emit(&mut packet);
        // everything but the checksum, which Icmpv6Repr::emit fills
        assert_eq!(&packet.into_inner()[4..], &NS_EARO_BYTES[4..]);
    }

    #[test]
    fn test_na_flags_roundtrip() {
        let repr = Repr::NeighborAdvert {
            flags: NeighborFlags::ROUTER | NeighborFlags::SOLICITED | NeighborFlags::OVERRIDE,
            target_addr: MOCK_IP_ADDR_2,
            lladdr: Some(EUI64),
            registration: None,
        };
        let mut bytes = vec![0; repr.buffer_len()];
        let mut packet = Packet::new_unchecked(&mut bytes[..]);
        repr.emit(&mut packet);

        let packet = Packet::new_unchecked(&bytes[..]);
        assert_eq!(packet.neighbor_flags(), NeighborFlags::ROUTER | NeighborFlags::SOLICITED | NeighborFlags::OVERRIDE);
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }

    #[test]
    fn test_icmpv6_roundtrip_with_checksum() {
        let repr = Icmpv6Repr::Ndisc(ns_earo_repr());
        let mut bytes = vec![0; repr.buffer_len()];
        let mut packet = Icmpv6Packet::new_unchecked(&mut bytes[..]);
        repr.emit(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2, &mut packet);

        let packet = Icmpv6Packet::new_unchecked(&bytes[..]);
        assert!(packet.verify_checksum(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2));
        assert_eq!(
            Icmpv6Repr::parse(&MOCK_IP_ADDR_1, &MOCK_IP_ADDR_2, &packet).unwrap(),
            repr
        );
    }

    #[test]
    fn test_truncated_option_chain_rejected() {
        // option chain claims more octets than the message carries
        let mut bytes = NS_EARO_BYTES;
        bytes[25] = 0x03;
        let packet = Packet::new_unchecked(&bytes[..]);
        assert_eq!(Repr::parse(&packet), Err(Error));
    }
}
