use bitflags::bitflags;
use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};
use crate::time::Duration;
use crate::wire::{Eui64, Ipv6Address, Ipv6Packet, Ipv6Repr};

enum_with_unknown! {
    /// NDISC Option Type
    pub enum Type(u8) {
        /// Source Link-layer Address
        SourceLinkLayerAddr = 0x01,
        /// Target Link-layer Address
        TargetLinkLayerAddr = 0x02,
        /// Prefix Information
        PrefixInformation   = 0x03,
        /// Redirected Header
        RedirectedHeader    = 0x04,
        /// MTU
        Mtu                 = 0x05,
        /// Extended Address Registration, RFC 8505. Wi-SUN uses this
        /// in place of a source link-layer option.
        AddressRegistration = 0x21,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::SourceLinkLayerAddr => write!(f, "source link-layer address"),
            Type::TargetLinkLayerAddr => write!(f, "target link-layer address"),
            Type::PrefixInformation => write!(f, "prefix information"),
            Type::RedirectedHeader => write!(f, "redirected header"),
            Type::Mtu => write!(f, "mtu"),
            Type::AddressRegistration => write!(f, "extended address registration"),
            Type::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// Status carried in an Extended Address Registration Option.
    /// See [RFC 8505 § 4.1].
    ///
    /// [RFC 8505 § 4.1]: https://tools.ietf.org/html/rfc8505#section-4.1
    pub enum AroStatus(u8) {
        Success            = 0,
        Duplicate          = 1,
        NeighborCacheFull  = 2,
        Moved              = 3,
        Removed            = 4,
        ValidationRequested = 5,
        DuplicateSource    = 6,
        InvalidSource      = 7
    }
}

impl fmt::Display for AroStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AroStatus::Success => write!(f, "success"),
            AroStatus::Duplicate => write!(f, "duplicate address"),
            AroStatus::NeighborCacheFull => write!(f, "neighbor cache full"),
            AroStatus::Moved => write!(f, "moved"),
            AroStatus::Removed => write!(f, "removed"),
            AroStatus::ValidationRequested => write!(f, "validation requested"),
            AroStatus::DuplicateSource => write!(f, "duplicate source address"),
            AroStatus::InvalidSource => write!(f, "invalid source address"),
            AroStatus::Unknown(id) => write!(f, "{id}"),
        }
    }
}

bitflags! {
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct PrefixInfoFlags: u8 {
        const ON_LINK  = 0b1000_0000;
        const ADDRCONF = 0b0100_0000;
        const ROUTER   = 0b0010_0000;
    }
}

bitflags! {
    /// I/R/T flags of the Extended Address Registration Option.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    pub struct AroFlags: u8 {
        /// The registering node wants to be reachable at this address
        /// ("R" flag).
        const ROUTER_REGISTRATION = 0b0000_0010;
        /// The TID field carries a valid transaction id ("T" flag).
        const TID_VALID           = 0b0000_0001;
    }
}

/// A high-level representation of an Extended Address Registration
/// Option.
///
/// Wi-SUN FAN carries this option in NS and NA instead of relying on
/// link-layer address options: the EUI-64 field doubles as the
/// link-layer address, FAN assuming EUI-64 global uniqueness.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AddressRegistration {
    pub status: AroStatus,
    pub opaque: u8,
    pub flags: u8,
    pub tid: u8,
    /// Registration lifetime, in units of 60 seconds.
    pub lifetime: u16,
    pub eui64: Eui64,
}

impl AddressRegistration {
    pub fn new(status: AroStatus, lifetime: u16, eui64: Eui64) -> AddressRegistration {
        AddressRegistration {
            status,
            opaque: 0,
            flags: 0,
            tid: 0,
            lifetime,
            eui64,
        }
    }
}

/// A read/write wrapper around an [NDISC Option].
///
/// [NDISC Option]: https://tools.ietf.org/html/rfc4861#section-4.6
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NdiscOption<T: AsRef<[u8]>> {
    buffer: T,
}

// Format of an NDISC Option
//
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Type      |    Length     |              ...              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// ~                              ...                              ~
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// See https://tools.ietf.org/html/rfc4861#section-4.6 for details.
mod field {
    #![allow(non_snake_case)]

    use crate::wire::field::*;

    // 8-bit identifier of the type of option.
    pub const TYPE: usize = 0;
    // 8-bit unsigned integer. Length of the option, in units of 8 octets.
    pub const LENGTH: usize = 1;
    // Minimum length of an option.
    pub const MIN_OPT_LEN: usize = 8;
    // Variable-length field. Option-Type-specific data.
    pub const fn DATA(length: u8) -> Field {
        2..length as usize * 8
    }

    // Source/Target Link-layer Option fields.
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    // |     Type      |    Length     |    Link-Layer Address ...
    // +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const LL_ADDR: Field = 2..10;

    // Prefix Information Option fields.
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |     Type      |    Length     | Prefix Length |L|A| Reserved1 |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |                         Valid Lifetime                        |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |                       Preferred Lifetime                      |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |                           Reserved2                           |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |                                                               |
    //  +                            Prefix                             +
    //  |                                                               |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const PREFIX_LEN: usize = 2;
    pub const FLAGS: usize = 3;
    pub const VALID_LT: Field = 4..8;
    pub const PREF_LT: Field = 8..12;
    pub const PREF_RESERVED: Field = 12..16;
    pub const PREFIX: Field = 16..32;

    // Redirected Header Option fields.
    pub const REDIRECTED_RESERVED: Field = 2..8;
    pub const REDIR_MIN_SZ: usize = 48;

    // MTU Option fields.
    pub const MTU: Field = 4..8;

    // Extended Address Registration Option fields, RFC 8505 § 4.1.
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |     Type      |   Length = 2  |    Status     |    Opaque     |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  | Rsv | I |R|T|     TID       |     Registration Lifetime     |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    //  |                                                               |
    //  +                     Registration Ownership                    +
    //  |                          Verifier                             |
    //  +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
    pub const ARO_STATUS: usize = 2;
    pub const ARO_OPAQUE: usize = 3;
    pub const ARO_FLAGS: usize = 4;
    pub const ARO_TID: usize = 5;
    pub const ARO_LIFETIME: Field = 6..8;
    pub const ARO_EUI64: Field = 8..16;
    pub const ARO_LEN: usize = 16;
}

/// Core getter methods relevant to any type of NDISC option.
impl<T: AsRef<[u8]>> NdiscOption<T> {
    /// Create a raw octet buffer with an NDISC Option structure.
    pub const fn new_unchecked(buffer: T) -> NdiscOption<T> {
        NdiscOption { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    pub fn new_checked(buffer: T) -> Result<NdiscOption<T>> {
        let opt = Self::new_unchecked(buffer);
        opt.check_len()?;

        // A length field of 0 is invalid.
        if opt.data_len() == 0 {
            return Err(Error);
        }

        Ok(opt)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short.
    ///
    /// The result of this check is invalidated by calling [set_data_len].
    ///
    /// [set_data_len]: #method.set_data_len
    pub fn check_len(&self) -> Result<()> {
        let data = self.buffer.as_ref();
        let len = data.len();

        if len < field::MIN_OPT_LEN {
            return Err(Error);
        }

        let data_range = field::DATA(data[field::LENGTH]);
        if len < data_range.end {
            return Err(Error);
        }

        match self.option_type() {
            Type::SourceLinkLayerAddr | Type::TargetLinkLayerAddr | Type::Mtu => Ok(()),
            Type::PrefixInformation if data_range.end >= field::PREFIX.end => Ok(()),
            Type::RedirectedHeader if data_range.end >= field::REDIR_MIN_SZ => Ok(()),
            Type::AddressRegistration if data_range.end >= field::ARO_LEN => Ok(()),
            Type::Unknown(_) => Ok(()),
            _ => Err(Error),
        }
    }

    /// Consume the NDISC option, returning the underlying buffer.
    pub fn into_inner(self) -> T {
        self.buffer
    }

    /// Return the option type.
    #[inline]
    pub fn option_type(&self) -> Type {
        let data = self.buffer.as_ref();
        Type::from(data[field::TYPE])
    }

    /// Return the length field, in units of 8 octets.
    #[inline]
    pub fn data_len(&self) -> u8 {
        let data = self.buffer.as_ref();
        data[field::LENGTH]
    }
}

/// Getter methods only relevant for Source/Target Link-layer Address
/// options.
impl<T: AsRef<[u8]>> NdiscOption<T> {
    /// Return the Source/Target Link-layer Address. In Wi-SUN the link
    /// layer addresses are always EUI-64.
    #[inline]
    pub fn link_layer_addr(&self) -> Eui64 {
        let data = self.buffer.as_ref();
        Eui64::from_bytes(&data[field::LL_ADDR])
    }
}

/// Getter methods only relevant for the MTU option.
impl<T: AsRef<[u8]>> NdiscOption<T> {
    /// Return the MTU value.
    #[inline]
    pub fn mtu(&self) -> u32 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u32(&data[field::MTU])
    }
}

/// Getter methods only relevant for the Prefix Information option.
impl<T: AsRef<[u8]>> NdiscOption<T> {
    /// Return the prefix length.
    #[inline]
    pub fn prefix_len(&self) -> u8 {
        self.buffer.as_ref()[field::PREFIX_LEN]
    }

    /// Return the prefix information flags.
    #[inline]
    pub fn prefix_flags(&self) -> PrefixInfoFlags {
        PrefixInfoFlags::from_bits_truncate(self.buffer.as_ref()[field::FLAGS])
    }

    /// Return the valid lifetime of the prefix.
    #[inline]
    pub fn valid_lifetime(&self) -> Duration {
        let data = self.buffer.as_ref();
        Duration::from_secs(NetworkEndian::read_u32(&data[field::VALID_LT]) as u64)
    }

    /// Return the preferred lifetime of the prefix.
    #[inline]
    pub fn preferred_lifetime(&self) -> Duration {
        let data = self.buffer.as_ref();
        Duration::from_secs(NetworkEndian::read_u32(&data[field::PREF_LT]) as u64)
    }

    /// Return the prefix.
    #[inline]
    pub fn prefix(&self) -> Ipv6Address {
        let data = self.buffer.as_ref();
        Ipv6Address::from_bytes(&data[field::PREFIX])
    }
}

/// Getter methods only relevant for the Extended Address Registration
/// option.
impl<T: AsRef<[u8]>> NdiscOption<T> {
    /// Return the registration status.
    #[inline]
    pub fn aro_status(&self) -> AroStatus {
        AroStatus::from(self.buffer.as_ref()[field::ARO_STATUS])
    }

    /// Return the opaque field.
    #[inline]
    pub fn aro_opaque(&self) -> u8 {
        self.buffer.as_ref()[field::ARO_OPAQUE]
    }

    /// Return the I/R/T flags.
    #[inline]
    pub fn aro_flags(&self) -> u8 {
        self.buffer.as_ref()[field::ARO_FLAGS]
    }

    /// Return the transaction id.
    #[inline]
    pub fn aro_tid(&self) -> u8 {
        self.buffer.as_ref()[field::ARO_TID]
    }

    /// Return the registration lifetime, in units of 60 seconds.
    #[inline]
    pub fn aro_lifetime(&self) -> u16 {
        let data = self.buffer.as_ref();
        NetworkEndian::read_u16(&data[field::ARO_LIFETIME])
    }

    /// Return the EUI-64 of the registering node.
    #[inline]
    pub fn aro_eui64(&self) -> Eui64 {
        let data = self.buffer.as_ref();
        Eui64::from_bytes(&data[field::ARO_EUI64])
    }
}

impl<'a, T: AsRef<[u8]> + ?Sized> NdiscOption<&'a T> {
    /// Return the option data.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        let len = self.data_len();
        let data = self.buffer.as_ref();
        &data[field::DATA(len)]
    }
}

/// Core setter methods relevant to any type of NDISC option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> NdiscOption<T> {
    /// Set the option type.
    #[inline]
    pub fn set_option_type(&mut self, value: Type) {
        let data = self.buffer.as_mut();
        data[field::TYPE] = value.into();
    }

    /// Set the option length, in units of 8 octets.
    #[inline]
    pub fn set_data_len(&mut self, value: u8) {
        let data = self.buffer.as_mut();
        data[field::LENGTH] = value;
    }
}

/// Setter methods only relevant for Source/Target Link-layer Address
/// options.
impl<T: AsRef<[u8]> + AsMut<[u8]>> NdiscOption<T> {
    /// Set the Source/Target Link-layer Address.
    #[inline]
    pub fn set_link_layer_addr(&mut self, addr: Eui64) {
        let data = self.buffer.as_mut();
        data[field::LL_ADDR].copy_from_slice(addr.as_bytes());
        // The option is sized in units of 8 octets; clear the padding
        // after an EUI-64.
        data[field::LL_ADDR.end..field::DATA(2).end].fill(0);
    }
}

/// Setter methods only relevant for the MTU option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> NdiscOption<T> {
    /// Set the MTU value.
    #[inline]
    pub fn set_mtu(&mut self, value: u32) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[2..4], 0);
        NetworkEndian::write_u32(&mut data[field::MTU], value);
    }
}

/// Setter methods only relevant for the Prefix Information option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> NdiscOption<T> {
    /// Set the prefix length.
    #[inline]
    pub fn set_prefix_len(&mut self, value: u8) {
        self.buffer.as_mut()[field::PREFIX_LEN] = value;
    }

    /// Set the prefix information flags.
    #[inline]
    pub fn set_prefix_flags(&mut self, flags: PrefixInfoFlags) {
        self.buffer.as_mut()[field::FLAGS] = flags.bits();
    }

    /// Set the valid lifetime of the prefix.
    #[inline]
    pub fn set_valid_lifetime(&mut self, time: Duration) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::VALID_LT], time.secs() as u32);
    }

    /// Set the preferred lifetime of the prefix.
    #[inline]
    pub fn set_preferred_lifetime(&mut self, time: Duration) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::PREF_LT], time.secs() as u32);
    }

    /// Clear the reserved bits.
    #[inline]
    pub fn clear_prefix_reserved(&mut self) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u32(&mut data[field::PREF_RESERVED], 0);
    }

    /// Set the prefix.
    #[inline]
    pub fn set_prefix(&mut self, addr: Ipv6Address) {
        let data = self.buffer.as_mut();
        data[field::PREFIX].copy_from_slice(addr.as_bytes());
    }
}

/// Setter methods only relevant for the Extended Address Registration
/// option.
impl<T: AsRef<[u8]> + AsMut<[u8]>> NdiscOption<T> {
    /// Set the registration status.
    #[inline]
    pub fn set_aro_status(&mut self, status: AroStatus) {
        self.buffer.as_mut()[field::ARO_STATUS] = status.into();
    }

    /// Set the opaque field.
    #[inline]
    pub fn set_aro_opaque(&mut self, value: u8) {
        self.buffer.as_mut()[field::ARO_OPAQUE] = value;
    }

    /// Set the I/R/T flags.
    #[inline]
    pub fn set_aro_flags(&mut self, value: u8) {
        self.buffer.as_mut()[field::ARO_FLAGS] = value;
    }

    /// Set the transaction id.
    #[inline]
    pub fn set_aro_tid(&mut self, value: u8) {
        self.buffer.as_mut()[field::ARO_TID] = value;
    }

    /// Set the registration lifetime, in units of 60 seconds.
    #[inline]
    pub fn set_aro_lifetime(&mut self, value: u16) {
        let data = self.buffer.as_mut();
        NetworkEndian::write_u16(&mut data[field::ARO_LIFETIME], value);
    }

    /// Set the EUI-64 of the registering node.
    #[inline]
    pub fn set_aro_eui64(&mut self, value: Eui64) {
        let data = self.buffer.as_mut();
        data[field::ARO_EUI64].copy_from_slice(value.as_bytes());
    }
}

impl<'a> NdiscOption<&'a [u8]> {
    /// Parse an NDISC option and return a high-level representation.
    pub fn parse(&self) -> Result<Repr<'a>> {
        Repr::parse(self)
    }
}

impl<T: AsRef<[u8]>> fmt::Display for NdiscOption<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NdiscOption type={} length={}", self.option_type(), self.data_len())
    }
}

/// The high-level representation of a redirected header option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RedirectedHeader<'a> {
    pub header: Ipv6Repr,
    pub data: &'a [u8],
}

/// The high-level representation of a prefix information option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PrefixInformation {
    pub prefix_len: u8,
    pub flags: PrefixInfoFlags,
    pub valid_lifetime: Duration,
    pub preferred_lifetime: Duration,
    pub prefix: Ipv6Address,
}

/// A high-level representation of an NDISC Option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Repr<'a> {
    SourceLinkLayerAddr(Eui64),
    TargetLinkLayerAddr(Eui64),
    PrefixInformation(PrefixInformation),
    RedirectedHeader(RedirectedHeader<'a>),
    Mtu(u32),
    AddressRegistration(AddressRegistration),
    Unknown {
        type_: u8,
        length: u8,
        data: &'a [u8],
    },
}

impl<'a> Repr<'a> {
    /// Parse an NDISC Option and return a high-level representation.
    pub fn parse<T>(opt: &NdiscOption<&'a T>) -> Result<Repr<'a>>
    where
        T: AsRef<[u8]> + ?Sized,
    {
        opt.check_len()?;
        match opt.option_type() {
            Type::SourceLinkLayerAddr => {
                if opt.data_len() >= 2 {
                    Ok(Repr::SourceLinkLayerAddr(opt.link_layer_addr()))
                } else {
                    Err(Error)
                }
            }
            Type::TargetLinkLayerAddr => {
                if opt.data_len() >= 2 {
                    Ok(Repr::TargetLinkLayerAddr(opt.link_layer_addr()))
                } else {
                    Err(Error)
                }
            }
            Type::PrefixInformation => {
                if opt.data_len() == 4 {
                    Ok(Repr::PrefixInformation(PrefixInformation {
                        prefix_len: opt.prefix_len(),
                        flags: opt.prefix_flags(),
                        valid_lifetime: opt.valid_lifetime(),
                        preferred_lifetime: opt.preferred_lifetime(),
                        prefix: opt.prefix(),
                    }))
                } else {
                    Err(Error)
                }
            }
            Type::RedirectedHeader => {
                // If the options data length is less than 6 units of
                // 8 octets, the option does not have enough space to
                // contain the IPv6 header of the redirected packet.
                if opt.data_len() < 6 {
                    Err(Error)
                } else {
                    let ip_packet = Ipv6Packet::new_checked(&opt.data()[field::REDIRECTED_RESERVED.len()..])?;
                    let ip_repr = Ipv6Repr::parse(&ip_packet)?;
                    Ok(Repr::RedirectedHeader(RedirectedHeader {
                        header: ip_repr,
                        data: &ip_packet.payload()[..ip_repr.payload_len],
                    }))
                }
            }
            Type::Mtu => {
                if opt.data_len() == 1 {
                    Ok(Repr::Mtu(opt.mtu()))
                } else {
                    Err(Error)
                }
            }
            Type::AddressRegistration => {
                if opt.data_len() == 2 {
                    Ok(Repr::AddressRegistration(AddressRegistration {
                        status: opt.aro_status(),
                        opaque: opt.aro_opaque(),
                        flags: opt.aro_flags(),
                        tid: opt.aro_tid(),
                        lifetime: opt.aro_lifetime(),
                        eui64: opt.aro_eui64(),
                    }))
                } else {
                    Err(Error)
                }
            }
            Type::Unknown(id) => {
                // A length of 0 is invalid.
                if opt.data_len() != 0 {
                    Ok(Repr::Unknown {
                        type_: id,
                        length: opt.data_len(),
                        data: opt.data(),
                    })
                } else {
                    Err(Error)
                }
            }
        }
    }

    /// Return the length of a packet that will be emitted from this
    /// high-level representation.
    pub fn buffer_len(&self) -> usize {
        match self {
            // A link-layer EUI-64 needs 10 octets, padded to 2 units.
            &Repr::SourceLinkLayerAddr(_) | &Repr::TargetLinkLayerAddr(_) => 16,
            &Repr::PrefixInformation(_) => field::PREFIX.end,
            &Repr::RedirectedHeader(RedirectedHeader { header, data }) => {
                (8 + header.buffer_len() + data.len() + 7) / 8 * 8
            }
            &Repr::Mtu(_) => field::MTU.end,
            &Repr::AddressRegistration(_) => field::ARO_LEN,
            &Repr::Unknown { length, .. } => field::DATA(length).end,
        }
    }

    /// Emit a high-level representation into an NDISC Option.
    pub fn emit<T>(&self, opt: &mut NdiscOption<&mut T>)
    where
        T: AsRef<[u8]> + AsMut<[u8]> + ?Sized,
    {
        match *self {
            Repr::SourceLinkLayerAddr(addr) => {
                opt.set_option_type(Type::SourceLinkLayerAddr);
                opt.set_data_len(2);
                opt.set_link_layer_addr(addr);
            }
            Repr::TargetLinkLayerAddr(addr) => {
                opt.set_option_type(Type::TargetLinkLayerAddr);
                opt.set_data_len(2);
                opt.set_link_layer_addr(addr);
            }
            Repr::PrefixInformation(PrefixInformation {
                prefix_len,
                flags,
                valid_lifetime,
                preferred_lifetime,
                prefix,
            }) => {
                opt.clear_prefix_reserved();
                opt.set_option_type(Type::PrefixInformation);
                opt.set_data_len(4);
                opt.set_prefix_len(prefix_len);
                opt.set_prefix_flags(flags);
                opt.set_valid_lifetime(valid_lifetime);
                opt.set_preferred_lifetime(preferred_lifetime);
                opt.set_prefix(prefix);
            }
            Repr::RedirectedHeader(RedirectedHeader { header, data }) => {
                let data_len = data.len() / 8;
                opt.set_option_type(Type::RedirectedHeader);
                opt.set_data_len((1 + (header.buffer_len() / 8) + data_len) as u8);
                {
                    let buffer = opt.buffer.as_mut();
                    buffer[field::REDIRECTED_RESERVED].fill(0);
                }
                let mut ip_packet =
                    Ipv6Packet::new_unchecked(&mut opt.buffer.as_mut()[field::REDIRECTED_RESERVED.end..]);
                header.emit(&mut ip_packet);
                ip_packet.payload_mut()[..data.len()].copy_from_slice(data);
            }
            Repr::Mtu(mtu) => {
                opt.set_option_type(Type::Mtu);
                opt.set_data_len(1);
                opt.set_mtu(mtu);
            }
            Repr::AddressRegistration(AddressRegistration {
                status,
                opaque,
                flags,
                tid,
                lifetime,
                eui64,
            }) => {
                opt.set_option_type(Type::AddressRegistration);
                opt.set_data_len(2);
                opt.set_aro_status(status);
                opt.set_aro_opaque(opaque);
                opt.set_aro_flags(flags);
                opt.set_aro_tid(tid);
                opt.set_aro_lifetime(lifetime);
                opt.set_aro_eui64(eui64);
            }
            Repr::Unknown {
                type_: id,
                length,
                data,
            } => {
                opt.set_option_type(Type::Unknown(id));
                opt.set_data_len(length);
                let data_range = field::DATA(length);
                let payload = &mut opt.buffer.as_mut()[data_range.start..data_range.end];
                payload.copy_from_slice(&data[..payload.len()]);
            }
        }
    }
}

impl<'a> fmt::Display for Repr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "NdiscOption ")?;
        match self {
            Repr::SourceLinkLayerAddr(addr) => write!(f, "SourceLinkLayer addr={addr}"),
            Repr::TargetLinkLayerAddr(addr) => write!(f, "TargetLinkLayer addr={addr}"),
            Repr::PrefixInformation(PrefixInformation {
                prefix,
                prefix_len,
                ..
            }) => write!(f, "PrefixInformation prefix={prefix}/{prefix_len}"),
            Repr::RedirectedHeader(_) => write!(f, "RedirectedHeader"),
            Repr::Mtu(mtu) => write!(f, "MTU mtu={mtu}"),
            Repr::AddressRegistration(AddressRegistration {
                status,
                lifetime,
                eui64,
                ..
            }) => write!(f, "EARO status={status} lifetime={lifetime} eui64={eui64}"),
            Repr::Unknown { type_: id, .. } => write!(f, "Unknown({id})"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    static PREFIX_OPT_BYTES: [u8; 32] = [
        0x03, 0x04, 0x40, 0xc0, 0x00, 0x00, 0x03, 0x84, 0x00, 0x00, 0x03, 0xe8, 0x00, 0x00, 0x00,
        0x00, 0xfe, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00,
    ];

    static EARO_OPT_BYTES: [u8; 16] = [
        0x21, 0x02, 0x00, 0x00, 0x00, 0x00, 0x0e, 0x10, 0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66,
        0x77,
    ];

    const EUI64: Eui64 = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);

    #[test]
    fn test_deconstruct_prefix_info() {
        let opt = NdiscOption::new_unchecked(&PREFIX_OPT_BYTES[..]);
        assert_eq!(opt.option_type(), Type::PrefixInformation);
        assert_eq!(opt.data_len(), 4);
        assert_eq!(opt.prefix_len(), 64);
        assert_eq!(
            opt.prefix_flags(),
            PrefixInfoFlags::ON_LINK | PrefixInfoFlags::ADDRCONF
        );
        assert_eq!(opt.valid_lifetime(), Duration::from_secs(900));
        assert_eq!(opt.preferred_lifetime(), Duration::from_secs(1000));
        assert_eq!(
            opt.prefix(),
            Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 0)
        );
    }

    #[test]
    fn test_earo_deconstruct() {
        let opt = NdiscOption::new_checked(&EARO_OPT_BYTES[..]).unwrap();
        assert_eq!(opt.option_type(), Type::AddressRegistration);
        assert_eq!(opt.data_len(), 2);
        assert_eq!(opt.aro_status(), AroStatus::Success);
        assert_eq!(opt.aro_lifetime(), 3600);
        assert_eq!(opt.aro_eui64(), EUI64);
    }

    #[test]
    fn test_earo_repr_roundtrip() {
        let opt = NdiscOption::new_unchecked(&EARO_OPT_BYTES[..]);
        let repr = Repr::parse(&opt).unwrap();
        assert_eq!(
            repr,
            Repr::AddressRegistration(AddressRegistration::new(AroStatus::Success, 3600, EUI64))
        );
        assert_eq!(repr.buffer_len(), 16);

        let mut bytes = [0u8; 16];
        repr.emit(&mut NdiscOption::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes, EARO_OPT_BYTES);
    }

    #[test]
    fn test_sllao_eui64_padding() {
        let repr = Repr::SourceLinkLayerAddr(EUI64);
        assert_eq!(repr.buffer_len(), 16);

        let mut bytes = [0xa5u8; 16];
        repr.emit(&mut NdiscOption::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 0x02);
        assert_eq!(&bytes[2..10], EUI64.as_bytes());
        // padding up to the 8-octet unit boundary is zeroed
        assert_eq!(&bytes[10..], &[0; 6]);

        let opt = NdiscOption::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&opt).unwrap(), repr);
    }

    #[test]
    fn test_option_zero_length_rejected() {
        let bytes = [0x01, 0x00, 0, 0, 0, 0, 0, 0];
        assert!(NdiscOption::new_checked(&bytes[..]).is_err());
    }

    #[test]
    fn test_short_earo_rejected() {
        // length says 2 units but only one is present
        let bytes = [0x21, 0x02, 0, 0, 0, 0, 0, 0];
        assert!(NdiscOption::new_checked(&bytes[..]).is_err());
    }
}
