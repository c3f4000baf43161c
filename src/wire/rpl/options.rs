use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, InstanceId, Result};
use crate::wire::Ipv6Address as Address;

/// A read/write wrapper around a RPL Control Message Option.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet<T: AsRef<[u8]>> {
    buffer: T,
}

enum_with_unknown! {
    pub enum OptionType(u8) {
        Pad1 = 0x00,
        PadN = 0x01,
        DagMetricContainer = 0x02,
        RouteInformation = 0x03,
        DodagConfiguration = 0x04,
        RplTarget = 0x05,
        TransitInformation = 0x06,
        SolicitedInformation = 0x07,
        PrefixInformation = 0x08,
        RplTargetDescriptor = 0x09,
    }
}

impl From<&Repr<'_>> for OptionType {
    fn from(repr: &Repr) -> Self {
        match repr {
            Repr::Pad1 => Self::Pad1,
            Repr::PadN(_) => Self::PadN,
            Repr::DodagConfiguration { .. } => Self::DodagConfiguration,
            Repr::RplTarget { .. } => Self::RplTarget,
            Repr::TransitInformation { .. } => Self::TransitInformation,
            Repr::SolicitedInformation { .. } => Self::SolicitedInformation,
            Repr::PrefixInformation { .. } => Self::PrefixInformation,
            Repr::Unknown { option_type, .. } => Self::Unknown(*option_type),
        }
    }
}

mod field {
    use crate::wire::field::*;

    // Generic fields.
    pub const TYPE: usize = 0;
    pub const LENGTH: usize = 1;

    pub const PADN: Rest = 2..;

    // DODAG Configuration fields.
    pub const DODAG_CONF_FLAGS: usize = 2;
    pub const DODAG_CONF_DIO_INTERVAL_DOUBLINGS: usize = 3;
    pub const DODAG_CONF_DIO_INTERVAL_MINIMUM: usize = 4;
    pub const DODAG_CONF_DIO_REDUNDANCY_CONSTANT: usize = 5;
    pub const DODAG_CONF_MAX_RANK_INCREASE: Field = 6..8;
    pub const DODAG_CONF_MIN_HOP_RANK_INCREASE: Field = 8..10;
    pub const DODAG_CONF_OBJECTIVE_CODE_POINT: Field = 10..12;
    pub const DODAG_CONF_RESERVED: usize = 12;
    pub const DODAG_CONF_DEFAULT_LIFETIME: usize = 13;
    pub const DODAG_CONF_LIFETIME_UNIT: Field = 14..16;
    pub const DODAG_CONF_LEN: usize = 14;

    // RPL Target fields.
    pub const RPL_TARGET_FLAGS: usize = 2;
    pub const RPL_TARGET_PREFIX_LENGTH: usize = 3;
    pub const RPL_TARGET_PREFIX: Rest = 4..;

    // Transit Information fields.
    pub const TRANSIT_INFO_FLAGS: usize = 2;
    pub const TRANSIT_INFO_PATH_CONTROL: usize = 3;
    pub const TRANSIT_INFO_PATH_SEQUENCE: usize = 4;
    pub const TRANSIT_INFO_PATH_LIFETIME: usize = 5;
    pub const TRANSIT_INFO_PARENT_ADDRESS: Field = 6..6 + 16;

    // Solicited Information fields.
    pub const SOLICITED_INFO_RPL_INSTANCE_ID: usize = 2;
    pub const SOLICITED_INFO_FLAGS: usize = 3;
    pub const SOLICITED_INFO_DODAG_ID: Field = 4..20;
    pub const SOLICITED_INFO_VERSION_NUMBER: usize = 20;
    pub const SOLICITED_INFO_LEN: usize = 19;

    // Prefix Information fields.
    pub const PREFIX_INFO_PREFIX_LENGTH: usize = 2;
    pub const PREFIX_INFO_FLAGS: usize = 3;
    pub const PREFIX_INFO_VALID_LIFETIME: Field = 4..8;
    pub const PREFIX_INFO_PREFERRED_LIFETIME: Field = 8..12;
    pub const PREFIX_INFO_RESERVED2: Field = 12..16;
    pub const PREFIX_INFO_PREFIX: Field = 16..16 + 16;
    pub const PREFIX_INFO_LEN: usize = 30;
}

/// Getters for the RPL Control Message Options.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Create a raw octet buffer with RPL Control Message Option
    /// structure.
    #[inline]
    pub fn new_unchecked(buffer: T) -> Self {
        Self { buffer }
    }

    /// Shorthand for a combination of [new_unchecked] and [check_len].
    ///
    /// [new_unchecked]: #method.new_unchecked
    /// [check_len]: #method.check_len
    #[inline]
    pub fn new_checked(buffer: T) -> Result<Self> {
        let packet = Self::new_unchecked(buffer);
        packet.check_len()?;
        Ok(packet)
    }

    /// Ensure that no accessor method will panic if called.
    /// Returns `Err(Error)` if the buffer is too short.
    #[inline]
    pub fn check_len(&self) -> Result<()> {
        let data = self.buffer.as_ref();

        if data.is_empty() {
            return Err(Error);
        }
        if self.option_type() == OptionType::Pad1 {
            return Ok(());
        }
        if data.len() < 2 || data.len() < 2 + self.option_length() as usize {
            return Err(Error);
        }

        Ok(())
    }

    /// Return the type field.
    #[inline]
    pub fn option_type(&self) -> OptionType {
        OptionType::from(self.buffer.as_ref()[field::TYPE])
    }

    /// Return the length field, which does not include the first two
    /// octets of the option.
    #[inline]
    pub fn option_length(&self) -> u8 {
        self.buffer.as_ref()[field::LENGTH]
    }
}

/// Getters for the DODAG configuration option.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the flag indicating that authentication is enabled.
    #[inline]
    pub fn authentication_enabled(&self) -> bool {
        self.buffer.as_ref()[field::DODAG_CONF_FLAGS] & 0b0000_1000 != 0
    }

    /// Return the Path Control Size.
    #[inline]
    pub fn path_control_size(&self) -> u8 {
        self.buffer.as_ref()[field::DODAG_CONF_FLAGS] & 0b0000_0111
    }

    /// Return the DIO interval doublings.
    #[inline]
    pub fn dio_interval_doublings(&self) -> u8 {
        self.buffer.as_ref()[field::DODAG_CONF_DIO_INTERVAL_DOUBLINGS]
    }

    /// Return the DIO interval minimum.
    #[inline]
    pub fn dio_interval_minimum(&self) -> u8 {
        self.buffer.as_ref()[field::DODAG_CONF_DIO_INTERVAL_MINIMUM]
    }

    /// Return the DIO redundancy constant.
    #[inline]
    pub fn dio_redundancy_constant(&self) -> u8 {
        self.buffer.as_ref()[field::DODAG_CONF_DIO_REDUNDANCY_CONSTANT]
    }

    /// Return the maximum rank increase.
    #[inline]
    pub fn max_rank_increase(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DODAG_CONF_MAX_RANK_INCREASE])
    }

    /// Return the minimum hop rank increase.
    #[inline]
    pub fn minimum_hop_rank_increase(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DODAG_CONF_MIN_HOP_RANK_INCREASE])
    }

    /// Return the objective code point.
    #[inline]
    pub fn objective_code_point(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DODAG_CONF_OBJECTIVE_CODE_POINT])
    }

    /// Return the default lifetime.
    #[inline]
    pub fn default_lifetime(&self) -> u8 {
        self.buffer.as_ref()[field::DODAG_CONF_DEFAULT_LIFETIME]
    }

    /// Return the lifetime unit, in seconds.
    #[inline]
    pub fn lifetime_unit(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DODAG_CONF_LIFETIME_UNIT])
    }
}

/// Getters for the RPL Target option.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the target prefix length.
    #[inline]
    pub fn target_prefix_length(&self) -> u8 {
        self.buffer.as_ref()[field::RPL_TARGET_PREFIX_LENGTH]
    }

    /// Return the target prefix.
    #[inline]
    pub fn target_prefix(&self) -> &[u8] {
        &self.buffer.as_ref()[field::RPL_TARGET_PREFIX][..self.option_length() as usize - 2]
    }
}

/// Getters for the Transit Information option.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the flag indicating that the parent is external to the
    /// RPL network.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.buffer.as_ref()[field::TRANSIT_INFO_FLAGS] & 0b1000_0000 != 0
    }

    /// Return the Path Control field.
    #[inline]
    pub fn path_control(&self) -> u8 {
        self.buffer.as_ref()[field::TRANSIT_INFO_PATH_CONTROL]
    }

    /// Return the Path Sequence field.
    #[inline]
    pub fn path_sequence(&self) -> u8 {
        self.buffer.as_ref()[field::TRANSIT_INFO_PATH_SEQUENCE]
    }

    /// Return the Path Lifetime field.
    #[inline]
    pub fn path_lifetime(&self) -> u8 {
        self.buffer.as_ref()[field::TRANSIT_INFO_PATH_LIFETIME]
    }

    /// Return the parent address, carried in non-storing mode.
    #[inline]
    pub fn parent_address(&self) -> Option<Address> {
        if self.option_length() as usize >= field::TRANSIT_INFO_PARENT_ADDRESS.end - 2 {
            Some(Address::from_bytes(
                &self.buffer.as_ref()[field::TRANSIT_INFO_PARENT_ADDRESS],
            ))
        } else {
            None
        }
    }
}

/// Getters for the Solicited Information option.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the RPL instance id predicate value.
    #[inline]
    pub fn solicited_information_rpl_instance_id(&self) -> InstanceId {
        InstanceId::from(self.buffer.as_ref()[field::SOLICITED_INFO_RPL_INSTANCE_ID])
    }

    /// Return the version predicate flag.
    #[inline]
    pub fn version_predicate(&self) -> bool {
        self.buffer.as_ref()[field::SOLICITED_INFO_FLAGS] & 0b1000_0000 != 0
    }

    /// Return the instance id predicate flag.
    #[inline]
    pub fn instance_id_predicate(&self) -> bool {
        self.buffer.as_ref()[field::SOLICITED_INFO_FLAGS] & 0b0100_0000 != 0
    }

    /// Return the DODAG id predicate flag.
    #[inline]
    pub fn dodag_id_predicate(&self) -> bool {
        self.buffer.as_ref()[field::SOLICITED_INFO_FLAGS] & 0b0010_0000 != 0
    }

    /// Return the DODAG id predicate value.
    #[inline]
    pub fn solicited_information_dodag_id(&self) -> Address {
        Address::from_bytes(&self.buffer.as_ref()[field::SOLICITED_INFO_DODAG_ID])
    }

    /// Return the version number predicate value.
    #[inline]
    pub fn solicited_information_version_number(&self) -> u8 {
        self.buffer.as_ref()[field::SOLICITED_INFO_VERSION_NUMBER]
    }
}

/// Getters for the Prefix Information option.
impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the prefix length.
    #[inline]
    pub fn prefix_info_prefix_length(&self) -> u8 {
        self.buffer.as_ref()[field::PREFIX_INFO_PREFIX_LENGTH]
    }

    /// Return the on-link flag.
    #[inline]
    pub fn on_link(&self) -> bool {
        self.buffer.as_ref()[field::PREFIX_INFO_FLAGS] & 0b1000_0000 != 0
    }

    /// Return the autonomous address-configuration flag.
    #[inline]
    pub fn autonomous_address_configuration(&self) -> bool {
        self.buffer.as_ref()[field::PREFIX_INFO_FLAGS] & 0b0100_0000 != 0
    }

    /// Return the router-address flag.
    #[inline]
    pub fn router_address(&self) -> bool {
        self.buffer.as_ref()[field::PREFIX_INFO_FLAGS] & 0b0010_0000 != 0
    }

    /// Return the valid lifetime, in seconds.
    #[inline]
    pub fn valid_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::PREFIX_INFO_VALID_LIFETIME])
    }

    /// Return the preferred lifetime, in seconds.
    #[inline]
    pub fn preferred_lifetime(&self) -> u32 {
        NetworkEndian::read_u32(&self.buffer.as_ref()[field::PREFIX_INFO_PREFERRED_LIFETIME])
    }

    /// Return the prefix.
    #[inline]
    pub fn destination_prefix(&self) -> Address {
        Address::from_bytes(&self.buffer.as_ref()[field::PREFIX_INFO_PREFIX])
    }
}

impl<'p, T: AsRef<[u8]> + ?Sized> Packet<&'p T> {
    /// Return the PadN padding octets.
    #[inline]
    pub fn padding(&self) -> &'p [u8] {
        &self.buffer.as_ref()[field::PADN][..self.option_length() as usize]
    }
}

/// Setters for the RPL Control Message Options.
impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the type field.
    #[inline]
    pub fn set_option_type(&mut self, option_type: OptionType) {
        self.buffer.as_mut()[field::TYPE] = option_type.into();
    }

    /// Set the length field.
    #[inline]
    pub fn set_option_length(&mut self, length: u8) {
        self.buffer.as_mut()[field::LENGTH] = length;
    }

    #[inline]
    fn clear_dodag_conf_flags(&mut self) {
        self.buffer.as_mut()[field::DODAG_CONF_FLAGS] = 0;
    }

    #[inline]
    fn set_authentication_enabled(&mut self, enabled: bool) {
        let data = &mut self.buffer.as_mut()[field::DODAG_CONF_FLAGS];
        if enabled {
            *data |= 0b0000_1000;
        }
    }

    #[inline]
    fn set_path_control_size(&mut self, size: u8) {
        let data = &mut self.buffer.as_mut()[field::DODAG_CONF_FLAGS];
        *data |= size & 0b0000_0111;
    }

    #[inline]
    fn set_dio_interval_doublings(&mut self, value: u8) {
        self.buffer.as_mut()[field::DODAG_CONF_DIO_INTERVAL_DOUBLINGS] = value;
    }

    #[inline]
    fn set_dio_interval_minimum(&mut self, value: u8) {
        self.buffer.as_mut()[field::DODAG_CONF_DIO_INTERVAL_MINIMUM] = value;
    }

    #[inline]
    fn set_dio_redundancy_constant(&mut self, value: u8) {
        self.buffer.as_mut()[field::DODAG_CONF_DIO_REDUNDANCY_CONSTANT] = value;
    }

    #[inline]
    fn set_max_rank_increase(&mut self, value: u16) {
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[field::DODAG_CONF_MAX_RANK_INCREASE],
            value,
        );
    }

    #[inline]
    fn set_minimum_hop_rank_increase(&mut self, value: u16) {
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[field::DODAG_CONF_MIN_HOP_RANK_INCREASE],
            value,
        );
    }

    #[inline]
    fn set_objective_code_point(&mut self, value: u16) {
        NetworkEndian::write_u16(
            &mut self.buffer.as_mut()[field::DODAG_CONF_OBJECTIVE_CODE_POINT],
            value,
        );
    }

    #[inline]
    fn set_default_lifetime(&mut self, value: u8) {
        self.buffer.as_mut()[field::DODAG_CONF_RESERVED] = 0;
        self.buffer.as_mut()[field::DODAG_CONF_DEFAULT_LIFETIME] = value;
    }

    #[inline]
    fn set_lifetime_unit(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DODAG_CONF_LIFETIME_UNIT], value);
    }

    #[inline]
    fn set_rpl_target_prefix_length(&mut self, value: u8) {
        self.buffer.as_mut()[field::RPL_TARGET_FLAGS] = 0;
        self.buffer.as_mut()[field::RPL_TARGET_PREFIX_LENGTH] = value;
    }

    #[inline]
    fn set_rpl_target_prefix(&mut self, prefix: &[u8]) {
        self.buffer.as_mut()[field::RPL_TARGET_PREFIX][..prefix.len()].copy_from_slice(prefix);
    }

    #[inline]
    fn set_transit_info_flags(&mut self, external: bool) {
        self.buffer.as_mut()[field::TRANSIT_INFO_FLAGS] = if external { 0b1000_0000 } else { 0 };
    }

    #[inline]
    fn set_transit_info_path_control(&mut self, value: u8) {
        self.buffer.as_mut()[field::TRANSIT_INFO_PATH_CONTROL] = value;
    }

    #[inline]
    fn set_transit_info_path_sequence(&mut self, value: u8) {
        self.buffer.as_mut()[field::TRANSIT_INFO_PATH_SEQUENCE] = value;
    }

    #[inline]
    fn set_transit_info_path_lifetime(&mut self, value: u8) {
        self.buffer.as_mut()[field::TRANSIT_INFO_PATH_LIFETIME] = value;
    }

    #[inline]
    fn set_transit_info_parent_address(&mut self, address: Address) {
        self.buffer.as_mut()[field::TRANSIT_INFO_PARENT_ADDRESS]
            .copy_from_slice(address.as_bytes());
    }

    #[inline]
    fn set_solicited_information_rpl_instance_id(&mut self, value: u8) {
        self.buffer.as_mut()[field::SOLICITED_INFO_RPL_INSTANCE_ID] = value;
    }

    #[inline]
    fn set_solicited_information_flags(
        &mut self,
        version_predicate: bool,
        instance_id_predicate: bool,
        dodag_id_predicate: bool,
    ) {
        let mut flags = 0;
        if version_predicate {
            flags |= 0b1000_0000;
        }
        if instance_id_predicate {
            flags |= 0b0100_0000;
        }
        if dodag_id_predicate {
            flags |= 0b0010_0000;
        }
        self.buffer.as_mut()[field::SOLICITED_INFO_FLAGS] = flags;
    }

    #[inline]
    fn set_solicited_information_dodag_id(&mut self, address: Address) {
        self.buffer.as_mut()[field::SOLICITED_INFO_DODAG_ID].copy_from_slice(address.as_bytes());
    }

    #[inline]
    fn set_solicited_information_version_number(&mut self, value: u8) {
        self.buffer.as_mut()[field::SOLICITED_INFO_VERSION_NUMBER] = value;
    }

    #[inline]
    fn set_prefix_info_prefix_length(&mut self, value: u8) {
        self.buffer.as_mut()[field::PREFIX_INFO_PREFIX_LENGTH] = value;
    }

    #[inline]
    fn set_prefix_info_flags(&mut self, on_link: bool, autonomous: bool, router_address: bool) {
        let mut flags = 0;
        if on_link {
            flags |= 0b1000_0000;
        }
        if autonomous {
            flags |= 0b0100_0000;
        }
        if router_address {
            flags |= 0b0010_0000;
        }
        self.buffer.as_mut()[field::PREFIX_INFO_FLAGS] = flags;
    }

    #[inline]
    fn set_prefix_info_valid_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(
            &mut self.buffer.as_mut()[field::PREFIX_INFO_VALID_LIFETIME],
            value,
        );
    }

    #[inline]
    fn set_prefix_info_preferred_lifetime(&mut self, value: u32) {
        NetworkEndian::write_u32(
            &mut self.buffer.as_mut()[field::PREFIX_INFO_PREFERRED_LIFETIME],
            value,
        );
    }

    #[inline]
    fn set_prefix_info_destination_prefix(&mut self, address: Address) {
        let data = self.buffer.as_mut();
        data[field::PREFIX_INFO_RESERVED2].fill(0);
        data[field::PREFIX_INFO_PREFIX].copy_from_slice(address.as_bytes());
    }

    /// Set the PadN padding octets to zero.
    #[inline]
    pub fn clear_padding(&mut self) {
        let len = self.option_length() as usize;
        self.buffer.as_mut()[field::PADN][..len].fill(0);
    }
}

/// A high-level representation of a RPL Control Message Option.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Repr<'p> {
    Pad1,
    PadN(u8),
    DodagConfiguration {
        authentication_enabled: bool,
        path_control_size: u8,
        dio_interval_doublings: u8,
        dio_interval_min: u8,
        dio_redundancy_constant: u8,
        max_rank_increase: u16,
        minimum_hop_rank_increase: u16,
        objective_code_point: u16,
        default_lifetime: u8,
        lifetime_unit: u16,
    },
    RplTarget {
        prefix_length: u8,
        prefix: Address,
    },
    TransitInformation {
        external: bool,
        path_control: u8,
        path_sequence: u8,
        path_lifetime: u8,
        parent_address: Option<Address>,
    },
    SolicitedInformation {
        rpl_instance_id: InstanceId,
        version_predicate: bool,
        instance_id_predicate: bool,
        dodag_id_predicate: bool,
        dodag_id: Address,
        version_number: u8,
    },
    PrefixInformation {
        prefix_length: u8,
        on_link: bool,
        autonomous_address_configuration: bool,
        router_address: bool,
        valid_lifetime: u32,
        preferred_lifetime: u32,
        destination_prefix: Address,
    },
    Unknown {
        option_type: u8,
        length: u8,
        data: &'p [u8],
    },
}

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Pad1 => write!(f, "Pad1"),
            Repr::PadN(n) => write!(f, "PadN({n})"),
            Repr::DodagConfiguration {
                dio_interval_doublings,
                dio_interval_min,
                minimum_hop_rank_increase,
                ..
            } => write!(
                f,
                "DODAG configuration Imin={dio_interval_min} doublings={dio_interval_doublings} \
                 MinHopRankIncrease={minimum_hop_rank_increase}"
            ),
            Repr::RplTarget {
                prefix_length,
                prefix,
            } => write!(f, "Target {prefix}/{prefix_length}"),
            Repr::TransitInformation { parent_address, .. } => {
                write!(f, "Transit information parent={parent_address:?}")
            }
            Repr::SolicitedInformation { dodag_id, .. } => {
                write!(f, "Solicited information dodag-id={dodag_id}")
            }
            Repr::PrefixInformation {
                destination_prefix,
                prefix_length,
                ..
            } => write!(f, "Prefix information {destination_prefix}/{prefix_length}"),
            Repr::Unknown { option_type, .. } => write!(f, "Unknown({option_type})"),
        }
    }
}

impl<'p> Repr<'p> {
    /// Parse a RPL Control Message Option and return a high-level
    /// representation.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &Packet<&'p T>) -> Result<Self> {
        packet.check_len()?;

        match packet.option_type() {
            OptionType::Pad1 => Ok(Repr::Pad1),
            OptionType::PadN => Ok(Repr::PadN(packet.option_length())),
            OptionType::DodagConfiguration => {
                if (packet.option_length() as usize) < field::DODAG_CONF_LEN {
                    return Err(Error);
                }
                Ok(Repr::DodagConfiguration {
                    authentication_enabled: packet.authentication_enabled(),
                    path_control_size: packet.path_control_size(),
                    dio_interval_doublings: packet.dio_interval_doublings(),
                    dio_interval_min: packet.dio_interval_minimum(),
                    dio_redundancy_constant: packet.dio_redundancy_constant(),
                    max_rank_increase: packet.max_rank_increase(),
                    minimum_hop_rank_increase: packet.minimum_hop_rank_increase(),
                    objective_code_point: packet.objective_code_point(),
                    default_lifetime: packet.default_lifetime(),
                    lifetime_unit: packet.lifetime_unit(),
                })
            }
            OptionType::RplTarget => {
                if (packet.option_length() as usize) < 2 {
                    return Err(Error);
                }
                let prefix_length = packet.target_prefix_length();
                let prefix = packet.target_prefix();
                if prefix.len() > 16 {
                    return Err(Error);
                }
                let mut bytes = [0u8; 16];
                bytes[..prefix.len()].copy_from_slice(prefix);
                Ok(Repr::RplTarget {
                    prefix_length,
                    prefix: Address(bytes),
                })
            }
            OptionType::TransitInformation => {
                if (packet.option_length() as usize) < 4 {
                    return Err(Error);
                }
                Ok(Repr::TransitInformation {
                    external: packet.is_external(),
                    path_control: packet.path_control(),
                    path_sequence: packet.path_sequence(),
                    path_lifetime: packet.path_lifetime(),
                    parent_address: packet.parent_address(),
                })
            }
            OptionType::SolicitedInformation => {
                if (packet.option_length() as usize) != field::SOLICITED_INFO_LEN {
                    return Err(Error);
                }
                Ok(Repr::SolicitedInformation {
                    rpl_instance_id: packet.solicited_information_rpl_instance_id(),
                    version_predicate: packet.version_predicate(),
                    instance_id_predicate: packet.instance_id_predicate(),
                    dodag_id_predicate: packet.dodag_id_predicate(),
                    dodag_id: packet.solicited_information_dodag_id(),
                    version_number: packet.solicited_information_version_number(),
                })
            }
            OptionType::PrefixInformation => {
                if (packet.option_length() as usize) < field::PREFIX_INFO_LEN {
                    return Err(Error);
                }
                Ok(Repr::PrefixInformation {
                    prefix_length: packet.prefix_info_prefix_length(),
                    on_link: packet.on_link(),
                    autonomous_address_configuration: packet.autonomous_address_configuration(),
                    router_address: packet.router_address(),
                    valid_lifetime: packet.valid_lifetime(),
                    preferred_lifetime: packet.preferred_lifetime(),
                    destination_prefix: packet.destination_prefix(),
                })
            }
            OptionType::DagMetricContainer
            | OptionType::RouteInformation
            | OptionType::RplTargetDescriptor
            | OptionType::Unknown(_) => Ok(Repr::Unknown {
                option_type: packet.buffer.as_ref()[field::TYPE],
                length: packet.option_length(),
                data: &packet.buffer.as_ref()[2..2 + packet.option_length() as usize],
            }),
        }
    }

    /// Return the length of a packet that will be emitted from this
    /// high-level representation.
    pub fn buffer_len(&self) -> usize {
        match self {
            Repr::Pad1 => 1,
            Repr::PadN(size) => 2 + *size as usize,
            Repr::DodagConfiguration { .. } => 2 + field::DODAG_CONF_LEN,
            Repr::RplTarget { .. } => 2 + 2 + 16,
            Repr::TransitInformation { parent_address, .. } => {
                2 + 4 + if parent_address.is_some() { 16 } else { 0 }
            }
            Repr::SolicitedInformation { .. } => 2 + field::SOLICITED_INFO_LEN,
            Repr::PrefixInformation { .. } => 2 + field::PREFIX_INFO_LEN,
            Repr::Unknown { length, .. } => 2 + *length as usize,
        }
    }

    /// Emit a high-level representation into a RPL Control Message
    /// Option.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, packet: &mut Packet<&mut T>) {
        let option_length = self.buffer_len() as u8;
        packet.set_option_type(self.into());
        if !matches!(self, Repr::Pad1) {
            packet.set_option_length(option_length - 2);
        }

        match self {
            Repr::Pad1 => (),
            Repr::PadN(_) => packet.clear_padding(),
            Repr::DodagConfiguration {
                authentication_enabled,
                path_control_size,
                dio_interval_doublings,
                dio_interval_min,
                dio_redundancy_constant,
                max_rank_increase,
                minimum_hop_rank_increase,
                objective_code_point,
                default_lifetime,
                lifetime_unit,
            } => {
                packet.clear_dodag_conf_flags();
                packet.set_authentication_enabled(*authentication_enabled);
                packet.set_path_control_size(*path_control_size);
                packet.set_dio_interval_doublings(*dio_interval_doublings);
                packet.set_dio_interval_minimum(*dio_interval_min);
                packet.set_dio_redundancy_constant(*dio_redundancy_constant);
                packet.set_max_rank_increase(*max_rank_increase);
                packet.set_minimum_hop_rank_increase(*minimum_hop_rank_increase);
                packet.set_objective_code_point(*objective_code_point);
                packet.set_default_lifetime(*default_lifetime);
                packet.set_lifetime_unit(*lifetime_unit);
            }
            Repr::RplTarget {
                prefix_length,
                prefix,
            } => {
                packet.set_rpl_target_prefix_length(*prefix_length);
                packet.set_rpl_target_prefix(prefix.as_bytes());
            }
            Repr::TransitInformation {
                external,
                path_control,
                path_sequence,
                path_lifetime,
                parent_address,
            } => {
                packet.set_transit_info_flags(*external);
                packet.set_transit_info_path_control(*path_control);
                packet.set_transit_info_path_sequence(*path_sequence);
                packet.set_transit_info_path_lifetime(*path_lifetime);
                if let Some(address) = parent_address {
                    packet.set_transit_info_parent_address(*address);
                }
            }
            Repr::SolicitedInformation {
                rpl_instance_id,
                version_predicate,
                instance_id_predicate,
                dodag_id_predicate,
                dodag_id,
                version_number,
            } => {
                packet.set_solicited_information_rpl_instance_id((*rpl_instance_id).into());
                packet.set_solicited_information_flags(
                    *version_predicate,
                    *instance_id_predicate,
                    *dodag_id_predicate,
                );
                packet.set_solicited_information_dodag_id(*dodag_id);
                packet.set_solicited_information_version_number(*version_number);
            }
            Repr::PrefixInformation {
                prefix_length,
                on_link,
                autonomous_address_configuration,
                router_address,
                valid_lifetime,
                preferred_lifetime,
                destination_prefix,
            } => {
                packet.set_prefix_info_prefix_length(*prefix_length);
                packet.set_prefix_info_flags(
                    *on_link,
                    *autonomous_address_configuration,
                    *router_address,
                );
                packet.set_prefix_info_valid_lifetime(*valid_lifetime);
                packet.set_prefix_info_preferred_lifetime(*preferred_lifetime);
                packet.set_prefix_info_destination_prefix(*destination_prefix);
            }
            Repr::Unknown {
                length,
                data,
                ..
            } => {
                packet.buffer.as_mut()[2..2 + *length as usize].copy_from_slice(data);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dodag_configuration_roundtrip() {
        let repr = Repr::DodagConfiguration {
            authentication_enabled: false,
            path_control_size: 0,
            dio_interval_doublings: 8,
            dio_interval_min: 12,
            dio_redundancy_constant: 10,
            max_rank_increase: 0,
            minimum_hop_rank_increase: 256,
            objective_code_point: 0,
            default_lifetime: 30,
            lifetime_unit: 60,
        };
        assert_eq!(repr.buffer_len(), 16);

        let mut bytes = [0u8; 16];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], 14);

        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }

    #[test]
    fn transit_information_without_parent() {
        let repr = Repr::TransitInformation {
            external: false,
            path_control: 0,
            path_sequence: 0,
            path_lifetime: 30,
            parent_address: None,
        };
        assert_eq!(repr.buffer_len(), 6);

        let mut bytes = [0u8; 6];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }

    #[test]
    fn solicited_information_roundtrip() {
        let repr = Repr::SolicitedInformation {
            rpl_instance_id: InstanceId::Global(0x1e),
            version_predicate: true,
            instance_id_predicate: true,
            dodag_id_predicate: false,
            dodag_id: Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1),
            version_number: 240,
        };
        assert_eq!(repr.buffer_len(), 21);

        let mut bytes = [0u8; 21];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }

    #[test]
    fn pad_options() {
        let data = [0x00u8];
        let packet = Packet::new_checked(&data[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), Repr::Pad1);

        let data = [0x01u8, 0x02, 0x00, 0x00];
        let packet = Packet::new_checked(&data[..]).unwrap();
        let repr = Repr::parse(&packet).unwrap();
        assert_eq!(repr, Repr::PadN(2));
        assert_eq!(repr.buffer_len(), 4);
    }

    #[test]
    fn truncated_option_rejected() {
        let data = [0x04u8, 0x0e, 0x00, 0x00];
        assert!(Packet::new_checked(&data[..]).is_err());
    }
}
