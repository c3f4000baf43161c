//! Implementation of the RPL control message formats. See [RFC 6550 § 6].
//!
//! [RFC 6550 § 6]: https://datatracker.ietf.org/doc/html/rfc6550#section-6

use byteorder::{ByteOrder, NetworkEndian};
use core::fmt;

use super::{Error, Result};
use crate::wire::icmpv6::{Message, Packet};
use crate::wire::Ipv6Address as Address;

pub mod options;

mod field {
    use crate::wire::field::*;

    pub const RPL_INSTANCE_ID: usize = 4;

    // DODAG information solicitation fields (DIS)
    pub const DIS_FLAGS: usize = 4;
    pub const DIS_RESERVED: usize = 5;

    // DODAG information object fields (DIO)
    pub const DIO_VERSION_NUMBER: usize = 5;
    pub const DIO_RANK: Field = 6..8;
    pub const DIO_GROUNDED: usize = 8;
    pub const DIO_MOP: usize = 8;
    pub const DIO_PRF: usize = 8;
    pub const DIO_DTSN: usize = 9;
    pub const DIO_FLAGS: usize = 10;
    pub const DIO_RESERVED: usize = 11;
    pub const DIO_DODAG_ID: Field = 12..12 + 16;

    // Destination advertisement object (DAO)
    pub const DAO_K: usize = 5;
    pub const DAO_D: usize = 5;
    pub const DAO_RESERVED: usize = 6;
    pub const DAO_SEQUENCE: usize = 7;
    pub const DAO_DODAG_ID: Field = 8..8 + 16;

    // Destination advertisement object ack (DAO-ACK)
    pub const DAO_ACK_D: usize = 4 + 1;
    pub const DAO_ACK_SEQUENCE: usize = 6;
    pub const DAO_ACK_STATUS: usize = 7;
    pub const DAO_ACK_DODAG_ID: Field = 8..8 + 16;
}

enum_with_unknown! {
    /// RPL Control Message subtypes.
    pub enum RplControlMessage(u8) {
        DodagInformationSolicitation = 0x00,
        DodagInformationObject = 0x01,
        DestinationAdvertisementObject = 0x02,
        DestinationAdvertisementObjectAck = 0x03,
        SecureDodagInformationSolicitation = 0x80,
        SecureDodagInformationObject = 0x81,
        SecureDestinationAdvertisementObject = 0x82,
        SecureDestinationAdvertisementObjectAck = 0x83,
        ConsistencyCheck = 0x8a,
    }
}

impl fmt::Display for RplControlMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RplControlMessage::DodagInformationSolicitation => {
                write!(f, "DODAG information solicitation (DIS)")
            }
            RplControlMessage::DodagInformationObject => {
                write!(f, "DODAG information object (DIO)")
            }
            RplControlMessage::DestinationAdvertisementObject => {
                write!(f, "destination advertisement object (DAO)")
            }
            RplControlMessage::DestinationAdvertisementObjectAck => write!(
                f,
                "destination advertisement object acknowledgement (DAO-ACK)"
            ),
            RplControlMessage::SecureDodagInformationSolicitation => {
                write!(f, "secure DODAG information solicitation (DIS)")
            }
            RplControlMessage::SecureDodagInformationObject => {
                write!(f, "secure DODAG information object (DIO)")
            }
            RplControlMessage::SecureDestinationAdvertisementObject => {
                write!(f, "secure destination advertisement object (DAO)")
            }
            RplControlMessage::SecureDestinationAdvertisementObjectAck => write!(
                f,
                "secure destination advertisement object acknowledgement (DAO-ACK)"
            ),
            RplControlMessage::ConsistencyCheck => write!(f, "consistency check (CC)"),
            RplControlMessage::Unknown(id) => write!(f, "{id}"),
        }
    }
}

enum_with_unknown! {
    /// RPL Mode of Operation, advertised in the DIO base object.
    pub enum ModeOfOperation(u8) {
        NoDownwardRoutesMaintained = 0x00,
        NonStoringMode = 0x01,
        StoringModeWithoutMulticast = 0x02,
        StoringModeWithMulticast = 0x03,
    }
}

impl Default for ModeOfOperation {
    fn default() -> Self {
        Self::NonStoringMode
    }
}

/// A RPL instance id, either global (set by the DODAG root) or local.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InstanceId {
    Global(u8),
    Local(u8),
}

impl From<u8> for InstanceId {
    fn from(val: u8) -> Self {
        const MASK: u8 = 0b0111_1111;

        if ((val >> 7) & 0b1) == 0b0 {
            Self::Global(val & MASK)
        } else {
            Self::Local(val & MASK)
        }
    }
}

impl From<InstanceId> for u8 {
    fn from(id: InstanceId) -> Self {
        match id {
            InstanceId::Global(val) => 0b0111_1111 & val,
            InstanceId::Local(val) => 0b1000_0000 | (0b0111_1111 & val),
        }
    }
}

impl InstanceId {
    /// Return `true` when the instance id is a global instance id.
    pub fn is_global(&self) -> bool {
        matches!(self, InstanceId::Global(_))
    }

    /// Return `true` when the instance id is a local instance id.
    pub fn is_local(&self) -> bool {
        matches!(self, InstanceId::Local(_))
    }
}

/// The infinite rank, advertised when poisoning a sub-DODAG.
/// See [RFC 6550 § 17].
///
/// [RFC 6550 § 17]: https://datatracker.ietf.org/doc/html/rfc6550#section-17
pub const INFINITE_RANK: u16 = 0xffff;

impl<T: AsRef<[u8]>> Packet<T> {
    /// Return the RPL instance id.
    #[inline]
    pub fn rpl_instance_id(&self) -> InstanceId {
        InstanceId::from(self.buffer.as_ref()[field::RPL_INSTANCE_ID])
    }

    /// Return the DIO version number.
    #[inline]
    pub fn dio_version_number(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_VERSION_NUMBER]
    }

    /// Return the DIO rank.
    #[inline]
    pub fn dio_rank(&self) -> u16 {
        NetworkEndian::read_u16(&self.buffer.as_ref()[field::DIO_RANK])
    }

    /// Return the DIO grounded flag.
    #[inline]
    pub fn dio_grounded(&self) -> bool {
        self.buffer.as_ref()[field::DIO_GROUNDED] & 0b1000_0000 != 0
    }

    /// Return the DIO mode of operation.
    #[inline]
    pub fn dio_mode_of_operation(&self) -> ModeOfOperation {
        ModeOfOperation::from((self.buffer.as_ref()[field::DIO_MOP] >> 3) & 0b111)
    }

    /// Return the DODAG preference.
    #[inline]
    pub fn dio_dodag_preference(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_PRF] & 0b111
    }

    /// Return the DIO destination advertisement trigger sequence number.
    #[inline]
    pub fn dio_dtsn(&self) -> u8 {
        self.buffer.as_ref()[field::DIO_DTSN]
    }

    /// Return the DIO DODAG id.
    #[inline]
    pub fn dio_dodag_id(&self) -> Address {
        Address::from_bytes(&self.buffer.as_ref()[field::DIO_DODAG_ID])
    }

    /// Return the DAO K flag (a DAO-ACK is requested).
    #[inline]
    pub fn dao_ack_request(&self) -> bool {
        self.buffer.as_ref()[field::DAO_K] & 0b1000_0000 != 0
    }

    /// Return the DAO D flag (a DODAG id is present).
    #[inline]
    pub fn dao_dodag_id_present(&self) -> bool {
        self.buffer.as_ref()[field::DAO_D] & 0b0100_0000 != 0
    }

    /// Return the DAO sequence number.
    #[inline]
    pub fn dao_sequence(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_SEQUENCE]
    }

    /// Return the DAO DODAG id when the D flag is set.
    #[inline]
    pub fn dao_dodag_id(&self) -> Option<Address> {
        if self.dao_dodag_id_present() {
            Some(Address::from_bytes(
                &self.buffer.as_ref()[field::DAO_DODAG_ID],
            ))
        } else {
            None
        }
    }

    /// Return the DAO-ACK D flag (a DODAG id is present).
    #[inline]
    pub fn dao_ack_dodag_id_present(&self) -> bool {
        self.buffer.as_ref()[field::DAO_ACK_D] & 0b1000_0000 != 0
    }

    /// Return the DAO-ACK sequence number.
    #[inline]
    pub fn dao_ack_sequence(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_ACK_SEQUENCE]
    }

    /// Return the DAO-ACK status.
    #[inline]
    pub fn dao_ack_status(&self) -> u8 {
        self.buffer.as_ref()[field::DAO_ACK_STATUS]
    }

    /// Return the DAO-ACK DODAG id when the D flag is set.
    #[inline]
    pub fn dao_ack_dodag_id(&self) -> Option<Address> {
        if self.dao_ack_dodag_id_present() {
            Some(Address::from_bytes(
                &self.buffer.as_ref()[field::DAO_ACK_DODAG_ID],
            ))
        } else {
            None
        }
    }
}

impl<'p, T: AsRef<[u8]> + ?Sized> Packet<&'p T> {
    /// Return a pointer to the options of a RPL control message.
    pub fn rpl_options(&self) -> Result<&'p [u8]> {
        let buffer = &self.buffer.as_ref()[self.header_len()..];
        Ok(match RplControlMessage::from(self.msg_code()) {
            RplControlMessage::DodagInformationSolicitation => {
                buffer.get(field::DIS_RESERVED + 1 - 4..).ok_or(Error)?
            }
            RplControlMessage::DodagInformationObject => {
                buffer.get(field::DIO_DODAG_ID.end - 4..).ok_or(Error)?
            }
            RplControlMessage::DestinationAdvertisementObject if self.dao_dodag_id_present() => {
                buffer.get(field::DAO_DODAG_ID.end - 4..).ok_or(Error)?
            }
            RplControlMessage::DestinationAdvertisementObject => {
                buffer.get(field::DAO_SEQUENCE + 1 - 4..).ok_or(Error)?
            }
            RplControlMessage::DestinationAdvertisementObjectAck
                if self.dao_ack_dodag_id_present() =>
            {
                buffer.get(field::DAO_ACK_DODAG_ID.end - 4..).ok_or(Error)?
            }
            RplControlMessage::DestinationAdvertisementObjectAck => {
                buffer.get(field::DAO_ACK_STATUS + 1 - 4..).ok_or(Error)?
            }
            _ => return Err(Error),
        })
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Packet<T> {
    /// Set the RPL instance id.
    #[inline]
    pub fn set_rpl_instance_id(&mut self, value: u8) {
        self.buffer.as_mut()[field::RPL_INSTANCE_ID] = value;
    }

    /// Set the DIO version number.
    #[inline]
    pub fn set_dio_version_number(&mut self, value: u8) {
        self.buffer.as_mut()[field::DIO_VERSION_NUMBER] = value;
    }

    /// Set the DIO rank.
    #[inline]
    pub fn set_dio_rank(&mut self, value: u16) {
        NetworkEndian::write_u16(&mut self.buffer.as_mut()[field::DIO_RANK], value);
    }

    /// Set the DIO grounded flag.
    #[inline]
    pub fn set_dio_grounded(&mut self, value: bool) {
        let data = &mut self.buffer.as_mut()[field::DIO_GROUNDED];
        if value {
            *data |= 0b1000_0000;
        } else {
            *data &= !0b1000_0000;
        }
    }

    /// Set the DIO mode of operation.
    #[inline]
    pub fn set_dio_mode_of_operation(&mut self, mode: ModeOfOperation) {
        let data = &mut self.buffer.as_mut()[field::DIO_MOP];
        *data = (*data & !0b0011_1000) | ((u8::from(mode) & 0b111) << 3);
    }

    /// Set the DODAG preference.
    #[inline]
    pub fn set_dio_dodag_preference(&mut self, value: u8) {
        let data = &mut self.buffer.as_mut()[field::DIO_PRF];
        *data = (*data & !0b111) | (value & 0b111);
    }

    /// Set the DIO destination advertisement trigger sequence number.
    #[inline]
    pub fn set_dio_dtsn(&mut self, value: u8) {
        self.buffer.as_mut()[field::DIO_DTSN] = value;
    }

    /// Set the DIO DODAG id.
    #[inline]
    pub fn set_dio_dodag_id(&mut self, value: Address) {
        self.buffer.as_mut()[field::DIO_DODAG_ID].copy_from_slice(value.as_bytes());
    }

    /// Clear the flag and reserved fields of a DIO base object.
    #[inline]
    pub fn clear_dio_reserved(&mut self) {
        let data = self.buffer.as_mut();
        data[field::DIO_FLAGS] = 0;
        data[field::DIO_RESERVED] = 0;
    }

    /// Set the DAO K and D flags and clear the reserved field.
    #[inline]
    pub fn set_dao_flags(&mut self, expect_ack: bool, dodag_id_present: bool) {
        let mut flags = 0;
        if expect_ack {
            flags |= 0b1000_0000;
        }
        if dodag_id_present {
            flags |= 0b0100_0000;
        }
        self.buffer.as_mut()[field::DAO_K] = flags;
        self.buffer.as_mut()[field::DAO_RESERVED] = 0;
    }

    /// Set the DAO sequence number.
    #[inline]
    pub fn set_dao_sequence(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_SEQUENCE] = value;
    }

    /// Set the DAO DODAG id.
    #[inline]
    pub fn set_dao_dodag_id(&mut self, value: Address) {
        self.buffer.as_mut()[field::DAO_DODAG_ID].copy_from_slice(value.as_bytes());
    }

    /// Set the DAO-ACK D flag.
    #[inline]
    pub fn set_dao_ack_flags(&mut self, dodag_id_present: bool) {
        self.buffer.as_mut()[field::DAO_ACK_D] = if dodag_id_present { 0b1000_0000 } else { 0 };
    }

    /// Set the DAO-ACK sequence number.
    #[inline]
    pub fn set_dao_ack_sequence(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_ACK_SEQUENCE] = value;
    }

    /// Set the DAO-ACK status.
    #[inline]
    pub fn set_dao_ack_status(&mut self, value: u8) {
        self.buffer.as_mut()[field::DAO_ACK_STATUS] = value;
    }

    /// Set the DAO-ACK DODAG id.
    #[inline]
    pub fn set_dao_ack_dodag_id(&mut self, value: Address) {
        self.buffer.as_mut()[field::DAO_ACK_DODAG_ID].copy_from_slice(value.as_bytes());
    }

    /// Return a mutable pointer to the options of a RPL control message.
    pub fn rpl_options_mut(&mut self) -> Result<&mut [u8]> {
        let offset = match RplControlMessage::from(self.msg_code()) {
            RplControlMessage::DodagInformationSolicitation => field::DIS_RESERVED + 1,
            RplControlMessage::DodagInformationObject => field::DIO_DODAG_ID.end,
            RplControlMessage::DestinationAdvertisementObject if self.dao_dodag_id_present() => {
                field::DAO_DODAG_ID.end
            }
            RplControlMessage::DestinationAdvertisementObject => field::DAO_SEQUENCE + 1,
            RplControlMessage::DestinationAdvertisementObjectAck
                if self.dao_ack_dodag_id_present() =>
            {
                field::DAO_ACK_DODAG_ID.end
            }
            RplControlMessage::DestinationAdvertisementObjectAck => field::DAO_ACK_STATUS + 1,
            _ => return Err(Error),
        };
        self.buffer.as_mut().get_mut(offset..).ok_or(Error)
    }
}

type RplOptions<'p> = heapless::Vec<options::Repr<'p>, { crate::config::RPL_MAX_OPTIONS }>;

/// A high-level representation of a RPL control message.
#[derive(Debug, PartialEq, Eq, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Repr<'p> {
    DodagInformationSolicitation {
        options: RplOptions<'p>,
    },
    DodagInformationObject {
        rpl_instance_id: InstanceId,
        version_number: u8,
        rank: u16,
        grounded: bool,
        mode_of_operation: ModeOfOperation,
        dodag_preference: u8,
        dtsn: u8,
        dodag_id: Address,
        options: RplOptions<'p>,
    },
    DestinationAdvertisementObject {
        rpl_instance_id: InstanceId,
        expect_ack: bool,
        sequence: u8,
        dodag_id: Option<Address>,
        options: RplOptions<'p>,
    },
    DestinationAdvertisementObjectAck {
        rpl_instance_id: InstanceId,
        sequence: u8,
        status: u8,
        dodag_id: Option<Address>,
    },
}

impl fmt::Display for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::DodagInformationSolicitation { .. } => write!(f, "DIS"),
            Repr::DodagInformationObject {
                rpl_instance_id,
                version_number,
                rank,
                dodag_id,
                ..
            } => write!(
                f,
                "DIO instance={rpl_instance_id:?} version={version_number} rank={rank} \
                 dodag-id={dodag_id}"
            ),
            Repr::DestinationAdvertisementObject {
                rpl_instance_id,
                sequence,
                ..
            } => write!(f, "DAO instance={rpl_instance_id:?} sequence={sequence}"),
            Repr::DestinationAdvertisementObjectAck {
                rpl_instance_id,
                sequence,
                status,
                ..
            } => write!(
                f,
                "DAO-ACK instance={rpl_instance_id:?} sequence={sequence} status={status}"
            ),
        }
    }
}

impl<'p> Repr<'p> {
    fn options(data: &'p [u8]) -> Result<RplOptions<'p>> {
        let mut options = RplOptions::new();
        let mut offset = 0;
        while offset < data.len() {
            let pkt = options::Packet::new_checked(&data[offset..])?;
            let opt = options::Repr::parse(&pkt)?;
            offset += opt.buffer_len();
            // Options in excess of the fixed capacity are dropped, not
            // treated as a parse error.
            if options.push(opt).is_err() {
                net_trace!("RPL option list full, dropping option");
            }
        }
        Ok(options)
    }

    /// Parse a RPL control message and return a high-level
    /// representation.
    pub fn parse<T: AsRef<[u8]> + ?Sized>(packet: &Packet<&'p T>) -> Result<Self> {
        packet.check_len()?;
        if packet.msg_type() != Message::RplControl {
            return Err(Error);
        }

        match RplControlMessage::from(packet.msg_code()) {
            RplControlMessage::DodagInformationSolicitation => {
                Ok(Repr::DodagInformationSolicitation {
                    options: Self::options(packet.rpl_options()?)?,
                })
            }
            RplControlMessage::DodagInformationObject => Ok(Repr::DodagInformationObject {
                rpl_instance_id: packet.rpl_instance_id(),
                version_number: packet.dio_version_number(),
                rank: packet.dio_rank(),
                grounded: packet.dio_grounded(),
                mode_of_operation: packet.dio_mode_of_operation(),
                dodag_preference: packet.dio_dodag_preference(),
                dtsn: packet.dio_dtsn(),
                dodag_id: packet.dio_dodag_id(),
                options: Self::options(packet.rpl_options()?)?,
            }),
            RplControlMessage::DestinationAdvertisementObject => {
                Ok(Repr::DestinationAdvertisementObject {
                    rpl_instance_id: packet.rpl_instance_id(),
                    expect_ack: packet.dao_ack_request(),
                    sequence: packet.dao_sequence(),
                    dodag_id: packet.dao_dodag_id(),
                    options: Self::options(packet.rpl_options()?)?,
                })
            }
            RplControlMessage::DestinationAdvertisementObjectAck => {
                Ok(Repr::DestinationAdvertisementObjectAck {
                    rpl_instance_id: packet.rpl_instance_id(),
                    sequence: packet.dao_ack_sequence(),
                    status: packet.dao_ack_status(),
                    dodag_id: packet.dao_ack_dodag_id(),
                })
            }
            _ => Err(Error),
        }
    }

    /// Return the length of a packet that will be emitted from this
    /// high-level representation, including the ICMPv6 header.
    pub fn buffer_len(&self) -> usize {
        let mut len = 4;
        match self {
            Repr::DodagInformationSolicitation { options } => {
                len += 2;
                len += options.iter().map(|o| o.buffer_len()).sum::<usize>();
            }
            Repr::DodagInformationObject { options, .. } => {
                len += 24;
                len += options.iter().map(|o| o.buffer_len()).sum::<usize>();
            }
            Repr::DestinationAdvertisementObject {
                dodag_id, options, ..
            } => {
                len += if dodag_id.is_some() { 20 } else { 4 };
                len += options.iter().map(|o| o.buffer_len()).sum::<usize>();
            }
            Repr::DestinationAdvertisementObjectAck { dodag_id, .. } => {
                len += if dodag_id.is_some() { 20 } else { 4 };
            }
        }
        len
    }

    /// Emit a high-level representation into a RPL control message.
    pub fn emit<T: AsRef<[u8]> + AsMut<[u8]> + ?Sized>(&self, packet: &mut Packet<&mut T>) {
        packet.set_msg_type(Message::RplControl);
        packet.set_checksum(0);

        let options = match self {
            Repr::DodagInformationSolicitation { options } => {
                packet.set_msg_code(RplControlMessage::DodagInformationSolicitation.into());
                let data = packet.buffer.as_mut();
                data[field::DIS_FLAGS] = 0;
                data[field::DIS_RESERVED] = 0;
                &options[..]
            }
            Repr::DodagInformationObject {
                rpl_instance_id,
                version_number,
                rank,
                grounded,
                mode_of_operation,
                dodag_preference,
                dtsn,
                dodag_id,
                options,
            } => {
                packet.set_msg_code(RplControlMessage::DodagInformationObject.into());
                packet.set_rpl_instance_id((*rpl_instance_id).into());
                packet.set_dio_version_number(*version_number);
                packet.set_dio_rank(*rank);
                packet.buffer.as_mut()[field::DIO_GROUNDED] = 0;
                packet.set_dio_grounded(*grounded);
                packet.set_dio_mode_of_operation(*mode_of_operation);
                packet.set_dio_dodag_preference(*dodag_preference);
                packet.set_dio_dtsn(*dtsn);
                packet.clear_dio_reserved();
                packet.set_dio_dodag_id(*dodag_id);
                &options[..]
            }
            Repr::DestinationAdvertisementObject {
                rpl_instance_id,
                expect_ack,
                sequence,
                dodag_id,
                options,
            } => {
                packet.set_msg_code(RplControlMessage::DestinationAdvertisementObject.into());
                packet.set_rpl_instance_id((*rpl_instance_id).into());
                packet.set_dao_flags(*expect_ack, dodag_id.is_some());
                packet.set_dao_sequence(*sequence);
                if let Some(dodag_id) = dodag_id {
                    packet.set_dao_dodag_id(*dodag_id);
                }
                &options[..]
            }
            Repr::DestinationAdvertisementObjectAck {
                rpl_instance_id,
                sequence,
                status,
                dodag_id,
            } => {
                packet.set_msg_code(RplControlMessage::DestinationAdvertisementObjectAck.into());
                packet.set_rpl_instance_id((*rpl_instance_id).into());
                packet.set_dao_ack_flags(dodag_id.is_some());
                packet.set_dao_ack_sequence(*sequence);
                packet.set_dao_ack_status(*status);
                if let Some(dodag_id) = dodag_id {
                    packet.set_dao_ack_dodag_id(*dodag_id);
                }
                &[][..]
            }
        };

        if !options.is_empty() {
            let mut buffer = packet.rpl_options_mut().expect("no options field");
            for opt in options {
                let (head, rest) = core::mem::take(&mut buffer).split_at_mut(opt.buffer_len());
                opt.emit(&mut options::Packet::new_unchecked(head));
                buffer = rest;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // A DIO from a Wi-SUN root advertising 2001:db8::1, with a DODAG
    // configuration option.
    static DIO_BYTES: [u8; 44] = [
        0x9b, 0x01, 0x00, 0x00, 0x1e, 0x01, 0x01, 0x00, 0x88, 0x00, 0x00, 0x00, 0x20, 0x01, 0x0d,
        0xb8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x04, 0x0e,
        0x00, 0x02, 0x0f, 0x00, 0x00, 0x00, 0x00, 0x80, 0x00, 0x00, 0x00, 0x3c, 0x00, 0x3c,
    ];

    #[test]
    fn dio_parse() {
        let packet = Packet::new_checked(&DIO_BYTES[..]).unwrap();
        let repr = Repr::parse(&packet).unwrap();
        match repr {
            Repr::DodagInformationObject {
                rpl_instance_id,
                version_number,
                rank,
                grounded,
                mode_of_operation,
                dtsn,
                dodag_id,
                ref options,
                ..
            } => {
                assert_eq!(rpl_instance_id, InstanceId::Global(0x1e));
                assert_eq!(version_number, 1);
                assert_eq!(rank, 256);
                assert!(grounded);
                assert_eq!(mode_of_operation, ModeOfOperation::NonStoringMode);
                assert_eq!(dtsn, 0);
                assert_eq!(dodag_id, Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
                assert_eq!(options.len(), 1);
                match options[0] {
                    options::Repr::DodagConfiguration {
                        dio_interval_doublings,
                        dio_interval_min,
                        dio_redundancy_constant,
                        minimum_hop_rank_increase,
                        default_lifetime,
                        lifetime_unit,
                        ..
                    } => {
                        assert_eq!(dio_interval_min, 15);
                        assert_eq!(dio_interval_doublings, 2);
                        assert_eq!(dio_redundancy_constant, 0);
                        assert_eq!(minimum_hop_rank_increase, 128);
                        assert_eq!(default_lifetime, 60);
                        assert_eq!(lifetime_unit, 60);
                    }
                    _ => panic!("expected a DODAG configuration option"),
                }
            }
            _ => panic!("expected a DIO"),
        }
    }

    #[test]
    fn dio_emit_roundtrip() {
        let packet = Packet::new_unchecked(&DIO_BYTES[..]);
        let repr = Repr::parse(&packet).unwrap();
        assert_eq!(repr.buffer_len(), 44);

        let mut bytes = vec![0u8; repr.buffer_len()];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        assert_eq!(&bytes[..], &DIO_BYTES[..]);
    }

    #[test]
    fn dao_roundtrip() {
        let mut options = RplOptions::new();
        options
            .push(options::Repr::RplTarget {
                prefix_length: 128,
                prefix: Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 5),
            })
            .unwrap();
        options
            .push(options::Repr::TransitInformation {
                external: false,
                path_control: 0,
                path_sequence: 0,
                path_lifetime: 60,
                parent_address: Some(Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)),
            })
            .unwrap();

        let repr = Repr::DestinationAdvertisementObject {
            rpl_instance_id: InstanceId::Global(0x1e),
            expect_ack: true,
            sequence: 42,
            dodag_id: None,
            options,
        };

        let mut bytes = vec![0u8; repr.buffer_len()];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));

        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }

    #[test]
    fn dao_ack_roundtrip() {
        let repr = Repr::DestinationAdvertisementObjectAck {
            rpl_instance_id: InstanceId::Global(0x1e),
            sequence: 42,
            status: 0,
            dodag_id: None,
        };
        assert_eq!(repr.buffer_len(), 8);

        let mut bytes = vec![0u8; repr.buffer_len()];
        repr.emit(&mut Packet::new_unchecked(&mut bytes[..]));
        let packet = Packet::new_checked(&bytes[..]).unwrap();
        assert_eq!(Repr::parse(&packet).unwrap(), repr);
    }
}
