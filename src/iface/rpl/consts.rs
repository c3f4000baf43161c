//! RPL constants. The DIO timer defaults follow the Wi-SUN FAN
//! profile rather than the RFC 6550 suggestions.

pub(crate) const DEFAULT_RPL_INSTANCE_ID: u8 = 0x1e;

pub(crate) const DEFAULT_MIN_HOP_RANK_INCREASE: u16 = 256;

/// Imin = 2^15 ms ≈ 32 s (Wi-SUN FAN 1.1, DISC_IMIN).
pub(crate) const DEFAULT_DIO_INTERVAL_MIN: u8 = 15;
/// Imax = Imin << 2 ≈ 131 s.
pub(crate) const DEFAULT_DIO_INTERVAL_DOUBLINGS: u8 = 2;
/// Wi-SUN disables DIO suppression.
pub(crate) const DEFAULT_DIO_REDUNDANCY_CONSTANT: u8 = 0;

pub(crate) const DEFAULT_DODAG_LIFETIME: u8 = 60;
pub(crate) const DEFAULT_LIFETIME_UNIT_S: u16 = 60;

pub(crate) const SEQUENCE_WINDOW: u8 = 16;

/// DAO retransmission: 1 s doubling up to 60 s, then give up after 8
/// tries and demote the parent.
pub(crate) const DAO_RETRY_BASE_S: u64 = 1;
pub(crate) const DAO_RETRY_CAP_S: u64 = 60;
pub(crate) const DAO_RETRY_MAX: u8 = 8;

/// How long to wait for a first DIO before multicasting a DIS.
pub(crate) const DIS_START_DELAY_S: u64 = 5;
/// DIS retry period while unattached.
pub(crate) const DIS_PERIOD_S: u64 = 30;
