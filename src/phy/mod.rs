/*! Radio co-processor contract.

The RCP is an external collaborator: a separate MCU that owns the SUN
PHY and the 802.15.4 MAC, reached over a byte-oriented request/response
bus. The stack never parses MAC frames itself; the bus driver hands up
*indications* carrying the decoded source EUI-64 and the IPv6 payload,
and accepts *data requests* carrying a framed IPv6 packet and the
destination EUI-64.

This module only defines the contract. A serial/CPC implementation
lives with the daemon; the test suite drives the stack with an
in-memory implementation.
*/

use core::fmt;

use crate::wire::Eui64;

enum_with_unknown! {
    /// Outcome of an 802.15.4 data request.
    pub enum TxStatus(u8) {
        /// The frame was acknowledged (or was a broadcast).
        Success           = 0,
        /// No acknowledgement after all MAC retries.
        NoAck             = 1,
        /// CSMA-CA never found a clear channel.
        ChannelAccessFail = 2,
        /// The request expired before it could be sent.
        Timedout          = 3,
    }
}

impl TxStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, TxStatus::Success)
    }
}

/// A version number as reported by the RCP, packed
/// `major.minor.patch` into 8/16/8 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ApiVersion(pub u32);

impl ApiVersion {
    pub const fn new(major: u8, minor: u16, patch: u8) -> ApiVersion {
        ApiVersion((major as u32) << 24 | (minor as u32) << 8 | patch as u32)
    }

    pub const fn major(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub const fn minor(&self) -> u16 {
        (self.0 >> 8) as u16
    }

    pub const fn patch(&self) -> u8 {
        self.0 as u8
    }

    pub fn older_than(&self, other: ApiVersion) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// The oldest RCP API the stack can talk to.
pub const MIN_API_VERSION: ApiVersion = ApiVersion::new(2, 0, 0);

/// A decoded 802.15.4 data indication handed up by the bus driver.
#[derive(Debug, Clone, Copy)]
pub struct RxInd<'a> {
    /// The MPX payload: one IPv6 packet.
    pub frame: &'a [u8],
    /// Source EUI-64 from the MAC header.
    pub src: Eui64,
    /// The frame passed link-layer security.
    pub security_ok: bool,
    /// The frame was addressed to a multicast/broadcast MAC address.
    pub multicast: bool,
    pub lqi: u8,
    pub rssi_dbm: i8,
    pub timestamp_us: u64,
}

/// Confirmation of a previously submitted data request.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TxCnf {
    pub handle: u8,
    pub status: TxStatus,
    pub timestamp_us: u64,
}

/// The RCP announced itself after a reset.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetInd {
    pub version_fw: ApiVersion,
    pub version_api: ApiVersion,
    pub eui64: Eui64,
}

impl ResetInd {
    /// Check the announced API against [MIN_API_VERSION].
    pub fn check_api_version(&self) -> core::result::Result<(), FatalError> {
        if self.version_api.older_than(MIN_API_VERSION) {
            Err(FatalError::ApiTooOld(self.version_api))
        } else {
            Ok(())
        }
    }
}

/// An unrecoverable RCP failure. The daemon terminates on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalError {
    /// The RCP speaks an API older than [MIN_API_VERSION].
    ApiTooOld(ApiVersion),
    /// The bus went away.
    Disconnected,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FatalError::ApiTooOld(version) => {
                write!(f, "RCP API {version} < {MIN_API_VERSION} (too old)")
            }
            FatalError::Disconnected => write!(f, "RCP bus disconnected"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FatalError {}

/// An 802.15.4 data request.
#[derive(Debug, Clone, Copy)]
pub struct DataRequest<'a> {
    /// The framed IPv6 packet.
    pub frame: &'a [u8],
    /// Caller-chosen handle, echoed in the matching [TxCnf].
    pub handle: u8,
    /// Unicast destination; `None` sends on the broadcast schedule.
    pub dst: Option<Eui64>,
}

/// The request primitives of the RCP bus.
///
/// All requests are fire-and-forget at this level: failures surface
/// asynchronously through [TxCnf] and [ResetInd] indications, except
/// for a dead bus which is fatal.
pub trait RcpBus {
    /// Submit an 802.15.4 data request.
    fn data_tx(&mut self, request: &DataRequest) -> core::result::Result<(), FatalError>;

    /// Install a group key for the given key index.
    fn set_sec_key(&mut self, index: u8, gak: &[u8; 16], frame_counter: u32);

    /// Select the radio configuration.
    fn set_radio(&mut self, config_index: u8);

    /// Configure the unicast frequency-hopping schedule.
    fn set_fhss_uc(&mut self, dwell_ms: u8, chan_mask: &[u8]);

    /// Configure the asynchronous (broadcast) schedule.
    fn set_fhss_async(&mut self, dwell_ms: u16, chan_mask: &[u8]);

    /// Enable the radio.
    fn radio_enable(&mut self);

    /// Request a soft reset; a [ResetInd] follows.
    fn reset(&mut self);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn api_version_ordering() {
        let old = ApiVersion::new(0, 25, 1);
        assert!(old.older_than(MIN_API_VERSION));
        assert!(!MIN_API_VERSION.older_than(MIN_API_VERSION));
        assert!(!ApiVersion::new(2, 0, 1).older_than(MIN_API_VERSION));
        assert_eq!(format!("{old}"), "0.25.1");
    }

    #[test]
    fn reset_ind_rejects_old_api() {
        let ind = ResetInd {
            version_fw: ApiVersion::new(1, 5, 0),
            version_api: ApiVersion::new(1, 9, 9),
            eui64: Eui64::default(),
        };
        assert_eq!(
            ind.check_api_version(),
            Err(FatalError::ApiTooOld(ApiVersion::new(1, 9, 9)))
        );
    }
}
