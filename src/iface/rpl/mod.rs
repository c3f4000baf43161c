//! The RPL engine: MOP 1 (non-storing) router node behavior for
//! Wi-SUN FAN. The engine consumes DIO/DIS/DAO-ACK, maintains the
//! candidate parent set, registers with the preferred parent and
//! advertises reachability through DAOs.

pub(crate) mod consts;
mod lollipop;
mod of0;
mod parents;
mod rank;
mod trickle;

pub(crate) use self::lollipop::SequenceCounter;
pub(crate) use self::of0::ObjectiveFunction0;
pub(crate) use self::rank::Rank;
pub(crate) use self::trickle::TrickleTimer;
pub use self::parents::{DioBase, RplHandle, RplNeighbor, RplNeighborTable};

use crate::rand::Rand;
use crate::time::{Duration, Instant};
use crate::wire::{Ipv6Address, RplInstanceId, RplModeOfOperation, RplOptionRepr};

/// The parameters a DODAG root distributes in the configuration
/// option, RFC 6550 § 6.7.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DodagConfiguration {
    pub authentication_enabled: bool,
    pub path_control_size: u8,
    pub dio_interval_doublings: u8,
    pub dio_interval_min: u8,
    pub dio_redundancy_constant: u8,
    pub max_rank_increase: u16,
    pub minimum_hop_rank_increase: u16,
    pub objective_code_point: u16,
    pub default_lifetime: u8,
    pub lifetime_unit: u16,
}

impl Default for DodagConfiguration {
    fn default() -> Self {
        Self {
            authentication_enabled: false,
            path_control_size: 0,
            dio_interval_doublings: consts::DEFAULT_DIO_INTERVAL_DOUBLINGS,
            dio_interval_min: consts::DEFAULT_DIO_INTERVAL_MIN,
            dio_redundancy_constant: consts::DEFAULT_DIO_REDUNDANCY_CONSTANT,
            max_rank_increase: 7 * consts::DEFAULT_MIN_HOP_RANK_INCREASE,
            minimum_hop_rank_increase: consts::DEFAULT_MIN_HOP_RANK_INCREASE,
            objective_code_point: ObjectiveFunction0::OCP,
            default_lifetime: consts::DEFAULT_DODAG_LIFETIME,
            lifetime_unit: consts::DEFAULT_LIFETIME_UNIT_S,
        }
    }
}

impl DodagConfiguration {
    /// The route/registration lifetime this configuration prescribes.
    pub fn lifetime(&self) -> Duration {
        Duration::from_secs(self.default_lifetime as u64 * self.lifetime_unit as u64)
    }

    pub(crate) fn update_from_option(&mut self, opt: &RplOptionRepr) {
        if let RplOptionRepr::DodagConfiguration {
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
        } = opt
        {
            self.authentication_enabled = *authentication_enabled;
            self.path_control_size = *path_control_size;
            self.dio_interval_doublings = *dio_interval_doublings;
            self.dio_interval_min = *dio_interval_min;
            self.dio_redundancy_constant = *dio_redundancy_constant;
            self.max_rank_increase = *max_rank_increase;
            self.minimum_hop_rank_increase = *minimum_hop_rank_increase;
            self.objective_code_point = *objective_code_point;
            self.default_lifetime = *default_lifetime;
            self.lifetime_unit = *lifetime_unit;
        }
    }
}

/// Where the node stands in its attachment to the DODAG.
///
/// The original callback chain (DHCPv6 acquire, then register the
/// address with the parent, then advertise it in a DAO) is written
/// out as an explicit state machine driven by scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttachState {
    /// No DODAG known yet; soliciting with DIS.
    Booting,
    /// Candidate parents exist, none selected or selection in
    /// progress.
    AttachingParent,
    /// A preferred parent is selected; waiting for the higher layer
    /// (DHCPv6) to hand us a global address.
    AddressAcquiring,
    /// Registering the global address with the parent (NS + EARO) and
    /// advertising it in a DAO.
    Registering,
    /// DAO acknowledged: fully routed.
    Registered,
}

/// Retransmission state of the in-flight DAO.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct DaoPending {
    pub sequence: SequenceCounter,
    pub retries: u8,
    pub next_tx: Instant,
}

impl DaoPending {
    /// Exponential backoff: 1 s, 2 s, 4 s, ... capped at 60 s.
    pub(crate) fn backoff(retries: u8) -> Duration {
        let secs = (consts::DAO_RETRY_BASE_S << retries.min(6)).min(consts::DAO_RETRY_CAP_S);
        Duration::from_secs(secs)
    }
}

/// The RPL context of the interface.
#[derive(Debug)]
pub struct Rpl {
    pub(crate) instance_id: RplInstanceId,
    pub(crate) dodag_id: Option<Ipv6Address>,
    pub(crate) version_number: SequenceCounter,
    pub(crate) rank: Rank,
    pub(crate) dtsn: SequenceCounter,
    pub(crate) mode_of_operation: RplModeOfOperation,
    pub(crate) grounded: bool,
    pub(crate) dodag_preference: u8,
    pub(crate) dodag_configuration: DodagConfiguration,
    pub(crate) dio_timer: TrickleTimer,
    pub(crate) neighbor_table: RplNeighborTable,
    pub(crate) state: AttachState,
    pub(crate) dao_sequence: SequenceCounter,
    pub(crate) dao_pending: Option<DaoPending>,
    /// After poisoning, no new parent is selected before this instant
    /// (at least Imin after the loss).
    pub(crate) hold_down_until: Option<Instant>,
    pub(crate) dis_at: Option<Instant>,
}

impl Rpl {
    pub(crate) fn new(now: Instant, rand: &mut Rand) -> Rpl {
        let config = DodagConfiguration::default();
        Rpl {
            instance_id: RplInstanceId::Global(consts::DEFAULT_RPL_INSTANCE_ID),
            dodag_id: None,
            version_number: SequenceCounter::default(),
            rank: Rank::INFINITE,
            dtsn: SequenceCounter::default(),
            mode_of_operation: RplModeOfOperation::NonStoringMode,
            grounded: false,
            dodag_preference: 0,
            dio_timer: TrickleTimer::new(
                config.dio_interval_min as u32,
                config.dio_interval_min as u32 + config.dio_interval_doublings as u32,
                config.dio_redundancy_constant as usize,
                now,
                rand,
            ),
            dodag_configuration: config,
            neighbor_table: RplNeighborTable::default(),
            state: AttachState::Booting,
            dao_sequence: SequenceCounter::default(),
            dao_pending: None,
            hold_down_until: None,
            dis_at: Some(now + Duration::from_secs(consts::DIS_START_DELAY_S)),
        }
    }

    pub fn state(&self) -> AttachState {
        self.state
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn dodag_id(&self) -> Option<Ipv6Address> {
        self.dodag_id
    }

    pub fn neighbor_table(&self) -> &RplNeighborTable {
        &self.neighbor_table
    }

    pub fn preferred_parent(&self) -> Option<&RplNeighbor> {
        self.neighbor_table
            .preferred_parent()
            .and_then(|handle| self.neighbor_table.get(handle))
    }

    pub(crate) fn has_parent(&self) -> bool {
        self.neighbor_table.preferred_parent().is_some()
    }

    /// Is reattachment currently held down after a poisoning?
    pub(crate) fn held_down(&self, now: Instant) -> bool {
        match self.hold_down_until {
            Some(until) => now < until,
            None => false,
        }
    }

    /// Restart the Trickle timer with the parameters of the current
    /// DODAG configuration.
    pub(crate) fn reset_dio_timer(&mut self, now: Instant, rand: &mut Rand) {
        self.dio_timer = TrickleTimer::new(
            self.dodag_configuration.dio_interval_min as u32,
            self.dodag_configuration.dio_interval_min as u32
                + self.dodag_configuration.dio_interval_doublings as u32,
            self.dodag_configuration.dio_redundancy_constant as usize,
            now,
            rand,
        );
    }
}
