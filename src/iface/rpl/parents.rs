use crate::config::RPL_NEIGHBOR_TABLE_COUNT;
use crate::iface::neighbor::NeighborHandle;
use crate::time::Instant;
use crate::wire::{Eui64, Ipv6Address, RplInstanceId, RplModeOfOperation};

use super::lollipop::SequenceCounter;
use super::rank::Rank;
use super::DodagConfiguration;

/// An index into the RPL neighbor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RplHandle(pub(crate) usize);

/// The base object of the last DIO heard from a neighbor.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DioBase {
    pub rpl_instance_id: RplInstanceId,
    pub dodag_id: Ipv6Address,
    pub version_number: SequenceCounter,
    pub rank: Rank,
    pub grounded: bool,
    pub mode_of_operation: RplModeOfOperation,
    pub dodag_preference: u8,
    pub dtsn: SequenceCounter,
}

/// A router in radio range that advertised our DODAG: a candidate
/// parent.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RplNeighbor {
    pub(crate) eui64: Eui64,
    pub(crate) ipv6_addr: Ipv6Address,
    pub(crate) dio_base: DioBase,
    pub(crate) config: DodagConfiguration,
    /// Our rank if this neighbor were the preferred parent.
    pub(crate) path_cost: u16,
    pub(crate) candidate_since: Instant,
    pub(crate) last_heard: Instant,
    pub(crate) dao_ack_received: bool,
    pub(crate) is_preferred_parent: bool,
    pub(crate) nce_link: Option<NeighborHandle>,
}

impl RplNeighbor {
    pub fn eui64(&self) -> Eui64 {
        self.eui64
    }

    pub fn ipv6_addr(&self) -> Ipv6Address {
        self.ipv6_addr
    }

    pub fn dio_base(&self) -> &DioBase {
        &self.dio_base
    }

    pub fn path_cost(&self) -> u16 {
        self.path_cost
    }

    pub fn is_preferred_parent(&self) -> bool {
        self.is_preferred_parent
    }

    pub fn nce_link(&self) -> Option<NeighborHandle> {
        self.nce_link
    }
}

/// The table of candidate parents, keyed by EUI-64.
#[derive(Debug, Default)]
pub struct RplNeighborTable {
    neighbors: [Option<RplNeighbor>; RPL_NEIGHBOR_TABLE_COUNT],
}

impl RplNeighborTable {
    pub fn get(&self, handle: RplHandle) -> Option<&RplNeighbor> {
        self.neighbors.get(handle.0)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: RplHandle) -> Option<&mut RplNeighbor> {
        self.neighbors.get_mut(handle.0)?.as_mut()
    }

    /// Look up a neighbor by its EUI-64.
    pub fn lookup(&self, eui64: &Eui64) -> Option<RplHandle> {
        self.neighbors
            .iter()
            .position(|slot| matches!(slot, Some(n) if n.eui64 == *eui64))
            .map(RplHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RplHandle, &RplNeighbor)> {
        self.neighbors
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (RplHandle(i), n)))
    }

    pub fn count(&self) -> usize {
        self.neighbors.iter().filter(|n| n.is_some()).count()
    }

    /// Insert a neighbor, evicting the worst non-preferred candidate
    /// when the table is full and the newcomer is better. Returns
    /// `None` when the newcomer does not make the cut.
    pub(crate) fn add(&mut self, neighbor: RplNeighbor) -> Option<RplHandle> {
        debug_assert!(self.lookup(&neighbor.eui64).is_none());

        if let Some(free) = self.neighbors.iter().position(|slot| slot.is_none()) {
            self.neighbors[free] = Some(neighbor);
            return Some(RplHandle(free));
        }

        let worst = self
            .neighbors
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (i, n)))
            .filter(|(_, n)| !n.is_preferred_parent)
            .max_by_key(|(_, n)| n.path_cost)
            .map(|(i, _)| i)?;

        if self.neighbors[worst].as_ref().unwrap().path_cost > neighbor.path_cost {
            net_trace!(
                "RPL neighbor table full, replacing {}",
                self.neighbors[worst].as_ref().unwrap().ipv6_addr
            );
            self.neighbors[worst] = Some(neighbor);
            Some(RplHandle(worst))
        } else {
            None
        }
    }

    /// Remove a neighbor. The neighbor-cache back-reference must have
    /// been cleared by the caller.
    pub(crate) fn remove(&mut self, handle: RplHandle) {
        if let Some(slot) = self.neighbors.get_mut(handle.0) {
            *slot = None;
        }
    }

    /// The current preferred parent.
    pub fn preferred_parent(&self) -> Option<RplHandle> {
        self.neighbors
            .iter()
            .position(|slot| matches!(slot, Some(n) if n.is_preferred_parent))
            .map(RplHandle)
    }

    /// Make `handle` the preferred parent (or clear the preference
    /// with `None`). At most one neighbor carries the flag.
    pub(crate) fn set_preferred_parent(&mut self, handle: Option<RplHandle>) {
        for (i, slot) in self.neighbors.iter_mut().enumerate() {
            if let Some(n) = slot.as_mut() {
                n.is_preferred_parent = Some(RplHandle(i)) == handle;
            }
        }
    }

    /// The admissible candidate minimizing path cost. Ties prefer the
    /// current preferred parent (hysteresis), then the lowest EUI-64.
    pub(crate) fn best_candidate(&self) -> Option<RplHandle> {
        let mut best: Option<(RplHandle, &RplNeighbor)> = None;
        for (handle, neighbor) in self.iter() {
            if neighbor.dio_base.rank.is_infinite() {
                continue;
            }
            best = match best {
                None => Some((handle, neighbor)),
                Some((_, b)) if neighbor.path_cost < b.path_cost => Some((handle, neighbor)),
                Some((_, b))
                    if neighbor.path_cost == b.path_cost
                        && !b.is_preferred_parent
                        && (neighbor.is_preferred_parent || neighbor.eui64 < b.eui64) =>
                {
                    Some((handle, neighbor))
                }
                best => best,
            };
        }
        best.map(|(handle, _)| handle)
    }
}
