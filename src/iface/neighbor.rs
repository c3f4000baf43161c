// Heads up! Before working on this file you should read, at least,
// the parts of RFC 4861 that discuss neighbor unreachability
// detection, and RFC 6775/8505 for registration lifetimes.

use managed::ManagedSlice;

use crate::rand::Rand;
use crate::time::{Duration, Instant};
use crate::wire::{Eui64, Ipv6Address};

/// Reachability state of a neighbor cache entry, RFC 4861 § 7.3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Address resolution is in progress.
    Incomplete,
    /// Positive confirmation was received recently.
    Reachable,
    /// The entry is valid but its reachability is unconfirmed.
    Stale,
    /// A packet was recently sent to a stale neighbor; probing is
    /// deferred to give upper layers a chance to confirm.
    Delay,
    /// Unicast probes are being sent.
    Probe,
    /// All probes went unanswered.
    Unreachable,
}

/// An index into the neighbor cache arena.
///
/// Handles stay valid until the entry they name is removed; the RPL
/// neighbor table holds them as weak back-references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NeighborHandle(pub(crate) usize);

/// A cached neighbor.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Neighbor {
    pub(crate) ipv6_addr: Ipv6Address,
    pub(crate) ll_addr: Option<Eui64>,
    pub(crate) state: State,
    /// When a `Reachable` entry falls back to `Stale`, or when the
    /// current `Delay`/`Probe` step expires.
    pub(crate) state_until: Instant,
    pub(crate) probes_sent: u8,
    /// Non-zero when the neighbor registered this address with us (or
    /// we registered it upstream, see `registration_owner`).
    pub(crate) registration_lifetime: Duration,
    pub(crate) registered_until: Instant,
    /// We registered this address with the upstream parent, as opposed
    /// to a downstream node having registered it with us.
    pub(crate) registration_owner: bool,
    pub(crate) is_router: bool,
    pub(crate) rpl_link: Option<super::rpl::RplHandle>,
    /// EWMA of the link ETX, in 1/128 units. 128 is a perfect link.
    pub(crate) etx_x128: u16,
}

impl Neighbor {
    fn new(ipv6_addr: Ipv6Address, ll_addr: Option<Eui64>, state: State, now: Instant) -> Neighbor {
        Neighbor {
            ipv6_addr,
            ll_addr,
            state,
            state_until: now,
            probes_sent: 0,
            registration_lifetime: Duration::ZERO,
            registered_until: now,
            registration_owner: false,
            is_router: false,
            rpl_link: None,
            etx_x128: 128,
        }
    }

    pub fn ipv6_addr(&self) -> Ipv6Address {
        self.ipv6_addr
    }

    pub fn ll_addr(&self) -> Option<Eui64> {
        self.ll_addr
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_registered(&self) -> bool {
        self.registration_lifetime != Duration::ZERO
    }

    pub fn rpl_link(&self) -> Option<super::rpl::RplHandle> {
        self.rpl_link
    }

    /// The smoothed ETX of the link towards this neighbor, in 1/128
    /// units.
    pub fn etx_x128(&self) -> u16 {
        self.etx_x128
    }
}

/// What a cache maintenance pass wants the interface to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheAction {
    /// Send a unicast NS probe to this neighbor.
    SendProbe(NeighborHandle),
    /// The neighbor exhausted its probes and became unreachable.
    BecameUnreachable(NeighborHandle),
    /// A downstream registration ran out its lifetime; the interface
    /// removes the entry.
    RegistrationExpired(NeighborHandle),
}

/// The token bucket pacing outbound ICMPv6 errors, RFC 4443 § 2.4(f).
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    const CAPACITY: u32 = 10;
    /// One token per this much elapsed time, i.e. 10 tokens/s.
    const REFILL_PERIOD: Duration = Duration::from_millis(100);

    fn new(now: Instant) -> TokenBucket {
        TokenBucket {
            tokens: Self::CAPACITY,
            last_refill: now,
        }
    }

    /// Take one token. Returns `false`, and the caller suppresses its
    /// error, when the bucket is empty.
    pub fn take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill(&mut self, now: Instant) {
        if now < self.last_refill {
            // the clock is monotonic, but be safe against a caller
            // replaying an old timestamp
            return;
        }
        let elapsed = now - self.last_refill;
        let new_tokens = (elapsed.total_millis() / Self::REFILL_PERIOD.total_millis()) as u32;
        if new_tokens == 0 {
            return;
        }
        if self.tokens + new_tokens >= Self::CAPACITY {
            self.tokens = Self::CAPACITY;
            self.last_refill = now;
        } else {
            self.tokens += new_tokens;
            self.last_refill += Self::REFILL_PERIOD * new_tokens;
        }
    }
}

/// The neighbor cache.
///
/// An arena of neighbor entries addressed by [NeighborHandle]. The
/// backing storage may be borrowed or owned through
/// [managed::ManagedSlice].
#[derive(Debug)]
pub struct Cache<'a> {
    storage: ManagedSlice<'a, Option<Neighbor>>,
    pub(crate) token_bucket: TokenBucket,
    base_reachable_time: Duration,
    reachable_time: Duration,
    reroll_at: Instant,
}

impl<'a> Cache<'a> {
    /// Default BaseReachableTime, RFC 4861 § 10.
    pub(crate) const BASE_REACHABLE_TIME: Duration = Duration::from_millis(30_000);

    /// Default RetransTimer, RFC 4861 § 10.
    pub(crate) const RETRANS_TIMER: Duration = Duration::from_millis(1_000);

    /// DELAY_FIRST_PROBE_TIME, RFC 4861 § 10.
    pub(crate) const DELAY_FIRST_PROBE_TIME: Duration = Duration::from_secs(5);

    /// MAX_MULTICAST_SOLICIT and MAX_UNICAST_SOLICIT, RFC 4861 § 10.
    pub(crate) const MAX_SOLICIT: u8 = 3;

    /// The reachable time is rerolled at this period even if the base
    /// does not change, RFC 4861 § 6.3.4.
    const REROLL_PERIOD: Duration = Duration::from_secs(600);

    /// Create a cache. The backing storage is cleared upon creation.
    ///
    /// # Panics
    /// This function panics if `storage.len() == 0`.
    pub fn new<T>(storage: T, now: Instant, rand: &mut Rand) -> Cache<'a>
    where
        T: Into<ManagedSlice<'a, Option<Neighbor>>>,
    {
        let mut storage = storage.into();
        assert!(!storage.as_ref().is_empty());
        for slot in storage.as_mut().iter_mut() {
            *slot = None;
        }

        let mut cache = Cache {
            storage,
            token_bucket: TokenBucket::new(now),
            base_reachable_time: Self::BASE_REACHABLE_TIME,
            reachable_time: Self::BASE_REACHABLE_TIME,
            reroll_at: now,
        };
        cache.reroll_reachable_time(now, rand);
        cache
    }

    /// The current (randomized) reachable time.
    pub fn reachable_time(&self) -> Duration {
        self.reachable_time
    }

    /// Change BaseReachableTime; the effective reachable time is
    /// rerolled immediately.
    pub fn set_base_reachable_time(&mut self, base: Duration, now: Instant, rand: &mut Rand) {
        self.base_reachable_time = base;
        self.reroll_reachable_time(now, rand);
    }

    /// Draw a fresh reachable time, uniform in [base/2, 3·base/2].
    fn reroll_reachable_time(&mut self, now: Instant, rand: &mut Rand) {
        let base = self.base_reachable_time.total_millis();
        self.reachable_time = Duration::from_millis(rand.rand_range(base / 2, base * 3 / 2));
        self.reroll_at = now + Self::REROLL_PERIOD;
    }

    /// Number of occupied entries.
    pub fn used(&self) -> usize {
        self.storage.as_ref().iter().filter(|e| e.is_some()).count()
    }

    pub fn get(&self, handle: NeighborHandle) -> Option<&Neighbor> {
        self.storage.as_ref().get(handle.0)?.as_ref()
    }

    pub fn get_mut(&mut self, handle: NeighborHandle) -> Option<&mut Neighbor> {
        self.storage.as_mut().get_mut(handle.0)?.as_mut()
    }

    /// Look up the entry for an IPv6 address.
    pub fn lookup(&self, addr: &Ipv6Address) -> Option<NeighborHandle> {
        self.storage
            .as_ref()
            .iter()
            .position(|slot| matches!(slot, Some(n) if n.ipv6_addr == *addr))
            .map(NeighborHandle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeighborHandle, &Neighbor)> {
        self.storage
            .as_ref()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (NeighborHandle(i), n)))
    }

    /// Insert a new entry, evicting the oldest STALE or UNREACHABLE
    /// entry when the arena is full. Returns `None` when even eviction
    /// cannot make room (every entry is in active use).
    fn insert(&mut self, neighbor: Neighbor) -> Option<NeighborHandle> {
        debug_assert!(self.lookup(&neighbor.ipv6_addr).is_none());

        if let Some(free) = self.storage.as_ref().iter().position(|slot| slot.is_none()) {
            self.storage.as_mut()[free] = Some(neighbor);
            return Some(NeighborHandle(free));
        }

        let victim = self
            .storage
            .as_ref()
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|n| (i, n)))
            .filter(|(_, n)| {
                matches!(n.state, State::Stale | State::Unreachable)
                    && n.rpl_link.is_none()
                    && !n.is_registered()
            })
            .min_by_key(|(_, n)| n.state_until)
            .map(|(i, _)| i);

        match victim {
            Some(i) => {
                net_trace!("neighbor cache full, evicting {}", self.storage.as_ref()[i].as_ref().unwrap().ipv6_addr);
                self.storage.as_mut()[i] = Some(neighbor);
                Some(NeighborHandle(i))
            }
            None => {
                net_debug!("neighbor cache full, no evictable entry");
                None
            }
        }
    }

    /// Remove an entry. The RPL back-reference must have been cleared
    /// by the caller.
    pub(crate) fn remove(&mut self, handle: NeighborHandle) {
        if let Some(slot) = self.storage.as_mut().get_mut(handle.0) {
            *slot = None;
        }
    }

    /// Record link-layer information gleaned from an unsolicited
    /// source, RFC 4861 § 7.2.3: create the entry in STALE, or mark it
    /// STALE when the link-layer address changed.
    pub fn update_unsolicited(
        &mut self,
        addr: Ipv6Address,
        ll_addr: Eui64,
        now: Instant,
    ) -> Option<NeighborHandle> {
        debug_assert!(addr.is_unicast());

        match self.lookup(&addr) {
            Some(handle) => {
                let neighbor = self.get_mut(handle).unwrap();
                if neighbor.ll_addr != Some(ll_addr) {
                    neighbor.ll_addr = Some(ll_addr);
                    neighbor.state = State::Stale;
                    neighbor.state_until = now;
                }
                Some(handle)
            }
            None => self.insert(Neighbor::new(addr, Some(ll_addr), State::Stale, now)),
        }
    }

    /// Create an INCOMPLETE entry for address resolution.
    pub fn create_incomplete(&mut self, addr: Ipv6Address, now: Instant) -> Option<NeighborHandle> {
        match self.lookup(&addr) {
            Some(handle) => Some(handle),
            None => self.insert(Neighbor::new(addr, None, State::Incomplete, now)),
        }
    }

    /// Apply a received Neighbor Advertisement to an entry,
    /// RFC 4861 § 7.2.5.
    pub fn update_from_na(
        &mut self,
        handle: NeighborHandle,
        router: bool,
        solicited: bool,
        override_flag: bool,
        ll_addr: Option<Eui64>,
        now: Instant,
    ) {
        let reachable_time = self.reachable_time;
        let Some(neighbor) = self.get_mut(handle) else {
            return;
        };

        if neighbor.state == State::Incomplete {
            // An advertisement for an INCOMPLETE entry without a
            // link-layer address is useless; discard it.
            let Some(ll_addr) = ll_addr else { return };
            neighbor.ll_addr = Some(ll_addr);
            neighbor.is_router = router;
            if solicited {
                neighbor.state = State::Reachable;
                neighbor.state_until = now + reachable_time;
                neighbor.probes_sent = 0;
            } else {
                neighbor.state = State::Stale;
            }
            return;
        }

        let lladdr_changed = match (ll_addr, neighbor.ll_addr) {
            (Some(new), Some(old)) => new != old,
            (Some(_), None) => true,
            (None, _) => false,
        };

        if lladdr_changed && !override_flag {
            // Keep the old link-layer address; a REACHABLE entry drops
            // to STALE, others are left alone.
            if neighbor.state == State::Reachable {
                neighbor.state = State::Stale;
                neighbor.state_until = now;
            }
            return;
        }

        if lladdr_changed {
            neighbor.ll_addr = ll_addr;
        }
        neighbor.is_router = router;

        if solicited {
            neighbor.state = State::Reachable;
            neighbor.state_until = now + reachable_time;
            neighbor.probes_sent = 0;
        } else if lladdr_changed {
            neighbor.state = State::Stale;
            neighbor.state_until = now;
        }
    }

    /// Record positive reachability confirmation from a source other
    /// than an NA, e.g. a MAC acknowledgement.
    pub fn confirm_reachable(&mut self, handle: NeighborHandle, now: Instant) {
        let reachable_time = self.reachable_time;
        if let Some(neighbor) = self.get_mut(handle) {
            neighbor.state = State::Reachable;
            neighbor.state_until = now + reachable_time;
            neighbor.probes_sent = 0;
        }
    }

    /// A packet is about to be sent to this neighbor. A STALE entry
    /// enters DELAY, deferring probes by DELAY_FIRST_PROBE_TIME.
    pub fn mark_used(&mut self, handle: NeighborHandle, now: Instant) {
        if let Some(neighbor) = self.get_mut(handle) {
            if neighbor.state == State::Stale {
                neighbor.state = State::Delay;
                neighbor.state_until = now + Self::DELAY_FIRST_PROBE_TIME;
            }
        }
    }

    /// Record a registration (an accepted ARO) on the entry.
    pub fn set_registration(
        &mut self,
        handle: NeighborHandle,
        lifetime: Duration,
        owner: bool,
        now: Instant,
    ) {
        if let Some(neighbor) = self.get_mut(handle) {
            debug_assert!(lifetime == Duration::ZERO || neighbor.ll_addr.is_some());
            neighbor.registration_lifetime = lifetime;
            neighbor.registered_until = now + lifetime;
            neighbor.registration_owner = owner;
        }
    }

    /// Feed the MAC transmission outcome into the ETX estimator.
    pub fn tx_result(&mut self, handle: NeighborHandle, acked: bool) {
        if let Some(neighbor) = self.get_mut(handle) {
            // EWMA with alpha 1/8: a lost frame counts as an ETX-3
            // sample.
            let sample: u32 = if acked { 128 } else { 384 };
            neighbor.etx_x128 =
                ((neighbor.etx_x128 as u32 * 7 + sample) / 8).min(u16::MAX as u32) as u16;
        }
    }

    /// Drive per-entry timers. Fills `actions` with the probes to send
    /// and the neighbors that became unreachable.
    pub fn tick(
        &mut self,
        now: Instant,
        rand: &mut Rand,
        actions: &mut heapless::Vec<CacheAction, 8>,
    ) {
        if now >= self.reroll_at {
            self.reroll_reachable_time(now, rand);
        }

        let mut expired_registrations = heapless::Vec::<NeighborHandle, 8>::new();

        for (i, slot) in self.storage.as_mut().iter_mut().enumerate() {
            let Some(neighbor) = slot.as_mut() else {
                continue;
            };
            let handle = NeighborHandle(i);

            // Downstream registrations are hard state with an explicit
            // lifetime; expiry removes the entry.
            if neighbor.is_registered()
                && !neighbor.registration_owner
                && now >= neighbor.registered_until
            {
                let _ = expired_registrations.push(handle);
                continue;
            }

            match neighbor.state {
                State::Reachable if now >= neighbor.state_until => {
                    neighbor.state = State::Stale;
                }
                State::Delay if now >= neighbor.state_until => {
                    neighbor.state = State::Probe;
                    neighbor.state_until = now + Self::RETRANS_TIMER;
                    neighbor.probes_sent = 1;
                    let _ = actions.push(CacheAction::SendProbe(handle));
                }
                State::Probe if now >= neighbor.state_until => {
                    if neighbor.probes_sent < Self::MAX_SOLICIT {
                        neighbor.state_until = now + Self::RETRANS_TIMER;
                        neighbor.probes_sent += 1;
                        let _ = actions.push(CacheAction::SendProbe(handle));
                    } else {
                        neighbor.state = State::Unreachable;
                        let _ = actions.push(CacheAction::BecameUnreachable(handle));
                    }
                }
                _ => (),
            }
        }

        for handle in expired_registrations {
            net_trace!(
                "registration expired for {}",
                self.get(handle).unwrap().ipv6_addr
            );
            let _ = actions.push(CacheAction::RegistrationExpired(handle));
        }
    }

    /// The next instant at which [Cache::tick] does useful work.
    pub fn poll_at(&self) -> Option<Instant> {
        let mut earliest = Some(self.reroll_at);
        for (_, neighbor) in self.iter() {
            let deadline = match neighbor.state {
                State::Reachable | State::Delay | State::Probe => Some(neighbor.state_until),
                _ => None,
            };
            let registration = (neighbor.is_registered() && !neighbor.registration_owner)
                .then_some(neighbor.registered_until);
            for candidate in [deadline, registration].into_iter().flatten() {
                if earliest.is_none() || Some(candidate) < earliest {
                    earliest = Some(candidate);
                }
            }
        }
        earliest
    }
}
