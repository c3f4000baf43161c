// The interface context: the singleton that fuses the neighbor cache,
// the RPL engine and the radio into one state machine. All mutation
// happens in methods of this type, invoked from the daemon's single
// dispatch loop.

mod ipv6;
mod ndisc;
mod rpl;

use heapless::{Deque, Vec};
use managed::ManagedSlice;

use crate::config::{IFACE_EGRESS_QUEUE_COUNT, IFACE_MAX_MULTICAST_GROUP_COUNT};
use crate::iface::neighbor::{Cache as NeighborCache, CacheAction, Neighbor, NeighborHandle};
use crate::iface::route::Routes;
use crate::iface::rpl::{AttachState, Rpl};
use crate::phy::{DataRequest, FatalError, RcpBus, RxInd, TxCnf};
use crate::rand::Rand;
use crate::storage::{AckIntent, PacketBuf};
use crate::time::Instant;
use crate::wire::{AroStatus, Eui64, Icmpv6Repr, Ipv6Address, Ipv6Packet, Ipv6Repr, IPV6_MIN_MTU};

/// Configuration of a new interface.
#[derive(Debug, Clone)]
pub struct Config {
    /// The EUI-64 of the radio, reported by the RCP at reset.
    pub eui64: Eui64,
    pub pan_id: u16,
    pub network_name: heapless::String<32>,
    /// Seed for the stack's internal PRNG (reachable-time jitter,
    /// Trickle). Does not need to be cryptographic.
    pub random_seed: u64,
    /// Link MTU used for transit traffic; fragmentation is not
    /// performed, an oversized packet is answered with Packet Too Big.
    pub mtu: usize,
}

impl Config {
    pub fn new(eui64: Eui64) -> Config {
        Config {
            eui64,
            pan_id: 0xffff,
            network_name: heapless::String::new(),
            random_seed: 0,
            mtu: IPV6_MIN_MTU,
        }
    }
}

/// Events surfaced to the daemon, drained with
/// [Interface::poll_event]. These are the read-only projections the
/// management surface (D-Bus) and the MAC glue consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// The preferred parent changed (None: parent lost). The DHCPv6
    /// client uses this to (re)acquire a global address; D-Bus emits
    /// `PrimaryParent`.
    PrimaryParentChanged { parent: Option<Ipv6Address> },
    /// An upstream router refused our address registration. The MAC
    /// glue blacklists the EUI-64.
    AroFailure { eui64: Eui64, status: AroStatus },
}

/// Packet counters, mostly of the silent-drop kind.
#[derive(Debug, Default, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    pub rx_malformed: u32,
    pub rx_checksum: u32,
    pub rx_drop: u32,
    /// ICMPv6 errors suppressed by the token bucket.
    pub tx_rate_limited: u32,
    pub tx_no_source: u32,
    pub tx_no_route: u32,
    pub tx_queue_full: u32,
}

/// A Wi-SUN FAN router node interface.
pub struct Interface<'a> {
    pub(crate) inner: InterfaceInner<'a>,
}

pub(crate) struct InterfaceInner<'a> {
    pub(crate) now: Instant,
    pub(crate) rand: Rand,
    pub(crate) eui64: Eui64,
    pub(crate) ll_addr: Ipv6Address,
    pub(crate) global_addr: Option<Ipv6Address>,
    pub(crate) multicast_groups: Vec<Ipv6Address, IFACE_MAX_MULTICAST_GROUP_COUNT>,
    pub(crate) neighbor_cache: NeighborCache<'a>,
    pub(crate) routes: Routes,
    pub(crate) rpl: Rpl,
    pub(crate) pan_id: u16,
    pub(crate) network_name: heapless::String<32>,
    pub(crate) gaks: [Option<[u8; 16]>; 4],
    pub(crate) cur_hop_limit: u8,
    pub(crate) link_mtu: usize,
    pub(crate) stats: Stats,
    pub(crate) egress: Deque<PacketBuf<'static>, IFACE_EGRESS_QUEUE_COUNT>,
    pub(crate) events: Deque<Event, 4>,
    pub(crate) inflight: Vec<(u8, AckIntent, Option<NeighborHandle>), 8>,
    pub(crate) next_tx_handle: u8,
}

impl<'a> Interface<'a> {
    /// Create an interface. `neighbor_storage` backs the neighbor
    /// cache arena and may be borrowed or owned.
    pub fn new<T>(config: Config, neighbor_storage: T, now: Instant) -> Interface<'a>
    where
        T: Into<ManagedSlice<'a, Option<Neighbor>>>,
    {
        let mut rand = Rand::new(config.random_seed);
        let neighbor_cache = NeighborCache::new(neighbor_storage, now, &mut rand);
        let rpl = Rpl::new(now, &mut rand);

        let mut multicast_groups = Vec::new();
        for group in [
            Ipv6Address::LINK_LOCAL_ALL_NODES,
            Ipv6Address::LINK_LOCAL_ALL_ROUTERS,
            Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            Ipv6Address::REALM_LOCAL_ALL_NODES,
            Ipv6Address::REALM_LOCAL_ALL_ROUTERS,
        ] {
            multicast_groups.push(group).expect("multicast group table");
        }

        Interface {
            inner: InterfaceInner {
                now,
                rand,
                eui64: config.eui64,
                ll_addr: config.eui64.link_local_address(),
                global_addr: None,
                multicast_groups,
                neighbor_cache,
                routes: Routes::new(),
                rpl,
                pan_id: config.pan_id,
                network_name: config.network_name,
                gaks: [None; 4],
                cur_hop_limit: 64,
                link_mtu: config.mtu,
                stats: Stats::default(),
                egress: Deque::new(),
                events: Deque::new(),
                inflight: Vec::new(),
                next_tx_handle: 0,
            },
        }
    }

    /// The EUI-64 of the interface (D-Bus `HwAddress`).
    pub fn hardware_addr(&self) -> Eui64 {
        self.inner.eui64
    }

    /// The link-local address derived from the EUI-64.
    pub fn link_local_addr(&self) -> Ipv6Address {
        self.inner.ll_addr
    }

    pub fn global_addr(&self) -> Option<Ipv6Address> {
        self.inner.global_addr
    }

    /// The PAN id of the network (D-Bus `PanId`).
    pub fn pan_id(&self) -> u16 {
        self.inner.pan_id
    }

    /// The installed group keys (D-Bus `Gaks`).
    pub fn gaks(&self) -> &[Option<[u8; 16]>; 4] {
        &self.inner.gaks
    }

    pub fn rpl(&self) -> &Rpl {
        &self.inner.rpl
    }

    pub fn neighbor_cache(&self) -> &NeighborCache<'a> {
        &self.inner.neighbor_cache
    }

    pub fn stats(&self) -> Stats {
        self.inner.stats
    }

    /// Drain the next pending event.
    pub fn poll_event(&mut self) -> Option<Event> {
        self.inner.events.pop_front()
    }

    /// The authenticator installed a GAK for a key index.
    pub fn gak_installed(&mut self, index: u8, gak: [u8; 16]) {
        if let Some(slot) = self.inner.gaks.get_mut(index as usize) {
            *slot = Some(gak);
        }
    }

    /// The DHCPv6 client acquired a global unicast address and the
    /// host interface confirmed its assignment. Registration with the
    /// preferred parent and the DAO follow from here.
    pub fn set_global_address(&mut self, addr: Ipv6Address, now: Instant) {
        self.inner.now = now;
        self.inner.set_global_address(addr);
    }

    /// The global unicast address went away.
    pub fn remove_global_address(&mut self, now: Instant) {
        self.inner.now = now;
        self.inner.global_addr = None;
        if self.inner.rpl.state == AttachState::Registering
            || self.inner.rpl.state == AttachState::Registered
        {
            self.inner.rpl.state = AttachState::AddressAcquiring;
            self.inner.rpl.dao_pending = None;
        }
    }

    /// Process one received 802.15.4 data indication.
    pub fn rx_ind(&mut self, now: Instant, ind: &RxInd) {
        self.inner.now = now;
        self.inner.process_rx_ind(ind);
    }

    /// Process one MAC transmission confirmation.
    pub fn tx_cnf(&mut self, now: Instant, cnf: &TxCnf) {
        self.inner.now = now;
        self.inner.process_tx_cnf(cnf);
    }

    /// Advance all timer-driven state: neighbor unreachability
    /// detection, reachable-time rerolls, the DIO Trickle timer, DAO
    /// retransmissions, DIS solicitation and parent liveness.
    pub fn poll(&mut self, now: Instant) {
        self.inner.now = now;
        self.inner.poll_neighbor_cache();
        self.inner.poll_rpl();
    }

    /// The next instant [Interface::poll] should be called.
    pub fn poll_at(&mut self) -> Option<Instant> {
        self.inner.poll_at()
    }

    /// Hand queued packets to the RCP bus.
    pub fn dispatch<R: RcpBus>(&mut self, rcp: &mut R) -> Result<(), FatalError> {
        self.inner.dispatch(rcp)
    }
}

impl<'a> InterfaceInner<'a> {
    /// Does this unicast address belong to the interface?
    pub(crate) fn has_ip_addr(&self, addr: &Ipv6Address) -> bool {
        *addr == self.ll_addr || self.global_addr == Some(*addr)
    }

    pub(crate) fn has_multicast_group(&self, addr: &Ipv6Address) -> bool {
        // A FAN router listens on every solicited-node group: address
        // registration and DAD target addresses that are not assigned
        // anywhere yet, and the NS handler is the one to judge them.
        self.multicast_groups.contains(addr) || addr.is_solicited_node_multicast()
    }

    /// RFC 4861 § 7.2.2-flavored source selection: prefer the
    /// prompting address when it is ours, fall back to the link-local
    /// address. A global destination prefers the global source.
    pub(crate) fn select_source(&self, dst_addr: &Ipv6Address) -> Option<Ipv6Address> {
        if dst_addr.is_link_local() || dst_addr.is_multicast() {
            Some(self.ll_addr)
        } else {
            self.global_addr.or(Some(self.ll_addr))
        }
    }

    fn set_global_address(&mut self, addr: Ipv6Address) {
        if self.global_addr == Some(addr) {
            return;
        }
        net_debug!("global address {} assigned", addr);
        self.global_addr = Some(addr);

        if self.rpl.state == AttachState::AddressAcquiring && self.rpl.has_parent() {
            self.register_with_parent();
        }
    }

    fn process_rx_ind(&mut self, ind: &RxInd) {
        let Ok(packet) = Ipv6Packet::new_checked(ind.frame) else {
            self.stats.rx_malformed += 1;
            net_trace!("drop malformed IPv6 frame from {}", ind.src);
            return;
        };
        let Ok(ip_repr) = Ipv6Repr::parse(&packet) else {
            self.stats.rx_malformed += 1;
            net_trace!("drop malformed IPv6 header from {}", ind.src);
            return;
        };

        self.process_ipv6(ind, ip_repr, packet.payload());
    }

    fn process_tx_cnf(&mut self, cnf: &TxCnf) {
        let Some(i) = self.inflight.iter().position(|(h, _, _)| *h == cnf.handle) else {
            return;
        };
        let (_, intent, nce) = self.inflight.swap_remove(i);

        if let Some(handle) = nce {
            self.neighbor_cache.tx_result(handle, cnf.status.is_success());
        }

        if !cnf.status.is_success() {
            net_trace!("tx-cnf handle={} failed: {:?}", cnf.handle, cnf.status);
            return;
        }

        match intent {
            AckIntent::None => (),
            AckIntent::UpdateNeighborReachable(addr) => {
                if let Some(handle) = self.neighbor_cache.lookup(&addr) {
                    self.neighbor_cache.confirm_reachable(handle, self.now);
                }
            }
            AckIntent::RemoveNeighbor(addr) => {
                if let Some(handle) = self.neighbor_cache.lookup(&addr) {
                    self.remove_neighbor(handle);
                }
            }
            // In Wi-SUN the MAC ACK of an NS carrying an EARO is
            // sufficient positive confirmation of the registration.
            AckIntent::NotifyAroResult(eui64) => self.aro_confirmed(eui64),
        }
    }

    fn poll_neighbor_cache(&mut self) {
        let mut actions = heapless::Vec::<CacheAction, 8>::new();
        let now = self.now;
        let InterfaceInner {
            neighbor_cache,
            rand,
            ..
        } = self;
        neighbor_cache.tick(now, rand, &mut actions);

        for action in actions {
            match action {
                CacheAction::SendProbe(handle) => {
                    if let Some(neighbor) = self.neighbor_cache.get(handle) {
                        let target = neighbor.ipv6_addr();
                        self.send_ns_probe(target);
                    }
                }
                CacheAction::BecameUnreachable(handle) => {
                    let is_parent = self
                        .neighbor_cache
                        .get(handle)
                        .and_then(|n| n.rpl_link())
                        .map_or(false, |rpl_handle| {
                            self.rpl.neighbor_table.preferred_parent() == Some(rpl_handle)
                        });
                    if is_parent {
                        net_debug!("preferred parent unreachable");
                        self.parent_loss();
                    }
                }
                CacheAction::RegistrationExpired(handle) => {
                    self.remove_neighbor(handle);
                }
            }
        }

        // Refresh our own upstream registrations well before expiry.
        let mut refresh = None;
        for (handle, neighbor) in self.neighbor_cache.iter() {
            if neighbor.registration_owner
                && neighbor.is_registered()
                && self.now + neighbor.registration_lifetime / 2 >= neighbor.registered_until
            {
                refresh = Some(handle);
                break;
            }
        }
        if let Some(handle) = refresh {
            // Stop the timer from re-triggering until the ACK arrives.
            let lifetime = self.neighbor_cache.get(handle).unwrap().registration_lifetime;
            self.neighbor_cache
                .set_registration(handle, lifetime, true, self.now);
            self.register_with_parent();
        }
    }

    /// Remove a neighbor cache entry, dropping the RPL back-reference
    /// first.
    pub(crate) fn remove_neighbor(&mut self, handle: NeighborHandle) {
        if let Some(rpl_handle) = self.neighbor_cache.get(handle).and_then(|n| n.rpl_link()) {
            if self.rpl.neighbor_table.preferred_parent() == Some(rpl_handle) {
                // Poison and detach while the entry still exists.
                self.parent_loss();
            }
            self.rpl.neighbor_table.remove(rpl_handle);
        }
        self.neighbor_cache.remove(handle);
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        if self.events.push_back(event).is_err() {
            net_debug!("event queue full, dropping {:?}", event);
        }
    }

    /// Queue an ICMPv6 message for transmission. The link-layer
    /// destination is resolved through the neighbor cache; link-local
    /// and multicast destinations resolve directly.
    pub(crate) fn send_icmpv6(
        &mut self,
        ip_repr: Ipv6Repr,
        icmp_repr: &Icmpv6Repr,
        ack_intent: AckIntent,
    ) {
        let ll_dst = match self.resolve_ll(&ip_repr.dst_addr) {
            Ok(ll_dst) => ll_dst,
            Err(()) => {
                self.stats.tx_no_route += 1;
                net_debug!("no route to {}, dropping", ip_repr.dst_addr);
                return;
            }
        };

        let total = ip_repr.buffer_len() + icmp_repr.buffer_len();
        let Some(mut packet) = PacketBuf::with_len(total) else {
            net_warn!("packet allocation failed, dropping");
            return;
        };

        {
            let mut ipv6 = Ipv6Packet::new_unchecked(packet.payload_mut());
            ip_repr.emit(&mut ipv6);
            let mut icmp =
                crate::wire::Icmpv6Packet::new_unchecked(&mut packet.payload_mut()[ip_repr.buffer_len()..]);
            icmp_repr.emit(&ip_repr.src_addr, &ip_repr.dst_addr, &mut icmp);
        }

        packet.meta.src_addr = ip_repr.src_addr;
        packet.meta.dst_addr = ip_repr.dst_addr;
        packet.meta.hop_limit = ip_repr.hop_limit;
        packet.meta.direction = crate::storage::Direction::Down;
        packet.meta.ack_intent = ack_intent;
        packet.meta.ll_dst = ll_dst;

        if self.egress.push_back(packet).is_err() {
            self.stats.tx_queue_full += 1;
            net_debug!("egress queue full, dropping");
        }
    }

    /// Map an IPv6 destination to a link-layer destination. `None`
    /// means the broadcast schedule.
    fn resolve_ll(&mut self, dst_addr: &Ipv6Address) -> Result<Option<Eui64>, ()> {
        if dst_addr.is_multicast() {
            return Ok(None);
        }

        if let Some(handle) = self.neighbor_cache.lookup(dst_addr) {
            if let Some(ll) = self.neighbor_cache.get(handle).and_then(|n| n.ll_addr()) {
                self.neighbor_cache.mark_used(handle, self.now);
                return Ok(Some(ll));
            }
        }

        // A link-local address embeds the EUI-64 in Wi-SUN.
        if let Some(eui64) = dst_addr.link_local_eui64() {
            return Ok(Some(eui64));
        }

        // Off-link: route through the mesh, typically ::/0 via the
        // preferred parent.
        let via = self.routes.lookup(dst_addr, self.now).ok_or(())?;
        if via == *dst_addr {
            return Err(());
        }
        self.resolve_ll(&via)
    }

    fn dispatch<R: RcpBus>(&mut self, rcp: &mut R) -> Result<(), FatalError> {
        while let Some(packet) = self.egress.pop_front() {
            let handle = self.next_tx_handle;
            self.next_tx_handle = self.next_tx_handle.wrapping_add(1);

            let nce = packet
                .meta
                .ll_dst
                .is_some()
                .then(|| self.neighbor_cache.lookup(&packet.meta.dst_addr))
                .flatten();

            rcp.data_tx(&DataRequest {
                frame: packet.payload(),
                handle,
                dst: packet.meta.ll_dst,
            })?;

            if packet.meta.ack_intent != AckIntent::None || nce.is_some() {
                if self
                    .inflight
                    .push((handle, packet.meta.ack_intent, nce))
                    .is_err()
                {
                    net_debug!("tx-cnf tracking table full");
                }
            }
        }
        Ok(())
    }

    fn poll_at(&mut self) -> Option<Instant> {
        let mut earliest = self.neighbor_cache.poll_at();

        let mut merge = |candidate: Option<Instant>| {
            if let Some(c) = candidate {
                earliest = Some(match earliest {
                    Some(e) => e.min(c),
                    None => c,
                });
            }
        };

        if self.rpl.dodag_id.is_some() {
            merge(Some(self.rpl.dio_timer.poll_at()));
        }
        merge(self.rpl.dao_pending.map(|dao| dao.next_tx));
        merge(self.rpl.dis_at);
        merge(self.rpl.hold_down_until);

        if let Some(parent) = self.rpl.preferred_parent() {
            merge(Some(parent.last_heard + self.rpl.dodag_configuration.lifetime()));
        }

        earliest
    }
}

#[cfg(test)]
pub(crate) mod tests;
