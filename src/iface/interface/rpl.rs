use super::{Event, InterfaceInner};
use crate::iface::rpl::{
    consts, AttachState, DaoPending, DioBase, ObjectiveFunction0, Rank, RplHandle, RplNeighbor,
    SequenceCounter,
};
use crate::storage::AckIntent;
use crate::time::Duration;
use crate::wire::{
    AddressRegistration, AroStatus, Eui64, Icmpv6Repr, IpProtocol, Ipv6Address, Ipv6Repr,
    RplOptionRepr, RplRepr,
};

impl<'a> InterfaceInner<'a> {
    pub(super) fn process_rpl(&mut self, ll_src: Eui64, ip_repr: Ipv6Repr, repr: RplRepr) {
        net_trace!("rx-icmp {} src={}", repr, ip_repr.src_addr);

        match repr {
            RplRepr::DodagInformationSolicitation { ref options } => {
                self.process_rpl_dis(ip_repr, options)
            }
            RplRepr::DodagInformationObject { .. } => self.process_rpl_dio(ll_src, ip_repr, repr),
            // An intermediate router in non-storing mode never
            // consumes DAOs; they flow to the root.
            RplRepr::DestinationAdvertisementObject { .. } => {
                net_trace!("rx-icmp dao ignored (non-storing)");
            }
            RplRepr::DestinationAdvertisementObjectAck {
                sequence, status, ..
            } => self.process_rpl_dao_ack(ip_repr, sequence, status),
        }
    }

    fn process_rpl_dis(&mut self, ip_repr: Ipv6Repr, options: &[RplOptionRepr]) {
        for opt in options {
            match opt {
                RplOptionRepr::Pad1 | RplOptionRepr::PadN(_) => (),
                // RFC 6550 § 8.3: predicates restrict who resets or
                // answers.
                RplOptionRepr::SolicitedInformation {
                    rpl_instance_id,
                    version_predicate,
                    instance_id_predicate,
                    dodag_id_predicate,
                    dodag_id,
                    version_number,
                } => {
                    if (*version_predicate
                        && self.rpl.version_number != SequenceCounter::new(*version_number))
                        || (*instance_id_predicate && self.rpl.instance_id != *rpl_instance_id)
                        || (*dodag_id_predicate && self.rpl.dodag_id != Some(*dodag_id))
                    {
                        return;
                    }
                }
                _ => net_trace!("rx-icmp dis: unexpected option"),
            }
        }

        // Nothing to advertise while unattached.
        if self.rpl.dodag_id.is_none() || self.rpl.rank.is_infinite() {
            return;
        }

        if ip_repr.dst_addr.is_unicast() {
            // A unicast DIS probes us specifically; answer with a
            // unicast DIO outside the Trickle schedule.
            self.send_dio(ip_repr.src_addr);
        } else {
            let InterfaceInner { rpl, rand, now, .. } = self;
            rpl.dio_timer.hear_inconsistency(*now, rand);
        }
    }

    fn process_rpl_dio(&mut self, ll_src: Eui64, ip_repr: Ipv6Repr, repr: RplRepr) {
        let RplRepr::DodagInformationObject {
            rpl_instance_id,
            version_number,
            rank,
            grounded,
            mode_of_operation,
            dodag_preference,
            dtsn,
            dodag_id,
            ref options,
        } = repr
        else {
            return;
        };

        if !ip_repr.src_addr.is_link_local() {
            self.stats.rx_drop += 1;
            return;
        }

        let mut config = None;
        for opt in options {
            match opt {
                RplOptionRepr::Pad1 | RplOptionRepr::PadN(_) => (),
                RplOptionRepr::DodagConfiguration { .. } => config = Some(opt),
                // The root propagates the prefix in the DIO; the
                // address itself still comes from DHCPv6 in FAN, so
                // the option is informational here.
                RplOptionRepr::PrefixInformation { .. } => (),
                _ => net_trace!("rx-icmp dio: unexpected option"),
            }
        }

        // Join the advertised instance when booting; afterwards only
        // our own instance and DODAG are of interest.
        if self.rpl.dodag_id.is_some() {
            if rpl_instance_id != self.rpl.instance_id
                || self.rpl.dodag_id != Some(dodag_id)
                || mode_of_operation != self.rpl.mode_of_operation
            {
                self.stats.rx_drop += 1;
                return;
            }

            let version = SequenceCounter::new(version_number);
            if version < self.rpl.version_number {
                // A stale version is an inconsistency.
                let InterfaceInner { rpl, rand, now, .. } = self;
                rpl.dio_timer.hear_inconsistency(*now, rand);
                return;
            }
            if version > self.rpl.version_number {
                // Global repair: adopt the new version, detach and
                // start over.
                net_debug!("DODAG version changed, global repair");
                self.rpl.version_number = version;
                self.detach_from_parent();
                return;
            }
        } else {
            if self.rpl.mode_of_operation != mode_of_operation {
                self.stats.rx_drop += 1;
                return;
            }
            self.rpl.instance_id = rpl_instance_id;
            self.rpl.dodag_id = Some(dodag_id);
            self.rpl.version_number = SequenceCounter::new(version_number);
            self.rpl.grounded = grounded;
            self.rpl.dodag_preference = dodag_preference;
            if let Some(opt) = config {
                self.rpl.dodag_configuration.update_from_option(opt);
                let InterfaceInner { rpl, rand, now, .. } = self;
                rpl.reset_dio_timer(*now, rand);
            }
            self.rpl.dis_at = None;
            if self.rpl.state == AttachState::Booting {
                self.rpl.state = AttachState::AttachingParent;
            }
        }

        let min_hop_rank_increase = self.rpl.dodag_configuration.minimum_hop_rank_increase;
        let dio_rank = Rank::new(rank, min_hop_rank_increase);

        // An infinite rank from the preferred parent is a poisoning:
        // the parent lost its own parent.
        let from_parent = self
            .rpl
            .preferred_parent()
            .map_or(false, |p| p.eui64() == ll_src);
        if from_parent && dio_rank.is_infinite() {
            net_debug!("preferred parent advertised infinite rank");
            self.parent_loss();
            return;
        }

        // Track the neighbor. The link-local source maps back to the
        // EUI-64, which keys the RPL table.
        let nce_handle = self
            .neighbor_cache
            .update_unsolicited(ip_repr.src_addr, ll_src, self.now);
        let etx = nce_handle
            .and_then(|h| self.neighbor_cache.get(h))
            .map_or(128, |n| n.etx_x128());
        let path_cost = ObjectiveFunction0::path_cost(dio_rank, etx);

        let rpl_handle = match self.rpl.neighbor_table.lookup(&ll_src) {
            Some(handle) => {
                let neighbor = self.rpl.neighbor_table.get_mut(handle).unwrap();
                let dtsn_new = SequenceCounter::new(dtsn);
                let dtsn_incremented = dtsn_new > neighbor.dio_base.dtsn;
                neighbor.dio_base = DioBase {
                    rpl_instance_id,
                    dodag_id,
                    version_number: SequenceCounter::new(version_number),
                    rank: dio_rank,
                    grounded,
                    mode_of_operation,
                    dodag_preference,
                    dtsn: dtsn_new,
                };
                if let Some(opt) = config {
                    neighbor.config.update_from_option(opt);
                }
                neighbor.path_cost = path_cost;
                neighbor.last_heard = self.now;
                neighbor.nce_link = nce_handle;

                // A DTSN increment from the preferred parent asks for
                // a fresh DAO.
                if from_parent && dtsn_incremented && self.rpl.state == AttachState::Registered {
                    self.schedule_dao();
                }
                Some(handle)
            }
            None => {
                let mut neighbor = RplNeighbor {
                    eui64: ll_src,
                    ipv6_addr: ip_repr.src_addr,
                    dio_base: DioBase {
                        rpl_instance_id,
                        dodag_id,
                        version_number: SequenceCounter::new(version_number),
                        rank: dio_rank,
                        grounded,
                        mode_of_operation,
                        dodag_preference,
                        dtsn: SequenceCounter::new(dtsn),
                    },
                    config: self.rpl.dodag_configuration,
                    path_cost,
                    candidate_since: self.now,
                    last_heard: self.now,
                    dao_ack_received: false,
                    is_preferred_parent: false,
                    nce_link: nce_handle,
                };
                if let Some(opt) = config {
                    neighbor.config.update_from_option(opt);
                }
                self.rpl.neighbor_table.add(neighbor)
            }
        };

        if let (Some(nce), Some(rpl_handle)) = (nce_handle, rpl_handle) {
            if let Some(n) = self.neighbor_cache.get_mut(nce) {
                n.rpl_link = Some(rpl_handle);
                n.is_router = true;
            }
        }

        // Trickle consistency: a DIO from a router of our DODAG whose
        // state agrees with ours.
        if from_parent || (!self.rpl.rank.is_infinite() && dio_rank == self.rpl.rank) {
            self.rpl.dio_timer.hear_consistent();
        }
        if from_parent {
            if let Some(handle) = self.rpl.neighbor_table.preferred_parent() {
                self.rpl.neighbor_table.get_mut(handle).unwrap().last_heard = self.now;
            }

            // The parent drifting past MaxRankIncrease would drag our
            // rank beyond the allowed window: treat it as a loss.
            let max_rank_increase = self.rpl.dodag_configuration.max_rank_increase;
            if max_rank_increase != 0
                && path_cost > self.rpl.rank.raw_value().saturating_add(max_rank_increase)
            {
                net_debug!("preferred parent rank grew past MaxRankIncrease");
                self.parent_loss();
                return;
            }
        }

        self.select_parent();
    }

    /// Run parent selection over the candidate set and apply the
    /// outcome, § 4.4.2 semantics.
    pub(super) fn select_parent(&mut self) {
        if self.rpl.held_down(self.now) {
            return;
        }

        let current = self.rpl.neighbor_table.preferred_parent();
        let best = self.rpl.neighbor_table.best_candidate();

        let Some(best) = best else { return };

        // Admissibility against ourselves: a parent must strictly
        // improve on our rank to avoid DODAG loops, and must not grow
        // our rank past MaxRankIncrease.
        let best_neighbor = self.rpl.neighbor_table.get(best).unwrap();
        if !self.rpl.rank.is_infinite() {
            if best_neighbor.dio_base.rank >= self.rpl.rank && current != Some(best) {
                return;
            }
            let max_rank_increase = self.rpl.dodag_configuration.max_rank_increase;
            if max_rank_increase != 0
                && best_neighbor.path_cost
                    > self.rpl.rank.raw_value().saturating_add(max_rank_increase)
            {
                return;
            }
        }

        if current == Some(best) {
            // Same parent; track the cost.
            let path_cost = best_neighbor.path_cost;
            self.rpl.rank = Rank::new(
                path_cost,
                self.rpl.dodag_configuration.minimum_hop_rank_increase,
            );
            return;
        }

        self.apply_parent_change(best);
    }

    fn apply_parent_change(&mut self, new_parent: RplHandle) {
        let (parent_addr, path_cost) = {
            let neighbor = self.rpl.neighbor_table.get(new_parent).unwrap();
            (neighbor.ipv6_addr(), neighbor.path_cost())
        };

        self.rpl.neighbor_table.set_preferred_parent(Some(new_parent));
        self.rpl.rank = Rank::new(
            path_cost,
            self.rpl.dodag_configuration.minimum_hop_rank_increase,
        );

        // Default route through the new parent; the old one (if any)
        // is replaced.
        if self.routes.add_default_route(parent_addr).is_err() {
            net_warn!("route table full, no default route");
        }

        net_debug!("preferred parent {} rank {}", parent_addr, self.rpl.rank.raw_value());
        self.push_event(Event::PrimaryParentChanged {
            parent: Some(parent_addr),
        });

        // A topology change is an inconsistency.
        let InterfaceInner { rpl, rand, now, .. } = self;
        rpl.dio_timer.hear_inconsistency(*now, rand);

        match self.rpl.state {
            AttachState::Booting | AttachState::AttachingParent => {
                self.rpl.state = AttachState::AddressAcquiring;
                // The DHCPv6 client is prodded through the
                // PrimaryParentChanged event; once it delivers,
                // set_global_address() moves us on.
                if self.global_addr.is_some() {
                    self.register_with_parent();
                }
            }
            // Changing parents while holding an address: re-register
            // and re-advertise through the new parent.
            AttachState::AddressAcquiring => {
                if self.global_addr.is_some() {
                    self.register_with_parent();
                }
            }
            AttachState::Registering | AttachState::Registered => {
                self.register_with_parent();
            }
        }
    }

    /// Register our global address with the preferred parent (NS with
    /// EARO) and advertise it in a DAO.
    pub(super) fn register_with_parent(&mut self) {
        let Some(global) = self.global_addr else { return };
        let Some(parent) = self.rpl.preferred_parent() else {
            return;
        };
        let parent_ll = parent.ipv6_addr();
        let parent_eui64 = parent.eui64();

        let lifetime = self.rpl.dodag_configuration.lifetime();
        let lifetime_minutes = (lifetime.secs() / 60).min(0xffff) as u16;

        self.rpl.state = AttachState::Registering;

        // The MAC acknowledgement of the NS is the positive
        // confirmation; no NA is awaited.
        self.send_ns(
            global,
            Some(parent_ll),
            None,
            Some(AddressRegistration::new(
                AroStatus::Success,
                lifetime_minutes,
                self.eui64,
            )),
            AckIntent::NotifyAroResult(parent_eui64),
        );

        self.schedule_dao();
    }

    /// The MAC acknowledged our NS(EARO) towards `eui64`.
    pub(super) fn aro_confirmed(&mut self, eui64: Eui64) {
        let Some(parent) = self.rpl.preferred_parent() else {
            return;
        };
        if parent.eui64() != eui64 {
            return;
        }
        let lifetime = self.rpl.dodag_configuration.lifetime();
        if let Some(handle) = parent.nce_link() {
            self.neighbor_cache
                .set_registration(handle, lifetime, true, self.now);
            self.neighbor_cache.confirm_reachable(handle, self.now);
        }
    }

    /// An upstream router refused our registration; when it is the
    /// preferred parent, it is no longer usable.
    pub(super) fn aro_failed(&mut self, eui64: Eui64) {
        let is_parent = self
            .rpl
            .preferred_parent()
            .map_or(false, |p| p.eui64() == eui64);
        if is_parent {
            // Poison and detach while the entry still exists.
            self.parent_loss();
        }
        if let Some(handle) = self.rpl.neighbor_table.lookup(&eui64) {
            if let Some(nce) = self.rpl.neighbor_table.get(handle).unwrap().nce_link() {
                if let Some(n) = self.neighbor_cache.get_mut(nce) {
                    n.rpl_link = None;
                }
            }
            self.rpl.neighbor_table.remove(handle);
        }
    }

    /// Queue a DAO towards the preferred parent and arm the
    /// retransmission timer.
    pub(super) fn schedule_dao(&mut self) {
        self.rpl.dao_sequence.increment();
        self.rpl.dao_pending = Some(DaoPending {
            sequence: self.rpl.dao_sequence,
            retries: 0,
            next_tx: self.now + DaoPending::backoff(0),
        });
        self.send_dao();
    }

    fn send_dao(&mut self) {
        let Some(global) = self.global_addr else { return };
        let Some(parent) = self.rpl.preferred_parent() else {
            return;
        };
        let parent_ll = parent.ipv6_addr();
        let Some(sequence) = self.rpl.dao_pending.map(|dao| dao.sequence) else {
            return;
        };

        let mut options = heapless::Vec::new();
        let _ = options.push(RplOptionRepr::RplTarget {
            prefix_length: 128,
            prefix: global,
        });
        let _ = options.push(RplOptionRepr::TransitInformation {
            external: false,
            path_control: 0,
            path_sequence: 0,
            path_lifetime: self.rpl.dodag_configuration.default_lifetime,
            parent_address: Some(parent_ll),
        });

        let dao = Icmpv6Repr::Rpl(RplRepr::DestinationAdvertisementObject {
            rpl_instance_id: self.rpl.instance_id,
            expect_ack: true,
            sequence: sequence.value(),
            dodag_id: None,
            options,
        });

        let ip_repr = Ipv6Repr {
            src_addr: global,
            dst_addr: parent_ll,
            next_header: IpProtocol::Icmpv6,
            payload_len: dao.buffer_len(),
            hop_limit: 64,
        };
        net_trace!("tx-icmp dao dst={} seq={}", parent_ll, sequence.value());
        self.send_icmpv6(ip_repr, &dao, AckIntent::None);
    }

    fn process_rpl_dao_ack(&mut self, ip_repr: Ipv6Repr, sequence: u8, status: u8) {
        let Some(pending) = self.rpl.dao_pending else {
            return;
        };
        if pending.sequence.value() != sequence {
            net_trace!("rx-icmp dao-ack: unexpected sequence {}", sequence);
            return;
        }
        let from_parent = self
            .rpl
            .preferred_parent()
            .map_or(false, |p| p.ipv6_addr() == ip_repr.src_addr);
        if !from_parent {
            return;
        }

        self.rpl.dao_pending = None;

        if status != 0 {
            net_debug!("dao-ack status {}", status);
            self.parent_loss();
            return;
        }

        if let Some(handle) = self.rpl.neighbor_table.preferred_parent() {
            self.rpl.neighbor_table.get_mut(handle).unwrap().dao_ack_received = true;
        }
        if self.rpl.state == AttachState::Registering {
            self.rpl.state = AttachState::Registered;
            net_debug!("attached: registered through preferred parent");
        }
    }

    /// Multicast (or unicast, for a probing DIS) DIO emission.
    pub(super) fn send_dio(&mut self, dst_addr: Ipv6Address) {
        let Some(dodag_id) = self.rpl.dodag_id else { return };

        let mut options = heapless::Vec::new();
        let conf = &self.rpl.dodag_configuration;
        let _ = options.push(RplOptionRepr::DodagConfiguration {
            authentication_enabled: conf.authentication_enabled,
            path_control_size: conf.path_control_size,
            dio_interval_doublings: conf.dio_interval_doublings,
            dio_interval_min: conf.dio_interval_min,
            dio_redundancy_constant: conf.dio_redundancy_constant,
            max_rank_increase: conf.max_rank_increase,
            minimum_hop_rank_increase: conf.minimum_hop_rank_increase,
            objective_code_point: conf.objective_code_point,
            default_lifetime: conf.default_lifetime,
            lifetime_unit: conf.lifetime_unit,
        });

        let dio = Icmpv6Repr::Rpl(RplRepr::DodagInformationObject {
            rpl_instance_id: self.rpl.instance_id,
            version_number: self.rpl.version_number.value(),
            rank: self.rpl.rank.raw_value(),
            grounded: self.rpl.grounded,
            mode_of_operation: self.rpl.mode_of_operation,
            dodag_preference: self.rpl.dodag_preference,
            dtsn: self.rpl.dtsn.value(),
            dodag_id,
            options,
        });

        let ip_repr = Ipv6Repr {
            src_addr: self.ll_addr,
            dst_addr,
            next_header: IpProtocol::Icmpv6,
            payload_len: dio.buffer_len(),
            hop_limit: 255,
        };
        net_trace!("tx-icmp dio dst={} rank={}", dst_addr, self.rpl.rank.raw_value());
        self.send_icmpv6(ip_repr, &dio, AckIntent::None);
    }

    fn send_dis(&mut self) {
        let dis = Icmpv6Repr::Rpl(RplRepr::DodagInformationSolicitation {
            options: heapless::Vec::new(),
        });
        let ip_repr = Ipv6Repr {
            src_addr: self.ll_addr,
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: dis.buffer_len(),
            hop_limit: 255,
        };
        net_trace!("tx-icmp dis");
        self.send_icmpv6(ip_repr, &dis, AckIntent::None);
    }

    /// Multicast a poisoning DIO: infinite rank, telling the sub-DODAG
    /// that the path through us is gone.
    fn send_poison_dio(&mut self) {
        let Some(dodag_id) = self.rpl.dodag_id else { return };

        let dio = Icmpv6Repr::Rpl(RplRepr::DodagInformationObject {
            rpl_instance_id: self.rpl.instance_id,
            version_number: self.rpl.version_number.value(),
            rank: Rank::INFINITE.raw_value(),
            grounded: self.rpl.grounded,
            mode_of_operation: self.rpl.mode_of_operation,
            dodag_preference: self.rpl.dodag_preference,
            dtsn: self.rpl.dtsn.value(),
            dodag_id,
            options: heapless::Vec::new(),
        });
        let ip_repr = Ipv6Repr {
            src_addr: self.ll_addr,
            dst_addr: Ipv6Address::LINK_LOCAL_ALL_RPL_NODES,
            next_header: IpProtocol::Icmpv6,
            payload_len: dio.buffer_len(),
            hop_limit: 255,
        };
        net_trace!("tx-icmp dio (poison)");
        self.send_icmpv6(ip_repr, &dio, AckIntent::None);
    }

    /// § 4.4.5: the preferred parent is gone. Poison the sub-DODAG and
    /// hold reselection down for at least Imin.
    pub(crate) fn parent_loss(&mut self) {
        let parent_addr = match self.rpl.preferred_parent() {
            Some(parent) => parent.ipv6_addr(),
            None => return,
        };
        net_debug!("parent {} lost", parent_addr);

        self.send_poison_dio();
        self.detach_from_parent();
        self.routes.remove_routes_via(&parent_addr);
    }

    fn detach_from_parent(&mut self) {
        self.rpl.neighbor_table.set_preferred_parent(None);
        self.rpl.rank = Rank::INFINITE;
        self.rpl.dao_pending = None;
        self.rpl.hold_down_until = Some(self.now + self.rpl.dio_timer.min_expiration());
        if self.rpl.state != AttachState::Booting {
            self.rpl.state = AttachState::AttachingParent;
        }

        self.push_event(Event::PrimaryParentChanged { parent: None });

        let InterfaceInner { rpl, rand, now, .. } = self;
        rpl.dio_timer.hear_inconsistency(*now, rand);
    }

    /// Timer-driven RPL work: DIS solicitation, the DIO Trickle timer,
    /// DAO retransmission, parent liveness and post-loss reselection.
    pub(super) fn poll_rpl(&mut self) {
        // Unattached: solicit.
        if let Some(dis_at) = self.rpl.dis_at {
            if self.now >= dis_at && !self.rpl.has_parent() {
                self.send_dis();
                self.rpl.dis_at = Some(self.now + Duration::from_secs(consts::DIS_PERIOD_S));
            }
        }

        // Trickle-paced DIO.
        if self.rpl.dodag_id.is_some() && !self.rpl.rank.is_infinite() {
            let fire = {
                let InterfaceInner { rpl, rand, now, .. } = self;
                rpl.dio_timer.poll(*now, rand)
            };
            if fire {
                self.send_dio(Ipv6Address::LINK_LOCAL_ALL_RPL_NODES);
            }
        }

        // DAO retransmission with exponential backoff.
        if let Some(pending) = self.rpl.dao_pending {
            if self.now >= pending.next_tx {
                if pending.retries >= consts::DAO_RETRY_MAX {
                    net_debug!("dao retries exhausted");
                    self.parent_loss();
                } else {
                    let retries = pending.retries + 1;
                    self.rpl.dao_pending = Some(DaoPending {
                        sequence: pending.sequence,
                        retries,
                        next_tx: self.now + DaoPending::backoff(retries),
                    });
                    self.send_dao();
                }
            }
        }

        // Parent liveness: no DIO within the DODAG lifetime.
        if let Some(parent) = self.rpl.preferred_parent() {
            let deadline = parent.last_heard + self.rpl.dodag_configuration.lifetime();
            if self.now >= deadline {
                net_debug!("no DIO from parent within lifetime");
                self.parent_loss();
            }
        }

        // Hold-down elapsed: try to reattach from the candidate set.
        if let Some(until) = self.rpl.hold_down_until {
            if self.now >= until {
                self.rpl.hold_down_until = None;
                if !self.rpl.has_parent() {
                    self.select_parent();
                }
            }
        }

        // Fall back to soliciting when everything is gone.
        if !self.rpl.has_parent()
            && self.rpl.dis_at.is_none()
            && !self.rpl.held_down(self.now)
            && self.rpl.neighbor_table.count() == 0
        {
            self.rpl.dis_at = Some(self.now + Duration::from_secs(consts::DIS_PERIOD_S));
        }
    }
}
