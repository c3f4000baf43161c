use super::{Event, InterfaceInner};
use crate::storage::AckIntent;
use crate::time::Duration;
use crate::wire::{
    AddressRegistration, AroStatus, Eui64, Icmpv6Repr, IpProtocol, Ipv6Address, Ipv6Repr,
    NdiscNeighborFlags, NdiscRepr,
};

/// Outcome of the address registration handler: how the NS should be
/// answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EaroDisposition {
    /// The registration needs an upstream check before a reply can be
    /// sent; the NS is dropped for now.
    Defer,
    /// Answer with an NA carrying an EARO with this status.
    ReplyWithEaro(AroStatus),
    /// Answer with a plain NA.
    ReplyWithoutEaro,
}

impl<'a> InterfaceInner<'a> {
    pub(super) fn process_ndisc(&mut self, ip_repr: Ipv6Repr, repr: NdiscRepr) {
        match repr {
            NdiscRepr::NeighborSolicit {
                target_addr,
                lladdr,
                registration,
            } => self.process_ns(ip_repr, target_addr, lladdr, registration),
            NdiscRepr::NeighborAdvert {
                flags,
                target_addr,
                lladdr,
                registration,
            } => self.process_na(ip_repr, flags, target_addr, lladdr, registration),
            NdiscRepr::Redirect {
                target_addr,
                dest_addr,
                lladdr,
                ..
            } => self.process_redirect(ip_repr, target_addr, dest_addr, lladdr),
            // Wi-SUN FAN replaces router discovery with PAN
            // advertisement at the MAC layer; RS and RA are validated
            // and ignored.
            NdiscRepr::RouterSolicit { .. } | NdiscRepr::RouterAdvert { .. } => {
                net_trace!("rx-icmp rs/ra ignored");
            }
        }
    }

    /// Inbound Neighbor Solicitation, RFC 4861 § 7.1.1 / § 7.2.3 with
    /// the Wi-SUN EARO handling of RFC 8505 on top.
    fn process_ns(
        &mut self,
        ip_repr: Ipv6Repr,
        target_addr: Ipv6Address,
        lladdr: Option<Eui64>,
        registration: Option<AddressRegistration>,
    ) {
        if target_addr.is_multicast() {
            self.stats.rx_drop += 1;
            return;
        }

        let src_is_unspecified = ip_repr.src_addr.is_unspecified();
        if src_is_unspecified {
            // DAD probes come from :: to the solicited-node group and
            // never carry a source link-layer option.
            if !ip_repr.dst_addr.is_solicited_node_multicast() || lladdr.is_some() {
                self.stats.rx_drop += 1;
                return;
            }
        }

        //   Wi-SUN - IPv6 Neighbor Discovery Optimizations
        // The EARO already carries the EUI-64 of the soliciting node,
        // which *is* its link-layer address; FAN assumes EUI-64 global
        // uniqueness, so a separate SLLAO is redundant. Synthesize one
        // when it is absent.
        let sllao = lladdr.or_else(|| {
            registration
                .filter(|_| !src_is_unspecified)
                .map(|reg| reg.eui64)
        });

        if let Some(reg) = registration.filter(|_| !src_is_unspecified) {
            let disposition = self.handle_ns_earo(&ip_repr.src_addr, &target_addr, &reg, sllao);
            match disposition {
                EaroDisposition::Defer => return,
                EaroDisposition::ReplyWithEaro(status) => {
                    let mut reply = reg;
                    reply.status = status;
                    // A failing registration may leave the registered
                    // address unusable on the wire; answer to the
                    // link-local address reconstructed from the EUI-64
                    // so the status is guaranteed to arrive.
                    let na_dst = if status == AroStatus::Success {
                        ip_repr.src_addr
                    } else {
                        reg.eui64.link_local_address()
                    };
                    self.send_na(target_addr, na_dst, true, true, Some(reply));
                    return;
                }
                EaroDisposition::ReplyWithoutEaro => {
                    self.send_na(target_addr, ip_repr.src_addr, true, true, None);
                    return;
                }
            }
        }

        // Plain RFC 4861 processing from here on.
        if let (true, Some(ll)) = (ip_repr.src_addr.is_unicast(), sllao) {
            self.neighbor_cache
                .update_unsolicited(ip_repr.src_addr, ll, self.now);
        }

        if self.has_ip_addr(&target_addr) {
            let (na_dst, solicited) = if src_is_unspecified {
                // Defending our address against DAD: answer the
                // all-nodes group, unsolicited.
                (Ipv6Address::LINK_LOCAL_ALL_NODES, false)
            } else {
                (ip_repr.src_addr, true)
            };
            self.send_na(target_addr, na_dst, solicited, true, None);
        } else if self.is_registered_downstream(&target_addr) {
            // Resolution for a subordinate's registered address:
            // answer on its behalf, without the override flag.
            if !src_is_unspecified {
                self.send_na(target_addr, ip_repr.src_addr, true, false, None);
            }
        } else {
            self.stats.rx_drop += 1;
        }
    }

    fn is_registered_downstream(&self, addr: &Ipv6Address) -> bool {
        self.neighbor_cache
            .lookup(addr)
            .and_then(|handle| self.neighbor_cache.get(handle))
            .map_or(false, |n| n.is_registered() && !n.registration_owner)
    }

    /// The registration handler, RFC 8505 § 6.1 from the registrar's
    /// side. Creates or refreshes the neighbor cache entry for the
    /// registered (target) address.
    pub(crate) fn handle_ns_earo(
        &mut self,
        _src_addr: &Ipv6Address,
        target_addr: &Ipv6Address,
        reg: &AddressRegistration,
        sllao: Option<Eui64>,
    ) -> EaroDisposition {
        let Some(ll_addr) = sllao else {
            return EaroDisposition::ReplyWithoutEaro;
        };
        if !target_addr.is_unicast() {
            return EaroDisposition::ReplyWithEaro(AroStatus::InvalidSource);
        }

        // An active registration of the same address by another node
        // is a duplicate.
        if let Some(handle) = self.neighbor_cache.lookup(target_addr) {
            let neighbor = self.neighbor_cache.get(handle).unwrap();
            if neighbor.is_registered()
                && !neighbor.registration_owner
                && neighbor.ll_addr() != Some(reg.eui64)
            {
                net_debug!("duplicate registration for {}", target_addr);
                return EaroDisposition::ReplyWithEaro(AroStatus::Duplicate);
            }
        }

        if reg.lifetime == 0 {
            // Deregistration.
            if let Some(handle) = self.neighbor_cache.lookup(target_addr) {
                self.neighbor_cache
                    .set_registration(handle, Duration::ZERO, false, self.now);
            }
            return EaroDisposition::ReplyWithEaro(AroStatus::Success);
        }

        let Some(handle) = self
            .neighbor_cache
            .update_unsolicited(*target_addr, ll_addr, self.now)
        else {
            return EaroDisposition::ReplyWithEaro(AroStatus::NeighborCacheFull);
        };

        let lifetime = Duration::from_secs(reg.lifetime as u64 * 60);
        self.neighbor_cache
            .set_registration(handle, lifetime, false, self.now);

        EaroDisposition::ReplyWithEaro(AroStatus::Success)
    }

    /// Inbound Neighbor Advertisement, RFC 4861 § 7.1.2 / § 7.2.5
    /// with the Wi-SUN ARO failure handling.
    fn process_na(
        &mut self,
        ip_repr: Ipv6Repr,
        flags: NdiscNeighborFlags,
        target_addr: Ipv6Address,
        lladdr: Option<Eui64>,
        registration: Option<AddressRegistration>,
    ) {
        if target_addr.is_multicast() {
            self.stats.rx_drop += 1;
            return;
        }

        // The solicited flag must be clear on an advertisement sent to
        // a multicast address.
        if ip_repr.dst_addr.is_multicast() && flags.contains(NdiscNeighborFlags::SOLICITED) {
            self.stats.rx_drop += 1;
            return;
        }

        // The EARO in an NA echoes the registration we sent upstream;
        // it is a reply to us, not a DAD defense, so it is examined
        // before the own-address check. A failure status blacklists
        // the advertising router and is raised to the RPL engine.
        if let Some(reg) = registration {
            if reg.eui64 == self.eui64 && reg.status != AroStatus::Success {
                net_debug!("address registration refused: {}", reg.status);
                let router_eui64 = ip_repr
                    .src_addr
                    .link_local_eui64()
                    .unwrap_or(reg.eui64);
                self.push_event(Event::AroFailure {
                    eui64: router_eui64,
                    status: reg.status,
                });
                self.aro_failed(router_eui64);
                return;
            }
        }

        if self.has_ip_addr(&target_addr) {
            net_warn!("NA received for our own address {}: DAD collision", target_addr);
            self.stats.rx_drop += 1;
            return;
        }

        // No need to create an entry when none exists.
        let Some(handle) = self.neighbor_cache.lookup(&target_addr) else {
            return;
        };
        self.neighbor_cache.update_from_na(
            handle,
            flags.contains(NdiscNeighborFlags::ROUTER),
            flags.contains(NdiscNeighborFlags::SOLICITED),
            flags.contains(NdiscNeighborFlags::OVERRIDE),
            lladdr,
            self.now,
        );
    }

    /// Inbound Redirect, RFC 4861 § 8.1/§ 8.3.
    fn process_redirect(
        &mut self,
        ip_repr: Ipv6Repr,
        target_addr: Ipv6Address,
        dest_addr: Ipv6Address,
        lladdr: Option<Eui64>,
    ) {
        if !ip_repr.src_addr.is_link_local() {
            self.stats.rx_drop += 1;
            return;
        }
        if dest_addr.is_multicast() || target_addr.is_multicast() {
            self.stats.rx_drop += 1;
            return;
        }

        if let Some(ll) = lladdr {
            self.neighbor_cache
                .update_unsolicited(target_addr, ll, self.now);
        }

        if self
            .routes
            .add_route(
                crate::wire::Ipv6Cidr::new(dest_addr, 128),
                target_addr,
                None,
            )
            .is_err()
        {
            net_debug!("route table full, redirect for {} ignored", dest_addr);
        }
    }

    /// Emit a Neighbor Advertisement. `R` is always set (this stack is
    /// a router), `S` and `O` per the caller.
    pub(crate) fn send_na(
        &mut self,
        target_addr: Ipv6Address,
        dst_addr: Ipv6Address,
        solicited: bool,
        override_flag: bool,
        registration: Option<AddressRegistration>,
    ) {
        let mut flags = NdiscNeighborFlags::ROUTER;
        if solicited {
            flags |= NdiscNeighborFlags::SOLICITED;
        }
        if override_flag {
            flags |= NdiscNeighborFlags::OVERRIDE;
        }

        // Prefer the target address as source when it is ours.
        let src_addr = if self.has_ip_addr(&target_addr) {
            target_addr
        } else {
            match self.select_source(&dst_addr) {
                Some(addr) => addr,
                None => {
                    self.stats.tx_no_source += 1;
                    return;
                }
            }
        };

        let na = Icmpv6Repr::Ndisc(NdiscRepr::NeighborAdvert {
            flags,
            target_addr,
            lladdr: Some(self.eui64),
            registration,
        });
        let ip_repr = Ipv6Repr {
            src_addr,
            dst_addr,
            next_header: IpProtocol::Icmpv6,
            payload_len: na.buffer_len(),
            hop_limit: 255,
        };
        net_trace!("tx-icmp na dst={}", dst_addr);
        self.send_icmpv6(ip_repr, &na, AckIntent::None);
    }

    /// Emit a Neighbor Solicitation, RFC 4861 § 7.2.2 with the source
    /// selection quirks of § 4.3.6: a prompting source address that is
    /// ours is used as-is, anything else falls back to the link-local
    /// address so the advertisement comes back over the local link
    /// instead of through the DODAG.
    pub(crate) fn send_ns(
        &mut self,
        target_addr: Ipv6Address,
        dst_addr: Option<Ipv6Address>,
        prompting_src_addr: Option<Ipv6Address>,
        registration: Option<AddressRegistration>,
        ack_intent: AckIntent,
    ) {
        let dad = prompting_src_addr == Some(Ipv6Address::UNSPECIFIED);
        let src_addr = if dad {
            Ipv6Address::UNSPECIFIED
        } else {
            match prompting_src_addr.filter(|a| self.has_ip_addr(a)) {
                Some(addr) => addr,
                None => self.ll_addr,
            }
        };
        let dst_addr = dst_addr.unwrap_or_else(|| target_addr.solicited_node());

        // The EARO carries our EUI-64 already; attach an SLLAO only to
        // plain solicitations from a specified source.
        let lladdr = (!dad && registration.is_none()).then_some(self.eui64);

        let ns = Icmpv6Repr::Ndisc(NdiscRepr::NeighborSolicit {
            target_addr,
            lladdr,
            registration,
        });
        let ip_repr = Ipv6Repr {
            src_addr,
            dst_addr,
            next_header: IpProtocol::Icmpv6,
            payload_len: ns.buffer_len(),
            hop_limit: 255,
        };
        net_trace!(
            "tx-icmp ns{} dst={}",
            if registration.is_some() { " w/ earo" } else { "" },
            dst_addr
        );
        self.send_icmpv6(ip_repr, &ns, ack_intent);
    }

    /// Unicast NS probe for neighbor unreachability detection.
    pub(crate) fn send_ns_probe(&mut self, target_addr: Ipv6Address) {
        self.send_ns(
            target_addr,
            Some(target_addr),
            None,
            None,
            AckIntent::UpdateNeighborReachable(target_addr),
        );
    }
}
