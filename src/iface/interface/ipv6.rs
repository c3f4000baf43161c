use super::InterfaceInner;
use crate::phy::RxInd;
use crate::storage::AckIntent;
use crate::wire::{
    Icmpv6DstUnreachable, Icmpv6Message, Icmpv6Packet, Icmpv6ParamProblem, Icmpv6Repr,
    Icmpv6TimeExceeded, IpProtocol, Ipv6Address, Ipv6Repr, IPV6_HEADER_LEN, IPV6_MIN_MTU,
};

/// Ingress flags kept from the MAC indication, needed by the RFC 4443
/// error rules.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RxFlags {
    pub ll_security_bypass: bool,
    pub ll_multicast_rx: bool,
}

impl<'a> InterfaceInner<'a> {
    pub(super) fn process_ipv6(&mut self, ind: &RxInd, ip_repr: Ipv6Repr, payload: &[u8]) {
        let flags = RxFlags {
            ll_security_bypass: !ind.security_ok,
            ll_multicast_rx: ind.multicast,
        };

        let for_us = if ip_repr.dst_addr.is_multicast() {
            self.has_multicast_group(&ip_repr.dst_addr)
        } else {
            self.has_ip_addr(&ip_repr.dst_addr)
        };

        if !for_us {
            if ip_repr.dst_addr.is_multicast() {
                self.stats.rx_drop += 1;
                return;
            }
            self.forward(ip_repr, payload, flags);
            return;
        }

        match ip_repr.next_header {
            IpProtocol::Icmpv6 => self.process_icmpv6(ind, ip_repr, payload, flags),
            // No transport consumer lives in this stack; the TUN
            // bridge owns UDP/TCP towards the host. A packet that
            // lands here carries a next header we cannot dispatch:
            // Parameter Problem, code 1, pointer at the Next Header
            // field (RFC 8200 § 4).
            _ => {
                net_trace!(
                    "unrecognized next header {} from {}",
                    ip_repr.next_header,
                    ip_repr.src_addr
                );
                self.icmpv6_error(
                    ip_repr,
                    payload,
                    flags,
                    ErrorKind::ParamProblem {
                        reason: Icmpv6ParamProblem::UnrecognizedNxtHdr,
                        pointer: 6,
                    },
                );
            }
        }
    }

    /// Forward a unicast packet that is not addressed to us up the
    /// DODAG. Non-storing routing for downward traffic is the root's
    /// business; everything off-link leaves through the default route.
    fn forward(&mut self, ip_repr: Ipv6Repr, payload: &[u8], flags: RxFlags) {
        if ip_repr.hop_limit <= 1 {
            net_trace!("hop limit exhausted for {}", ip_repr.dst_addr);
            self.icmpv6_error(
                ip_repr,
                payload,
                flags,
                ErrorKind::TimeExceeded(Icmpv6TimeExceeded::HopLimitExceeded),
            );
            return;
        }

        // Fragmentation is not performed; a transit packet that does
        // not fit the link is answered with Packet Too Big.
        if IPV6_HEADER_LEN + payload.len() > self.link_mtu {
            net_trace!(
                "packet too big for {} (mtu {})",
                ip_repr.dst_addr,
                self.link_mtu
            );
            self.icmpv6_error(
                ip_repr,
                payload,
                flags,
                ErrorKind::PktTooBig {
                    mtu: self.link_mtu as u32,
                },
            );
            return;
        }

        let Ok(ll_dst) = self.resolve_ll(&ip_repr.dst_addr) else {
            self.stats.tx_no_route += 1;
            net_trace!("no route to {}", ip_repr.dst_addr);
            self.icmpv6_error(
                ip_repr,
                payload,
                flags,
                ErrorKind::DstUnreachable(Icmpv6DstUnreachable::NoRoute),
            );
            return;
        };

        let total = IPV6_HEADER_LEN + payload.len();
        let Some(mut packet) = crate::storage::PacketBuf::with_len(total) else {
            return;
        };

        let mut forwarded = ip_repr;
        forwarded.hop_limit -= 1;
        {
            let mut ipv6 = crate::wire::Ipv6Packet::new_unchecked(packet.payload_mut());
            forwarded.emit(&mut ipv6);
            ipv6.payload_mut().copy_from_slice(payload);
        }
        packet.meta.src_addr = forwarded.src_addr;
        packet.meta.dst_addr = forwarded.dst_addr;
        packet.meta.hop_limit = forwarded.hop_limit;
        packet.meta.direction = crate::storage::Direction::Down;
        packet.meta.ll_dst = ll_dst;

        if self.egress.push_back(packet).is_err() {
            self.stats.tx_queue_full += 1;
        }
    }

    fn process_icmpv6(
        &mut self,
        ind: &RxInd,
        ip_repr: Ipv6Repr,
        payload: &[u8],
        flags: RxFlags,
    ) {
        let packet = Icmpv6Packet::new_unchecked(payload);
        let repr = match Icmpv6Repr::parse(&ip_repr.src_addr, &ip_repr.dst_addr, &packet) {
            Ok(repr) => repr,
            Err(_) => {
                // Distinguish the checksum counter from the general
                // malformed counter the way the original stack does.
                if packet.check_len().is_ok()
                    && !packet.verify_checksum(&ip_repr.src_addr, &ip_repr.dst_addr)
                {
                    self.stats.rx_checksum += 1;
                    net_trace!("drop icmpv6: invalid checksum");
                } else {
                    self.stats.rx_malformed += 1;
                    net_trace!("drop icmpv6: malformed");
                }
                return;
            }
        };

        match repr {
            Icmpv6Repr::Ndisc(ndisc) => {
                // All of NS/NA/RS/RA/Redirect share the hop-limit-255
                // guard of RFC 4861; the code-0 guard is enforced by
                // the parser.
                if ip_repr.hop_limit != 255 {
                    self.stats.rx_drop += 1;
                    net_trace!("drop ndisc: hop limit {}", ip_repr.hop_limit);
                    return;
                }
                self.process_ndisc(ip_repr, ndisc);
            }
            Icmpv6Repr::Rpl(rpl) => self.process_rpl(ind.src, ip_repr, rpl),
            Icmpv6Repr::EchoRequest {
                ident,
                seq_no,
                data,
            } => {
                let reply = Icmpv6Repr::EchoReply {
                    ident,
                    seq_no,
                    data,
                };
                let Some(src_addr) = self.echo_reply_source(&ip_repr) else {
                    self.stats.tx_no_source += 1;
                    return;
                };
                let reply_repr = Ipv6Repr {
                    src_addr,
                    dst_addr: ip_repr.src_addr,
                    next_header: IpProtocol::Icmpv6,
                    payload_len: reply.buffer_len(),
                    hop_limit: self.cur_hop_limit,
                };
                self.send_icmpv6(reply_repr, &reply, AckIntent::None);
            }
            Icmpv6Repr::EchoReply { .. } => (),
            // Inbound errors terminate here; per RFC 4443 they must
            // never provoke further errors.
            Icmpv6Repr::DstUnreachable { .. }
            | Icmpv6Repr::PktTooBig { .. }
            | Icmpv6Repr::TimeExceeded { .. }
            | Icmpv6Repr::ParamProblem { .. } => {
                net_trace!("icmpv6 error from {}", ip_repr.src_addr);
            }
        }
    }

    fn echo_reply_source(&self, ip_repr: &Ipv6Repr) -> Option<Ipv6Address> {
        if ip_repr.dst_addr.is_unicast() && self.has_ip_addr(&ip_repr.dst_addr) {
            Some(ip_repr.dst_addr)
        } else {
            self.select_source(&ip_repr.src_addr)
        }
    }
}

/// The kind of ICMPv6 error to emit.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ErrorKind {
    DstUnreachable(Icmpv6DstUnreachable),
    PktTooBig {
        mtu: u32,
    },
    TimeExceeded(Icmpv6TimeExceeded),
    ParamProblem {
        reason: Icmpv6ParamProblem,
        pointer: u32,
    },
}

impl<'a> InterfaceInner<'a> {
    /// Emit an ICMPv6 error about a received packet, enforcing the
    /// processing rules of RFC 4443 § 2.4 (e.1-e.6) and the token
    /// bucket.
    pub(crate) fn icmpv6_error(
        &mut self,
        ip_repr: Ipv6Repr,
        payload: &[u8],
        flags: RxFlags,
        kind: ErrorKind,
    ) {
        // Improperly secured packets either reach their consumer or
        // are dropped; they are never answered.
        if flags.ll_security_bypass {
            return;
        }

        // e.1, e.2: never answer an ICMPv6 error or a Redirect.
        if ip_repr.next_header == IpProtocol::Icmpv6 && !payload.is_empty() {
            let msg_type = Icmpv6Message::from(payload[0]);
            if msg_type.is_error() || msg_type == Icmpv6Message::Redirect {
                return;
            }
        }

        // e.3, e.4: no errors for multicast or link-layer broadcast
        // destinations, except Packet Too Big and the
        // unrecognized-option flavor of Parameter Problem.
        if ip_repr.dst_addr.is_multicast() || flags.ll_multicast_rx {
            let exempt = matches!(
                kind,
                ErrorKind::PktTooBig { .. }
                    | ErrorKind::ParamProblem {
                        reason: Icmpv6ParamProblem::UnrecognizedOption,
                        ..
                    }
            );
            if !exempt {
                return;
            }
        }

        // e.6: the source must identify a single node.
        if ip_repr.src_addr.is_unspecified() || ip_repr.src_addr.is_multicast() {
            return;
        }

        // Token bucket, RFC 4443 § 2.4(f).
        if !self.neighbor_cache.token_bucket.take(self.now) {
            self.stats.tx_rate_limited += 1;
            return;
        }

        // RFC 4443 § 2.2: when the offending packet was addressed to
        // one of our unicast addresses, that address is the source.
        let src_addr = if ip_repr.dst_addr.is_unicast() && self.has_ip_addr(&ip_repr.dst_addr) {
            ip_repr.dst_addr
        } else {
            match self.select_source(&ip_repr.src_addr) {
                Some(addr) => addr,
                None => {
                    self.stats.tx_no_source += 1;
                    net_warn!("no source address for ICMPv6 error");
                    return;
                }
            }
        };

        // Include as much of the offending packet as fits under the
        // minimum MTU; the wire layer clamps during emission as well.
        let max_data = IPV6_MIN_MTU - IPV6_HEADER_LEN - 8 - ip_repr.buffer_len();
        let data = &payload[..payload.len().min(max_data)];

        let error = match kind {
            ErrorKind::DstUnreachable(reason) => Icmpv6Repr::DstUnreachable {
                reason,
                header: ip_repr,
                data,
            },
            ErrorKind::PktTooBig { mtu } => Icmpv6Repr::PktTooBig {
                mtu,
                header: ip_repr,
                data,
            },
            ErrorKind::TimeExceeded(reason) => Icmpv6Repr::TimeExceeded {
                reason,
                header: ip_repr,
                data,
            },
            ErrorKind::ParamProblem { reason, pointer } => Icmpv6Repr::ParamProblem {
                reason,
                pointer,
                header: ip_repr,
                data,
            },
        };

        let error_ip = Ipv6Repr {
            src_addr,
            dst_addr: ip_repr.src_addr,
            next_header: IpProtocol::Icmpv6,
            payload_len: error.buffer_len(),
            hop_limit: self.cur_hop_limit,
        };
        self.send_icmpv6(error_ip, &error, AckIntent::None);
    }
}
