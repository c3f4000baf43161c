/*! The Wi-SUN FAN router node network stack.

`smolfan` implements the IPv6-over-802.15.4 core of a Wi-SUN FAN
router node: the neighbor discovery and RPL state machines that turn a
radio co-processor into a routing node on a FAN mesh. The crate is
sans-I/O in the smoltcp tradition: the caller owns the file
descriptors and the RCP transport, and hands decoded indications and
a monotonic clock to the stack.

The stack is split in layers:

 * The `wire` module provides bit-exact access to the packets flowing
   through the mesh: IPv6, ICMPv6, NDISC (with the Wi-SUN extended
   address registration option), and RPL control messages.
 * The `storage` module owns the packet buffer used to carry one
   packet, with its metadata, through the engine exactly once.
 * The `iface` module holds the long-lived soft state: the neighbor
   cache, the RPL DODAG view, the routing table, and the interface
   context that fuses them.
 * The `phy` module describes the radio co-processor contract.
 * The `sched` module (`std` only) multiplexes timer deadlines and
   file-descriptor readiness into the single dispatch loop the engine
   runs on.

# Hosted usage

A daemon creates an [iface::Interface], registers the RCP bus fd with
[sched::Poller], and feeds indications in; the stack never blocks and
never spawns threads.
*/

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]

#[cfg(not(any(feature = "std", feature = "alloc")))]
compile_error!("at least one of the \"std\" or \"alloc\" features must be enabled");

#[cfg(feature = "alloc")]
extern crate alloc;

#[macro_use]
mod macros;

pub mod config;
pub mod iface;
pub mod phy;
mod rand;
#[cfg(feature = "std")]
pub mod sched;
pub mod storage;
pub mod time;
pub mod wire;
