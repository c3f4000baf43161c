//! Compile-time sizing of the fixed-capacity tables.
//!
//! These bound memory usage on heapless targets. They are deliberately
//! generous for a FAN router node: a node normally tracks a handful of
//! candidate parents and a few tens of children.

/// Capacity of the neighbor cache arena when the caller asks the stack
/// to own its storage.
pub const IFACE_NEIGHBOR_CACHE_COUNT: usize = 32;

/// Number of candidate parents tracked by the RPL engine.
pub const RPL_NEIGHBOR_TABLE_COUNT: usize = 8;

/// Number of prefixes advertised in one DAO.
pub const RPL_DAO_TARGET_COUNT: usize = 2;

/// Maximum number of options attached to one parsed RPL control message.
pub const RPL_MAX_OPTIONS: usize = 4;

/// Capacity of the routing table.
pub const IFACE_MAX_ROUTE_COUNT: usize = 8;

/// Capacity of the egress queue between the engine and the RCP bus.
/// Sized above the ICMPv6 error bucket so a full burst fits.
pub const IFACE_EGRESS_QUEUE_COUNT: usize = 16;

/// Addresses assigned to the interface (link-local + global).
pub const IFACE_MAX_ADDR_COUNT: usize = 4;

/// Multicast groups joined by the interface.
pub const IFACE_MAX_MULTICAST_GROUP_COUNT: usize = 8;
