/*! The interface layer.

The `iface` module owns the long-lived soft state of the router node:
the neighbor cache with its reachability state machine, the RPL DODAG
view with its candidate parent set, the routing table, and the
interface context that binds them to the radio.
*/

mod interface;
mod neighbor;
mod route;
pub(crate) mod rpl;

pub use self::interface::{Config, Event, Interface, Stats};
pub use self::neighbor::{
    Cache as NeighborCache, CacheAction, Neighbor, NeighborHandle, State as NeighborState,
    TokenBucket,
};
pub use self::route::{Route, Routes};
pub use self::rpl::{
    AttachState, DioBase, DodagConfiguration, Rpl, RplHandle, RplNeighbor, RplNeighborTable,
};
