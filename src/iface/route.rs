use heapless::Vec;

use crate::config::IFACE_MAX_ROUTE_COUNT;
use crate::time::Instant;
use crate::wire::{Ipv6Address, Ipv6Cidr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RouteTableFull;

impl core::fmt::Display for RouteTableFull {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "route table full")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RouteTableFull {}

/// A prefix of addresses that should be routed via a router.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Route {
    pub cidr: Ipv6Cidr,
    pub via_router: Ipv6Address,
    /// `None` means "forever".
    pub expires_at: Option<Instant>,
}

const IPV6_DEFAULT: Ipv6Cidr = Ipv6Cidr::new(Ipv6Address::UNSPECIFIED, 0);

impl Route {
    /// Returns a route to ::/0 via the `gateway`, with no expiry.
    pub fn new_default_gateway(gateway: Ipv6Address) -> Route {
        Route {
            cidr: IPV6_DEFAULT,
            via_router: gateway,
            expires_at: None,
        }
    }
}

/// A routing table.
#[derive(Debug, Default)]
pub struct Routes {
    storage: Vec<Route, IFACE_MAX_ROUTE_COUNT>,
}

impl Routes {
    /// Creates a new empty routing table.
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
        }
    }

    /// Add a default gateway (ie. "ip -6 route add ::/0 via
    /// `gateway`"), replacing a previous one.
    ///
    /// On success, returns the previous default route, if any.
    pub fn add_default_route(
        &mut self,
        gateway: Ipv6Address,
    ) -> Result<Option<Route>, RouteTableFull> {
        let old = self.remove_default_route();
        self.storage
            .push(Route::new_default_gateway(gateway))
            .map_err(|_| RouteTableFull)?;
        Ok(old)
    }

    /// Remove the default route.
    ///
    /// Returns the previous default route, if any.
    pub fn remove_default_route(&mut self) -> Option<Route> {
        if let Some(i) = self.storage.iter().position(|r| r.cidr == IPV6_DEFAULT) {
            Some(self.storage.swap_remove(i))
        } else {
            None
        }
    }

    /// Add a host or prefix route.
    pub fn add_route(
        &mut self,
        cidr: Ipv6Cidr,
        via_router: Ipv6Address,
        expires_at: Option<Instant>,
    ) -> Result<(), RouteTableFull> {
        if let Some(route) = self.storage.iter_mut().find(|r| r.cidr == cidr) {
            route.via_router = via_router;
            route.expires_at = expires_at;
            return Ok(());
        }
        self.storage
            .push(Route {
                cidr,
                via_router,
                expires_at,
            })
            .map_err(|_| RouteTableFull)
    }

    /// Drop all routes through the given router.
    pub fn remove_routes_via(&mut self, router: &Ipv6Address) {
        while let Some(i) = self
            .storage
            .iter()
            .position(|r| r.via_router == *router)
        {
            self.storage.swap_remove(i);
        }
    }

    pub(crate) fn lookup(&self, addr: &Ipv6Address, timestamp: Instant) -> Option<Ipv6Address> {
        assert!(addr.is_unicast());

        self.storage
            .iter()
            .filter(|route| route.cidr.contains_addr(addr))
            .filter(|route| match route.expires_at {
                Some(expires_at) => timestamp < expires_at,
                None => true,
            })
            // Longest prefix match.
            .max_by_key(|route| route.cidr.prefix_len())
            .map(|route| route.via_router)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const GW_1: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 1);
    const GW_2: Ipv6Address = Ipv6Address::new(0xfe80, 0, 0, 0, 0, 0, 0, 2);

    #[test]
    fn default_route() {
        let mut routes = Routes::new();
        assert_eq!(
            routes.lookup(&Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), Instant::ZERO),
            None
        );

        routes.add_default_route(GW_1).unwrap();
        assert_eq!(
            routes.lookup(&Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), Instant::ZERO),
            Some(GW_1)
        );

        // replacing keeps a single default route
        let old = routes.add_default_route(GW_2).unwrap();
        assert_eq!(old.map(|r| r.via_router), Some(GW_1));
        assert_eq!(
            routes.lookup(&Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), Instant::ZERO),
            Some(GW_2)
        );
    }

    #[test]
    fn longest_prefix_and_expiry() {
        let mut routes = Routes::new();
        routes.add_default_route(GW_1).unwrap();
        routes
            .add_route(
                Ipv6Cidr::new(Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0), 64),
                GW_2,
                Some(Instant::from_secs(10)),
            )
            .unwrap();

        let addr = Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 99);
        assert_eq!(routes.lookup(&addr, Instant::ZERO), Some(GW_2));
        // after expiry the default takes over
        assert_eq!(routes.lookup(&addr, Instant::from_secs(11)), Some(GW_1));
    }

    #[test]
    fn remove_via() {
        let mut routes = Routes::new();
        routes.add_default_route(GW_1).unwrap();
        routes.remove_routes_via(&GW_1);
        assert_eq!(
            routes.lookup(&Ipv6Address::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), Instant::ZERO),
            None
        );
    }
}
