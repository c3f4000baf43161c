/*! Low-level packet access and construction.

The `wire` module deals with the packet *representation*. It provides
two levels of functionality.

 * First, it provides functions to extract fields from sequences of
   octets, and to insert fields into sequences of octets. This happens
   through the `Packet` family of structures, e.g.
   [Ipv6Packet](struct.Ipv6Packet.html).

 * Second, in cases where the space of valid field values is much
   smaller than the space of possible field values, it provides a
   compact, high-level representation of packet data that can be parsed
   from and emitted into a sequence of octets. This happens through the
   `Repr` family of enums, e.g. [NdiscRepr](enum.NdiscRepr.html).

The functions in the `wire` module are designed for use together with
`-Cpanic=abort`. The accessor and parsing functions never panic. The
setter and emission functions only panic if the underlying buffer is
too small.

The data structures in the `wire` module do not perform validation of
received data beyond what is necessary to build the representation;
protocol-level validation (hop limits, source classes, rate limits) is
the job of the `iface` layer.
*/

mod field {
    pub type Field = ::core::ops::Range<usize>;
    pub type Rest = ::core::ops::RangeFrom<usize>;
}

pub mod eui64;
pub mod icmpv6;
pub mod ipv6;
pub mod ndisc;
pub mod ndiscoption;
pub mod rpl;

/// Parsing a packet failed.
///
/// Either it is malformed, or it is not supported by this stack.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Error;

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "wire::Error")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

pub type Result<T> = core::result::Result<T, Error>;

pub use self::eui64::Eui64;
pub use self::ipv6::{
    Address as Ipv6Address, Cidr as Ipv6Cidr, Packet as Ipv6Packet, Protocol as IpProtocol,
    Repr as Ipv6Repr, IPV6_HEADER_LEN, IPV6_MIN_MTU,
};

pub use self::icmpv6::{
    DstUnreachable as Icmpv6DstUnreachable, Message as Icmpv6Message, Packet as Icmpv6Packet,
    ParamProblem as Icmpv6ParamProblem, Repr as Icmpv6Repr, TimeExceeded as Icmpv6TimeExceeded,
};

pub use self::ndiscoption::{
    AddressRegistration, AroFlags, AroStatus, NdiscOption, PrefixInfoFlags,
    PrefixInformation as NdiscPrefixInformation, RedirectedHeader as NdiscRedirectedHeader,
    Repr as NdiscOptionRepr, Type as NdiscOptionType,
};

pub use self::ndisc::{NeighborFlags as NdiscNeighborFlags, Repr as NdiscRepr, RouterFlags as NdiscRouterFlags};

pub use self::rpl::{
    options::Repr as RplOptionRepr, InstanceId as RplInstanceId,
    ModeOfOperation as RplModeOfOperation, Repr as RplRepr, RplControlMessage,
};
