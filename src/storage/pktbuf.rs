use alloc::vec::Vec;
use managed::Managed;

use crate::wire::{Eui64, Ipv6Address};

/// Which way a packet is flowing through the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// From the radio towards the engine.
    #[default]
    Up,
    /// From the engine towards the radio.
    Down,
}

/// What the MAC confirmation handler should do once the link layer
/// acknowledged (or gave up on) this packet.
///
/// This replaces per-packet completion callbacks: the intent is
/// matched by the interface when the corresponding `tx_cnf` arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AckIntent {
    #[default]
    None,
    /// A solicited NS got its MAC ACK: mark the neighbor reachable.
    UpdateNeighborReachable(Ipv6Address),
    /// A probe exhausted its retries: drop the neighbor.
    RemoveNeighbor(Ipv6Address),
    /// An NS carrying an address registration was ACKed; in Wi-SUN the
    /// MAC ACK is sufficient confirmation of the registration.
    NotifyAroResult(Eui64),
}

/// Per-packet metadata riding along the octet buffer.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketMeta {
    pub src_addr: Ipv6Address,
    pub dst_addr: Ipv6Address,
    pub hop_limit: u8,
    pub traffic_class: u8,
    pub icmp_type: u8,
    pub icmp_code: u8,
    /// The frame arrived without passing link-layer security.
    pub ll_security_bypass: bool,
    /// The frame was received as a link-layer multicast.
    pub ll_multicast_rx: bool,
    /// The frame was received as a link-layer broadcast.
    pub ll_broadcast_rx: bool,
    pub direction: Direction,
    pub ack_intent: AckIntent,
    /// Destination EUI-64 for the MAC data request, once resolved.
    pub ll_dst: Option<Eui64>,
}

/// A contiguous octet region plus per-packet metadata.
///
/// The payload occupies `storage[head..tail]`. Headers are prepended
/// by moving `head` towards the front of the region;
/// [PacketBuf::headroom] shifts the payload towards the back when the
/// front is exhausted. The backing storage may be borrowed or owned
/// through [managed::Managed] and never grows: a packet that cannot
/// fit its region is surfaced as `None` and dropped by the caller.
#[derive(Debug)]
pub struct PacketBuf<'a> {
    storage: Managed<'a, [u8]>,
    head: usize,
    tail: usize,
    pub meta: PacketMeta,
}

impl<'a> PacketBuf<'a> {
    /// Default front spare kept for the headers of a downward packet.
    const DEFAULT_HEADROOM: usize = 48;

    /// Create a packet buffer with an empty payload on the given
    /// storage. The front of the region becomes headroom.
    pub fn new<S>(storage: S) -> PacketBuf<'a>
    where
        S: Into<Managed<'a, [u8]>>,
    {
        let storage = storage.into();
        let head = Self::DEFAULT_HEADROOM.min(storage.len());
        PacketBuf {
            storage,
            head,
            tail: head,
            meta: PacketMeta::default(),
        }
    }

    /// The current payload.
    pub fn payload(&self) -> &[u8] {
        &self.storage[self.head..self.tail]
    }

    /// The current payload, mutably.
    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.storage[self.head..self.tail]
    }

    /// The payload length in octets.
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ensure at least `n` spare octets exist in front of the payload,
    /// shifting it towards the back of the region when needed. Returns
    /// `None` when the region is too small, in which case the packet
    /// must be dropped by the caller.
    pub fn headroom(&mut self, n: usize) -> Option<()> {
        if self.head >= n {
            return Some(());
        }
        let shift = n - self.head;
        if self.storage.len() - self.tail < shift {
            return None;
        }
        self.storage
            .copy_within(self.head..self.tail, self.head + shift);
        self.head += shift;
        self.tail += shift;
        Some(())
    }

    /// Drop `n` octets from the front of the payload.
    ///
    /// # Panics
    /// Panics if the payload is shorter than `n`.
    pub fn strip_header(&mut self, n: usize) {
        assert!(self.len() >= n);
        self.head += n;
    }

    /// Prepend `n` octets to the payload and return them for writing.
    /// The caller must have ensured the headroom.
    ///
    /// # Panics
    /// Panics if less than `n` octets of headroom are available.
    pub fn reserve_header(&mut self, n: usize) -> &mut [u8] {
        assert!(self.head >= n);
        self.head -= n;
        let head = self.head;
        &mut self.storage[head..head + n]
    }

    /// Truncate the payload to at most `n` octets.
    pub fn truncate(&mut self, n: usize) {
        if self.len() > n {
            self.tail = self.head + n;
        }
    }

    /// Turn the packet around: swap source and destination, flip the
    /// direction to [Direction::Down]. The rest of the metadata is
    /// kept, so an inbound frame can be reused as the seed of a reply.
    pub fn turnaround(&mut self) {
        core::mem::swap(&mut self.meta.src_addr, &mut self.meta.dst_addr);
        self.meta.direction = Direction::Down;
    }
}

/// Owned-storage constructors, used by the engine for the packets it
/// originates.
impl PacketBuf<'static> {
    /// Allocate owned storage able to hold `capacity` payload octets
    /// behind the default headroom. Returns `None` when the allocation
    /// fails.
    pub fn alloc(capacity: usize) -> Option<PacketBuf<'static>> {
        let total = Self::DEFAULT_HEADROOM + capacity;
        let mut data = Vec::new();
        data.try_reserve_exact(total).ok()?;
        data.resize(total, 0);
        Some(PacketBuf {
            storage: data.into(),
            head: Self::DEFAULT_HEADROOM,
            tail: Self::DEFAULT_HEADROOM,
            meta: PacketMeta::default(),
        })
    }

    /// Allocate a buffer holding a copy of `payload`.
    pub fn from_payload(payload: &[u8]) -> Option<PacketBuf<'static>> {
        let mut buf = Self::alloc(payload.len())?;
        buf.tail += payload.len();
        buf.payload_mut().copy_from_slice(payload);
        Some(buf)
    }

    /// Allocate a buffer with a zero-filled payload of `len` octets,
    /// ready for in-place emission.
    pub fn with_len(len: usize) -> Option<PacketBuf<'static>> {
        let mut buf = Self::alloc(len)?;
        buf.tail += len;
        Some(buf)
    }
}
