//! Packet buffers.
//!
//! The `storage` module owns the buffer a packet lives in while it
//! flows through the engine. A buffer is created once, carried through
//! the layers exactly once, and released on drop.

mod pktbuf;

pub use self::pktbuf::{AckIntent, Direction, PacketBuf, PacketMeta};
