//! Wire formats of the MIP protocol suite.
//!
//! Everything that crosses a process boundary is defined here: the MIP PDU
//! carried in Ethernet frames, the ARP message carried in ARP-typed PDUs,
//! the record format spoken over the local SEQPACKET socket, and the four
//! routing-protocol messages.
//!
//! All encodings are defined at the byte level, big-endian within
//! multi-byte fields, so peers of different architectures interoperate.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod arp;
mod pdu;
mod record;
mod routing;

pub use arp::{ArpMessage, ArpOp};
pub use pdu::{MipPacket, SduType};
pub use record::Record;
pub use routing::RoutingMsg;

/// EtherType of MIP frames.
pub const ETHERTYPE_MIP: u16 = 0x88B5;

/// Broadcast MIP address; also the "no route" / "unreachable" sentinel.
pub const BROADCAST_ADDR: u8 = 255;

/// Largest value the 4-bit TTL field can carry.
pub const MAX_TTL: u8 = 15;

/// Largest SDU the 9-bit length field can describe.
pub const MAX_SDU_LEN: usize = 511;

/// Route cost meaning "unreachable".
pub const MAX_COST: u8 = 255;

/// Errors produced when decoding any of the wire formats in this crate.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer too short: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },
    #[error("unknown SDU type {0}")]
    UnknownSduType(u8),
    #[error("SDU length {0} exceeds maximum")]
    SduTooLong(usize),
    #[error("unknown routing message tag {0:?}")]
    UnknownTag([u8; 3]),
}
