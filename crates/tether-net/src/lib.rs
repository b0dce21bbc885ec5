//! Tether Net - Replication plumbing
//!
//! Generic building blocks for authority-driven replication:
//! - Peer identifiers and network roles
//! - Change queues that turn authoritative mutations into numbered deltas
//! - A versioned JSON wire codec
//! - An in-process loopback transport for single-process servers, tests and demos

mod change;
mod codec;
mod error;
mod peer;
mod transport;

pub use change::{ChangeQueue, Delta, DeltaTracker};
pub use codec::{decode, encode, Envelope, PROTOCOL_VERSION};
pub use error::NetError;
pub use peer::{NetRole, PeerId};
pub use transport::{Datagram, LoopbackHub};
