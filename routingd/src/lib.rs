//! The distance-vector routing engine.
//!
//! [`Router`] is a sans-IO state machine fed with IPC records from the MIP
//! daemon and timer ticks; it emits the records to send back. The routing
//! table lives in [`table`].

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod router;
pub mod table;

pub use router::{Router, HELLO_INTERVAL, HELLO_TIMEOUT};
pub use table::{RouteEntry, RoutingTable};
