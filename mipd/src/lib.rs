//! The MIP forwarding plane.
//!
//! [`daemon::Daemon`] is a sans-IO state machine: frames, client messages
//! and connection events go in, [`daemon::Command`]s come out. The
//! [`eventloop::Eventloop`] owns the sockets and causes the side-effects
//! the commands describe.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod daemon;
pub mod eventloop;

pub use daemon::{ClientId, Command, Daemon};
pub use eventloop::Eventloop;
