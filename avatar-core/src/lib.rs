//! # avatar-core
//!
//! Pure logic for Rooh Avatar sync (no I/O, instant tests).
//!
//! This crate holds the session lifecycle state machine and the sync status
//! values published to the presentation layer, without any transport or
//! runtime dependency.
//!
//! ## Design Philosophy
//!
//! [`SessionState::on_event`] takes an event and returns the next state plus
//! the actions to perform. The actual transport calls are made by
//! `avatar-client`, which interprets those actions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod state;
pub mod status;

pub use state::{Action, Event, SessionState};
pub use status::{SyncFailure, SyncStatus};
