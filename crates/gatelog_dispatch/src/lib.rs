//! # Gatelog Dispatch
//!
//! The single entry point UI code talks to. A [`Dispatcher`] owns one
//! [`gatelog_core::LocalStore`], one remote mirror and the sync queue,
//! and wires them into the dual-write scheme:
//!
//! 1. every mutation is written to the local store first and the call
//!    returns as soon as that write is durable;
//! 2. the matching remote operation is handed to a background worker,
//!    fire-and-forget — a remote failure lands in the sync queue and is
//!    retried on the periodic drain schedule, never surfacing to the
//!    caller.
//!
//! The worker lifecycle is explicit: nothing runs until [`Dispatcher::start`]
//! and everything is joined by [`Dispatcher::stop`]. While the worker is
//! not running, mutations still mirror correctly — their ops go straight
//! into the queue instead of being attempted.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dispatcher;

pub use dispatcher::Dispatcher;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
