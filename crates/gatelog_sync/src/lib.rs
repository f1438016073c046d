//! # Gatelog Sync
//!
//! Best-effort mirroring of local security-log mutations to a remote
//! relational store.
//!
//! This crate provides:
//! - [`SyncOp`]: one pending remote operation (INSERT/UPDATE/DELETE/EXIT)
//! - [`SyncQueue`]: durable FIFO retry buffer with a non-reentrant drain
//! - [`MirrorClient`]: translates a local mutation into the matching
//!   remote table call, correlating rows by `created_at`
//! - [`RemoteTable`]: the remote boundary, with a typed [`Filter`] instead
//!   of string-built queries
//! - [`HttpRemoteTable`]: PostgREST-dialect implementation over an
//!   abstract [`HttpClient`]
//!
//! ## Key invariants
//!
//! - The local write has always already succeeded by the time anything in
//!   this crate runs; remote failures are absorbed into the queue and
//!   never surface to the caller of the originating mutation.
//! - An entry is dropped after its third failed drain pass. Transient and
//!   permanent remote failures are deliberately retried identically; the
//!   client cannot tell them apart.
//! - The queue is an ordered sequence persisted as a single JSON blob;
//!   the same logical mutation may legitimately appear twice.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod mirror;
mod op;
mod queue;
mod remote;

pub use config::SyncConfig;
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRemoteTable, HttpRequest, HttpResponse, RemoteConfig};
pub use mirror::MirrorClient;
pub use op::{QueueEntry, SyncOp};
pub use queue::{DrainReport, FileQueueBackend, MemoryQueueBackend, QueueBackend, SyncQueue};
pub use remote::{Condition, Filter, MockRemoteTable, RemoteTable};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
