//! # Keepsake Sync Engine
//!
//! Keeps a single versioned document in sync between a local cache file and
//! a remote record store.
//!
//! This crate provides:
//! - [`SyncEngine`], the public handle: local edits, subscriptions, readiness
//! - [`RemoteStore`], the seam to the backend, plus [`MockRemote`] for tests
//! - [`SyncConfig`] with the cache location, record naming and timings
//!
//! ## Architecture
//!
//! The engine runs as three cooperating parts:
//! 1. An actor task owning the model, the subscriber list and the debounced
//!    cache write
//! 2. A coordinator task resolving the remote identity once, throttling
//!    pulls and coalescing pushes
//! 3. A fan-out thread delivering every model change to subscribers in order
//!
//! ## Key Invariants
//!
//! - The newest timestamp wins; equal timestamps keep the local model
//! - Remote state never pushes back; local edits always push after the write
//! - The cache file is replaced atomically
//! - Identity resolution happens at most once at a time
//! - Remote failures are logged and absorbed, never surfaced

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod actor;
mod config;
mod coordinator;
mod engine;
mod error;
mod gate;
mod mock;
mod publisher;
mod remote;

pub use config::SyncConfig;
pub use engine::{EnginePhase, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use gate::ReadyGate;
pub use mock::{MockCalls, MockRemote, MOCK_IDENTITY};
pub use publisher::{Callback, Subscription, DISPATCHER_THREAD};
pub use remote::{
    AccountStatus, RecordId, RemoteIdentity, RemoteStore, SubscriptionDescriptor, Triggers,
};
