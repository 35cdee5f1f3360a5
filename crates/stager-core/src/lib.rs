//! Backend lifecycle management for the stager dispatcher: port allocation,
//! per-tenant worker state, readiness probing, and idle supervision.
//!
//! This crate has no notion of HTTP requests or the Host header. That
//! belongs to the `stager` binary crate. `stager-core` only knows how to
//! turn a tenant name into a running, proxyable [`worker::Worker`].

pub mod config;
pub mod error;
pub mod manager;
pub mod port_pool;
pub mod prober;
pub mod supervisor;
pub mod worker;

pub use config::Config;
pub use error::{ManagerError, PoolError};
pub use manager::Manager;
pub use worker::{Worker, WorkerState};
