//! `berth-core` is the engine behind the berth container service.
//!
//! # Overview
//!
//! berth exposes container lifecycle operations to authenticated users. This crate holds
//! everything between the API surface and the container engine:
//! - Asynchronous container creation tracked by poll-able job records
//! - Per-container concurrency control (request coalescing and mutual exclusion)
//! - Ownership-based authorization of every mutating operation
//! - Compensation of partially completed work
//!
//! # Modules
//!
//! - [`config`] - Constants and defaults shared across the workspace
//! - [`management`] - The container orchestrator and its concurrency guard
//! - [`models`] - Job and container records
//! - [`runtime`] - Container engine abstraction and its Docker and in-memory backends
//! - [`store`] - Job store and ownership registry backends

#![warn(missing_docs)]

mod error;

//--------------------------------------------------------------------------------------------------
// Exports
//--------------------------------------------------------------------------------------------------

pub mod config;
pub mod management;
pub mod models;
pub mod runtime;
pub mod store;

pub use error::*;
