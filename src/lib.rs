//! Manufacturing request approval workflow
//!
//! Requests move through product-owner and admin review while staying in sync with
//! their production orders.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod context;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod scheduler;
pub mod services;

pub use context::ExecutionContext;
pub use errors::{ErrorKind, ServiceError, ServiceResult};
pub use services::MrpWorkflow;
