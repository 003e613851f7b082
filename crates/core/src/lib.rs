//! Core types and utilities for the cross-exchange spread scanner
//!
//! This crate provides shared types used across all components:
//! - Symbol and exchange definitions
//! - Price quotes and per-symbol snapshots
//! - Spread detection and opportunity types
//! - Configuration and error types

pub mod types;
pub mod quotes;
pub mod opportunities;
pub mod config;
pub mod errors;

pub use types::*;
pub use quotes::*;
pub use opportunities::*;
pub use config::*;
pub use errors::*;
