//! Cross-exchange spread scanner application
//!
//! Wires the price feeds, detector and notifier into single-flight scan
//! cycles and presents the results on the console.

pub mod console;
pub mod coordinator;
pub mod settings;

pub use coordinator::{AlertedOpportunity, CycleError, CycleReport, ScanCoordinator};
