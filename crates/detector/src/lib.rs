//! Opportunity detection
//!
//! Features:
//! - Batched, throttled scans over the symbol universe
//! - Per-symbol concurrent price aggregation
//! - Threshold filtering of cross-exchange spreads
//! - Cooldown-based alert de-duplication

pub mod dedup;
pub mod scanner;

pub use dedup::AlertDeduplicator;
pub use scanner::{OpportunityScanner, ScanReport};
