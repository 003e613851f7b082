//! Per-symbol alert cooldown

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;

use arb_core::Symbol;

/// Suppresses repeat alerts for a symbol inside a fixed cooldown window.
///
/// Entries are created on the first alert and overwritten on every later one;
/// nothing is ever removed, old entries just stop matching the window.
#[derive(Debug)]
pub struct AlertDeduplicator {
    cooldown: Duration,
    last_alerted: HashMap<Symbol, DateTime<Utc>>,
}

impl AlertDeduplicator {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_alerted: HashMap::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns true and records `now` if the symbol is outside its cooldown.
    ///
    /// A `now` earlier than the recorded time (clock stepped back) counts as
    /// still cooling down.
    pub fn should_alert(&mut self, symbol: &Symbol, now: DateTime<Utc>) -> bool {
        if let Some(last) = self.last_alerted.get(symbol) {
            match (now - *last).to_std() {
                Ok(elapsed) if elapsed >= self.cooldown => {}
                _ => return false,
            }
        }

        self.last_alerted.insert(symbol.clone(), now);
        true
    }

    pub fn last_alerted(&self, symbol: &Symbol) -> Option<DateTime<Utc>> {
        self.last_alerted.get(symbol).copied()
    }

    pub fn tracked_symbols(&self) -> usize {
        self.last_alerted.len()
    }
}
