//! Console presentation of cycle results

use chrono::{DateTime, Local, Utc};
use rust_decimal::Decimal;
use std::fmt::Write;

use crate::coordinator::{AlertedOpportunity, CycleError, CycleReport};

pub const PROMPT: &str = "Press Enter to scan for arbitrage opportunities, q + Enter to quit";

/// Text block for one alerted opportunity
pub fn render_alert(alert: &AlertedOpportunity) -> String {
    let opp = &alert.opportunity;
    let mut out = String::new();

    let _ = writeln!(out, "Symbol: {}", opp.symbol);
    let _ = writeln!(out, "  Buy on {} at {}", opp.buy_exchange, opp.display_buy_price());
    let _ = writeln!(out, "  Sell on {} at {}", opp.sell_exchange, opp.display_sell_price());
    let _ = writeln!(out, "  Spread: {}%", opp.display_spread());
    let _ = writeln!(out, "  Info: {}", alert.reference_url);
    if !alert.delivered {
        let _ = writeln!(out, "  (alert delivery failed)");
    }

    out
}

/// Full cycle output followed by the status line
pub fn render_report(report: &CycleReport, threshold: Decimal, at: DateTime<Utc>) -> String {
    let mut out = String::new();

    if report.alerts.is_empty() {
        let _ = writeln!(
            out,
            "No arbitrage opportunities over {}% found.",
            threshold.normalize()
        );
    } else {
        for alert in &report.alerts {
            out.push_str(&render_alert(alert));
            out.push('\n');
        }
    }

    if report.suppressed > 0 {
        let _ = writeln!(
            out,
            "{} more already alerted within the cooldown",
            report.suppressed
        );
    }

    out.push_str(&status_line(at));
    out
}

pub fn render_error(err: &CycleError) -> String {
    match err {
        CycleError::AlreadyRunning => "Scan already in progress".to_string(),
        other => format!("Error: {}", other),
    }
}

pub fn status_line(at: DateTime<Utc>) -> String {
    format!(
        "Last checked: {}",
        at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
    )
}
