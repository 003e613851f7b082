//! Alert message formatting

use arb_core::Opportunity;

/// Push message for one opportunity, in Telegram legacy Markdown
pub fn alert_message(opp: &Opportunity) -> String {
    format!(
        "🚨 *Arbitrage Opportunity!*\n\
         Symbol: `{}`\n\
         Buy: {} @ ${}\n\
         Sell: {} @ ${}\n\
         Diff: *{}%*",
        opp.symbol,
        opp.buy_exchange,
        opp.display_buy_price(),
        opp.sell_exchange,
        opp.display_sell_price(),
        opp.display_spread()
    )
}
