/// Slack notifications
pub mod slack;
/// Telegram notifications
pub mod telegram;

pub use slack::SlackNotifier;
pub use telegram::TelegramNotifier;

use crate::arb::EngineEvent;

/// The chat message for `event`, if it deserves one
#[must_use]
pub fn event_message(event: &EngineEvent) -> Option<String> {
    match event {
        EngineEvent::ArbitrageExecuted {
            token_in,
            token_out,
            amount_in,
            amount_out,
            profit,
            buy_venue,
            sell_venue,
        } => Some(format!(
            "Arbitrage executed!\nPair: {token_in}/{token_out}\nIn: {amount_in}\nOut: {amount_out}\nProfit: {profit}\nVenues: #{buy_venue} -> #{sell_venue}"
        )),
        EngineEvent::VenueAdded { .. } | EngineEvent::Withdrawn { .. } => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use alloy::primitives::{Address, I256, U256};

    use super::*;

    #[test]
    fn test_event_message() {
        let executed = EngineEvent::ArbitrageExecuted {
            token_in: Address::ZERO,
            token_out: Address::ZERO,
            amount_in: U256::from(10),
            amount_out: U256::from(16),
            profit: I256::try_from(6).unwrap(),
            buy_venue: 0,
            sell_venue: 1,
        };
        let message = event_message(&executed).unwrap();
        assert!(message.starts_with("Arbitrage executed!"));
        assert!(message.contains("Profit: 6"));
        assert!(message.contains("Venues: #0 -> #1"));

        let withdrawn = EngineEvent::Withdrawn {
            token: Address::ZERO,
            to: Address::ZERO,
            amount: U256::from(1),
        };
        assert_eq!(event_message(&withdrawn), None);
    }
}
