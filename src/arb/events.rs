//! Structured notifications emitted by the engine.
//!
//! Events are the only record of what the engine did: outcomes are never
//! stored anywhere else. Each event is appended to the [`EventLog`] and fanned
//! out to every subscribed [`EventSink`].
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, I256, U256};
use derive_more::Display;
use log::{info, warn};
use metrics::{increment_counter, increment_gauge};
use serde_json::{json, Value};

use super::types::{ArbitrageOutcome, VenueIndex};

/// Something the engine committed.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum EngineEvent {
    /// A venue was appended to the registry
    #[display("VenueAdded(#{index} {label} {handle})")]
    VenueAdded {
        /// Assigned registry index
        index: VenueIndex,
        /// The venue's ledger account
        handle: Address,
        /// The venue's name
        label: String,
    },
    /// A profitable round trip was committed
    #[display("ArbitrageExecuted({amount_in} -> {amount_out}, profit {profit}, venues {buy_venue}/{sell_venue})")]
    ArbitrageExecuted {
        /// Token committed and returned
        token_in: Address,
        /// Intermediate token
        token_out: Address,
        /// Amount committed
        amount_in: U256,
        /// Amount returned to custody
        amount_out: U256,
        /// Measured profit
        profit: I256,
        /// Registry index of the buy venue
        buy_venue: VenueIndex,
        /// Registry index of the sell venue
        sell_venue: VenueIndex,
    },
    /// Custodied tokens were swept to the operator
    #[display("Withdrawn({amount} of {token} to {to})")]
    Withdrawn {
        /// Token swept
        token: Address,
        /// Recipient (the operator)
        to: Address,
        /// Amount swept
        amount: U256,
    },
}

impl From<&ArbitrageOutcome> for EngineEvent {
    fn from(outcome: &ArbitrageOutcome) -> Self {
        Self::ArbitrageExecuted {
            token_in: outcome.token_in,
            token_out: outcome.token_out,
            amount_in: outcome.amount_in,
            amount_out: outcome.amount_out,
            profit: outcome.profit,
            buy_venue: outcome.buy_venue,
            sell_venue: outcome.sell_venue,
        }
    }
}

impl EngineEvent {
    /// The event's name as it appears in logs and notifications
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::VenueAdded { .. } => "VenueAdded",
            Self::ArbitrageExecuted { .. } => "ArbitrageExecuted",
            Self::Withdrawn { .. } => "Withdrawn",
        }
    }

    /// JSON rendering; amounts are decimal strings so no precision is lost
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::VenueAdded {
                index,
                handle,
                label,
            } => json!({
                "event": self.name(),
                "index": index,
                "handle": handle.to_string(),
                "label": label,
            }),
            Self::ArbitrageExecuted {
                token_in,
                token_out,
                amount_in,
                amount_out,
                profit,
                buy_venue,
                sell_venue,
            } => json!({
                "event": self.name(),
                "tokenIn": token_in.to_string(),
                "tokenOut": token_out.to_string(),
                "amountIn": amount_in.to_string(),
                "amountOut": amount_out.to_string(),
                "profit": profit.to_string(),
                "buyVenue": buy_venue,
                "sellVenue": sell_venue,
            }),
            Self::Withdrawn { token, to, amount } => json!({
                "event": self.name(),
                "token": token.to_string(),
                "to": to.to_string(),
                "amount": amount.to_string(),
            }),
        }
    }
}

/// Receives every event the engine emits.
pub trait EventSink: Send + Sync {
    /// Called once per emitted event, in emission order
    fn publish(&self, event: &EngineEvent);
}

/// Sink that writes each event to the log at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: &EngineEvent) {
        info!("event {}: {}", event.name(), event.to_json());
    }
}

/// Profitable quotes seen by the engine
pub const OPPORTUNITIES_METRIC: &str = "arb_opportunities_total";
/// Committed round trips
pub const TRADES_METRIC: &str = "arb_trades_total";
/// Accumulated profit, in whole tokens
pub const PROFIT_METRIC: &str = "arb_profit_total";
/// Registered venues
pub const VENUES_METRIC: &str = "arb_venues_total";
/// Withdrawals to the operator
pub const WITHDRAWALS_METRIC: &str = "arb_withdrawals_total";

/// Sink that feeds the `metrics` facade, labelled with the engine's address.
///
/// Nothing is recorded until a recorder (the Prometheus exporter in the
/// binary) is installed.
#[derive(Debug, Clone)]
pub struct MetricsSink {
    /// Value of the `engine` label
    engine: String,
    /// Decimals of the traded token, used to scale profit
    decimals: u8,
}

impl MetricsSink {
    /// Creates a sink for the engine at `engine` trading a token with `decimals`
    #[must_use]
    pub fn new(engine: Address, decimals: u8) -> Self {
        Self {
            engine: engine.to_string(),
            decimals,
        }
    }

    /// `amount` base units expressed in whole tokens
    fn whole_tokens(&self, amount: I256) -> f64 {
        let magnitude = match format_units(amount.unsigned_abs(), self.decimals) {
            Ok(units) => units.parse::<f64>().unwrap_or_default(),
            Err(err) => {
                warn!("Cannot scale {amount} by {} decimals: {err}", self.decimals);
                0.0
            }
        };
        if amount.is_negative() {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl EventSink for MetricsSink {
    fn publish(&self, event: &EngineEvent) {
        let engine = self.engine.clone();
        match event {
            EngineEvent::VenueAdded { .. } => {
                increment_counter!(VENUES_METRIC, "engine" => engine);
            }
            EngineEvent::ArbitrageExecuted { profit, .. } => {
                increment_counter!(TRADES_METRIC, "engine" => engine.clone());
                increment_gauge!(PROFIT_METRIC, self.whole_tokens(*profit), "engine" => engine);
            }
            EngineEvent::Withdrawn { .. } => {
                increment_counter!(WITHDRAWALS_METRIC, "engine" => engine);
            }
        }
    }
}

/// Append-only record of emitted events plus the subscribed sinks.
#[derive(Default)]
pub struct EventLog {
    /// Every event emitted so far
    entries: Mutex<Vec<EngineEvent>>,
    /// Subscribers
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
}

impl EventLog {
    /// Creates an empty log with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a subscriber for every future event
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.sinks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sink);
    }

    /// Records `event` and hands it to every subscriber
    pub fn emit(&self, event: EngineEvent) {
        for sink in self
            .sinks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            sink.publish(&event);
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    /// Copy of every event emitted so far
    #[must_use]
    pub fn snapshot(&self) -> Vec<EngineEvent> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events emitted so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been emitted
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::{addr, milli_units, prometheus};

    /// Counts what it receives
    #[derive(Default)]
    struct CountingSink(Mutex<Vec<&'static str>>);

    impl EventSink for CountingSink {
        fn publish(&self, event: &EngineEvent) {
            self.0.lock().unwrap().push(event.name());
        }
    }

    fn withdrawn(amount: u64) -> EngineEvent {
        EngineEvent::Withdrawn {
            token: addr("A"),
            to: addr("0"),
            amount: U256::from(amount),
        }
    }

    #[test]
    fn test_emit_records_and_fans_out() {
        let log = EventLog::new();
        let sink = Arc::new(CountingSink::default());
        log.subscribe(sink.clone());
        log.subscribe(Arc::new(LogSink));

        log.emit(withdrawn(1));
        log.emit(EngineEvent::VenueAdded {
            index: 0,
            handle: addr("R1"),
            label: "DEX1".to_string(),
        });

        assert_eq!(log.len(), 2);
        assert_eq!(log.snapshot()[0], withdrawn(1));
        assert_eq!(*sink.0.lock().unwrap(), vec!["Withdrawn", "VenueAdded"]);
    }

    #[test]
    fn test_json_keeps_full_precision() {
        let event = EngineEvent::ArbitrageExecuted {
            token_in: addr("A"),
            token_out: addr("B"),
            amount_in: U256::from(10).pow(U256::from(18)),
            amount_out: U256::from(1_045_000_000_000_000_000_u64),
            profit: I256::try_from(45_000_000_000_000_000_i64).unwrap(),
            buy_venue: 0,
            sell_venue: 1,
        };
        let json = event.to_json();
        assert_eq!(json["event"], "ArbitrageExecuted");
        assert_eq!(json["amountIn"], "1000000000000000000");
        assert_eq!(json["profit"], "45000000000000000");
        assert_eq!(json["sellVenue"], 1);
    }

    #[test]
    fn test_metrics_sink_counts_trades_and_profit() {
        let handle = prometheus();
        let engine = addr("METRICS-SINK");
        let sink = MetricsSink::new(engine, 18);

        for profit in [1_500, 250] {
            sink.publish(&EngineEvent::ArbitrageExecuted {
                token_in: addr("A"),
                token_out: addr("B"),
                amount_in: milli_units(1_000),
                amount_out: milli_units(1_000 + profit),
                profit: I256::try_from(milli_units(profit)).unwrap(),
                buy_venue: 0,
                sell_venue: 1,
            });
        }
        sink.publish(&withdrawn(1));

        let rendered = handle.render();
        let label = format!("{{engine=\"{engine}\"}}");
        assert!(rendered.contains(&format!("{TRADES_METRIC}{label} 2")), "{rendered}");
        assert!(rendered.contains(&format!("{PROFIT_METRIC}{label} 1.75")), "{rendered}");
        assert!(rendered.contains(&format!("{WITHDRAWALS_METRIC}{label} 1")), "{rendered}");
    }

    #[test]
    fn test_whole_tokens_keeps_sign() {
        let sink = MetricsSink::new(addr("M"), 18);
        let loss = -I256::try_from(milli_units(440)).unwrap();
        assert!((sink.whole_tokens(loss) + 0.44).abs() < f64::EPSILON);
    }
}
