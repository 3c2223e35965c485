//! # Arbitrage Module
//!
//! This module contains the arbitrage execution engine: the operator gate,
//! the reentrancy guard, the venue registry, the swap adapter that measures
//! each leg, and the engine that ties them together into a checked round trip.

/// Single-operator authorization
pub mod access;
/// The execution engine
pub mod engine;
/// Engine failure conditions
pub mod error;
/// Emitted notifications
pub mod events;
/// Reentrancy lock
pub mod guard;
/// Token balances
pub mod ledger;
/// Read-only round trip previews
pub mod quote;
/// Append-only venue registry
pub mod registry;
/// Swap adapter running one measured leg
pub mod swap;
/// Test helpers and utilities
#[cfg(test)]
pub(crate) mod test_helpers;
/// Common type definitions
pub mod types;
/// Venue capability and record
pub mod venue;

pub use engine::{ArbitrageEngine, EngineConfig};
pub use error::EngineError;
pub use events::{EngineEvent, EventSink, LogSink, MetricsSink};
pub use ledger::{InMemoryLedger, LedgerTransaction, TokenLedger};
pub use quote::ArbitrageQuote;
pub use types::{ArbitrageOutcome, ArbitrageRequest, VenueIndex};
pub use venue::{SwapCall, SwapVenue, Venue};
