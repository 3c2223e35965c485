//! Failure conditions surfaced by the arbitrage engine.
//!
//! Every privileged entry point returns one of these so that an upstream
//! caller can tell "retry as the operator" apart from "the trade lost money"
//! and from "a re-entry attempt was refused".

use alloy::primitives::{Address, I256};
use thiserror::Error;

/// Errors returned by [`ArbitrageEngine`](super::engine::ArbitrageEngine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller is not the operator fixed at construction
    #[error("caller {caller} is not the operator")]
    Unauthorized {
        /// The rejected caller
        caller: Address,
    },

    /// A venue index does not resolve against the registry
    #[error("invalid venue index {index} (registry holds {count} venues)")]
    InvalidVenue {
        /// The index that failed to resolve
        index: usize,
        /// Registry length at the time of the call
        count: usize,
    },

    /// The reentrancy lock was already held
    #[error("reentrant call")]
    ReentrantCall,

    /// The round trip completed but did not clear the profit threshold
    #[error("no profit made (profit {profit})")]
    NoProfitMade {
        /// The measured, signed profit of the round trip
        profit: I256,
    },

    /// An amount did not fit the signed profit representation
    #[error("arithmetic overflow while computing profit")]
    Overflow,

    /// A ledger or venue call failed
    #[error("external call failed: {0}")]
    External(eyre::Report),
}

impl From<eyre::Report> for EngineError {
    /// Collaborator failures propagate unmodified: if a venue simply bubbled up
    /// an engine refusal (a re-entry attempt), the engine variant is restored.
    fn from(report: eyre::Report) -> Self {
        match report.downcast::<Self>() {
            Ok(engine_error) => engine_error,
            Err(report) => Self::External(report),
        }
    }
}

impl EngineError {
    /// Whether the failure happened after capital was committed to both legs.
    #[must_use]
    pub const fn is_unprofitable(&self) -> bool {
        matches!(self, Self::NoProfitMade { .. })
    }
}
