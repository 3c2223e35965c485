//! The capability every trading venue must offer, and the record the engine
//! keeps for each registered one.
//!
//! Venues are external and potentially adversarial: a venue may lie about what
//! it paid out, keep the input, or call back into the engine from inside
//! `swap`. The engine never trusts a value returned from here without reading
//! its own balance back from the ledger.
use std::fmt::{self, Debug};
use std::sync::Arc;

use alloy::primitives::{Address, U256};
use derive_more::Display;
use eyre::Result;

use super::ledger::TokenLedger;

/// One swap request handed to a venue.
///
/// `amount_in` of `token_in` has already been transferred to the venue when
/// `swap` is called (the Uniswap V2 pair convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapCall {
    /// Token paid in
    pub token_in: Address,
    /// Token to pay out
    pub token_out: Address,
    /// Amount already paid in
    pub amount_in: U256,
    /// Account that receives `token_out`
    pub recipient: Address,
}

/// Swap capability consumed by the engine.
pub trait SwapVenue: Send + Sync {
    /// The venue's own ledger account
    fn address(&self) -> Address;

    /// Pays out `token_out` to `call.recipient` for the input already received.
    ///
    /// Returns the amount the venue claims it paid.
    ///
    /// # Errors
    /// * If the venue refuses the swap or cannot pay out
    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256>;

    /// Read-only estimate of what `swap` would pay out for `amount_in`
    ///
    /// # Errors
    /// * If the venue cannot price the pair
    fn quote(
        &self,
        ledger: &dyn TokenLedger,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256>;
}

/// A registered venue. Immutable once registered.
#[derive(Clone, Display)]
#[display("{label} ({handle})")]
pub struct Venue {
    /// Ledger account of the venue
    handle: Address,
    /// Human-readable name
    label: String,
    /// The swap implementation behind `handle`
    adapter: Arc<dyn SwapVenue>,
}

impl Debug for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Venue({}, {:?})", self.handle, self.label)
    }
}

impl Venue {
    /// Wraps `adapter` under `label`; the handle is the adapter's own address
    #[must_use]
    pub fn new(adapter: Arc<dyn SwapVenue>, label: impl Into<String>) -> Self {
        Self {
            handle: adapter.address(),
            label: label.into(),
            adapter,
        }
    }

    /// The venue's ledger account
    #[must_use]
    pub const fn handle(&self) -> Address {
        self.handle
    }

    /// The venue's name
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The swap implementation
    #[must_use]
    pub fn adapter(&self) -> &dyn SwapVenue {
        self.adapter.as_ref()
    }
}
