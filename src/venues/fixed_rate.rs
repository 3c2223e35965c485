use std::sync::atomic::{AtomicU64, Ordering};

use alloy::primitives::{Address, U256};
use eyre::{bail, Result};

use crate::arb::ledger::TokenLedger;
use crate::arb::venue::{SwapCall, SwapVenue};

/// Divisor of the slippage factor: a factor of 100 pays out 1:1
const FACTOR_BASE: u64 = 100;

/// A router that pays out `amount_in * factor / 100` of any token it holds,
/// regardless of the pair. A factor below 100 models negative slippage, above
/// 100 a favorable price.
#[derive(Debug)]
pub struct FixedRateVenue {
    /// The router's ledger account
    address: Address,
    /// Payout percentage
    factor: AtomicU64,
}

impl FixedRateVenue {
    /// Creates a router at `address` paying `factor` percent of the input
    #[must_use]
    pub const fn new(address: Address, factor: u64) -> Self {
        Self {
            address,
            factor: AtomicU64::new(factor),
        }
    }

    /// Changes the payout percentage
    pub fn set_slippage_factor(&self, factor: u64) {
        self.factor.store(factor, Ordering::Relaxed);
    }

    /// The current payout percentage
    #[must_use]
    pub fn slippage_factor(&self) -> u64 {
        self.factor.load(Ordering::Relaxed)
    }

    /// Output for `amount_in` at the current factor
    fn amount_out(&self, amount_in: U256) -> Result<U256> {
        let Some(scaled) = amount_in.checked_mul(U256::from(self.slippage_factor())) else {
            bail!("FixedRateVenue: amount {amount_in} overflows");
        };
        Ok(scaled / U256::from(FACTOR_BASE))
    }
}

impl SwapVenue for FixedRateVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        let amount_out = self.amount_out(call.amount_in)?;
        ledger.transfer(call.token_out, self.address, call.recipient, amount_out)?;
        Ok(amount_out)
    }

    fn quote(
        &self,
        _ledger: &dyn TokenLedger,
        _token_in: Address,
        _token_out: Address,
        amount_in: U256,
    ) -> Result<U256> {
        self.amount_out(amount_in)
    }
}
