use alloy::primitives::{I256, U256};

use super::types::signed_delta;

/// Read-only preview of a two-leg round trip, built from each venue's own quote.
///
/// Nothing is committed; venues may still deliver something else when the trade
/// actually runs, which is why execution measures balances instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArbitrageQuote {
    /// Amount of `token_in` committed to the buy leg
    amount_in: U256,
    /// Amount of `token_out` the buy venue quotes
    intermediate_amount: U256,
    /// Amount of `token_in` the sell venue quotes for the intermediate amount
    amount_out: U256,
}

impl ArbitrageQuote {
    /// Creates a quote from the amounts of both legs.
    ///
    /// # Arguments
    ///
    /// * `amount_in` - The amount committed to the buy leg
    /// * `intermediate_amount` - The buy leg's quoted output
    /// * `amount_out` - The sell leg's quoted output
    #[must_use]
    pub const fn new(amount_in: U256, intermediate_amount: U256, amount_out: U256) -> Self {
        Self {
            amount_in,
            intermediate_amount,
            amount_out,
        }
    }

    /// The amount committed to the buy leg
    #[must_use]
    pub const fn amount_in(&self) -> U256 {
        self.amount_in
    }

    /// The buy leg's quoted output
    #[must_use]
    pub const fn intermediate_amount(&self) -> U256 {
        self.intermediate_amount
    }

    /// The sell leg's quoted output
    #[must_use]
    pub const fn amount_out(&self) -> U256 {
        self.amount_out
    }

    /// Calculates the profit for this quote.
    ///
    /// # Returns
    ///
    /// The profit as an I256 value (negative if the round trip loses),
    /// saturated at the I256 bounds
    #[must_use]
    pub fn profit(&self) -> I256 {
        signed_delta(self.amount_out, self.amount_in).unwrap_or(if self.amount_out > self.amount_in {
            I256::MAX
        } else {
            I256::MIN
        })
    }

    /// Calculates the profit margin for this quote in basis points (10,000 = 100%).
    ///
    /// # Returns
    ///
    /// The profit margin as an i32 value in basis points, capped at `i32::MAX`
    #[must_use]
    pub fn profit_margin(&self) -> i32 {
        let profit = self.profit();

        if self.amount_in.is_zero() {
            return 0;
        }

        // Calculate (profit * 10_000) / amount_in to get basis points
        let scaled_profit = profit.unsigned_abs().saturating_mul(U256::from(10_000));
        let margin = scaled_profit / self.amount_in;

        let result = i32::try_from(margin).unwrap_or(i32::MAX);

        if profit.is_negative() {
            -result
        } else {
            result
        }
    }

    /// Whether the quoted round trip returns more than it commits
    #[must_use]
    pub fn is_profitable(&self) -> bool {
        self.profit().is_positive()
    }
}
