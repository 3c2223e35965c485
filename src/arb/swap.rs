//! A swap leg drives one venue through one exchange of `token_in` for `token_out` on behalf of the
//! engine's custody account, and measures what actually arrived.
use std::fmt::{self, Display};

use alloy::primitives::{Address, U256};
use log::{debug, warn};

use super::error::EngineError;
use super::ledger::TokenLedger;
use super::venue::{SwapCall, Venue};

/// What one leg delivered, as measured by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegReceipt {
    /// The venue the leg ran on
    pub venue: Address,
    /// Amount of the input token paid to the venue
    pub amount_in: U256,
    /// Amount the venue claimed it paid out
    pub reported_out: U256,
    /// Amount that actually reached custody
    pub amount_out: U256,
}

impl LegReceipt {
    /// Whether the venue's claim matches what the engine measured
    #[must_use]
    pub fn is_honest(&self) -> bool {
        self.reported_out == self.amount_out
    }
}

impl Display for LegReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Leg({}, in {} / out {} (reported {}))",
            self.venue, self.amount_in, self.amount_out, self.reported_out
        )
    }
}

/// Uniform "swap `amount_in` of `token_in` for `token_out` on venue V" over any
/// [`SwapVenue`](super::venue::SwapVenue) implementation.
pub struct SwapAdapter<'a> {
    /// Ledger both the engine and the venues settle on
    ledger: &'a dyn TokenLedger,
    /// The engine's custody account: payer and recipient of every leg
    custody: Address,
}

impl<'a> SwapAdapter<'a> {
    /// Creates an adapter paying from and receiving into `custody`
    #[must_use]
    pub const fn new(ledger: &'a dyn TokenLedger, custody: Address) -> Self {
        Self { ledger, custody }
    }

    /// Runs one leg on `venue`.
    ///
    /// Pays `amount_in` of `token_in` to the venue, asks it to pay out `token_out`
    /// to custody, and measures the received amount as the change of the custody
    /// balance of `token_out` across the venue call. The venue's own return value
    /// is only compared against the measurement, never used.
    ///
    /// # Arguments
    ///
    /// * `venue` - The venue to trade on
    /// * `token_in` - The token paid in
    /// * `token_out` - The token received
    /// * `amount_in` - How much `token_in` to pay
    ///
    /// # Returns
    ///
    /// A [`LegReceipt`] carrying the measured output
    ///
    /// # Errors
    ///
    /// * If custody cannot pay `amount_in`
    /// * If the venue call fails; an engine error raised inside the venue
    ///   (a refused re-entry) propagates unmodified
    pub fn swap(
        &self,
        venue: &Venue,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<LegReceipt, EngineError> {
        let handle = venue.handle();

        self.ledger
            .transfer(token_in, self.custody, handle, amount_in)?;

        let before = self.ledger.balance_of(token_out, self.custody)?;
        let call = SwapCall {
            token_in,
            token_out,
            amount_in,
            recipient: self.custody,
        };
        let reported_out = venue.adapter().swap(self.ledger, &call)?;
        let after = self.ledger.balance_of(token_out, self.custody)?;

        // A venue that pulls from custody during the call delivered nothing
        let amount_out = after.saturating_sub(before);

        let receipt = LegReceipt {
            venue: handle,
            amount_in,
            reported_out,
            amount_out,
        };
        if receipt.is_honest() {
            debug!("{venue}: {receipt}");
        } else {
            warn!("{venue} reported {reported_out} but delivered {amount_out}");
        }
        Ok(receipt)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::arb::ledger::InMemoryLedger;
    use crate::arb::test_helpers::{addr, fixed_rate_venue, lying_venue, reverting_venue, units};

    #[test]
    fn test_leg_measures_received_amount() {
        let ledger = InMemoryLedger::new();
        let (a, b, custody) = (addr("A"), addr("B"), addr("BOT"));
        ledger.mint(a, custody, units(10)).unwrap();
        ledger.mint(b, addr("R1"), units(1_000)).unwrap();
        // Pre-existing custody of the output token must not count as received
        ledger.mint(b, custody, units(7)).unwrap();

        let venue = Venue::new(fixed_rate_venue("R1", 95), "DEX1");
        let receipt = SwapAdapter::new(&ledger, custody)
            .swap(&venue, a, b, units(10))
            .unwrap();

        assert!(receipt.is_honest());
        assert_eq!(receipt.amount_out, units(10) * U256::from(95) / U256::from(100));
        assert_eq!(ledger.balance_of(a, custody).unwrap(), U256::ZERO);
        assert_eq!(ledger.balance_of(a, addr("R1")).unwrap(), units(10));
    }

    #[test]
    fn test_leg_ignores_reported_amount() {
        let ledger = InMemoryLedger::new();
        let (a, b, custody) = (addr("A"), addr("B"), addr("BOT"));
        ledger.mint(a, custody, U256::from(100)).unwrap();
        ledger.mint(b, addr("LIAR"), U256::from(1_000)).unwrap();

        let venue = Venue::new(lying_venue("LIAR", 50, 200), "Liar");
        let receipt = SwapAdapter::new(&ledger, custody)
            .swap(&venue, a, b, U256::from(100))
            .unwrap();

        assert!(!receipt.is_honest());
        assert_eq!(receipt.reported_out, U256::from(200));
        assert_eq!(receipt.amount_out, U256::from(50));
    }

    #[test]
    fn test_leg_propagates_venue_failure() {
        let ledger = InMemoryLedger::new();
        let (a, b, custody) = (addr("A"), addr("B"), addr("BOT"));
        ledger.mint(a, custody, U256::from(100)).unwrap();

        let venue = Venue::new(reverting_venue("REVERT"), "Reverting");
        let err = SwapAdapter::new(&ledger, custody)
            .swap(&venue, a, b, U256::from(100))
            .unwrap_err();
        match err {
            EngineError::External(report) => assert_eq!(report.to_string(), "venue reverted"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_leg_without_custody_balance() {
        let ledger = InMemoryLedger::new();
        let venue = Venue::new(fixed_rate_venue("R1", 100), "DEX1");
        let err = SwapAdapter::new(&ledger, addr("BOT"))
            .swap(&venue, addr("A"), addr("B"), U256::from(1))
            .unwrap_err();
        assert!(matches!(err, EngineError::External(_)));
    }
}
