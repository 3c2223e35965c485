use alloy::primitives::{Address, I256, U256};
use derive_more::Display;

/// Index of a venue in the registry
pub type VenueIndex = usize;

/// A caller-supplied round trip: buy `token_out` with `amount` of `token_in` on
/// one venue, then sell it back for `token_in` on another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{amount} {token_in}>{token_out} via venues {buy_venue}/{sell_venue}")]
pub struct ArbitrageRequest {
    /// The token committed to the round trip and measured for profit
    pub token_in: Address,
    /// The intermediate token bought on the buy venue
    pub token_out: Address,
    /// How much `token_in` to commit
    pub amount: U256,
    /// Registry index of the venue the buy leg runs on
    pub buy_venue: VenueIndex,
    /// Registry index of the venue the sell leg runs on
    pub sell_venue: VenueIndex,
}

/// The measured result of a committed round trip.
///
/// Never stored by the engine; surfaced to the caller and as an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[display("{amount_in} -> {intermediate_amount} -> {amount_out} (profit {profit})")]
pub struct ArbitrageOutcome {
    /// The token committed and returned
    pub token_in: Address,
    /// The intermediate token
    pub token_out: Address,
    /// Amount of `token_in` committed to the buy leg
    pub amount_in: U256,
    /// Amount of `token_out` the buy leg delivered, as measured by the engine
    pub intermediate_amount: U256,
    /// Amount of `token_in` the sell leg delivered, as measured by the engine
    pub amount_out: U256,
    /// Change of the engine's `token_in` custody across the round trip
    pub profit: I256,
    /// Registry index of the buy venue
    pub buy_venue: VenueIndex,
    /// Registry index of the sell venue
    pub sell_venue: VenueIndex,
}

/// Signed difference `after - before`, or `None` if it does not fit an `I256`
#[must_use]
pub fn signed_delta(after: U256, before: U256) -> Option<I256> {
    if after >= before {
        I256::try_from(after - before).ok()
    } else {
        I256::try_from(before - after).ok().map(|delta| -delta)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_delta() {
        for (after, before, expected) in [
            // after, before, delta
            (16_u64, 10_u64, 6_i64),
            (5, 10, -5),
            (10, 10, 0),
        ] {
            assert_eq!(
                signed_delta(U256::from(after), U256::from(before)),
                Some(I256::try_from(expected).unwrap())
            );
        }
    }

    #[test]
    fn test_signed_delta_overflow() {
        assert_eq!(signed_delta(U256::MAX, U256::ZERO), None);
    }
}
