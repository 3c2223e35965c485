use alloy::primitives::{Address, U256};
use eyre::{bail, eyre, Result};

use crate::arb::ledger::TokenLedger;
use crate::arb::venue::{SwapCall, SwapVenue};

/// Fee numerator applied to the input (0.3% fee)
const FEE_NUMERATOR: u64 = 997;
/// Fee denominator
const FEE_DENOMINATOR: u64 = 1000;

/// Output of a constant-product swap with the 0.3% fee:
/// `amount_in * 997 * reserve_out / (reserve_in * 1000 + amount_in * 997)`
///
/// Returns zero for empty reserves or a zero input.
///
/// # Errors
/// * If an intermediate product does not fit in 256 bits
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Result<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return Ok(U256::ZERO);
    }
    let overflow = || eyre!("ConstantProductVenue: amount overflows");
    let amount_in_with_fee = amount_in
        .checked_mul(U256::from(FEE_NUMERATOR))
        .ok_or_else(overflow)?;
    let numerator = amount_in_with_fee
        .checked_mul(reserve_out)
        .ok_or_else(overflow)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))
        .and_then(|scaled| scaled.checked_add(amount_in_with_fee))
        .ok_or_else(overflow)?;
    Ok(numerator / denominator)
}

/// A constant-product pool whose reserves are simply its own ledger balances.
///
/// Follows the Uniswap V2 pair convention: the input is transferred to the pool
/// first, and the pool infers it from the difference between its balance and
/// its reserve.
#[derive(Debug, Clone, Copy)]
pub struct ConstantProductVenue {
    /// The pool's ledger account
    address: Address,
}

impl ConstantProductVenue {
    /// Creates a pool at `address`
    #[must_use]
    pub const fn new(address: Address) -> Self {
        Self { address }
    }

    /// Current reserves for a `token_in` to `token_out` swap
    ///
    /// # Errors
    /// * If the ledger cannot be read
    pub fn reserves(
        &self,
        ledger: &dyn TokenLedger,
        token_in: Address,
        token_out: Address,
    ) -> Result<(U256, U256)> {
        Ok((
            ledger.balance_of(token_in, self.address)?,
            ledger.balance_of(token_out, self.address)?,
        ))
    }
}

impl SwapVenue for ConstantProductVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        if call.token_in == call.token_out {
            bail!("ConstantProductVenue: identical tokens");
        }
        let (balance_in, reserve_out) = self.reserves(ledger, call.token_in, call.token_out)?;
        let reserve_in = balance_in
            .checked_sub(call.amount_in)
            .ok_or_else(|| eyre!("ConstantProductVenue: input not received"))?;

        let amount_out = get_amount_out(call.amount_in, reserve_in, reserve_out)?;
        if amount_out.is_zero() {
            bail!("ConstantProductVenue: insufficient output amount");
        }
        if amount_out >= reserve_out {
            bail!("ConstantProductVenue: insufficient liquidity");
        }

        ledger.transfer(call.token_out, self.address, call.recipient, amount_out)?;
        Ok(amount_out)
    }

    fn quote(
        &self,
        ledger: &dyn TokenLedger,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
    ) -> Result<U256> {
        let (reserve_in, reserve_out) = self.reserves(ledger, token_in, token_out)?;
        get_amount_out(amount_in, reserve_in, reserve_out)
    }
}
