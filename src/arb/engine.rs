//! # Arbitrage Engine
//!
//! Custody account that runs "buy on venue A, sell on venue B" round trips.
//!
//! Every privileged operation is restricted to the operator fixed at
//! construction. Every privileged operation is wrapped in the shared
//! reentrancy lock, taken before anything else happens, so a venue cannot
//! change the engine from inside `swap`. A round trip runs inside a ledger
//! transaction: if it fails for any reason, including a non-positive profit or
//! a panicking venue, every transfer made by either leg is rolled back and no
//! `ArbitrageExecuted` event is emitted.
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use alloy::primitives::{Address, U256};
use eyre::eyre;
use log::{debug, error, info, warn};
use metrics::increment_counter;

use super::access::Operator;
use super::error::EngineError;
use super::events::{EngineEvent, EventLog, EventSink, OPPORTUNITIES_METRIC};
use super::guard::ReentrancyGuard;
use super::ledger::{LedgerTransaction, TokenLedger};
use super::quote::ArbitrageQuote;
use super::registry::VenueRegistry;
use super::swap::SwapAdapter;
use super::types::{signed_delta, ArbitrageOutcome, ArbitrageRequest, VenueIndex};
use super::venue::{SwapVenue, Venue};

/// Construction parameters of an [`ArbitrageEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// The only identity allowed to call privileged operations
    pub operator: Address,
    /// The engine's custody account; derived from the operator when `None`
    pub address: Option<Address>,
    /// External liquidity-provider registry the deployment was pointed at
    pub liquidity_provider: Option<Address>,
    /// Smallest profit a round trip must make to be committed
    pub min_profit: U256,
}

impl EngineConfig {
    /// Configuration with only an operator: derived custody address, no
    /// liquidity provider, strictly positive profit required
    #[must_use]
    pub const fn new(operator: Address) -> Self {
        Self {
            operator,
            address: None,
            liquidity_provider: None,
            min_profit: U256::ZERO,
        }
    }

    /// Sets the custody account
    #[must_use]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Sets the liquidity-provider registry
    #[must_use]
    pub fn with_liquidity_provider(mut self, provider: Address) -> Self {
        self.liquidity_provider = Some(provider);
        self
    }

    /// Sets the minimum profit
    #[must_use]
    pub fn with_min_profit(mut self, min_profit: U256) -> Self {
        self.min_profit = min_profit;
        self
    }

    /// The custody account, falling back to the address a contract deployed by
    /// the operator as its first transaction would get
    #[must_use]
    pub fn custody_address(&self) -> Address {
        self.address.unwrap_or_else(|| self.operator.create(0))
    }
}

/// The arbitrage execution engine.
///
/// Shared as `Arc<ArbitrageEngine>`: venues are free to hold a handle to it,
/// which is exactly what a re-entry attempt looks like.
pub struct ArbitrageEngine {
    /// Access gate
    operator: Operator,
    /// Custody account on the ledger
    address: Address,
    /// External liquidity-provider registry, informational only
    liquidity_provider: Option<Address>,
    /// Profit threshold
    min_profit: U256,
    /// Balance book shared with the venues
    ledger: Arc<dyn TokenLedger>,
    /// Registered venues
    venues: RwLock<VenueRegistry>,
    /// Lock shared by guarded operations
    guard: ReentrancyGuard,
    /// Emitted events
    events: EventLog,
}

impl ArbitrageEngine {
    /// Creates an engine with an empty venue registry.
    ///
    /// # Arguments
    ///
    /// * `config` - Operator, custody address, liquidity provider and profit threshold
    /// * `ledger` - The ledger custody is held on
    #[must_use]
    pub fn new(config: EngineConfig, ledger: Arc<dyn TokenLedger>) -> Self {
        let address = config.custody_address();
        info!(
            "Engine {address} deployed for operator {} (min profit {})",
            config.operator, config.min_profit
        );
        Self {
            operator: Operator::new(config.operator),
            address,
            liquidity_provider: config.liquidity_provider,
            min_profit: config.min_profit,
            ledger,
            venues: RwLock::new(VenueRegistry::new()),
            guard: ReentrancyGuard::new(),
            events: EventLog::new(),
        }
    }

    /// The operator
    #[must_use]
    pub const fn owner(&self) -> Address {
        self.operator.address()
    }

    /// The custody account
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// The liquidity-provider registry the engine was deployed with
    #[must_use]
    pub const fn liquidity_provider(&self) -> Option<Address> {
        self.liquidity_provider
    }

    /// The profit threshold
    #[must_use]
    pub const fn min_profit(&self) -> U256 {
        self.min_profit
    }

    /// The ledger custody is held on
    #[must_use]
    pub fn ledger(&self) -> &dyn TokenLedger {
        self.ledger.as_ref()
    }

    /// Custodied balance of `token`
    ///
    /// # Errors
    /// * If the ledger cannot be read
    pub fn balance_of(&self, token: Address) -> Result<U256, EngineError> {
        Ok(self.ledger.balance_of(token, self.address)?)
    }

    /// Whether a guarded operation is in flight
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    /// Subscribes `sink` to every future event
    pub fn subscribe(&self, sink: Arc<dyn EventSink>) {
        self.events.subscribe(sink);
    }

    /// Every event emitted so far
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.snapshot()
    }

    /// The venue registered at `index`, if any
    #[must_use]
    pub fn venue(&self, index: VenueIndex) -> Option<Venue> {
        self.read_venues().ok()?.get(index).ok().cloned()
    }

    /// Number of registered venues
    #[must_use]
    pub fn venue_count(&self) -> usize {
        self.read_venues().map_or(0, |venues| venues.len())
    }

    /// All registered venues in index order
    #[must_use]
    pub fn venues(&self) -> Vec<Venue> {
        self.read_venues()
            .map(|venues| venues.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Appends a venue to the registry. Operator only, guarded.
    ///
    /// # Arguments
    ///
    /// * `caller` - Identity making the call
    /// * `adapter` - The venue's swap implementation; its address becomes the handle
    /// * `label` - Human-readable name
    ///
    /// # Returns
    ///
    /// The assigned index, equal to the registry length before the call
    ///
    /// # Errors
    ///
    /// * [`EngineError::ReentrantCall`] if a guarded operation is already in flight
    /// * [`EngineError::Unauthorized`] if `caller` is not the operator
    pub fn register_venue(
        &self,
        caller: Address,
        adapter: Arc<dyn SwapVenue>,
        label: impl Into<String>,
    ) -> Result<VenueIndex, EngineError> {
        let _lock = self.guard.enter()?;
        self.operator.authorize(caller)?;

        let venue = Venue::new(adapter, label);
        let index = self.write_venues()?.push(venue.clone());
        info!("Registered venue #{index}: {venue}");

        self.events.emit(EngineEvent::VenueAdded {
            index,
            handle: venue.handle(),
            label: venue.label().to_string(),
        });
        Ok(index)
    }

    /// Previews a round trip from the venues' own quotes without moving any
    /// capital. Not restricted and not guarded.
    ///
    /// # Errors
    ///
    /// * [`EngineError::InvalidVenue`] if either index does not resolve
    /// * If either venue cannot quote the pair
    pub fn quote_arbitrage(
        &self,
        request: &ArbitrageRequest,
    ) -> Result<ArbitrageQuote, EngineError> {
        let (buy, sell) = self.resolve(request)?;
        let ledger = self.ledger.as_ref();

        let intermediate_amount =
            buy.adapter()
                .quote(ledger, request.token_in, request.token_out, request.amount)?;
        let amount_out = sell.adapter().quote(
            ledger,
            request.token_out,
            request.token_in,
            intermediate_amount,
        )?;

        let quote = ArbitrageQuote::new(request.amount, intermediate_amount, amount_out);
        if quote.is_profitable() {
            debug!("Opportunity {request}: {} bps", quote.profit_margin());
            increment_counter!(OPPORTUNITIES_METRIC, "engine" => self.address.to_string());
        }
        Ok(quote)
    }

    /// Runs a round trip with capital already in custody. Operator only, guarded.
    ///
    /// Buys `token_out` with `request.amount` of `token_in` on the buy venue, sells
    /// everything that arrived back for `token_in` on the sell venue, and commits
    /// only if custody of `token_in` grew by more than zero and at least the
    /// configured minimum.
    ///
    /// # Returns
    ///
    /// The measured [`ArbitrageOutcome`]; an `ArbitrageExecuted` event carries the same data
    ///
    /// # Errors
    ///
    /// * [`EngineError::ReentrantCall`] if a guarded operation is already in flight
    /// * [`EngineError::Unauthorized`] if `caller` is not the operator
    /// * [`EngineError::InvalidVenue`] if either index does not resolve
    /// * [`EngineError::NoProfitMade`] if the round trip did not clear the threshold
    /// * [`EngineError::External`] if the ledger or a venue failed
    pub fn execute_arbitrage(
        &self,
        caller: Address,
        request: &ArbitrageRequest,
    ) -> Result<ArbitrageOutcome, EngineError> {
        let _lock = self.guard.enter()?;
        self.operator.authorize(caller)?;
        let (buy, sell) = self.resolve(request)?;

        info!("Executing arbitrage {request}: buy on {buy}, sell on {sell}");

        let transaction = LedgerTransaction::begin(self.ledger.as_ref());
        match self.round_trip(request, &buy, &sell) {
            Ok(outcome) => {
                transaction.commit()?;
                info!("Arbitrage executed: {outcome}");
                self.events.emit(EngineEvent::from(&outcome));
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = transaction.rollback() {
                    error!("Failed to roll back arbitrage {request}: {rollback_err}");
                }
                warn!("Arbitrage {request} reverted: {err}");
                Err(err)
            }
        }
    }

    /// Sweeps `amount` of `token` from custody to the operator. Operator only, guarded.
    ///
    /// # Errors
    ///
    /// * [`EngineError::ReentrantCall`] if a guarded operation is already in flight
    /// * [`EngineError::Unauthorized`] if `caller` is not the operator
    /// * [`EngineError::External`] if custody holds less than `amount`
    pub fn withdraw(
        &self,
        caller: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), EngineError> {
        let _lock = self.guard.enter()?;
        self.operator.authorize(caller)?;

        let to = self.operator.address();
        self.ledger.transfer(token, self.address, to, amount)?;
        info!("Withdrew {amount} of {token} to {to}");

        self.events
            .emit(EngineEvent::Withdrawn { token, to, amount });
        Ok(())
    }

    /// Both legs plus the profit check. Runs under the lock and a ledger transaction.
    fn round_trip(
        &self,
        request: &ArbitrageRequest,
        buy: &Venue,
        sell: &Venue,
    ) -> Result<ArbitrageOutcome, EngineError> {
        let ledger = self.ledger.as_ref();
        let adapter = SwapAdapter::new(ledger, self.address);

        let baseline_in = ledger.balance_of(request.token_in, self.address)?;
        let baseline_out = ledger.balance_of(request.token_out, self.address)?;
        debug!("Baseline custody: {baseline_in} in / {baseline_out} out");

        let buy_leg = adapter.swap(buy, request.token_in, request.token_out, request.amount)?;
        let sell_leg = adapter.swap(
            sell,
            request.token_out,
            request.token_in,
            buy_leg.amount_out,
        )?;

        let final_in = ledger.balance_of(request.token_in, self.address)?;
        let profit = signed_delta(final_in, baseline_in).ok_or(EngineError::Overflow)?;
        debug!("Custody of {} moved {baseline_in} -> {final_in}", request.token_in);

        if !profit.is_positive() || profit.unsigned_abs() < self.min_profit {
            return Err(EngineError::NoProfitMade { profit });
        }

        Ok(ArbitrageOutcome {
            token_in: request.token_in,
            token_out: request.token_out,
            amount_in: request.amount,
            intermediate_amount: buy_leg.amount_out,
            amount_out: sell_leg.amount_out,
            profit,
            buy_venue: request.buy_venue,
            sell_venue: request.sell_venue,
        })
    }

    /// Resolves both venues of `request`, releasing the registry lock before returning
    fn resolve(&self, request: &ArbitrageRequest) -> Result<(Venue, Venue), EngineError> {
        let venues = self.read_venues()?;
        let buy = venues.get(request.buy_venue)?.clone();
        let sell = venues.get(request.sell_venue)?.clone();
        Ok((buy, sell))
    }

    /// Read access to the registry
    fn read_venues(&self) -> Result<RwLockReadGuard<'_, VenueRegistry>, EngineError> {
        self.venues
            .read()
            .map_err(|_| EngineError::External(eyre!("venue registry lock poisoned")))
    }

    /// Write access to the registry
    fn write_venues(&self) -> Result<RwLockWriteGuard<'_, VenueRegistry>, EngineError> {
        self.venues
            .write()
            .map_err(|_| EngineError::External(eyre!("venue registry lock poisoned")))
    }
}
