use std::sync::{Arc, OnceLock, Weak};

use alloy::primitives::{Address, U256};
use eyre::{bail, eyre, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use super::engine::{ArbitrageEngine, EngineConfig};
use super::ledger::{InMemoryLedger, TokenLedger};
use super::types::ArbitrageRequest;
use super::venue::{SwapCall, SwapVenue};
use crate::venues::{ConstantProductVenue, FixedRateVenue};

/// Deterministic address from a short name ("A", "R1", "BOT", ...)
pub fn addr(name: &str) -> Address {
    Address::left_padding_from(name.as_bytes())
}

/// `n` whole tokens with 18 decimals
pub fn units(n: u64) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(18))
}

/// `n` thousandths of a token with 18 decimals
pub fn milli_units(n: u64) -> U256 {
    U256::from(n) * U256::from(10).pow(U256::from(15))
}

pub fn fixed_rate_venue(name: &str, factor: u64) -> Arc<FixedRateVenue> {
    Arc::new(FixedRateVenue::new(addr(name), factor))
}

/// Two tokens, two funded fixed-rate routers registered as venues 0 and 1,
/// and an engine owned by `owner` with empty custody.
pub struct World {
    pub ledger: Arc<InMemoryLedger>,
    pub engine: Arc<ArbitrageEngine>,
    pub owner: Address,
    pub other: Address,
    pub token_a: Address,
    pub token_b: Address,
    pub router1: Arc<FixedRateVenue>,
    pub router2: Arc<FixedRateVenue>,
}

impl World {
    pub fn new() -> Self {
        Self::with_config(|config| config)
    }

    #[allow(clippy::unwrap_used)]
    pub fn with_config(configure: impl FnOnce(EngineConfig) -> EngineConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new());
        let (owner, other) = (addr("OWNER"), addr("OTHER"));
        let (token_a, token_b) = (addr("TKNA"), addr("TKNB"));
        let router1 = fixed_rate_venue("ROUTER1", 100);
        let router2 = fixed_rate_venue("ROUTER2", 100);

        for holder in [owner, router1.address(), router2.address()] {
            ledger.mint(token_a, holder, units(1_000)).unwrap();
            ledger.mint(token_b, holder, units(1_000)).unwrap();
        }

        let engine = Arc::new(ArbitrageEngine::new(
            configure(EngineConfig::new(owner)),
            ledger.clone(),
        ));
        engine.register_venue(owner, router1.clone(), "DEX1").unwrap();
        engine.register_venue(owner, router2.clone(), "DEX2").unwrap();

        Self {
            ledger,
            engine,
            owner,
            other,
            token_a,
            token_b,
            router1,
            router2,
        }
    }

    /// Owner sends `amount` of token A into custody
    #[allow(clippy::unwrap_used)]
    pub fn fund_engine(&self, amount: U256) {
        self.ledger
            .transfer(self.token_a, self.owner, self.engine.address(), amount)
            .unwrap();
    }

    /// A -> B on venue 0, B -> A on venue 1
    pub fn request(&self, amount: U256) -> ArbitrageRequest {
        ArbitrageRequest {
            token_in: self.token_a,
            token_out: self.token_b,
            amount,
            buy_venue: 0,
            sell_venue: 1,
        }
    }
}

/// A constant-product pool holding `reserves` of (token A, token B)
#[allow(clippy::unwrap_used)]
pub fn constant_product_venue(
    world: &World,
    name: &str,
    reserves: (u64, u64),
) -> Arc<ConstantProductVenue> {
    let pool = ConstantProductVenue::new(addr(name));
    world
        .ledger
        .mint(world.token_a, pool.address(), U256::from(reserves.0))
        .unwrap();
    world
        .ledger
        .mint(world.token_b, pool.address(), U256::from(reserves.1))
        .unwrap();
    Arc::new(pool)
}

/// A venue that calls back into the engine, with the operator's identity,
/// from inside its own `swap`
pub struct ReentrantVenue {
    address: Address,
    operator: Address,
    request: ArbitrageRequest,
    target: Weak<ArbitrageEngine>,
}

impl SwapVenue for ReentrantVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        let engine = self
            .target
            .upgrade()
            .ok_or_else(|| eyre!("target engine dropped"))?;
        engine
            .execute_arbitrage(self.operator, &self.request)
            .map_err(eyre::Report::new)?;

        ledger.transfer(call.token_out, self.address, call.recipient, call.amount_in)?;
        Ok(call.amount_in)
    }

    fn quote(&self, _: &dyn TokenLedger, _: Address, _: Address, amount_in: U256) -> Result<U256> {
        Ok(amount_in)
    }
}

pub fn reentrant_venue(world: &World, name: &str) -> Arc<ReentrantVenue> {
    Arc::new(ReentrantVenue {
        address: addr(name),
        operator: world.owner,
        request: world.request(units(1)),
        target: Arc::downgrade(&world.engine),
    })
}

/// Process-wide Prometheus recorder; tests keep their series apart with a
/// distinct `engine` label
#[allow(clippy::unwrap_used)]
pub fn prometheus() -> &'static PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE.get_or_init(|| PrometheusBuilder::new().install_recorder().unwrap())
}

/// Pays out `paid_percent` of the input but claims `reported_percent`
pub struct LyingVenue {
    address: Address,
    paid_percent: u64,
    reported_percent: u64,
}

impl SwapVenue for LyingVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        let paid = call.amount_in * U256::from(self.paid_percent) / U256::from(100);
        ledger.transfer(call.token_out, self.address, call.recipient, paid)?;
        Ok(call.amount_in * U256::from(self.reported_percent) / U256::from(100))
    }

    fn quote(&self, _: &dyn TokenLedger, _: Address, _: Address, amount_in: U256) -> Result<U256> {
        Ok(amount_in * U256::from(self.reported_percent) / U256::from(100))
    }
}

pub fn lying_venue(name: &str, paid_percent: u64, reported_percent: u64) -> Arc<LyingVenue> {
    Arc::new(LyingVenue {
        address: addr(name),
        paid_percent,
        reported_percent,
    })
}

/// Always refuses
pub struct RevertingVenue(Address);

impl SwapVenue for RevertingVenue {
    fn address(&self) -> Address {
        self.0
    }

    fn swap(&self, _: &dyn TokenLedger, _: &SwapCall) -> Result<U256> {
        bail!("venue reverted")
    }

    fn quote(&self, _: &dyn TokenLedger, _: Address, _: Address, _: U256) -> Result<U256> {
        bail!("venue reverted")
    }
}

pub fn reverting_venue(name: &str) -> Arc<RevertingVenue> {
    Arc::new(RevertingVenue(addr(name)))
}

/// Panics inside `swap`, after the input has been paid to it
pub struct PanickingVenue(Address);

impl SwapVenue for PanickingVenue {
    fn address(&self) -> Address {
        self.0
    }

    #[allow(clippy::panic)]
    fn swap(&self, _: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        panic!("venue blew up holding {}", call.amount_in)
    }

    fn quote(&self, _: &dyn TokenLedger, _: Address, _: Address, amount_in: U256) -> Result<U256> {
        Ok(amount_in)
    }
}

pub fn panicking_venue(name: &str) -> Arc<PanickingVenue> {
    Arc::new(PanickingVenue(addr(name)))
}

/// A venue that registers another venue, with the operator's identity, from
/// inside its own `swap`, then pays back half the input
pub struct RegistrarVenue {
    address: Address,
    operator: Address,
    target: Weak<ArbitrageEngine>,
}

impl SwapVenue for RegistrarVenue {
    fn address(&self) -> Address {
        self.address
    }

    fn swap(&self, ledger: &dyn TokenLedger, call: &SwapCall) -> Result<U256> {
        let engine = self
            .target
            .upgrade()
            .ok_or_else(|| eyre!("target engine dropped"))?;
        engine
            .register_venue(self.operator, fixed_rate_venue("SPAM", 100), "Spam")
            .map_err(eyre::Report::new)?;

        let paid = call.amount_in / U256::from(2);
        ledger.transfer(call.token_out, self.address, call.recipient, paid)?;
        Ok(paid)
    }

    fn quote(&self, _: &dyn TokenLedger, _: Address, _: Address, amount_in: U256) -> Result<U256> {
        Ok(amount_in / U256::from(2))
    }
}

pub fn registrar_venue(world: &World, name: &str) -> Arc<RegistrarVenue> {
    Arc::new(RegistrarVenue {
        address: addr(name),
        operator: world.owner,
        target: Arc::downgrade(&world.engine),
    })
}
