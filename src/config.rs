//! Configuration loaded from the environment (and a `.env` file when present).
use std::env;
use std::str::FromStr;

use alloy::primitives::{Address, U256};
use eyre::{Result, WrapErr};

use crate::arb::EngineConfig;
use crate::utils::constants::{AAVE_ADDRESSES_PROVIDER, SIMULATION_OPERATOR};

/// Operator address
const OPERATOR_VAR: &str = "ARB_OPERATOR";
/// Custody address override
const ENGINE_ADDRESS_VAR: &str = "ARB_ENGINE_ADDRESS";
/// Liquidity-provider registry address
const LIQUIDITY_PROVIDER_VAR: &str = "ARB_LIQUIDITY_PROVIDER";
/// Minimum profit, in token base units
const MIN_PROFIT_VAR: &str = "ARB_MIN_PROFIT";
/// Slack OAuth token
const SLACK_TOKEN_VAR: &str = "SLACK_OAUTH_TOKEN";
/// Telegram bot token
const TELEGRAM_TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
/// Telegram chat receiving notifications
const TELEGRAM_CHAT_VAR: &str = "TELEGRAM_CHAT_ID";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Operator of the engine; `None` when `ARB_OPERATOR` is unset
    pub operator: Option<Address>,
    /// Custody address override
    pub engine_address: Option<Address>,
    /// Liquidity-provider registry the engine is deployed against
    pub liquidity_provider: Address,
    /// Minimum profit a round trip must make
    pub min_profit: U256,
    /// Slack token; notifications are disabled without it
    pub slack_token: Option<String>,
    /// Telegram bot token
    pub telegram_token: Option<String>,
    /// Telegram chat; Telegram notifications need both this and the token
    pub telegram_chat_id: Option<String>,
}

impl Config {
    /// Loads `.env` (if any) and reads the configuration from the environment
    ///
    /// # Errors
    /// * If a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`
    ///
    /// # Errors
    /// * If a variable is set but cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            operator: parse_var(&lookup, OPERATOR_VAR)?,
            engine_address: parse_var(&lookup, ENGINE_ADDRESS_VAR)?,
            liquidity_provider: parse_var(&lookup, LIQUIDITY_PROVIDER_VAR)?
                .unwrap_or(AAVE_ADDRESSES_PROVIDER),
            min_profit: parse_var(&lookup, MIN_PROFIT_VAR)?.unwrap_or(U256::ZERO),
            slack_token: non_empty(&lookup, SLACK_TOKEN_VAR),
            telegram_token: non_empty(&lookup, TELEGRAM_TOKEN_VAR),
            telegram_chat_id: non_empty(&lookup, TELEGRAM_CHAT_VAR),
        })
    }

    /// The configured operator, or the simulation operator when unset
    #[must_use]
    pub fn operator_or_default(&self) -> Address {
        self.operator.unwrap_or(SIMULATION_OPERATOR)
    }

    /// Engine construction parameters
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::new(self.operator_or_default())
            .with_liquidity_provider(self.liquidity_provider)
            .with_min_profit(self.min_profit);
        if let Some(address) = self.engine_address {
            config = config.with_address(address);
        }
        config
    }
}

/// The raw value of `key`, if it is set and not empty
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.trim().is_empty())
}

/// Parses `key` if it is set and not empty
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .wrap_err_with(|| format!("{key} has an invalid value: {value}")),
        _ => Ok(None),
    }
}
