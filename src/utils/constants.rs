use alloy::primitives::{address, Address};

/// Aave `PoolAddressesProvider` on Polygon, the liquidity-provider registry
/// production deployments point the engine at
pub const AAVE_ADDRESSES_PROVIDER: Address =
    address!("0xa97684ead0e402dC232d5A977953DF7ECBaB3CDb");

/// Operator used by the simulator when none is configured
pub const SIMULATION_OPERATOR: Address = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

/// Number of decimals of the simulated tokens
pub const SIMULATION_DECIMALS: u8 = 18;
