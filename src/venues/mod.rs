//! # Venues
//!
//! In-process swap venues the engine can trade against. Real deployments plug
//! their own [`SwapVenue`](crate::arb::venue::SwapVenue) implementations in;
//! these two back the simulator, the benchmarks and the tests.

/// Uniswap V2 style constant-product pool
pub mod constant_product;
/// Router paying a configurable percentage of the input
pub mod fixed_rate;

pub use constant_product::ConstantProductVenue;
pub use fixed_rate::FixedRateVenue;
