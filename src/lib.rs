/*!
 * # Arbot - Custodial Two-Venue Arbitrage Engine
 *
 * Arbot holds a token balance in custody and trades it across two exchange
 * venues in a single checked round trip: buy on one venue, sell back on the
 * other, and keep the result only if custody grew.
 *
 * ## Core Features
 *
 * - **Operator Gate**: One identity, fixed at construction, may register venues,
 *   execute arbitrage and withdraw
 * - **Reentrancy Guard**: Venues are untrusted and may call back into the engine;
 *   nested entry is refused
 * - **Self-Measured Legs**: Every leg is measured from the engine's own balances,
 *   never from what a venue reports
 * - **All-or-Nothing Round Trips**: A losing or failing round trip is rolled back
 *   and reported as a distinct error
 *
 * ## Module Structure
 *
 * - `arb`: The engine and its building blocks
 * - `config`: Configuration from the environment
 * - `notify`: Outbound notifications
 * - `utils`: Logging and constants
 * - `venues`: In-process venue implementations
 */

/// Arbitrage engine
pub mod arb;
/// Configuration management for the system
pub mod config;
/// Outbound notifications
pub mod notify;
/// Utility functions and helpers
pub mod utils;
/// In-process venue implementations
pub mod venues;
