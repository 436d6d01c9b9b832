// reservation-core: balance reservation engine for cross-exchange trading.
// decides whether a proposed trade fits into its wallet's unreserved balance,
// then binds accepted trades to that wallet. reads only, settlement lives elsewhere.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: WalletId, TradeId, Client, TradingCurrency, Price, Timestamp
//   2.x  wallet.rs: wallet, natural key, lazy wallet reference
//   3.x  trade.rs: trade, status, charged currency, reserved amount
//   4.x  store.rs: persistence traits the engine consumes
//   5.x  cache.rs: bounded expiring wallet id cache, negative results included
//   6.x  reservation.rs: sum of funds held by unsettled trades
//   7.x  config.rs: cache sizing, ttl, presets, json loading
//   8.x  engine/: admission, binding, per-wallet admission gates
//   9.x  memory.rs: in-memory store (mocked)
//   10.x clock.rs: wall and manual clocks
//   11.x gates.rs: per-key mutexes, pruned when idle

// core modules
pub mod engine;
pub mod reservation;
pub mod trade;
pub mod types;
pub mod wallet;

// infrastructure modules
pub mod cache;
pub mod clock;
pub mod config;
mod gates;
pub mod memory;
pub mod store;

// re exports for convenience
pub use cache::{CacheStats, ExpiringCache, WalletIdLookup, WalletLookupCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CacheSpec, ConfigError, Environment, ReservationConfig};
pub use engine::*;
pub use memory::InMemoryStore;
pub use reservation::{Reservation, ReservationCalculator};
pub use store::{StoreError, TradeStore, WalletStore};
pub use trade::*;
pub use types::*;
pub use wallet::*;
