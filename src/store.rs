// 4.0 store.rs: the persistence capabilities the engine consumes.
// the engine never owns wallets or trades. it asks for them through these traits,
// inside whatever transaction the caller has open.

use crate::trade::{Trade, TradeStatus};
use crate::types::{Client, TradingCurrency, WalletId};
use crate::wallet::Wallet;

/// Failure reported by the storage layer. Passed through the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),
}

pub trait WalletStore: Send + Sync {
    /// Point lookup by natural key.
    fn find_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
    ) -> Result<Option<Wallet>, StoreError>;

    /// Dereference an id. `None` means the id no longer points at a live row.
    fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>, StoreError>;
}

pub trait TradeStore: Send + Sync {
    /// Trades of `client` charging `currency` whose status is in either set.
    fn find_open_trades_against_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
        speculative: &[TradeStatus],
        concrete: &[TradeStatus],
    ) -> Result<Vec<Trade>, StoreError>;
}

impl<T: WalletStore + ?Sized> WalletStore for std::sync::Arc<T> {
    fn find_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
    ) -> Result<Option<Wallet>, StoreError> {
        (**self).find_wallet(client, currency)
    }

    fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        (**self).find_wallet_by_id(id)
    }
}

impl<T: TradeStore + ?Sized> TradeStore for std::sync::Arc<T> {
    fn find_open_trades_against_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
        speculative: &[TradeStatus],
        concrete: &[TradeStatus],
    ) -> Result<Vec<Trade>, StoreError> {
        (**self).find_open_trades_against_wallet(client, currency, speculative, concrete)
    }
}
