// 8.0 engine/core.rs: main engine. holds the store handle, the wallet id cache and admission gates.
// no balances or trades live here. everything is read fresh from the store per call.

use super::config::EngineConfig;
use super::results::{ConsistencyError, EngineError};
use crate::cache::{CacheStats, WalletIdLookup, WalletLookupCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, ReservationConfig};
use crate::gates::KeyedGates;
use crate::store::{TradeStore, WalletStore};
use crate::types::{Client, TradingCurrency, WalletId};
use crate::wallet::{Wallet, WalletKey};
use log::error;
use std::sync::Arc;

/** 8.1: main engine struct. safe to share between threads */
pub struct BalanceEngine<S> {
    pub(super) config: EngineConfig,
    pub(super) store: S,
    pub(super) wallet_ids: Arc<dyn WalletIdLookup>,
    pub(super) default_cache: Option<Arc<WalletLookupCache>>,
    pub(super) gates: KeyedGates<WalletKey>,
}

impl<S> BalanceEngine<S>
where
    S: WalletStore + TradeStore,
{
    pub fn new(config: &ReservationConfig, store: S) -> Result<Self, ConfigError> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Engine with the built-in wallet id cache. `config` is validated first.
    pub fn with_clock(
        config: &ReservationConfig,
        store: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = Arc::new(WalletLookupCache::new(&config.cache.wallet_ids, clock)?);
        Ok(Self {
            config: config.engine.clone(),
            store,
            wallet_ids: cache.clone(),
            default_cache: Some(cache),
            gates: KeyedGates::new(),
        })
    }

    /// Engine resolving wallet ids through a caller-supplied lookup.
    pub fn with_lookup(config: EngineConfig, store: S, wallet_ids: Arc<dyn WalletIdLookup>) -> Self {
        Self {
            config,
            store,
            wallet_ids,
            default_cache: None,
            gates: KeyedGates::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Counters of the built-in cache. `None` with a caller-supplied lookup.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.default_cache.as_ref().map(|cache| cache.stats())
    }

    /// Wallet id for `(client, currency)`, through the cache.
    pub(super) fn resolve_wallet_id(
        &self,
        client: &Client,
        currency: &TradingCurrency,
    ) -> Result<Option<WalletId>, EngineError> {
        let key = WalletKey::new(client, currency);
        let id = self.wallet_ids.lookup(&key, &mut || {
            Ok(self.store.find_wallet(client, currency)?.map(|w| w.id))
        })?;
        Ok(id)
    }

    /// Loads the wallet a cached id claims exists. The row must still be there
    /// under the same id.
    pub(super) fn load_cached_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
        cached: WalletId,
    ) -> Result<Wallet, EngineError> {
        let key = WalletKey::new(client, currency);
        match self.store.find_wallet(client, currency)? {
            Some(wallet) if wallet.id == cached => Ok(wallet),
            Some(wallet) => Err(self.broken_cache(ConsistencyError::StaleWalletId {
                key,
                cached,
                actual: wallet.id,
            })),
            None => Err(self.broken_cache(ConsistencyError::DanglingWallet { key, id: cached })),
        }
    }

    // drops the offending cache entry so a later call starts from the store again
    pub(super) fn broken_cache(&self, violation: ConsistencyError) -> EngineError {
        error!("{}", violation);
        match &violation {
            ConsistencyError::DanglingWallet { key, .. }
            | ConsistencyError::StaleWalletId { key, .. } => self.wallet_ids.invalidate(key),
            ConsistencyError::MissingWallet { .. } | ConsistencyError::WrongQueryResult { .. } => {}
        }
        EngineError::Consistency(violation)
    }
}
