// 9.0 memory.rs: MOCKED. in-process wallet + trade store, no real database.
// implements both store traits so tests and the simulator can drive the engine.
// settlement here is a single balance move, not a real exchange fill.

use crate::store::{StoreError, TradeStore, WalletStore};
use crate::trade::{Trade, TradeStatus};
use crate::types::{Client, TradeId, TradingCurrency, WalletId};
use crate::wallet::{Wallet, WalletKey};
use log::debug;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Wallets {
    by_id: BTreeMap<WalletId, Wallet>,
    by_key: HashMap<WalletKey, WalletId>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    wallets: RwLock<Wallets>,
    trades: RwLock<BTreeMap<TradeId, Trade>>,
    next_wallet_id: AtomicU64,
    next_trade_id: AtomicU64,
    unavailable: AtomicBool,
    wallet_queries: AtomicUsize,
    trade_queries: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every trait query fails with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of natural-key wallet lookups served so far.
    pub fn wallet_queries(&self) -> usize {
        self.wallet_queries.load(Ordering::SeqCst)
    }

    pub fn trade_queries(&self) -> usize {
        self.trade_queries.load(Ordering::SeqCst)
    }

    pub fn create_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
        balance: Decimal,
    ) -> Result<WalletId, StoreError> {
        let mut wallets = self.wallets.write();
        let key = WalletKey::new(client, currency);
        if wallets.by_key.contains_key(&key) {
            return Err(StoreError::Conflict(format!("wallet {key} already exists")));
        }
        let id = WalletId(self.next_wallet_id.fetch_add(1, Ordering::SeqCst) + 1);
        wallets
            .by_id
            .insert(id, Wallet::new(id, client.clone(), currency.clone(), balance));
        wallets.by_key.insert(key, id);
        Ok(id)
    }

    pub fn set_balance(&self, id: WalletId, balance: Decimal) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write();
        let wallet = wallets
            .by_id
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("wallet {id:?}")))?;
        wallet.balance = balance;
        Ok(())
    }

    pub fn remove_wallet(&self, id: WalletId) -> Result<Wallet, StoreError> {
        let mut wallets = self.wallets.write();
        let wallet = wallets
            .by_id
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("wallet {id:?}")))?;
        wallets.by_key.remove(&wallet.key());
        Ok(wallet)
    }

    pub fn wallet(&self, id: WalletId) -> Option<Wallet> {
        self.wallets.read().by_id.get(&id).cloned()
    }

    pub fn wallets(&self) -> Vec<Wallet> {
        self.wallets.read().by_id.values().cloned().collect()
    }

    pub fn next_trade_id(&self) -> TradeId {
        TradeId(self.next_trade_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Insert or replace a trade row.
    pub fn save_trade(&self, trade: Trade) {
        self.trades.write().insert(trade.id, trade);
    }

    pub fn trade(&self, id: TradeId) -> Option<Trade> {
        self.trades.read().get(&id).cloned()
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.trades.read().values().cloned().collect()
    }

    pub fn set_status(&self, id: TradeId, status: TradeStatus) -> Result<(), StoreError> {
        let mut trades = self.trades.write();
        let trade = trades
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("trade {id:?}")))?;
        trade.status = status;
        Ok(())
    }

    /// Applies a reserving trade to balances and closes it.
    ///
    /// Debits the charged wallet, credits the received one (creating it if this
    /// is the client's first holding in that currency).
    pub fn settle(&self, id: TradeId) -> Result<(), StoreError> {
        let mut wallets = self.wallets.write();
        let mut trades = self.trades.write();

        let trade = trades
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("trade {id:?}")))?;
        if !trade.status.reserves_funds() {
            return Err(StoreError::Conflict(format!(
                "trade {id:?} is {:?} and holds no funds",
                trade.status
            )));
        }

        let charged_key = WalletKey::new(&trade.client, trade.charged_currency());
        let charged_id = *wallets
            .by_key
            .get(&charged_key)
            .ok_or_else(|| StoreError::NotFound(format!("wallet {charged_key}")))?;

        let received_key = WalletKey::new(&trade.client, trade.received_currency());
        let received_id = match wallets.by_key.get(&received_key) {
            Some(id) => *id,
            None => {
                let id = WalletId(self.next_wallet_id.fetch_add(1, Ordering::SeqCst) + 1);
                let wallet = Wallet::new(
                    id,
                    trade.client.clone(),
                    trade.received_currency().clone(),
                    Decimal::ZERO,
                );
                wallets.by_id.insert(id, wallet);
                wallets.by_key.insert(received_key, id);
                id
            }
        };

        if let Some(charged) = wallets.by_id.get_mut(&charged_id) {
            charged.balance -= trade.required_amount();
        }
        if let Some(received) = wallets.by_id.get_mut(&received_id) {
            received.balance += trade.received_amount();
        }
        trade.status = TradeStatus::Closed;
        debug!("settled trade {:?} against {}", id, charged_key);
        Ok(())
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store switched off".to_string()));
        }
        Ok(())
    }
}

impl WalletStore for InMemoryStore {
    fn find_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
    ) -> Result<Option<Wallet>, StoreError> {
        self.wallet_queries.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        let wallets = self.wallets.read();
        Ok(wallets
            .by_key
            .get(&WalletKey::new(client, currency))
            .and_then(|id| wallets.by_id.get(id))
            .cloned())
    }

    fn find_wallet_by_id(&self, id: WalletId) -> Result<Option<Wallet>, StoreError> {
        self.ensure_available()?;
        Ok(self.wallets.read().by_id.get(&id).cloned())
    }
}

impl TradeStore for InMemoryStore {
    fn find_open_trades_against_wallet(
        &self,
        client: &Client,
        currency: &TradingCurrency,
        speculative: &[TradeStatus],
        concrete: &[TradeStatus],
    ) -> Result<Vec<Trade>, StoreError> {
        self.trade_queries.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;
        Ok(self
            .trades
            .read()
            .values()
            .filter(|t| &t.client == client && t.charged_currency() == currency)
            .filter(|t| speculative.contains(&t.status) || concrete.contains(&t.status))
            .cloned()
            .collect())
    }
}
