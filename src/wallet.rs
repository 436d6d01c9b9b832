//! Wallets and references to them.
//!
//! A wallet holds a client's balance in one currency. The engine only reads
//! wallets; settlement mutates balances somewhere else. Trades point at the
//! wallet they charge through a [`WalletRef`], never an owned copy, so a bound
//! trade always sees the balance as it is when it is dereferenced.

use crate::store::{StoreError, WalletStore};
use crate::types::{Client, TradingCurrency, WalletId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub client: Client,
    pub currency: TradingCurrency,
    pub balance: Decimal,
}

impl Wallet {
    pub fn new(id: WalletId, client: Client, currency: TradingCurrency, balance: Decimal) -> Self {
        Self {
            id,
            client,
            currency,
            balance,
        }
    }

    pub fn key(&self) -> WalletKey {
        WalletKey::new(&self.client, &self.currency)
    }

    pub fn belongs_to(&self, client: &Client, currency: &TradingCurrency) -> bool {
        &self.client == client && &self.currency == currency
    }
}

// 2.1: natural key of a wallet. at most one wallet exists per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletKey {
    pub client: String,
    pub currency: TradingCurrency,
}

impl WalletKey {
    pub fn new(client: &Client, currency: &TradingCurrency) -> Self {
        Self {
            client: client.name().to_string(),
            currency: currency.clone(),
        }
    }
}

impl fmt::Display for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.client, self.currency)
    }
}

// 2.2: lazy wallet reference. relation + lookup, never ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRef {
    id: WalletId,
}

impl WalletRef {
    pub fn new(id: WalletId) -> Self {
        Self { id }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    /// Fetches the current wallet row. `None` means the reference dangles.
    pub fn load<S: WalletStore + ?Sized>(&self, store: &S) -> Result<Option<Wallet>, StoreError> {
        store.find_wallet_by_id(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use rust_decimal_macros::dec;

    #[test]
    fn key_uses_client_name_and_currency() {
        let wallet = Wallet::new(
            WalletId(7),
            Client::new("bitfinex"),
            TradingCurrency::new("eth"),
            dec!(3),
        );
        let key = wallet.key();
        assert_eq!(key.client, "bitfinex");
        assert_eq!(key.currency, TradingCurrency::new("ETH"));
        assert_eq!(key.to_string(), "bitfinex/ETH");
    }

    #[test]
    fn reference_sees_latest_balance() {
        let store = InMemoryStore::new();
        let client = Client::new("hitbtc");
        let usd = TradingCurrency::new("USD");
        let id = store.create_wallet(&client, &usd, dec!(10)).unwrap();
        let wallet_ref = WalletRef::new(id);

        store.set_balance(id, dec!(42)).unwrap();

        let loaded = wallet_ref.load(&store).unwrap().unwrap();
        assert_eq!(loaded.balance, dec!(42));
        assert!(loaded.belongs_to(&client, &usd));
    }

    #[test]
    fn dangling_reference_loads_none() {
        let store = InMemoryStore::new();
        let id = store
            .create_wallet(&Client::new("okex"), &TradingCurrency::new("BTC"), dec!(1))
            .unwrap();
        store.remove_wallet(id).unwrap();

        assert!(WalletRef::new(id).load(&store).unwrap().is_none());
    }
}
