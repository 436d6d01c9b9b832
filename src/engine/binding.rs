//! Binding accepted trades to the wallet they charge.

use super::core::BalanceEngine;
use super::results::{ConsistencyError, EngineError};
use crate::store::{TradeStore, WalletStore};
use crate::trade::Trade;
use crate::wallet::{WalletKey, WalletRef};
use log::{debug, error};

impl<S> BalanceEngine<S>
where
    S: WalletStore + TradeStore,
{
    /// Attaches a lazy reference to the charged wallet to `trade`.
    ///
    /// Only the in-memory trade changes; persisting the binding is up to the
    /// caller. Expected to follow a positive [`Self::can_proceed`], so a
    /// missing wallet here is a consistency error rather than a rejection.
    pub fn proceed(&self, trade: &mut Trade) -> Result<WalletRef, EngineError> {
        let key = WalletKey::new(&trade.client, trade.charged_currency());
        let id = match self.resolve_wallet_id(&trade.client, trade.charged_currency())? {
            Some(id) => id,
            None => {
                let violation = ConsistencyError::MissingWallet {
                    trade: trade.id,
                    key,
                };
                error!("{}", violation);
                return Err(violation.into());
            }
        };

        let wallet = WalletRef::new(id);
        if wallet.load(&self.store)?.is_none() {
            return Err(self.broken_cache(ConsistencyError::DanglingWallet { key, id }));
        }

        trade.bind_wallet(wallet);
        debug!("trade {:?} bound to wallet {:?} ({})", trade.id, id, key);
        Ok(wallet)
    }
}
