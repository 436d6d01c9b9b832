//! Serialized admission per wallet.
//!
//! `can_proceed` followed by the caller's status write is a check-then-act
//! sequence. [`BalanceEngine::admit`] runs both under a mutex keyed by the
//! charged wallet, so inside one process no two admissions against the same
//! wallet can both spend the same room. Separate processes still need a
//! serializable transaction around the same sequence.

use super::core::BalanceEngine;
use super::results::{AdmissionDecision, EngineError};
use crate::store::{StoreError, TradeStore, WalletStore};
use crate::trade::Trade;
use crate::wallet::WalletKey;
use log::{debug, warn};

impl<S> BalanceEngine<S>
where
    S: WalletStore + TradeStore,
{
    /// Evaluates, binds and commits `trade` as one step per charged wallet.
    ///
    /// On acceptance the wallet is bound and `commit` runs while the gate is
    /// still held. `commit` must make the trade visible to later reservation
    /// queries (typically by storing it in a reserving status). Rejected trades
    /// are returned untouched and `commit` is not called. If `commit` fails the
    /// binding is rolled back, so the trade ends up either admitted and bound
    /// or as it was passed in.
    pub fn admit<F>(&self, trade: &mut Trade, commit: F) -> Result<AdmissionDecision, EngineError>
    where
        F: FnOnce(&Trade) -> Result<(), StoreError>,
    {
        let key = WalletKey::new(&trade.client, trade.charged_currency());
        self.gates.run(&key, || -> Result<AdmissionDecision, EngineError> {
            let decision = self.evaluate(trade)?;
            if !decision.is_accepted() {
                return Ok(decision);
            }

            let previous = trade.wallet;
            self.proceed(trade)?;
            if let Err(e) = commit(trade) {
                trade.wallet = previous;
                warn!("trade {:?} not committed against {}: {}", trade.id, key, e);
                return Err(e.into());
            }
            debug!("trade {:?} admitted against {}", trade.id, key);
            Ok(decision)
        })
    }

    /// Wallets with an admission in progress or waiting.
    pub fn gated_wallets(&self) -> usize {
        self.gates.len()
    }
}
