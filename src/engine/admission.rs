//! Admission checks.
//!
//! Answers "does the charged wallet still have room for this trade?" from a
//! single read of the wallet and the trades holding funds against it. Nothing
//! is written. Two callers can both see room that only exists for one of them;
//! use [`BalanceEngine::admit`] or a serializable transaction when that matters.

use super::core::BalanceEngine;
use super::results::{AdmissionDecision, BalanceAssessment, EngineError};
use crate::reservation::ReservationCalculator;
use crate::store::{TradeStore, WalletStore};
use crate::trade::Trade;
use crate::wallet::WalletKey;
use log::{debug, log, Level};

impl<S> BalanceEngine<S>
where
    S: WalletStore + TradeStore,
{
    /// Whether `trade` fits into its charged wallet's unreserved balance.
    pub fn can_proceed(&self, trade: &Trade) -> Result<bool, EngineError> {
        Ok(self.evaluate(trade)?.is_accepted())
    }

    /// Full admission decision for `trade`.
    pub fn evaluate(&self, trade: &Trade) -> Result<AdmissionDecision, EngineError> {
        let charged = trade.charged_currency();

        let Some(cached_id) = self.resolve_wallet_id(&trade.client, charged)? else {
            let key = WalletKey::new(&trade.client, charged);
            debug!("trade {:?} rejected: no wallet {}", trade.id, key);
            return Ok(AdmissionDecision::NoWallet(key));
        };
        let wallet = self.load_cached_wallet(&trade.client, charged, cached_id)?;

        // a dependent trade does not compete with its DependsOn siblings
        let reservation = ReservationCalculator::new(&self.store).reservation(
            &wallet,
            !trade.has_dependency(),
            Some(trade.id),
        )?;

        let assessment = BalanceAssessment {
            wallet_id: wallet.id,
            charged_currency: wallet.currency.clone(),
            balance: wallet.balance,
            reservation,
            required: trade.required_amount(),
        };

        let decision = if assessment.covers() {
            AdmissionDecision::Accepted(assessment)
        } else {
            AdmissionDecision::InsufficientFunds(assessment)
        };
        self.log_decision(trade, &decision);
        Ok(decision)
    }

    fn log_decision(&self, trade: &Trade, decision: &AdmissionDecision) {
        let level = if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        };
        if let Some(a) = decision.assessment() {
            log!(
                level,
                "trade {:?} {}: balance {} reserved {} available {} required {} {}",
                trade.id,
                if decision.is_accepted() { "accepted" } else { "rejected" },
                a.balance,
                a.reserved(),
                a.available(),
                a.required,
                a.charged_currency
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::clock::ManualClock;
    use crate::config::ReservationConfig;
    use crate::engine::{AdmissionDecision, BalanceEngine, ConsistencyError, EngineError};
    use crate::memory::InMemoryStore;
    use crate::store::StoreError;
    use crate::trade::{Trade, TradeStatus};
    use crate::types::{Client, Price, Timestamp, TradeId, TradingCurrency};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn client() -> Client {
        Client::new("bittrex")
    }

    fn usd() -> TradingCurrency {
        TradingCurrency::new("USD")
    }

    fn btc() -> TradingCurrency {
        TradingCurrency::new("BTC")
    }

    fn engine() -> (BalanceEngine<Arc<InMemoryStore>>, Arc<InMemoryStore>, Arc<ManualClock>) {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
        let engine =
            BalanceEngine::with_clock(&ReservationConfig::default(), store.clone(), clock.clone()).unwrap();
        (engine, store, clock)
    }

    fn sell_usd(store: &InMemoryStore, amount: rust_decimal::Decimal) -> Trade {
        Trade::sell(store.next_trade_id(), client(), usd(), btc(), amount, Price::new_unchecked(dec!(1)))
    }

    #[test]
    fn no_wallet_means_no() {
        let (engine, store, _) = engine();
        let trade = sell_usd(&store, dec!(1));
        let decision = engine.evaluate(&trade).unwrap();
        assert!(matches!(decision, AdmissionDecision::NoWallet(_)));
        assert!(!engine.can_proceed(&trade).unwrap());
    }

    #[test]
    fn opened_trade_reduces_room() {
        let (engine, store, _) = engine();
        store.create_wallet(&client(), &usd(), dec!(50)).unwrap();
        store.save_trade(sell_usd(&store, dec!(20)).with_status(TradeStatus::Opened));

        let decision = engine.evaluate(&sell_usd(&store, dec!(25))).unwrap();
        let assessment = decision.assessment().unwrap();
        assert!(decision.is_accepted());
        assert_eq!(assessment.reserved(), dec!(20));
        assert_eq!(assessment.available(), dec!(30));

        assert!(!engine.can_proceed(&sell_usd(&store, dec!(31))).unwrap());
    }

    #[test]
    fn stored_trade_not_counted_against_itself() {
        let (engine, store, _) = engine();
        store.create_wallet(&client(), &usd(), dec!(50)).unwrap();
        let trade = sell_usd(&store, dec!(40));
        store.save_trade(trade.clone());

        assert!(engine.can_proceed(&trade).unwrap());
    }

    #[test]
    fn dangling_cached_id_is_fatal_and_evicted() {
        let (engine, store, _) = engine();
        let id = store.create_wallet(&client(), &usd(), dec!(50)).unwrap();
        let trade = sell_usd(&store, dec!(1));
        assert!(engine.can_proceed(&trade).unwrap());

        store.remove_wallet(id).unwrap();
        let err = engine.can_proceed(&trade).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(
            err,
            EngineError::Consistency(ConsistencyError::DanglingWallet { .. })
        ));

        // the entry was dropped, so the store is asked again and says no wallet
        assert!(!engine.can_proceed(&trade).unwrap());
    }

    #[test]
    fn recreated_wallet_is_stale_cache() {
        let (engine, store, _) = engine();
        let id = store.create_wallet(&client(), &usd(), dec!(50)).unwrap();
        let trade = sell_usd(&store, dec!(1));
        assert!(engine.can_proceed(&trade).unwrap());

        store.remove_wallet(id).unwrap();
        store.create_wallet(&client(), &usd(), dec!(50)).unwrap();

        let err = engine.can_proceed(&trade).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Consistency(ConsistencyError::StaleWalletId { .. })
        ));
        assert!(engine.can_proceed(&trade).unwrap());
    }

    #[test]
    fn storage_errors_propagate() {
        let (engine, store, _) = engine();
        store.create_wallet(&client(), &usd(), dec!(50)).unwrap();
        store.set_unavailable(true);

        let err = engine.can_proceed(&sell_usd(&store, dec!(1))).unwrap_err();
        assert_eq!(
            err,
            EngineError::Storage(StoreError::Unavailable("in-memory store switched off".to_string()))
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn new_wallet_seen_after_absence_expires() {
        let (engine, store, clock) = engine();
        let trade = sell_usd(&store, dec!(5));
        assert!(!engine.can_proceed(&trade).unwrap());

        store.create_wallet(&client(), &usd(), dec!(10)).unwrap();
        // absence still cached
        assert!(!engine.can_proceed(&trade).unwrap());

        clock.advance_secs(ReservationConfig::default().cache.wallet_ids.live_s);
        assert!(engine.can_proceed(&trade).unwrap());
    }

    #[test]
    fn dependent_trade_checks_against_unknown_only() {
        let (engine, store, _) = engine();
        store.create_wallet(&client(), &usd(), dec!(100)).unwrap();
        store.save_trade(sell_usd(&store, dec!(80)).depending_on(TradeId(1000)));

        let free = sell_usd(&store, dec!(30));
        let dependent = sell_usd(&store, dec!(30)).depending_on(TradeId(1000));

        assert!(!engine.can_proceed(&free).unwrap());
        assert!(engine.can_proceed(&dependent).unwrap());
    }
}
