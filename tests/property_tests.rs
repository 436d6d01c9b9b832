//! Property-based tests for the reservation invariants.
//!
//! These tests verify invariants hold under random inputs.

use proptest::prelude::*;
use reservation_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

// Strategies for generating test data
fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..50_000i64).prop_map(|x| Decimal::new(x, 2)) // 0.01 to 500.00
}

fn balance_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..200_000i64).prop_map(|x| Decimal::new(x, 2)) // 0 to 2,000.00
}

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|x| Decimal::new(x, 4)) // 0.0001 to 100
}

#[derive(Debug, Clone)]
enum Step {
    Propose { amount: Decimal, dependent: bool },
    Open(usize),
    Settle(usize),
    Cancel(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (amount_strategy(), any::<bool>())
            .prop_map(|(amount, dependent)| Step::Propose { amount, dependent }),
        2 => (0usize..64).prop_map(Step::Open),
        1 => (0usize..64).prop_map(Step::Settle),
        1 => (0usize..64).prop_map(Step::Cancel),
    ]
}

fn setup(balance: Decimal) -> (BalanceEngine<Arc<InMemoryStore>>, Arc<InMemoryStore>, WalletId) {
    let store = Arc::new(InMemoryStore::new());
    let wallet = store
        .create_wallet(&Client::new("prop"), &TradingCurrency::new("USD"), balance)
        .unwrap();
    let clock = Arc::new(ManualClock::new(Timestamp::from_millis(0)));
    let engine =
        BalanceEngine::with_clock(&ReservationConfig::default(), store.clone(), clock).unwrap();
    (engine, store, wallet)
}

fn spend(store: &InMemoryStore, amount: Decimal) -> Trade {
    Trade::sell(
        store.next_trade_id(),
        Client::new("prop"),
        TradingCurrency::new("USD"),
        TradingCurrency::new("EUR"),
        amount,
        Price::new_unchecked(Decimal::ONE),
    )
}

// every trade still holding funds on the wallet, dependency siblings included
fn total_reserved(store: &InMemoryStore) -> Decimal {
    store
        .trades()
        .iter()
        .filter(|t| t.status.reserves_funds())
        .map(|t| t.required_amount())
        .sum()
}

proptest! {
    /// Sequential admissions never reserve more than the wallet holds.
    #[test]
    fn no_over_reservation(
        balance in balance_strategy(),
        steps in proptest::collection::vec(step_strategy(), 1..40),
    ) {
        let (engine, store, wallet) = setup(balance);
        let parent = TradeId(1_000_000);

        for step in steps {
            match step {
                Step::Propose { amount, dependent } => {
                    let mut trade = spend(&store, amount);
                    if dependent {
                        trade = trade.depending_on(parent);
                    }
                    engine.admit(&mut trade, |t| {
                        store.save_trade(t.clone());
                        Ok(())
                    }).unwrap();
                }
                Step::Open(i) => {
                    let trades = store.trades();
                    if let Some(t) = trades.get(i % trades.len().max(1)) {
                        if t.status == TradeStatus::Unknown {
                            store.set_status(t.id, TradeStatus::Opened).unwrap();
                        }
                    }
                }
                Step::Settle(i) => {
                    let trades = store.trades();
                    if let Some(t) = trades.get(i % trades.len().max(1)) {
                        if t.status == TradeStatus::Opened {
                            store.settle(t.id).unwrap();
                        }
                    }
                }
                Step::Cancel(i) => {
                    let trades = store.trades();
                    if let Some(t) = trades.get(i % trades.len().max(1)) {
                        if t.status.reserves_funds() {
                            store.set_status(t.id, TradeStatus::Cancelled).unwrap();
                        }
                    }
                }
            }

            let wallet_balance = store.wallet(wallet).unwrap().balance;
            let committed: Decimal = store
                .trades()
                .iter()
                .filter(|t| t.status.reserves_funds() && !t.has_dependency())
                .map(|t| t.required_amount())
                .sum();
            prop_assert!(
                committed <= wallet_balance,
                "reserved {} exceeds balance {}",
                committed,
                wallet_balance
            );
            prop_assert!(wallet_balance >= Decimal::ZERO);
        }
    }

    /// Without dependent trades the whole reservation stays within the balance.
    #[test]
    fn no_over_reservation_without_dependencies(
        balance in balance_strategy(),
        amounts in proptest::collection::vec(amount_strategy(), 1..30),
    ) {
        let (engine, store, _) = setup(balance);
        for amount in amounts {
            let mut trade = spend(&store, amount);
            engine.admit(&mut trade, |t| {
                store.save_trade(t.clone());
                Ok(())
            }).unwrap();
            prop_assert!(total_reserved(&store) <= balance);
        }
    }

    /// Repeating a check without state changes gives the same answer.
    #[test]
    fn can_proceed_idempotent(
        balance in balance_strategy(),
        reserved in proptest::collection::vec(amount_strategy(), 0..10),
        amount in amount_strategy(),
    ) {
        let (engine, store, _) = setup(balance);
        for r in reserved {
            store.save_trade(spend(&store, r).with_status(TradeStatus::Opened));
        }
        let trade = spend(&store, amount);
        let first = engine.can_proceed(&trade).unwrap();
        let second = engine.can_proceed(&trade).unwrap();
        prop_assert_eq!(first, second);
    }

    /// Decision matches balance - reserved >= required, boundary included.
    #[test]
    fn decision_matches_arithmetic(
        balance in balance_strategy(),
        reserved in proptest::collection::vec(amount_strategy(), 0..10),
        amount in amount_strategy(),
    ) {
        let (engine, store, _) = setup(balance);
        let mut sum = Decimal::ZERO;
        for r in reserved {
            sum += r;
            store.save_trade(spend(&store, r));
        }
        let accepted = engine.can_proceed(&spend(&store, amount)).unwrap();
        prop_assert_eq!(accepted, balance - sum >= amount);
    }

    /// Buying charges size * price of the quote currency.
    #[test]
    fn buy_requires_size_times_price(
        size in amount_strategy(),
        price in price_strategy(),
    ) {
        let store = Arc::new(InMemoryStore::new());
        let client = Client::new("prop");
        let required = size * price;
        store.create_wallet(&client, &TradingCurrency::new("USD"), required).unwrap();
        let engine = BalanceEngine::with_clock(
            &ReservationConfig::default(),
            store.clone(),
            Arc::new(ManualClock::new(Timestamp::from_millis(0))),
        )
        .unwrap();

        let exact = Trade::buy(
            TradeId(1),
            client.clone(),
            TradingCurrency::new("ETH"),
            TradingCurrency::new("USD"),
            size,
            Price::new_unchecked(price),
        );
        prop_assert!(engine.can_proceed(&exact).unwrap());

        let over = Trade::buy(
            TradeId(2),
            client,
            TradingCurrency::new("ETH"),
            TradingCurrency::new("USD"),
            size + dec!(0.01),
            Price::new_unchecked(price),
        );
        prop_assert!(!engine.can_proceed(&over).unwrap());
    }
}
