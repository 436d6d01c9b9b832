//! Balance reservation simulation.
//!
//! Walks the admission engine through the cases it exists for: sell and buy
//! direction, reservations from opened trades, dependency exclusivity,
//! negative wallet caching and serialized admission under contention.

use clap::{Parser, ValueEnum};
use log::info;
use reservation_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    Development,
    Paper,
    Live,
}

impl From<Preset> for Environment {
    fn from(preset: Preset) -> Self {
        match preset {
            Preset::Development => Environment::Development,
            Preset::Paper => Environment::Paper,
            Preset::Live => Environment::Live,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Parser, Debug)]
#[command(name = "reservation-sim", about = "Runs balance reservation scenarios")]
struct Args {
    /// JSON config file. Overrides --env.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Built-in config preset
    #[arg(long, value_enum, default_value = "development")]
    env: Preset,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match ReservationConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(2);
            }
        },
        None => Environment::from(args.env).config(),
    };
    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        std::process::exit(2);
    }
    info!(
        "wallet id cache: {} entries, {}s ttl",
        config.cache.wallet_ids.size, config.cache.wallet_ids.live_s
    );

    println!("Balance Reservation Engine Simulation\n");

    let scenarios: [(&str, fn(&ReservationConfig) -> Result<(), SimError>); 5] = [
        ("Sell vs buy direction", scenario_1_direction),
        ("Opened trade reservation", scenario_2_opened_reservation),
        ("Dependency exclusivity", scenario_3_dependency_exclusivity),
        ("Negative wallet caching", scenario_4_negative_caching),
        ("Serialized admission", scenario_5_serialized_admission),
    ];

    for (i, (name, run)) in scenarios.iter().enumerate() {
        println!("Scenario {}: {}\n", i + 1, name);
        if let Err(e) = run(&config) {
            eprintln!("  failed: {}", e);
            std::process::exit(1);
        }
        println!();
    }

    println!("All simulations completed successfully.");
}

fn usd() -> TradingCurrency {
    TradingCurrency::new("USD")
}

fn btc() -> TradingCurrency {
    TradingCurrency::new("BTC")
}

fn engine_with_store(
    config: &ReservationConfig,
) -> Result<(BalanceEngine<Arc<InMemoryStore>>, Arc<InMemoryStore>), ConfigError> {
    let store = Arc::new(InMemoryStore::new());
    Ok((BalanceEngine::new(config, store.clone())?, store))
}

fn report(label: &str, decision: &AdmissionDecision) {
    match decision {
        AdmissionDecision::Accepted(a) | AdmissionDecision::InsufficientFunds(a) => println!(
            "  {}: {} (balance {}, reserved {}, available {}, required {} {})",
            label,
            if decision.is_accepted() { "accepted" } else { "rejected" },
            a.balance,
            a.reserved(),
            a.available(),
            a.required,
            a.charged_currency
        ),
        AdmissionDecision::NoWallet(key) => println!("  {}: rejected, no wallet {}", label, key),
    }
}

/// Selling charges currency_from, buying charges currency_to at amount * price.
fn scenario_1_direction(config: &ReservationConfig) -> Result<(), SimError> {
    let (engine, store) = engine_with_store(config)?;
    let alice = Client::new("alice");
    store.create_wallet(&alice, &btc(), dec!(1))?;
    store.create_wallet(&alice, &usd(), dec!(20000))?;
    let price = Price::new_unchecked(dec!(25000));

    println!("  alice holds 1 BTC and 20,000 USD, BTC at 25,000 USD\n");

    let sell = Trade::sell(store.next_trade_id(), alice.clone(), btc(), usd(), dec!(1), price);
    report("sell 1 BTC", &engine.evaluate(&sell)?);

    let buy = Trade::buy(store.next_trade_id(), alice.clone(), btc(), usd(), dec!(1), price);
    report("buy 1 BTC", &engine.evaluate(&buy)?);

    let small_buy = Trade::buy(store.next_trade_id(), alice, btc(), usd(), dec!(0.8), price);
    report("buy 0.8 BTC", &engine.evaluate(&small_buy)?);
    Ok(())
}

/// Opened trades hold funds until settled; each check only sees committed state.
fn scenario_2_opened_reservation(config: &ReservationConfig) -> Result<(), SimError> {
    let (engine, store) = engine_with_store(config)?;
    let bob = Client::new("bob");
    store.create_wallet(&bob, &usd(), dec!(50))?;
    let one = Price::new_unchecked(Decimal::ONE);

    let opened = Trade::sell(store.next_trade_id(), bob.clone(), usd(), btc(), dec!(20), one)
        .with_status(TradeStatus::Opened);
    store.save_trade(opened);
    println!("  bob holds 50 USD, an opened trade reserves 20\n");

    let proposed = Trade::sell(store.next_trade_id(), bob.clone(), usd(), btc(), dec!(25), one);
    report("propose 25", &engine.evaluate(&proposed)?);

    let another = Trade::sell(store.next_trade_id(), bob, usd(), btc(), dec!(15), one);
    report("propose 15 on the same snapshot", &engine.evaluate(&another)?);
    println!("  both pass: only serialized admission keeps them from overspending together");
    Ok(())
}

/// Siblings waiting on the same parent are alternatives, not concurrent spend.
fn scenario_3_dependency_exclusivity(config: &ReservationConfig) -> Result<(), SimError> {
    let (engine, store) = engine_with_store(config)?;
    let carol = Client::new("carol");
    store.create_wallet(&carol, &usd(), dec!(100))?;
    let one = Price::new_unchecked(Decimal::ONE);
    let parent = store.next_trade_id();

    let a = Trade::sell(store.next_trade_id(), carol.clone(), usd(), btc(), dec!(80), one)
        .depending_on(parent);
    let b = Trade::sell(store.next_trade_id(), carol.clone(), usd(), btc(), dec!(80), one)
        .depending_on(parent);
    store.save_trade(b);
    println!("  carol holds 100 USD, B reserves 80 waiting on trade {:?}\n", parent);

    let mut independent = a.clone();
    independent.depends_on = None;
    independent.status = TradeStatus::Unknown;
    report("A without dependency", &engine.evaluate(&independent)?);
    report("A depending on the same parent", &engine.evaluate(&a)?);
    Ok(())
}

/// Absence of a wallet is cached like its presence.
fn scenario_4_negative_caching(config: &ReservationConfig) -> Result<(), SimError> {
    let (engine, store) = engine_with_store(config)?;
    let dave = Client::new("dave");
    let trade = Trade::sell(
        store.next_trade_id(),
        dave,
        TradingCurrency::new("XMR"),
        usd(),
        dec!(3),
        Price::new_unchecked(dec!(150)),
    );

    for attempt in 1..=3 {
        report(&format!("attempt {}", attempt), &engine.evaluate(&trade)?);
    }
    println!("  wallet queries issued: {}", store.wallet_queries());
    if let Some(stats) = engine.cache_stats() {
        println!("  cache hits {}, misses {}", stats.hits, stats.misses);
    }
    Ok(())
}

/// Eight workers race for a wallet that covers five of them.
fn scenario_5_serialized_admission(config: &ReservationConfig) -> Result<(), SimError> {
    let (engine, store) = engine_with_store(config)?;
    let erin = Client::new("erin");
    store.create_wallet(&erin, &usd(), dec!(50))?;
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let store = Arc::clone(&store);
            let erin = erin.clone();
            thread::spawn(move || -> Result<bool, EngineError> {
                let mut trade = Trade::sell(
                    store.next_trade_id(),
                    erin,
                    usd(),
                    btc(),
                    dec!(10),
                    Price::new_unchecked(Decimal::ONE),
                );
                let decision = engine.admit(&mut trade, |t| {
                    store.save_trade(t.clone());
                    Ok(())
                })?;
                Ok(decision.is_accepted())
            })
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        match handle.join() {
            Ok(result) => {
                if result? {
                    admitted += 1;
                }
            }
            Err(_) => eprintln!("  worker panicked"),
        }
    }
    println!("  admitted {} of 8 trades of 10 USD against 50 USD", admitted);
    Ok(())
}
