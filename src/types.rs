// 1.0: all the primitives live here. nothing in the engine works without these types.
// IDs, clients, currencies, prices, timestamps. each is a newtype so the compiler catches type mixups.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WalletId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradeId(pub u64);

// 1.1: account holder. identity is the name, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Client {
    name: String,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// 1.2: currency or asset ticker. "usd" and "USD" are the same currency.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TradingCurrency(String);

impl TradingCurrency {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.trim().to_ascii_uppercase())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradingCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.3: price in currency_to per unit of currency_from. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.4: millisecond timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    // saturates at zero when `earlier` is actually later
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match chrono::DateTime::from_timestamp_millis(self.0) {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn currency_symbols_normalised() {
        assert_eq!(TradingCurrency::new("usd"), TradingCurrency::new("USD"));
        assert_eq!(TradingCurrency::new(" btc ").symbol(), "BTC");
        assert_ne!(TradingCurrency::new("BTC"), TradingCurrency::new("ETH"));
    }

    #[test]
    fn price_must_be_positive() {
        assert!(Price::new(dec!(0)).is_none());
        assert!(Price::new(dec!(-1.5)).is_none());
        assert_eq!(Price::new(dec!(0.25)).unwrap().value(), dec!(0.25));
    }

    #[test]
    fn timestamp_arithmetic() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = t0.plus_millis(2_500);
        assert_eq!(t1.millis_since(t0), 2_500);
        assert_eq!(t0.millis_since(t1), 0);
        assert_eq!(Timestamp::from_millis(0).to_string(), "1970-01-01T00:00:00.000Z");
    }

    #[test]
    fn client_identity_is_name() {
        assert_eq!(Client::new("binance"), Client::new(String::from("binance")));
        assert_eq!(Client::new("kraken").name(), "kraken");
    }
}
