// 3.0 trade.rs: a single proposed or live exchange operation and the funds it holds back.
// 3.1 negative amount = selling currency_from, positive = buying with currency_to.
// 3.2 only Unknown, DependsOn and Opened reserve funds. everything else is settled or dead.

use crate::types::{Client, Price, Timestamp, TradeId, TradingCurrency};
use crate::wallet::{Wallet, WalletRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Proposed, not yet admitted.
    Unknown,
    /// Proposed, blocked until the trade in `depends_on` completes.
    DependsOn,
    /// Live at an exchange.
    Opened,
    Closed,
    Cancelled,
    Error,
}

impl TradeStatus {
    pub fn is_speculative(&self) -> bool {
        matches!(self, TradeStatus::Unknown | TradeStatus::DependsOn)
    }

    pub fn reserves_funds(&self) -> bool {
        self.is_speculative() || *self == TradeStatus::Opened
    }

    pub fn is_terminal(&self) -> bool {
        !self.reserves_funds()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: TradeId,
    pub client: Client,
    pub currency_from: TradingCurrency,
    pub currency_to: TradingCurrency,
    pub amount: Decimal,
    pub price: Price,
    pub status: TradeStatus,
    pub depends_on: Option<TradeId>,
    pub wallet: Option<WalletRef>,
    pub created_at: Timestamp,
}

impl Trade {
    pub fn new(
        id: TradeId,
        client: Client,
        currency_from: TradingCurrency,
        currency_to: TradingCurrency,
        amount: Decimal,
        price: Price,
    ) -> Self {
        Self {
            id,
            client,
            currency_from,
            currency_to,
            amount,
            price,
            status: TradeStatus::Unknown,
            depends_on: None,
            wallet: None,
            created_at: Timestamp::from_millis(0),
        }
    }

    /// Sell `size` units of `from` for `to`.
    pub fn sell(
        id: TradeId,
        client: Client,
        from: TradingCurrency,
        to: TradingCurrency,
        size: Decimal,
        price: Price,
    ) -> Self {
        Self::new(id, client, from, to, -size.abs(), price)
    }

    /// Buy `size` units of `from`, paying `size * price` of `to`.
    pub fn buy(
        id: TradeId,
        client: Client,
        from: TradingCurrency,
        to: TradingCurrency,
        size: Decimal,
        price: Price,
    ) -> Self {
        Self::new(id, client, from, to, size.abs(), price)
    }

    pub fn with_status(mut self, status: TradeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn depending_on(mut self, parent: TradeId) -> Self {
        self.depends_on = Some(parent);
        self.status = TradeStatus::DependsOn;
        self
    }

    pub fn created_at(mut self, timestamp: Timestamp) -> Self {
        self.created_at = timestamp;
        self
    }

    pub fn is_sell(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn has_dependency(&self) -> bool {
        self.depends_on.is_some()
    }

    // 3.3: the currency drawn down, by the sign of amount. zero amount counts as a buy.
    pub fn charged_currency(&self) -> &TradingCurrency {
        if self.is_sell() {
            &self.currency_from
        } else {
            &self.currency_to
        }
    }

    /// The currency this trade pays out into once settled.
    pub fn received_currency(&self) -> &TradingCurrency {
        if self.is_sell() {
            &self.currency_to
        } else {
            &self.currency_from
        }
    }

    /// Magnitude drawn from the charged currency's wallet.
    pub fn required_amount(&self) -> Decimal {
        if self.is_sell() {
            self.amount.abs()
        } else {
            self.amount.abs() * self.price.value()
        }
    }

    /// Magnitude credited to the received currency's wallet on settlement.
    pub fn received_amount(&self) -> Decimal {
        if self.is_sell() {
            self.amount.abs() * self.price.value()
        } else {
            self.amount.abs()
        }
    }

    /// What this trade holds back on `wallet`, or `None` if it does not charge it.
    pub fn amount_reserved_on_wallet(&self, wallet: &Wallet) -> Option<Decimal> {
        if !wallet.belongs_to(&self.client, self.charged_currency()) {
            return None;
        }
        Some(self.required_amount())
    }

    pub fn bind_wallet(&mut self, wallet: WalletRef) {
        self.wallet = Some(wallet);
    }
}
