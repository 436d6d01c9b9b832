// 8.0.2: result types and errors for engine operations.

use crate::reservation::Reservation;
use crate::store::StoreError;
use crate::types::{TradeId, TradingCurrency, WalletId};
use crate::wallet::WalletKey;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Figures behind one admission decision, all in the charged currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAssessment {
    pub wallet_id: WalletId,
    pub charged_currency: TradingCurrency,
    pub balance: Decimal,
    pub reservation: Reservation,
    pub required: Decimal,
}

impl BalanceAssessment {
    pub fn reserved(&self) -> Decimal {
        self.reservation.total()
    }

    pub fn available(&self) -> Decimal {
        self.balance - self.reserved()
    }

    // spending exactly down to zero is allowed
    pub fn covers(&self) -> bool {
        self.available() >= self.required
    }

    /// How much is missing, zero when covered.
    pub fn shortfall(&self) -> Decimal {
        (self.required - self.available()).max(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdmissionDecision {
    Accepted(BalanceAssessment),
    /// The client never held the charged currency.
    NoWallet(WalletKey),
    InsufficientFunds(BalanceAssessment),
}

impl AdmissionDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AdmissionDecision::Accepted(_))
    }

    pub fn assessment(&self) -> Option<&BalanceAssessment> {
        match self {
            AdmissionDecision::Accepted(a) | AdmissionDecision::InsufficientFunds(a) => Some(a),
            AdmissionDecision::NoWallet(_) => None,
        }
    }
}

/// Store and engine disagree about what exists. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    #[error("Broken wallet cache: wallet {id:?} for {key} does not resolve")]
    DanglingWallet { key: WalletKey, id: WalletId },

    #[error("Broken wallet cache: {key} cached as {cached:?} but stored as {actual:?}")]
    StaleWalletId {
        key: WalletKey,
        cached: WalletId,
        actual: WalletId,
    },

    #[error("No wallet {key} to bind trade {trade:?} to")]
    MissingWallet { trade: TradeId, key: WalletKey },

    #[error("Wrong query result: trade {trade:?} does not charge wallet {wallet:?}")]
    WrongQueryResult { trade: TradeId, wallet: WalletId },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Consistency violation: {0}")]
    Consistency(#[from] ConsistencyError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Broken invariant. The enclosing operation must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EngineError::Consistency(_))
    }

    /// Transient storage trouble. Retry policy is the caller's call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Storage(_))
    }
}
