//! Reservation calculator.
//!
//! Sums what other trades already hold back on a wallet but has not yet been
//! settled into its persisted balance. Recomputed from the store on every call;
//! there is no running counter to drift.
//!
//! A trade with a dependency of its own only competes with `Unknown` trades:
//! its `DependsOn` siblings are alternatives waiting on the same precondition,
//! not spend that will all happen. A trade without a dependency counts both.

use crate::engine::{ConsistencyError, EngineError};
use crate::store::TradeStore;
use crate::trade::TradeStatus;
use crate::types::TradeId;
use crate::wallet::Wallet;
use log::trace;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const ALL_RESERVED: [TradeStatus; 2] = [TradeStatus::Unknown, TradeStatus::DependsOn];
pub const UNKNOWN_ONLY: [TradeStatus; 1] = [TradeStatus::Unknown];
pub const CONCRETE: [TradeStatus; 1] = [TradeStatus::Opened];

pub fn speculative_statuses(include_dependent: bool) -> &'static [TradeStatus] {
    if include_dependent {
        &ALL_RESERVED
    } else {
        &UNKNOWN_ONLY
    }
}

/// Funds held back on one wallet, split by certainty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Held by `Unknown` (and, when counted, `DependsOn`) trades.
    pub speculative: Decimal,
    /// Held by `Opened` trades.
    pub concrete: Decimal,
    pub trade_count: usize,
}

impl Reservation {
    pub fn total(&self) -> Decimal {
        (self.speculative + self.concrete).abs()
    }
}

pub struct ReservationCalculator<'a, T: TradeStore + ?Sized> {
    trades: &'a T,
}

impl<'a, T: TradeStore + ?Sized> ReservationCalculator<'a, T> {
    pub fn new(trades: &'a T) -> Self {
        Self { trades }
    }

    /// Total reserved on `wallet`. See [`Self::reservation`].
    pub fn reserved_on_wallet(
        &self,
        wallet: &Wallet,
        include_dependent: bool,
    ) -> Result<Decimal, EngineError> {
        Ok(self.reservation(wallet, include_dependent, None)?.total())
    }

    /// Breakdown of what is reserved on `wallet`.
    ///
    /// `exclude` skips one trade id, so a trade that is already stored is not
    /// counted against itself when it is evaluated.
    ///
    /// # Errors
    ///
    /// A returned trade that does not charge `wallet` is a
    /// [`ConsistencyError::WrongQueryResult`]. Store failures pass through.
    pub fn reservation(
        &self,
        wallet: &Wallet,
        include_dependent: bool,
        exclude: Option<TradeId>,
    ) -> Result<Reservation, EngineError> {
        let open = self.trades.find_open_trades_against_wallet(
            &wallet.client,
            &wallet.currency,
            speculative_statuses(include_dependent),
            &CONCRETE,
        )?;

        let mut reservation = Reservation::default();
        for trade in open.iter().filter(|t| Some(t.id) != exclude) {
            let amount = trade.amount_reserved_on_wallet(wallet).ok_or(
                ConsistencyError::WrongQueryResult {
                    trade: trade.id,
                    wallet: wallet.id,
                },
            )?;
            let amount = amount.abs();
            if trade.status.is_speculative() {
                reservation.speculative += amount;
            } else {
                reservation.concrete += amount;
            }
            reservation.trade_count += 1;
        }

        trace!(
            "wallet {} reserved: speculative {} concrete {} over {} trades",
            wallet.key(),
            reservation.speculative,
            reservation.concrete,
            reservation.trade_count
        );
        Ok(reservation)
    }
}
