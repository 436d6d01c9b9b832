// 8.0: balance reservation engine. gates trade admission on unreserved wallet
// balance and binds accepted trades to the wallet they charge.
// stateless apart from the wallet id cache and the per-wallet admission gates.

mod admission;
mod binding;
mod config;
mod core;
mod gate;
mod results;

pub use config::EngineConfig;
pub use core::BalanceEngine;
pub use results::{AdmissionDecision, BalanceAssessment, ConsistencyError, EngineError};
