pub mod betting;
pub mod fairness_engine;
pub mod settlement;
pub mod types;

pub use betting::BetValidator;
pub use fairness_engine::FairnessEngine;
pub use settlement::{BetSettlement, SettledBet};
pub use types::*;
