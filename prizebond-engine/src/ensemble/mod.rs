pub mod candidates;
pub mod predictor;
pub mod votes;

pub use candidates::{rank_candidates, Candidate};
pub use predictor::{DigitwisePredictor, PositionPrediction, PrizePrediction};
pub use votes::DigitVoteDistribution;
