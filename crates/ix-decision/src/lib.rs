//! Decision engine.

pub mod algorithm;
pub mod classifier;
pub mod constraint;
pub mod engine;
pub mod features;
pub mod heuristic;
pub mod modulation;
pub mod utility;

pub use algorithm::DecisionAlgorithm;
pub use classifier::Classifier;
pub use constraint::{
    ConstraintInput,
    ConstraintOutcome,
};
pub use engine::{
    Decision,
    DecisionEngine,
    EarlyExitSignals,
};
pub use features::Features;
pub use heuristic::Heuristic;
pub use utility::UtilityPredictor;
