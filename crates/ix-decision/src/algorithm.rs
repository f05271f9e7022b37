//! The algorithm capability set. The
//! engine composes algorithms by this trait rather than matching on a
//! closed enum of algorithm kinds.

use ix_domain::MutationEvent;

use crate::features::Features;

pub trait DecisionAlgorithm: Send + Sync {
    /// Stable name, used as the `algorithm` field of `AlgorithmUsage`.
    fn name(&self) -> &'static str;

    /// A score in `[0, 1]` (or an unbounded heuristic value, for the
    /// heuristic layer specifically — callers that need a bounded
    /// probability use [`crate::classifier::Classifier`] or
    /// [`crate::utility::UtilityPredictor`] instead).
    fn predict(&self, features: &Features) -> f64;

    /// Optional retraining against lineage history. Algorithms with no
    /// learned state (the pure heuristic) accept this as a no-op.
    fn train(&mut self, _history: &[MutationEvent]) {}
}
