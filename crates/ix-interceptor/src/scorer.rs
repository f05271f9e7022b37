//! Optional ML scorer.
//! Same shape as `ix-decision::utility::UtilityPredictor`: linear regression
//! with a sigmoid squash, trained by online gradient descent against
//! observed outcomes rather than the heuristic label itself, so the model
//! can eventually diverge from — and correct — the heuristic.

use crate::risk::{
    self,
    RiskSignals,
};

const LEARNING_RATE: f64 = 0.01;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub struct RiskScorer {
    weights: [f64; 6],
    bias: f64,
}

impl Default for RiskScorer {
    fn default() -> Self {
        // Starting weights mirror `risk::heuristic_score`'s own emphasis
        // until observed outcomes (`QueryInterceptor::record_outcome`)
        // retrain them.
        Self {
            weights: [0.3, 0.2, 0.2, 0.25, 0.1, 0.1],
            bias: -0.4,
        }
    }
}

impl RiskScorer {
    pub fn score(&self, signals: &RiskSignals, cost_ceiling: f64) -> f64 {
        let x = risk::vectorize(signals, cost_ceiling);
        let z: f64 = self.weights.iter().zip(x.iter()).map(|(w, xi)| w * xi).sum::<f64>() + self.bias;
        sigmoid(z)
    }

    /// One epoch of online gradient descent against `history`, where each
    /// pair is a query's signals (at interception time) and whether its
    /// execution turned out to be slow (the feedback loop's label).
    pub fn train_one_epoch(&mut self, history: &[(RiskSignals, f64, bool)]) {
        for (signals, cost_ceiling, was_slow) in history {
            let predicted = self.score(signals, *cost_ceiling);
            let target = if *was_slow { 1.0 } else { 0.0 };
            let error = predicted - target;
            let x = risk::vectorize(signals, *cost_ceiling);
            for (w, xi) in self.weights.iter_mut().zip(x.iter()) {
                *w -= LEARNING_RATE * error * xi;
            }
            self.bias -= LEARNING_RATE * error;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn risky_signals() -> RiskSignals {
        RiskSignals {
            estimated_cost: 500_000.0,
            seq_scan_over_large_table: true,
            missing_where_on_large_table: true,
            likely_cartesian_join: true,
            unbounded_like: true,
            subquery_join_depth: 3,
            missing_limit: true,
        }
    }

    #[test]
    fn score_is_bounded() {
        let scorer = RiskScorer::default();
        let score = scorer.score(&risky_signals(), 100_000.0);
        assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn training_toward_slow_raises_the_risky_case_score() {
        let mut scorer = RiskScorer::default();
        let signals = risky_signals();
        let before = scorer.score(&signals, 100_000.0);
        for _ in 0..200 {
            scorer.train_one_epoch(&[(signals, 100_000.0, true)]);
        }
        let after = scorer.score(&signals, 100_000.0);
        assert!(after > before);
    }

    #[test]
    fn training_toward_fast_lowers_the_risky_case_score() {
        let mut scorer = RiskScorer::default();
        let signals = risky_signals();
        let before = scorer.score(&signals, 100_000.0);
        for _ in 0..200 {
            scorer.train_one_epoch(&[(signals, 100_000.0, false)]);
        }
        let after = scorer.score(&signals, 100_000.0);
        assert!(after < before);
    }
}
