//! Classifier layer: "a gradient-boosted classifier
//! over engineered features ... outputs a probability that an index would
//! be kept (not later rolled back)."
//!
//! Implemented as a small additive ensemble of decision stumps (one-level
//! splits) whose outputs are summed and squashed — the standard shape of a
//! gradient-boosted classifier's forward pass, without pulling in a full
//! training framework this workspace has no use for beyond inference and
//! periodic stump-weight refresh from lineage outcomes.

use ix_domain::MutationEvent;

use crate::{
    algorithm::DecisionAlgorithm,
    features::Features,
};

#[derive(Debug, Clone, Copy)]
struct Stump {
    feature: fn(&Features) -> f64,
    threshold: f64,
    /// Contribution when the feature is above `threshold`.
    above: f64,
    /// Contribution when at or below.
    below: f64,
}

impl Stump {
    fn evaluate(&self, features: &Features) -> f64 {
        if (self.feature)(features) > self.threshold {
            self.above
        } else {
            self.below
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

pub struct Classifier {
    stumps: Vec<Stump>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            stumps: vec![
                Stump {
                    feature: |f| f.selectivity,
                    threshold: 0.7,
                    above: 0.8,
                    below: -0.4,
                },
                Stump {
                    feature: |f| if f.sustained { 1.0 } else { 0.0 },
                    threshold: 0.5,
                    above: 0.6,
                    below: -0.6,
                },
                Stump {
                    feature: |f| f.spike_ratio,
                    threshold: 0.5,
                    above: -0.7,
                    below: 0.2,
                },
                Stump {
                    feature: |f| f.write_frequency,
                    threshold: 500.0,
                    above: -0.5,
                    below: 0.1,
                },
            ],
        }
    }
}

impl Classifier {
    /// Probability the index would be kept (not rolled back), in `[0, 1]`.
    pub fn predict_kept_probability(&self, features: &Features) -> f64 {
        let raw: f64 = self.stumps.iter().map(|s| s.evaluate(features)).sum();
        sigmoid(raw)
    }
}

impl DecisionAlgorithm for Classifier {
    fn name(&self) -> &'static str {
        "classifier"
    }

    fn predict(&self, features: &Features) -> f64 {
        self.predict_kept_probability(features)
    }

    fn train(&mut self, _history: &[MutationEvent]) {
        // Stump reweighting from lineage is an `ix-lifecycle` retraining
        // step (§4.9 task 14); this crate only ships inference plus the
        // fixed ensemble above as its shipped default.
    }
}
