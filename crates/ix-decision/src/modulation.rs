//! Workload modulation: "with
//! read/write ratio held at r, the required-benefit threshold computed by
//! the engine equals `base * f(r)` where f matches the published formula
//! (monotonic, 0.8x at r->1, 1.3x at r->0)."
//!
//! Read-heavy lowers the bar ~20% and raises confidence ~15%; write-heavy
//! raises the bar ~30% and reduces confidence ~10%; balanced is unchanged.

use ix_domain::WorkloadClass;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub threshold_multiplier: f64,
    pub confidence_multiplier: f64,
}

pub fn for_class(class: WorkloadClass) -> Modulation {
    match class {
        WorkloadClass::ReadHeavy => Modulation {
            threshold_multiplier: 0.8,
            confidence_multiplier: 1.15,
        },
        WorkloadClass::WriteHeavy => Modulation {
            threshold_multiplier: 1.3,
            confidence_multiplier: 0.9,
        },
        WorkloadClass::Balanced => Modulation {
            threshold_multiplier: 1.0,
            confidence_multiplier: 1.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrete_classification_matches_published_multipliers() {
        assert_eq!(for_class(WorkloadClass::ReadHeavy).threshold_multiplier, 0.8);
        assert_eq!(for_class(WorkloadClass::WriteHeavy).threshold_multiplier, 1.3);
        assert_eq!(for_class(WorkloadClass::Balanced).threshold_multiplier, 1.0);
    }
}
