//! Constraint optimizer: a multi-objective check
//! over per-tenant storage, per-table index count, predicted write-overhead,
//! and a minimum-improvement floor. A hard-constraint violation vetoes
//! regardless of the other layers; otherwise it contributes a score at the
//! configured weight (default ~0.3).
//!
//! Open question resolution: per-tenant storage caps count a
//! physical index once even when the table is shared across tenants (not
//! once per tenant that happens to reference it).

use ix_config::ConstraintCaps;

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintInput {
    pub tenant_storage_bytes_used: u64,
    pub estimated_new_index_bytes: u64,
    pub current_table_index_count: u32,
    pub predicted_write_overhead_pct: f64,
    pub predicted_improvement: f64,
    pub min_improvement_floor: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintOutcome {
    /// All constraints satisfied; carries a `[0, 1]` contribution score.
    Satisfied { score: f64 },
    /// A hard constraint failed; vetoes the candidate regardless of other
    /// layers' scores.
    Vetoed { reason: String },
}

pub fn evaluate(input: &ConstraintInput, caps: &ConstraintCaps) -> ConstraintOutcome {
    let projected_storage = input.tenant_storage_bytes_used + input.estimated_new_index_bytes;
    if projected_storage > caps.per_tenant_storage_bytes {
        return ConstraintOutcome::Vetoed {
            reason: format!(
                "projected tenant storage {projected_storage} exceeds cap {}",
                caps.per_tenant_storage_bytes
            ),
        };
    }
    if input.current_table_index_count >= caps.per_table_index_count {
        return ConstraintOutcome::Vetoed {
            reason: format!(
                "table already has {} indexes, cap is {}",
                input.current_table_index_count, caps.per_table_index_count
            ),
        };
    }
    if input.predicted_write_overhead_pct > caps.max_write_overhead_pct {
        return ConstraintOutcome::Vetoed {
            reason: format!(
                "predicted write overhead {:.1}% exceeds cap {:.1}%",
                input.predicted_write_overhead_pct, caps.max_write_overhead_pct
            ),
        };
    }
    if input.predicted_improvement < input.min_improvement_floor {
        return ConstraintOutcome::Vetoed {
            reason: format!(
                "predicted improvement {:.3} is below the minimum floor {:.3}",
                input.predicted_improvement, input.min_improvement_floor
            ),
        };
    }
    let storage_headroom = 1.0 - (projected_storage as f64 / caps.per_tenant_storage_bytes.max(1) as f64);
    let count_headroom = 1.0 - (input.current_table_index_count as f64 / caps.per_table_index_count.max(1) as f64);
    let score = ((storage_headroom + count_headroom) / 2.0).clamp(0.0, 1.0);
    ConstraintOutcome::Satisfied { score }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> ConstraintCaps {
        ConstraintCaps {
            per_tenant_storage_bytes: 1_000_000,
            per_table_index_count: 5,
            max_write_overhead_pct: 15.0,
        }
    }

    fn base_input() -> ConstraintInput {
        ConstraintInput {
            tenant_storage_bytes_used: 0,
            estimated_new_index_bytes: 1_000,
            current_table_index_count: 1,
            predicted_write_overhead_pct: 2.0,
            predicted_improvement: 0.5,
            min_improvement_floor: 0.1,
        }
    }

    #[test]
    fn storage_cap_vetoes() {
        let mut input = base_input();
        input.tenant_storage_bytes_used = 999_999;
        input.estimated_new_index_bytes = 10;
        assert!(matches!(evaluate(&input, &caps()), ConstraintOutcome::Vetoed { .. }));
    }

    #[test]
    fn index_count_cap_vetoes() {
        let mut input = base_input();
        input.current_table_index_count = 5;
        assert!(matches!(evaluate(&input, &caps()), ConstraintOutcome::Vetoed { .. }));
    }

    #[test]
    fn improvement_floor_vetoes() {
        let mut input = base_input();
        input.predicted_improvement = 0.05;
        assert!(matches!(evaluate(&input, &caps()), ConstraintOutcome::Vetoed { .. }));
    }

    #[test]
    fn satisfied_input_scores_in_bounds() {
        let outcome = evaluate(&base_input(), &caps());
        let ConstraintOutcome::Satisfied { score } = outcome else {
            panic!("expected satisfied");
        };
        assert!((0.0..=1.0).contains(&score));
    }
}
