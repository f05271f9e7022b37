//! Pure reconstruction of an `IndexRecord`'s status and version from its
//! `MutationEvent` sequence. Takes
//! no connection and touches no I/O, so it is exercised directly here
//! without a fake gateway.

use ix_domain::{
    IndexStatus,
    MutationEvent,
    MutationKind,
};

/// The `IndexStatus` transition chain one `MutationEvent` of `kind`
/// represents, applied in order against whatever status replay is
/// currently at. Mirrors `ix_domain::index::IndexStatus::can_transition_to`:
/// a `Created` event folds the executor's `building -> active` pair into
/// one lineage entry, so replay must fast-forward through both
/// intermediate states to land on the same status and version the executor
/// itself produced.
fn transition_chain(kind: MutationKind) -> &'static [IndexStatus] {
    use IndexStatus::*;
    match kind {
        MutationKind::Created => &[Building, Active],
        MutationKind::Dropped => &[Dropped],
        MutationKind::RolledBack => &[RolledBack],
        MutationKind::Failed => &[Failed],
        // Promoted, Rejected, Skipped and Interrupted carry decision
        // context but do not themselves move an existing IndexRecord's
        // status; a canary promotion event, for instance, documents that
        // the fleet rollout happened, not a state the record wasn't
        // already in.
        MutationKind::Promoted | MutationKind::Rejected | MutationKind::Skipped | MutationKind::Interrupted => &[],
    }
}

/// Replays `events` (any order; re-sorted by `seq` here) and returns the
/// resulting `(status, version)`, or `None` if `events` is empty. `version`
/// starts at 1 to match `IndexRecord::proposed`'s initial version, and
/// increments once per applied transition exactly as
/// `IndexRecord::transition` does.
pub fn replay(events: &[MutationEvent]) -> Option<(IndexStatus, u32)> {
    if events.is_empty() {
        return None;
    }
    let mut ordered: Vec<&MutationEvent> = events.iter().collect();
    ordered.sort_by_key(|e| e.seq);

    let mut status = IndexStatus::Proposed;
    let mut version = 1u32;
    for event in ordered {
        for &next in transition_chain(event.kind) {
            if status.can_transition_to(next) {
                status = next;
                version += 1;
            }
        }
    }
    Some((status, version))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ix_domain::{
        Actor,
        DecisionRationale,
    };
    use uuid::Uuid;

    use super::*;

    fn event(seq: u64, kind: MutationKind) -> MutationEvent {
        MutationEvent {
            id: Uuid::new_v4(),
            index_ref: Uuid::new_v4(),
            ts: Utc::now(),
            seq,
            actor: Actor::Engine,
            kind,
            rationale: DecisionRationale::default(),
            before_summary: None,
            after_summary: None,
            improvement: None,
            explanation: String::new(),
        }
    }

    #[test]
    fn empty_history_replays_to_none() {
        assert!(replay(&[]).is_none());
    }

    #[test]
    fn single_creation_reaches_active_at_version_three() {
        let events = vec![event(1, MutationKind::Created)];
        assert_eq!(replay(&events), Some((IndexStatus::Active, 3)));
    }

    #[test]
    fn creation_then_rollback_matches_executor_transitions() {
        let events = vec![event(1, MutationKind::Created), event(2, MutationKind::RolledBack)];
        assert_eq!(replay(&events), Some((IndexStatus::RolledBack, 4)));
    }

    #[test]
    fn out_of_order_input_is_sorted_by_seq_before_replay() {
        let events = vec![event(2, MutationKind::RolledBack), event(1, MutationKind::Created)];
        assert_eq!(replay(&events), Some((IndexStatus::RolledBack, 4)));
    }

    #[test]
    fn failed_build_never_reaches_active() {
        let events = vec![event(1, MutationKind::Failed)];
        assert_eq!(replay(&events), Some((IndexStatus::Failed, 2)));
    }

    #[test]
    fn promotion_event_after_creation_does_not_change_status_or_version() {
        let events = vec![event(1, MutationKind::Created), event(2, MutationKind::Promoted)];
        assert_eq!(replay(&events), Some((IndexStatus::Active, 3)));
    }

    #[test]
    fn a_terminal_drop_after_active_is_not_followed_by_a_second_drop() {
        let events = vec![
            event(1, MutationKind::Created),
            event(2, MutationKind::Dropped),
            event(3, MutationKind::Dropped),
        ];
        // The second Dropped finds status already Dropped, for which
        // can_transition_to(Dropped) is false, so it is a no-op exactly as
        // IndexRecord::transition would refuse the illegal call.
        assert_eq!(replay(&events), Some((IndexStatus::Dropped, 4)));
    }
}
