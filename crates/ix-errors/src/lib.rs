//! Shared error taxonomy for the indexpilot workspace.
//!
//! Every fallible operation in this workspace returns `anyhow::Result<T>`.
//! [`IndexPilotError`] is the small, closed set of *meaningful* failure
//! classes that callers branch on; everything else
//! stays an opaque `anyhow::Error` and is simply logged. Attach a variant to
//! an `anyhow::Error` chain with `.context(IndexPilotError::Fatal { .. })`
//! and recover it later with `err.downcast_ref::<IndexPilotError>()`.

use std::fmt;

use thiserror::Error;

/// The closed taxonomy of errors that callers are expected to branch on.
/// Anything that doesn't fit one of these classes is just an `anyhow::Error`
/// with no special handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexPilotError {
    /// Connection reset, serialization failure, or other condition a retry
    /// may resolve. Callers retry with exponential backoff up to a small
    /// cap before surfacing this to the user.
    #[error("transient database error: {0}")]
    TransientDb(String),

    /// Permission denied, schema divergence, or another condition retrying
    /// cannot fix. Never retried.
    #[error("fatal database error: {0}")]
    FatalDb(String),

    /// A plan could not be obtained or parsed (parse failure, shape
    /// mismatch). The caller should fall back to row-count heuristics.
    #[error("plan unavailable: {0}")]
    PlanUnavailable(String),

    /// A safety gate rejected an operation. This is not a system error; it
    /// is recorded with its reason and the decision round continues.
    #[error("safety gate denied: {0}")]
    SafetyDenied(String),

    /// The constraint optimizer hard-vetoed a candidate.
    #[error("constraint violated: {0}")]
    ConstraintViolated(String),

    /// The circuit breaker for a scope is open; try later.
    #[error("circuit open for {scope}, retry after cooldown")]
    CircuitOpen { scope: String },

    /// The process is draining. Operations in flight are recorded as
    /// interrupted rather than failed.
    #[error("shutdown in progress")]
    ShutdownInProgress,

    /// Configuration failed to parse or contained an unknown key. Always
    /// fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The query interceptor (C10) rejected a query before it reached the
    /// database. Carries the reason so the caller can surface it verbatim.
    #[error("query blocked: {0}")]
    QueryBlocked(String),
}

impl IndexPilotError {
    /// Whether the caller should retry this error with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, IndexPilotError::TransientDb(_))
    }

    /// Whether this error represents a deliberate, non-exceptional skip
    /// (gate denial, constraint veto, breaker open) rather than a fault.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            IndexPilotError::SafetyDenied(_)
                | IndexPilotError::ConstraintViolated(_)
                | IndexPilotError::CircuitOpen { .. }
                | IndexPilotError::QueryBlocked(_)
        )
    }

    /// Stable process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            IndexPilotError::TransientDb(_) => 10,
            IndexPilotError::FatalDb(_) => 11,
            IndexPilotError::PlanUnavailable(_) => 12,
            IndexPilotError::SafetyDenied(_) => 13,
            IndexPilotError::ConstraintViolated(_) => 14,
            IndexPilotError::CircuitOpen { .. } => 15,
            IndexPilotError::ShutdownInProgress => 0,
            IndexPilotError::Config(_) => 78, // EX_CONFIG, sysexits.h
            IndexPilotError::QueryBlocked(_) => 16,
        }
    }
}

/// Downgrades "connection closed" style errors observed during a graceful
/// shutdown to `debug`, per §7's propagation policy, instead of letting them
/// bubble up as warnings once a drain has already begun.
pub fn log_during_shutdown(err: &anyhow::Error) {
    if err
        .downcast_ref::<IndexPilotError>()
        .is_some_and(|e| matches!(e, IndexPilotError::ShutdownInProgress))
    {
        tracing::debug!("suppressed during shutdown: {err:#}");
    } else {
        tracing::warn!("error during shutdown: {err:#}");
    }
}

/// Returned from `main()` so that top-level failures print their `Display`
/// (a readable one-line message) rather than an `anyhow::Error`'s verbose
/// `Debug` representation, which duplicates the cause chain.
pub struct MainError(anyhow::Error);

impl<T: Into<anyhow::Error>> From<T> for MainError {
    fn from(e: T) -> Self {
        let err: anyhow::Error = e.into();
        tracing::error!("fatal: {err:#}");
        Self(err)
    }
}

impl fmt::Debug for MainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl MainError {
    /// Process exit code implied by the wrapped error, falling back to 1
    /// for errors outside the [`IndexPilotError`] taxonomy.
    pub fn exit_code(&self) -> i32 {
        self.0
            .downcast_ref::<IndexPilotError>()
            .map(IndexPilotError::exit_code)
            .unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification_matches_taxonomy() {
        assert!(IndexPilotError::TransientDb("reset".into()).is_retryable());
        assert!(!IndexPilotError::FatalDb("denied".into()).is_retryable());
    }

    #[test]
    fn control_flow_errors_are_not_faults() {
        assert!(IndexPilotError::SafetyDenied("window".into()).is_control_flow());
        assert!(IndexPilotError::ConstraintViolated("cap".into()).is_control_flow());
        assert!(IndexPilotError::CircuitOpen {
            scope: "t1.contacts".into()
        }
        .is_control_flow());
        assert!(!IndexPilotError::TransientDb("x".into()).is_control_flow());
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(IndexPilotError::Config("bad key".into()).exit_code(), 78);
        assert_eq!(IndexPilotError::ShutdownInProgress.exit_code(), 0);
    }
}
