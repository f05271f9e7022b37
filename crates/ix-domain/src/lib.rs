//! Shared domain types for the indexpilot workspace.
//!
//! Every other crate depends on `ix-domain` for its vocabulary; `ix-domain`
//! depends on nothing in this workspace — small, dependency-light value
//! types that the rest of the workspace shares rather than redefines per
//! crate.

pub mod catalog;
pub mod fingerprint;
pub mod index;
pub mod lineage;
pub mod plan;
pub mod query_sample;
pub mod workload;

pub use catalog::{
    CanonicalField,
    CatalogSnapshot,
    PhysicalType,
    TenantActivation,
};
pub use fingerprint::Fingerprint;
pub use index::{
    IndexCandidate,
    IndexKind,
    IndexRecord,
    IndexStatus,
    Scope,
};
pub use lineage::{
    Actor,
    AlgorithmUsage,
    DecisionRationale,
    GateOutcome,
    MutationEvent,
    MutationKind,
};
pub use plan::{
    PlanNode,
    PlanSummary,
};
pub use query_sample::{
    aggregate,
    FieldUsageAggregate,
    QueryShape,
    QuerySample,
};
pub use workload::{
    TableSizeBucket,
    WorkloadClass,
};
