//! skum-dedup library - duplicate business key reconciliation
//!
//! Finds rows sharing a business key, picks the first row seen per key as
//! canonical, and overwrites the payload column of every duplicate with the
//! canonical payload.
//!
//! Stages run strictly in sequence over one store connection:
//! [`loader`] → [`engine`] → [`reconciler`], orchestrated by [`pipeline`].

pub mod engine;
pub mod loader;
pub mod models;
pub mod pipeline;
pub mod reconciler;
pub mod store;

pub use models::{CanonicalGroup, NormalizedKey, Record};
pub use pipeline::{
    apply_plan, plan_groups, run_pipeline, DedupPlan, PipelineError, PipelineReport,
};
pub use reconciler::{FailurePolicy, ReconcileError, ReconcileOptions, ReconcileSummary};
pub use store::{DuplicateStore, RawRow, SqliteStore, StoreError, TableSpec};
