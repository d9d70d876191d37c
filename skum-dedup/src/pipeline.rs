//! Load → group → reconcile, each stage finishing before the next starts
//!
//! [`plan_groups`] covers loading and grouping, [`apply_plan`] the writes.
//! Callers that report counts before anything is written run them apart;
//! [`run_pipeline`] runs both.

use crate::engine::group_records;
use crate::loader::load_records;
use crate::models::CanonicalGroup;
use crate::reconciler::{reconcile, ReconcileError, ReconcileOptions, ReconcileSummary};
use crate::store::{DuplicateStore, StoreError};
use thiserror::Error;
use tracing::info;

/// Groups to reconcile, before any write
#[derive(Debug, Clone)]
pub struct DedupPlan {
    /// Duplicate candidate rows loaded
    pub before_count: usize,
    /// Distinct groups after normalization
    pub after_count: usize,
    pub groups: Vec<CanonicalGroup>,
}

/// Outcome of one full pass
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Duplicate candidate rows loaded
    pub before_count: usize,
    /// Distinct groups after normalization
    pub after_count: usize,
    pub groups: Vec<CanonicalGroup>,
    pub summary: ReconcileSummary,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Loading duplicate candidates failed: {0}")]
    Load(#[from] StoreError),

    /// Reconciliation failed after loading and grouping finished
    #[error("Reconciling {after_count} group(s) failed")]
    Reconcile {
        before_count: usize,
        after_count: usize,
        #[source]
        source: ReconcileError,
    },
}

/// Load the duplicate candidates and reduce them to canonical groups
pub async fn plan_groups<S>(store: &mut S) -> Result<DedupPlan, StoreError>
where
    S: DuplicateStore + ?Sized,
{
    let records = load_records(store).await?;
    let groups = group_records(&records);

    Ok(DedupPlan {
        before_count: records.len(),
        after_count: groups.len(),
        groups,
    })
}

/// Write every planned group's canonical payload
pub async fn apply_plan<S>(
    store: &mut S,
    plan: DedupPlan,
    options: &ReconcileOptions,
) -> Result<PipelineReport, PipelineError>
where
    S: DuplicateStore + ?Sized,
{
    let DedupPlan {
        before_count,
        after_count,
        groups,
    } = plan;

    let summary = reconcile(store, &groups, options)
        .await
        .map_err(|source| PipelineError::Reconcile {
            before_count,
            after_count,
            source,
        })?;
    info!(
        "Reconciliation finished: {} groups written, {} rows affected",
        summary.groups_written,
        summary.rows_affected()
    );

    Ok(PipelineReport {
        before_count,
        after_count,
        groups,
        summary,
    })
}

/// Run the whole dedup pass against `store`
///
/// Re-running is safe: selection is deterministic, so a second pass writes
/// the same canonical payloads again and leaves the table unchanged.
pub async fn run_pipeline<S>(
    store: &mut S,
    options: &ReconcileOptions,
) -> Result<PipelineReport, PipelineError>
where
    S: DuplicateStore + ?Sized,
{
    let plan = plan_groups(store).await?;
    apply_plan(store, plan, options).await
}
