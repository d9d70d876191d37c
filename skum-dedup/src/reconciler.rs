//! Writing canonical payloads back to the store
//!
//! Each group's canonical payload is written once per distinct literal key
//! in the group: the store matches keys exactly, while grouping is case and
//! padding insensitive. Every group is written, even when its members look
//! alike after coercion: a NULL cell and an empty one coerce the same but
//! differ in the store.
//!
//! Store failures are never defaulted. Under [`FailurePolicy::Abort`] the
//! first failure ends the run; under [`FailurePolicy::Continue`] later groups
//! are still written and all failures are returned together. Writes issued
//! before a failure are not rolled back.

use crate::models::{CanonicalGroup, NormalizedKey};
use crate::store::{DuplicateStore, StoreError};
use thiserror::Error;
use tracing::{debug, error, info};

/// What to do when a group's write fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop at the first failed group
    #[default]
    Abort,
    /// Keep writing later groups, report every failure at the end
    Continue,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub failure_policy: FailurePolicy,
    /// Plan writes without issuing them
    pub dry_run: bool,
}

/// One update issued (or planned) against a literal key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub key: String,
    pub payload: String,
    /// Rows the store reported as changed; 0 for a dry run
    pub rows_affected: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub writes: Vec<WriteOutcome>,
    pub groups_written: usize,
}

impl ReconcileSummary {
    pub fn rows_affected(&self) -> u64 {
        self.writes.iter().map(|w| w.rows_affected).sum()
    }
}

/// A group whose write failed
#[derive(Debug)]
pub struct GroupFailure {
    pub key: NormalizedKey,
    pub literal_key: String,
    pub error: StoreError,
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Reconciliation aborted at group '{key}': {source}")]
    Aborted {
        key: NormalizedKey,
        #[source]
        source: StoreError,
        completed: ReconcileSummary,
    },

    #[error("{count} group(s) failed to reconcile", count = .failures.len())]
    Partial {
        failures: Vec<GroupFailure>,
        completed: ReconcileSummary,
    },
}

impl ReconcileError {
    /// Writes that went through before (or around) the failures
    pub fn completed(&self) -> &ReconcileSummary {
        match self {
            ReconcileError::Aborted { completed, .. } => completed,
            ReconcileError::Partial { completed, .. } => completed,
        }
    }
}

/// Write every group's canonical payload, one group at a time
pub async fn reconcile<S>(
    store: &mut S,
    groups: &[CanonicalGroup],
    options: &ReconcileOptions,
) -> Result<ReconcileSummary, ReconcileError>
where
    S: DuplicateStore + ?Sized,
{
    let mut summary = ReconcileSummary::default();
    let mut failures = Vec::new();

    for group in groups {
        match write_group(store, group, options.dry_run, &mut summary.writes).await {
            Ok(()) => {
                summary.groups_written += 1;
                info!(
                    "{} {} -> '{}'",
                    if options.dry_run { "Would reconcile" } else { "Reconciled" },
                    group.literal_keys.join(", "),
                    group.canonical_payload()
                );
            }
            Err((literal_key, err)) => {
                error!("Failed to reconcile group '{}': {}", group.key, err);
                match options.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(ReconcileError::Aborted {
                            key: group.key.clone(),
                            source: err,
                            completed: summary,
                        });
                    }
                    FailurePolicy::Continue => failures.push(GroupFailure {
                        key: group.key.clone(),
                        literal_key,
                        error: err,
                    }),
                }
            }
        }
    }

    if failures.is_empty() {
        Ok(summary)
    } else {
        Err(ReconcileError::Partial {
            failures,
            completed: summary,
        })
    }
}

async fn write_group<S>(
    store: &mut S,
    group: &CanonicalGroup,
    dry_run: bool,
    writes: &mut Vec<WriteOutcome>,
) -> Result<(), (String, StoreError)>
where
    S: DuplicateStore + ?Sized,
{
    let payload = group.canonical_payload();

    for literal_key in &group.literal_keys {
        let rows_affected = if dry_run {
            0
        } else {
            store
                .update_payload_for_key(literal_key, payload)
                .await
                .map_err(|err| (literal_key.clone(), err))?
        };

        debug!("Key '{}': {} rows affected", literal_key, rows_affected);
        writes.push(WriteOutcome {
            key: literal_key.clone(),
            payload: payload.to_string(),
            rows_affected,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::group_records;
    use crate::models::Record;
    use crate::store::RawRow;
    use async_trait::async_trait;

    /// Records every write; keys listed in `failing` fail
    #[derive(Default)]
    struct RecordingStore {
        writes: Vec<(String, String)>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl DuplicateStore for RecordingStore {
        async fn query_duplicate_candidates(&mut self) -> Result<Vec<RawRow>, StoreError> {
            Ok(Vec::new())
        }

        async fn update_payload_for_key(
            &mut self,
            key: &str,
            payload: &str,
        ) -> Result<u64, StoreError> {
            if self.failing.iter().any(|k| k == key) {
                return Err(StoreError::Write {
                    key: key.to_string(),
                    source: sqlx::Error::PoolClosed,
                });
            }
            self.writes.push((key.to_string(), payload.to_string()));
            Ok(1)
        }
    }

    fn groups(pairs: &[(&str, &str)]) -> Vec<CanonicalGroup> {
        let records: Vec<Record> = pairs.iter().map(|(k, p)| Record::new(*k, *p)).collect();
        group_records(&records)
    }

    fn pairs(writes: &[(String, String)]) -> Vec<(&str, &str)> {
        writes.iter().map(|(k, p)| (k.as_str(), p.as_str())).collect()
    }

    #[tokio::test]
    async fn test_one_write_per_literal_key() {
        let mut store = RecordingStore::default();
        let groups = groups(&[("A ", "x1"), ("a", "x2"), ("B", "y1"), ("A", "x3"), ("B", "y2")]);

        let summary = reconcile(&mut store, &groups, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(
            pairs(&store.writes),
            vec![("A ", "x1"), ("a", "x1"), ("A", "x1"), ("B", "y1")]
        );
        assert_eq!(summary.groups_written, 2);
        assert_eq!(summary.rows_affected(), 4);
    }

    #[tokio::test]
    async fn test_groups_that_already_agree_are_still_written() {
        let mut store = RecordingStore::default();
        let groups = groups(&[("P1", "S"), ("p1", "S"), ("P2", "a"), ("P2", "b")]);

        let summary = reconcile(&mut store, &groups, &ReconcileOptions::default())
            .await
            .unwrap();

        assert_eq!(
            pairs(&store.writes),
            vec![("P1", "S"), ("p1", "S"), ("P2", "a")]
        );
        assert_eq!(summary.groups_written, 2);
    }

    #[tokio::test]
    async fn test_dry_run_issues_no_writes() {
        let mut store = RecordingStore::default();
        let groups = groups(&[("K", "1"), ("k", "2")]);
        let options = ReconcileOptions {
            dry_run: true,
            ..Default::default()
        };

        let summary = reconcile(&mut store, &groups, &options).await.unwrap();

        assert!(store.writes.is_empty());
        assert_eq!(summary.writes.len(), 2);
        assert_eq!(summary.rows_affected(), 0);
    }

    #[tokio::test]
    async fn test_abort_stops_at_first_failure() {
        let mut store = RecordingStore {
            failing: vec!["B".to_string()],
            ..Default::default()
        };
        let groups = groups(&[("A", "1"), ("a", "2"), ("B", "3"), ("b", "4"), ("C", "5"), ("c", "6")]);

        let err = reconcile(&mut store, &groups, &ReconcileOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(&err, ReconcileError::Aborted { key, .. } if key.as_str() == "B"));
        assert_eq!(err.completed().groups_written, 1);
        assert_eq!(pairs(&store.writes), vec![("A", "1"), ("a", "1")]);
    }

    #[tokio::test]
    async fn test_continue_writes_later_groups_and_reports_failures() {
        let mut store = RecordingStore {
            failing: vec!["B".to_string()],
            ..Default::default()
        };
        let groups = groups(&[("A", "1"), ("a", "2"), ("B", "3"), ("b", "4"), ("C", "5"), ("c", "6")]);
        let options = ReconcileOptions {
            failure_policy: FailurePolicy::Continue,
            ..Default::default()
        };

        let err = reconcile(&mut store, &groups, &options).await.unwrap_err();

        match &err {
            ReconcileError::Partial { failures, completed } => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].literal_key, "B");
                assert_eq!(completed.groups_written, 2);
            }
            other => panic!("expected partial failure, got {other:?}"),
        }
        assert_eq!(
            pairs(&store.writes),
            vec![("A", "1"), ("a", "1"), ("C", "5"), ("c", "5")]
        );
        assert_eq!(err.to_string(), "1 group(s) failed to reconcile");
    }
}
