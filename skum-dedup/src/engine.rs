//! Duplicate grouping
//!
//! Groups records by [`NormalizedKey`] and keeps the first record of each
//! group as canonical. Selection depends only on input order, so the same
//! input always yields the same groups.

use crate::models::{CanonicalGroup, NormalizedKey, Record};
use std::collections::HashMap;
use tracing::{debug, info};

/// Reduce records to one canonical group per normalized key
///
/// Groups come back in the order their key was first seen.
pub fn group_records(records: &[Record]) -> Vec<CanonicalGroup> {
    let mut index: HashMap<NormalizedKey, usize> = HashMap::new();
    let mut groups: Vec<CanonicalGroup> = Vec::new();

    for record in records {
        let key = record.normalized_key();
        match index.get(&key).copied() {
            Some(position) => groups[position].absorb(record),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(CanonicalGroup::new(key, record.clone()));
            }
        }
    }

    for group in &groups {
        debug!(
            "Group '{}': {} rows, literal keys {:?}, canonical payload '{}'",
            group.key,
            group.members,
            group.literal_keys,
            group.canonical_payload()
        );
    }
    info!(
        "Grouped {} records into {} canonical groups",
        records.len(),
        groups.len()
    );

    groups
}
