//! Record loading
//!
//! Reads duplicate candidates from the store and sanitizes every field
//! through the coercion layer. Which rows count as candidates is decided by
//! the store query, not recomputed here.

use crate::models::Record;
use crate::store::{DuplicateStore, RawRow, StoreError};
use skum_common::coerce;
use tracing::info;

/// Materialize one raw row; NULL cells become empty strings
pub fn materialize(row: &RawRow) -> Record {
    Record {
        business_key: coerce::to_safe_string(Some(&row.business_key)),
        payload: coerce::to_safe_string(Some(&row.payload)),
    }
}

/// Load all duplicate candidates in store order
///
/// Zero rows is an empty vector, not an error.
pub async fn load_records<S>(store: &mut S) -> Result<Vec<Record>, StoreError>
where
    S: DuplicateStore + ?Sized,
{
    let rows = store.query_duplicate_candidates().await?;
    let records: Vec<Record> = rows.iter().map(materialize).collect();

    info!("Loaded {} duplicate candidate rows", records.len());
    Ok(records)
}
