//! Records, grouping keys and canonical groups

use std::fmt;

/// One duplicate-candidate row
///
/// Both fields come out of `coerce::to_safe_string`, so a NULL cell is an
/// empty string here, never a missing value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Business key exactly as stored (e.g. a PLU code)
    pub business_key: String,
    /// Value reconciled across duplicates (e.g. a SKU code)
    pub payload: String,
}

impl Record {
    pub fn new(business_key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            business_key: business_key.into(),
            payload: payload.into(),
        }
    }

    pub fn normalized_key(&self) -> NormalizedKey {
        NormalizedKey::new(&self.business_key)
    }
}

/// Grouping key: the business key trimmed and uppercased
///
/// Only used in memory. Writes always target the literal stored key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub fn new(business_key: &str) -> Self {
        Self(business_key.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// All records sharing one normalized key, reduced to a canonical record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalGroup {
    pub key: NormalizedKey,
    /// First record seen for the key
    pub canonical: Record,
    /// Distinct literal business keys in the group, first-seen order
    pub literal_keys: Vec<String>,
    /// Number of records that fell into the group
    pub members: usize,
}

impl CanonicalGroup {
    /// Start a group from its first record
    pub fn new(key: NormalizedKey, first: Record) -> Self {
        Self {
            key,
            literal_keys: vec![first.business_key.clone()],
            canonical: first,
            members: 1,
        }
    }

    /// Count a later record towards the group without changing the canonical choice
    pub fn absorb(&mut self, record: &Record) {
        self.members += 1;
        if !self.literal_keys.contains(&record.business_key) {
            self.literal_keys.push(record.business_key.clone());
        }
    }

    pub fn canonical_payload(&self) -> &str {
        &self.canonical.payload
    }
}
