//! SQLite-backed duplicate store
//!
//! Holds exactly one connection for the whole run. Table and column names
//! come from configuration and are quoted; values are always bound.

use super::{DuplicateStore, RawRow, StoreError};
use async_trait::async_trait;
use skum_common::config::TableConfig;
use skum_common::Scalar;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Target table and columns, validated and quoted for SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    table: String,
    key_column: String,
    payload_column: String,
}

impl TableSpec {
    pub fn new(table: &str, key_column: &str, payload_column: &str) -> Result<Self, StoreError> {
        if key_column == payload_column {
            return Err(StoreError::InvalidIdentifier(format!(
                "key and payload column are both '{}'",
                key_column
            )));
        }

        Ok(Self {
            table: quote_identifier(table)?,
            key_column: quote_identifier(key_column)?,
            payload_column: quote_identifier(payload_column)?,
        })
    }

    /// Quoted table name
    pub fn table(&self) -> &str {
        &self.table
    }

    fn candidate_query(&self) -> String {
        format!(
            r#"
            SELECT {key}, {payload}
            FROM {table}
            WHERE UPPER(TRIM({key})) IN (
                SELECT UPPER(TRIM({key}))
                FROM {table}
                GROUP BY UPPER(TRIM({key}))
                HAVING COUNT(*) > 1
            )
            "#,
            key = self.key_column,
            payload = self.payload_column,
            table = self.table,
        )
    }

    fn update_statement(&self) -> String {
        format!(
            "UPDATE {table} SET {payload} = ? WHERE {key} = ?",
            table = self.table,
            payload = self.payload_column,
            key = self.key_column,
        )
    }
}

impl TryFrom<&TableConfig> for TableSpec {
    type Error = StoreError;

    fn try_from(config: &TableConfig) -> Result<Self, Self::Error> {
        Self::new(&config.name, &config.key_column, &config.payload_column)
    }
}

/// Quote an identifier for SQLite, doubling embedded quotes
fn quote_identifier(name: &str) -> Result<String, StoreError> {
    if name.trim().is_empty() {
        return Err(StoreError::InvalidIdentifier("empty name".to_string()));
    }
    if name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(format!("{:?} contains NUL", name)));
    }
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Duplicate store over one SQLite connection
pub struct SqliteStore {
    conn: SqliteConnection,
    spec: TableSpec,
}

impl SqliteStore {
    /// Open an existing database file
    ///
    /// Never creates the file: a missing database is an error, not an empty
    /// store.
    pub async fn connect(db_path: &Path, spec: TableSpec) -> Result<Self, StoreError> {
        if !db_path.exists() {
            return Err(StoreError::MissingDatabase(db_path.to_path_buf()));
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(false)
            .busy_timeout(Duration::from_millis(5000));

        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|source| StoreError::Connect {
                path: db_path.to_path_buf(),
                source,
            })?;

        info!("Opened database: {}", db_path.display());
        Ok(Self::from_connection(conn, spec))
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: SqliteConnection, spec: TableSpec) -> Self {
        Self { conn, spec }
    }

    /// Total rows in the target table
    pub async fn count_rows(&mut self) -> Result<i64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.spec.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut self.conn).await?;
        Ok(count)
    }

    /// Close the connection, flushing any pending state
    pub async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await?;
        debug!("Database connection closed");
        Ok(())
    }
}

#[async_trait]
impl DuplicateStore for SqliteStore {
    async fn query_duplicate_candidates(&mut self) -> Result<Vec<RawRow>, StoreError> {
        let sql = self.spec.candidate_query();
        let rows = sqlx::query(&sql)
            .fetch_all(&mut self.conn)
            .await
            .map_err(StoreError::Query)?;

        rows.iter()
            .map(|row| {
                Ok(RawRow {
                    business_key: Scalar::from_sqlite_column(row, 0)?,
                    payload: Scalar::from_sqlite_column(row, 1)?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::Query)
    }

    async fn update_payload_for_key(
        &mut self,
        key: &str,
        payload: &str,
    ) -> Result<u64, StoreError> {
        let sql = self.spec.update_statement();
        let result = sqlx::query(&sql)
            .bind(payload)
            .bind(key)
            .execute(&mut self.conn)
            .await
            .map_err(|source| StoreError::Write {
                key: key.to_string(),
                source,
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_memory_store() -> SqliteStore {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            r#"
            CREATE TABLE "Sheet1$" (
                SkuCode TEXT,
                PluCode TEXT
            )
            "#,
        )
        .execute(&mut conn)
        .await
        .unwrap();

        let spec = TableSpec::new("Sheet1$", "PluCode", "SkuCode").unwrap();
        SqliteStore::from_connection(conn, spec)
    }

    async fn insert(store: &mut SqliteStore, plu: Option<&str>, sku: Option<&str>) {
        sqlx::query(r#"INSERT INTO "Sheet1$" (PluCode, SkuCode) VALUES (?, ?)"#)
            .bind(plu)
            .bind(sku)
            .execute(&mut store.conn)
            .await
            .unwrap();
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("Sheet1$").unwrap(), "\"Sheet1$\"");
        assert_eq!(quote_identifier("a\"b").unwrap(), "\"a\"\"b\"");
        assert!(matches!(
            quote_identifier("  "),
            Err(StoreError::InvalidIdentifier(_))
        ));
        assert!(quote_identifier("bad\0name").is_err());
    }

    #[test]
    fn test_table_spec_rejects_same_column_twice() {
        assert!(matches!(
            TableSpec::new("t", "code", "code"),
            Err(StoreError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_table_spec_from_config_defaults() {
        let spec = TableSpec::try_from(&TableConfig::default()).unwrap();
        assert_eq!(spec.table(), "\"Sheet1$\"");
    }

    #[tokio::test]
    async fn test_candidates_only_include_recurring_keys() {
        let mut store = open_memory_store().await;
        insert(&mut store, Some("P1"), Some("")).await;
        insert(&mut store, Some("p1"), Some("SKU2")).await;
        insert(&mut store, Some("P2"), Some("SKU9")).await;

        let rows = store.query_duplicate_candidates().await.unwrap();

        assert_eq!(
            rows,
            vec![RawRow::new("P1", ""), RawRow::new("p1", "SKU2")]
        );
    }

    #[tokio::test]
    async fn test_candidates_preserve_table_order_and_nulls() {
        let mut store = open_memory_store().await;
        insert(&mut store, Some("B "), None).await;
        insert(&mut store, Some("A"), Some("x")).await;
        insert(&mut store, Some("b"), Some("y")).await;
        insert(&mut store, None, Some("orphan")).await;
        insert(&mut store, None, Some("orphan2")).await;

        let rows = store.query_duplicate_candidates().await.unwrap();

        assert_eq!(
            rows,
            vec![
                RawRow::new("B ", Scalar::Null),
                RawRow::new("b", "y"),
            ]
        );
    }

    #[tokio::test]
    async fn test_update_matches_literal_key_only() {
        let mut store = open_memory_store().await;
        insert(&mut store, Some("P1"), Some("old")).await;
        insert(&mut store, Some("P1"), Some("older")).await;
        insert(&mut store, Some("p1"), Some("other")).await;

        let affected = store.update_payload_for_key("P1", "new").await.unwrap();
        assert_eq!(affected, 2);

        let untouched: String =
            sqlx::query_scalar(r#"SELECT SkuCode FROM "Sheet1$" WHERE PluCode = 'p1'"#)
                .fetch_one(&mut store.conn)
                .await
                .unwrap();
        assert_eq!(untouched, "other");

        assert_eq!(store.count_rows().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_update_on_missing_table_is_write_error() {
        let conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let spec = TableSpec::new("missing", "k", "p").unwrap();
        let mut store = SqliteStore::from_connection(conn, spec);

        let result = store.update_payload_for_key("k1", "v").await;
        assert!(matches!(result, Err(StoreError::Write { key, .. }) if key == "k1"));
    }

    #[tokio::test]
    async fn test_connect_rejects_missing_file() {
        let spec = TableSpec::new("t", "k", "p").unwrap();
        let result = SqliteStore::connect(Path::new("/nonexistent/skum.db"), spec).await;
        assert!(matches!(result, Err(StoreError::MissingDatabase(_))));
    }
}
