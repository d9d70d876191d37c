//! Opaque store values
//!
//! A `Scalar` is whatever a store cell held before coercion. `Scalar::Null`
//! is the store's null-marker; an absent value is modelled by the caller as
//! `Option::None`. Coercion treats both the same.

use std::borrow::Cow;
use std::fmt;

/// A single untyped value read from a store row
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Store null-marker (SQL `NULL`)
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Blob(Vec<u8>),
}

impl Scalar {
    /// True for the store null-marker
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Textual form of the value, `None` for the null-marker
    ///
    /// Text is borrowed; every other variant is rendered through `Display`.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Scalar::Null => None,
            Scalar::Text(s) => Some(Cow::Borrowed(s.as_str())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Integer(v) => write!(f, "{}", v),
            Scalar::Real(v) => write!(f, "{}", v),
            Scalar::Boolean(v) => write!(f, "{}", v),
            Scalar::Text(s) => f.write_str(s),
            Scalar::Blob(bytes) => {
                for byte in bytes {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Real(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}

impl From<Vec<u8>> for Scalar {
    fn from(value: Vec<u8>) -> Self {
        Scalar::Blob(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

#[cfg(feature = "sqlx")]
mod sqlite {
    use super::Scalar;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Row, TypeInfo, ValueRef};

    impl Scalar {
        /// Read one column of a SQLite row without imposing a type
        ///
        /// SQLite is dynamically typed, so the storage class of the stored
        /// value (not the declared column type) selects the variant.
        pub fn from_sqlite_column(row: &SqliteRow, index: usize) -> Result<Self, sqlx::Error> {
            let storage_class = {
                let raw = row.try_get_raw(index)?;
                if raw.is_null() {
                    return Ok(Scalar::Null);
                }
                raw.type_info().name().to_string()
            };

            let value = match storage_class.as_str() {
                "INTEGER" => Scalar::Integer(row.try_get_unchecked(index)?),
                "REAL" => Scalar::Real(row.try_get_unchecked(index)?),
                "BLOB" => Scalar::Blob(row.try_get_unchecked(index)?),
                _ => Scalar::Text(row.try_get_unchecked(index)?),
            };

            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_renders_each_variant() {
        assert_eq!(Scalar::Null.to_string(), "");
        assert_eq!(Scalar::Integer(-7).to_string(), "-7");
        assert_eq!(Scalar::Real(2.5).to_string(), "2.5");
        assert_eq!(Scalar::Real(3.0).to_string(), "3");
        assert_eq!(Scalar::Boolean(true).to_string(), "true");
        assert_eq!(Scalar::from("SKU-1").to_string(), "SKU-1");
        assert_eq!(Scalar::Blob(vec![0x00, 0xab, 0xff]).to_string(), "00abff");
    }

    #[test]
    fn test_as_text_borrows_text() {
        let value = Scalar::from("PLU");
        assert!(matches!(value.as_text(), Some(Cow::Borrowed("PLU"))));
        assert_eq!(Scalar::Null.as_text(), None);
        assert_eq!(Scalar::Integer(12).as_text().as_deref(), Some("12"));
    }

    #[test]
    fn test_option_conversion_maps_none_to_null() {
        assert_eq!(Scalar::from(None::<&str>), Scalar::Null);
        assert!(Scalar::from(None::<i64>).is_null());
        assert_eq!(Scalar::from(Some(5i64)), Scalar::Integer(5));
    }

    #[cfg(feature = "sqlx")]
    #[tokio::test]
    async fn test_from_sqlite_column_uses_storage_class() {
        use sqlx::{Connection, SqliteConnection};

        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        let row = sqlx::query("SELECT NULL, 42, 1.5, 'abc', x'00ff'")
            .fetch_one(&mut conn)
            .await
            .unwrap();

        assert_eq!(Scalar::from_sqlite_column(&row, 0).unwrap(), Scalar::Null);
        assert_eq!(Scalar::from_sqlite_column(&row, 1).unwrap(), Scalar::Integer(42));
        assert_eq!(Scalar::from_sqlite_column(&row, 2).unwrap(), Scalar::Real(1.5));
        assert_eq!(Scalar::from_sqlite_column(&row, 3).unwrap(), Scalar::from("abc"));
        assert_eq!(
            Scalar::from_sqlite_column(&row, 4).unwrap(),
            Scalar::Blob(vec![0x00, 0xff])
        );

        conn.close().await.unwrap();
    }

    #[cfg(feature = "sqlx")]
    #[tokio::test]
    async fn test_from_sqlite_column_ignores_declared_type() {
        use sqlx::{Connection, SqliteConnection};

        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (code INTEGER)")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t (code) VALUES ('not-a-number')")
            .execute(&mut conn)
            .await
            .unwrap();

        let row = sqlx::query("SELECT code FROM t")
            .fetch_one(&mut conn)
            .await
            .unwrap();

        assert_eq!(
            Scalar::from_sqlite_column(&row, 0).unwrap(),
            Scalar::from("not-a-number")
        );
    }
}
