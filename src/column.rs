//! Catalog column metadata.
use crate::row::{DecodeError, Row};

/// Metadata of one table column, produced by
/// [`Connection::columns`][crate::Connection::columns].
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    /// The column name.
    pub name: String,
    /// The declared sql type, raw catalog text, e.g. `varchar(255)`.
    pub sql_type: String,
    /// The decoded default literal, [`None`] when the column has no
    /// default.
    pub default: Option<String>,
    /// Whether the column accepts NULL.
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Map one row of `SELECT * FROM columns` into a descriptor.
    pub(crate) fn from_catalog_row(row: &Row) -> Result<Self, DecodeError> {
        let sql_type: String = row.try_get("data_type")?;
        let raw_default: Option<String> = row.try_get("column_default")?;
        let default = raw_default.and_then(|raw| extract_default(&raw, is_string_type(&sql_type)));

        Ok(Self {
            name: row.try_get("column_name")?,
            nullable: row.try_get("is_nullable")?,
            sql_type,
            default,
        })
    }
}

/// Whether values of `sql_type` are character data, whose defaults the
/// server reports wrapped in single quotes.
pub(crate) fn is_string_type(sql_type: &str) -> bool {
    let base = sql_type
        .split('(')
        .next()
        .unwrap_or(sql_type)
        .trim()
        .to_ascii_lowercase();
    matches!(base.as_str(), "varchar" | "char" | "long varchar")
}

/// Decode a raw catalog default literal.
///
/// An empty string or the literal `NULL` means no default. String typed
/// defaults arrive wrapped in a single pair of quote characters, which are
/// stripped.
pub(crate) fn extract_default(raw: &str, string_type: bool) -> Option<String> {
    if raw.is_empty() || raw == "NULL" {
        return None;
    }
    if string_type && raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        let inner = &raw[1..raw.len() - 1];
        if inner.is_empty() {
            // "''" is an empty quoted string, treated as no default
            return None;
        }
        return Some(inner.to_owned());
    }
    Some(raw.to_owned())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_default() {
        assert_eq!(extract_default("", false), None);
        assert_eq!(extract_default("NULL", false), None);
        assert_eq!(extract_default("NULL", true), None);
        assert_eq!(extract_default("''", true), None);
    }

    #[test]
    fn string_defaults_unwrapped() {
        assert_eq!(extract_default("'abc'", true), Some("abc".into()));
        assert_eq!(extract_default("'it''s'", true), Some("it''s".into()));
    }

    #[test]
    fn non_string_defaults_kept_raw() {
        assert_eq!(extract_default("0", false), Some("0".into()));
        assert_eq!(extract_default("now()", false), Some("now()".into()));
    }

    #[test]
    fn string_types() {
        assert!(is_string_type("varchar"));
        assert!(is_string_type("varchar(255)"));
        assert!(is_string_type("long varchar(5000)"));
        assert!(!is_string_type("int"));
        assert!(!is_string_type("timestamp"));
    }
}
