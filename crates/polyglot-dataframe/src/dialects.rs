//! SQL dialect support
//!
//! A [`DialectType`] names a target engine. [`Dialect`] holds the handful of
//! generation settings that differ between engines: the identifier quote
//! character, whether planner hints are emitted, how string literals escape
//! quotes and how data types are spelled.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::expressions::DataType;

/// Supported target dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DialectType {
    Generic,
    #[default]
    Spark,
    Databricks,
    Hive,
    DuckDB,
    PostgreSQL,
    BigQuery,
    Snowflake,
    MySQL,
    Trino,
}

static DIALECT_NAMES: Lazy<HashMap<&'static str, DialectType>> = Lazy::new(|| {
    HashMap::from([
        ("", DialectType::Generic),
        ("generic", DialectType::Generic),
        ("spark", DialectType::Spark),
        ("spark2", DialectType::Spark),
        ("databricks", DialectType::Databricks),
        ("hive", DialectType::Hive),
        ("duckdb", DialectType::DuckDB),
        ("postgres", DialectType::PostgreSQL),
        ("postgresql", DialectType::PostgreSQL),
        ("bigquery", DialectType::BigQuery),
        ("snowflake", DialectType::Snowflake),
        ("mysql", DialectType::MySQL),
        ("trino", DialectType::Trino),
        ("presto", DialectType::Trino),
    ])
});

impl DialectType {
    /// Resolve a dialect by (case-insensitive) name.
    pub fn from_name(name: &str) -> Result<Self> {
        DIALECT_NAMES
            .get(name.trim().to_lowercase().as_str())
            .copied()
            .ok_or_else(|| Error::unknown_dialect(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            DialectType::Generic => "generic",
            DialectType::Spark => "spark",
            DialectType::Databricks => "databricks",
            DialectType::Hive => "hive",
            DialectType::DuckDB => "duckdb",
            DialectType::PostgreSQL => "postgresql",
            DialectType::BigQuery => "bigquery",
            DialectType::Snowflake => "snowflake",
            DialectType::MySQL => "mysql",
            DialectType::Trino => "trino",
        }
    }
}

impl FromStr for DialectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DialectType::from_name(s)
    }
}

impl TryFrom<String> for DialectType {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        DialectType::from_name(&name)
    }
}

impl From<DialectType> for String {
    fn from(dialect: DialectType) -> Self {
        dialect.name().to_string()
    }
}

impl fmt::Display for DialectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Generation settings of a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub dialect_type: DialectType,
    /// Character used to quote identifiers
    pub identifier_quote: char,
    /// Whether `/*+ ... */` planner hints are emitted
    pub supports_hints: bool,
    /// Whether string literals escape quotes with a backslash instead of doubling
    pub backslash_escapes: bool,
}

impl Dialect {
    pub fn get(dialect_type: DialectType) -> Self {
        let spark_family = matches!(
            dialect_type,
            DialectType::Spark | DialectType::Databricks | DialectType::Hive
        );
        let identifier_quote = match dialect_type {
            DialectType::Spark
            | DialectType::Databricks
            | DialectType::Hive
            | DialectType::BigQuery
            | DialectType::MySQL => '`',
            _ => '"',
        };
        Self {
            dialect_type,
            identifier_quote,
            supports_hints: spark_family || dialect_type == DialectType::Generic,
            backslash_escapes: spark_family || matches!(dialect_type, DialectType::BigQuery | DialectType::MySQL),
        }
    }

    pub fn get_by_name(name: &str) -> Result<Self> {
        Ok(Self::get(DialectType::from_name(name)?))
    }

    /// Spell a data type the way this dialect does.
    pub fn type_name(&self, data_type: &DataType) -> String {
        use DialectType::*;
        let d = self.dialect_type;
        match data_type {
            DataType::Boolean => match d {
                BigQuery => "BOOL".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            DataType::TinyInt => match d {
                BigQuery => "INT64".to_string(),
                PostgreSQL => "SMALLINT".to_string(),
                _ => "TINYINT".to_string(),
            },
            DataType::SmallInt => match d {
                BigQuery => "INT64".to_string(),
                _ => "SMALLINT".to_string(),
            },
            DataType::Int => match d {
                BigQuery => "INT64".to_string(),
                _ => "INT".to_string(),
            },
            DataType::BigInt => match d {
                BigQuery => "INT64".to_string(),
                _ => "BIGINT".to_string(),
            },
            DataType::Float => match d {
                BigQuery => "FLOAT64".to_string(),
                PostgreSQL | Trino => "REAL".to_string(),
                _ => "FLOAT".to_string(),
            },
            DataType::Double => match d {
                BigQuery => "FLOAT64".to_string(),
                PostgreSQL => "DOUBLE PRECISION".to_string(),
                _ => "DOUBLE".to_string(),
            },
            DataType::Decimal { precision, scale } => {
                let base = if d == BigQuery { "NUMERIC" } else { "DECIMAL" };
                match (precision, scale) {
                    (Some(p), Some(s)) => format!("{}({}, {})", base, p, s),
                    (Some(p), None) => format!("{}({})", base, p),
                    _ => base.to_string(),
                }
            }
            DataType::String => match d {
                Spark | Databricks | Hive | BigQuery => "STRING".to_string(),
                Trino | Snowflake => "VARCHAR".to_string(),
                _ => "TEXT".to_string(),
            },
            DataType::VarChar { length } => {
                let base = match d {
                    BigQuery => "STRING",
                    _ => "VARCHAR",
                };
                match length {
                    Some(n) => format!("{}({})", base, n),
                    None => base.to_string(),
                }
            }
            DataType::Date => "DATE".to_string(),
            DataType::Timestamp => "TIMESTAMP".to_string(),
            DataType::Binary => match d {
                BigQuery => "BYTES".to_string(),
                PostgreSQL => "BYTEA".to_string(),
                DuckDB => "BLOB".to_string(),
                Trino => "VARBINARY".to_string(),
                _ => "BINARY".to_string(),
            },
            DataType::Custom { name } => name.clone(),
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Self::get(DialectType::default())
    }
}
