//! Sessions: the catalog, configuration and lineage state plans are built against.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::dialects::DialectType;
use crate::error::{Error, Result};
use crate::expressions::{DataType, Expression, Select};
use crate::schema::{MappingSchema, Schema};

use super::dataframe::DataFrame;
use super::lineage::{AliasRegistry, BRANCH_PREFIX, CTE_PREFIX, SEQUENCE_PREFIX};

/// Rendering defaults of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Dialect used by [`DataFrame::sql`]
    pub dialect: DialectType,
    /// Render one clause per line
    pub pretty: bool,
    /// Run the optimizer before rendering
    pub optimize: bool,
    /// Quote every identifier
    pub identify: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dialect: DialectType::Spark,
            pretty: true,
            optimize: true,
            identify: true,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// ```
    /// use polyglot_dataframe::SessionConfig;
    ///
    /// let config = SessionConfig::from_json(r#"{"dialect": "duckdb", "pretty": false}"#).unwrap();
    /// assert!(!config.pretty);
    /// assert!(config.optimize);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(e.to_string()))
    }
}

/// Owner of the table catalog and of the lineage state shared by its plans.
///
/// Plans borrow their session, so a session outlives every plan built from
/// it. The catalog and alias registry sit behind read/write locks; writers
/// are serialized and the registry only ever grows.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    catalog: RwLock<MappingSchema>,
    counter: AtomicU64,
    registry: RwLock<AliasRegistry>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            catalog: RwLock::new(MappingSchema::new()),
            counter: AtomicU64::new(0),
            registry: RwLock::new(AliasRegistry::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register (or replace) a table with `(column, type name)` pairs in
    /// definition order.
    pub fn register_table(&self, name: &str, columns: &[(&str, &str)]) -> Result<()> {
        let columns: Vec<(String, DataType)> = columns
            .iter()
            .map(|(column, ty)| (column.to_string(), DataType::from_name(ty)))
            .collect();
        self.catalog.write().add_table(name, &columns)?;
        tracing::debug!("registered table {} ({} columns)", name, columns.len());
        Ok(())
    }

    /// Start a plan scanning `name`: `SELECT <columns> FROM name`.
    pub fn table(&self, name: &str) -> Result<DataFrame<'_>> {
        let columns = self
            .catalog
            .read()
            .column_names(name)
            .map_err(|_| Error::validation(format!("table {} is not registered", name)))?;
        let select = columns
            .into_iter()
            .fold(Select::new(), |select, column| {
                select.column(Expression::column(column))
            })
            .from(Expression::table(name));
        Ok(DataFrame::new(
            self,
            Expression::Select(Box::new(select)),
            self.next_branch_id(),
            self.next_sequence_id(),
        ))
    }

    pub(crate) fn catalog(&self) -> RwLockReadGuard<'_, MappingSchema> {
        self.catalog.read()
    }

    fn next_token(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}{}", prefix, n)
    }

    pub(crate) fn next_branch_id(&self) -> String {
        self.next_token(BRANCH_PREFIX)
    }

    pub(crate) fn next_sequence_id(&self) -> String {
        self.next_token(SEQUENCE_PREFIX)
    }

    pub(crate) fn next_cte_name(&self) -> String {
        self.next_token(CTE_PREFIX)
    }

    pub(crate) fn register_alias(&self, alias: &str, sequence_id: &str) {
        self.registry.write().add(alias, sequence_id);
    }

    pub(crate) fn register_branch(&self, branch: &str, parent: &str) {
        self.registry.write().add_branch(branch, parent);
    }

    /// Sequence ids a hint target or qualifier may stand for: the ids
    /// registered under it when it is an alias, otherwise the name itself.
    pub(crate) fn alias_candidates(&self, name: &str) -> Vec<String> {
        match self.registry.read().lookup(name) {
            Some(ids) => ids.to_vec(),
            None => vec![name.to_string()],
        }
    }

    pub(crate) fn branch_descends_from(&self, branch: &str, ancestor: &str) -> bool {
        self.registry.read().descends_from(branch, ancestor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        let session = Session::new();
        let a = session.next_branch_id();
        let b = session.next_sequence_id();
        let c = session.next_cte_name();
        assert!(a.starts_with("_b"));
        assert!(b.starts_with("_s"));
        assert!(c.starts_with("_r"));
        assert_ne!(&a[2..], &b[2..]);
        assert_ne!(&b[2..], &c[2..]);
    }

    #[test]
    fn test_unknown_table_is_validation_error() {
        let session = Session::new();
        let err = session.table("nope").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_table_scan_projects_catalog_columns() {
        let session = Session::new();
        session
            .register_table("t", &[("a", "INT"), ("b", "STRING")])
            .unwrap();
        let df = session.table("T").unwrap();
        assert_eq!(df.columns(), vec!["a", "b"]);
        assert_eq!(df.expression().sql(), "SELECT a, b FROM T");
    }

    #[test]
    fn test_alias_candidates_fall_back_to_name() {
        let session = Session::new();
        session.register_alias("x", "_s9");
        assert_eq!(session.alias_candidates("x"), vec!["_s9"]);
        assert_eq!(session.alias_candidates("_s3"), vec!["_s3"]);
    }

    #[test]
    fn test_config_from_json() {
        let config = SessionConfig::from_json(r#"{"dialect": "postgresql", "identify": false}"#).unwrap();
        assert_eq!(config.dialect, DialectType::PostgreSQL);
        assert!(config.pretty);
        assert!(!config.identify);
        assert!(SessionConfig::from_json("{\"pretty\": 3}").is_err());
    }
}
