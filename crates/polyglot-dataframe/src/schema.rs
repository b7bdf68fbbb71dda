//! Schema management for DataFrame sessions
//!
//! This module provides functionality for:
//! - Representing the registered tables of a session (tables, columns, types)
//! - Looking up column names and types while a plan is built
//!
//! Table names are normalized to lowercase. Column order is preserved, since
//! it determines the projection produced by `Session::table`.

use crate::expressions::DataType;
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during schema operations
#[derive(Debug, Error, Clone)]
pub enum SchemaError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Column not found: {column} in table {table}")]
    ColumnNotFound { table: String, column: String },

    #[error("Invalid schema structure: {0}")]
    InvalidStructure(String),
}

/// Result type for schema operations
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Abstract trait for table catalogs
pub trait Schema {
    /// Add or update a table in the schema
    fn add_table(&mut self, table: &str, columns: &[(String, DataType)]) -> SchemaResult<()>;

    /// Get column names for a table, in definition order
    fn column_names(&self, table: &str) -> SchemaResult<Vec<String>>;

    /// Get the type of a column in a table
    fn get_column_type(&self, table: &str, column: &str) -> SchemaResult<DataType>;

    /// Check if a table exists
    fn has_table(&self, table: &str) -> bool;

    /// Check if a column exists in a table
    fn has_column(&self, table: &str, column: &str) -> bool {
        self.get_column_type(table, column).is_ok()
    }

    /// Check if the schema is empty
    fn is_empty(&self) -> bool;
}

/// A mapping-based schema: `{table: [(column, type), ...]}`
#[derive(Debug, Clone, Default)]
pub struct MappingSchema {
    tables: HashMap<String, Vec<(String, DataType)>>,
}

impl MappingSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schema from `(table, [(column, type name)])` pairs
    pub fn from_simple_map(tables: &[(&str, &[(&str, &str)])]) -> SchemaResult<Self> {
        let mut schema = Self::new();
        for (table, columns) in tables {
            let columns: Vec<(String, DataType)> = columns
                .iter()
                .map(|(name, ty)| (name.to_string(), DataType::from_name(ty)))
                .collect();
            schema.add_table(table, &columns)?;
        }
        Ok(schema)
    }

    /// Names of all registered tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, table: &str) -> SchemaResult<&Vec<(String, DataType)>> {
        self.tables
            .get(&normalize_name(table))
            .ok_or_else(|| SchemaError::TableNotFound(table.to_string()))
    }
}

impl Schema for MappingSchema {
    fn add_table(&mut self, table: &str, columns: &[(String, DataType)]) -> SchemaResult<()> {
        if table.trim().is_empty() {
            return Err(SchemaError::InvalidStructure(
                "table name must not be empty".to_string(),
            ));
        }
        for (i, (name, _)) in columns.iter().enumerate() {
            if columns[..i].iter().any(|(other, _)| other == name) {
                return Err(SchemaError::InvalidStructure(format!(
                    "duplicate column {} in table {}",
                    name, table
                )));
            }
        }
        self.tables.insert(normalize_name(table), columns.to_vec());
        Ok(())
    }

    fn column_names(&self, table: &str) -> SchemaResult<Vec<String>> {
        Ok(self.lookup(table)?.iter().map(|(n, _)| n.clone()).collect())
    }

    fn get_column_type(&self, table: &str, column: &str) -> SchemaResult<DataType> {
        self.lookup(table)?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty.clone())
            .ok_or_else(|| SchemaError::ColumnNotFound {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&normalize_name(table))
    }

    fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Normalize a table name for lookup
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
