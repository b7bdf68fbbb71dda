//! Wrapping a plan into an INSERT or CREATE TABLE AS statement.

use std::fmt;

use crate::error::{Error, Result};
use crate::expressions::{CreateTableAs, Expression, Insert, TableRef};
use crate::schema::Schema;

use super::column::Column;
use super::dataframe::DataFrame;
use super::operations::Operation;

/// What `save_as_table` does when the table may already exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// `INSERT INTO`
    Append,
    /// `CREATE OR REPLACE TABLE`
    Overwrite,
    /// `CREATE TABLE`
    #[default]
    ErrorIfExists,
    /// `CREATE TABLE IF NOT EXISTS`
    Ignore,
}

impl SaveMode {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "append" => Ok(SaveMode::Append),
            "overwrite" => Ok(SaveMode::Overwrite),
            "error" | "errorifexists" => Ok(SaveMode::ErrorIfExists),
            "ignore" => Ok(SaveMode::Ignore),
            other => Err(Error::policy(format!("unknown save mode '{}'", other))),
        }
    }
}

impl fmt::Display for SaveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SaveMode::Append => "append",
            SaveMode::Overwrite => "overwrite",
            SaveMode::ErrorIfExists => "errorifexists",
            SaveMode::Ignore => "ignore",
        };
        f.write_str(name)
    }
}

/// Builder for write statements, reached through [`DataFrame::write`].
///
/// The result is a plan whose root is the statement. It can be rendered with
/// `sql()` but accepts no further operations.
#[derive(Debug, Clone)]
pub struct DataFrameWriter<'s> {
    df: DataFrame<'s>,
    mode: SaveMode,
    by_name: bool,
}

impl<'s> DataFrameWriter<'s> {
    pub(crate) fn new(df: DataFrame<'s>) -> Self {
        Self {
            df,
            mode: SaveMode::default(),
            by_name: false,
        }
    }

    /// Set the save mode by name: `append`, `overwrite`, `error`,
    /// `errorifexists` or `ignore`.
    pub fn mode(mut self, mode: &str) -> Result<Self> {
        self.mode = SaveMode::from_name(mode)?;
        Ok(self)
    }

    pub fn save_mode(mut self, mode: SaveMode) -> Self {
        self.mode = mode;
        self
    }

    /// Match the plan's columns to the target table's columns by name
    /// instead of by position. Only applies to `insert_into`.
    pub fn by_name(mut self) -> Self {
        self.by_name = true;
        self
    }

    /// `INSERT [OVERWRITE TABLE | INTO] table <plan>`
    pub fn insert_into(&self, table: &str, overwrite: bool) -> Result<DataFrame<'s>> {
        let df = if self.by_name {
            self.reordered_for(table)?
        } else {
            self.df.clone()
        };
        wrap(df, |query| {
            Expression::Insert(Box::new(Insert {
                table: TableRef::new(table),
                overwrite,
                query,
            }))
        })
    }

    /// `CREATE TABLE ... AS <plan>`, or an insert in append mode.
    pub fn save_as_table(&self, name: &str) -> Result<DataFrame<'s>> {
        let (replace, if_not_exists) = match self.mode {
            SaveMode::Append => return self.insert_into(name, false),
            SaveMode::Overwrite => (true, false),
            SaveMode::ErrorIfExists => (false, false),
            SaveMode::Ignore => (false, true),
        };
        wrap(self.df.clone(), |query| {
            Expression::Create(Box::new(CreateTableAs {
                table: TableRef::new(name),
                replace,
                if_not_exists,
                query,
            }))
        })
    }

    /// Re-project the plan in the target table's column order.
    fn reordered_for(&self, table: &str) -> Result<DataFrame<'s>> {
        let columns = self
            .df
            .session
            .catalog()
            .column_names(table)
            .map_err(|_| Error::validation(format!("table {} is not registered", table)))?;
        let outputs = self.df.columns();
        for column in &columns {
            if !outputs.iter().any(|o| o == column) {
                return Err(Error::validation(format!(
                    "column {} of table {} is not produced by the plan",
                    column, table
                )));
            }
        }
        self.df.select(columns.iter().map(|c| Column(Expression::column(c.as_str()))))
    }
}

fn wrap<'s, F>(df: DataFrame<'s>, build: F) -> Result<DataFrame<'s>>
where
    F: FnOnce(Expression) -> Expression,
{
    let mut df = df.resolve_pending_hints()?;
    if !df.expression.is_query() {
        return Err(Error::structural(
            "only SELECT and set-operation plans can be written",
        ));
    }
    let query = df.take_expression();
    df.expression = build(query);
    df.last_op = Operation::Init;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use crate::dataframe::session::{Session, SessionConfig};

    fn session() -> Session {
        let session = Session::with_config(SessionConfig {
            pretty: false,
            identify: false,
            optimize: false,
            ..Default::default()
        });
        session
            .register_table("src", &[("a", "INT"), ("b", "INT")])
            .unwrap();
        session
            .register_table("dst", &[("b", "INT"), ("a", "INT")])
            .unwrap();
        session
    }

    #[test]
    fn test_default_mode_creates() {
        let session = session();
        let df = session.table("src").unwrap();
        let sql = df.write().save_as_table("out").unwrap().sql().unwrap();
        assert_eq!(sql, "CREATE TABLE out AS SELECT a, b FROM src");
    }

    #[test]
    fn test_modes() {
        let session = session();
        let df = session.table("src").unwrap();
        let overwrite = df.write().mode("overwrite").unwrap().save_as_table("out").unwrap();
        assert!(overwrite.sql().unwrap().starts_with("CREATE OR REPLACE TABLE out AS"));
        let ignore = df.write().mode("ignore").unwrap().save_as_table("out").unwrap();
        assert!(ignore.sql().unwrap().starts_with("CREATE TABLE IF NOT EXISTS out AS"));
        let append = df.write().mode("append").unwrap().save_as_table("out").unwrap();
        assert!(append.sql().unwrap().starts_with("INSERT INTO out"));
        assert!(df.write().mode("sometimes").unwrap_err().is_policy());
    }

    #[test]
    fn test_insert_by_name_reorders() {
        let session = session();
        let df = session.table("src").unwrap();
        let insert = df.write().by_name().insert_into("dst", true).unwrap();
        let sql = insert.sql().unwrap();
        assert!(sql.starts_with("INSERT OVERWRITE TABLE dst WITH"));
        assert!(sql.contains(") SELECT b, a FROM t"));
    }

    #[test]
    fn test_statement_plans_accept_no_further_operations() {
        let session = session();
        let df = session.table("src").unwrap();
        let insert = df.write().insert_into("dst", false).unwrap();
        assert!(insert.limit(1).unwrap_err().is_structural());
    }
}
