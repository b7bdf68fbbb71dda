//! Rendering a plan: hint resolution, optimization, CTE naming and SQL text.
//!
//! Placeholder CTE names depend on the order in which plans were built in a
//! session, so before rendering every CTE is renamed after a CRC-32 of its
//! body. Bodies are hashed in definition order; a body that references an
//! earlier CTE is hashed after that CTE got its final name, which makes the
//! names a function of the query text alone.

use std::collections::HashSet;

use crate::ast_transforms::{get_table_names, rename_relation};
use crate::dialects::DialectType;
use crate::error::{Error, Result};
use crate::expressions::Expression;
use crate::generator::{Generator, GeneratorConfig};
use crate::helper::find_new_name;
use crate::optimizer::{optimize, OptimizerConfig};

use super::dataframe::DataFrame;

/// Prefix of finalized CTE names
pub const CTE_NAME_PREFIX: &str = "t";

impl<'s> DataFrame<'s> {
    /// Render with the session's dialect and optimize setting.
    pub fn sql(&self) -> Result<String> {
        let config = self.session.config();
        self.sql_for(config.dialect, config.optimize)
    }

    /// Render for the dialect named `dialect`.
    ///
    /// ```
    /// use polyglot_dataframe::{Session, SessionConfig};
    /// use polyglot_dataframe::dataframe::functions::{col, lit};
    ///
    /// let session = Session::with_config(SessionConfig {
    ///     pretty: false,
    ///     identify: false,
    ///     ..Default::default()
    /// });
    /// session.register_table("t", &[("a", "INT")]).unwrap();
    /// let df = session.table("t").unwrap().where_(col("a").gt(lit(1))).unwrap();
    /// let sql = df.sql_with("duckdb", true).unwrap();
    /// assert!(sql.starts_with("WITH t"));
    /// assert!(sql.ends_with(".a > 1"));
    /// assert!(df.sql_with("cobol", true).is_err());
    /// ```
    pub fn sql_with(&self, dialect: &str, optimize: bool) -> Result<String> {
        self.sql_for(DialectType::from_name(dialect)?, optimize)
    }

    pub fn sql_for(&self, dialect: DialectType, optimize: bool) -> Result<String> {
        let expression = self.finalized_expression(optimize)?;
        let config = self.session.config();
        let generator = Generator::with_config(GeneratorConfig {
            dialect,
            pretty: config.pretty,
            identify: config.identify,
        });
        generator.generate(&expression)
    }

    /// The AST that `sql()` renders. The plan itself is left untouched.
    pub fn finalized_expression(&self, optimize_plan: bool) -> Result<Expression> {
        let mut df = self.resolve_pending_hints()?;
        for hint in df.pending_hints.drain(..) {
            tracing::debug!("dropping unresolved hint {} at render time", hint.name());
        }
        let mut expression = df.take_expression();
        if expression.query().is_none() {
            return Err(Error::structural(
                "only queries and INSERT / CREATE TABLE statements can be rendered",
            ));
        }
        if optimize_plan {
            let catalog = self.session.catalog();
            let config = OptimizerConfig {
                schema: Some(&*catalog),
            };
            expression = optimize(expression, &config)?;
        }
        hash_cte_names(expression, crc32fast::hash)
    }
}

/// Rename every CTE of `expression` to `t` + the hex `hasher` value of its
/// canonical body text.
///
/// A name that is already taken, by an earlier CTE or by a table the query
/// reads, gets a numeric suffix. Identical bodies therefore keep distinct
/// names inside one query.
pub(crate) fn hash_cte_names<H>(mut expression: Expression, hasher: H) -> Result<Expression>
where
    H: Fn(&[u8]) -> u32,
{
    let canonical = Generator::with_config(GeneratorConfig {
        dialect: DialectType::Spark,
        pretty: false,
        identify: false,
    });
    let placeholders: Vec<String> = expression.ctes().iter().map(|c| c.name().to_string()).collect();
    let mut taken: HashSet<String> = get_table_names(&expression)
        .into_iter()
        .filter(|t| !placeholders.contains(t))
        .collect();

    for (i, old) in placeholders.iter().enumerate() {
        let text = canonical.generate(&expression.ctes()[i].this)?;
        let hashed = format!("{}{:08x}", CTE_NAME_PREFIX, hasher(text.as_bytes()));
        let new = if taken.contains(&hashed) {
            let suffixed = find_new_name(&taken, &hashed);
            tracing::debug!("CTE name {} is taken; using {} for {}", hashed, suffixed, old);
            suffixed
        } else {
            hashed
        };
        tracing::trace!("renaming CTE {} to {}", old, new);
        taken.insert(new.clone());
        expression = rename_relation(expression, old, &new);
    }
    Ok(expression)
}
