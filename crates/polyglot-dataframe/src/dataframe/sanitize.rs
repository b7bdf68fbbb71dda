//! Column resolution against the current query.
//!
//! Columns handed to an operation may be qualified with a lineage token
//! (branch id, sequence id) or a user alias instead of a relation name, since
//! the CTE they will end up reading from does not exist when the column is
//! built. Before the column enters the AST the qualifier is rewritten to the
//! concrete CTE it denotes, and bare names are checked (and, inside joins,
//! qualified) against the relations in scope.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::expressions::*;
use crate::schema::Schema;
use crate::traversal::transform_map;

use super::dataframe::DataFrame;
use super::session::Session;

/// A relation in the FROM / JOIN clauses of the current query
pub(crate) struct Source {
    pub name: String,
    /// `None` when the relation's columns cannot be enumerated
    pub columns: Option<Vec<String>>,
}

impl Source {
    fn has(&self, column: &str) -> bool {
        self.columns
            .as_ref()
            .map_or(false, |cols| cols.iter().any(|c| c == column))
    }
}

/// Relations and CTEs visible to expressions of one SELECT
pub(crate) struct Scope<'a> {
    session: &'a Session,
    ctes: &'a [Cte],
    from: Option<&'a str>,
    sources: Vec<Source>,
    aliases: HashSet<String>,
    has_joins: bool,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(session: &'a Session, query: &'a Expression, select: &'a Select) -> Self {
        let ctes = query.ctes();
        let catalog = session.catalog();
        let relations = select
            .from
            .iter()
            .flat_map(|f| f.expressions.iter())
            .chain(select.joins.iter().map(|j| &j.this));
        let mut sources = Vec::new();
        for relation in relations {
            let Expression::Table(table) = relation else {
                continue;
            };
            let columns = match ctes.iter().find(|c| c.name() == table.name.name) {
                Some(cte) => Some(cte.this.named_selects()),
                None => catalog.column_names(&table.name.name).ok(),
            }
            .filter(|cols| !cols.iter().any(|c| c == "*"));
            sources.push(Source {
                name: table.alias_or_name().to_string(),
                columns,
            });
        }
        let aliases = select
            .expressions
            .iter()
            .filter(|e| matches!(e, Expression::Alias(_)))
            .map(|e| e.alias_or_name().to_string())
            .collect();
        Self {
            session,
            ctes,
            from: select.from_relation_name(),
            sources,
            aliases,
            has_joins: !select.joins.is_empty(),
        }
    }

    pub(crate) fn sources(&self) -> &[Source] {
        &self.sources
    }

    fn is_source(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name == name)
    }

    fn owners(&self, column: &str) -> Vec<&str> {
        self.sources
            .iter()
            .filter(|s| s.has(column))
            .map(|s| s.name.as_str())
            .collect()
    }

    /// Rewrite every qualifier in `expr` and validate bare column names.
    pub(crate) fn sanitize(&self, expr: Expression) -> Result<Expression> {
        transform_map(expr, &|node| match node {
            Expression::Column(mut c) => {
                self.resolve_column(&mut c)?;
                Ok(Expression::Column(c))
            }
            Expression::Star(mut s) => {
                if let Some(table) = s.table.as_mut() {
                    table.name = self.resolve_relation(&table.name, None)?;
                }
                Ok(Expression::Star(s))
            }
            other => Ok(other),
        })
    }

    fn resolve_column(&self, column: &mut Column) -> Result<()> {
        match column.table.as_mut() {
            Some(table) => {
                table.name = self.resolve_relation(&table.name, Some(&column.name.name))?;
                Ok(())
            }
            None => self.check_unqualified(column),
        }
    }

    fn check_unqualified(&self, column: &mut Column) -> Result<()> {
        let name = column.name.name.as_str();
        if !self.has_joins {
            let Some(source) = self.sources.first() else {
                return Ok(());
            };
            if source.columns.is_none() || source.has(name) || self.aliases.contains(name) {
                return Ok(());
            }
            return Err(Error::validation(format!("column {} does not exist", name)));
        }

        let owners = self.owners(name);
        let table = match owners.as_slice() {
            [single] => single.to_string(),
            [] => {
                if self.aliases.contains(name) || self.sources.iter().any(|s| s.columns.is_none()) {
                    return Ok(());
                }
                return Err(Error::validation(format!(
                    "column {} does not exist in any joined relation",
                    name
                )));
            }
            many => match self.from.filter(|from| many.contains(from)) {
                Some(from) => from.to_string(),
                None => {
                    return Err(Error::validation(format!(
                        "column {} is ambiguous between {}",
                        name,
                        many.join(", ")
                    )))
                }
            },
        };
        column.table = Some(Identifier::new(table));
        Ok(())
    }

    /// Map a qualifier to the relation it denotes in this query.
    ///
    /// Relation names in scope are kept. Lineage tokens and aliases select the
    /// CTEs materialized from them; among those joined here the FROM relation
    /// wins, then the most recently materialized. When the lineage only
    /// reaches CTEs outside this query (for instance the inputs of a join that
    /// has since been wrapped), the single relation in scope that outputs
    /// `column` is used.
    pub(crate) fn resolve_relation(&self, qualifier: &str, column: Option<&str>) -> Result<String> {
        if self.is_source(qualifier) {
            return Ok(qualifier.to_string());
        }
        let candidates = self.session.alias_candidates(qualifier);
        let matches: Vec<&str> = self
            .ctes
            .iter()
            .rev()
            .filter(|cte| {
                let by_sequence = cte
                    .sequence_id()
                    .map_or(false, |id| candidates.iter().any(|c| c == id));
                let by_branch = cte
                    .branch_id()
                    .map_or(false, |b| self.session.branch_descends_from(b, qualifier));
                by_sequence || by_branch
            })
            .map(|cte| cte.name())
            .collect();
        if matches.is_empty() {
            return Err(Error::validation(format!("unknown relation {}", qualifier)));
        }

        let in_scope: Vec<&str> = matches.iter().copied().filter(|m| self.is_source(m)).collect();
        if let Some(from) = self.from.filter(|from| in_scope.contains(from)) {
            return Ok(from.to_string());
        }
        if let Some(latest) = in_scope.first() {
            return Ok(latest.to_string());
        }

        match column.map(|c| self.owners(c)).as_deref() {
            Some([single]) => Ok(single.to_string()),
            _ => Err(Error::validation(format!(
                "{}.{} does not resolve to a relation of this query",
                qualifier,
                column.unwrap_or("*")
            ))),
        }
    }
}

impl<'s> DataFrame<'s> {
    /// Resolve qualifiers and check column names of `expr` against the
    /// current query.
    pub(crate) fn sanitize(&self, expr: Expression) -> Result<Expression> {
        let select = self.select_ref()?;
        Scope::new(self.session, &self.expression, select).sanitize(expr)
    }
}

#[cfg(test)]
mod tests {
    use crate::dataframe::functions::{col, lit};
    use crate::dataframe::session::Session;

    fn session() -> Session {
        let session = Session::new();
        session
            .register_table("t", &[("a", "INT"), ("b", "INT")])
            .unwrap();
        session
            .register_table("u", &[("b", "INT"), ("c", "INT")])
            .unwrap();
        session
    }

    #[test]
    fn test_unknown_qualifier_rejected() {
        let session = session();
        let err = session.table("t").unwrap().select(["nope.a"]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_projection_alias_is_visible_to_order_by() {
        let session = session();
        let df = session
            .table("t")
            .unwrap()
            .select([col("a").alias("x")])
            .unwrap()
            .order_by(["x"])
            .unwrap();
        assert_eq!(df.columns(), vec!["x"]);
    }

    #[test]
    fn test_other_plans_branch_resolves_in_join() {
        let session = session();
        let t = session.table("t").unwrap();
        let u = session.table("u").unwrap();
        let joined = t.join(&u, "b", "inner").unwrap();
        let filtered = joined.where_(u.col("c").gt(lit(1))).unwrap();
        let sql = filtered.expression().sql();
        assert!(!sql.contains(u.branch_id()));
    }

    #[test]
    fn test_ambiguous_column_prefers_left() {
        let session = session();
        let t = session.table("t").unwrap();
        let u = session.table("u").unwrap();
        let joined = t.join(&u, t.col("b").eq(u.col("b")), "inner").unwrap();
        let left = joined.latest_cte_name().unwrap();
        let projected = joined.select(["b"]).unwrap();
        let select = projected.expression().as_select().unwrap();
        assert_eq!(select.expressions[0].sql(), format!("{}.b", left));
    }
}
