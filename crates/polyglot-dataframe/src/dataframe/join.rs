//! Joining two plans.
//!
//! Both sides are reduced to a single named relation first: the right plan is
//! always wrapped into a CTE, the left one only when its query is more than a
//! bare projection. The join query then selects, in first-seen order, the
//! join columns followed by the left and right outputs, keeping one slot per
//! output name.

use crate::error::{Error, Result};
use crate::expressions::{BinaryOp, Expression, Function, Identifier, Join, JoinKind, Star};
use crate::traversal::ExpressionWalk;

use super::column::Column;
use super::dataframe::DataFrame;
use super::materialize::merge_ctes;
use super::operations::Operation;
use super::sanitize::Scope;

/// How two plans are matched
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOn {
    /// Equality on columns both sides share; each appears once in the output.
    /// Right and full joins project `COALESCE(left.k, right.k) AS k` so rows
    /// with no left match keep their key.
    Columns(Vec<String>),
    /// Arbitrary boolean conditions, AND-ed together
    Conditions(Vec<Column>),
}

impl JoinOn {
    pub fn is_empty(&self) -> bool {
        match self {
            JoinOn::Columns(c) => c.is_empty(),
            JoinOn::Conditions(c) => c.is_empty(),
        }
    }
}

impl From<&str> for JoinOn {
    fn from(column: &str) -> Self {
        JoinOn::Columns(vec![column.to_string()])
    }
}

impl From<Vec<&str>> for JoinOn {
    fn from(columns: Vec<&str>) -> Self {
        JoinOn::Columns(columns.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for JoinOn {
    fn from(columns: [&str; N]) -> Self {
        JoinOn::Columns(columns.iter().map(|c| c.to_string()).collect())
    }
}

impl From<Vec<String>> for JoinOn {
    fn from(columns: Vec<String>) -> Self {
        JoinOn::Columns(columns)
    }
}

impl From<Column> for JoinOn {
    fn from(condition: Column) -> Self {
        JoinOn::Conditions(vec![condition])
    }
}

impl From<Vec<Column>> for JoinOn {
    fn from(conditions: Vec<Column>) -> Self {
        JoinOn::Conditions(conditions)
    }
}

/// Output slot key: the output name, or the SQL text of a wildcard so that
/// `l.*` and `r.*` stay distinct.
fn output_key(expr: &Expression) -> String {
    match expr {
        Expression::Star(_) => expr.sql(),
        other => other.alias_or_name().to_string(),
    }
}

/// Output columns of a relation, qualified with its name.
fn qualified_outputs(relation: &str, names: &[String]) -> Vec<Expression> {
    names
        .iter()
        .map(|name| {
            if name == "*" {
                Expression::Star(Star {
                    table: Some(Identifier::new(relation)),
                })
            } else {
                Expression::qualified_column(relation, name.as_str())
            }
        })
        .collect()
}

fn projects(names: &[String], column: &str) -> bool {
    names.iter().any(|n| n == column || n == "*")
}

impl<'s> DataFrame<'s> {
    /// Join `other` on shared column names or on conditions.
    ///
    /// `how` accepts `inner`, `left`, `right`, `full`/`outer`, `cross`,
    /// `left_semi` and `left_anti`, with `_` and spaces interchangeable.
    ///
    /// ```
    /// use polyglot_dataframe::{Session, SessionConfig};
    ///
    /// let session = Session::new();
    /// session.register_table("l", &[("a", "INT"), ("b", "INT")]).unwrap();
    /// session.register_table("r", &[("b", "INT"), ("c", "INT")]).unwrap();
    /// let l = session.table("l").unwrap();
    /// let r = session.table("r").unwrap();
    /// let joined = l.join(&r, "b", "inner").unwrap();
    /// assert_eq!(joined.columns(), vec!["b", "a", "c"]);
    /// ```
    pub fn join(&self, other: &DataFrame<'s>, on: impl Into<JoinOn>, how: &str) -> Result<DataFrame<'s>> {
        let kind = JoinKind::from_name(how)
            .ok_or_else(|| Error::validation(format!("unknown join type {}", how)))?;
        let on = on.into();
        match (kind, on.is_empty()) {
            (JoinKind::Cross, false) => {
                return Err(Error::policy("a cross join takes no join condition"))
            }
            (JoinKind::Cross, true) => {}
            (_, true) => {
                return Err(Error::policy(format!(
                    "{} requires a join condition",
                    kind.keyword()
                )))
            }
            _ => {}
        }
        self.apply(Operation::From, |df| df.join_relations(other, on, kind))
    }

    /// Cartesian product with `other`.
    pub fn cross_join(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.join(other, JoinOn::Columns(Vec::new()), "cross")
    }

    fn join_relations(self, other: &DataFrame<'s>, on: JoinOn, kind: JoinKind) -> Result<DataFrame<'s>> {
        let right = other.convert_leaf_to_cte(None)?;
        let right_name = right.latest_cte_name()?;
        let right_outputs = right.columns();

        let mut left = if self.is_leaf_projection() {
            self
        } else {
            self.convert_leaf_to_cte(None)?
        };
        let left_name = left.latest_cte_name()?;
        let left_outputs = left.columns();

        let mut right_expression = right.expression;
        merge_ctes(&mut left.expression, crate::ast_transforms::take_ctes(&mut right_expression));
        left.pending_hints.extend(right.pending_hints);
        left.select_mut()?.joins.push(Join {
            this: Expression::table(&right_name),
            on: None,
            kind,
        });

        let (condition, join_columns) = match on {
            JoinOn::Columns(names) => {
                let mut equalities = Vec::with_capacity(names.len());
                let mut join_columns = Vec::with_capacity(names.len());
                for name in &names {
                    if !projects(&left_outputs, name) {
                        return Err(Error::validation(format!(
                            "join column {} does not exist on the left side",
                            name
                        )));
                    }
                    if !projects(&right_outputs, name) {
                        return Err(Error::validation(format!(
                            "join column {} does not exist on the right side",
                            name
                        )));
                    }
                    let l = Expression::qualified_column(&left_name, name.as_str());
                    let r = Expression::qualified_column(&right_name, name.as_str());
                    let key = if kind.keeps_unmatched_right() {
                        let args = vec![l.clone(), r.clone()];
                        Expression::alias(
                            Expression::Function(Box::new(Function::new("COALESCE", args))),
                            name.as_str(),
                        )
                    } else {
                        l.clone()
                    };
                    equalities.push(Expression::Eq(Box::new(BinaryOp::new(l, r))));
                    join_columns.push(key);
                }
                (Expression::and_all(equalities), join_columns)
            }
            JoinOn::Conditions(conditions) => {
                let condition = Expression::and_all(conditions.into_iter().map(Column::into_inner))
                    .ok_or_else(|| Error::policy("join requires a condition"))?;
                let condition = left.resolve_join_condition(condition, &left_name, &right_name)?;
                let join_columns = condition
                    .find_all(|e| matches!(e, Expression::Column(_)))
                    .into_iter()
                    .filter(|e| {
                        kind.projects_right()
                            || !matches!(e, Expression::Column(c) if c.table.as_ref().map_or(false, |t| t.name == right_name))
                    })
                    .cloned()
                    .collect();
                (Some(condition), join_columns)
            }
        };
        if let Some(join) = left.select_mut()?.joins.last_mut() {
            join.on = condition;
        }

        let right_columns = if kind.projects_right() {
            qualified_outputs(&right_name, &right_outputs)
        } else {
            Vec::new()
        };
        let projection = merge_outputs(
            join_columns,
            qualified_outputs(&left_name, &left_outputs),
            right_columns,
        );
        tracing::debug!(
            "joined {} {} {} ({} output columns)",
            left_name,
            kind.keyword(),
            right_name,
            projection.len()
        );
        left.project(projection.into_iter().map(Column).collect(), false)
    }

    /// Qualify the columns of a free-form join condition.
    ///
    /// A bare column goes to the side that outputs it. One that both sides
    /// (or neither) output is assigned by position: even occurrences to the
    /// left relation, odd ones to the right. Qualifiers that are lineage
    /// tokens or aliases are then resolved like any other column.
    fn resolve_join_condition(&self, condition: Expression, left: &str, right: &str) -> Result<Expression> {
        let select = self.select_ref()?;
        let scope = Scope::new(self.session, &self.expression, select);
        let owns = |relation: &str, column: &str| {
            scope.sources().iter().any(|s| {
                s.name == relation
                    && s.columns.as_ref().map_or(true, |cols| cols.iter().any(|c| c == column))
            })
        };

        let mut position = 0usize;
        let mut condition = condition;
        crate::traversal::visit_columns_mut(&mut condition, &mut |c: &mut crate::expressions::Column| {
            if c.table.is_none() {
                let name = c.name.name.as_str();
                let side = match (owns(left, name), owns(right, name)) {
                    (true, false) => left,
                    (false, true) => right,
                    _ if position % 2 == 0 => left,
                    _ => right,
                };
                c.table = Some(Identifier::new(side));
            }
            position += 1;
        });
        scope.sanitize(condition)
    }
}

/// Merge the three output groups into one projection.
///
/// Slots follow first-seen order over join, left and right columns. A name
/// present in several groups takes its expression from the join columns, then
/// the right side, then the left side.
fn merge_outputs(
    join_columns: Vec<Expression>,
    left: Vec<Expression>,
    right: Vec<Expression>,
) -> Vec<Expression> {
    let mut keys: Vec<String> = Vec::new();
    for expr in join_columns.iter().chain(&left).chain(&right) {
        let key = output_key(expr);
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys.iter()
        .filter_map(|key| {
            [&join_columns, &right, &left]
                .into_iter()
                .find_map(|group| group.iter().find(|e| &output_key(e) == key))
                .cloned()
        })
        .collect()
}
