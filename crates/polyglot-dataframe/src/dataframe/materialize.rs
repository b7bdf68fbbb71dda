//! CTE materialization and deferred hint resolution.

use crate::ast_transforms::take_ctes;
use crate::error::{Error, Result};
use crate::expressions::*;

use super::dataframe::DataFrame;

impl<'s> DataFrame<'s> {
    /// Wrap the current query into a new CTE and start `SELECT <outputs> FROM
    /// <cte>` on top of it. Pending hints are resolved against the query
    /// before it is frozen.
    ///
    /// The CTE records this plan's branch id and `sequence_id` (or the
    /// plan's own sequence id), which the returned plan adopts.
    pub(crate) fn convert_leaf_to_cte(&self, sequence_id: Option<String>) -> Result<DataFrame<'s>> {
        let mut df = self.resolve_pending_hints()?;
        let sequence_id = sequence_id.unwrap_or_else(|| df.sequence_id.clone());

        let mut body = df.take_expression();
        if !body.is_query() {
            return Err(Error::structural(
                "only SELECT and set-operation plans can be wrapped into a CTE",
            ));
        }
        let mut ctes = take_ctes(&mut body);

        if let Expression::Select(select) = &mut body {
            for (i, expr) in select.expressions.iter_mut().enumerate() {
                if expr.alias_or_name().is_empty() {
                    let inner = std::mem::replace(expr, Expression::null());
                    *expr = Expression::alias(inner, format!("_col_{}", i));
                }
            }
        }

        let outputs = body.named_selects();
        let projection: Vec<Expression> = if outputs.iter().any(|n| n == "*") {
            vec![Expression::star()]
        } else {
            let mut seen: Vec<&str> = Vec::with_capacity(outputs.len());
            for name in &outputs {
                if !seen.contains(&name.as_str()) {
                    seen.push(name);
                }
            }
            seen.into_iter().map(Expression::column).collect()
        };

        let name = df.session.next_cte_name();
        ctes.push(Cte {
            alias: Identifier::new(&name),
            this: body,
            lineage: Some(CteLineage {
                branch_id: df.branch_id.clone(),
                sequence_id: sequence_id.clone(),
            }),
        });
        tracing::debug!(
            "materialized {} (branch {}, sequence {}), {} ctes",
            name,
            df.branch_id,
            sequence_id,
            ctes.len()
        );

        let mut select = Select::new().from(Expression::table(&name));
        select.expressions = projection;
        select.with = Some(With { ctes });
        df.expression = Expression::Select(Box::new(select));
        df.sequence_id = sequence_id;
        Ok(df)
    }

    /// Attach pending hints to the current query where possible.
    ///
    /// Partition hints attach unconditionally. A join hint attaches once the
    /// query joins a CTE materialized from one of its targets: each target is
    /// expanded through the alias registry and matched against the CTE list,
    /// most recent first. Targets that match nothing joined here are dropped,
    /// and so is a join hint left with no target. Join hints stay pending
    /// while the query has no join, and every hint stays pending while the
    /// root is a set operation.
    pub(crate) fn resolve_pending_hints(&self) -> Result<DataFrame<'s>> {
        let mut df = self.clone();
        if df.pending_hints.is_empty() {
            return Ok(df);
        }
        let session = df.session;
        let hints = std::mem::take(&mut df.pending_hints);
        let query = df
            .expression
            .query_mut()
            .ok_or_else(|| Error::structural("plan root is not a query"))?;
        let select = match query {
            Expression::Select(select) => select,
            _ => {
                df.pending_hints = hints;
                return Ok(df);
            }
        };

        let joined = select.join_table_names();
        let mut attached = Vec::new();
        let mut pending = Vec::new();
        for hint in hints {
            match hint {
                HintExpression::Partition(p) => attached.push(HintExpression::Partition(p)),
                HintExpression::Join(j) if joined.is_empty() => {
                    pending.push(HintExpression::Join(j));
                }
                HintExpression::Join(j) => {
                    let mut targets = Vec::with_capacity(j.targets.len());
                    for target in &j.targets {
                        let candidates = session.alias_candidates(&target.name);
                        let found = select.ctes().iter().rev().find(|cte| {
                            cte.sequence_id()
                                .map_or(false, |id| candidates.iter().any(|c| c == id))
                                && joined.iter().any(|t| t == cte.name())
                        });
                        match found {
                            Some(cte) => targets.push(Identifier::new(cte.name())),
                            None => tracing::debug!(
                                "join hint {} target {} is not joined here; dropping it",
                                j.name,
                                target.name
                            ),
                        }
                    }
                    if targets.is_empty() {
                        tracing::debug!("dropping join hint {} with no resolvable target", j.name);
                    } else {
                        tracing::trace!("resolved join hint {} to {:?}", j.name, targets);
                        attached.push(HintExpression::Join(JoinHint {
                            name: j.name,
                            targets,
                        }));
                    }
                }
            }
        }

        if !attached.is_empty() {
            select
                .hint
                .get_or_insert_with(Hint::default)
                .expressions
                .extend(attached);
        }
        df.pending_hints = pending;
        Ok(df)
    }

    /// Name of the relation this plan currently selects from.
    pub(crate) fn latest_cte_name(&self) -> Result<String> {
        self.select_ref()?
            .from_relation_name()
            .map(str::to_string)
            .ok_or_else(|| Error::structural("plan has no FROM relation"))
    }

    /// Whether the query is a bare projection of columns over a single
    /// relation, so it can be joined without wrapping it first.
    pub(crate) fn is_leaf_projection(&self) -> bool {
        let Some(select) = self.expression.as_select() else {
            return false;
        };
        select.joins.is_empty()
            && select.where_clause.is_none()
            && select.group_by.is_none()
            && select.having.is_none()
            && select.order_by.is_none()
            && select.limit.is_none()
            && !select.distinct
            && select.hint.is_none()
            && select.from_relation_name().is_some()
            && select
                .expressions
                .iter()
                .all(|e| matches!(e, Expression::Column(_) | Expression::Star(_)))
    }
}

/// Append `extra` CTEs to `expr`, skipping names it already defines.
pub(crate) fn merge_ctes(expr: &mut Expression, extra: Vec<Cte>) {
    let Some(with) = expr.with_mut() else {
        return;
    };
    let with = with.get_or_insert_with(With::default);
    for cte in extra {
        if !with.contains(cte.name()) {
            with.ctes.push(cte);
        }
    }
}
