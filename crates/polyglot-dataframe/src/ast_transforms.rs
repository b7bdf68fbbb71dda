//! AST transform helpers and convenience getters.
//!
//! Mutation functions take an owned [`Expression`] and return a new [`Expression`].
//! Read-only getters take `&Expression`.

use crate::expressions::*;
use crate::traversal::{transform_map, ExpressionWalk};

/// Apply a bottom-up transformation to every node in the tree.
fn xform<F: Fn(Expression) -> Expression>(expr: Expression, fun: F) -> Expression {
    transform_map(expr, &|node| Ok(fun(node))).unwrap_or_else(|_| Expression::Null(Null))
}

/// AND a condition onto the WHERE clause of a SELECT.
///
/// Non-SELECT expressions are returned unchanged.
pub fn add_where(expr: Expression, condition: Expression) -> Expression {
    if let Expression::Select(mut sel) = expr {
        sel.where_clause = Some(Where {
            this: match sel.where_clause.take() {
                Some(existing) => Expression::And(Box::new(BinaryOp::new(existing.this, condition))),
                None => condition,
            },
        });
        Expression::Select(sel)
    } else {
        expr
    }
}

/// Set the LIMIT of a SELECT, keeping the smaller of an existing numeric
/// limit and `limit`.
pub fn set_limit(expr: Expression, limit: u64) -> Expression {
    if let Expression::Select(mut sel) = expr {
        let current = sel.limit.as_ref().and_then(|l| match &l.this {
            Expression::Literal(Literal::Number(n)) => n.parse::<u64>().ok(),
            _ => None,
        });
        let limit = current.map_or(limit, |c| c.min(limit));
        sel.limit = Some(Limit {
            this: Expression::number(limit),
        });
        Expression::Select(sel)
    } else {
        expr
    }
}

/// Remove the WITH clause of a query and return its CTEs.
pub fn take_ctes(expr: &mut Expression) -> Vec<Cte> {
    expr.with_mut()
        .and_then(|with| with.take())
        .map(|w| w.ctes)
        .unwrap_or_default()
}

/// Rename a relation everywhere it is referenced, in a single pass.
///
/// This rewrites CTE definitions, table references and their aliases,
/// column and star qualifiers and join-hint targets. Names that merely
/// contain `old` as a substring are left alone.
pub fn rename_relation(expr: Expression, old: &str, new: &str) -> Expression {
    let rename = |ident: &mut Identifier| {
        if ident.name == old {
            ident.name = new.to_string();
        }
    };
    let rename_with = |with: &mut Option<With>| {
        if let Some(with) = with {
            for cte in with.ctes.iter_mut() {
                rename(&mut cte.alias);
            }
        }
    };
    xform(expr, |node| match node {
        Expression::Table(mut t) => {
            rename(&mut t.name);
            if let Some(alias) = t.alias.as_mut() {
                rename(alias);
            }
            Expression::Table(t)
        }
        Expression::Column(mut c) => {
            if let Some(table) = c.table.as_mut() {
                rename(table);
            }
            Expression::Column(c)
        }
        Expression::Star(mut s) => {
            if let Some(table) = s.table.as_mut() {
                rename(table);
            }
            Expression::Star(s)
        }
        Expression::Select(mut s) => {
            rename_with(&mut s.with);
            if let Some(hint) = s.hint.as_mut() {
                for h in hint.expressions.iter_mut() {
                    if let HintExpression::Join(j) = h {
                        j.targets.iter_mut().for_each(|t| rename(t));
                    }
                }
            }
            Expression::Select(s)
        }
        Expression::SetOperation(mut op) => {
            rename_with(&mut op.with);
            Expression::SetOperation(op)
        }
        other => other,
    })
}

/// Collect all table names referenced in `expr`, deduplicated in first-seen order.
pub fn get_table_names(expr: &Expression) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for node in expr.find_all(|e| matches!(e, Expression::Table(_))) {
        if let Expression::Table(t) = node {
            if !names.contains(&t.name.name) {
                names.push(t.name.name.clone());
            }
        }
    }
    names
}
