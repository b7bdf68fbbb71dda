//! Tree traversal utilities for SQL expression ASTs.
//!
//! This module provides read-only traversal over the [`Expression`] tree:
//!
//! - **[`DfsIter`]** -- pre-order depth-first iterator
//! - **[`ExpressionWalk`]** -- trait with search helpers (`find`, `find_all`, `contains`)
//! - **[`transform_map`]** -- bottom-up rewrite of a whole tree
//!
//! Children are visited in SQL order: a SELECT yields its CTE bodies first,
//! then the select-list, hint arguments, FROM, JOIN targets and conditions,
//! WHERE, GROUP BY, HAVING, ORDER BY and LIMIT.

use crate::expressions::{Column, Expression, HintExpression, Null, Select};

/// Immediate child expressions of `expr`, in SQL order.
pub fn children(expr: &Expression) -> Vec<&Expression> {
    let mut out = Vec::new();
    match expr {
        Expression::Literal(_)
        | Expression::Boolean(_)
        | Expression::Null(_)
        | Expression::Identifier(_)
        | Expression::Column(_)
        | Expression::Table(_)
        | Expression::Star(_) => {}
        Expression::Select(s) => select_children(s, &mut out),
        Expression::SetOperation(op) => {
            if let Some(with) = &op.with {
                out.extend(with.ctes.iter().map(|c| &c.this));
            }
            out.push(&op.left);
            out.push(&op.right);
        }
        Expression::Insert(i) => out.push(&i.query),
        Expression::Create(c) => out.push(&c.query),
        Expression::Alias(a) => out.push(&a.this),
        Expression::Cast(c) => out.push(&c.this),
        Expression::Case(c) => {
            for (cond, result) in &c.whens {
                out.push(cond);
                out.push(result);
            }
            if let Some(default) = &c.else_ {
                out.push(default);
            }
        }
        Expression::Paren(p) => out.push(&p.this),
        Expression::Function(f) => out.extend(f.args.iter()),
        Expression::Ordered(o) => out.push(&o.this),
        Expression::And(op)
        | Expression::Or(op)
        | Expression::Add(op)
        | Expression::Sub(op)
        | Expression::Mul(op)
        | Expression::Div(op)
        | Expression::Eq(op)
        | Expression::Neq(op)
        | Expression::Lt(op)
        | Expression::Lte(op)
        | Expression::Gt(op)
        | Expression::Gte(op) => {
            out.push(&op.left);
            out.push(&op.right);
        }
        Expression::Not(op) | Expression::IsNull(op) => out.push(&op.this),
    }
    out
}

fn select_children<'a>(s: &'a Select, out: &mut Vec<&'a Expression>) {
    if let Some(with) = &s.with {
        out.extend(with.ctes.iter().map(|c| &c.this));
    }
    out.extend(s.expressions.iter());
    if let Some(hint) = &s.hint {
        for h in &hint.expressions {
            if let HintExpression::Partition(p) = h {
                out.extend(p.args.iter());
            }
        }
    }
    if let Some(from) = &s.from {
        out.extend(from.expressions.iter());
    }
    for join in &s.joins {
        out.push(&join.this);
        if let Some(on) = &join.on {
            out.push(on);
        }
    }
    if let Some(w) = &s.where_clause {
        out.push(&w.this);
    }
    if let Some(g) = &s.group_by {
        out.extend(g.expressions.iter());
    }
    if let Some(h) = &s.having {
        out.push(&h.this);
    }
    if let Some(o) = &s.order_by {
        out.extend(o.expressions.iter().map(|o| &o.this));
    }
    if let Some(l) = &s.limit {
        out.push(&l.this);
    }
}

/// Mutable immediate children of `expr`, in the same order as [`children`].
pub fn children_mut(expr: &mut Expression) -> Vec<&mut Expression> {
    let mut out = Vec::new();
    match expr {
        Expression::Literal(_)
        | Expression::Boolean(_)
        | Expression::Null(_)
        | Expression::Identifier(_)
        | Expression::Column(_)
        | Expression::Table(_)
        | Expression::Star(_) => {}
        Expression::Select(s) => {
            let Select {
                expressions,
                from,
                joins,
                where_clause,
                group_by,
                having,
                order_by,
                limit,
                with,
                hint,
                ..
            } = &mut **s;
            if let Some(with) = with {
                out.extend(with.ctes.iter_mut().map(|c| &mut c.this));
            }
            out.extend(expressions.iter_mut());
            if let Some(hint) = hint {
                for h in hint.expressions.iter_mut() {
                    if let HintExpression::Partition(p) = h {
                        out.extend(p.args.iter_mut());
                    }
                }
            }
            if let Some(from) = from {
                out.extend(from.expressions.iter_mut());
            }
            for join in joins.iter_mut() {
                out.push(&mut join.this);
                if let Some(on) = &mut join.on {
                    out.push(on);
                }
            }
            if let Some(w) = where_clause {
                out.push(&mut w.this);
            }
            if let Some(g) = group_by {
                out.extend(g.expressions.iter_mut());
            }
            if let Some(h) = having {
                out.push(&mut h.this);
            }
            if let Some(o) = order_by {
                out.extend(o.expressions.iter_mut().map(|o| &mut o.this));
            }
            if let Some(l) = limit {
                out.push(&mut l.this);
            }
        }
        Expression::SetOperation(op) => {
            let op = &mut **op;
            if let Some(with) = &mut op.with {
                out.extend(with.ctes.iter_mut().map(|c| &mut c.this));
            }
            out.push(&mut op.left);
            out.push(&mut op.right);
        }
        Expression::Insert(i) => out.push(&mut i.query),
        Expression::Create(c) => out.push(&mut c.query),
        Expression::Alias(a) => out.push(&mut a.this),
        Expression::Cast(c) => out.push(&mut c.this),
        Expression::Case(c) => {
            let c = &mut **c;
            for (cond, result) in c.whens.iter_mut() {
                out.push(cond);
                out.push(result);
            }
            if let Some(default) = &mut c.else_ {
                out.push(default);
            }
        }
        Expression::Paren(p) => out.push(&mut p.this),
        Expression::Function(f) => out.extend(f.args.iter_mut()),
        Expression::Ordered(o) => out.push(&mut o.this),
        Expression::And(op)
        | Expression::Or(op)
        | Expression::Add(op)
        | Expression::Sub(op)
        | Expression::Mul(op)
        | Expression::Div(op)
        | Expression::Eq(op)
        | Expression::Neq(op)
        | Expression::Lt(op)
        | Expression::Lte(op)
        | Expression::Gt(op)
        | Expression::Gte(op) => {
            let op = &mut **op;
            out.push(&mut op.left);
            out.push(&mut op.right);
        }
        Expression::Not(op) | Expression::IsNull(op) => out.push(&mut op.this),
    }
    out
}

/// Pre-order depth-first iterator over an expression tree.
///
/// For `(a + b) = c` the iteration order is `Eq`, `Add`, `a`, `b`, `c`.
pub struct DfsIter<'a> {
    stack: Vec<&'a Expression>,
}

impl<'a> DfsIter<'a> {
    /// Create a new DFS iterator starting from the given expression
    pub fn new(root: &'a Expression) -> Self {
        Self { stack: vec![root] }
    }
}

impl<'a> Iterator for DfsIter<'a> {
    type Item = &'a Expression;

    fn next(&mut self) -> Option<Self::Item> {
        let expr = self.stack.pop()?;

        // Add children in reverse order so they come out in forward order
        for child in children(expr).into_iter().rev() {
            self.stack.push(child);
        }

        Some(expr)
    }
}

/// Search helpers available on every [`Expression`].
pub trait ExpressionWalk {
    /// Returns a depth-first (pre-order) iterator over this expression and all descendants.
    fn dfs(&self) -> DfsIter<'_>;

    /// Finds the first expression matching `predicate` in depth-first order.
    fn find<F>(&self, predicate: F) -> Option<&Expression>
    where
        F: Fn(&Expression) -> bool;

    /// Collects all expressions matching `predicate` in depth-first order.
    fn find_all<F>(&self, predicate: F) -> Vec<&Expression>
    where
        F: Fn(&Expression) -> bool;

    /// Returns `true` if any node in the tree satisfies `predicate`.
    fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Expression) -> bool;
}

impl ExpressionWalk for Expression {
    fn dfs(&self) -> DfsIter<'_> {
        DfsIter::new(self)
    }

    fn find<F>(&self, predicate: F) -> Option<&Expression>
    where
        F: Fn(&Expression) -> bool,
    {
        self.dfs().find(|e| predicate(e))
    }

    fn find_all<F>(&self, predicate: F) -> Vec<&Expression>
    where
        F: Fn(&Expression) -> bool,
    {
        self.dfs().filter(|e| predicate(e)).collect()
    }

    fn contains<F>(&self, predicate: F) -> bool
    where
        F: Fn(&Expression) -> bool,
    {
        self.dfs().any(|e| predicate(e))
    }
}

/// Rewrite a tree bottom-up: children are transformed before `fun` sees
/// their parent.
///
/// ```
/// use polyglot_dataframe::expressions::Expression;
/// use polyglot_dataframe::traversal::transform_map;
///
/// let expr = Expression::column("a");
/// let renamed = transform_map(expr, &|e| match e {
///     Expression::Column(mut c) => {
///         c.name.name = "b".to_string();
///         Ok(Expression::Column(c))
///     }
///     other => Ok(other),
/// })
/// .unwrap();
/// assert_eq!(renamed, Expression::column("b"));
/// ```
pub fn transform_map<F>(mut expr: Expression, fun: &F) -> crate::Result<Expression>
where
    F: Fn(Expression) -> crate::Result<Expression>,
{
    for child in children_mut(&mut expr) {
        let owned = std::mem::replace(child, Expression::Null(Null));
        *child = transform_map(owned, fun)?;
    }
    fun(expr)
}

/// Apply `f` to every column reference in `expr` in pre-order, without
/// entering nested queries.
pub fn visit_columns_mut<F: FnMut(&mut Column)>(expr: &mut Expression, f: &mut F) {
    match expr {
        Expression::Column(c) => f(c),
        Expression::Select(_) | Expression::SetOperation(_) => {}
        _ => {
            for child in children_mut(expr) {
                visit_columns_mut(child, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{BinaryOp, Join, JoinKind};

    fn eq(left: Expression, right: Expression) -> Expression {
        Expression::Eq(Box::new(BinaryOp::new(left, right)))
    }

    #[test]
    fn test_dfs_is_preorder() {
        let expr = eq(
            Expression::Add(Box::new(BinaryOp::new(
                Expression::column("a"),
                Expression::column("b"),
            ))),
            Expression::column("c"),
        );
        let names: Vec<&str> = expr
            .dfs()
            .filter(|e| matches!(e, Expression::Column(_)))
            .map(|e| e.alias_or_name())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_select_children_include_join_condition() {
        let mut select = Select::new()
            .column(Expression::column("a"))
            .from(Expression::table("t"));
        select.joins.push(Join {
            this: Expression::table("u"),
            on: Some(eq(
                Expression::qualified_column("t", "id"),
                Expression::qualified_column("u", "id"),
            )),
            kind: JoinKind::Inner,
        });
        let expr = Expression::Select(Box::new(select));
        assert_eq!(expr.find_all(|e| matches!(e, Expression::Column(_))).len(), 3);
        assert!(expr.contains(|e| matches!(e, Expression::Table(t) if t.name.name == "u")));
    }

    #[test]
    fn test_transform_map_is_bottom_up() {
        let expr = eq(Expression::column("a"), Expression::number(1));
        let out = transform_map(expr, &|e| match e {
            Expression::Literal(_) => Ok(Expression::number(2)),
            other => Ok(other),
        })
        .unwrap();
        assert_eq!(out, eq(Expression::column("a"), Expression::number(2)));
    }
}
