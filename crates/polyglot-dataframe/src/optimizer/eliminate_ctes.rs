//! CTE Elimination Module
//!
//! Removes CTEs that are not reachable from the final query body.
//!
//! ```sql
//! -- Before:
//! WITH y AS (SELECT a FROM x), z AS (SELECT a FROM y) SELECT a FROM x
//! -- After:
//! SELECT a FROM x
//! ```

use std::collections::HashSet;

use crate::ast_transforms::get_table_names;
use crate::expressions::{Cte, Expression, With};

/// Remove CTEs that the query body does not reach, directly or through
/// other CTEs. Surviving CTEs keep their original order.
pub fn eliminate_ctes(mut expression: Expression) -> Expression {
    let ctes = match expression.with_mut().and_then(|w| w.take()) {
        Some(with) => with.ctes,
        None => return expression,
    };

    let reachable = reachable_ctes(&expression, &ctes);
    let kept: Vec<Cte> = ctes
        .into_iter()
        .filter(|c| reachable.contains(c.name()))
        .collect();

    if !kept.is_empty() {
        if let Some(with) = expression.with_mut() {
            *with = Some(With { ctes: kept });
        }
    }
    expression
}

fn reachable_ctes(body: &Expression, ctes: &[Cte]) -> HashSet<String> {
    let defined: HashSet<&str> = ctes.iter().map(|c| c.name()).collect();
    let mut reachable: HashSet<String> = HashSet::new();
    let mut pending: Vec<String> = get_table_names(body)
        .into_iter()
        .filter(|n| defined.contains(n.as_str()))
        .collect();

    while let Some(name) = pending.pop() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        // A CTE may only reference CTEs defined before it
        let Some(pos) = ctes.iter().position(|c| c.name() == name) else {
            continue;
        };
        for dep in get_table_names(&ctes[pos].this) {
            if ctes[..pos].iter().any(|c| c.name() == dep) {
                pending.push(dep);
            }
        }
    }
    reachable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{Identifier, Select};
    use crate::generator::Generator;

    fn select_from(table: &str) -> Expression {
        Expression::Select(Box::new(
            Select::new().column(Expression::column("a")).from(Expression::table(table)),
        ))
    }

    fn cte(name: &str, body: Expression) -> Cte {
        Cte {
            alias: Identifier::new(name),
            this: body,
            lineage: None,
        }
    }

    fn with_ctes(body: Expression, ctes: Vec<Cte>) -> Expression {
        let mut body = body;
        if let Some(with) = body.with_mut() {
            *with = Some(With { ctes });
        }
        body
    }

    #[test]
    fn test_transitive_references_survive() {
        let expr = with_ctes(
            select_from("z"),
            vec![
                cte("x", select_from("base")),
                cte("unused", select_from("base")),
                cte("z", select_from("x")),
            ],
        );
        let out = eliminate_ctes(expr);
        assert_eq!(
            Generator::sql(&out).unwrap(),
            "WITH x AS (SELECT a FROM base), z AS (SELECT a FROM x) SELECT a FROM z"
        );
    }

    #[test]
    fn test_all_unused_removes_with() {
        let expr = with_ctes(select_from("base"), vec![cte("y", select_from("base"))]);
        let out = eliminate_ctes(expr);
        assert!(out.with().is_none());
        assert!(!get_table_names(&out).contains(&"y".to_string()));
    }
}
