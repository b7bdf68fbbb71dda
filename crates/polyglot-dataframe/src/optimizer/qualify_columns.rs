//! Column Qualification Module
//!
//! Adds relation qualifiers to bare column references and aliases qualified
//! projections with their output name:
//!
//! ```sql
//! -- Before:
//! SELECT col FROM tbl
//! -- After:
//! SELECT tbl.col AS col FROM tbl
//! ```
//!
//! The columns a relation exposes come from the body of the CTE it names or,
//! for base tables, from the schema. A relation whose columns are unknown
//! (no schema entry, or a `*` projection) owns any column no other relation
//! claims, provided it is the only such relation.

use std::collections::{HashMap, HashSet};

use crate::error::Result;
use crate::expressions::{Column, Expression, Identifier, Select};
use crate::schema::Schema;
use crate::traversal::{transform_map, visit_columns_mut, ExpressionWalk};

/// Qualify the columns of every SELECT in `expression`.
pub fn qualify_columns(expression: Expression, schema: Option<&dyn Schema>) -> Result<Expression> {
    let cte_columns = collect_cte_columns(&expression);
    transform_map(expression, &|node| match node {
        Expression::Select(mut select) => {
            qualify_select(&mut select, &cte_columns, schema);
            Ok(Expression::Select(select))
        }
        other => Ok(other),
    })
}

/// Output columns of every CTE defined anywhere in the tree
fn collect_cte_columns(expression: &Expression) -> HashMap<String, Vec<String>> {
    let mut out = HashMap::new();
    for node in expression.find_all(|e| e.is_query()) {
        for cte in node.ctes() {
            out.insert(cte.name().to_string(), cte.this.named_selects());
        }
    }
    out
}

struct Source {
    name: String,
    /// `None` when the relation's columns cannot be enumerated
    columns: Option<Vec<String>>,
}

fn resolve_sources(
    select: &Select,
    cte_columns: &HashMap<String, Vec<String>>,
    schema: Option<&dyn Schema>,
) -> Vec<Source> {
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
        let columns = cte_columns
            .get(&table.name.name)
            .cloned()
            .or_else(|| schema.and_then(|s| s.column_names(&table.name.name).ok()))
            .filter(|cols| !cols.iter().any(|c| c == "*"));
        sources.push(Source {
            name: table.alias_or_name().to_string(),
            columns,
        });
    }
    sources
}

fn owner<'a>(sources: &'a [Source], column: &str) -> Option<&'a str> {
    let owners: Vec<&'a str> = sources
        .iter()
        .filter(|s| s.columns.as_ref().map_or(false, |c| c.iter().any(|n| n == column)))
        .map(|s| s.name.as_str())
        .collect();
    match owners.as_slice() {
        [single] => Some(*single),
        [] => {
            let unknown: Vec<&'a str> = sources
                .iter()
                .filter(|s| s.columns.is_none())
                .map(|s| s.name.as_str())
                .collect();
            match unknown.as_slice() {
                [single] => Some(*single),
                _ => None,
            }
        }
        _ => None,
    }
}

fn qualify_select(
    select: &mut Select,
    cte_columns: &HashMap<String, Vec<String>>,
    schema: Option<&dyn Schema>,
) {
    let sources = resolve_sources(select, cte_columns, schema);
    if sources.is_empty() {
        return;
    }
    let projection_aliases: HashSet<String> = select
        .expressions
        .iter()
        .filter(|e| matches!(e, Expression::Alias(_)))
        .map(|e| e.alias_or_name().to_string())
        .collect();

    let qualify = |column: &mut Column, alias_refs: bool| {
        if column.table.is_some() {
            return;
        }
        if alias_refs && projection_aliases.contains(&column.name.name) {
            return;
        }
        if let Some(table) = owner(&sources, &column.name.name) {
            column.table = Some(Identifier::new(table));
        }
    };

    for expr in select.expressions.iter_mut() {
        visit_columns_mut(expr, &mut |c| qualify(c, false));
    }
    for join in select.joins.iter_mut() {
        if let Some(on) = join.on.as_mut() {
            visit_columns_mut(on, &mut |c| qualify(c, false));
        }
    }
    if let Some(w) = select.where_clause.as_mut() {
        visit_columns_mut(&mut w.this, &mut |c| qualify(c, false));
    }
    if let Some(g) = select.group_by.as_mut() {
        for expr in g.expressions.iter_mut() {
            visit_columns_mut(expr, &mut |c| qualify(c, false));
        }
    }
    if let Some(h) = select.having.as_mut() {
        visit_columns_mut(&mut h.this, &mut |c| qualify(c, true));
    }
    if let Some(o) = select.order_by.as_mut() {
        for key in o.expressions.iter_mut() {
            visit_columns_mut(&mut key.this, &mut |c| qualify(c, true));
        }
    }

    for expr in select.expressions.iter_mut() {
        if let Expression::Column(c) = expr {
            if c.table.is_some() {
                let name = c.name.name.clone();
                let column = std::mem::replace(expr, Expression::null());
                *expr = Expression::alias(column, name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expressions::{BinaryOp, Cte, Join, JoinKind, OrderBy, Ordered, With};
    use crate::generator::Generator;
    use crate::schema::MappingSchema;

    fn gen(expr: &Expression) -> String {
        Generator::new().generate(expr).unwrap()
    }

    fn schema() -> MappingSchema {
        MappingSchema::from_simple_map(&[
            ("t", &[("a", "INT"), ("b", "INT")]),
            ("u", &[("b", "INT"), ("c", "INT")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_single_source() {
        let select = Select::new()
            .column(Expression::column("a"))
            .column(Expression::star())
            .from(Expression::table("t"));
        let schema = schema();
        let out = qualify_columns(Expression::Select(Box::new(select)), Some(&schema)).unwrap();
        assert_eq!(gen(&out), "SELECT t.a AS a, * FROM t");
    }

    #[test]
    fn test_ambiguous_column_left_alone() {
        let mut select = Select::new()
            .column(Expression::column("a"))
            .column(Expression::column("b"))
            .column(Expression::column("c"))
            .from(Expression::table("t"));
        select.joins.push(Join {
            this: Expression::table("u"),
            on: Some(Expression::Eq(Box::new(BinaryOp::new(
                Expression::qualified_column("t", "b"),
                Expression::qualified_column("u", "b"),
            )))),
            kind: JoinKind::Inner,
        });
        let schema = schema();
        let out = qualify_columns(Expression::Select(Box::new(select)), Some(&schema)).unwrap();
        assert_eq!(
            gen(&out),
            "SELECT t.a AS a, b, u.c AS c FROM t INNER JOIN u ON t.b = u.b"
        );
    }

    #[test]
    fn test_cte_columns_and_order_by_alias() {
        let body = Select::new()
            .column(Expression::alias(Expression::column("a"), "x"))
            .from(Expression::table("unknown_table"));
        let mut outer = Select::new()
            .column(Expression::alias(Expression::column("x"), "y"))
            .from(Expression::table("cte"));
        outer.order_by = Some(OrderBy {
            expressions: vec![Ordered {
                this: Expression::column("y"),
                desc: false,
                nulls_first: None,
            }],
        });
        outer.with = Some(With {
            ctes: vec![Cte {
                alias: Identifier::new("cte"),
                this: Expression::Select(Box::new(body)),
                lineage: None,
            }],
        });
        let out = qualify_columns(Expression::Select(Box::new(outer)), None).unwrap();
        assert_eq!(
            gen(&out),
            "WITH cte AS (SELECT unknown_table.a AS x FROM unknown_table) SELECT cte.x AS y FROM cte ORDER BY y"
        );
    }
}
