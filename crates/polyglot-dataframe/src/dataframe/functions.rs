//! Column functions: references, literals, conditionals and aggregates.
//!
//! ```
//! use polyglot_dataframe::dataframe::functions::{col, lit, sum, when};
//!
//! let bonus = when(col("age").gt(lit(40)), lit(100)).otherwise(lit(0));
//! assert_eq!(bonus.to_sql(), "CASE WHEN age > 40 THEN 100 ELSE 0 END");
//! assert_eq!(sum(col("salary")).to_sql(), "SUM(salary)");
//! ```

use crate::expressions::{Case, Expression, Function};

use super::column::{column_reference, Column, IntoColumn, Value};

/// Reference a column by name (`a`, `t.a`, `*`).
pub fn col(name: &str) -> Column {
    Column(column_reference(name))
}

/// A literal value.
pub fn lit(value: impl Into<Value>) -> Column {
    Column(value.into().to_expression())
}

/// The `NULL` literal.
pub fn null() -> Column {
    Column(Expression::null())
}

fn func(name: &str, args: Vec<Expression>) -> Column {
    Column(Expression::Function(Box::new(Function::new(name, args))))
}

/// `COUNT(col)`
pub fn count(column: impl IntoColumn) -> Column {
    func("COUNT", vec![column.into_column().into_inner()])
}

/// `COUNT(*)`
pub fn count_star() -> Column {
    func("COUNT", vec![Expression::star()])
}

/// `COUNT(DISTINCT col)`
pub fn count_distinct(column: impl IntoColumn) -> Column {
    let mut f = Function::new("COUNT", vec![column.into_column().into_inner()]);
    f.distinct = true;
    Column(Expression::Function(Box::new(f)))
}

pub fn sum(column: impl IntoColumn) -> Column {
    func("SUM", vec![column.into_column().into_inner()])
}

pub fn avg(column: impl IntoColumn) -> Column {
    func("AVG", vec![column.into_column().into_inner()])
}

/// Alias of [`avg`].
pub fn mean(column: impl IntoColumn) -> Column {
    avg(column)
}

pub fn min(column: impl IntoColumn) -> Column {
    func("MIN", vec![column.into_column().into_inner()])
}

pub fn max(column: impl IntoColumn) -> Column {
    func("MAX", vec![column.into_column().into_inner()])
}

pub fn upper(column: impl IntoColumn) -> Column {
    func("UPPER", vec![column.into_column().into_inner()])
}

pub fn lower(column: impl IntoColumn) -> Column {
    func("LOWER", vec![column.into_column().into_inner()])
}

pub fn abs(column: impl IntoColumn) -> Column {
    func("ABS", vec![column.into_column().into_inner()])
}

/// `COALESCE(a, b, ...)`
pub fn coalesce<I, C>(columns: I) -> Column
where
    I: IntoIterator<Item = C>,
    C: IntoColumn,
{
    func(
        "COALESCE",
        columns.into_iter().map(|c| c.into_column().into_inner()).collect(),
    )
}

/// Start a `CASE WHEN` expression.
pub fn when(condition: impl IntoColumn, value: impl IntoColumn) -> When {
    When {
        whens: vec![(condition.into_column().into_inner(), value.into_column().into_inner())],
    }
}

/// Builder for `CASE WHEN ... THEN ... [ELSE ...] END`
#[derive(Debug, Clone)]
pub struct When {
    whens: Vec<(Expression, Expression)>,
}

impl When {
    /// Add another `WHEN condition THEN value` branch.
    pub fn when(mut self, condition: impl IntoColumn, value: impl IntoColumn) -> Self {
        self.whens
            .push((condition.into_column().into_inner(), value.into_column().into_inner()));
        self
    }

    /// Close the expression with an `ELSE` branch.
    pub fn otherwise(self, value: impl IntoColumn) -> Column {
        Column(Expression::Case(Box::new(Case {
            whens: self.whens,
            else_: Some(value.into_column().into_inner()),
        })))
    }

    /// Close the expression without an `ELSE` branch.
    pub fn end(self) -> Column {
        Column(Expression::Case(Box::new(Case {
            whens: self.whens,
            else_: None,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregates() {
        assert_eq!(count_star().to_sql(), "COUNT(*)");
        assert_eq!(count_distinct("a").to_sql(), "COUNT(DISTINCT a)");
        assert_eq!(max("t.a").to_sql(), "MAX(t.a)");
        assert_eq!(coalesce(["a", "b"]).to_sql(), "COALESCE(a, b)");
    }

    #[test]
    fn test_when_chain() {
        let c = when(col("a").eq(lit(1)), lit("one"))
            .when(col("a").eq(lit(2)), lit("two"))
            .end();
        assert_eq!(
            c.to_sql(),
            "CASE WHEN a = 1 THEN 'one' WHEN a = 2 THEN 'two' END"
        );
    }
}
