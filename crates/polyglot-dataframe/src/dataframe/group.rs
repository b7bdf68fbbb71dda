//! Grouped aggregation.

use crate::error::{Error, Result};
use crate::expressions::{Expression, GroupBy};

use super::column::{Column, IntoColumn};
use super::dataframe::DataFrame;
use super::functions;
use super::operations::Operation;

/// A plan with grouping keys, waiting for its aggregates.
///
/// ```
/// use polyglot_dataframe::Session;
/// use polyglot_dataframe::dataframe::functions::{col, sum};
///
/// let session = Session::new();
/// session.register_table("sales", &[("region", "STRING"), ("amount", "INT")]).unwrap();
/// let totals = session
///     .table("sales").unwrap()
///     .group_by(["region"]).unwrap()
///     .agg([sum(col("amount")).alias("total")]).unwrap();
/// assert_eq!(totals.columns(), vec!["region", "total"]);
/// ```
#[derive(Debug, Clone)]
pub struct GroupedData<'s> {
    df: DataFrame<'s>,
    keys: Vec<Expression>,
}

impl<'s> GroupedData<'s> {
    pub(crate) fn new(df: DataFrame<'s>, keys: Vec<Expression>) -> Self {
        Self { df, keys }
    }

    /// Project the grouping keys followed by `exprs`, grouped by the keys.
    pub fn agg<I, C>(&self, exprs: I) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let exprs: Vec<Column> = exprs.into_iter().map(IntoColumn::into_column).collect();
        if exprs.is_empty() {
            return Err(Error::policy("agg needs at least one aggregate expression"));
        }
        let keys = self.keys.clone();
        self.df.apply(Operation::Select, |mut df| {
            let grouping: Vec<Expression> = keys
                .iter()
                .map(|k| match k {
                    Expression::Alias(a) => a.this.clone(),
                    other => other.clone(),
                })
                .collect();
            df.select_mut()?.group_by = if grouping.is_empty() {
                None
            } else {
                Some(GroupBy {
                    expressions: grouping,
                })
            };
            let projection = keys.into_iter().map(Column).chain(exprs).collect();
            df.project(projection, false)
        })
    }

    /// `COUNT(*) AS count` per group
    pub fn count(&self) -> Result<DataFrame<'s>> {
        self.agg([functions::count_star().alias("count")])
    }

    pub fn sum(&self, columns: &[&str]) -> Result<DataFrame<'s>> {
        self.simple("sum", columns, |c| functions::sum(c))
    }

    pub fn avg(&self, columns: &[&str]) -> Result<DataFrame<'s>> {
        self.simple("avg", columns, |c| functions::avg(c))
    }

    /// Alias of [`GroupedData::avg`].
    pub fn mean(&self, columns: &[&str]) -> Result<DataFrame<'s>> {
        self.avg(columns)
    }

    pub fn min(&self, columns: &[&str]) -> Result<DataFrame<'s>> {
        self.simple("min", columns, |c| functions::min(c))
    }

    pub fn max(&self, columns: &[&str]) -> Result<DataFrame<'s>> {
        self.simple("max", columns, |c| functions::max(c))
    }

    /// One aggregate per column, named like `sum(amount)`.
    fn simple(&self, name: &str, columns: &[&str], f: fn(Column) -> Column) -> Result<DataFrame<'s>> {
        let aggregates: Vec<Column> = columns
            .iter()
            .map(|c| f(functions::col(c)).alias(&format!("{}({})", name, c)))
            .collect();
        self.agg(aggregates)
    }
}
