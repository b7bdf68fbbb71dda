//! Null handling: `dropna`, `fillna` and `replace`.
//!
//! All three start from a freshly materialized relation and rewrite its
//! projection through the public operations, so the plan they return gates
//! like any other projection. `dropna` needs a filter over a derived column, so it takes
//! three steps (project the null count, filter on it, project the original
//! columns back); the other two are a single projection.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::expressions::{BinaryOp, Case, Expression, UnaryOp};
use crate::helper::find_new_name;

use super::column::{Column, Value};
use super::dataframe::DataFrame;
use super::functions::{col, lit};
use super::operations::Operation;

/// Which rows `dropna` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropHow {
    /// Rows with a NULL in any checked column
    #[default]
    Any,
    /// Rows where every checked column is NULL
    All,
}

impl DropHow {
    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "any" => Ok(DropHow::Any),
            "all" => Ok(DropHow::All),
            other => Err(Error::policy(format!(
                "dropna how must be 'any' or 'all', got '{}'",
                other
            ))),
        }
    }
}

/// Replacement for NULL cells
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    /// One value for every targeted column
    Scalar(Value),
    /// Per-column values; the subset argument is ignored
    Map(Vec<(String, Value)>),
}

impl FillValue {
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        FillValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Value> for FillValue {
    fn from(value: Value) -> Self {
        FillValue::Scalar(value)
    }
}

impl From<i64> for FillValue {
    fn from(value: i64) -> Self {
        FillValue::Scalar(value.into())
    }
}

impl From<i32> for FillValue {
    fn from(value: i32) -> Self {
        FillValue::Scalar(value.into())
    }
}

impl From<f64> for FillValue {
    fn from(value: f64) -> Self {
        FillValue::Scalar(value.into())
    }
}

impl From<bool> for FillValue {
    fn from(value: bool) -> Self {
        FillValue::Scalar(value.into())
    }
}

impl From<&str> for FillValue {
    fn from(value: &str) -> Self {
        FillValue::Scalar(value.into())
    }
}

/// Old/new value pairs for `replace`
#[derive(Debug, Clone, PartialEq)]
pub enum Replacement {
    Single(Value, Value),
    /// Element-wise pairs; both lists must have the same length
    Lists(Vec<Value>, Vec<Value>),
    /// Every listed value becomes the same new value
    ListToValue(Vec<Value>, Value),
    Map(Vec<(Value, Value)>),
}

impl Replacement {
    fn into_pairs(self) -> Result<Vec<(Value, Value)>> {
        let pairs = match self {
            Replacement::Single(old, new) => vec![(old, new)],
            Replacement::Lists(old, new) => {
                if old.len() != new.len() {
                    return Err(Error::policy(format!(
                        "replace lists differ in length: {} values to replace, {} replacements",
                        old.len(),
                        new.len()
                    )));
                }
                old.into_iter().zip(new).collect()
            }
            Replacement::ListToValue(old, new) => {
                old.into_iter().map(|o| (o, new.clone())).collect()
            }
            Replacement::Map(pairs) => pairs,
        };
        if pairs.is_empty() {
            return Err(Error::policy("replace needs at least one value to replace"));
        }
        Ok(pairs)
    }
}

/// One slot of the current projection
struct Output {
    name: String,
    /// The projected expression without its alias
    value: Expression,
    projection: Expression,
}

fn outputs(df: &DataFrame<'_>) -> Result<Vec<Output>> {
    let select = df.select_ref()?;
    if select.expressions.iter().any(Expression::is_star) {
        return Err(Error::validation(
            "null handling needs explicit columns; the plan projects *",
        ));
    }
    Ok(select
        .expressions
        .iter()
        .map(|e| Output {
            name: e.alias_or_name().to_string(),
            value: match e {
                Expression::Alias(a) => a.this.clone(),
                other => other.clone(),
            },
            projection: e.clone(),
        })
        .collect())
}

fn target_names(outputs: &[Output], subset: Option<&[String]>) -> Result<Vec<String>> {
    match subset {
        None => Ok(outputs.iter().map(|o| o.name.clone()).collect()),
        Some(names) => {
            for name in names {
                if !outputs.iter().any(|o| &o.name == name) {
                    return Err(Error::validation(format!("column {} does not exist", name)));
                }
            }
            Ok(names.to_vec())
        }
    }
}

fn is_null(value: Expression) -> Expression {
    Expression::IsNull(Box::new(UnaryOp::new(value)))
}

fn case(whens: Vec<(Expression, Expression)>, else_: Expression) -> Expression {
    Expression::Case(Box::new(Case {
        whens,
        else_: Some(else_),
    }))
}

fn owned(subset: Option<&[&str]>) -> Option<Vec<String>> {
    subset.map(|s| s.iter().map(|c| c.to_string()).collect())
}

impl<'s> DataFrame<'s> {
    /// Remove rows with NULLs in the checked columns.
    ///
    /// With `thresh`, a row is kept when it has at least `thresh` non-null
    /// values among the checked columns and `how` is ignored.
    pub fn dropna(&self, how: DropHow, thresh: Option<usize>, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        let subset = owned(subset);
        self.apply_chained(Operation::From, |df| {
            let outputs = outputs(&df)?;
            let targets = target_names(&outputs, subset.as_deref())?;
            if targets.is_empty() {
                return Err(Error::policy("dropna needs at least one column to check"));
            }
            let size = targets.len() as i64;
            let min_nulls = match (thresh, how) {
                (Some(thresh), _) => size - thresh as i64 + 1,
                (None, DropHow::Any) => 1,
                (None, DropHow::All) => size,
            };
            if min_nulls > size {
                return Err(Error::policy(format!(
                    "dropna would need {} NULLs among {} columns to drop a row",
                    min_nulls, size
                )));
            }

            let taken: HashSet<String> = outputs.iter().map(|o| o.name.clone()).collect();
            let helper = find_new_name(&taken, "num_nulls");
            let null_count = targets
                .iter()
                .filter_map(|name| outputs.iter().find(|o| &o.name == name))
                .map(|o| {
                    case(
                        vec![(is_null(o.value.clone()), Expression::number(1))],
                        Expression::number(0),
                    )
                })
                .reduce(|acc, e| Expression::Add(Box::new(BinaryOp::new(acc, e))))
                .unwrap_or_else(|| Expression::number(0));

            let mut projection: Vec<Column> = outputs.iter().map(|o| Column(o.projection.clone())).collect();
            projection.push(Column(Expression::alias(null_count, helper.as_str())));
            let names: Vec<&str> = outputs.iter().map(|o| o.name.as_str()).collect();

            df.select(projection)?
                .where_(col(&helper).lt(lit(min_nulls)))?
                .select(names)
        })
    }

    /// Replace NULL cells of the targeted columns with a literal.
    ///
    /// A literal whose type does not fit the column's known type is cast to
    /// it.
    pub fn fillna(&self, value: impl Into<FillValue>, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        let value = value.into();
        let subset = owned(subset);
        self.apply_chained(Operation::From, |df| {
            let outputs = outputs(&df)?;
            let fills: Vec<(String, Value)> = match value {
                FillValue::Map(pairs) => {
                    let names: Vec<String> = pairs.iter().map(|(n, _)| n.clone()).collect();
                    target_names(&outputs, Some(names.as_slice()))?;
                    pairs
                }
                FillValue::Scalar(v) => target_names(&outputs, subset.as_deref())?
                    .into_iter()
                    .map(|name| (name, v.clone()))
                    .collect(),
            };
            if fills.iter().any(|(_, v)| v.is_null()) {
                return Err(Error::policy("fillna value cannot be NULL"));
            }

            let mut projection = Vec::with_capacity(outputs.len());
            for output in &outputs {
                let Some((_, fill)) = fills.iter().find(|(n, _)| n == &output.name) else {
                    projection.push(Column(output.projection.clone()));
                    continue;
                };
                let mut replacement = fill.to_expression();
                if let Some(ty) = df.infer_column_type(&output.name) {
                    if !fill.fits(&ty) {
                        replacement = Expression::cast(replacement, ty);
                    }
                }
                let filled = case(
                    vec![(is_null(output.value.clone()), replacement)],
                    output.value.clone(),
                );
                projection.push(Column(Expression::alias(filled, output.name.as_str())));
            }

            df.select(projection)
        })
    }

    /// Replace literal values in the targeted columns. Cells matching no
    /// pair keep their value.
    pub fn replace(&self, replacement: Replacement, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        let pairs = replacement.into_pairs()?;
        let subset = owned(subset);
        self.apply_chained(Operation::From, |df| {
            let outputs = outputs(&df)?;
            let targets = target_names(&outputs, subset.as_deref())?;

            let projection: Vec<Column> = outputs
                .iter()
                .map(|output| {
                    if !targets.contains(&output.name) {
                        return Column(output.projection.clone());
                    }
                    let whens = pairs
                        .iter()
                        .map(|(old, new)| {
                            let matches = if old.is_null() {
                                is_null(output.value.clone())
                            } else {
                                Expression::Eq(Box::new(BinaryOp::new(
                                    output.value.clone(),
                                    old.to_expression(),
                                )))
                            };
                            (matches, new.to_expression())
                        })
                        .collect();
                    Column(Expression::alias(
                        case(whens, output.value.clone()),
                        output.name.as_str(),
                    ))
                })
                .collect();

            df.select(projection)
        })
    }
}

/// Null-handling entry points reached through [`DataFrame::na`].
pub struct NaFunctions<'a, 's> {
    df: &'a DataFrame<'s>,
}

impl<'a, 's> NaFunctions<'a, 's> {
    pub(crate) fn new(df: &'a DataFrame<'s>) -> Self {
        Self { df }
    }

    pub fn drop(&self, how: DropHow, thresh: Option<usize>, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        self.df.dropna(how, thresh, subset)
    }

    pub fn fill(&self, value: impl Into<FillValue>, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        self.df.fillna(value, subset)
    }

    pub fn replace(&self, replacement: Replacement, subset: Option<&[&str]>) -> Result<DataFrame<'s>> {
        self.df.replace(replacement, subset)
    }
}
