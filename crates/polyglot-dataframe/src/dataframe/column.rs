//! Column expressions for the DataFrame API.
//!
//! [`Column`] wraps an [`Expression`] and exposes operator methods (`.eq()`,
//! `.gt()`, `.and()`, `.is_null()`, ...) so predicates and projections can be
//! built without constructing AST nodes by hand. [`IntoColumn`] lets `&str`
//! column names be passed wherever a column is expected, and [`Value`] holds
//! the literal values used by `lit`, `fillna` and `replace`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::expressions::{BinaryOp, DataType, Expression, Identifier, Literal, Ordered, Star, UnaryOp};

/// A column expression: a reference, literal, operator tree or aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Column(pub Expression);

impl Column {
    /// Consume the wrapper, returning the inner [`Expression`].
    pub fn into_inner(self) -> Expression {
        self.0
    }

    pub fn expression(&self) -> &Expression {
        &self.0
    }

    /// Output name of this column, empty for unnamed expressions.
    pub fn alias_or_name(&self) -> &str {
        match &self.0 {
            Expression::Ordered(o) => o.this.alias_or_name(),
            other => other.alias_or_name(),
        }
    }

    /// Generate a generic-dialect SQL string for this column.
    pub fn to_sql(&self) -> String {
        self.0.sql()
    }

    fn binary(self, other: impl IntoColumn, f: fn(Box<BinaryOp>) -> Expression) -> Column {
        Column(f(Box::new(BinaryOp::new(self.0, other.into_column().0))))
    }

    // -- Comparison operators ------------------------------------------------

    pub fn eq(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Eq)
    }

    pub fn neq(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Neq)
    }

    pub fn lt(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Lt)
    }

    pub fn lte(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Lte)
    }

    pub fn gt(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Gt)
    }

    pub fn gte(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Gte)
    }

    // -- Logical operators ---------------------------------------------------

    pub fn and(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::And)
    }

    pub fn or(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Or)
    }

    pub fn not(self) -> Column {
        Column(Expression::Not(Box::new(UnaryOp::new(self.0))))
    }

    // -- Arithmetic ----------------------------------------------------------

    pub fn add(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Add)
    }

    pub fn sub(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Sub)
    }

    pub fn mul(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Mul)
    }

    pub fn div(self, other: impl IntoColumn) -> Column {
        self.binary(other, Expression::Div)
    }

    // -- Predicates ----------------------------------------------------------

    /// `self IS NULL`
    pub fn is_null(self) -> Column {
        Column(Expression::IsNull(Box::new(UnaryOp::new(self.0))))
    }

    /// `NOT self IS NULL`
    pub fn is_not_null(self) -> Column {
        self.is_null().not()
    }

    // -- Naming, casting and ordering ----------------------------------------

    /// `self AS name`. Re-aliasing replaces the previous alias.
    pub fn alias(self, name: &str) -> Column {
        match self.0 {
            Expression::Alias(mut a) => {
                a.alias = Identifier::new(name);
                Column(Expression::Alias(a))
            }
            other => Column(Expression::alias(other, name)),
        }
    }

    /// `CAST(self AS to)`, where `to` is a type name such as `"INT"` or `"DECIMAL(10, 2)"`.
    pub fn cast(self, to: &str) -> Column {
        Column(Expression::cast(self.0, DataType::from_name(to)))
    }

    pub fn asc(self) -> Column {
        self.ordered(false, None)
    }

    pub fn desc(self) -> Column {
        self.ordered(true, None)
    }

    pub fn asc_nulls_last(self) -> Column {
        self.ordered(false, Some(false))
    }

    pub fn desc_nulls_first(self) -> Column {
        self.ordered(true, Some(true))
    }

    fn ordered(self, desc: bool, nulls_first: Option<bool>) -> Column {
        let this = match self.0 {
            Expression::Ordered(o) => o.this,
            other => other,
        };
        Column(Expression::Ordered(Box::new(Ordered {
            this,
            desc,
            nulls_first,
        })))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_sql())
    }
}

impl From<Expression> for Column {
    fn from(expr: Expression) -> Self {
        Column(expr)
    }
}

/// Parse a column name such as `a`, `t.a`, `*` or `t.*` into a reference.
pub(crate) fn column_reference(name: &str) -> Expression {
    let (table, column) = match name.rsplit_once('.') {
        Some((table, column)) => (Some(table), column),
        None => (None, name),
    };
    if column == "*" {
        return Expression::Star(Star {
            table: table.map(Identifier::new),
        });
    }
    match table {
        Some(table) => Expression::qualified_column(table, column),
        None => Expression::column(column),
    }
}

/// Conversion into a [`Column`]. Strings are treated as column names.
pub trait IntoColumn {
    fn into_column(self) -> Column;
}

impl IntoColumn for Column {
    fn into_column(self) -> Column {
        self
    }
}

impl IntoColumn for &Column {
    fn into_column(self) -> Column {
        self.clone()
    }
}

impl IntoColumn for &str {
    fn into_column(self) -> Column {
        Column(column_reference(self))
    }
}

impl IntoColumn for String {
    fn into_column(self) -> Column {
        Column(column_reference(&self))
    }
}

impl IntoColumn for &String {
    fn into_column(self) -> Column {
        Column(column_reference(self))
    }
}

impl IntoColumn for Expression {
    fn into_column(self) -> Column {
        Column(self)
    }
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_expression(&self) -> Expression {
        match self {
            Value::Null => Expression::null(),
            Value::Boolean(b) => Expression::boolean(*b),
            Value::Integer(i) => Expression::number(i),
            Value::Float(f) if f.is_finite() => {
                Expression::Literal(Literal::Number(format!("{:?}", f)))
            }
            // No bare literal exists for these; the engine parses the string form.
            Value::Float(f) => {
                let text = if f.is_nan() {
                    "NaN"
                } else if *f > 0.0 {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                Expression::cast(Expression::string(text), DataType::Double)
            }
            Value::String(s) => Expression::string(s.clone()),
        }
    }

    /// The type a bare literal of this value would have
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::BigInt),
            Value::Float(_) => Some(DataType::Double),
            Value::String(_) => Some(DataType::String),
        }
    }

    /// Whether a literal of this value can stand in a column of type `ty`
    /// without a cast.
    pub fn fits(&self, ty: &DataType) -> bool {
        let numeric = matches!(
            ty,
            DataType::TinyInt
                | DataType::SmallInt
                | DataType::Int
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
                | DataType::Decimal { .. }
        );
        let textual = matches!(ty, DataType::String | DataType::VarChar { .. });
        match self {
            Value::Null => true,
            Value::Boolean(_) => matches!(ty, DataType::Boolean),
            Value::Integer(_) | Value::Float(_) => numeric,
            Value::String(_) => textual,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
