//! SQL Expression AST (Abstract Syntax Tree).
//!
//! This module defines the AST node types a DataFrame plan is built from.
//! Nodes form a Rust enum-based AST, reduced to the constructs a
//! relational-algebra plan can produce.
//!
//! # Architecture
//!
//! The central type is [`Expression`], a tagged enum with one variant per SQL
//! construct. Inner structs carry the fields for each variant. Heap-allocated
//! variants are wrapped in `Box` to keep the enum small.
//!
//! | Group | Variants |
//! |---|---|
//! | **Queries** | `Select`, `SetOperation` |
//! | **Statements** | `Insert`, `Create` |
//! | **Operators** | `And`, `Or`, `Add`, `Eq`, `Not`, `IsNull`, ... |
//! | **Literals** | `Literal`, `Boolean`, `Null` |
//! | **Identifiers** | `Identifier`, `Column`, `Table`, `Star` |
//!
//! CTEs carry out-of-band lineage ([`CteLineage`]) that is never rendered;
//! it lets deferred hints and column accessors find a CTE before its final
//! name is known.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::generator::Generator;

/// Represent any SQL expression or statement as a single, recursive AST node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    // Literals
    Literal(Literal),
    Boolean(BooleanLiteral),
    Null(Null),

    // Identifiers
    Identifier(Identifier),
    Column(Column),
    Table(TableRef),
    Star(Star),

    // Queries
    Select(Box<Select>),
    SetOperation(Box<SetOperation>),

    // Statements wrapping a query
    Insert(Box<Insert>),
    Create(Box<CreateTableAs>),

    // Expressions
    Alias(Box<Alias>),
    Cast(Box<Cast>),
    Case(Box<Case>),
    Paren(Box<Paren>),
    Function(Box<Function>),
    Ordered(Box<Ordered>),

    // Binary operations
    And(Box<BinaryOp>),
    Or(Box<BinaryOp>),
    Add(Box<BinaryOp>),
    Sub(Box<BinaryOp>),
    Mul(Box<BinaryOp>),
    Div(Box<BinaryOp>),
    Eq(Box<BinaryOp>),
    Neq(Box<BinaryOp>),
    Lt(Box<BinaryOp>),
    Lte(Box<BinaryOp>),
    Gt(Box<BinaryOp>),
    Gte(Box<BinaryOp>),

    // Unary operations
    Not(Box<UnaryOp>),
    IsNull(Box<UnaryOp>),
}

impl Expression {
    /// Unqualified column reference
    pub fn column(name: impl Into<String>) -> Self {
        Expression::Column(Column::new(name))
    }

    /// Table-qualified column reference
    pub fn qualified_column(table: impl Into<String>, name: impl Into<String>) -> Self {
        Expression::Column(Column::new(name).with_table(table))
    }

    /// Table reference without alias
    pub fn table(name: impl Into<String>) -> Self {
        Expression::Table(TableRef::new(name))
    }

    /// Numeric literal
    pub fn number(value: impl fmt::Display) -> Self {
        Expression::Literal(Literal::Number(value.to_string()))
    }

    /// String literal
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Literal(Literal::String(value.into()))
    }

    pub fn boolean(value: bool) -> Self {
        Expression::Boolean(BooleanLiteral { value })
    }

    pub fn null() -> Self {
        Expression::Null(Null)
    }

    pub fn star() -> Self {
        Expression::Star(Star { table: None })
    }

    /// `this AS alias`
    pub fn alias(this: Expression, alias: impl Into<String>) -> Self {
        Expression::Alias(Box::new(Alias {
            this,
            alias: Identifier::new(alias),
        }))
    }

    /// `CAST(this AS to)`
    pub fn cast(this: Expression, to: DataType) -> Self {
        Expression::Cast(Box::new(Cast { this, to }))
    }

    /// Fold a list of predicates into a left-deep `AND` chain.
    pub fn and_all(conditions: impl IntoIterator<Item = Expression>) -> Option<Expression> {
        conditions.into_iter().reduce(|left, right| {
            Expression::And(Box::new(BinaryOp::new(left, right)))
        })
    }

    /// The output name of a projection.
    ///
    /// Columns and identifiers yield their name, aliases their alias, tables
    /// their alias or name and stars `*`. Anything else has no name and
    /// yields an empty string.
    pub fn alias_or_name(&self) -> &str {
        match self {
            Expression::Column(c) => &c.name.name,
            Expression::Alias(a) => &a.alias.name,
            Expression::Identifier(i) => &i.name,
            Expression::Table(t) => t.alias_or_name(),
            Expression::Star(_) => "*",
            _ => "",
        }
    }

    pub fn is_star(&self) -> bool {
        matches!(self, Expression::Star(_))
    }

    /// Whether this is a query that may own a WITH clause
    pub fn is_query(&self) -> bool {
        matches!(self, Expression::Select(_) | Expression::SetOperation(_))
    }

    pub fn as_select(&self) -> Option<&Select> {
        match self {
            Expression::Select(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_select_mut(&mut self) -> Option<&mut Select> {
        match self {
            Expression::Select(s) => Some(s),
            _ => None,
        }
    }

    /// The query wrapped by this expression: itself for queries, the inner
    /// query for INSERT / CREATE statements.
    pub fn query(&self) -> Option<&Expression> {
        match self {
            Expression::Select(_) | Expression::SetOperation(_) => Some(self),
            Expression::Insert(i) => Some(&i.query),
            Expression::Create(c) => Some(&c.query),
            _ => None,
        }
    }

    pub fn query_mut(&mut self) -> Option<&mut Expression> {
        match self {
            Expression::Select(_) | Expression::SetOperation(_) => Some(self),
            Expression::Insert(i) => Some(&mut i.query),
            Expression::Create(c) => Some(&mut c.query),
            _ => None,
        }
    }

    /// The left-most SELECT of a query, which determines its output columns.
    pub fn leading_select(&self) -> Option<&Select> {
        match self {
            Expression::Select(s) => Some(s),
            Expression::SetOperation(op) => op.left.leading_select(),
            Expression::Insert(_) | Expression::Create(_) => {
                self.query().and_then(|q| q.leading_select())
            }
            _ => None,
        }
    }

    /// The WITH clause owned by this query (or by a statement's inner query).
    pub fn with(&self) -> Option<&With> {
        match self.query()? {
            Expression::Select(s) => s.with.as_ref(),
            Expression::SetOperation(op) => op.with.as_ref(),
            _ => None,
        }
    }

    pub fn with_mut(&mut self) -> Option<&mut Option<With>> {
        match self.query_mut()? {
            Expression::Select(s) => Some(&mut s.with),
            Expression::SetOperation(op) => Some(&mut op.with),
            _ => None,
        }
    }

    /// The CTE list of this query, empty when there is no WITH clause.
    pub fn ctes(&self) -> &[Cte] {
        self.with().map(|w| w.ctes.as_slice()).unwrap_or(&[])
    }

    /// Output column names of the query, `*` for wildcards.
    pub fn named_selects(&self) -> Vec<String> {
        self.leading_select()
            .map(|s| s.named_selects())
            .unwrap_or_default()
    }

    /// Generate SQL using the generic dialect.
    pub fn sql(&self) -> String {
        Generator::sql(self).unwrap_or_default()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// Literal value.
///
/// Numeric values are stored as text so that the rendered form is exactly
/// what the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "literal_type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    /// Single-quoted string literal: `'hello'`
    String(String),
    /// Numeric literal: `42`, `3.14`
    Number(String),
}

/// Boolean literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BooleanLiteral {
    pub value: bool,
}

/// NULL literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Null;

/// A SQL identifier (table name, column name, alias).
///
/// `quoted` forces quoting at generation time; unquoted identifiers are still
/// quoted when they are not safe bare words.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub name: String,
    pub quoted: bool,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: false,
        }
    }

    pub fn quoted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A column reference, optionally qualified by a relation name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: Identifier,
    pub table: Option<Identifier>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Identifier::new(name),
            table: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(Identifier::new(table));
        self
    }
}

/// A table reference with an optional alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Identifier::new(name),
            alias: None,
        }
    }

    /// The name this relation is referenced by inside the query
    pub fn alias_or_name(&self) -> &str {
        self.alias
            .as_ref()
            .map(|a| a.name.as_str())
            .unwrap_or(&self.name.name)
    }
}

/// `*` or `table.*`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Star {
    pub table: Option<Identifier>,
}

/// Represent a SELECT statement.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Select {
    /// The select-list: columns, expressions, aliases and wildcards.
    pub expressions: Vec<Expression>,
    /// The FROM clause.
    pub from: Option<From>,
    /// JOIN clauses applied after the FROM source.
    pub joins: Vec<Join>,
    pub where_clause: Option<Where>,
    pub group_by: Option<GroupBy>,
    pub having: Option<Having>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
    pub distinct: bool,
    pub with: Option<With>,
    /// Planner hints, rendered as `/*+ ... */` where the dialect supports them.
    pub hint: Option<Hint>,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column to select
    pub fn column(mut self, expr: Expression) -> Self {
        self.expressions.push(expr);
        self
    }

    /// Set the FROM clause
    pub fn from(mut self, table: Expression) -> Self {
        self.from = Some(From {
            expressions: vec![table],
        });
        self
    }

    /// Output names of the select-list.
    pub fn named_selects(&self) -> Vec<String> {
        self.expressions
            .iter()
            .map(|e| e.alias_or_name().to_string())
            .collect()
    }

    /// The first FROM source
    pub fn from_relation(&self) -> Option<&Expression> {
        self.from.as_ref().and_then(|f| f.expressions.first())
    }

    /// The name the first FROM source is referenced by
    pub fn from_relation_name(&self) -> Option<&str> {
        match self.from_relation()? {
            Expression::Table(t) => Some(t.alias_or_name()),
            _ => None,
        }
    }

    /// Names of every relation in FROM and JOIN, in query order.
    pub fn source_names(&self) -> Vec<String> {
        let from = self
            .from
            .iter()
            .flat_map(|f| f.expressions.iter())
            .map(|e| e.alias_or_name().to_string());
        let joined = self.joins.iter().map(|j| j.this.alias_or_name().to_string());
        from.chain(joined).filter(|n| !n.is_empty()).collect()
    }

    /// Names of the relations taking part in a join, empty when the query has
    /// no JOIN clause.
    pub fn join_table_names(&self) -> Vec<String> {
        if self.joins.is_empty() {
            return Vec::new();
        }
        self.source_names()
    }

    pub fn ctes(&self) -> &[Cte] {
        self.with.as_ref().map(|w| w.ctes.as_slice()).unwrap_or(&[])
    }
}

/// Represent the FROM clause of a SELECT statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct From {
    pub expressions: Vec<Expression>,
}

/// Represent a JOIN clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    /// The right-hand relation being joined.
    pub this: Expression,
    /// The ON condition; absent for cross joins.
    pub on: Option<Expression>,
    pub kind: JoinKind,
}

/// Supported join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
    LeftSemi,
    LeftAnti,
}

impl JoinKind {
    /// Parse a join kind as accepted by DataFrame APIs (`inner`, `left_outer`,
    /// `fullouter`, `left_semi`, ...). Underscores are treated as spaces.
    pub fn from_name(how: &str) -> Option<Self> {
        let normalized = how.trim().to_lowercase().replace('_', " ");
        let kind = match normalized.as_str() {
            "inner" => JoinKind::Inner,
            "left" | "left outer" | "leftouter" => JoinKind::Left,
            "right" | "right outer" | "rightouter" => JoinKind::Right,
            "full" | "outer" | "full outer" | "fullouter" => JoinKind::Full,
            "cross" => JoinKind::Cross,
            "semi" | "left semi" | "leftsemi" => JoinKind::LeftSemi,
            "anti" | "left anti" | "leftanti" => JoinKind::LeftAnti,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether the right-hand relation contributes output columns
    pub fn projects_right(&self) -> bool {
        !matches!(self, JoinKind::LeftSemi | JoinKind::LeftAnti)
    }

    /// Whether rows of the right relation survive without a left match
    pub fn keeps_unmatched_right(&self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::LeftSemi => "LEFT SEMI JOIN",
            JoinKind::LeftAnti => "LEFT ANTI JOIN",
        }
    }
}

/// WHERE clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Where {
    pub this: Expression,
}

/// GROUP BY clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupBy {
    pub expressions: Vec<Expression>,
}

/// HAVING clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having {
    pub this: Expression,
}

/// ORDER BY clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub expressions: Vec<Ordered>,
}

/// A sort key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ordered {
    pub this: Expression,
    pub desc: bool,
    /// `Some(true)` = NULLS FIRST, `Some(false)` = NULLS LAST
    pub nulls_first: Option<bool>,
}

/// LIMIT clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub this: Expression,
}

/// A WITH clause holding CTE definitions in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct With {
    pub ctes: Vec<Cte>,
}

impl With {
    pub fn contains(&self, name: &str) -> bool {
        self.ctes.iter().any(|c| c.alias.name == name)
    }
}

/// A single Common Table Expression definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cte {
    /// The CTE name.
    pub alias: Identifier,
    /// The CTE body (a SELECT or a set operation).
    pub this: Expression,
    /// Lineage of the plan this CTE was materialized from. Not rendered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<CteLineage>,
}

impl Cte {
    pub fn name(&self) -> &str {
        &self.alias.name
    }

    pub fn branch_id(&self) -> Option<&str> {
        self.lineage.as_ref().map(|l| l.branch_id.as_str())
    }

    pub fn sequence_id(&self) -> Option<&str> {
        self.lineage.as_ref().map(|l| l.sequence_id.as_str())
    }
}

/// Lineage tokens recorded on a CTE at materialization time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CteLineage {
    pub branch_id: String,
    pub sequence_id: String,
}

/// Set operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    Union,
    Intersect,
    Except,
}

impl SetOpKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            SetOpKind::Union => "UNION",
            SetOpKind::Intersect => "INTERSECT",
            SetOpKind::Except => "EXCEPT",
        }
    }
}

/// A binary set operation (`UNION`, `INTERSECT`, `EXCEPT`).
///
/// When `distinct` is false duplicates are preserved (`... ALL`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOperation {
    pub kind: SetOpKind,
    pub left: Expression,
    pub right: Expression,
    pub distinct: bool,
    pub with: Option<With>,
}

/// `INSERT [OVERWRITE TABLE | INTO] table <query>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insert {
    pub table: TableRef,
    pub overwrite: bool,
    pub query: Expression,
}

/// `CREATE [OR REPLACE] TABLE [IF NOT EXISTS] table AS <query>`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTableAs {
    pub table: TableRef,
    pub replace: bool,
    pub if_not_exists: bool,
    pub query: Expression,
}

/// `this AS alias`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub this: Expression,
    pub alias: Identifier,
}

/// `CAST(this AS to)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cast {
    pub this: Expression,
    pub to: DataType,
}

/// Data types that can appear in casts and catalog definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Boolean,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Float,
    Double,
    Decimal {
        precision: Option<u32>,
        scale: Option<u32>,
    },
    String,
    VarChar {
        length: Option<u32>,
    },
    Date,
    Timestamp,
    Binary,
    Custom {
        name: String,
    },
}

impl DataType {
    /// Parse a simple type name such as `INT`, `string` or `DECIMAL(10, 2)`.
    pub fn from_name(name: &str) -> Self {
        let upper = name.trim().to_uppercase();
        let (base, args) = match upper.split_once('(') {
            Some((base, rest)) => (base.trim().to_string(), rest.trim_end_matches(')').to_string()),
            None => (upper.clone(), String::new()),
        };
        let mut numbers = args
            .split(',')
            .filter_map(|part| part.trim().parse::<u32>().ok());
        match base.as_str() {
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            "TINYINT" | "BYTE" => DataType::TinyInt,
            "SMALLINT" | "SHORT" => DataType::SmallInt,
            "INT" | "INTEGER" => DataType::Int,
            "BIGINT" | "LONG" => DataType::BigInt,
            "FLOAT" | "REAL" => DataType::Float,
            "DOUBLE" => DataType::Double,
            "DECIMAL" | "NUMERIC" => DataType::Decimal {
                precision: numbers.next(),
                scale: numbers.next(),
            },
            "STRING" | "TEXT" => DataType::String,
            "VARCHAR" => DataType::VarChar {
                length: numbers.next(),
            },
            "DATE" => DataType::Date,
            "TIMESTAMP" => DataType::Timestamp,
            "BINARY" => DataType::Binary,
            _ => DataType::Custom { name: upper },
        }
    }
}

/// `CASE [WHEN cond THEN result]... [ELSE default] END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub whens: Vec<(Expression, Expression)>,
    pub else_: Option<Expression>,
}

/// `(this)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paren {
    pub this: Expression,
}

/// Generic function call: `NAME([DISTINCT] args...)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub args: Vec<Expression>,
    pub distinct: bool,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Self {
            name: name.into(),
            args,
            distinct: false,
        }
    }
}

/// Binary operator operands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryOp {
    pub left: Expression,
    pub right: Expression,
}

impl BinaryOp {
    pub fn new(left: Expression, right: Expression) -> Self {
        Self { left, right }
    }
}

/// Unary operator operand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryOp {
    pub this: Expression,
}

impl UnaryOp {
    pub fn new(this: Expression) -> Self {
        Self { this }
    }
}

/// Query hint clause
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Hint {
    pub expressions: Vec<HintExpression>,
}

/// Individual planner hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HintExpression {
    /// Join strategy hint targeting relations: `BROADCAST(t1, t2)`
    Join(JoinHint),
    /// Generic hint with arbitrary arguments: `REPARTITION(4, a)`
    Partition(PartitionHint),
}

impl HintExpression {
    pub fn name(&self) -> &str {
        match self {
            HintExpression::Join(h) => &h.name,
            HintExpression::Partition(h) => &h.name,
        }
    }
}

/// Join strategy hint. Targets hold sequence ids or alias names until the hint
/// is resolved, and concrete CTE names afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinHint {
    pub name: String,
    pub targets: Vec<Identifier>,
}

/// Partitioning (or any non-join) hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionHint {
    pub name: String,
    pub args: Vec<Expression>,
}
