//! SQL generation from an [`Expression`] tree.
//!
//! The generator walks the AST and renders dialect-specific SQL text. It
//! supports a compact single-line form and a pretty form with one clause per
//! line and two-space indentation.
//!
//! ```
//! use polyglot_dataframe::expressions::{Expression, Select};
//! use polyglot_dataframe::generator::Generator;
//!
//! let select = Select::new()
//!     .column(Expression::column("a"))
//!     .from(Expression::table("t"));
//! let sql = Generator::sql(&Expression::Select(Box::new(select))).unwrap();
//! assert_eq!(sql, "SELECT a FROM t");
//! ```

use once_cell::sync::Lazy;
use std::collections::HashSet;

use crate::dialects::{Dialect, DialectType};
use crate::error::{Error, Result};
use crate::expressions::*;
use crate::helper::is_safe_identifier;

const INDENT: &str = "  ";

static RESERVED_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ALL", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CREATE", "CROSS",
        "CURRENT_DATE", "CURRENT_TIMESTAMP", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
        "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FOR", "FROM", "FULL", "GROUP", "HAVING",
        "IF", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE",
        "LIMIT", "NATURAL", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "RIGHT", "SELECT",
        "SET", "TABLE", "THEN", "TO", "TRUE", "UNION", "UPDATE", "USING", "VALUES", "WHEN",
        "WHERE", "WITH",
    ]
    .iter()
    .copied()
    .collect()
});

/// Settings controlling SQL rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Target dialect
    pub dialect: DialectType,
    /// Render one clause per line with indentation
    pub pretty: bool,
    /// Quote every identifier, not only those that need it
    pub identify: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dialect: DialectType::Generic,
            pretty: false,
            identify: false,
        }
    }
}

/// SQL generator
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    dialect: Dialect,
}

impl Default for Generator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator {
    /// Generator for the generic dialect, compact output
    pub fn new() -> Self {
        Self::with_config(GeneratorConfig::default())
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            dialect: Dialect::get(config.dialect),
            config,
        }
    }

    /// Render `expr` with the generic dialect.
    pub fn sql(expr: &Expression) -> Result<String> {
        Self::new().generate(expr)
    }

    pub fn generate(&self, expr: &Expression) -> Result<String> {
        self.gen(expr)
    }

    fn pretty(&self) -> bool {
        self.config.pretty
    }

    fn gen(&self, expr: &Expression) -> Result<String> {
        match expr {
            Expression::Literal(Literal::String(s)) => Ok(self.quote_string(s)),
            Expression::Literal(Literal::Number(n)) => {
                if n.is_empty() {
                    return Err(Error::generate("empty numeric literal"));
                }
                Ok(n.clone())
            }
            Expression::Boolean(b) => Ok(if b.value { "TRUE" } else { "FALSE" }.to_string()),
            Expression::Null(_) => Ok("NULL".to_string()),
            Expression::Identifier(i) => self.identifier(i),
            Expression::Column(c) => match &c.table {
                Some(table) => Ok(format!("{}.{}", self.identifier(table)?, self.identifier(&c.name)?)),
                None => self.identifier(&c.name),
            },
            Expression::Table(t) => self.table(t),
            Expression::Star(s) => match &s.table {
                Some(table) => Ok(format!("{}.*", self.identifier(table)?)),
                None => Ok("*".to_string()),
            },
            Expression::Select(s) => self.select(s),
            Expression::SetOperation(op) => self.set_operation(op),
            Expression::Insert(i) => {
                let head = if i.overwrite {
                    format!("INSERT OVERWRITE TABLE {}", self.table(&i.table)?)
                } else {
                    format!("INSERT INTO {}", self.table(&i.table)?)
                };
                Ok(format!("{}{}{}", head, self.sep(), self.gen(&i.query)?))
            }
            Expression::Create(c) => {
                let mut head = String::from("CREATE ");
                if c.replace {
                    head.push_str("OR REPLACE ");
                }
                head.push_str("TABLE ");
                if c.if_not_exists {
                    head.push_str("IF NOT EXISTS ");
                }
                head.push_str(&self.table(&c.table)?);
                Ok(format!("{} AS{}{}", head, self.sep(), self.gen(&c.query)?))
            }
            Expression::Alias(a) => Ok(format!(
                "{} AS {}",
                self.gen(&a.this)?,
                self.identifier(&a.alias)?
            )),
            Expression::Cast(c) => Ok(format!(
                "CAST({} AS {})",
                self.gen(&c.this)?,
                self.dialect.type_name(&c.to)
            )),
            Expression::Case(c) => {
                let mut out = String::from("CASE");
                for (cond, result) in &c.whens {
                    out.push_str(&format!(" WHEN {} THEN {}", self.gen(cond)?, self.gen(result)?));
                }
                if let Some(default) = &c.else_ {
                    out.push_str(&format!(" ELSE {}", self.gen(default)?));
                }
                out.push_str(" END");
                Ok(out)
            }
            Expression::Paren(p) => Ok(format!("({})", self.gen(&p.this)?)),
            Expression::Function(f) => {
                let args = self.list(&f.args, ", ")?;
                let distinct = if f.distinct { "DISTINCT " } else { "" };
                Ok(format!("{}({}{})", f.name.to_uppercase(), distinct, args))
            }
            Expression::Ordered(o) => self.ordered(o),
            Expression::And(op) => self.binary(expr, op, "AND"),
            Expression::Or(op) => self.binary(expr, op, "OR"),
            Expression::Add(op) => self.binary(expr, op, "+"),
            Expression::Sub(op) => self.binary(expr, op, "-"),
            Expression::Mul(op) => self.binary(expr, op, "*"),
            Expression::Div(op) => self.binary(expr, op, "/"),
            Expression::Eq(op) => self.binary(expr, op, "="),
            Expression::Neq(op) => self.binary(expr, op, "<>"),
            Expression::Lt(op) => self.binary(expr, op, "<"),
            Expression::Lte(op) => self.binary(expr, op, "<="),
            Expression::Gt(op) => self.binary(expr, op, ">"),
            Expression::Gte(op) => self.binary(expr, op, ">="),
            Expression::Not(op) => Ok(format!("NOT {}", self.operand(&op.this, precedence(expr), false)?)),
            Expression::IsNull(op) => Ok(format!(
                "{} IS NULL",
                self.operand(&op.this, precedence(expr), true)?
            )),
        }
    }

    fn sep(&self) -> &'static str {
        if self.pretty() {
            "\n"
        } else {
            " "
        }
    }

    fn list(&self, exprs: &[Expression], separator: &str) -> Result<String> {
        let parts = exprs.iter().map(|e| self.gen(e)).collect::<Result<Vec<_>>>()?;
        Ok(parts.join(separator))
    }

    fn identifier(&self, ident: &Identifier) -> Result<String> {
        if ident.name.is_empty() {
            return Err(Error::generate("empty identifier"));
        }
        let needs_quotes = self.config.identify
            || ident.quoted
            || !is_safe_identifier(&ident.name)
            || RESERVED_WORDS.contains(ident.name.to_uppercase().as_str());
        if !needs_quotes {
            return Ok(ident.name.clone());
        }
        let q = self.dialect.identifier_quote;
        let escaped = ident.name.replace(q, &format!("{}{}", q, q));
        Ok(format!("{}{}{}", q, escaped, q))
    }

    fn quote_string(&self, value: &str) -> String {
        let escaped = if self.dialect.backslash_escapes {
            value.replace('\\', "\\\\").replace('\'', "\\'")
        } else {
            value.replace('\'', "''")
        };
        format!("'{}'", escaped)
    }

    fn table(&self, table: &TableRef) -> Result<String> {
        let name = self.identifier(&table.name)?;
        match &table.alias {
            Some(alias) => Ok(format!("{} AS {}", name, self.identifier(alias)?)),
            None => Ok(name),
        }
    }

    fn source(&self, expr: &Expression) -> Result<String> {
        if expr.is_query() {
            Ok(format!("({})", self.gen(expr)?))
        } else {
            self.gen(expr)
        }
    }

    fn ordered(&self, o: &Ordered) -> Result<String> {
        let mut out = self.gen(&o.this)?;
        if o.desc {
            out.push_str(" DESC");
        }
        match o.nulls_first {
            Some(true) => out.push_str(" NULLS FIRST"),
            Some(false) => out.push_str(" NULLS LAST"),
            None => {}
        }
        Ok(out)
    }

    fn binary(&self, parent: &Expression, op: &BinaryOp, symbol: &str) -> Result<String> {
        let prec = precedence(parent);
        let associative = matches!(
            parent,
            Expression::And(_) | Expression::Or(_) | Expression::Add(_) | Expression::Mul(_)
        );
        let left = self.operand(&op.left, prec, !associative && prec == COMPARISON)?;
        let right = self.operand(&op.right, prec, !associative)?;
        Ok(format!("{} {} {}", left, symbol, right))
    }

    /// Render a child operand, wrapping it in parentheses when it binds
    /// looser than its parent (or equally, when `strict` is set).
    fn operand(&self, child: &Expression, parent_prec: u8, strict: bool) -> Result<String> {
        let child_prec = precedence(child);
        let sql = self.gen(child)?;
        if child_prec < parent_prec || (strict && child_prec == parent_prec) {
            Ok(format!("({})", sql))
        } else {
            Ok(sql)
        }
    }

    fn hint(&self, hint: &Hint) -> Result<Option<String>> {
        if !self.dialect.supports_hints || hint.expressions.is_empty() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(hint.expressions.len());
        for h in &hint.expressions {
            let args = match h {
                HintExpression::Join(j) => j
                    .targets
                    .iter()
                    .map(|t| self.identifier(t))
                    .collect::<Result<Vec<_>>>()?
                    .join(", "),
                HintExpression::Partition(p) => self.list(&p.args, ", ")?,
            };
            parts.push(format!("{}({})", h.name().to_uppercase(), args));
        }
        Ok(Some(format!("/*+ {} */", parts.join(", "))))
    }

    fn with(&self, with: &Option<With>) -> Result<String> {
        let ctes = match with {
            Some(w) if !w.ctes.is_empty() => &w.ctes,
            _ => return Ok(String::new()),
        };
        let mut parts = Vec::with_capacity(ctes.len());
        for cte in ctes {
            let name = self.identifier(&cte.alias)?;
            let body = self.gen(&cte.this)?;
            if self.pretty() {
                parts.push(format!("{} AS (\n{}\n)", name, indent(&body)));
            } else {
                parts.push(format!("{} AS ({})", name, body));
            }
        }
        Ok(format!("WITH {}{}", parts.join(", "), self.sep()))
    }

    fn select(&self, s: &Select) -> Result<String> {
        let pretty = self.pretty();
        let mut out = self.with(&s.with)?;

        out.push_str("SELECT");
        if let Some(hint) = &s.hint {
            if let Some(h) = self.hint(hint)? {
                out.push(' ');
                out.push_str(&h);
            }
        }
        if s.distinct {
            out.push_str(" DISTINCT");
        }
        if pretty {
            out.push('\n');
            out.push_str(&indent(&self.list(&s.expressions, ",\n")?));
        } else {
            out.push(' ');
            out.push_str(&self.list(&s.expressions, ", ")?);
        }

        let sep = self.sep();
        if let Some(from) = &s.from {
            let sources = from
                .expressions
                .iter()
                .map(|e| self.source(e))
                .collect::<Result<Vec<_>>>()?;
            out.push_str(&format!("{}FROM {}", sep, sources.join(", ")));
        }
        for join in &s.joins {
            out.push_str(&format!("{}{} {}", sep, join.kind.keyword(), self.source(&join.this)?));
            if let Some(on) = &join.on {
                let on = self.gen(on)?;
                if pretty {
                    out.push_str(&format!("\n{}ON {}", INDENT, on));
                } else {
                    out.push_str(&format!(" ON {}", on));
                }
            }
        }
        if let Some(w) = &s.where_clause {
            out.push_str(&self.clause("WHERE", &self.gen(&w.this)?));
        }
        if let Some(g) = &s.group_by {
            let joined = if pretty { ",\n" } else { ", " };
            out.push_str(&self.clause("GROUP BY", &self.list(&g.expressions, joined)?));
        }
        if let Some(h) = &s.having {
            out.push_str(&self.clause("HAVING", &self.gen(&h.this)?));
        }
        if let Some(o) = &s.order_by {
            let keys = o
                .expressions
                .iter()
                .map(|k| self.ordered(k))
                .collect::<Result<Vec<_>>>()?;
            let joined = if pretty { ",\n" } else { ", " };
            out.push_str(&self.clause("ORDER BY", &keys.join(joined)));
        }
        if let Some(l) = &s.limit {
            out.push_str(&format!("{}LIMIT {}", sep, self.gen(&l.this)?));
        }
        Ok(out)
    }

    fn clause(&self, keyword: &str, body: &str) -> String {
        if self.pretty() {
            format!("\n{}\n{}", keyword, indent(body))
        } else {
            format!(" {} {}", keyword, body)
        }
    }

    fn set_operation(&self, op: &SetOperation) -> Result<String> {
        let keyword = match (op.kind, op.distinct) {
            (kind, true) => kind.keyword().to_string(),
            (kind, false) => format!("{} ALL", kind.keyword()),
        };
        let left = self.gen(&op.left)?;
        let right = match &op.right {
            Expression::SetOperation(_) => format!("({})", self.gen(&op.right)?),
            other => self.gen(other)?,
        };
        let with = self.with(&op.with)?;
        let sep = self.sep();
        Ok(format!("{}{}{}{}{}{}", with, left, sep, keyword, sep, right))
    }
}

const COMPARISON: u8 = 4;

fn precedence(expr: &Expression) -> u8 {
    match expr {
        Expression::Or(_) => 1,
        Expression::And(_) => 2,
        Expression::Not(_) => 3,
        Expression::Eq(_)
        | Expression::Neq(_)
        | Expression::Lt(_)
        | Expression::Lte(_)
        | Expression::Gt(_)
        | Expression::Gte(_)
        | Expression::IsNull(_) => COMPARISON,
        Expression::Add(_) | Expression::Sub(_) => 5,
        Expression::Mul(_) | Expression::Div(_) => 6,
        _ => 7,
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{}{}", INDENT, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spark(pretty: bool, identify: bool) -> Generator {
        Generator::with_config(GeneratorConfig {
            dialect: DialectType::Spark,
            pretty,
            identify,
        })
    }

    fn binary(f: fn(Box<BinaryOp>) -> Expression, l: Expression, r: Expression) -> Expression {
        f(Box::new(BinaryOp::new(l, r)))
    }

    fn simple_select() -> Select {
        let mut select = Select::new()
            .column(Expression::column("a"))
            .column(Expression::alias(Expression::column("b"), "c"))
            .from(Expression::table("t"));
        select.where_clause = Some(Where {
            this: binary(Expression::Gt, Expression::column("a"), Expression::number(1)),
        });
        select
    }

    #[test]
    fn test_compact_select() {
        let sql = Generator::sql(&Expression::Select(Box::new(simple_select()))).unwrap();
        assert_eq!(sql, "SELECT a, b AS c FROM t WHERE a > 1");
    }

    #[test]
    fn test_pretty_select_with_cte() {
        let mut outer = Select::new()
            .column(Expression::column("a"))
            .from(Expression::table("x"));
        outer.with = Some(With {
            ctes: vec![Cte {
                alias: Identifier::new("x"),
                this: Expression::Select(Box::new(simple_select())),
                lineage: None,
            }],
        });
        let sql = spark(true, false)
            .generate(&Expression::Select(Box::new(outer)))
            .unwrap();
        assert_eq!(
            sql,
            "WITH x AS (\n  SELECT\n    a,\n    b AS c\n  FROM t\n  WHERE\n    a > 1\n)\nSELECT\n  a\nFROM x"
        );
    }

    #[test]
    fn test_identify_quotes_with_dialect_character() {
        let expr = Expression::Select(Box::new(simple_select()));
        let sql = spark(false, true).generate(&expr).unwrap();
        assert_eq!(sql, "SELECT `a`, `b` AS `c` FROM `t` WHERE `a` > 1");
        let pg = Generator::with_config(GeneratorConfig {
            dialect: DialectType::PostgreSQL,
            pretty: false,
            identify: true,
        });
        assert_eq!(
            pg.generate(&Expression::column("a")).unwrap(),
            "\"a\""
        );
    }

    #[test]
    fn test_unsafe_names_are_quoted() {
        let expr = Expression::alias(Expression::column("age"), "sum(age)");
        assert_eq!(spark(false, false).generate(&expr).unwrap(), "age AS `sum(age)`");
        assert_eq!(Generator::sql(&Expression::column("select")).unwrap(), "\"select\"");
    }

    #[test]
    fn test_operator_precedence() {
        let or = binary(Expression::Or, Expression::column("a"), Expression::column("b"));
        let and = binary(Expression::And, or, Expression::column("c"));
        assert_eq!(Generator::sql(&and).unwrap(), "(a OR b) AND c");

        let sub = binary(
            Expression::Sub,
            Expression::column("a"),
            binary(Expression::Sub, Expression::column("b"), Expression::column("c")),
        );
        assert_eq!(Generator::sql(&sub).unwrap(), "a - (b - c)");

        let not_null = Expression::Not(Box::new(UnaryOp::new(Expression::IsNull(Box::new(
            UnaryOp::new(Expression::column("a")),
        )))));
        assert_eq!(Generator::sql(&not_null).unwrap(), "NOT a IS NULL");
    }

    #[test]
    fn test_string_escaping_per_dialect() {
        let lit = Expression::string("it's");
        assert_eq!(spark(false, false).generate(&lit).unwrap(), "'it\\'s'");
        assert_eq!(Generator::sql(&lit).unwrap(), "'it''s'");
    }

    #[test]
    fn test_hints_only_for_supporting_dialects() {
        let mut select = simple_select();
        select.hint = Some(Hint {
            expressions: vec![HintExpression::Join(JoinHint {
                name: "broadcast".to_string(),
                targets: vec![Identifier::new("t")],
            })],
        });
        let expr = Expression::Select(Box::new(select));
        assert!(spark(false, false)
            .generate(&expr)
            .unwrap()
            .starts_with("SELECT /*+ BROADCAST(t) */ a"));
        let duckdb = Generator::with_config(GeneratorConfig {
            dialect: DialectType::DuckDB,
            ..Default::default()
        });
        assert!(duckdb.generate(&expr).unwrap().starts_with("SELECT a"));
    }

    #[test]
    fn test_set_operation_keywords() {
        let left = Expression::Select(Box::new(
            Select::new().column(Expression::column("a")).from(Expression::table("x")),
        ));
        let right = Expression::Select(Box::new(
            Select::new().column(Expression::column("a")).from(Expression::table("y")),
        ));
        let op = |kind, distinct| {
            Expression::SetOperation(Box::new(SetOperation {
                kind,
                left: left.clone(),
                right: right.clone(),
                distinct,
                with: None,
            }))
        };
        assert_eq!(
            Generator::sql(&op(SetOpKind::Union, false)).unwrap(),
            "SELECT a FROM x UNION ALL SELECT a FROM y"
        );
        assert_eq!(
            Generator::sql(&op(SetOpKind::Intersect, true)).unwrap(),
            "SELECT a FROM x INTERSECT SELECT a FROM y"
        );
        assert_eq!(
            Generator::sql(&op(SetOpKind::Except, false)).unwrap(),
            "SELECT a FROM x EXCEPT ALL SELECT a FROM y"
        );
    }

    #[test]
    fn test_statements() {
        let query = Expression::Select(Box::new(
            Select::new().column(Expression::column("a")).from(Expression::table("x")),
        ));
        let insert = Expression::Insert(Box::new(Insert {
            table: TableRef::new("target"),
            overwrite: true,
            query: query.clone(),
        }));
        assert_eq!(
            Generator::sql(&insert).unwrap(),
            "INSERT OVERWRITE TABLE target SELECT a FROM x"
        );
        let create = Expression::Create(Box::new(CreateTableAs {
            table: TableRef::new("target"),
            replace: false,
            if_not_exists: true,
            query,
        }));
        assert_eq!(
            Generator::sql(&create).unwrap(),
            "CREATE TABLE IF NOT EXISTS target AS SELECT a FROM x"
        );
    }

    #[test]
    fn test_empty_identifier_is_an_error() {
        assert!(matches!(
            Generator::sql(&Expression::column("")),
            Err(Error::Generate(_))
        ));
    }
}
