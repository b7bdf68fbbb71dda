//! UNION / INTERSECT / EXCEPT between plans.

use crate::ast_transforms::take_ctes;
use crate::error::{Error, Result};
use crate::expressions::*;
use crate::schema::Schema;

use super::column::Column;
use super::dataframe::DataFrame;
use super::materialize::merge_ctes;
use super::operations::Operation;

impl<'s> DataFrame<'s> {
    /// `UNION ALL`: rows of both plans, matched by position.
    pub fn union(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.set_operation(other, SetOpKind::Union, false)
    }

    /// Alias of [`DataFrame::union`].
    pub fn union_all(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.union(other)
    }

    /// `INTERSECT` (distinct rows present in both plans)
    pub fn intersect(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.set_operation(other, SetOpKind::Intersect, true)
    }

    pub fn intersect_all(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.set_operation(other, SetOpKind::Intersect, false)
    }

    /// `EXCEPT ALL`
    pub fn except_all(&self, other: &DataFrame<'s>) -> Result<DataFrame<'s>> {
        self.set_operation(other, SetOpKind::Except, false)
    }

    /// `UNION ALL` matching columns by name.
    ///
    /// Without `allow_missing_columns` both plans must output the same set of
    /// names; the right plan is re-projected in the left plan's order. With
    /// it, a name missing on one side is filled with a typed NULL on that
    /// side, and the result lists the left names followed by the names only
    /// the right plan has.
    pub fn union_by_name(&self, other: &DataFrame<'s>, allow_missing_columns: bool) -> Result<DataFrame<'s>> {
        let left_names = self.columns();
        let right_names = other.columns();
        if left_names.iter().chain(&right_names).any(|n| n == "*") {
            return Err(Error::validation(
                "union_by_name needs explicit column lists on both sides",
            ));
        }

        if !allow_missing_columns {
            let same = left_names.len() == right_names.len()
                && left_names.iter().all(|n| right_names.contains(n));
            if !same {
                return Err(Error::validation(format!(
                    "union_by_name column mismatch: [{}] vs [{}]",
                    left_names.join(", "),
                    right_names.join(", ")
                )));
            }
            let right = other.select(left_names.iter().map(String::as_str))?;
            return self.set_operation(&right, SetOpKind::Union, false);
        }

        let right_only: Vec<&String> = right_names
            .iter()
            .filter(|n| !left_names.contains(n))
            .collect();

        let mut left_exprs: Vec<Column> = left_names
            .iter()
            .map(|n| Column(Expression::column(n.as_str())))
            .collect();
        let mut right_exprs = Vec::with_capacity(left_names.len() + right_only.len());
        for name in &left_names {
            if right_names.contains(name) {
                right_exprs.push(Column(Expression::column(name.as_str())));
            } else {
                right_exprs.push(typed_null(self.infer_column_type(name), name));
            }
        }
        for name in right_only {
            left_exprs.push(typed_null(other.infer_column_type(name), name));
            right_exprs.push(Column(Expression::column(name.as_str())));
        }

        let left = self.select(left_exprs)?;
        let right = other.select(right_exprs)?;
        left.set_operation(&right, SetOpKind::Union, false)
    }

    fn set_operation(&self, other: &DataFrame<'s>, kind: SetOpKind, distinct: bool) -> Result<DataFrame<'s>> {
        self.apply(Operation::From, |mut df| {
            let right = other.convert_leaf_to_cte(None)?;
            let left_names = df.columns();
            let right_names = right.columns();
            let has_star = left_names.iter().chain(&right_names).any(|n| n == "*");
            if !has_star && left_names.len() != right_names.len() {
                return Err(Error::validation(format!(
                    "{} operands have {} and {} columns",
                    kind.keyword(),
                    left_names.len(),
                    right_names.len()
                )));
            }

            let mut left_body = df.take_expression();
            let mut right_body = right.expression;
            merge_ctes(&mut left_body, take_ctes(&mut right_body));
            let ctes = take_ctes(&mut left_body);
            df.expression = Expression::SetOperation(Box::new(SetOperation {
                kind,
                left: left_body,
                right: right_body,
                distinct,
                with: Some(With { ctes }),
            }));
            df.pending_hints.extend(right.pending_hints);
            tracing::debug!(
                "{}{} of sequences {} and {}",
                kind.keyword(),
                if distinct { "" } else { " ALL" },
                df.sequence_id,
                right.sequence_id
            );
            df.convert_leaf_to_cte(None)
        })
    }

    /// Best-effort type of output column `name`, following projections
    /// through CTE bodies down to the catalog.
    pub(crate) fn infer_column_type(&self, name: &str) -> Option<DataType> {
        let catalog = self.session.catalog();
        column_type(&self.expression, self.expression.ctes(), &*catalog, name)
    }
}

fn typed_null(data_type: Option<DataType>, name: &str) -> Column {
    let value = match data_type {
        Some(ty) => Expression::cast(Expression::null(), ty),
        None => Expression::null(),
    };
    Column(Expression::alias(value, name))
}

fn column_type(query: &Expression, ctes: &[Cte], schema: &dyn Schema, name: &str) -> Option<DataType> {
    let select = query.leading_select()?;
    let projection = select
        .expressions
        .iter()
        .find(|e| e.alias_or_name() == name)?;
    expression_type(projection, select, ctes, schema)
}

fn expression_type(expr: &Expression, select: &Select, ctes: &[Cte], schema: &dyn Schema) -> Option<DataType> {
    match expr {
        Expression::Alias(a) => expression_type(&a.this, select, ctes, schema),
        Expression::Cast(c) => Some(c.to.clone()),
        Expression::Literal(Literal::String(_)) => Some(DataType::String),
        Expression::Literal(Literal::Number(n)) => Some(if n.contains('.') {
            DataType::Double
        } else {
            DataType::BigInt
        }),
        Expression::Boolean(_) => Some(DataType::Boolean),
        Expression::Column(c) => {
            let relation = match &c.table {
                Some(t) => t.name.as_str(),
                None => select.from_relation_name()?,
            };
            let table = select
                .from
                .iter()
                .flat_map(|f| f.expressions.iter())
                .chain(select.joins.iter().map(|j| &j.this))
                .find_map(|e| match e {
                    Expression::Table(t) if t.alias_or_name() == relation => Some(t.name.name.as_str()),
                    _ => None,
                })?;
            match ctes.iter().position(|cte| cte.name() == table) {
                Some(pos) => column_type(&ctes[pos].this, &ctes[..pos], schema, &c.name.name),
                None => schema.get_column_type(table, &c.name.name).ok(),
            }
        }
        _ => None,
    }
}
