//! The lazy plan value and its single-relation operations.
//!
//! A [`DataFrame`] holds the AST of the query built so far. Every operation
//! goes through [`DataFrame::apply`]: the gate decides from the last and next
//! [`Operation`] whether the current query must first be wrapped into a CTE,
//! the operation then edits a private copy, and the copy is returned as a new
//! plan. Nothing is executed; SQL text is produced by `sql()`.

use crate::ast_transforms::{add_where, set_limit};
use crate::error::{Error, Result};
use crate::expressions::*;

use super::column::{column_reference, Column, IntoColumn};
use super::group::GroupedData;
use super::na::NaFunctions;
use super::operations::Operation;
use super::session::Session;
use super::writer::DataFrameWriter;

/// Hint names that pick a join strategy; any other hint is attached as-is.
pub const JOIN_HINTS: &[&str] = &[
    "BROADCAST",
    "BROADCASTJOIN",
    "MAPJOIN",
    "MERGE",
    "SHUFFLEMERGE",
    "MERGEJOIN",
    "SHUFFLE_HASH",
    "SHUFFLE_REPLICATE_NL",
];

/// An immutable, lazily built query plan.
#[derive(Debug, Clone)]
pub struct DataFrame<'s> {
    pub(crate) session: &'s Session,
    pub(crate) expression: Expression,
    pub(crate) branch_id: String,
    pub(crate) sequence_id: String,
    pub(crate) last_op: Operation,
    pub(crate) pending_hints: Vec<HintExpression>,
}

impl<'s> DataFrame<'s> {
    pub(crate) fn new(
        session: &'s Session,
        expression: Expression,
        branch_id: String,
        sequence_id: String,
    ) -> Self {
        Self {
            session,
            expression,
            branch_id,
            sequence_id,
            last_op: Operation::Init,
            pending_hints: Vec::new(),
        }
    }

    // -- Accessors -----------------------------------------------------------

    pub fn session(&self) -> &'s Session {
        self.session
    }

    /// The AST built so far, with placeholder CTE names.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    pub fn sequence_id(&self) -> &str {
        &self.sequence_id
    }

    pub fn last_op(&self) -> Operation {
        self.last_op
    }

    /// Hints that have not been attached to the AST yet
    pub fn pending_hints(&self) -> &[HintExpression] {
        &self.pending_hints
    }

    /// Output column names, `*` for wildcards.
    pub fn columns(&self) -> Vec<String> {
        self.expression.named_selects()
    }

    /// A column of this plan, usable in expressions over any plan derived
    /// from it (filters, projections, join conditions).
    pub fn col(&self, name: &str) -> Column {
        if name == "*" {
            return Column(Expression::Star(Star {
                table: Some(Identifier::new(&self.branch_id)),
            }));
        }
        match column_reference(name) {
            Expression::Column(c) if c.table.is_none() => {
                Column(Expression::qualified_column(&self.branch_id, c.name.name))
            }
            other => Column(other),
        }
    }

    pub fn na(&self) -> NaFunctions<'_, 's> {
        NaFunctions::new(self)
    }

    pub fn write(&self) -> DataFrameWriter<'s> {
        DataFrameWriter::new(self.clone())
    }

    // -- Gate ----------------------------------------------------------------

    pub(crate) fn select_ref(&self) -> Result<&Select> {
        self.expression.as_select().ok_or_else(|| {
            Error::structural("expected a SELECT at the root of the plan")
        })
    }

    pub(crate) fn select_mut(&mut self) -> Result<&mut Select> {
        self.expression.as_select_mut().ok_or_else(|| {
            Error::structural("expected a SELECT at the root of the plan")
        })
    }

    /// Materialize as required before `op` and return the copy to edit with
    /// the operation to record afterwards.
    pub(crate) fn gate(&self, op: Operation) -> Result<(DataFrame<'s>, Operation)> {
        let mut df = self.clone();
        if df.last_op == Operation::Init {
            df = df.convert_leaf_to_cte(None)?;
            df.last_op = Operation::NoOp;
        }
        let next = op.effective(df.last_op);
        if Operation::needs_materialization(df.last_op, op) {
            df = df.convert_leaf_to_cte(None)?;
        }
        Ok((df, next))
    }

    /// Run `f` on a gated copy and record `op` as the last operation.
    pub(crate) fn apply<F>(&self, op: Operation, f: F) -> Result<DataFrame<'s>>
    where
        F: FnOnce(DataFrame<'s>) -> Result<DataFrame<'s>>,
    {
        let (df, next) = self.gate(op)?;
        let mut out = f(df)?;
        out.last_op = next;
        Ok(out)
    }

    /// Like [`DataFrame::apply`] for operations composed of other public
    /// operations: the last operation those record is kept.
    pub(crate) fn apply_chained<F>(&self, op: Operation, f: F) -> Result<DataFrame<'s>>
    where
        F: FnOnce(DataFrame<'s>) -> Result<DataFrame<'s>>,
    {
        let (mut df, next) = self.gate(op)?;
        df.last_op = next;
        f(df)
    }

    /// Replace the select-list (or append to it) without gating.
    pub(crate) fn project(mut self, columns: Vec<Column>, append: bool) -> Result<DataFrame<'s>> {
        let mut expressions = Vec::with_capacity(columns.len());
        for column in columns {
            expressions.push(self.sanitize(column.into_inner())?);
        }
        let select = self.select_mut()?;
        if append {
            select.expressions.extend(expressions);
        } else {
            select.expressions = expressions;
        }
        if select.expressions.is_empty() {
            return Err(Error::policy("a projection needs at least one column"));
        }
        Ok(self)
    }

    // -- Projection ----------------------------------------------------------

    /// Project `columns`.
    pub fn select<I, C>(&self, columns: I) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let columns: Vec<Column> = columns.into_iter().map(IntoColumn::into_column).collect();
        self.apply(Operation::Select, |df| df.project(columns, false))
    }

    /// Keep the rows matching `condition`. Repeated filters are AND-ed.
    pub fn where_(&self, condition: impl IntoColumn) -> Result<DataFrame<'s>> {
        let condition = condition.into_column().into_inner();
        self.apply(Operation::Where, |mut df| {
            let condition = df.sanitize(condition)?;
            df.expression = add_where(df.take_expression(), condition);
            Ok(df)
        })
    }

    /// Alias of [`DataFrame::where_`].
    pub fn filter(&self, condition: impl IntoColumn) -> Result<DataFrame<'s>> {
        self.where_(condition)
    }

    pub fn group_by<I, C>(&self, columns: I) -> Result<GroupedData<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let columns: Vec<Column> = columns.into_iter().map(IntoColumn::into_column).collect();
        let mut keys = Vec::with_capacity(columns.len());
        let df = self.apply(Operation::GroupBy, |df| {
            for column in columns {
                keys.push(df.sanitize(column.into_inner())?);
            }
            Ok(df)
        })?;
        Ok(GroupedData::new(df, keys))
    }

    /// Aggregate over the whole plan: `GROUP BY` nothing.
    pub fn agg<I, C>(&self, exprs: I) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let exprs: Vec<Column> = exprs.into_iter().map(IntoColumn::into_column).collect();
        self.apply(Operation::Select, |mut df| {
            df.last_op = Operation::GroupBy;
            GroupedData::new(df, Vec::new()).agg(exprs)
        })
    }

    /// Sort ascending by `columns`. Columns built with `.asc()` / `.desc()`
    /// keep their direction.
    pub fn order_by<I, C>(&self, columns: I) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        self.sort(columns, &[])
    }

    /// Sort by `columns` with per-column `ascending` flags.
    ///
    /// An empty slice sorts everything ascending and a single flag applies to
    /// every column; otherwise there must be one flag per column. Columns that
    /// already carry a direction ignore their flag.
    pub fn sort<I, C>(&self, columns: I, ascending: &[bool]) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let columns: Vec<Column> = columns.into_iter().map(IntoColumn::into_column).collect();
        let flags: Vec<bool> = match ascending {
            [] => vec![true; columns.len()],
            [single] => vec![*single; columns.len()],
            many if many.len() == columns.len() => many.to_vec(),
            many => {
                return Err(Error::policy(format!(
                    "got {} ascending flags for {} sort columns",
                    many.len(),
                    columns.len()
                )))
            }
        };
        self.apply(Operation::OrderBy, |mut df| {
            let mut keys = Vec::with_capacity(columns.len());
            for (column, asc) in columns.into_iter().zip(flags) {
                let key = match df.sanitize(column.into_inner())? {
                    Expression::Ordered(ordered) => *ordered,
                    this => Ordered {
                        this,
                        desc: !asc,
                        nulls_first: None,
                    },
                };
                keys.push(key);
            }
            df.select_mut()?.order_by = Some(OrderBy { expressions: keys });
            Ok(df)
        })
    }

    /// Keep at most `n` rows. A smaller earlier limit wins.
    pub fn limit(&self, n: u64) -> Result<DataFrame<'s>> {
        self.apply(Operation::Limit, |mut df| {
            df.expression = set_limit(df.take_expression(), n);
            Ok(df)
        })
    }

    pub fn distinct(&self) -> Result<DataFrame<'s>> {
        self.apply(Operation::Select, |mut df| {
            df.select_mut()?.distinct = true;
            Ok(df)
        })
    }

    /// Add `column` as `name`, replacing the projection of the same name if
    /// there is one.
    pub fn with_column(&self, name: &str, column: impl IntoColumn) -> Result<DataFrame<'s>> {
        let column = column.into_column();
        self.apply(Operation::Select, |mut df| {
            let value = df.sanitize(column.into_inner())?;
            let value = match value {
                Expression::Alias(a) => a.this,
                other => other,
            };
            let select = df.select_mut()?;
            let slot = select
                .expressions
                .iter()
                .position(|e| e.alias_or_name() == name);
            let projected = Expression::alias(value, name);
            match slot {
                Some(i) => select.expressions[i] = projected,
                None => select.expressions.push(projected),
            }
            Ok(df)
        })
    }

    pub fn with_column_renamed(&self, existing: &str, new: &str) -> Result<DataFrame<'s>> {
        self.apply(Operation::Select, |mut df| {
            let select = df.select_mut()?;
            let mut found = false;
            for expr in select.expressions.iter_mut() {
                if expr.alias_or_name() != existing {
                    continue;
                }
                found = true;
                match expr {
                    Expression::Alias(a) => a.alias = Identifier::new(new),
                    other => {
                        let inner = std::mem::replace(other, Expression::null());
                        *other = Expression::alias(inner, new);
                    }
                }
            }
            if !found {
                return Err(Error::validation(format!(
                    "cannot rename column {}: no such column",
                    existing
                )));
            }
            Ok(df)
        })
    }

    /// Remove columns by output name. Names that are not projected are ignored.
    pub fn drop<I, C>(&self, columns: I) -> Result<DataFrame<'s>>
    where
        I: IntoIterator<Item = C>,
        C: IntoColumn,
    {
        let dropped: Vec<String> = columns
            .into_iter()
            .map(|c| c.into_column().alias_or_name().to_string())
            .collect();
        self.apply(Operation::Select, |df| {
            let current = df.select_ref()?.expressions.clone();
            if current.iter().any(Expression::is_star) {
                return Err(Error::validation(
                    "cannot drop columns from a projection containing *",
                ));
            }
            let kept: Vec<Column> = current
                .into_iter()
                .filter(|e| !dropped.iter().any(|d| d == e.alias_or_name()))
                .map(Column)
                .collect();
            df.project(kept, false)
        })
    }

    // -- Lineage -------------------------------------------------------------

    /// Name this plan. The alias can then qualify columns (`"e.age"`) and be
    /// the target of join hints.
    pub fn alias(&self, name: &str) -> Result<DataFrame<'s>> {
        let name = name.to_string();
        self.apply(Operation::NoOp, move |mut df| {
            let sequence_id = df.session.next_sequence_id();
            let branch_id = df.session.next_branch_id();
            for hint in df.pending_hints.iter_mut() {
                if let HintExpression::Join(join_hint) = hint {
                    for target in join_hint.targets.iter_mut() {
                        if target.name == df.sequence_id {
                            target.name = sequence_id.clone();
                        }
                    }
                }
            }
            df.session.register_branch(&branch_id, &df.branch_id);
            df.session.register_alias(&name, &sequence_id);
            df.branch_id = branch_id;
            df.convert_leaf_to_cte(Some(sequence_id))
        })
    }

    // -- Hints ---------------------------------------------------------------

    /// Attach a planner hint. Join hints (`BROADCAST`, `MERGE`, ...) target
    /// this plan when `params` is empty, otherwise the named aliases. Other
    /// hints take `params` as arguments: integers as numbers, anything else
    /// as column names.
    pub fn hint(&self, name: &str, params: &[&str]) -> Result<DataFrame<'s>> {
        let name = name.to_uppercase();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        self.apply(Operation::NoOp, |mut df| {
            let hint = if JOIN_HINTS.contains(&name.as_str()) {
                let targets = if params.is_empty() {
                    vec![Identifier::new(&df.sequence_id)]
                } else {
                    params.iter().map(Identifier::new).collect()
                };
                HintExpression::Join(JoinHint { name, targets })
            } else {
                let mut args = Vec::with_capacity(params.len());
                for param in &params {
                    args.push(df.hint_argument(param)?);
                }
                HintExpression::Partition(PartitionHint { name, args })
            };
            df.pending_hints.push(hint);
            Ok(df)
        })
    }

    /// `REPARTITION(n, columns...)`
    pub fn repartition(&self, partitions: u32, columns: &[&str]) -> Result<DataFrame<'s>> {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        self.apply(Operation::NoOp, |mut df| {
            let mut args = vec![Expression::number(partitions)];
            for column in &columns {
                args.push(df.sanitize(column_reference(column))?);
            }
            df.pending_hints.push(HintExpression::Partition(PartitionHint {
                name: "REPARTITION".to_string(),
                args,
            }));
            Ok(df)
        })
    }

    /// `COALESCE(n)`
    pub fn coalesce(&self, partitions: u32) -> Result<DataFrame<'s>> {
        self.apply(Operation::NoOp, |mut df| {
            df.pending_hints.push(HintExpression::Partition(PartitionHint {
                name: "COALESCE".to_string(),
                args: vec![Expression::number(partitions)],
            }));
            Ok(df)
        })
    }

    fn hint_argument(&self, param: &str) -> Result<Expression> {
        if !param.is_empty() && param.chars().all(|c| c.is_ascii_digit()) {
            return Ok(Expression::number(param));
        }
        self.sanitize(column_reference(param))
    }

    /// Caching has no meaning for a plan that is never executed; the plan is
    /// returned unchanged.
    pub fn cache(&self) -> DataFrame<'s> {
        tracing::warn!("DataFrame::cache is not supported; returning the plan unchanged");
        self.clone()
    }

    pub(crate) fn take_expression(&mut self) -> Expression {
        std::mem::replace(&mut self.expression, Expression::null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataframe::functions::{col, lit};
    use crate::dataframe::session::SessionConfig;

    fn session() -> Session {
        let session = Session::with_config(SessionConfig {
            pretty: false,
            identify: false,
            ..Default::default()
        });
        session
            .register_table("t", &[("a", "INT"), ("b", "INT"), ("c", "STRING")])
            .unwrap();
        session
    }

    #[test]
    fn test_first_operation_materializes() {
        let session = session();
        let df = session.table("t").unwrap();
        let out = df.where_(col("a").gt(lit(1))).unwrap();
        assert_eq!(out.last_op(), Operation::Where);
        assert_eq!(out.expression().ctes().len(), 1);
        let select = out.expression().as_select().unwrap();
        assert_eq!(select.from_relation_name(), Some(out.expression().ctes()[0].name()));
    }

    #[test]
    fn test_forward_operations_share_one_select() {
        let session = session();
        let df = session
            .table("t")
            .unwrap()
            .where_(col("a").gt(lit(1)))
            .unwrap()
            .select(["a", "b"])
            .unwrap()
            .order_by(["a"])
            .unwrap()
            .limit(5)
            .unwrap();
        assert_eq!(df.expression().ctes().len(), 1);
        assert_eq!(df.columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_select_after_select_materializes() {
        let session = session();
        let df = session.table("t").unwrap().select(["a", "b"]).unwrap();
        let again = df.select(["a"]).unwrap();
        assert_eq!(again.expression().ctes().len(), 2);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let session = session();
        let err = session.table("t").unwrap().select(["zzz"]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_with_column_replaces_first_slot() {
        let session = session();
        let df = session
            .table("t")
            .unwrap()
            .with_column("a", col("a").add(lit(1)))
            .unwrap();
        assert_eq!(df.columns(), vec!["a", "b", "c"]);
        let df = df.with_column("d", lit(0)).unwrap();
        assert_eq!(df.columns(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_with_column_renamed_requires_column() {
        let session = session();
        let df = session.table("t").unwrap();
        assert_eq!(
            df.with_column_renamed("b", "bee").unwrap().columns(),
            vec!["a", "bee", "c"]
        );
        assert!(df.with_column_renamed("zzz", "x").unwrap_err().is_validation());
    }

    #[test]
    fn test_drop_ignores_unknown_names() {
        let session = session();
        let df = session.table("t").unwrap().drop(["b", "nope"]).unwrap();
        assert_eq!(df.columns(), vec!["a", "c"]);
    }

    #[test]
    fn test_sort_flag_count_must_match() {
        let session = session();
        let df = session.table("t").unwrap();
        let err = df.sort(["a", "b", "c"], &[true, false]).unwrap_err();
        assert!(err.is_policy());
        assert!(df.sort(["a", "b"], &[false]).is_ok());
    }

    #[test]
    fn test_limit_keeps_smaller_value() {
        let session = session();
        let df = session.table("t").unwrap().limit(10).unwrap().limit(20).unwrap();
        let limit = &df.expression().as_select().unwrap().limit.as_ref().unwrap().this;
        assert_eq!(limit, &Expression::number(10));
    }

    #[test]
    fn test_hint_without_params_targets_own_sequence() {
        let session = session();
        let df = session.table("t").unwrap().hint("broadcast", &[]).unwrap();
        match &df.pending_hints()[0] {
            HintExpression::Join(h) => {
                assert_eq!(h.name, "BROADCAST");
                assert_eq!(h.targets[0].name, df.sequence_id());
            }
            other => panic!("unexpected hint {:?}", other),
        }
    }

    #[test]
    fn test_alias_starts_new_lineage() {
        let session = session();
        let df = session.table("t").unwrap();
        let aliased = df.alias("x").unwrap();
        assert_ne!(aliased.branch_id(), df.branch_id());
        assert_ne!(aliased.sequence_id(), df.sequence_id());
        let last = aliased.expression().ctes().last().unwrap();
        assert_eq!(last.sequence_id(), Some(aliased.sequence_id()));
        assert_eq!(session.alias_candidates("x"), vec![aliased.sequence_id().to_string()]);
    }

    #[test]
    fn test_col_accessor_resolves_through_alias() {
        let session = session();
        let df = session.table("t").unwrap();
        let filtered = df.where_(df.col("a").gt(lit(3))).unwrap();
        let cte = filtered.expression().ctes()[0].name().to_string();
        let condition = &filtered
            .expression()
            .as_select()
            .unwrap()
            .where_clause
            .as_ref()
            .unwrap()
            .this;
        assert_eq!(condition.sql(), format!("{}.a > 3", cte));
    }
}
