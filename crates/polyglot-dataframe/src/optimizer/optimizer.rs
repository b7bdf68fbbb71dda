//! Optimizer Orchestration Module
//!
//! Coordinates the optimization passes in the correct order.

use crate::error::Result;
use crate::expressions::Expression;
use crate::schema::Schema;

use super::eliminate_ctes::eliminate_ctes;
use super::qualify_columns::qualify_columns;

/// Optimizer configuration
#[derive(Default)]
pub struct OptimizerConfig<'a> {
    /// Catalog used to resolve the columns of base tables
    pub schema: Option<&'a dyn Schema>,
}

/// Optimization rule type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationRule {
    /// Qualify columns with the relation that owns them
    QualifyColumns,
    /// Remove CTEs that the final query does not reach
    EliminateCtes,
}

/// Default optimization rules in order of execution
pub const DEFAULT_RULES: &[OptimizationRule] = &[
    OptimizationRule::QualifyColumns,
    OptimizationRule::EliminateCtes,
];

/// Optimize an expression using the default set of rules.
pub fn optimize(expression: Expression, config: &OptimizerConfig<'_>) -> Result<Expression> {
    optimize_with_rules(expression, config, DEFAULT_RULES)
}

/// Optimize an expression using a custom set of rules.
pub fn optimize_with_rules(
    mut expression: Expression,
    config: &OptimizerConfig<'_>,
    rules: &[OptimizationRule],
) -> Result<Expression> {
    for rule in rules {
        expression = apply_rule(expression, *rule, config)?;
    }
    Ok(expression)
}

fn apply_rule(
    expression: Expression,
    rule: OptimizationRule,
    config: &OptimizerConfig<'_>,
) -> Result<Expression> {
    match rule {
        OptimizationRule::QualifyColumns => qualify_columns(expression, config.schema),
        OptimizationRule::EliminateCtes => Ok(eliminate_ctes(expression)),
    }
}
