//! SQL Optimizer Module
//!
//! Passes applied to a finished plan before it is rendered: column
//! qualification and removal of CTEs the final query never reaches.

/// Elimination of unreachable Common Table Expressions
pub mod eliminate_ctes;
/// Main optimizer entry point and rule orchestration
pub mod optimizer;
/// Column qualification and output aliasing
pub mod qualify_columns;

pub use eliminate_ctes::eliminate_ctes;
pub use optimizer::{optimize, optimize_with_rules, OptimizationRule, OptimizerConfig, DEFAULT_RULES};
pub use qualify_columns::qualify_columns;
