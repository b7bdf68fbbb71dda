//! Polyglot DataFrame - lazy DataFrame plans rendered as SQL
//!
//! This library builds SQL queries from a chainable, Spark-style DataFrame
//! API. Nothing is executed: each call returns a new immutable plan and the
//! SQL text is produced on demand.
//!
//! # Architecture
//!
//! 1. **Expressions** - a small SQL AST with traversal and transform helpers
//! 2. **DataFrame** - plan construction: lineage, CTE materialization,
//!    joins, set operations, null handling and hints
//! 3. **Optimizer** - column qualification and unused-CTE removal
//! 4. **Generator** - renders the AST for a target dialect
//!
//! Plans name their CTEs after a CRC-32 of the CTE body, so the rendered
//! text does not depend on the order in which plans were built.

pub mod ast_transforms;
pub mod dataframe;
pub mod dialects;
pub mod error;
pub mod expressions;
pub mod generator;
pub mod helper;
pub mod optimizer;
pub mod schema;
pub mod traversal;

pub use dataframe::functions;
pub use dataframe::{
    Column, DataFrame, DataFrameWriter, DropHow, FillValue, GroupedData, JoinOn, Replacement,
    SaveMode, Session, SessionConfig, Value,
};
pub use dialects::{Dialect, DialectType};
pub use error::{Error, Result};
pub use expressions::Expression;
pub use generator::{Generator, GeneratorConfig};
pub use helper::find_new_name;
pub use schema::{MappingSchema, Schema, SchemaError};
pub use traversal::{transform_map, DfsIter, ExpressionWalk};
