//! Lazy DataFrame API compiling to SQL with nested CTEs.
//!
//! A [`Session`] holds the table catalog and the lineage state; every plan
//! borrows it. Plans are immutable: each operation returns a new
//! [`DataFrame`] whose AST grows by editing the current top-level SELECT, or
//! by first wrapping that SELECT into a CTE when the operation cannot be
//! expressed in it (a filter after a projection, a second projection, a
//! join). Rendering resolves deferred hints, optimizes, replaces the
//! placeholder CTE names with hashes of their bodies and generates text.
//!
//! ```
//! use polyglot_dataframe::{Session, SessionConfig};
//! use polyglot_dataframe::dataframe::functions::{col, lit};
//!
//! let session = Session::with_config(SessionConfig {
//!     pretty: false,
//!     identify: false,
//!     ..Default::default()
//! });
//! session
//!     .register_table("employee", &[("id", "INT"), ("age", "INT"), ("store_id", "INT")])
//!     .unwrap();
//! let df = session
//!     .table("employee").unwrap()
//!     .where_(col("age").gt(lit(40))).unwrap()
//!     .select(["id", "store_id"]).unwrap();
//! assert_eq!(df.columns(), vec!["id", "store_id"]);
//! assert!(df.sql().unwrap().starts_with("WITH t"));
//! ```

pub mod column;
pub mod dataframe;
pub mod functions;
pub mod group;
pub mod lineage;
pub mod na;
pub mod operations;
pub mod session;
pub mod writer;

mod finalize;
mod join;
mod materialize;
mod sanitize;
mod set_ops;

pub use column::{Column, IntoColumn, Value};
pub use dataframe::{DataFrame, JOIN_HINTS};
pub use finalize::CTE_NAME_PREFIX;
pub use group::GroupedData;
pub use join::JoinOn;
pub use lineage::AliasRegistry;
pub use na::{DropHow, FillValue, NaFunctions, Replacement};
pub use operations::Operation;
pub use session::{Session, SessionConfig};
pub use writer::{DataFrameWriter, SaveMode};
