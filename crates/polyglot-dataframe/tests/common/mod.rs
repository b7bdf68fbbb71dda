//! Common fixtures for DataFrame integration tests

#[allow(unused_imports)]
pub mod fixtures;

#[allow(unused_imports)]
pub use fixtures::*;
