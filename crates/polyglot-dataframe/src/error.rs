//! Error types for polyglot-dataframe

use thiserror::Error;

/// The result type for plan construction and rendering
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or rendering a plan.
///
/// Every error is detected synchronously at the call that discovers it; a
/// failed call never leaves a partially built plan behind.
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown or ambiguous column reference, mismatched set-operation
    /// schemas, or a null check on a wildcard-only projection
    #[error("Validation error: {0}")]
    Validation(String),

    /// The plan's AST is not one of the expected top-level query shapes
    #[error("Structural error: {0}")]
    Structural(String),

    /// Arguments that are well-formed but violate an operation's contract
    #[error("Policy violation: {0}")]
    Policy(String),

    /// A dialect name that does not resolve to a known dialect
    #[error("Unknown dialect: {0}")]
    UnknownDialect(String),

    /// Error during SQL generation
    #[error("Generation error: {0}")]
    Generate(String),

    /// Invalid session configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a structural error
    pub fn structural(message: impl Into<String>) -> Self {
        Error::Structural(message.into())
    }

    /// Create a policy violation
    pub fn policy(message: impl Into<String>) -> Self {
        Error::Policy(message.into())
    }

    /// Create an unknown dialect error
    pub fn unknown_dialect(name: impl Into<String>) -> Self {
        Error::UnknownDialect(name.into())
    }

    /// Create a generation error
    pub fn generate(message: impl Into<String>) -> Self {
        Error::Generate(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    /// Whether this is a [`Error::Validation`]
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Whether this is a [`Error::Structural`]
    pub fn is_structural(&self) -> bool {
        matches!(self, Error::Structural(_))
    }

    /// Whether this is a [`Error::Policy`]
    pub fn is_policy(&self) -> bool {
        matches!(self, Error::Policy(_))
    }
}

impl From<crate::schema::SchemaError> for Error {
    fn from(err: crate::schema::SchemaError) -> Self {
        Error::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
