//! Error taxonomy shared across the workspace.
//!
//! Library crates return [`Error`]; the CLI boundary wraps it in `anyhow`
//! and renders the one-line message.

use thiserror::Error;

/// Errors produced while configuring or building a storage resource.
#[derive(Debug, Error)]
pub enum Error {
    /// User input violates an invariant (bad bucket name, guest permissions
    /// under auth-only access, group list out of sync).
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// A resource, state file, or project artifact does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A persisted state file predates the current schema and must be
    /// migrated before it can be used.
    #[error("state schema mismatch for '{resource}': found version {found}, expected {expected}; run `stratus migrate storage`")]
    SchemaMismatch {
        resource: String,
        found: u32,
        expected: u32,
    },

    /// A cross-resource reference could not be resolved (missing auth
    /// resource, unknown trigger function attribute).
    #[error("dependency resolution failed: {0}")]
    DependencyResolution(String),

    /// The requested addition already exists (second storage resource,
    /// second trigger on ADD).
    #[error("already configured: {0}")]
    AlreadyConfigured(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    /// Create a not-found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// Create a schema-mismatch error.
    pub fn schema_mismatch(resource: impl Into<String>, found: u32, expected: u32) -> Self {
        Error::SchemaMismatch {
            resource: resource.into(),
            found,
            expected,
        }
    }

    /// Create a dependency-resolution error.
    pub fn dependency(message: impl Into<String>) -> Self {
        Error::DependencyResolution(message.into())
    }

    /// Create an already-configured error.
    pub fn already_configured(what: impl Into<String>) -> Self {
        Error::AlreadyConfigured(what.into())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;
