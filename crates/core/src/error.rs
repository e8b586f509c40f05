//! Error types for the Keepsake domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Keepsake operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Domain validation ---
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // --- Gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Rejected construction of a domain value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Attribute definition name must not be empty")]
    EmptyName,

    #[error("Extraction prompt must not be empty")]
    EmptyExtractionPrompt,

    #[error("Judgment prompt must not be empty")]
    EmptyJudgmentPrompt,

    #[error("Attribute value content must not be empty")]
    EmptyContent,
}

/// Failures talking to a language-model backend.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Backend unreachable: {0}")]
    Connectivity(String),

    #[error("Backend returned an unusable payload: {0}")]
    Payload(String),
}

/// Failures inside an attribute store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Backend(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Migration failed: {0}")]
    Migration(String),
}
