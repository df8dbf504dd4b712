//! Error types for Loop Guard
//!
//! Provides the typed error taxonomy for the node registry state machine plus
//! the infrastructure errors of the persistence and API layers.

use thiserror::Error;

// =============================================================================
// Error Codes
// =============================================================================

/// Non-owner attempted an owner-gated operation
pub const ERR_OWNER_ONLY: u32 = 100;
/// Operation targets a node that was never registered
pub const ERR_NOT_FOUND: u32 = 101;
/// Caller is not the node it is trying to modify
pub const ERR_NOT_AUTHORIZED: u32 = 102;
/// Mutation attempted on a revoked node
pub const ERR_REVOKED: u32 = 103;
/// Node is already present in the registry
pub const ERR_ALREADY_REGISTERED: u32 = 104;
/// Status text outside the accepted bounds
pub const ERR_INVALID_STATUS: u32 = 105;
/// Principal text is empty or malformed
pub const ERR_INVALID_PRINCIPAL: u32 = 106;

/// Unified error type for Loop Guard
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Owner only: {caller} is not the registry owner")]
    OwnerOnly { caller: String },

    #[error("Not authorized: {caller} cannot act on node {node}")]
    NotAuthorized { caller: String, node: String },

    // =========================================================================
    // Node Registry Errors
    // =========================================================================
    #[error("Node not found: {node}")]
    NotFound { node: String },

    #[error("Node revoked: {node}")]
    Revoked { node: String },

    #[error("Node already registered: {node}")]
    AlreadyRegistered { node: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Invalid status: {reason}")]
    InvalidStatus { reason: String },

    #[error("Invalid principal: {reason}")]
    InvalidPrincipal { reason: String },

    #[error("API request validation failed: {0}")]
    ApiValidation(String),

    #[error("API authentication failed: missing caller identity")]
    ApiAuthentication,

    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Broad class an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller lacks the identity the operation requires
    Authorization,
    /// Operation targets a node that does not exist
    Referential,
    /// Node is in a state that forbids the operation
    State,
    /// Input rejected before reaching the registry
    Validation,
    /// Persistence, configuration or runtime fault
    Internal,
}

impl Error {
    /// Categorize this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::OwnerOnly { .. } | Error::NotAuthorized { .. } | Error::ApiAuthentication => {
                ErrorCategory::Authorization
            }

            Error::NotFound { .. } => ErrorCategory::Referential,

            Error::Revoked { .. } | Error::AlreadyRegistered { .. } => ErrorCategory::State,

            Error::InvalidStatus { .. }
            | Error::InvalidPrincipal { .. }
            | Error::ApiValidation(_) => ErrorCategory::Validation,

            Error::Internal(_)
            | Error::Configuration(_)
            | Error::Snapshot(_)
            | Error::Metrics(_)
            | Error::JsonParse(_)
            | Error::Io(_) => ErrorCategory::Internal,
        }
    }

    /// Stable numeric code for registry-level errors
    pub fn code(&self) -> Option<u32> {
        match self {
            Error::OwnerOnly { .. } => Some(ERR_OWNER_ONLY),
            Error::NotFound { .. } => Some(ERR_NOT_FOUND),
            Error::NotAuthorized { .. } => Some(ERR_NOT_AUTHORIZED),
            Error::Revoked { .. } => Some(ERR_REVOKED),
            Error::AlreadyRegistered { .. } => Some(ERR_ALREADY_REGISTERED),
            Error::InvalidStatus { .. } => Some(ERR_INVALID_STATUS),
            Error::InvalidPrincipal { .. } => Some(ERR_INVALID_PRINCIPAL),
            _ => None,
        }
    }

    /// Short machine-readable name, used as a metrics label and API error tag
    pub fn kind(&self) -> &'static str {
        match self {
            Error::OwnerOnly { .. } => "owner_only",
            Error::NotAuthorized { .. } => "not_authorized",
            Error::NotFound { .. } => "not_found",
            Error::Revoked { .. } => "revoked",
            Error::AlreadyRegistered { .. } => "already_registered",
            Error::InvalidStatus { .. } => "invalid_status",
            Error::InvalidPrincipal { .. } => "invalid_principal",
            Error::ApiValidation(_) => "invalid_request",
            Error::ApiAuthentication => "unauthenticated",
            Error::Internal(_) => "internal_error",
            Error::Configuration(_) => "configuration_error",
            Error::Snapshot(_) => "snapshot_error",
            Error::Metrics(_) => "metrics_error",
            Error::JsonParse(_) => "json_error",
            Error::Io(_) => "io_error",
        }
    }

    /// Check if the request was refused by a registry or validation rule
    pub fn is_rejection(&self) -> bool {
        !matches!(self.category(), ErrorCategory::Internal)
    }
}

/// Result type alias for Loop Guard
pub type Result<T> = std::result::Result<T, Error>;
