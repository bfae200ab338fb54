//! Error types for Paybill
//!
//! Provides a unified error type and the tariff-domain error variants

use thiserror::Error;

/// Result type alias using BillingError
pub type Result<T> = std::result::Result<T, BillingError>;

/// Unified error type for Paybill operations
#[derive(Debug, Error)]
pub enum BillingError {
    // Tariff resolution and pricing errors
    #[error("Tariff error: {0}")]
    Tariff(#[from] TariffError),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Whether this error means "nothing matched" rather than a fault
    pub fn is_not_found(&self) -> bool {
        matches!(self, BillingError::Tariff(TariffError::NotFound { .. }))
    }

    /// Borrow the tariff error, if this is one
    pub fn as_tariff(&self) -> Option<&TariffError> {
        match self {
            BillingError::Tariff(err) => Some(err),
            _ => None,
        }
    }
}

/// Tariff resolution and recommended pricing errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TariffError {
    /// No rule, table or bracket matched the query
    #[error("{what} not found: {detail}")]
    NotFound { what: &'static str, detail: String },

    /// A price table violates its structural invariants
    #[error("Invalid price table '{table}': {reason}")]
    InvalidTable { table: String, reason: String },

    /// The external currency conversion call failed
    #[error("Currency conversion {from} -> {to} failed: {reason}")]
    ConversionFailed {
        from: String,
        to: String,
        reason: String,
    },
}

impl TariffError {
    pub fn not_found(what: &'static str, detail: impl Into<String>) -> Self {
        TariffError::NotFound {
            what,
            detail: detail.into(),
        }
    }

    pub fn invalid_table(table: impl Into<String>, reason: impl Into<String>) -> Self {
        TariffError::InvalidTable {
            table: table.into(),
            reason: reason.into(),
        }
    }
}

// Implement From for common external error types
impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        BillingError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for BillingError {
    fn from(err: config::ConfigError) -> Self {
        BillingError::Config(err.to_string())
    }
}

impl From<anyhow::Error> for BillingError {
    fn from(err: anyhow::Error) -> Self {
        BillingError::Internal(err.to_string())
    }
}
