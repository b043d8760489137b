use thiserror::Error;

/// Unified error type for the marketplace service.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Request payload failed a presence or shape check
    #[error("Validation error: {message}")]
    Validation {
        /// What was invalid
        message: String,
    },

    /// Referenced record does not exist (or is soft-deleted)
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// Missing or invalid session
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Reason
        message: String,
    },

    /// Authenticated but not allowed to touch the resource
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Reason
        message: String,
    },

    /// Request collides with existing state (duplicate email, already enrolled)
    #[error("Conflict: {message}")]
    Conflict {
        /// Reason
        message: String,
    },

    /// Product stock cannot cover the requested quantity
    #[error("Insufficient stock for product {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        /// Product that ran short
        product_id: i64,
        /// Units currently in stock
        available: i32,
        /// Units requested
        requested: i32,
    },

    /// Order status change not in the legal transition table
    #[error("Invalid order status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },

    /// Amount is negative, zero where not allowed, or does not match
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// Offending amount in cents
        amount: i64,
    },

    /// Payment gateway rejected a call or returned something unusable
    #[error("Payment gateway error: {message}")]
    Gateway {
        /// Gateway message
        message: String,
    },

    /// Webhook signature or payload rejected
    #[error("Webhook error: {message}")]
    Webhook {
        /// Reason
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client error talking to the gateway
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Forbidden`].
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Unauthorized`].
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
