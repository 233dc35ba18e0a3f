//! Runtime error types for the LRI cycle.
//!
//! All fallible operations return `LriResult<T>`. Every variant is scoped to
//! a single agent's cycle; nothing here implies another agent is affected.

use thiserror::Error;

/// The unified error type for the LRI runtime.
#[derive(Debug, Error)]
pub enum LriError {
    /// The authority gate refused the action. No state was mutated.
    #[error("action '{action}' denied for subject '{subject_id}': {reason}")]
    AuthorizationDenied {
        subject_id: String,
        action: String,
        reason: String,
    },

    /// The durable store could not load or accept a record.
    ///
    /// Fatal to the current cycle; the uncommitted transition is discarded.
    #[error("persistence failure: {reason}")]
    PersistenceFailure { reason: String },

    /// A stored chain does not recompute to its stored hashes.
    #[error("chain verification mismatch for subject '{subject_id}' at position {position}: {reason}")]
    ChainVerificationMismatch {
        subject_id: String,
        position: usize,
        reason: String,
    },

    /// An outbound collaborator failed to take delivery.
    ///
    /// The cycle engine logs this and carries on; the committed write stands.
    #[error("delivery to {collaborator} failed: {reason}")]
    DeliveryFailed { collaborator: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The cycle could not run to completion (poisoned lock, illegal phase).
    #[error("cycle aborted: {reason}")]
    CycleAborted { reason: String },

    /// A read model could not be rendered for output.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

/// How an error should surface to a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Expected business outcome; maps to "forbidden".
    Forbidden,
    /// Infrastructure fault; maps to a server error.
    ServerFault,
    /// Reported inside an audit response rather than failing the request.
    IntegrityFinding,
    /// Startup or policy configuration problem.
    Configuration,
}

impl LriError {
    pub fn class(&self) -> ErrorClass {
        match self {
            LriError::AuthorizationDenied { .. } => ErrorClass::Forbidden,
            LriError::ChainVerificationMismatch { .. } => ErrorClass::IntegrityFinding,
            LriError::ConfigError { .. } => ErrorClass::Configuration,
            LriError::PersistenceFailure { .. }
            | LriError::DeliveryFailed { .. }
            | LriError::CycleAborted { .. }
            | LriError::Serialization { .. } => ErrorClass::ServerFault,
        }
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, LriError::AuthorizationDenied { .. })
    }
}

/// Convenience alias used throughout the LRI crates.
pub type LriResult<T> = Result<T, LriError>;
