use std::sync::Arc;

use thiserror::Error;

use crate::application::boundary::{BackendError, StoreError};
use crate::domain::error::ValidationError;
use crate::infra::error::InfraError;

/// How a failure should be surfaced to the person using the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    /// Shown next to the offending form field.
    Inline,
    /// Shown briefly; the request was refused but the session is fine.
    Transient,
    /// The session or connection needs attention (sign in again, reconnect).
    Reauthenticate,
}

/// `Clone` so coalesced readers can all receive the same failure.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Boundary(#[from] BackendError),
    #[error(transparent)]
    Store(Arc<StoreError>),
    #[error("cached value for `{key}` has an unexpected shape")]
    CacheMismatch { key: String },
}

impl ClientError {
    pub fn cache_mismatch(key: impl ToString) -> Self {
        Self::CacheMismatch {
            key: key.to_string(),
        }
    }

    pub fn presentation(&self) -> Presentation {
        match self {
            ClientError::Validation(_) => Presentation::Inline,
            ClientError::Boundary(err) if err.is_connectivity() => Presentation::Reauthenticate,
            ClientError::Boundary(_) => Presentation::Transient,
            ClientError::Store(_) | ClientError::CacheMismatch { .. } => Presentation::Transient,
        }
    }

    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            ClientError::Validation(err) => Some(err),
            _ => None,
        }
    }

    pub fn as_boundary(&self) -> Option<&BackendError> {
        match self {
            ClientError::Boundary(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ClientError {
    fn from(err: StoreError) -> Self {
        Self::Store(Arc::new(err))
    }
}

/// Top-level error of the command-line front end.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Client(ClientError::Validation(err))
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        Self::Client(ClientError::Boundary(err))
    }
}
