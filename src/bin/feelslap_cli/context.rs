#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use feelslap::application::error::{AppError, ClientError, Presentation};
use feelslap::application::session::{Backends, Session, SessionSettings};
use feelslap::cache::CacheConfig;
use feelslap::config::{LoadError, Settings};
use feelslap::infra::error::InfraError;
use feelslap::infra::onboarding::FileOnboardingStore;
use feelslap::infra::remote::HttpBackend;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

impl CliError {
    /// Follow-up advice for failures the user can fix outside the command.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::App(AppError::Client(err))
                if err.presentation() == Presentation::Reauthenticate =>
            {
                Some("check --api-url and the configured API token, then retry")
            }
            _ => None,
        }
    }
}

impl From<ClientError> for CliError {
    fn from(err: ClientError) -> Self {
        Self::App(AppError::Client(err))
    }
}

impl From<InfraError> for CliError {
    fn from(err: InfraError) -> Self {
        Self::App(AppError::Infra(err))
    }
}

/// Open a session against the configured remote API.
///
/// With a token configured the principal is confirmed up front; without one
/// the session stays anonymous and caller-only commands fail.
pub async fn open_session(settings: &Settings) -> Result<Session, CliError> {
    let mut backend = HttpBackend::new(settings.api.base_url.as_str(), settings.api.timeout)?;
    if let Some(token) = settings.api.token.as_ref() {
        backend = backend.with_token(token.clone());
    }
    let backend = Arc::new(backend);

    let backends = Backends {
        social: backend.clone(),
        identity: backend.clone(),
        blobs: backend,
    };
    let session_settings = SessionSettings {
        cache: CacheConfig::from(&settings.cache),
        page_limit: settings.client.page_limit,
    };
    let store = Arc::new(FileOnboardingStore::in_dir(&settings.client.state_dir));
    let session = Session::start(backends, session_settings, store).await?;

    if settings.api.token.is_some() {
        let user = session.login().await?;
        debug!(user = %user, "Session opened");
    }
    Ok(session)
}
