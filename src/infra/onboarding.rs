//! Onboarding flag persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::application::boundary::{OnboardingStore, StoreError};
use crate::cache::lock::mutex_lock;
use crate::domain::onboarding::OnboardingState;

const SOURCE: &str = "infra::onboarding";
pub const ONBOARDING_FILE: &str = "onboarding.json";

/// Small JSON document in the session state directory.
#[derive(Debug, Clone)]
pub struct FileOnboardingStore {
    path: PathBuf,
}

impl FileOnboardingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(ONBOARDING_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OnboardingStore for FileOnboardingStore {
    async fn load(&self) -> Result<OnboardingState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No onboarding state yet");
                Ok(OnboardingState::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, state: &OnboardingState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

/// Keeps the flags for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryOnboardingStore {
    state: Mutex<OnboardingState>,
}

#[async_trait]
impl OnboardingStore for MemoryOnboardingStore {
    async fn load(&self) -> Result<OnboardingState, StoreError> {
        Ok(*mutex_lock(&self.state, SOURCE, "load"))
    }

    async fn save(&self, state: &OnboardingState) -> Result<(), StoreError> {
        *mutex_lock(&self.state, SOURCE, "save") = *state;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileOnboardingStore::in_dir(dir.path());
        assert_eq!(store.load().await.expect("load"), OnboardingState::default());
    }

    #[tokio::test]
    async fn saved_flags_survive_a_new_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileOnboardingStore::in_dir(dir.path().join("nested"));
        let mut state = OnboardingState::default();
        state.mark_signed_up();
        store.save(&state).await.expect("save");

        let reopened = FileOnboardingStore::in_dir(dir.path().join("nested"));
        assert!(reopened.load().await.expect("load").should_show_banner());
    }

    #[tokio::test]
    async fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileOnboardingStore::in_dir(dir.path());
        std::fs::write(store.path(), b"{not json").expect("write");
        let err = store.load().await.expect_err("malformed");
        assert!(matches!(err, StoreError::Malformed(_)));
    }
}
