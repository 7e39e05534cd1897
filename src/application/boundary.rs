//! Traits describing the remote boundary and session-local storage.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::application::pagination::PageRequest;
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::onboarding::OnboardingState;
use crate::domain::types::{BlobRef, CommentId, PostId, ReactionKind, UserId, UserRole};

/// Failures reported by the remote boundary.
///
/// `Clone` so one failed read can be handed to every coalesced waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("not signed in")]
    Unauthenticated,
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        Self::Unavailable(err.to_string())
    }

    /// Connectivity and session failures, as opposed to a refused request.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            BackendError::Unauthenticated | BackendError::Unavailable(_)
        )
    }
}

/// Every operation the remote social API exposes.
#[async_trait]
pub trait SocialBackend: Send + Sync {
    // Profiles
    async fn register_user(&self, profile: UserProfile) -> Result<(), BackendError>;
    async fn caller_profile(&self) -> Result<Option<UserProfile>, BackendError>;
    async fn user_profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError>;
    async fn save_caller_profile(&self, profile: UserProfile) -> Result<(), BackendError>;
    async fn update_user_profile(&self, profile: UserProfile) -> Result<(), BackendError>;
    async fn is_username_available(&self, username: &str) -> Result<bool, BackendError>;

    // Roles
    async fn caller_role(&self) -> Result<UserRole, BackendError>;
    async fn assign_caller_user_role(
        &self,
        user: &UserId,
        role: UserRole,
    ) -> Result<(), BackendError>;
    async fn is_caller_admin(&self) -> Result<bool, BackendError>;
    async fn is_site_owner(&self) -> Result<bool, BackendError>;

    // Posts
    async fn create_post(&self, post: Post) -> Result<(), BackendError>;
    async fn posts(&self, page: PageRequest) -> Result<Vec<Post>, BackendError>;
    async fn posts_by_user(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Vec<Post>, BackendError>;
    async fn post(&self, id: &PostId) -> Result<Option<Post>, BackendError>;
    async fn update_post(&self, post: Post) -> Result<(), BackendError>;
    async fn delete_post(&self, id: &PostId) -> Result<(), BackendError>;

    // Comments
    async fn create_comment(&self, comment: Comment) -> Result<(), BackendError>;
    async fn comments_for_post(&self, post: &PostId) -> Result<Vec<Comment>, BackendError>;
    async fn delete_comment(&self, id: &CommentId) -> Result<(), BackendError>;

    // Reactions
    async fn add_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError>;
    async fn remove_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError>;

    // Friendships
    async fn send_friend_request(&self, to: &UserId) -> Result<(), BackendError>;
    async fn accept_friend_request(&self, from: &UserId) -> Result<(), BackendError>;
    async fn reject_friend_request(&self, from: &UserId) -> Result<(), BackendError>;
    async fn unfriend(&self, user: &UserId) -> Result<(), BackendError>;
    async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, BackendError>;
    async fn pending_friend_requests(&self) -> Result<Vec<Friendship>, BackendError>;
    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, BackendError>;

    // Moderation
    async fn flag_post(&self, id: &PostId) -> Result<(), BackendError>;
    async fn unflag_post(&self, id: &PostId) -> Result<(), BackendError>;
    async fn ban_user(&self, user: &UserId) -> Result<(), BackendError>;
    async fn unban_user(&self, user: &UserId) -> Result<(), BackendError>;
    async fn flagged_posts(&self) -> Result<Vec<Post>, BackendError>;
}

/// Authenticated identity handling.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in and return the caller's principal.
    async fn login(&self) -> Result<UserId, BackendError>;
    async fn logout(&self) -> Result<(), BackendError>;
    /// Current principal, if signed in.
    async fn caller(&self) -> Option<UserId>;
}

/// Upload progress callback receiving percentages in `0..=100`.
pub type UploadProgress = Arc<dyn Fn(u8) + Send + Sync>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        bytes: Bytes,
        progress: Option<UploadProgress>,
    ) -> Result<BlobRef, BackendError>;

    /// Direct URL a blob can be fetched from.
    fn direct_url(&self, blob: &BlobRef) -> String;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("onboarding state I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("onboarding state is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Session-local persistence for onboarding flags.
#[async_trait]
pub trait OnboardingStore: Send + Sync {
    async fn load(&self) -> Result<OnboardingState, StoreError>;
    async fn save(&self, state: &OnboardingState) -> Result<(), StoreError>;
}
