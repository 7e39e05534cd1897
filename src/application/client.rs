//! Typed domain client over the remote boundary.
//!
//! Performs the local checks that must pass before a request is sent,
//! assigns client-generated ids and timestamps, and otherwise maps one to
//! one onto [`SocialBackend`]. No caching and no retries happen here.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::boundary::{
    BackendError, BlobStore, IdentityProvider, SocialBackend, UploadProgress,
};
use crate::application::error::ClientError;
use crate::application::pagination::{Page, PageRequest};
use crate::domain::comments::CommentDraft;
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::error::ValidationError;
use crate::domain::posts::PostDraft;
use crate::domain::types::{
    BlobRef, CommentId, PostId, ReactionKind, Timestamp, UserId, UserRole,
};
use crate::domain::validation;

#[derive(Clone)]
pub struct DomainClient {
    backend: Arc<dyn SocialBackend>,
    identity: Arc<dyn IdentityProvider>,
    blobs: Arc<dyn BlobStore>,
    last_stamp: Arc<AtomicI64>,
}

impl DomainClient {
    pub fn new(
        backend: Arc<dyn SocialBackend>,
        identity: Arc<dyn IdentityProvider>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            backend,
            identity,
            blobs,
            last_stamp: Arc::new(AtomicI64::new(i64::MIN)),
        }
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub async fn caller_id(&self) -> Option<UserId> {
        self.identity.caller().await
    }

    async fn require_caller(&self) -> Result<UserId, ClientError> {
        self.identity
            .caller()
            .await
            .ok_or(ClientError::Boundary(BackendError::Unauthenticated))
    }

    /// Submit-time timestamp, strictly increasing across this client.
    fn stamp(&self) -> Timestamp {
        let now = Timestamp::now().as_nanos();
        let previous = self
            .last_stamp
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last.saturating_add(1)))
            })
            .unwrap_or(now);
        Timestamp::from_nanos(now.max(previous.saturating_add(1)))
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    #[instrument(skip(self, profile), fields(username = %profile.username))]
    pub async fn register(&self, profile: UserProfile) -> Result<(), ClientError> {
        check_profile_fields(&profile)?;
        self.backend.register_user(profile).await?;
        Ok(())
    }

    pub async fn caller_profile(&self) -> Result<Option<UserProfile>, ClientError> {
        Ok(self.backend.caller_profile().await?)
    }

    pub async fn user_profile(&self, user: &UserId) -> Result<Option<UserProfile>, ClientError> {
        Ok(self.backend.user_profile(user).await?)
    }

    #[instrument(skip(self, profile))]
    pub async fn save_caller_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        check_profile_edit(&profile)?;
        self.backend.save_caller_profile(profile).await?;
        Ok(())
    }

    #[instrument(skip(self, profile))]
    pub async fn update_user_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        check_profile_edit(&profile)?;
        self.backend.update_user_profile(profile).await?;
        Ok(())
    }

    pub async fn is_username_available(&self, username: &str) -> Result<bool, ClientError> {
        Ok(self.backend.is_username_available(username).await?)
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    pub async fn caller_role(&self) -> Result<UserRole, ClientError> {
        Ok(self.backend.caller_role().await?)
    }

    pub async fn assign_role(&self, user: &UserId, role: UserRole) -> Result<(), ClientError> {
        self.backend.assign_caller_user_role(user, role).await?;
        Ok(())
    }

    pub async fn is_caller_admin(&self) -> Result<bool, ClientError> {
        Ok(self.backend.is_caller_admin().await?)
    }

    pub async fn is_site_owner(&self) -> Result<bool, ClientError> {
        Ok(self.backend.is_site_owner().await?)
    }

    // ------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------

    pub async fn create_post(
        &self,
        draft: PostDraft,
        author_is_adult: bool,
    ) -> Result<Post, ClientError> {
        self.create_post_with_progress(draft, author_is_adult, None)
            .await
    }

    /// Validate, upload the attached image if any, then create the post.
    #[instrument(skip(self, draft, progress), fields(is_18_plus = draft.is_18_plus))]
    pub async fn create_post_with_progress(
        &self,
        draft: PostDraft,
        author_is_adult: bool,
        progress: Option<UploadProgress>,
    ) -> Result<Post, ClientError> {
        draft.validate(author_is_adult)?;
        let author = self.require_caller().await?;

        let image_url = match draft.image {
            Some(bytes) => {
                let blob = self.blobs.put(bytes, progress).await?;
                debug!(blob = %blob, "Post image uploaded");
                Some(blob)
            }
            None => None,
        };

        let post = Post {
            id: PostId::new(Uuid::new_v4().to_string()),
            content: draft.content,
            user_id: author,
            is_anonymous: draft.is_anonymous,
            is_18_plus: draft.is_18_plus,
            emotion: draft.emotion,
            body_sensation: draft.body_sensation,
            image_url,
            visibility: draft.visibility,
            is_flagged: false,
            flagged_by: None,
            timestamp: self.stamp(),
        };
        self.backend.create_post(post.clone()).await?;
        Ok(post)
    }

    /// Newest first.
    pub async fn posts(&self, page: PageRequest) -> Result<Page<Post>, ClientError> {
        let items = self.backend.posts(page).await?;
        Ok(Page::new(items, page))
    }

    pub async fn posts_by_user(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Page<Post>, ClientError> {
        let items = self.backend.posts_by_user(user, page).await?;
        Ok(Page::new(items, page))
    }

    pub async fn post(&self, id: &PostId) -> Result<Option<Post>, ClientError> {
        Ok(self.backend.post(id).await?)
    }

    #[instrument(skip(self, post), fields(post_id = %post.id))]
    pub async fn update_post(&self, post: Post) -> Result<(), ClientError> {
        if post.content.trim().is_empty() {
            return Err(ValidationError::required("content").into());
        }
        self.backend.update_post(post).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.backend.delete_post(id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Comments
    // ------------------------------------------------------------------

    #[instrument(skip(self, draft), fields(post_id = %draft.post_id))]
    pub async fn create_comment(&self, draft: CommentDraft) -> Result<Comment, ClientError> {
        draft.validate()?;
        let author = self.require_caller().await?;

        let comment = Comment {
            id: CommentId::new(Uuid::new_v4().to_string()),
            content: draft.content,
            user_id: author,
            post_id: draft.post_id,
            parent_comment_id: draft.parent_comment_id,
            timestamp: self.stamp(),
        };
        self.backend.create_comment(comment.clone()).await?;
        Ok(comment)
    }

    pub async fn comments_for_post(&self, post: &PostId) -> Result<Vec<Comment>, ClientError> {
        Ok(self.backend.comments_for_post(post).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_comment(&self, id: &CommentId) -> Result<(), ClientError> {
        self.backend.delete_comment(id).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    pub async fn add_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), ClientError> {
        self.backend.add_reaction(user, post, kind).await?;
        Ok(())
    }

    pub async fn remove_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), ClientError> {
        self.backend.remove_reaction(user, post, kind).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Friendships
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn send_friend_request(&self, to: &UserId) -> Result<(), ClientError> {
        if to.is_empty() {
            return Err(ValidationError::required("recipient").into());
        }
        if self.caller_id().await.as_ref() == Some(to) {
            return Err(ValidationError::SelfFriendRequest.into());
        }
        self.backend.send_friend_request(to).await?;
        Ok(())
    }

    pub async fn accept_friend_request(&self, from: &UserId) -> Result<(), ClientError> {
        self.backend.accept_friend_request(from).await?;
        Ok(())
    }

    pub async fn reject_friend_request(&self, from: &UserId) -> Result<(), ClientError> {
        self.backend.reject_friend_request(from).await?;
        Ok(())
    }

    pub async fn unfriend(&self, user: &UserId) -> Result<(), ClientError> {
        self.backend.unfriend(user).await?;
        Ok(())
    }

    pub async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, ClientError> {
        Ok(self.backend.friends(user).await?)
    }

    pub async fn pending_friend_requests(&self) -> Result<Vec<Friendship>, ClientError> {
        Ok(self.backend.pending_friend_requests().await?)
    }

    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, ClientError> {
        Ok(self.backend.are_friends(a, b).await?)
    }

    // ------------------------------------------------------------------
    // Moderation; privileges are enforced by the boundary alone.
    // ------------------------------------------------------------------

    pub async fn flag_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.backend.flag_post(id).await?;
        Ok(())
    }

    pub async fn unflag_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.backend.unflag_post(id).await?;
        Ok(())
    }

    pub async fn ban_user(&self, user: &UserId) -> Result<(), ClientError> {
        self.backend.ban_user(user).await?;
        Ok(())
    }

    pub async fn unban_user(&self, user: &UserId) -> Result<(), ClientError> {
        self.backend.unban_user(user).await?;
        Ok(())
    }

    pub async fn flagged_posts(&self) -> Result<Vec<Post>, ClientError> {
        Ok(self.backend.flagged_posts().await?)
    }

    // ------------------------------------------------------------------
    // Blobs
    // ------------------------------------------------------------------

    pub async fn upload_blob(
        &self,
        bytes: bytes::Bytes,
        progress: Option<UploadProgress>,
    ) -> Result<BlobRef, ClientError> {
        Ok(self.blobs.put(bytes, progress).await?)
    }

    pub fn blob_url(&self, blob: &BlobRef) -> String {
        self.blobs.direct_url(blob)
    }
}

fn check_profile_fields(profile: &UserProfile) -> Result<(), ValidationError> {
    validation::validate_username(&profile.username)?;
    if !validation::validate_email(&profile.email) {
        return Err(ValidationError::Email);
    }
    Ok(())
}

/// Edits may leave the email blank; a non-empty one must still be well formed.
fn check_profile_edit(profile: &UserProfile) -> Result<(), ValidationError> {
    validation::validate_username(&profile.username)?;
    if !profile.email.is_empty() && !validation::validate_email(&profile.email) {
        return Err(ValidationError::Email);
    }
    Ok(())
}
