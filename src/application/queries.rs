//! Cached query layer over the domain client.
//!
//! Reads go through [`QueryCache::fetch`] keyed by operation and
//! parameters. Mutations call the client and, only when it succeeds,
//! publish the matching [`Mutation`] so every dependent read goes stale.

use std::future::Future;
use std::sync::Arc;

use tracing::instrument;

use crate::application::boundary::{BackendError, UploadProgress};
use crate::application::client::DomainClient;
use crate::application::error::ClientError;
use crate::application::pagination::{Page, PageRequest};
use crate::cache::{CacheConfig, InvalidationPlan, Mutation, QueryCache, QueryKey, QueryValue};
use crate::domain::comments::CommentDraft;
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::posts::PostDraft;
use crate::domain::types::{CommentId, PostId, ReactionKind, UserId, UserRole};

#[derive(Clone)]
pub struct QueryLayer {
    client: DomainClient,
    cache: Arc<QueryCache>,
}

impl QueryLayer {
    pub fn new(client: DomainClient, config: &CacheConfig) -> Self {
        Self {
            client,
            cache: Arc::new(QueryCache::new(config)),
        }
    }

    pub fn client(&self) -> &DomainClient {
        &self.client
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    async fn read<T, Fut>(
        &self,
        key: QueryKey,
        load: Fut,
        extract: fn(QueryValue) -> Option<T>,
    ) -> Result<T, ClientError>
    where
        Fut: Future<Output = Result<QueryValue, ClientError>> + Send + 'static,
    {
        let value = self.cache.fetch(key.clone(), move || load).await?;
        extract(value).ok_or_else(|| ClientError::cache_mismatch(&key))
    }

    fn publish(&self, mutation: Mutation) -> InvalidationPlan {
        self.cache.trigger(mutation)
    }

    async fn require_caller(&self) -> Result<UserId, ClientError> {
        self.client
            .caller_id()
            .await
            .ok_or(ClientError::Boundary(BackendError::Unauthenticated))
    }

    // ------------------------------------------------------------------
    // Cached reads
    // ------------------------------------------------------------------

    pub async fn caller_profile(&self) -> Result<Option<UserProfile>, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::CallerProfile,
            async move { client.caller_profile().await.map(QueryValue::Profile) },
            |value| match value {
                QueryValue::Profile(profile) => Some(profile),
                _ => None,
            },
        )
        .await
    }

    pub async fn user_profile(&self, user: &UserId) -> Result<Option<UserProfile>, ClientError> {
        let client = self.client.clone();
        let id = user.clone();
        self.read(
            QueryKey::UserProfile(user.clone()),
            async move { client.user_profile(&id).await.map(QueryValue::Profile) },
            |value| match value {
                QueryValue::Profile(profile) => Some(profile),
                _ => None,
            },
        )
        .await
    }

    pub async fn is_username_available(&self, username: &str) -> Result<bool, ClientError> {
        let client = self.client.clone();
        let name = username.to_string();
        self.read(
            QueryKey::UsernameAvailable(username.to_string()),
            async move { client.is_username_available(&name).await.map(QueryValue::Flag) },
            as_flag,
        )
        .await
    }

    pub async fn caller_role(&self) -> Result<UserRole, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::CallerRole,
            async move { client.caller_role().await.map(QueryValue::Role) },
            |value| match value {
                QueryValue::Role(role) => Some(role),
                _ => None,
            },
        )
        .await
    }

    pub async fn is_caller_admin(&self) -> Result<bool, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::IsCallerAdmin,
            async move { client.is_caller_admin().await.map(QueryValue::Flag) },
            as_flag,
        )
        .await
    }

    pub async fn is_site_owner(&self) -> Result<bool, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::IsSiteOwner,
            async move { client.is_site_owner().await.map(QueryValue::Flag) },
            as_flag,
        )
        .await
    }

    pub async fn posts(&self, page: PageRequest) -> Result<Page<Post>, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::Posts(page),
            async move { client.posts(page).await.map(QueryValue::PostPage) },
            as_post_page,
        )
        .await
    }

    pub async fn posts_by_user(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Page<Post>, ClientError> {
        let client = self.client.clone();
        let id = user.clone();
        self.read(
            QueryKey::UserPosts {
                user: user.clone(),
                page,
            },
            async move {
                client
                    .posts_by_user(&id, page)
                    .await
                    .map(QueryValue::PostPage)
            },
            as_post_page,
        )
        .await
    }

    pub async fn post(&self, id: &PostId) -> Result<Option<Post>, ClientError> {
        let client = self.client.clone();
        let post_id = id.clone();
        self.read(
            QueryKey::Post(id.clone()),
            async move { client.post(&post_id).await.map(QueryValue::Post) },
            |value| match value {
                QueryValue::Post(post) => Some(post),
                _ => None,
            },
        )
        .await
    }

    pub async fn comments(&self, post: &PostId) -> Result<Vec<Comment>, ClientError> {
        let client = self.client.clone();
        let post_id = post.clone();
        self.read(
            QueryKey::Comments(post.clone()),
            async move {
                client
                    .comments_for_post(&post_id)
                    .await
                    .map(QueryValue::Comments)
            },
            |value| match value {
                QueryValue::Comments(comments) => Some(comments),
                _ => None,
            },
        )
        .await
    }

    pub async fn pending_friend_requests(&self) -> Result<Vec<Friendship>, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::PendingRequests,
            async move {
                client
                    .pending_friend_requests()
                    .await
                    .map(QueryValue::Friendships)
            },
            |value| match value {
                QueryValue::Friendships(requests) => Some(requests),
                _ => None,
            },
        )
        .await
    }

    pub async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, ClientError> {
        let client = self.client.clone();
        let id = user.clone();
        self.read(
            QueryKey::Friends(user.clone()),
            async move { client.friends(&id).await.map(QueryValue::Users) },
            |value| match value {
                QueryValue::Users(users) => Some(users),
                _ => None,
            },
        )
        .await
    }

    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, ClientError> {
        let client = self.client.clone();
        let (first, second) = (a.clone(), b.clone());
        self.read(
            QueryKey::are_friends(a.clone(), b.clone()),
            async move { client.are_friends(&first, &second).await.map(QueryValue::Flag) },
            as_flag,
        )
        .await
    }

    pub async fn flagged_posts(&self) -> Result<Vec<Post>, ClientError> {
        let client = self.client.clone();
        self.read(
            QueryKey::FlaggedPosts,
            async move { client.flagged_posts().await.map(QueryValue::Posts) },
            |value| match value {
                QueryValue::Posts(posts) => Some(posts),
                _ => None,
            },
        )
        .await
    }

    // ------------------------------------------------------------------
    // Profile mutations
    // ------------------------------------------------------------------

    #[instrument(skip(self, profile))]
    pub async fn register(&self, profile: UserProfile) -> Result<(), ClientError> {
        let user = self.require_caller().await?;
        self.client.register(profile).await?;
        self.publish(Mutation::ProfileRegistered { user });
        Ok(())
    }

    #[instrument(skip(self, profile))]
    pub async fn save_caller_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        let user = self.require_caller().await?;
        self.client.save_caller_profile(profile).await?;
        self.publish(Mutation::ProfileSaved { user });
        Ok(())
    }

    #[instrument(skip(self, profile))]
    pub async fn update_user_profile(&self, profile: UserProfile) -> Result<(), ClientError> {
        let user = self.require_caller().await?;
        self.client.update_user_profile(profile).await?;
        self.publish(Mutation::ProfileUpdated { user });
        Ok(())
    }

    pub async fn assign_role(&self, user: &UserId, role: UserRole) -> Result<(), ClientError> {
        self.client.assign_role(user, role).await?;
        self.publish(Mutation::RoleAssigned { user: user.clone() });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Post, comment and reaction mutations
    // ------------------------------------------------------------------

    pub async fn create_post(
        &self,
        draft: PostDraft,
        author_is_adult: bool,
    ) -> Result<Post, ClientError> {
        self.create_post_with_progress(draft, author_is_adult, None)
            .await
    }

    pub async fn create_post_with_progress(
        &self,
        draft: PostDraft,
        author_is_adult: bool,
        progress: Option<UploadProgress>,
    ) -> Result<Post, ClientError> {
        let post = self
            .client
            .create_post_with_progress(draft, author_is_adult, progress)
            .await?;
        self.publish(Mutation::PostCreated {
            post: post.id.clone(),
        });
        Ok(post)
    }

    pub async fn update_post(&self, post: Post) -> Result<(), ClientError> {
        let id = post.id.clone();
        self.client.update_post(post).await?;
        self.publish(Mutation::PostUpdated { post: id });
        Ok(())
    }

    pub async fn delete_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.client.delete_post(id).await?;
        self.publish(Mutation::PostDeleted { post: id.clone() });
        Ok(())
    }

    pub async fn create_comment(&self, draft: CommentDraft) -> Result<Comment, ClientError> {
        let comment = self.client.create_comment(draft).await?;
        self.publish(Mutation::CommentCreated {
            post: comment.post_id.clone(),
            comment: comment.id.clone(),
        });
        Ok(comment)
    }

    /// The post id scopes the invalidation; the boundary only needs the comment id.
    pub async fn delete_comment(&self, post: &PostId, id: &CommentId) -> Result<(), ClientError> {
        self.client.delete_comment(id).await?;
        self.publish(Mutation::CommentDeleted {
            post: post.clone(),
            comment: id.clone(),
        });
        Ok(())
    }

    pub async fn add_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), ClientError> {
        self.client.add_reaction(user, post, kind).await?;
        self.publish(Mutation::ReactionAdded { post: post.clone() });
        Ok(())
    }

    pub async fn remove_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), ClientError> {
        self.client.remove_reaction(user, post, kind).await?;
        self.publish(Mutation::ReactionRemoved { post: post.clone() });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Friendship mutations
    // ------------------------------------------------------------------

    pub async fn send_friend_request(&self, to: &UserId) -> Result<(), ClientError> {
        let from = self.require_caller().await?;
        self.client.send_friend_request(to).await?;
        self.publish(Mutation::FriendRequestSent {
            from,
            to: to.clone(),
        });
        Ok(())
    }

    pub async fn accept_friend_request(&self, from: &UserId) -> Result<(), ClientError> {
        let me = self.require_caller().await?;
        self.client.accept_friend_request(from).await?;
        self.publish(Mutation::FriendRequestAccepted {
            from: me,
            to: from.clone(),
        });
        Ok(())
    }

    pub async fn reject_friend_request(&self, from: &UserId) -> Result<(), ClientError> {
        let me = self.require_caller().await?;
        self.client.reject_friend_request(from).await?;
        self.publish(Mutation::FriendRequestRejected {
            from: me,
            to: from.clone(),
        });
        Ok(())
    }

    pub async fn unfriend(&self, user: &UserId) -> Result<(), ClientError> {
        let me = self.require_caller().await?;
        self.client.unfriend(user).await?;
        self.publish(Mutation::Unfriended {
            from: me,
            to: user.clone(),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Moderation mutations
    // ------------------------------------------------------------------

    pub async fn flag_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.client.flag_post(id).await?;
        self.publish(Mutation::PostFlagged { post: id.clone() });
        Ok(())
    }

    pub async fn unflag_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.client.unflag_post(id).await?;
        self.publish(Mutation::PostUnflagged { post: id.clone() });
        Ok(())
    }

    pub async fn ban_user(&self, user: &UserId) -> Result<(), ClientError> {
        self.client.ban_user(user).await?;
        self.publish(Mutation::UserBanned { user: user.clone() });
        Ok(())
    }

    pub async fn unban_user(&self, user: &UserId) -> Result<(), ClientError> {
        self.client.unban_user(user).await?;
        self.publish(Mutation::UserUnbanned { user: user.clone() });
        Ok(())
    }

    /// Moderator removal; also drops the post from the flagged list.
    pub async fn admin_delete_post(&self, id: &PostId) -> Result<(), ClientError> {
        self.client.delete_post(id).await?;
        self.publish(Mutation::PostRemovedByAdmin { post: id.clone() });
        Ok(())
    }

    // ------------------------------------------------------------------
    // Whole-cache operations
    // ------------------------------------------------------------------

    pub fn mark_all_stale(&self) -> usize {
        self.cache.mark_all_stale()
    }

    pub fn clear(&self) {
        self.cache.clear();
    }
}

fn as_flag(value: QueryValue) -> Option<bool> {
    match value {
        QueryValue::Flag(flag) => Some(flag),
        _ => None,
    }
}

fn as_post_page(value: QueryValue) -> Option<Page<Post>> {
    match value {
        QueryValue::PostPage(page) => Some(page),
        _ => None,
    }
}
