//! In-process implementation of every boundary trait.
//!
//! Used by tests. It enforces the same ownership and permission rules the
//! remote service does, and counts calls per operation so coalescing and
//! cache hits can be observed.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;
use uuid::Uuid;

use crate::application::boundary::{
    BackendError, BlobStore, IdentityProvider, SocialBackend, UploadProgress,
};
use crate::application::pagination::PageRequest;
use crate::cache::lock::mutex_lock;
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::types::{
    BlobRef, CommentId, FriendshipStatus, PostId, ReactionKind, UserId, UserRole,
};

const SOURCE: &str = "infra::memory";

#[derive(Default)]
struct State {
    caller: Option<UserId>,
    login_as: Option<UserId>,
    offline: bool,
    profiles: HashMap<UserId, UserProfile>,
    admins: HashSet<UserId>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    reactions: HashSet<(UserId, PostId, ReactionKind)>,
    friendships: Vec<Friendship>,
    blobs: HashMap<BlobRef, Bytes>,
}

impl State {
    fn caller(&self) -> Result<UserId, BackendError> {
        self.caller.clone().ok_or(BackendError::Unauthenticated)
    }

    fn is_moderator(&self, owner: Option<&UserId>, user: &UserId) -> bool {
        self.admins.contains(user) || owner == Some(user)
    }

    /// Caller with a profile that is not banned.
    fn active_member(&self) -> Result<UserId, BackendError> {
        let caller = self.caller()?;
        match self.profiles.get(&caller) {
            None => Err(BackendError::PermissionDenied(
                "register a profile first".into(),
            )),
            Some(profile) if profile.is_banned => {
                Err(BackendError::PermissionDenied("user is banned".into()))
            }
            Some(_) => Ok(caller),
        }
    }

    fn username_taken(&self, username: &str, except: Option<&UserId>) -> bool {
        self.profiles.iter().any(|(owner, profile)| {
            Some(owner) != except && profile.username.eq_ignore_ascii_case(username)
        })
    }

    fn post_mut(&mut self, id: &PostId) -> Result<&mut Post, BackendError> {
        self.posts
            .iter_mut()
            .find(|post| &post.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("post {id}")))
    }

    fn friendship_position(
        &self,
        a: &UserId,
        b: &UserId,
        matches: impl Fn(&Friendship) -> bool,
    ) -> Option<usize> {
        self.friendships
            .iter()
            .position(|record| record.connects(a, b) && matches(record))
    }
}

fn paginate(mut posts: Vec<Post>, page: PageRequest) -> Vec<Post> {
    posts.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.id.cmp(&a.id))
    });
    posts
        .into_iter()
        .skip(page.offset as usize)
        .take(page.limit as usize)
        .collect()
}

pub struct InMemoryBackend {
    state: Mutex<State>,
    calls: Mutex<HashMap<&'static str, usize>>,
    owner: Option<UserId>,
    latency: Option<Duration>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            calls: Mutex::new(HashMap::new()),
            owner: None,
            latency: None,
        }
    }

    pub fn with_site_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Delay every boundary call, so concurrent reads overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_admin(self, user: UserId) -> Self {
        mutex_lock(&self.state, SOURCE, "with_admin")
            .admins
            .insert(user);
        self
    }

    pub fn with_profile(self, user: UserId, profile: UserProfile) -> Self {
        mutex_lock(&self.state, SOURCE, "with_profile")
            .profiles
            .insert(user, profile);
        self
    }

    /// Principal returned by the next `login`.
    pub fn with_login(self, user: UserId) -> Self {
        mutex_lock(&self.state, SOURCE, "with_login").login_as = Some(user);
        self
    }

    pub fn set_caller(&self, caller: Option<UserId>) {
        mutex_lock(&self.state, SOURCE, "set_caller").caller = caller;
    }

    /// While offline every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        mutex_lock(&self.state, SOURCE, "set_offline").offline = offline;
    }

    /// How often `operation` (wire name, e.g. `getPosts`) reached the backend.
    pub fn calls(&self, operation: &str) -> usize {
        mutex_lock(&self.calls, SOURCE, "calls")
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        mutex_lock(&self.calls, SOURCE, "total_calls").values().sum()
    }

    pub fn reaction_count(&self, post: &PostId, kind: ReactionKind) -> usize {
        mutex_lock(&self.state, SOURCE, "reaction_count")
            .reactions
            .iter()
            .filter(|(_, reacted, reaction)| reacted == post && *reaction == kind)
            .count()
    }

    async fn enter(&self, operation: &'static str) -> Result<(), BackendError> {
        *mutex_lock(&self.calls, SOURCE, "enter")
            .entry(operation)
            .or_default() += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if mutex_lock(&self.state, SOURCE, "enter").offline {
            return Err(BackendError::Unavailable("backend offline".into()));
        }
        debug!(operation, "In-memory backend call");
        Ok(())
    }

    fn with_state<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut State) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        let mut state = mutex_lock(&self.state, SOURCE, op);
        f(&mut state)
    }

    fn require_moderator(&self, state: &State) -> Result<UserId, BackendError> {
        let caller = state.caller()?;
        if state.is_moderator(self.owner.as_ref(), &caller) {
            Ok(caller)
        } else {
            Err(BackendError::PermissionDenied("admins only".into()))
        }
    }

    fn set_banned(&self, user: &UserId, banned: bool) -> Result<(), BackendError> {
        self.with_state("set_banned", |state| {
            self.require_moderator(state)?;
            if banned && self.owner.as_ref() == Some(user) {
                return Err(BackendError::Rejected("the site owner cannot be banned".into()));
            }
            let profile = state
                .profiles
                .get_mut(user)
                .ok_or_else(|| BackendError::NotFound(format!("user {user}")))?;
            profile.is_banned = banned;
            Ok(())
        })
    }

    fn answer_request(&self, from: &UserId, status: FriendshipStatus) -> Result<(), BackendError> {
        self.with_state("answer_request", |state| {
            let me = state.caller()?;
            let position = state
                .friendship_position(from, &me, |record| {
                    record.status == FriendshipStatus::Pending && record.requester() == from
                })
                .ok_or_else(|| BackendError::NotFound(format!("friend request from {from}")))?;
            state.friendships[position].status = status;
            Ok(())
        })
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SocialBackend for InMemoryBackend {
    async fn register_user(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.enter("registerUser").await?;
        self.with_state("register_user", |state| {
            let caller = state.caller()?;
            if state.profiles.contains_key(&caller) {
                return Err(BackendError::Conflict("caller is already registered".into()));
            }
            if state.username_taken(&profile.username, None) {
                return Err(BackendError::Conflict(format!(
                    "username `{}` is already taken",
                    profile.username
                )));
            }
            state.profiles.insert(caller, profile);
            Ok(())
        })
    }

    async fn caller_profile(&self) -> Result<Option<UserProfile>, BackendError> {
        self.enter("getCallerUserProfile").await?;
        self.with_state("caller_profile", |state| {
            Ok(state
                .caller
                .as_ref()
                .and_then(|caller| state.profiles.get(caller).cloned()))
        })
    }

    async fn user_profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError> {
        self.enter("getUserProfile").await?;
        self.with_state("user_profile", |state| Ok(state.profiles.get(user).cloned()))
    }

    async fn save_caller_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.enter("saveCallerUserProfile").await?;
        self.with_state("save_caller_profile", |state| {
            let caller = state.caller()?;
            if state.username_taken(&profile.username, Some(&caller)) {
                return Err(BackendError::Conflict(format!(
                    "username `{}` is already taken",
                    profile.username
                )));
            }
            // Ban status is not the caller's to change.
            let is_banned = state
                .profiles
                .get(&caller)
                .is_some_and(|existing| existing.is_banned);
            state.profiles.insert(
                caller,
                UserProfile {
                    is_banned,
                    ..profile
                },
            );
            Ok(())
        })
    }

    async fn update_user_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.enter("updateUserProfile").await?;
        self.with_state("update_user_profile", |state| {
            let caller = state.caller()?;
            if state.username_taken(&profile.username, Some(&caller)) {
                return Err(BackendError::Conflict(format!(
                    "username `{}` is already taken",
                    profile.username
                )));
            }
            let existing = state
                .profiles
                .get_mut(&caller)
                .ok_or_else(|| BackendError::NotFound("caller profile".into()))?;
            *existing = UserProfile {
                is_banned: existing.is_banned,
                ..profile
            };
            Ok(())
        })
    }

    async fn is_username_available(&self, username: &str) -> Result<bool, BackendError> {
        self.enter("isUsernameAvailable").await?;
        self.with_state("is_username_available", |state| {
            Ok(!state.username_taken(username, None))
        })
    }

    async fn caller_role(&self) -> Result<UserRole, BackendError> {
        self.enter("getCallerUserRole").await?;
        self.with_state("caller_role", |state| {
            Ok(match state.caller.as_ref() {
                Some(caller) if state.is_moderator(self.owner.as_ref(), caller) => UserRole::Admin,
                Some(caller) if state.profiles.contains_key(caller) => UserRole::User,
                _ => UserRole::Guest,
            })
        })
    }

    async fn assign_caller_user_role(
        &self,
        user: &UserId,
        role: UserRole,
    ) -> Result<(), BackendError> {
        self.enter("assignCallerUserRole").await?;
        self.with_state("assign_caller_user_role", |state| {
            self.require_moderator(state)?;
            match role {
                UserRole::Admin => {
                    state.admins.insert(user.clone());
                }
                UserRole::User | UserRole::Guest => {
                    state.admins.remove(user);
                }
            }
            Ok(())
        })
    }

    async fn is_caller_admin(&self) -> Result<bool, BackendError> {
        self.enter("isCallerAdmin").await?;
        self.with_state("is_caller_admin", |state| {
            Ok(state
                .caller
                .as_ref()
                .is_some_and(|caller| state.admins.contains(caller)))
        })
    }

    async fn is_site_owner(&self) -> Result<bool, BackendError> {
        self.enter("isSiteOwner").await?;
        self.with_state("is_site_owner", |state| {
            Ok(state.caller.is_some() && state.caller == self.owner)
        })
    }

    async fn create_post(&self, post: Post) -> Result<(), BackendError> {
        self.enter("createPost").await?;
        self.with_state("create_post", |state| {
            let caller = state.active_member()?;
            if !post.is_authored_by(&caller) {
                return Err(BackendError::PermissionDenied(
                    "posts must be authored by the caller".into(),
                ));
            }
            if state.posts.iter().any(|existing| existing.id == post.id) {
                return Err(BackendError::Conflict(format!("post {} exists", post.id)));
            }
            state.posts.push(post);
            Ok(())
        })
    }

    async fn posts(&self, page: PageRequest) -> Result<Vec<Post>, BackendError> {
        self.enter("getPosts").await?;
        self.with_state("posts", |state| Ok(paginate(state.posts.clone(), page)))
    }

    async fn posts_by_user(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Vec<Post>, BackendError> {
        self.enter("getPostsByUser").await?;
        self.with_state("posts_by_user", |state| {
            let posts = state
                .posts
                .iter()
                .filter(|post| post.is_authored_by(user))
                .cloned()
                .collect();
            Ok(paginate(posts, page))
        })
    }

    async fn post(&self, id: &PostId) -> Result<Option<Post>, BackendError> {
        self.enter("getPost").await?;
        self.with_state("post", |state| {
            Ok(state.posts.iter().find(|post| &post.id == id).cloned())
        })
    }

    async fn update_post(&self, post: Post) -> Result<(), BackendError> {
        self.enter("updatePost").await?;
        self.with_state("update_post", |state| {
            let caller = state.caller()?;
            let existing = state.post_mut(&post.id)?;
            if !existing.is_authored_by(&caller) {
                return Err(BackendError::PermissionDenied("only the author may edit".into()));
            }
            existing.content = post.content;
            existing.emotion = post.emotion;
            existing.body_sensation = post.body_sensation;
            existing.is_anonymous = post.is_anonymous;
            existing.is_18_plus = post.is_18_plus;
            existing.visibility = post.visibility;
            existing.image_url = post.image_url;
            Ok(())
        })
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.enter("deletePost").await?;
        self.with_state("delete_post", |state| {
            let caller = state.caller()?;
            let author = state.post_mut(id)?.user_id.clone();
            if author != caller && !state.is_moderator(self.owner.as_ref(), &caller) {
                return Err(BackendError::PermissionDenied(
                    "only the author or an admin may delete".into(),
                ));
            }
            state.posts.retain(|post| &post.id != id);
            state.comments.retain(|comment| &comment.post_id != id);
            state.reactions.retain(|(_, post, _)| post != id);
            Ok(())
        })
    }

    async fn create_comment(&self, comment: Comment) -> Result<(), BackendError> {
        self.enter("createComment").await?;
        self.with_state("create_comment", |state| {
            let caller = state.active_member()?;
            if comment.user_id != caller {
                return Err(BackendError::PermissionDenied(
                    "comments must be authored by the caller".into(),
                ));
            }
            state.post_mut(&comment.post_id)?;
            if let Some(parent) = comment.parent_comment_id.as_ref()
                && !state
                    .comments
                    .iter()
                    .any(|existing| &existing.id == parent && existing.post_id == comment.post_id)
            {
                return Err(BackendError::Rejected(format!(
                    "parent comment {parent} is not on post {}",
                    comment.post_id
                )));
            }
            state.comments.push(comment);
            Ok(())
        })
    }

    async fn comments_for_post(&self, post: &PostId) -> Result<Vec<Comment>, BackendError> {
        self.enter("getCommentsByPost").await?;
        self.with_state("comments_for_post", |state| {
            let mut comments: Vec<Comment> = state
                .comments
                .iter()
                .filter(|comment| &comment.post_id == post)
                .cloned()
                .collect();
            comments.sort_by_key(|comment| comment.timestamp);
            Ok(comments)
        })
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), BackendError> {
        self.enter("deleteComment").await?;
        self.with_state("delete_comment", |state| {
            let caller = state.caller()?;
            let position = state
                .comments
                .iter()
                .position(|comment| &comment.id == id)
                .ok_or_else(|| BackendError::NotFound(format!("comment {id}")))?;
            if state.comments[position].user_id != caller
                && !state.is_moderator(self.owner.as_ref(), &caller)
            {
                return Err(BackendError::PermissionDenied(
                    "only the author or an admin may delete".into(),
                ));
            }
            state.comments.remove(position);
            Ok(())
        })
    }

    async fn add_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError> {
        self.enter("addReaction").await?;
        self.with_state("add_reaction", |state| {
            if &state.caller()? != user {
                return Err(BackendError::PermissionDenied(
                    "reactions belong to the caller".into(),
                ));
            }
            state.post_mut(post)?;
            state.reactions.insert((user.clone(), post.clone(), kind));
            Ok(())
        })
    }

    async fn remove_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError> {
        self.enter("removeReaction").await?;
        self.with_state("remove_reaction", |state| {
            if &state.caller()? != user {
                return Err(BackendError::PermissionDenied(
                    "reactions belong to the caller".into(),
                ));
            }
            state.reactions.remove(&(user.clone(), post.clone(), kind));
            Ok(())
        })
    }

    async fn send_friend_request(&self, to: &UserId) -> Result<(), BackendError> {
        self.enter("sendFriendRequest").await?;
        self.with_state("send_friend_request", |state| {
            let me = state.caller()?;
            if &me == to {
                return Err(BackendError::Rejected("cannot befriend yourself".into()));
            }
            if !state.profiles.contains_key(to) {
                return Err(BackendError::NotFound(format!("user {to}")));
            }
            if state
                .friendship_position(&me, to, |record| record.status.is_active())
                .is_some()
            {
                return Err(BackendError::Conflict(format!(
                    "a request or friendship with {to} already exists"
                )));
            }
            state
                .friendships
                .retain(|record| !record.connects(&me, to));
            state.friendships.push(Friendship::pending(me, to.clone()));
            Ok(())
        })
    }

    async fn accept_friend_request(&self, from: &UserId) -> Result<(), BackendError> {
        self.enter("acceptFriendRequest").await?;
        self.answer_request(from, FriendshipStatus::Accepted)
    }

    async fn reject_friend_request(&self, from: &UserId) -> Result<(), BackendError> {
        self.enter("rejectFriendRequest").await?;
        self.answer_request(from, FriendshipStatus::Rejected)
    }

    async fn unfriend(&self, user: &UserId) -> Result<(), BackendError> {
        self.enter("unfriend").await?;
        self.with_state("unfriend", |state| {
            let me = state.caller()?;
            let position = state
                .friendship_position(&me, user, |record| {
                    record.status == FriendshipStatus::Accepted
                })
                .ok_or_else(|| BackendError::NotFound(format!("friendship with {user}")))?;
            state.friendships.remove(position);
            Ok(())
        })
    }

    async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, BackendError> {
        self.enter("getFriends").await?;
        self.with_state("friends", |state| {
            Ok(state
                .friendships
                .iter()
                .filter(|record| record.status == FriendshipStatus::Accepted)
                .filter_map(|record| record.other_party(user).cloned())
                .collect())
        })
    }

    async fn pending_friend_requests(&self) -> Result<Vec<Friendship>, BackendError> {
        self.enter("getPendingFriendRequests").await?;
        self.with_state("pending_friend_requests", |state| {
            let me = state.caller()?;
            Ok(state
                .friendships
                .iter()
                .filter(|record| {
                    record.status == FriendshipStatus::Pending && record.recipient() == &me
                })
                .cloned()
                .collect())
        })
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, BackendError> {
        self.enter("areFriends").await?;
        self.with_state("are_friends", |state| {
            Ok(state
                .friendship_position(a, b, |record| record.status == FriendshipStatus::Accepted)
                .is_some())
        })
    }

    async fn flag_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.enter("flagPost").await?;
        self.with_state("flag_post", |state| {
            let caller = state.active_member()?;
            let post = state.post_mut(id)?;
            post.is_flagged = true;
            post.flagged_by = Some(caller);
            Ok(())
        })
    }

    async fn unflag_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.enter("unflagPost").await?;
        self.with_state("unflag_post", |state| {
            self.require_moderator(state)?;
            let post = state.post_mut(id)?;
            post.is_flagged = false;
            post.flagged_by = None;
            Ok(())
        })
    }

    async fn ban_user(&self, user: &UserId) -> Result<(), BackendError> {
        self.enter("banUser").await?;
        self.set_banned(user, true)
    }

    async fn unban_user(&self, user: &UserId) -> Result<(), BackendError> {
        self.enter("unbanUser").await?;
        self.set_banned(user, false)
    }

    async fn flagged_posts(&self) -> Result<Vec<Post>, BackendError> {
        self.enter("getFlaggedPosts").await?;
        self.with_state("flagged_posts", |state| {
            self.require_moderator(state)?;
            Ok(state
                .posts
                .iter()
                .filter(|post| post.is_flagged)
                .cloned()
                .collect())
        })
    }
}

#[async_trait]
impl IdentityProvider for InMemoryBackend {
    /// Signs in as the principal set by `with_login`, or a fresh one.
    async fn login(&self) -> Result<UserId, BackendError> {
        self.enter("login").await?;
        self.with_state("login", |state| {
            let user = state
                .login_as
                .clone()
                .unwrap_or_else(|| UserId::new(Uuid::new_v4().to_string()));
            state.caller = Some(user.clone());
            Ok(user)
        })
    }

    async fn logout(&self) -> Result<(), BackendError> {
        self.set_caller(None);
        Ok(())
    }

    async fn caller(&self) -> Option<UserId> {
        mutex_lock(&self.state, SOURCE, "caller").caller.clone()
    }
}

#[async_trait]
impl BlobStore for InMemoryBackend {
    async fn put(
        &self,
        bytes: Bytes,
        progress: Option<UploadProgress>,
    ) -> Result<BlobRef, BackendError> {
        self.enter("putBlob").await?;
        if let Some(report) = progress.as_ref() {
            report(0);
        }
        let blob = BlobRef::new(format!("blob-{}", Uuid::new_v4()));
        self.with_state("put_blob", |state| {
            state.blobs.insert(blob.clone(), bytes);
            Ok(())
        })?;
        if let Some(report) = progress.as_ref() {
            report(100);
        }
        Ok(blob)
    }

    fn direct_url(&self, blob: &BlobRef) -> String {
        format!("memory://blobs/{blob}")
    }
}
