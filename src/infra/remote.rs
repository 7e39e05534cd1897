//! HTTP adapter for the remote social API.
//!
//! Every operation is `POST {base}/api/{method}` with a JSON object of named
//! arguments and a bearer token once signed in. Responses are JSON; an empty
//! body reads as `null`.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::application::boundary::{
    BackendError, BlobStore, IdentityProvider, SocialBackend, UploadProgress,
};
use crate::application::pagination::PageRequest;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::types::{BlobRef, CommentId, PostId, ReactionKind, UserId, UserRole};

use super::error::InfraError;

const SOURCE: &str = "infra::remote";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    principal: UserId,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Default)]
struct Credentials {
    token: Option<String>,
    caller: Option<UserId>,
}

pub struct HttpBackend {
    client: Client,
    base: Url,
    credentials: RwLock<Credentials>,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, InfraError> {
        let mut base = Url::parse(base_url)
            .map_err(|err| InfraError::configuration(format!("invalid api base url: {err}")))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;

        Ok(Self {
            client,
            base,
            credentials: RwLock::new(Credentials::default()),
        })
    }

    /// Start with a token obtained elsewhere; `login` confirms the principal.
    pub fn with_token(self, token: impl Into<String>) -> Self {
        rw_write(&self.credentials, SOURCE, "with_token").token = Some(token.into());
        self
    }

    pub fn user_agent() -> &'static str {
        concat!("feelslap/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base
            .join(path)
            .map_err(|err| BackendError::unavailable(format!("invalid endpoint `{path}`: {err}")))
    }

    fn bearer(&self) -> Option<String> {
        rw_read(&self.credentials, SOURCE, "bearer")
            .token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }

    #[instrument(skip(self, args))]
    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        args: Value,
    ) -> Result<T, BackendError> {
        let url = self.endpoint(&format!("api/{method}"))?;
        let mut request = self.client.post(url).json(&args);
        if let Some(bearer) = self.bearer() {
            request = request.header(AUTHORIZATION, bearer);
        }

        let response = request.send().await.map_err(BackendError::unavailable)?;
        let status = response.status();
        let body = response.bytes().await.map_err(BackendError::unavailable)?;
        if !status.is_success() {
            let message = String::from_utf8_lossy(&body).trim().to_string();
            warn!(method, status = status.as_u16(), "Remote call refused");
            return Err(map_status(status, message));
        }

        debug!(method, bytes = body.len(), "Remote call succeeded");
        decode(&body)
    }

    async fn call_unit(&self, method: &'static str, args: Value) -> Result<(), BackendError> {
        self.call::<IgnoredAny>(method, args).await.map(|_| ())
    }
}

/// Remote status codes to boundary failures.
pub(crate) fn map_status(status: StatusCode, message: String) -> BackendError {
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };
    match status {
        StatusCode::UNAUTHORIZED => BackendError::Unauthenticated,
        StatusCode::FORBIDDEN => BackendError::PermissionDenied(message),
        StatusCode::NOT_FOUND => BackendError::NotFound(message),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            BackendError::Rejected(message)
        }
        _ => BackendError::Unavailable(format!("status {status}: {message}")),
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, BackendError> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .map_err(|err| BackendError::unavailable(format!("malformed response: {err}")))?
    };
    serde_json::from_value(value)
        .map_err(|err| BackendError::unavailable(format!("unexpected response shape: {err}")))
}

#[async_trait]
impl SocialBackend for HttpBackend {
    async fn register_user(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.call_unit("registerUser", json!({ "profile": profile }))
            .await
    }

    async fn caller_profile(&self) -> Result<Option<UserProfile>, BackendError> {
        self.call("getCallerUserProfile", json!({})).await
    }

    async fn user_profile(&self, user: &UserId) -> Result<Option<UserProfile>, BackendError> {
        self.call("getUserProfile", json!({ "userId": user })).await
    }

    async fn save_caller_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.call_unit("saveCallerUserProfile", json!({ "profile": profile }))
            .await
    }

    async fn update_user_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.call_unit("updateUserProfile", json!({ "profile": profile }))
            .await
    }

    async fn is_username_available(&self, username: &str) -> Result<bool, BackendError> {
        // The contract names this argument `userId` though it carries a username.
        self.call("isUsernameAvailable", json!({ "userId": username }))
            .await
    }

    async fn caller_role(&self) -> Result<UserRole, BackendError> {
        self.call("getCallerUserRole", json!({})).await
    }

    async fn assign_caller_user_role(
        &self,
        user: &UserId,
        role: UserRole,
    ) -> Result<(), BackendError> {
        self.call_unit("assignCallerUserRole", json!({ "user": user, "role": role }))
            .await
    }

    async fn is_caller_admin(&self) -> Result<bool, BackendError> {
        self.call("isCallerAdmin", json!({})).await
    }

    async fn is_site_owner(&self) -> Result<bool, BackendError> {
        self.call("isSiteOwner", json!({})).await
    }

    async fn create_post(&self, post: Post) -> Result<(), BackendError> {
        self.call_unit("createPost", json!({ "post": post })).await
    }

    async fn posts(&self, page: PageRequest) -> Result<Vec<Post>, BackendError> {
        self.call(
            "getPosts",
            json!({ "limit": page.limit, "offset": page.offset }),
        )
        .await
    }

    async fn posts_by_user(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Vec<Post>, BackendError> {
        self.call(
            "getPostsByUser",
            json!({ "userId": user, "limit": page.limit, "offset": page.offset }),
        )
        .await
    }

    async fn post(&self, id: &PostId) -> Result<Option<Post>, BackendError> {
        self.call("getPost", json!({ "postId": id })).await
    }

    async fn update_post(&self, post: Post) -> Result<(), BackendError> {
        self.call_unit("updatePost", json!({ "post": post })).await
    }

    async fn delete_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.call_unit("deletePost", json!({ "postId": id })).await
    }

    async fn create_comment(&self, comment: Comment) -> Result<(), BackendError> {
        self.call_unit("createComment", json!({ "comment": comment }))
            .await
    }

    async fn comments_for_post(&self, post: &PostId) -> Result<Vec<Comment>, BackendError> {
        self.call("getCommentsByPost", json!({ "postId": post }))
            .await
    }

    async fn delete_comment(&self, id: &CommentId) -> Result<(), BackendError> {
        self.call_unit("deleteComment", json!({ "commentId": id }))
            .await
    }

    async fn add_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError> {
        self.call_unit(
            "addReaction",
            json!({ "userId": user, "postId": post, "reaction": kind }),
        )
        .await
    }

    async fn remove_reaction(
        &self,
        user: &UserId,
        post: &PostId,
        kind: ReactionKind,
    ) -> Result<(), BackendError> {
        self.call_unit(
            "removeReaction",
            json!({ "userId": user, "postId": post, "reaction": kind }),
        )
        .await
    }

    async fn send_friend_request(&self, to: &UserId) -> Result<(), BackendError> {
        self.call_unit("sendFriendRequest", json!({ "toUserId": to }))
            .await
    }

    async fn accept_friend_request(&self, from: &UserId) -> Result<(), BackendError> {
        self.call_unit("acceptFriendRequest", json!({ "fromUserId": from }))
            .await
    }

    async fn reject_friend_request(&self, from: &UserId) -> Result<(), BackendError> {
        self.call_unit("rejectFriendRequest", json!({ "fromUserId": from }))
            .await
    }

    async fn unfriend(&self, user: &UserId) -> Result<(), BackendError> {
        self.call_unit("unfriend", json!({ "userId": user })).await
    }

    async fn friends(&self, user: &UserId) -> Result<Vec<UserId>, BackendError> {
        self.call("getFriends", json!({ "userId": user })).await
    }

    async fn pending_friend_requests(&self) -> Result<Vec<Friendship>, BackendError> {
        self.call("getPendingFriendRequests", json!({})).await
    }

    async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, BackendError> {
        self.call("areFriends", json!({ "userId1": a, "userId2": b }))
            .await
    }

    async fn flag_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.call_unit("flagPost", json!({ "postId": id })).await
    }

    async fn unflag_post(&self, id: &PostId) -> Result<(), BackendError> {
        self.call_unit("unflagPost", json!({ "postId": id })).await
    }

    async fn ban_user(&self, user: &UserId) -> Result<(), BackendError> {
        self.call_unit("banUser", json!({ "userId": user })).await
    }

    async fn unban_user(&self, user: &UserId) -> Result<(), BackendError> {
        self.call_unit("unbanUser", json!({ "userId": user })).await
    }

    async fn flagged_posts(&self) -> Result<Vec<Post>, BackendError> {
        self.call("getFlaggedPosts", json!({})).await
    }
}

#[async_trait]
impl IdentityProvider for HttpBackend {
    /// Confirms the principal behind the current token and keeps any refreshed token.
    async fn login(&self) -> Result<UserId, BackendError> {
        let response: LoginResponse = self.call("whoami", json!({})).await?;
        let mut credentials = rw_write(&self.credentials, SOURCE, "login");
        if let Some(token) = response.token {
            credentials.token = Some(token);
        }
        credentials.caller = Some(response.principal.clone());
        Ok(response.principal)
    }

    async fn logout(&self) -> Result<(), BackendError> {
        *rw_write(&self.credentials, SOURCE, "logout") = Credentials::default();
        Ok(())
    }

    async fn caller(&self) -> Option<UserId> {
        rw_read(&self.credentials, SOURCE, "caller").caller.clone()
    }
}

#[async_trait]
impl BlobStore for HttpBackend {
    async fn put(
        &self,
        bytes: Bytes,
        progress: Option<UploadProgress>,
    ) -> Result<BlobRef, BackendError> {
        if let Some(report) = progress.as_ref() {
            report(0);
        }
        let url = self.endpoint("blobs")?;
        let mut request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        if let Some(bearer) = self.bearer() {
            request = request.header(AUTHORIZATION, bearer);
        }

        let response = request.send().await.map_err(BackendError::unavailable)?;
        let status = response.status();
        let body = response.bytes().await.map_err(BackendError::unavailable)?;
        if !status.is_success() {
            return Err(map_status(
                status,
                String::from_utf8_lossy(&body).trim().to_string(),
            ));
        }
        let blob: BlobRef = decode(&body)?;
        if let Some(report) = progress.as_ref() {
            report(100);
        }
        Ok(blob)
    }

    fn direct_url(&self, blob: &BlobRef) -> String {
        self.base
            .join(&format!("blobs/{blob}"))
            .map(String::from)
            .unwrap_or_else(|_| format!("{}blobs/{blob}", self.base))
    }
}
