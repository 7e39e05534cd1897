//! Domain entities as exchanged with the remote boundary.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::types::{
    BlobRef, CommentId, FriendshipStatus, PostId, PostVisibility, Timestamp, UserId,
};
use crate::domain::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub bio: String,
    pub date_of_birth: Timestamp,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<BlobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<BlobRef>,
    pub last_emotion: String,
    pub last_body_sensation: String,
    pub is_banned: bool,
    #[serde(default)]
    pub sticker_ids: Vec<String>,
    pub is_profile_public: bool,
}

impl UserProfile {
    /// Fresh profile as submitted at registration.
    pub fn new(username: impl Into<String>, email: impl Into<String>, date_of_birth: Date) -> Self {
        Self {
            username: username.into(),
            bio: String::new(),
            date_of_birth: Timestamp::from_date(date_of_birth),
            email: email.into(),
            avatar: None,
            banner: None,
            last_emotion: String::new(),
            last_body_sensation: String::new(),
            is_banned: false,
            sticker_ids: Vec::new(),
            is_profile_public: true,
        }
    }

    pub fn birth_date(&self) -> Date {
        self.date_of_birth.date()
    }

    pub fn is_adult_on(&self, today: Date) -> bool {
        validation::is_over_18_on(self.birth_date(), today)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub content: String,
    pub user_id: UserId,
    pub is_anonymous: bool,
    #[serde(rename = "is18Plus")]
    pub is_18_plus: bool,
    pub emotion: String,
    pub body_sensation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<BlobRef>,
    pub visibility: PostVisibility,
    pub is_flagged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged_by: Option<UserId>,
    pub timestamp: Timestamp,
}

impl Post {
    /// Author shown to readers; anonymous posts keep `user_id` but hide it here.
    pub fn display_author(&self) -> Option<&UserId> {
        if self.is_anonymous {
            None
        } else {
            Some(&self.user_id)
        }
    }

    pub fn is_authored_by(&self, user: &UserId) -> bool {
        &self.user_id == user
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub user_id: UserId,
    pub post_id: PostId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<CommentId>,
    pub timestamp: Timestamp,
}

impl Comment {
    pub fn is_top_level(&self) -> bool {
        self.parent_comment_id.is_none()
    }
}

/// Friendship record; `user_id1` sent the request to `user_id2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friendship {
    pub status: FriendshipStatus,
    #[serde(rename = "userId1")]
    pub user_id1: UserId,
    #[serde(rename = "userId2")]
    pub user_id2: UserId,
}

impl Friendship {
    pub fn pending(from: UserId, to: UserId) -> Self {
        Self {
            status: FriendshipStatus::Pending,
            user_id1: from,
            user_id2: to,
        }
    }

    pub fn requester(&self) -> &UserId {
        &self.user_id1
    }

    pub fn recipient(&self) -> &UserId {
        &self.user_id2
    }

    /// True when the record joins `a` and `b` in either direction.
    pub fn connects(&self, a: &UserId, b: &UserId) -> bool {
        (&self.user_id1 == a && &self.user_id2 == b) || (&self.user_id1 == b && &self.user_id2 == a)
    }

    pub fn other_party(&self, user: &UserId) -> Option<&UserId> {
        if &self.user_id1 == user {
            Some(&self.user_id2)
        } else if &self.user_id2 == user {
            Some(&self.user_id1)
        } else {
            None
        }
    }
}
