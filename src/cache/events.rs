//! Mutation events.
//!
//! Successful mutations publish an event; the planner turns queued events
//! into the key families to mark stale.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::domain::types::{CommentId, PostId, UserId};

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic sequence number for events published by one queue.
pub type Epoch = u64;

#[derive(Debug, Clone)]
pub struct MutationEvent {
    /// Unique identifier for idempotency (UUIDv4).
    pub id: Uuid,
    pub epoch: Epoch,
    pub kind: Mutation,
    pub timestamp: OffsetDateTime,
}

impl MutationEvent {
    pub fn new(kind: Mutation, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            kind,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

/// A successful write, carrying the identities its invalidation needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    // Profiles
    ProfileRegistered { user: UserId },
    ProfileSaved { user: UserId },
    ProfileUpdated { user: UserId },
    RoleAssigned { user: UserId },

    // Posts
    PostCreated { post: PostId },
    PostUpdated { post: PostId },
    PostDeleted { post: PostId },

    // Comments
    CommentCreated { post: PostId, comment: CommentId },
    CommentDeleted { post: PostId, comment: CommentId },

    // Reactions
    ReactionAdded { post: PostId },
    ReactionRemoved { post: PostId },

    // Friendships; `from` is the acting side
    FriendRequestSent { from: UserId, to: UserId },
    FriendRequestAccepted { from: UserId, to: UserId },
    FriendRequestRejected { from: UserId, to: UserId },
    Unfriended { from: UserId, to: UserId },

    // Moderation
    PostFlagged { post: PostId },
    PostUnflagged { post: PostId },
    UserBanned { user: UserId },
    UserUnbanned { user: UserId },
    PostRemovedByAdmin { post: PostId },
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ProfileRegistered { .. } => "profile_registered",
            Mutation::ProfileSaved { .. } => "profile_saved",
            Mutation::ProfileUpdated { .. } => "profile_updated",
            Mutation::RoleAssigned { .. } => "role_assigned",
            Mutation::PostCreated { .. } => "post_created",
            Mutation::PostUpdated { .. } => "post_updated",
            Mutation::PostDeleted { .. } => "post_deleted",
            Mutation::CommentCreated { .. } => "comment_created",
            Mutation::CommentDeleted { .. } => "comment_deleted",
            Mutation::ReactionAdded { .. } => "reaction_added",
            Mutation::ReactionRemoved { .. } => "reaction_removed",
            Mutation::FriendRequestSent { .. } => "friend_request_sent",
            Mutation::FriendRequestAccepted { .. } => "friend_request_accepted",
            Mutation::FriendRequestRejected { .. } => "friend_request_rejected",
            Mutation::Unfriended { .. } => "unfriended",
            Mutation::PostFlagged { .. } => "post_flagged",
            Mutation::PostUnflagged { .. } => "post_unflagged",
            Mutation::UserBanned { .. } => "user_banned",
            Mutation::UserUnbanned { .. } => "user_unbanned",
            Mutation::PostRemovedByAdmin { .. } => "post_removed_by_admin",
        }
    }
}

/// FIFO of published mutation events.
pub struct EventQueue {
    queue: Mutex<VecDeque<MutationEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, kind: Mutation) {
        let event = MutationEvent::new(kind, self.next_epoch());

        debug!(
            event_id = %event.id,
            event_epoch = event.epoch,
            mutation = event.kind.name(),
            "Mutation event enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain every queued event in FIFO order.
    pub fn drain(&self) -> Vec<MutationEvent> {
        mutex_lock(&self.queue, SOURCE, "drain").drain(..).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
