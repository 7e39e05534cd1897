//! Invalidation plan generation.
//!
//! Maps mutation events to the key families they make stale.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use super::events::{Mutation, MutationEvent};
use super::keys::KeyFamily;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvalidationPlan {
    pub families: BTreeSet<KeyFamily>,
    pub event_count: usize,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ events: {}, families: {} }}",
            self.event_count,
            self.families.len()
        )
    }
}

impl InvalidationPlan {
    /// Merge events into one plan, deduplicating by event id.
    pub fn from_events(events: Vec<MutationEvent>) -> Self {
        let mut plan = Self::default();
        let mut seen_ids = HashSet::new();

        for event in events.into_iter().filter(|e| seen_ids.insert(e.id)) {
            plan.event_count += 1;
            plan.families.extend(families_for(&event.kind));
        }

        plan
    }

    pub fn for_mutation(mutation: &Mutation) -> Self {
        Self {
            families: families_for(mutation).into_iter().collect(),
            event_count: 1,
        }
    }

    pub fn contains(&self, family: &KeyFamily) -> bool {
        self.families.contains(family)
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

/// The invalidation table: every family a successful mutation can affect.
pub fn families_for(mutation: &Mutation) -> Vec<KeyFamily> {
    match mutation {
        Mutation::ProfileRegistered { user } => vec![
            KeyFamily::CallerProfile,
            KeyFamily::UserProfile(user.clone()),
            KeyFamily::Roles,
        ],
        Mutation::ProfileSaved { user } | Mutation::ProfileUpdated { user } => vec![
            KeyFamily::CallerProfile,
            KeyFamily::UserProfile(user.clone()),
        ],
        Mutation::RoleAssigned { user } => vec![
            KeyFamily::Roles,
            KeyFamily::CallerProfile,
            KeyFamily::UserProfile(user.clone()),
        ],
        Mutation::PostCreated { post }
        | Mutation::PostUpdated { post }
        | Mutation::ReactionAdded { post }
        | Mutation::ReactionRemoved { post } => {
            vec![KeyFamily::PostLists, KeyFamily::Post(post.clone())]
        }
        Mutation::CommentCreated { post, .. } | Mutation::CommentDeleted { post, .. } => {
            vec![KeyFamily::Comments(post.clone())]
        }
        Mutation::FriendRequestSent { from, to }
        | Mutation::FriendRequestAccepted { from, to }
        | Mutation::FriendRequestRejected { from, to }
        | Mutation::Unfriended { from, to } => vec![
            KeyFamily::PendingRequests,
            KeyFamily::Friends(from.clone()),
            KeyFamily::Friends(to.clone()),
            KeyFamily::friend_pair(from.clone(), to.clone()),
        ],
        Mutation::PostFlagged { post } | Mutation::PostUnflagged { post } => vec![
            KeyFamily::PostLists,
            KeyFamily::FlaggedPosts,
            KeyFamily::Post(post.clone()),
        ],
        Mutation::UserBanned { user } | Mutation::UserUnbanned { user } => vec![
            KeyFamily::PostLists,
            KeyFamily::FlaggedPosts,
            KeyFamily::UserProfile(user.clone()),
        ],
        Mutation::PostDeleted { post } | Mutation::PostRemovedByAdmin { post } => vec![
            KeyFamily::PostLists,
            KeyFamily::Post(post.clone()),
            KeyFamily::FlaggedPosts,
        ],
    }
}
