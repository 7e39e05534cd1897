//! Query keys and the families they are invalidated by.

use std::fmt;

use crate::application::pagination::PageRequest;
use crate::domain::types::{PostId, UserId};

/// Groups of cached reads that a mutation can make obsolete.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyFamily {
    /// The caller's own profile.
    CallerProfile,
    /// One user's profile as seen by others.
    UserProfile(UserId),
    /// Every post listing, global or per author.
    PostLists,
    /// A single post lookup.
    Post(PostId),
    /// The comment list of one post.
    Comments(PostId),
    /// The caller's incoming friend requests.
    PendingRequests,
    /// One user's friends list.
    Friends(UserId),
    /// Pairwise friendship status, unordered.
    FriendPair(UserId, UserId),
    /// The moderation queue.
    FlaggedPosts,
    /// Role and privilege probes.
    Roles,
}

impl KeyFamily {
    /// Pair family with endpoints in canonical order.
    pub fn friend_pair(a: UserId, b: UserId) -> Self {
        if a <= b {
            KeyFamily::FriendPair(a, b)
        } else {
            KeyFamily::FriendPair(b, a)
        }
    }
}

/// One cached read: the operation plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    CallerProfile,
    UserProfile(UserId),
    UsernameAvailable(String),
    CallerRole,
    IsCallerAdmin,
    IsSiteOwner,
    Posts(PageRequest),
    UserPosts { user: UserId, page: PageRequest },
    Post(PostId),
    Comments(PostId),
    PendingRequests,
    Friends(UserId),
    AreFriends(UserId, UserId),
    FlaggedPosts,
}

impl QueryKey {
    /// Pairwise status key; argument order does not matter.
    pub fn are_friends(a: UserId, b: UserId) -> Self {
        if a <= b {
            QueryKey::AreFriends(a, b)
        } else {
            QueryKey::AreFriends(b, a)
        }
    }

    /// Boundary operation this key reads through.
    pub fn operation(&self) -> &'static str {
        match self {
            QueryKey::CallerProfile => "getCallerUserProfile",
            QueryKey::UserProfile(_) => "getUserProfile",
            QueryKey::UsernameAvailable(_) => "isUsernameAvailable",
            QueryKey::CallerRole => "getCallerUserRole",
            QueryKey::IsCallerAdmin => "isCallerAdmin",
            QueryKey::IsSiteOwner => "isSiteOwner",
            QueryKey::Posts(_) => "getPosts",
            QueryKey::UserPosts { .. } => "getPostsByUser",
            QueryKey::Post(_) => "getPost",
            QueryKey::Comments(_) => "getCommentsByPost",
            QueryKey::PendingRequests => "getPendingFriendRequests",
            QueryKey::Friends(_) => "getFriends",
            QueryKey::AreFriends(..) => "areFriends",
            QueryKey::FlaggedPosts => "getFlaggedPosts",
        }
    }

    /// Families whose invalidation makes this entry stale.
    pub fn families(&self) -> Vec<KeyFamily> {
        match self {
            QueryKey::CallerProfile => vec![KeyFamily::CallerProfile],
            QueryKey::UserProfile(user) => vec![KeyFamily::UserProfile(user.clone())],
            // Availability flips when any profile registers.
            QueryKey::UsernameAvailable(_) => vec![KeyFamily::CallerProfile],
            QueryKey::CallerRole | QueryKey::IsCallerAdmin | QueryKey::IsSiteOwner => {
                vec![KeyFamily::Roles]
            }
            QueryKey::Posts(_) | QueryKey::UserPosts { .. } => vec![KeyFamily::PostLists],
            QueryKey::Post(id) => vec![KeyFamily::Post(id.clone())],
            QueryKey::Comments(post) => vec![KeyFamily::Comments(post.clone())],
            QueryKey::PendingRequests => vec![KeyFamily::PendingRequests],
            QueryKey::Friends(user) => vec![KeyFamily::Friends(user.clone())],
            QueryKey::AreFriends(a, b) => vec![KeyFamily::friend_pair(a.clone(), b.clone())],
            QueryKey::FlaggedPosts => vec![KeyFamily::FlaggedPosts],
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKey::UserProfile(user) | QueryKey::Friends(user) => {
                write!(f, "{}({user})", self.operation())
            }
            QueryKey::UsernameAvailable(name) => write!(f, "{}({name})", self.operation()),
            QueryKey::Posts(page) => {
                write!(f, "{}({}+{})", self.operation(), page.offset, page.limit)
            }
            QueryKey::UserPosts { user, page } => write!(
                f,
                "{}({user}, {}+{})",
                self.operation(),
                page.offset,
                page.limit
            ),
            QueryKey::Post(id) | QueryKey::Comments(id) => write!(f, "{}({id})", self.operation()),
            QueryKey::AreFriends(a, b) => write!(f, "{}({a}, {b})", self.operation()),
            _ => f.write_str(self.operation()),
        }
    }
}
