//! Shared domain identifiers and enumerations aligned with the remote wire format.

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Textual principal of an authenticated identity; owner key of a profile.
    UserId
);
string_id!(PostId);
string_id!(CommentId);
string_id!(
    /// Opaque reference to a stored blob (avatar, banner, post image).
    BlobRef
);

/// Point in time as carried on the wire: nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub fn now() -> Self {
        Self::from_datetime(OffsetDateTime::now_utc())
    }

    /// Saturates at the representable range instead of failing.
    pub fn from_datetime(value: OffsetDateTime) -> Self {
        let nanos = value.unix_timestamp_nanos();
        Self(nanos.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Midnight UTC of the given calendar day.
    pub fn from_date(date: Date) -> Self {
        Self::from_datetime(date.midnight().assume_utc())
    }

    pub fn to_datetime(self) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0))
            .unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }

    pub fn date(self) -> Date {
        self.to_datetime().date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PostVisibility {
    #[default]
    #[serde(rename = "publicVisibility")]
    Public,
    #[serde(rename = "friendsOnly")]
    FriendsOnly,
    #[serde(rename = "privateAccess")]
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipStatus {
    /// Pending and accepted records block a new request for the same pair.
    pub fn is_active(self) -> bool {
        matches!(self, FriendshipStatus::Pending | FriendshipStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Cry,
    Heart,
    Fire,
    Slap,
    Vibe,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Cry,
        ReactionKind::Heart,
        ReactionKind::Fire,
        ReactionKind::Slap,
        ReactionKind::Vibe,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReactionKind::Cry => "cry",
            ReactionKind::Heart => "heart",
            ReactionKind::Fire => "fire",
            ReactionKind::Slap => "slap",
            ReactionKind::Vibe => "vibe",
        }
    }
}

impl TryFrom<&str> for ReactionKind {
    type Error = ();

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ReactionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::User => "user",
            UserRole::Guest => "guest",
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::*;

    #[test]
    fn timestamp_round_trips_through_datetime() {
        let moment = datetime!(2024-06-15 12:30:00 UTC);
        let stamp = Timestamp::from_datetime(moment);
        assert_eq!(stamp.to_datetime(), moment);
        assert_eq!(stamp.date(), date!(2024 - 06 - 15));
    }

    #[test]
    fn timestamp_from_date_is_midnight() {
        let stamp = Timestamp::from_date(date!(2006 - 06 - 15));
        assert_eq!(stamp.as_nanos() % 86_400_000_000_000, 0);
    }

    #[test]
    fn visibility_uses_wire_names() {
        let json = serde_json::to_string(&PostVisibility::FriendsOnly).expect("serialize");
        assert_eq!(json, "\"friendsOnly\"");
        let parsed: PostVisibility =
            serde_json::from_str("\"privateAccess\"").expect("deserialize");
        assert_eq!(parsed, PostVisibility::Private);
    }

    #[test]
    fn reaction_kind_parses_known_names() {
        assert_eq!(ReactionKind::try_from("slap"), Ok(ReactionKind::Slap));
        assert!(ReactionKind::try_from("meh").is_err());
    }

    #[test]
    fn only_pending_and_accepted_are_active() {
        assert!(FriendshipStatus::Pending.is_active());
        assert!(FriendshipStatus::Accepted.is_active());
        assert!(!FriendshipStatus::Rejected.is_active());
    }
}
