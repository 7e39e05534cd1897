//! Post drafting rules and feed visibility gating.

use bytes::Bytes;
use time::Date;

use crate::domain::entities::{Post, UserProfile};
use crate::domain::error::ValidationError;
use crate::domain::types::PostVisibility;

/// Largest image accepted for a post attachment.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Post as composed by the caller, before ids and timestamps are assigned.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub content: String,
    pub emotion: String,
    pub body_sensation: String,
    pub is_anonymous: bool,
    pub is_18_plus: bool,
    pub visibility: PostVisibility,
    pub image: Option<Bytes>,
}

impl PostDraft {
    pub fn new(
        content: impl Into<String>,
        emotion: impl Into<String>,
        body_sensation: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            emotion: emotion.into(),
            body_sensation: body_sensation.into(),
            ..Self::default()
        }
    }

    /// Check the draft the way the composer does, first failure wins.
    pub fn validate(&self, author_is_adult: bool) -> Result<(), ValidationError> {
        if self.content.trim().is_empty() {
            return Err(ValidationError::required("content"));
        }
        if self.emotion.trim().is_empty() {
            return Err(ValidationError::required("emotion"));
        }
        if self.body_sensation.trim().is_empty() {
            return Err(ValidationError::required("bodySensation"));
        }
        if self.is_18_plus && !author_is_adult {
            return Err(ValidationError::AgeRestricted);
        }
        if let Some(image) = &self.image
            && image.len() > MAX_IMAGE_BYTES
        {
            return Err(ValidationError::ImageTooLarge {
                size: image.len(),
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }
}

/// Client-side visibility filter for 18+ content.
///
/// The boundary is expected to filter too; this gate runs on every feed the
/// session hands out regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedGate {
    viewer_is_adult: bool,
}

impl FeedGate {
    /// Unknown viewers are treated as under-age.
    pub fn for_viewer(profile: Option<&UserProfile>, today: Date) -> Self {
        Self {
            viewer_is_adult: profile.is_some_and(|profile| profile.is_adult_on(today)),
        }
    }

    pub fn viewer_is_adult(self) -> bool {
        self.viewer_is_adult
    }

    pub fn allows(self, post: &Post) -> bool {
        !post.is_18_plus || self.viewer_is_adult
    }

    /// Adult section: only 18+ posts, and nothing at all for under-age viewers.
    pub fn adult_only(self, posts: &mut Vec<Post>) -> Result<(), ValidationError> {
        if !self.viewer_is_adult {
            return Err(ValidationError::AgeRestricted);
        }
        posts.retain(|post| post.is_18_plus);
        Ok(())
    }
}
