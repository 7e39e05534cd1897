use thiserror::Error;

use crate::domain::validation::{PasswordRule, UsernameError};

/// Rejections raised locally before any boundary call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error(transparent)]
    Username(#[from] UsernameError),
    #[error("please enter a valid email address")]
    Email,
    #[error("please enter a valid phone number")]
    Phone,
    #[error("password does not meet requirements: {}", list_rules(.unmet))]
    Password { unmet: Vec<PasswordRule> },
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("you must be 18 or older to do this")]
    AgeRestricted,
    #[error("image is {size} bytes; the limit is {max} bytes")]
    ImageTooLarge { size: usize, max: usize },
    #[error("you cannot send a friend request to yourself")]
    SelfFriendRequest,
}

impl ValidationError {
    pub fn required(field: &'static str) -> Self {
        Self::Required { field }
    }

    /// Form field the message belongs to, for inline display.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Required { field } => field,
            ValidationError::Username(_) => "username",
            ValidationError::Email => "email",
            ValidationError::Phone => "phone",
            ValidationError::Password { .. } | ValidationError::PasswordMismatch => "password",
            ValidationError::AgeRestricted => "is18Plus",
            ValidationError::ImageTooLarge { .. } => "image",
            ValidationError::SelfFriendRequest => "recipient",
        }
    }
}

fn list_rules(rules: &[PasswordRule]) -> String {
    rules
        .iter()
        .map(|rule| rule.message())
        .collect::<Vec<_>>()
        .join(", ")
}
