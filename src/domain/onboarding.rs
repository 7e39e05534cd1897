use serde::{Deserialize, Serialize};

/// Session-local flags driving the post-signup contact banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnboardingState {
    pub just_signed_up: bool,
    pub has_seen_banner: bool,
}

impl OnboardingState {
    pub fn mark_signed_up(&mut self) {
        self.just_signed_up = true;
    }

    pub fn should_show_banner(&self) -> bool {
        self.just_signed_up && !self.has_seen_banner
    }

    /// Returns whether the banner should show now; showing consumes the signup flag.
    pub fn take_banner(&mut self) -> bool {
        let show = self.should_show_banner();
        if show {
            self.just_signed_up = false;
        }
        show
    }

    pub fn dismiss_banner(&mut self) {
        self.has_seen_banner = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_shows_once_after_signup() {
        let mut state = OnboardingState::default();
        assert!(!state.take_banner());

        state.mark_signed_up();
        assert!(state.take_banner());
        assert!(!state.take_banner());
    }

    #[test]
    fn dismissed_banner_stays_hidden() {
        let mut state = OnboardingState::default();
        state.dismiss_banner();
        state.mark_signed_up();
        assert!(!state.should_show_banner());
        assert!(!state.take_banner());
    }

    #[test]
    fn missing_fields_default_to_false() {
        let state: OnboardingState = serde_json::from_str("{}").expect("parse");
        assert_eq!(state, OnboardingState::default());
    }
}
