//! Explicit session context.
//!
//! A `Session` owns the query layer for one signed-in (or anonymous) user
//! together with the onboarding flags loaded at start-up. Dropping it drops
//! the cache.

use std::sync::Arc;

use time::Date;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::application::boundary::{
    BackendError, BlobStore, IdentityProvider, OnboardingStore, SocialBackend,
};
use crate::application::client::DomainClient;
use crate::application::error::ClientError;
use crate::application::pagination::{Page, PageRequest};
use crate::application::queries::QueryLayer;
use crate::cache::CacheConfig;
use crate::domain::comments::CommentThread;
use crate::domain::entities::{Post, UserProfile};
use crate::domain::error::ValidationError;
use crate::domain::onboarding::OnboardingState;
use crate::domain::posts::{FeedGate, PostDraft};
use crate::domain::types::{PostId, UserId};
use crate::domain::validation;

/// Boundary adapters a session talks through.
#[derive(Clone)]
pub struct Backends {
    pub social: Arc<dyn SocialBackend>,
    pub identity: Arc<dyn IdentityProvider>,
    pub blobs: Arc<dyn BlobStore>,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub cache: CacheConfig,
    pub page_limit: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            page_limit: crate::application::pagination::DEFAULT_PAGE_LIMIT,
        }
    }
}

/// Fields collected by the signup form.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: Option<Date>,
}

impl SignupForm {
    /// Local checks in form order; the first failing field wins.
    pub fn validate(&self) -> Result<Date, ValidationError> {
        validation::validate_username(&self.username)?;
        if !validation::validate_email(&self.email) {
            return Err(ValidationError::Email);
        }
        let password = validation::validate_password(&self.password);
        if !password.is_valid() {
            return Err(ValidationError::Password {
                unmet: password.errors,
            });
        }
        self.date_of_birth
            .ok_or(ValidationError::required("dateOfBirth"))
    }
}

pub struct Session {
    queries: QueryLayer,
    onboarding_store: Arc<dyn OnboardingStore>,
    onboarding: Mutex<OnboardingState>,
    page_limit: u32,
    today: fn() -> Date,
}

impl Session {
    /// Build the session and load onboarding flags once.
    pub async fn start(
        backends: Backends,
        settings: SessionSettings,
        onboarding_store: Arc<dyn OnboardingStore>,
    ) -> Result<Self, ClientError> {
        let client = DomainClient::new(backends.social, backends.identity, backends.blobs);
        let onboarding = onboarding_store.load().await?;
        debug!(?onboarding, "Onboarding state loaded");

        Ok(Self {
            queries: QueryLayer::new(client, &settings.cache),
            onboarding_store,
            onboarding: Mutex::new(onboarding),
            page_limit: settings.page_limit.max(1),
            today: validation::today_utc,
        })
    }

    /// Replace the calendar used for age checks.
    pub fn with_clock(mut self, today: fn() -> Date) -> Self {
        self.today = today;
        self
    }

    pub fn queries(&self) -> &QueryLayer {
        &self.queries
    }

    pub fn first_page(&self) -> PageRequest {
        PageRequest::first(self.page_limit)
    }

    pub fn today(&self) -> Date {
        (self.today)()
    }

    pub async fn caller(&self) -> Option<UserId> {
        self.queries.client().caller_id().await
    }

    // ------------------------------------------------------------------
    // Identity and connectivity
    // ------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn login(&self) -> Result<UserId, ClientError> {
        let user = self.queries.client().identity().login().await?;
        self.queries.mark_all_stale();
        info!(user = %user, "Signed in");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.queries.client().identity().logout().await?;
        self.queries.clear();
        info!("Signed out");
        Ok(())
    }

    /// Connection came back: everything cached may be out of date.
    pub fn reconnected(&self) -> usize {
        self.queries.mark_all_stale()
    }

    // ------------------------------------------------------------------
    // Signup and onboarding
    // ------------------------------------------------------------------

    /// Validate locally, sign in if needed, check availability, register.
    #[instrument(skip(self, form), fields(username = %form.username))]
    pub async fn sign_up(&self, form: SignupForm) -> Result<UserId, ClientError> {
        let date_of_birth = form.validate()?;

        let user = match self.caller().await {
            Some(user) => user,
            None => self.login().await?,
        };

        if !self
            .queries
            .client()
            .is_username_available(&form.username)
            .await?
        {
            return Err(BackendError::Conflict(format!(
                "username `{}` is already taken",
                form.username
            ))
            .into());
        }

        self.queries
            .register(UserProfile::new(form.username, form.email, date_of_birth))
            .await?;

        self.update_onboarding(OnboardingState::mark_signed_up)
            .await?;
        info!(user = %user, "Signed up");
        Ok(user)
    }

    pub async fn onboarding(&self) -> OnboardingState {
        *self.onboarding.lock().await
    }

    /// Whether to show the post-signup banner now. Showing it consumes the signup flag.
    ///
    /// The flag is only consumed once the new state is persisted; a failed
    /// save leaves the banner pending.
    pub async fn take_signup_banner(&self) -> Result<bool, ClientError> {
        let mut state = self.onboarding.lock().await;
        let mut next = *state;
        let show = next.take_banner();
        if show {
            self.onboarding_store.save(&next).await?;
            *state = next;
        }
        Ok(show)
    }

    pub async fn dismiss_banner(&self) -> Result<(), ClientError> {
        self.update_onboarding(OnboardingState::dismiss_banner)
            .await
    }

    async fn update_onboarding(
        &self,
        change: fn(&mut OnboardingState),
    ) -> Result<(), ClientError> {
        let mut state = self.onboarding.lock().await;
        let mut next = *state;
        change(&mut next);
        self.onboarding_store.save(&next).await?;
        *state = next;
        Ok(())
    }

    /// Save contact details from the post-signup banner, then dismiss it.
    ///
    /// Either field may be blank but not both. The profile has no phone
    /// field, so a valid phone number is checked and then not stored.
    pub async fn save_contact_info(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<(), ClientError> {
        let email = email.map(str::trim).filter(|value| !value.is_empty());
        let phone = phone.map(str::trim).filter(|value| !value.is_empty());

        if email.is_none() && phone.is_none() {
            return Err(ValidationError::required("contact").into());
        }
        if let Some(email) = email
            && !validation::validate_email(email)
        {
            return Err(ValidationError::Email.into());
        }
        if let Some(phone) = phone
            && !validation::validate_phone(phone)
        {
            return Err(ValidationError::Phone.into());
        }

        let mut profile = self
            .queries
            .caller_profile()
            .await?
            .ok_or_else(|| BackendError::NotFound("caller profile".into()))?;
        if let Some(email) = email {
            profile.email = email.to_string();
        }
        self.queries.save_caller_profile(profile).await?;
        self.dismiss_banner().await
    }

    // ------------------------------------------------------------------
    // Feeds, always gated for 18+ content
    // ------------------------------------------------------------------

    /// Gate for the current viewer; anonymous viewers count as under-age.
    pub async fn feed_gate(&self) -> Result<FeedGate, ClientError> {
        if self.caller().await.is_none() {
            return Ok(FeedGate::for_viewer(None, self.today()));
        }
        let profile = self.queries.caller_profile().await?;
        Ok(FeedGate::for_viewer(profile.as_ref(), self.today()))
    }

    pub async fn feed(&self, page: PageRequest) -> Result<Page<Post>, ClientError> {
        let gate = self.feed_gate().await?;
        let mut page = self.queries.posts(page).await?;
        page.retain(|post| gate.allows(post));
        Ok(page)
    }

    /// The 18+ section: adult posts only, refused for under-age viewers.
    pub async fn adult_feed(&self, page: PageRequest) -> Result<Page<Post>, ClientError> {
        let gate = self.feed_gate().await?;
        if !gate.viewer_is_adult() {
            return Err(ValidationError::AgeRestricted.into());
        }
        let mut page = self.queries.posts(page).await?;
        gate.adult_only(&mut page.items)?;
        Ok(page)
    }

    pub async fn user_feed(
        &self,
        user: &UserId,
        page: PageRequest,
    ) -> Result<Page<Post>, ClientError> {
        let gate = self.feed_gate().await?;
        let mut page = self.queries.posts_by_user(user, page).await?;
        page.retain(|post| gate.allows(post));
        Ok(page)
    }

    /// Single post, hidden when the viewer may not see it.
    pub async fn post(&self, id: &PostId) -> Result<Option<Post>, ClientError> {
        let gate = self.feed_gate().await?;
        Ok(self
            .queries
            .post(id)
            .await?
            .filter(|post| gate.allows(post)))
    }

    pub async fn comment_thread(&self, post: &PostId) -> Result<Vec<CommentThread>, ClientError> {
        let comments = self.queries.comments(post).await?;
        Ok(CommentThread::build(comments))
    }

    /// Create a post, checking the 18+ flag against the caller's own age.
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post, ClientError> {
        let author_is_adult = self
            .queries
            .caller_profile()
            .await?
            .is_some_and(|profile| profile.is_adult_on(self.today()));
        self.queries.create_post(draft, author_is_adult).await
    }

    /// Whether moderation actions should be offered to the caller.
    pub async fn admin_affordances(&self) -> Result<bool, ClientError> {
        if self.queries.is_caller_admin().await? {
            return Ok(true);
        }
        self.queries.is_site_owner().await
    }
}
