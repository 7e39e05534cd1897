//! Signup, onboarding and gated feeds through a full session.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use feelslap::application::boundary::{BackendError, OnboardingStore, StoreError};
use feelslap::application::session::{Backends, Session, SessionSettings, SignupForm};
use feelslap::domain::entities::UserProfile;
use feelslap::domain::error::ValidationError;
use feelslap::domain::onboarding::OnboardingState;
use feelslap::domain::posts::PostDraft;
use feelslap::domain::types::UserId;
use feelslap::domain::validation::{PasswordRule, UsernameError};
use feelslap::infra::memory::InMemoryBackend;
use feelslap::infra::onboarding::{FileOnboardingStore, MemoryOnboardingStore};
use time::Date;
use time::macros::date;

fn fixed_today() -> Date {
    date!(2024 - 06 - 01)
}

fn adult() -> (UserId, UserProfile) {
    (
        UserId::new("grown_up"),
        UserProfile::new("grown_up", "grown@example.com", date!(1990 - 01 - 01)),
    )
}

fn minor() -> (UserId, UserProfile) {
    (
        UserId::new("kiddo"),
        UserProfile::new("kiddo", "kid@example.com", date!(2010 - 03 - 15)),
    )
}

fn backends(backend: &Arc<InMemoryBackend>) -> Backends {
    Backends {
        social: backend.clone(),
        identity: backend.clone(),
        blobs: backend.clone(),
    }
}

async fn session_with_store(
    backend: &Arc<InMemoryBackend>,
    store: Arc<dyn OnboardingStore>,
) -> Session {
    Session::start(backends(backend), SessionSettings::default(), store)
        .await
        .expect("session")
        .with_clock(fixed_today)
}

async fn session(backend: &Arc<InMemoryBackend>) -> Session {
    session_with_store(backend, Arc::new(MemoryOnboardingStore::default())).await
}

/// Onboarding store whose next `failures` saves fail.
struct UnreliableStore {
    state: Mutex<OnboardingState>,
    failures: AtomicUsize,
}

impl UnreliableStore {
    fn new(state: OnboardingState, failures: usize) -> Self {
        Self {
            state: Mutex::new(state),
            failures: AtomicUsize::new(failures),
        }
    }

    fn saved(&self) -> OnboardingState {
        *self.state.lock().expect("state lock")
    }
}

#[async_trait]
impl OnboardingStore for UnreliableStore {
    async fn load(&self) -> Result<OnboardingState, StoreError> {
        Ok(self.saved())
    }

    async fn save(&self, state: &OnboardingState) -> Result<(), StoreError> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Io(std::io::Error::other("disk full")));
        }
        *self.state.lock().expect("state lock") = *state;
        Ok(())
    }
}

fn form(username: &str, email: &str, password: &str, dob: Option<Date>) -> SignupForm {
    SignupForm {
        username: username.into(),
        email: email.into(),
        password: password.into(),
        date_of_birth: dob,
    }
}

fn valid_form() -> SignupForm {
    form(
        "new_user",
        "new@example.com",
        "s3cret!pass",
        Some(date!(1995 - 05 - 05)),
    )
}

/// Two adult posts and one ordinary post by the adult member.
async fn seed_posts(backend: &Arc<InMemoryBackend>) {
    let (author, _) = adult();
    backend.set_caller(Some(author));
    let writer = session(backend).await;
    for (content, adult_only) in [("after dark", true), ("hello", false), ("late", true)] {
        let mut draft = PostDraft::new(content, "desire", "warmth");
        draft.is_18_plus = adult_only;
        writer.create_post(draft).await.expect("seed post");
    }
}

fn populated_backend() -> Arc<InMemoryBackend> {
    let (adult_id, adult_profile) = adult();
    let (minor_id, minor_profile) = minor();
    Arc::new(
        InMemoryBackend::new()
            .with_profile(adult_id, adult_profile)
            .with_profile(minor_id, minor_profile),
    )
}

#[tokio::test]
async fn signup_reports_the_first_invalid_field_without_calling_out() {
    let backend = Arc::new(InMemoryBackend::new());
    let session = session(&backend).await;

    let cases = [
        (
            form("ab", "nope", "weak", None),
            ValidationError::Username(UsernameError::TooShort),
        ),
        (
            form("good_name", "nope", "weak", None),
            ValidationError::Email,
        ),
        (
            form("good_name", "a@b.co", "password1", None),
            ValidationError::Password {
                unmet: vec![PasswordRule::Symbol],
            },
        ),
        (
            form("good_name", "a@b.co", "passw0rd!", None),
            ValidationError::required("dateOfBirth"),
        ),
    ];

    for (input, expected) in cases {
        let err = session.sign_up(input).await.expect_err("invalid form");
        assert_eq!(err.as_validation(), Some(&expected));
    }
    assert_eq!(backend.total_calls(), 0);
}

#[tokio::test]
async fn signup_registers_and_shows_banner_once() {
    let backend = Arc::new(InMemoryBackend::new().with_login(UserId::new("fresh")));
    let session = session(&backend).await;

    let user = session.sign_up(valid_form()).await.expect("signup");
    assert_eq!(user, UserId::new("fresh"));
    assert_eq!(session.caller().await, Some(user));
    assert_eq!(backend.calls("registerUser"), 1);

    let profile = session
        .queries()
        .caller_profile()
        .await
        .expect("profile")
        .expect("registered");
    assert_eq!(profile.username, "new_user");

    assert!(session.onboarding().await.should_show_banner());
    assert!(session.take_signup_banner().await.expect("banner"));
    assert!(!session.take_signup_banner().await.expect("banner again"));
}

#[tokio::test]
async fn failed_save_keeps_the_banner_pending() {
    let backend = Arc::new(InMemoryBackend::new());
    let signed_up = OnboardingState {
        just_signed_up: true,
        has_seen_banner: false,
    };
    let store = Arc::new(UnreliableStore::new(signed_up, 1));
    let session = session_with_store(&backend, store.clone()).await;

    session
        .take_signup_banner()
        .await
        .expect_err("save fails");
    assert_eq!(session.onboarding().await, signed_up);
    assert_eq!(store.saved(), signed_up);

    assert!(session.take_signup_banner().await.expect("retry"));
    assert!(!session.onboarding().await.just_signed_up);
    assert_eq!(store.saved(), session.onboarding().await);
}

#[tokio::test]
async fn failed_save_keeps_the_banner_undismissed() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = Arc::new(UnreliableStore::new(OnboardingState::default(), 1));
    let session = session_with_store(&backend, store.clone()).await;

    session.dismiss_banner().await.expect_err("save fails");
    assert!(!session.onboarding().await.has_seen_banner);

    session.dismiss_banner().await.expect("retry");
    assert!(session.onboarding().await.has_seen_banner);
    assert!(store.saved().has_seen_banner);
}

#[tokio::test]
async fn signup_refuses_a_taken_username() {
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_profile(
                UserId::new("someone"),
                UserProfile::new("New_User", "x@example.com", date!(1980 - 01 - 01)),
            )
            .with_login(UserId::new("fresh")),
    );
    let session = session(&backend).await;

    let err = session.sign_up(valid_form()).await.expect_err("taken");
    assert!(matches!(err.as_boundary(), Some(BackendError::Conflict(_))));
    assert_eq!(backend.calls("registerUser"), 0);
    assert!(!session.onboarding().await.just_signed_up);
}

#[tokio::test]
async fn onboarding_flags_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(InMemoryBackend::new().with_login(UserId::new("fresh")));

    let first = session_with_store(&backend, Arc::new(FileOnboardingStore::in_dir(dir.path())))
        .await;
    first.sign_up(valid_form()).await.expect("signup");
    drop(first);

    let second =
        session_with_store(&backend, Arc::new(FileOnboardingStore::in_dir(dir.path()))).await;
    assert!(second.onboarding().await.should_show_banner());
    assert!(second.take_signup_banner().await.expect("banner"));

    let third =
        session_with_store(&backend, Arc::new(FileOnboardingStore::in_dir(dir.path()))).await;
    assert!(!third.onboarding().await.should_show_banner());
}

#[tokio::test]
async fn contact_info_is_checked_saved_and_dismisses_the_banner() {
    let backend = Arc::new(InMemoryBackend::new().with_login(UserId::new("fresh")));
    let session = session(&backend).await;
    session.sign_up(valid_form()).await.expect("signup");

    let err = session
        .save_contact_info(Some("  "), None)
        .await
        .expect_err("empty");
    assert_eq!(
        err.as_validation(),
        Some(&ValidationError::required("contact"))
    );

    let err = session
        .save_contact_info(Some("not-an-email"), None)
        .await
        .expect_err("bad email");
    assert_eq!(err.as_validation(), Some(&ValidationError::Email));

    let err = session
        .save_contact_info(None, Some("12345"))
        .await
        .expect_err("short phone");
    assert_eq!(err.as_validation(), Some(&ValidationError::Phone));
    assert_eq!(backend.calls("saveCallerUserProfile"), 0);

    session
        .save_contact_info(Some("updated@example.com"), Some("+1 555 010 9999"))
        .await
        .expect("saved");

    let profile = session
        .queries()
        .caller_profile()
        .await
        .expect("profile")
        .expect("registered");
    assert_eq!(profile.email, "updated@example.com");
    assert!(session.onboarding().await.has_seen_banner);
    assert!(!session.take_signup_banner().await.expect("banner"));
}

#[tokio::test]
async fn minors_never_see_adult_posts() {
    let backend = populated_backend();
    seed_posts(&backend).await;

    let (minor_id, _) = minor();
    backend.set_caller(Some(minor_id));
    let viewer = session(&backend).await;

    let page = viewer.feed(viewer.first_page()).await.expect("feed");
    assert_eq!(page.items.len(), 1);
    assert!(page.items.iter().all(|post| !post.is_18_plus));

    let err = viewer
        .adult_feed(viewer.first_page())
        .await
        .expect_err("restricted");
    assert_eq!(err.as_validation(), Some(&ValidationError::AgeRestricted));

    let (author, _) = adult();
    let by_author = viewer
        .user_feed(&author, viewer.first_page())
        .await
        .expect("user feed");
    assert_eq!(by_author.items.len(), 1);
}

#[tokio::test]
async fn anonymous_viewers_are_gated_like_minors() {
    let backend = populated_backend();
    seed_posts(&backend).await;

    backend.set_caller(None);
    let viewer = session(&backend).await;

    assert!(!viewer.feed_gate().await.expect("gate").viewer_is_adult());
    let page = viewer.feed(viewer.first_page()).await.expect("feed");
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn adults_get_the_full_feed_and_the_adult_section() {
    let backend = populated_backend();
    seed_posts(&backend).await;

    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let viewer = session(&backend).await;

    let page = viewer.feed(viewer.first_page()).await.expect("feed");
    assert_eq!(page.items.len(), 3);

    let adult_only = viewer
        .adult_feed(viewer.first_page())
        .await
        .expect("adult feed");
    assert_eq!(adult_only.items.len(), 2);
    assert!(adult_only.items.iter().all(|post| post.is_18_plus));
}

#[tokio::test]
async fn five_posts_arrive_as_one_final_page() {
    let backend = populated_backend();
    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let viewer = session(&backend).await;
    for n in 0..5 {
        viewer
            .create_post(PostDraft::new(format!("slap {n}"), "surprise", "sting"))
            .await
            .expect("post");
    }

    let page = viewer.feed(viewer.first_page()).await.expect("feed");

    assert_eq!(viewer.first_page().limit, 20);
    assert_eq!(page.items.len(), 5);
    assert!(page.is_last());
    assert!(page.next_request().is_none());
}

#[tokio::test]
async fn single_post_is_hidden_from_minors() {
    let backend = populated_backend();
    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let writer = session(&backend).await;
    let mut draft = PostDraft::new("after dark", "desire", "warmth");
    draft.is_18_plus = true;
    let post = writer.create_post(draft).await.expect("post");

    let (minor_id, _) = minor();
    backend.set_caller(Some(minor_id));
    let viewer = session(&backend).await;
    assert!(viewer.post(&post.id).await.expect("lookup").is_none());
}

#[tokio::test]
async fn minors_cannot_post_adult_content() {
    let backend = populated_backend();
    let (minor_id, _) = minor();
    backend.set_caller(Some(minor_id));
    let session = session(&backend).await;

    let mut draft = PostDraft::new("hmm", "curious", "buzzing");
    draft.is_18_plus = true;
    let err = session.create_post(draft).await.expect_err("minor");
    assert_eq!(err.as_validation(), Some(&ValidationError::AgeRestricted));
    assert_eq!(backend.calls("createPost"), 0);
}

#[tokio::test]
async fn admin_affordances_follow_roles() {
    let owner = UserId::new("owner");
    let moderator = UserId::new("moderator");
    let member = UserId::new("member");
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_site_owner(owner.clone())
            .with_admin(moderator.clone())
            .with_profile(
                member.clone(),
                UserProfile::new("member", "m@example.com", date!(1990 - 01 - 01)),
            ),
    );

    for (user, expected) in [(owner, true), (moderator, true), (member, false)] {
        backend.set_caller(Some(user.clone()));
        let session = session(&backend).await;
        assert_eq!(
            session.admin_affordances().await.expect("affordances"),
            expected,
            "{user}"
        );
    }
}

#[tokio::test]
async fn logout_drops_cached_reads() {
    let backend = populated_backend();
    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let session = session(&backend).await;

    session.feed(session.first_page()).await.expect("feed");
    assert!(!session.queries().cache().is_empty());

    session.logout().await.expect("logout");
    assert!(session.queries().cache().is_empty());
    assert_eq!(session.caller().await, None);
}

#[tokio::test]
async fn reconnect_marks_cached_reads_stale() {
    let backend = populated_backend();
    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let session = session(&backend).await;

    session.feed(session.first_page()).await.expect("feed");
    assert!(session.reconnected() > 0);

    session.feed(session.first_page()).await.expect("feed again");
    assert_eq!(backend.calls("getPosts"), 2);
}

#[tokio::test]
async fn comment_thread_nests_replies() {
    let backend = populated_backend();
    let (adult_id, _) = adult();
    backend.set_caller(Some(adult_id));
    let session = session(&backend).await;

    let post = session
        .create_post(PostDraft::new("root", "calm", "slow breath"))
        .await
        .expect("post");
    let top = session
        .queries()
        .create_comment(feelslap::domain::comments::CommentDraft::new(
            post.id.clone(),
            "first",
        ))
        .await
        .expect("top");
    session
        .queries()
        .create_comment(
            feelslap::domain::comments::CommentDraft::new(post.id.clone(), "reply")
                .reply_to(top.id.clone()),
        )
        .await
        .expect("reply");

    let threads = session.comment_thread(&post.id).await.expect("threads");
    assert_eq!(threads.len(), 1);
    assert_eq!(threads[0].count(), 2);
}
