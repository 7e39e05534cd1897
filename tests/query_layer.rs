//! Query layer behaviour against the in-memory backend: caching,
//! coalescing and invalidation after mutations.

use std::sync::Arc;
use std::time::Duration;

use feelslap::application::boundary::BackendError;
use feelslap::application::client::DomainClient;
use feelslap::application::pagination::PageRequest;
use feelslap::application::queries::QueryLayer;
use feelslap::cache::{CacheConfig, QueryKey};
use feelslap::domain::comments::CommentDraft;
use feelslap::domain::entities::{Post, UserProfile};
use feelslap::domain::posts::PostDraft;
use feelslap::domain::types::{PostId, ReactionKind, UserId};
use feelslap::infra::memory::InMemoryBackend;
use time::macros::date;

const PAGE: PageRequest = PageRequest {
    limit: 10,
    offset: 0,
};

fn member(name: &str) -> (UserId, UserProfile) {
    (
        UserId::new(name),
        UserProfile::new(name, format!("{name}@example.com"), date!(1990 - 01 - 01)),
    )
}

fn backend_with_member(latency: Option<Duration>) -> (Arc<InMemoryBackend>, UserId) {
    let (alice, profile) = member("alice");
    let mut backend = InMemoryBackend::new().with_profile(alice.clone(), profile);
    if let Some(latency) = latency {
        backend = backend.with_latency(latency);
    }
    backend.set_caller(Some(alice.clone()));
    (Arc::new(backend), alice)
}

fn layer(backend: &Arc<InMemoryBackend>, config: &CacheConfig) -> QueryLayer {
    let client = DomainClient::new(backend.clone(), backend.clone(), backend.clone());
    QueryLayer::new(client, config)
}

fn draft(content: &str) -> PostDraft {
    PostDraft::new(content, "anger", "tight chest")
}

#[tokio::test]
async fn repeated_read_is_served_from_cache() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    queries.posts(PAGE).await.expect("first read");
    queries.posts(PAGE).await.expect("second read");
    queries.caller_profile().await.expect("profile");
    queries.caller_profile().await.expect("profile again");

    assert_eq!(backend.calls("getPosts"), 1);
    assert_eq!(backend.calls("getCallerUserProfile"), 1);
}

#[tokio::test]
async fn created_post_shows_up_on_next_read() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    assert!(queries.posts(PAGE).await.expect("empty feed").items.is_empty());

    let post = queries
        .create_post(draft("first"), true)
        .await
        .expect("create");
    assert_eq!(
        queries.cache().is_stale(&QueryKey::Posts(PAGE)),
        Some(true)
    );

    let page = queries.posts(PAGE).await.expect("refetch");
    assert_eq!(backend.calls("getPosts"), 2);
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].id, post.id);
}

#[tokio::test]
async fn concurrent_identical_reads_share_one_call() {
    let (backend, _) = backend_with_member(Some(Duration::from_millis(50)));
    let queries = layer(&backend, &CacheConfig::default());

    let (first, second, third) = tokio::join!(
        queries.posts(PAGE),
        queries.posts(PAGE),
        queries.posts(PAGE)
    );

    assert_eq!(first.expect("first"), second.expect("second"));
    third.expect("third");
    assert_eq!(backend.calls("getPosts"), 1);
    assert_eq!(queries.cache().in_flight(), 0);
}

#[tokio::test]
async fn different_parameters_are_separate_reads() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    queries.posts(PAGE).await.expect("first page");
    queries.posts(PAGE.next()).await.expect("second page");

    assert_eq!(backend.calls("getPosts"), 2);
    assert_eq!(queries.cache().len(), 2);
}

#[tokio::test]
async fn failed_mutation_keeps_cache_fresh() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());
    queries.posts(PAGE).await.expect("read");

    backend.set_offline(true);
    let err = queries
        .create_post(draft("never lands"), true)
        .await
        .expect_err("offline");
    assert!(matches!(
        err.as_boundary(),
        Some(BackendError::Unavailable(_))
    ));
    assert_eq!(
        queries.cache().is_stale(&QueryKey::Posts(PAGE)),
        Some(false)
    );

    backend.set_offline(false);
    queries.posts(PAGE).await.expect("cached read");
    assert_eq!(backend.calls("getPosts"), 1);
}

#[tokio::test]
async fn failed_read_is_not_cached() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    backend.set_offline(true);
    let err = queries.posts(PAGE).await.expect_err("offline");
    assert!(matches!(
        err.as_boundary(),
        Some(BackendError::Unavailable(_))
    ));
    assert!(queries.cache().peek(&QueryKey::Posts(PAGE)).is_none());

    backend.set_offline(false);
    queries.posts(PAGE).await.expect("online");
    assert_eq!(backend.calls("getPosts"), 2);
}

#[tokio::test]
async fn comment_invalidation_is_scoped_to_its_post() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    let first = queries.create_post(draft("one"), true).await.expect("one");
    let second = queries.create_post(draft("two"), true).await.expect("two");
    queries.comments(&first.id).await.expect("comments one");
    queries.comments(&second.id).await.expect("comments two");
    queries.posts(PAGE).await.expect("feed");

    queries
        .create_comment(CommentDraft::new(first.id.clone(), "me too"))
        .await
        .expect("comment");

    let cache = queries.cache();
    assert_eq!(
        cache.is_stale(&QueryKey::Comments(first.id.clone())),
        Some(true)
    );
    assert_eq!(
        cache.is_stale(&QueryKey::Comments(second.id.clone())),
        Some(false)
    );
    assert_eq!(cache.is_stale(&QueryKey::Posts(PAGE)), Some(false));

    let comments = queries.comments(&first.id).await.expect("refetch");
    assert_eq!(comments.len(), 1);
    assert_eq!(backend.calls("getCommentsByPost"), 3);
}

#[tokio::test]
async fn reaction_marks_post_and_lists_stale() {
    let (backend, alice) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    let post = queries.create_post(draft("slap"), true).await.expect("post");
    queries.post(&post.id).await.expect("single");
    queries.posts(PAGE).await.expect("feed");

    queries
        .add_reaction(&alice, &post.id, ReactionKind::Fire)
        .await
        .expect("react");

    assert_eq!(
        queries.cache().is_stale(&QueryKey::Post(post.id.clone())),
        Some(true)
    );
    assert_eq!(queries.cache().is_stale(&QueryKey::Posts(PAGE)), Some(true));
    assert_eq!(backend.reaction_count(&post.id, ReactionKind::Fire), 1);
}

#[tokio::test]
async fn friend_request_refreshes_both_sides() {
    let (alice, alice_profile) = member("alice");
    let (bob, bob_profile) = member("bob");
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_profile(alice.clone(), alice_profile)
            .with_profile(bob.clone(), bob_profile),
    );
    backend.set_caller(Some(alice.clone()));
    let queries = layer(&backend, &CacheConfig::default());

    assert!(!queries.are_friends(&alice, &bob).await.expect("pair"));
    queries.friends(&bob).await.expect("bob's friends");

    queries.send_friend_request(&bob).await.expect("send");
    assert_eq!(
        queries
            .cache()
            .is_stale(&QueryKey::are_friends(bob.clone(), alice.clone())),
        Some(true)
    );
    assert_eq!(
        queries.cache().is_stale(&QueryKey::Friends(bob.clone())),
        Some(true)
    );

    backend.set_caller(Some(bob.clone()));
    let pending = queries.pending_friend_requests().await.expect("pending");
    assert_eq!(pending.len(), 1);
    queries.accept_friend_request(&alice).await.expect("accept");
    assert!(queries.are_friends(&bob, &alice).await.expect("pair"));
    assert_eq!(
        queries.friends(&bob).await.expect("friends"),
        vec![alice.clone()]
    );
}

#[tokio::test]
async fn mark_all_stale_forces_refetch_everywhere() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    queries.posts(PAGE).await.expect("feed");
    queries.caller_profile().await.expect("profile");
    assert_eq!(queries.mark_all_stale(), 2);
    assert_eq!(queries.mark_all_stale(), 0);

    queries.posts(PAGE).await.expect("feed again");
    queries.caller_profile().await.expect("profile again");
    assert_eq!(backend.calls("getPosts"), 2);
    assert_eq!(backend.calls("getCallerUserProfile"), 2);
}

#[tokio::test]
async fn clear_drops_every_entry() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());

    queries.posts(PAGE).await.expect("feed");
    queries.clear();
    assert!(queries.cache().is_empty());
}

#[tokio::test]
async fn disabled_cache_reads_through_every_time() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::disabled());

    queries.posts(PAGE).await.expect("first");
    queries.posts(PAGE).await.expect("second");

    assert_eq!(backend.calls("getPosts"), 2);
    assert!(queries.cache().is_empty());
}

#[tokio::test]
async fn disabled_cache_still_coalesces() {
    let (backend, _) = backend_with_member(Some(Duration::from_millis(50)));
    let queries = layer(&backend, &CacheConfig::disabled());

    let (first, second) = tokio::join!(queries.posts(PAGE), queries.posts(PAGE));
    first.expect("first");
    second.expect("second");
    assert_eq!(backend.calls("getPosts"), 1);
}

#[tokio::test]
async fn read_superseded_by_invalidation_is_not_stored() {
    let (backend, _) = backend_with_member(Some(Duration::from_millis(50)));
    let queries = layer(&backend, &CacheConfig::default());

    let (read, _) = tokio::join!(queries.posts(PAGE), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        queries.mark_all_stale()
    });

    read.expect("the caller still gets its result");
    assert!(queries.cache().peek(&QueryKey::Posts(PAGE)).is_none());
}

#[tokio::test]
async fn capacity_bounds_the_store() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::with_capacity(2));

    for offset in 0..4 {
        queries
            .posts(PageRequest::new(10, offset * 10))
            .await
            .expect("page");
    }
    assert_eq!(queries.cache().len(), 2);
    assert!(queries.cache().peek(&QueryKey::Posts(PAGE)).is_none());
}

#[tokio::test]
async fn caller_only_mutation_needs_a_caller() {
    let (backend, _) = backend_with_member(None);
    backend.set_caller(None);
    let queries = layer(&backend, &CacheConfig::default());

    let err = queries
        .send_friend_request(&UserId::new("bob"))
        .await
        .expect_err("anonymous");
    assert_eq!(err.as_boundary(), Some(&BackendError::Unauthenticated));
    assert_eq!(backend.calls("sendFriendRequest"), 0);
}

fn assert_staleness(queries: &QueryLayer, stale: &[QueryKey], fresh: &[QueryKey]) {
    for key in stale {
        assert_eq!(queries.cache().is_stale(key), Some(true), "{key} should be stale");
    }
    for key in fresh {
        assert_eq!(queries.cache().is_stale(key), Some(false), "{key} should be fresh");
    }
}

/// Alice moderates; Bob is an ordinary member.
fn moderated_backend() -> (Arc<InMemoryBackend>, UserId, UserId) {
    let (alice, alice_profile) = member("alice");
    let (bob, bob_profile) = member("bob");
    let backend = Arc::new(
        InMemoryBackend::new()
            .with_profile(alice.clone(), alice_profile)
            .with_profile(bob.clone(), bob_profile)
            .with_admin(alice.clone()),
    );
    backend.set_caller(Some(alice.clone()));
    (backend, alice, bob)
}

/// Reads the flag mutations touch, returning the moderation queue.
async fn read_flag_targets(queries: &QueryLayer, target: &PostId, other: &PostId) -> Vec<Post> {
    queries.posts(PAGE).await.expect("feed");
    queries.post(target).await.expect("target");
    queries.post(other).await.expect("other");
    queries.flagged_posts().await.expect("queue")
}

#[tokio::test]
async fn flagging_refreshes_lists_the_post_and_the_queue() {
    let (backend, alice, _) = moderated_backend();
    let queries = layer(&backend, &CacheConfig::default());
    let target = queries.create_post(draft("rude"), true).await.expect("target");
    let other = queries.create_post(draft("kind"), true).await.expect("other");
    queries.comments(&target.id).await.expect("comments");
    queries.user_profile(&alice).await.expect("profile");

    let stale = [
        QueryKey::Posts(PAGE),
        QueryKey::Post(target.id.clone()),
        QueryKey::FlaggedPosts,
    ];
    let fresh = [
        QueryKey::Post(other.id.clone()),
        QueryKey::Comments(target.id.clone()),
        QueryKey::UserProfile(alice.clone()),
    ];

    assert!(read_flag_targets(&queries, &target.id, &other.id).await.is_empty());
    queries.flag_post(&target.id).await.expect("flag");
    assert_staleness(&queries, &stale, &fresh);

    assert_eq!(read_flag_targets(&queries, &target.id, &other.id).await.len(), 1);
    queries.unflag_post(&target.id).await.expect("unflag");
    assert_staleness(&queries, &stale, &fresh);
    assert!(queries.flagged_posts().await.expect("queue").is_empty());
}

/// Reads the ban mutations touch, returning whether `user` is banned.
async fn read_ban_targets(
    queries: &QueryLayer,
    admin: &UserId,
    user: &UserId,
    post: &PostId,
) -> bool {
    queries.posts(PAGE).await.expect("feed");
    queries.flagged_posts().await.expect("queue");
    queries.user_profile(admin).await.expect("admin");
    queries.post(post).await.expect("post");
    queries
        .user_profile(user)
        .await
        .expect("user")
        .expect("user exists")
        .is_banned
}

#[tokio::test]
async fn banning_refreshes_lists_the_queue_and_that_profile() {
    let (backend, alice, bob) = moderated_backend();
    let queries = layer(&backend, &CacheConfig::default());
    let post = queries.create_post(draft("hello"), true).await.expect("post");

    let stale = [
        QueryKey::Posts(PAGE),
        QueryKey::FlaggedPosts,
        QueryKey::UserProfile(bob.clone()),
    ];
    let fresh = [
        QueryKey::UserProfile(alice.clone()),
        QueryKey::Post(post.id.clone()),
    ];

    assert!(!read_ban_targets(&queries, &alice, &bob, &post.id).await);
    queries.ban_user(&bob).await.expect("ban");
    assert_staleness(&queries, &stale, &fresh);

    assert!(read_ban_targets(&queries, &alice, &bob, &post.id).await);
    queries.unban_user(&bob).await.expect("unban");
    assert_staleness(&queries, &stale, &fresh);
    assert!(!read_ban_targets(&queries, &alice, &bob, &post.id).await);
}

async fn read_delete_targets(
    queries: &QueryLayer,
    author: &UserId,
    posts: &[&PostId],
    kept: &PostId,
) {
    queries.posts(PAGE).await.expect("feed");
    queries.posts_by_user(author, PAGE).await.expect("author feed");
    queries.flagged_posts().await.expect("queue");
    for id in posts {
        queries.post(id).await.expect("single");
    }
    queries.comments(kept).await.expect("comments");
}

#[tokio::test]
async fn deleting_posts_refreshes_lists_the_post_and_the_queue() {
    let (backend, alice, bob) = moderated_backend();
    let queries = layer(&backend, &CacheConfig::default());
    let own = queries.create_post(draft("mine"), true).await.expect("own");
    let kept = queries.create_post(draft("keep"), true).await.expect("kept");
    backend.set_caller(Some(bob.clone()));
    let reported = queries.create_post(draft("spam"), true).await.expect("bob's");
    queries.flag_post(&reported.id).await.expect("flag");
    backend.set_caller(Some(alice.clone()));

    let every_post = [&own.id, &kept.id, &reported.id];
    let fresh = [
        QueryKey::Post(kept.id.clone()),
        QueryKey::Comments(kept.id.clone()),
    ];

    read_delete_targets(&queries, &bob, &every_post, &kept.id).await;
    queries.delete_post(&own.id).await.expect("author delete");
    assert_staleness(
        &queries,
        &[
            QueryKey::Posts(PAGE),
            QueryKey::UserPosts {
                user: bob.clone(),
                page: PAGE,
            },
            QueryKey::Post(own.id.clone()),
            QueryKey::FlaggedPosts,
        ],
        &fresh,
    );

    read_delete_targets(&queries, &bob, &every_post, &kept.id).await;
    queries
        .admin_delete_post(&reported.id)
        .await
        .expect("admin delete");
    assert_staleness(
        &queries,
        &[
            QueryKey::Posts(PAGE),
            QueryKey::Post(reported.id.clone()),
            QueryKey::FlaggedPosts,
        ],
        &fresh,
    );
    assert!(queries.flagged_posts().await.expect("queue").is_empty());
    let remaining: Vec<PostId> = queries
        .posts(PAGE)
        .await
        .expect("feed")
        .items
        .into_iter()
        .map(|post| post.id)
        .collect();
    assert_eq!(remaining, vec![kept.id]);
}

#[tokio::test]
async fn deleting_a_comment_refreshes_only_that_thread() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());
    let first = queries.create_post(draft("one"), true).await.expect("one");
    let second = queries.create_post(draft("two"), true).await.expect("two");
    let comment = queries
        .create_comment(CommentDraft::new(first.id.clone(), "oops"))
        .await
        .expect("comment");

    queries.comments(&first.id).await.expect("thread one");
    queries.comments(&second.id).await.expect("thread two");
    queries.post(&first.id).await.expect("post");
    queries.posts(PAGE).await.expect("feed");

    queries
        .delete_comment(&first.id, &comment.id)
        .await
        .expect("delete");

    assert_staleness(
        &queries,
        &[QueryKey::Comments(first.id.clone())],
        &[
            QueryKey::Comments(second.id.clone()),
            QueryKey::Post(first.id.clone()),
            QueryKey::Posts(PAGE),
        ],
    );
    assert!(queries.comments(&first.id).await.expect("refetch").is_empty());
}

#[tokio::test]
async fn short_store_fits_on_one_final_page() {
    let (backend, _) = backend_with_member(None);
    let queries = layer(&backend, &CacheConfig::default());
    for n in 0..5 {
        queries
            .create_post(draft(&format!("post {n}")), true)
            .await
            .expect("post");
    }

    let page = queries.posts(PageRequest::first(20)).await.expect("feed");

    assert_eq!(page.items.len(), 5);
    assert!(page.is_last());
    assert_eq!(page.next_request(), None);
}
