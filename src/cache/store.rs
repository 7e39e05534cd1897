//! Query result storage.
//!
//! An LRU of query results with per-entry staleness and a generation
//! counter. Invalidation marks entries stale and records the generation at
//! which each family was invalidated, so a read that began earlier can be
//! recognised as superseded and kept out of the store.

use std::collections::HashMap;
use std::sync::Mutex;

use lru::LruCache;
use metrics::counter;
use tracing::trace;

use crate::application::pagination::Page;
use crate::domain::entities::{Comment, Friendship, Post, UserProfile};
use crate::domain::types::{UserId, UserRole};

use super::config::CacheConfig;
use super::keys::{KeyFamily, QueryKey};
use super::lock::mutex_lock;
use super::registry::KeyRegistry;

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_HIT: &str = "feelslap_query_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "feelslap_query_cache_miss_total";
pub(crate) const METRIC_EVICT: &str = "feelslap_query_cache_evict_total";
pub(crate) const METRIC_INVALIDATED: &str = "feelslap_query_cache_invalidated_total";

pub type Generation = u64;

/// A cached query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Profile(Option<UserProfile>),
    Flag(bool),
    Role(UserRole),
    PostPage(Page<Post>),
    Post(Option<Post>),
    Posts(Vec<Post>),
    Comments(Vec<Comment>),
    Friendships(Vec<Friendship>),
    Users(Vec<UserId>),
}

impl QueryValue {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryValue::Profile(_) => "profile",
            QueryValue::Flag(_) => "flag",
            QueryValue::Role(_) => "role",
            QueryValue::PostPage(_) => "post_page",
            QueryValue::Post(_) => "post",
            QueryValue::Posts(_) => "posts",
            QueryValue::Comments(_) => "comments",
            QueryValue::Friendships(_) => "friendships",
            QueryValue::Users(_) => "users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Fresh(QueryValue),
    Stale,
    Miss,
}

struct Entry {
    value: QueryValue,
    stale: bool,
}

struct StoreState {
    entries: LruCache<QueryKey, Entry>,
    generation: Generation,
    invalidated_at: HashMap<KeyFamily, Generation>,
    all_invalidated_at: Generation,
}

impl StoreState {
    fn superseded(&self, key: &QueryKey, started: Generation) -> bool {
        self.all_invalidated_at > started
            || key.families().iter().any(|family| {
                self.invalidated_at
                    .get(family)
                    .is_some_and(|at| *at > started)
            })
    }

    fn bump(&mut self) -> Generation {
        self.generation += 1;
        self.generation
    }
}

pub struct QueryStore {
    enabled: bool,
    state: Mutex<StoreState>,
    registry: KeyRegistry,
}

impl QueryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            state: Mutex::new(StoreState {
                entries: LruCache::new(config.capacity_non_zero()),
                generation: 0,
                invalidated_at: HashMap::new(),
                all_invalidated_at: 0,
            }),
            registry: KeyRegistry::new(),
        }
    }

    /// Generation a read should remember when it starts.
    pub fn generation(&self) -> Generation {
        mutex_lock(&self.state, SOURCE, "generation").generation
    }

    /// Whether an invalidation touching `key` landed after `started`.
    pub fn is_superseded(&self, key: &QueryKey, started: Generation) -> bool {
        mutex_lock(&self.state, SOURCE, "is_superseded").superseded(key, started)
    }

    pub fn lookup(&self, key: &QueryKey) -> Lookup {
        let mut state = mutex_lock(&self.state, SOURCE, "lookup");
        let result = match state.entries.get(key) {
            Some(entry) if !entry.stale => Lookup::Fresh(entry.value.clone()),
            Some(_) => Lookup::Stale,
            None => Lookup::Miss,
        };
        drop(state);

        let operation = key.operation();
        match &result {
            Lookup::Fresh(_) => counter!(METRIC_HIT, "operation" => operation).increment(1),
            Lookup::Stale => {
                counter!(METRIC_MISS, "operation" => operation, "reason" => "stale").increment(1)
            }
            Lookup::Miss => {
                counter!(METRIC_MISS, "operation" => operation, "reason" => "absent").increment(1)
            }
        }
        result
    }

    /// Value regardless of staleness, without touching recency or metrics.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryValue> {
        mutex_lock(&self.state, SOURCE, "peek")
            .entries
            .peek(key)
            .map(|entry| entry.value.clone())
    }

    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        mutex_lock(&self.state, SOURCE, "is_stale")
            .entries
            .peek(key)
            .map(|entry| entry.stale)
    }

    /// Store a result read since `started`.
    ///
    /// Returns false when the result was not kept: caching is off, or an
    /// invalidation of one of the key's families landed after the read began.
    pub fn put(&self, key: QueryKey, value: QueryValue, started: Generation) -> bool {
        if !self.enabled {
            return false;
        }

        let mut state = mutex_lock(&self.state, SOURCE, "put");
        if state.superseded(&key, started) {
            trace!(key = %key, started, "Superseded read not stored");
            return false;
        }

        let evicted = state.entries.push(
            key.clone(),
            Entry {
                value,
                stale: false,
            },
        );
        // Registry updates stay under the state lock so a concurrent
        // invalidation cannot miss a freshly stored key.
        self.registry.register(&key);
        let evicted = evicted.filter(|(evicted_key, _)| evicted_key != &key);
        if let Some((evicted_key, _)) = &evicted {
            self.registry.unregister(evicted_key);
        }
        drop(state);

        if let Some((evicted_key, _)) = evicted {
            counter!(METRIC_EVICT, "operation" => evicted_key.operation()).increment(1);
        }
        true
    }

    /// Mark every entry of the given families stale.
    ///
    /// Returns how many cached entries were affected.
    pub fn invalidate<'a>(&self, families: impl IntoIterator<Item = &'a KeyFamily>) -> usize {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate");
        let generation = state.bump();
        let mut affected = 0;

        for family in families {
            state.invalidated_at.insert(family.clone(), generation);
            for key in self.registry.keys_for_family(family) {
                if let Some(entry) = state.entries.peek_mut(&key)
                    && !entry.stale
                {
                    entry.stale = true;
                    affected += 1;
                }
            }
        }
        drop(state);

        if affected > 0 {
            counter!(METRIC_INVALIDATED).increment(affected as u64);
        }
        affected
    }

    /// Mark every entry stale, superseding all in-flight reads.
    pub fn invalidate_all(&self) -> usize {
        let mut state = mutex_lock(&self.state, SOURCE, "invalidate_all");
        let generation = state.bump();
        state.all_invalidated_at = generation;

        let mut affected = 0;
        for (_, entry) in state.entries.iter_mut() {
            if !entry.stale {
                entry.stale = true;
                affected += 1;
            }
        }
        drop(state);

        if affected > 0 {
            counter!(METRIC_INVALIDATED).increment(affected as u64);
        }
        affected
    }

    /// Forget family invalidation marks no running read can still observe.
    ///
    /// A mark only supersedes reads that started before it, so marks at or
    /// below `oldest_live` are dead. With nothing in flight every mark is.
    /// Returns how many marks were dropped.
    pub fn compact(&self, oldest_live: Option<Generation>) -> usize {
        let mut state = mutex_lock(&self.state, SOURCE, "compact");
        let floor = oldest_live.unwrap_or(state.generation);
        let before = state.invalidated_at.len();
        state.invalidated_at.retain(|_, at| *at > floor);
        before - state.invalidated_at.len()
    }

    pub(crate) fn invalidation_marks(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "invalidation_marks")
            .invalidated_at
            .len()
    }

    /// Drop every entry, superseding all in-flight reads.
    pub fn clear(&self) {
        let mut state = mutex_lock(&self.state, SOURCE, "clear");
        let generation = state.bump();
        state.all_invalidated_at = generation;
        state.entries.clear();
        state.invalidated_at.clear();
        self.registry.clear();
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::PageRequest;
    use crate::domain::types::PostId;

    fn store(capacity: usize) -> QueryStore {
        QueryStore::new(&CacheConfig::with_capacity(capacity))
    }

    #[test]
    fn put_then_lookup_is_fresh() {
        let store = store(8);
        let key = QueryKey::IsCallerAdmin;
        assert_eq!(store.lookup(&key), Lookup::Miss);

        assert!(store.put(key.clone(), QueryValue::Flag(true), store.generation()));
        assert_eq!(store.lookup(&key), Lookup::Fresh(QueryValue::Flag(true)));
    }

    #[test]
    fn invalidation_marks_family_members_stale() {
        let store = store(8);
        let list = QueryKey::Posts(PageRequest::first(20));
        let single = QueryKey::Post(PostId::new("p1"));
        let other = QueryKey::Post(PostId::new("p2"));
        for key in [&list, &single, &other] {
            store.put(key.clone(), QueryValue::Posts(Vec::new()), store.generation());
        }

        let affected = store.invalidate(&[KeyFamily::PostLists, KeyFamily::Post(PostId::new("p1"))]);

        assert_eq!(affected, 2);
        assert_eq!(store.lookup(&list), Lookup::Stale);
        assert_eq!(store.lookup(&single), Lookup::Stale);
        assert!(matches!(store.lookup(&other), Lookup::Fresh(_)));
    }

    #[test]
    fn read_started_before_invalidation_is_not_stored() {
        let store = store(8);
        let key = QueryKey::FlaggedPosts;
        let started = store.generation();

        store.invalidate(&[KeyFamily::FlaggedPosts]);

        assert!(!store.put(key.clone(), QueryValue::Posts(Vec::new()), started));
        assert_eq!(store.lookup(&key), Lookup::Miss);
        assert!(store.put(key, QueryValue::Posts(Vec::new()), store.generation()));
    }

    #[test]
    fn unrelated_invalidation_does_not_supersede() {
        let store = store(8);
        let started = store.generation();
        store.invalidate(&[KeyFamily::PendingRequests]);
        assert!(store.put(QueryKey::FlaggedPosts, QueryValue::Posts(Vec::new()), started));
    }

    #[test]
    fn lru_eviction_unregisters_keys() {
        let store = store(1);
        let first = QueryKey::Post(PostId::new("p1"));
        let second = QueryKey::Post(PostId::new("p2"));
        store.put(first.clone(), QueryValue::Post(None), store.generation());
        store.put(second.clone(), QueryValue::Post(None), store.generation());

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup(&first), Lookup::Miss);
        assert_eq!(store.invalidate(&[KeyFamily::Post(PostId::new("p1"))]), 0);
    }

    #[test]
    fn invalidate_all_and_clear() {
        let store = store(8);
        let started = store.generation();
        store.put(QueryKey::IsSiteOwner, QueryValue::Flag(false), started);
        assert_eq!(store.invalidate_all(), 1);
        assert_eq!(store.is_stale(&QueryKey::IsSiteOwner), Some(true));
        assert!(!store.put(QueryKey::IsCallerAdmin, QueryValue::Flag(false), started));

        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn compaction_keeps_only_marks_a_running_read_can_see() {
        let store = store(4);
        store.invalidate(&[KeyFamily::Comments(PostId::new("p0"))]);
        let started = store.generation();
        store.invalidate(&[KeyFamily::Comments(PostId::new("p1"))]);
        assert_eq!(store.invalidation_marks(), 2);

        assert_eq!(store.compact(Some(started)), 1);
        assert!(store.is_superseded(&QueryKey::Comments(PostId::new("p1")), started));

        assert_eq!(store.compact(None), 1);
        assert_eq!(store.invalidation_marks(), 0);
    }

    #[test]
    fn disabled_store_keeps_nothing() {
        let store = QueryStore::new(&CacheConfig::disabled());
        assert!(!store.put(QueryKey::IsSiteOwner, QueryValue::Flag(true), store.generation()));
        assert!(store.is_empty());
    }
}
