//! Query cache facade: coalesced cached reads and mutation-driven invalidation.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use metrics::counter;
use tracing::{debug, info};

use crate::application::error::ClientError;

use super::config::CacheConfig;
use super::events::{EventQueue, Mutation};
use super::inflight::InFlight;
use super::keys::QueryKey;
use super::planner::InvalidationPlan;
use super::store::{Lookup, QueryStore, QueryValue};

pub(crate) const METRIC_COALESCED: &str = "feelslap_query_cache_coalesced_total";

/// Session-scoped query cache.
///
/// Reads for the same key share one in-flight boundary call and one cached
/// result. Mutations publish an event which is consumed immediately: every
/// family in the resulting plan is marked stale before `trigger` returns.
pub struct QueryCache {
    store: Arc<QueryStore>,
    inflight: Arc<InFlight>,
    queue: EventQueue,
}

impl QueryCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Arc::new(QueryStore::new(config)),
            inflight: Arc::new(InFlight::new()),
            queue: EventQueue::new(),
        }
    }

    /// Cached value for `key`, loading through `loader` on a miss or a stale entry.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, loader: F) -> Result<QueryValue, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryValue, ClientError>> + Send + 'static,
    {
        if let Lookup::Fresh(value) = self.store.lookup(&key) {
            return Ok(value);
        }

        let (load, joined) = self.inflight.join_or_start(
            &key,
            || self.store.generation(),
            |started| !self.store.is_superseded(&key, started),
            |ticket, started| {
                let store = Arc::clone(&self.store);
                let inflight = Arc::clone(&self.inflight);
                let key = key.clone();
                let pending = loader();
                async move {
                    let result = pending.await;
                    match &result {
                        Ok(value) => {
                            let stored = store.put(key.clone(), value.clone(), started);
                            debug!(key = %key, stored, kind = value.kind(), "Query loaded");
                        }
                        Err(error) => debug!(key = %key, error = %error, "Query failed"),
                    }
                    inflight.finish(&key, ticket, started, |oldest| {
                        store.compact(oldest);
                    });
                    result
                }
                .boxed()
                .shared()
            },
        );

        if joined {
            counter!(METRIC_COALESCED, "operation" => key.operation()).increment(1);
        }
        load.await
    }

    /// Publish a successful mutation and apply its invalidation plan.
    pub fn trigger(&self, mutation: Mutation) -> InvalidationPlan {
        self.queue.publish(mutation);
        let plan = InvalidationPlan::from_events(self.queue.drain());
        let affected = self.store.invalidate(&plan.families);
        self.compact();

        info!(plan = %plan, affected, "Mutation invalidated cached queries");
        plan
    }

    /// Mark every entry stale, e.g. after the connection comes back.
    pub fn mark_all_stale(&self) -> usize {
        let affected = self.store.invalidate_all();
        self.compact();
        info!(affected, "All cached queries marked stale");
        affected
    }

    pub fn clear(&self) {
        self.store.clear();
        info!("Query cache cleared");
    }

    fn compact(&self) {
        self.inflight.with_oldest_live(|oldest| {
            self.store.compact(oldest);
        });
    }

    /// Cached value regardless of staleness.
    pub fn peek(&self, key: &QueryKey) -> Option<QueryValue> {
        self.store.peek(key)
    }

    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.store.is_stale(key)
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}
