//! Session-local query cache.
//!
//! - **Keys**: `QueryKey` names one boundary read with its parameters;
//!   each key belongs to one or more `KeyFamily` values.
//! - **Store**: LRU of results with staleness and a generation counter.
//! - **In-flight**: identical concurrent reads share one boundary call.
//! - **Invalidation**: mutations publish events, the planner maps them to
//!   families, and every entry in those families is marked stale.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! capacity = 256
//! ```

mod config;
mod events;
mod inflight;
mod keys;
pub(crate) mod lock;
mod planner;
mod query;
mod registry;
mod store;

pub use config::CacheConfig;
pub use events::{Epoch, EventQueue, Mutation, MutationEvent};
pub use keys::{KeyFamily, QueryKey};
pub use planner::{InvalidationPlan, families_for};
pub use query::QueryCache;
pub use registry::KeyRegistry;
pub use store::{Generation, Lookup, QueryStore, QueryValue};
