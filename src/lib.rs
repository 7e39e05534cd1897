//! Client-side domain and query layer for the Feel the Slap social network.
//!
//! The crate is split the usual way: `domain` holds entities and pure rules,
//! `application` holds the boundary traits, the domain client, the cached
//! query layer and the session, `cache` holds the query cache machinery and
//! `infra` holds adapters (HTTP, in-memory, file storage, telemetry).

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
