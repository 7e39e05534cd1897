//! Boundary contracts, the domain client, the cached query layer and the session.

pub mod boundary;
pub mod client;
pub mod error;
pub mod pagination;
pub mod queries;
pub mod session;
