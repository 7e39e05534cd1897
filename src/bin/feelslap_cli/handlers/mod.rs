#![deny(clippy::all, clippy::pedantic)]

pub mod admin;
pub mod comments;
pub mod feed;
pub mod friends;
pub mod posts;
pub mod profile;
pub mod react;
pub mod signup;
pub mod validate;
