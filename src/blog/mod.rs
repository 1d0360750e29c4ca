//! Data access for blog content. Every function takes a borrowed connection so
//! callers decide how connections are pooled and shared.

pub mod categories;
pub mod comments;
pub mod posts;
pub mod tags;
pub mod users;
