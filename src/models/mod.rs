//! Data models for stored image objects.
//!
//! Records map to database rows via `sqlx::FromRow` and serialize naturally
//! as JSON via `serde`.

pub mod object;
