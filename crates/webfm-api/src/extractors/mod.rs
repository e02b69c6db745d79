//! Custom Axum extractors.

pub mod json;
pub mod user;

pub use json::ValidatedJson;
pub use user::ActingUser;
