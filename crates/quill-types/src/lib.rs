pub mod api;
pub mod claims;
pub mod models;

/// Backend identifiers are plain integers.
pub type UserId = i64;
pub type PostId = i64;
pub type NotificationId = i64;
