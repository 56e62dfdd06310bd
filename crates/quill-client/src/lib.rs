pub mod auth_flow;
pub mod document;
pub mod error;
pub mod guard;
pub mod likes;
pub mod notifications;
pub mod router;
pub mod session;
pub mod views;

#[cfg(test)]
mod testing;

pub use document::{Document, Region};
pub use error::{ClientError, ClientResult};
pub use guard::{Guarded, RouteGuard, View};
pub use likes::{LikeControl, LikeState};
pub use notifications::{DropdownState, LinkTarget, NotificationCenter};
pub use router::Route;
pub use session::{Session, SessionStore};
