use quill_api::{ApiError, StorageError};
use quill_types::{NotificationId, PostId};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("failed to encode session data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("a like toggle is already pending for post {0}")]
    ToggleInFlight(PostId),
    #[error("{0}")]
    Validation(&'static str),
    #[error("session is not authenticated")]
    NotAuthenticated,
    #[error("no notification with id {0}")]
    UnknownNotification(NotificationId),
    #[error("notification {0} has no {1} link")]
    MissingLink(NotificationId, &'static str),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Text for an inline message next to the control that failed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Api(e) => e.user_message(),
            Self::Storage(_) | Self::Encode(_) => "Could not save your session locally.",
            Self::ToggleInFlight(_) => "Still working on your last click.",
            Self::Validation(msg) => msg,
            Self::NotAuthenticated => "Please sign in again.",
            Self::UnknownNotification(_) | Self::MissingLink(..) => "That notification is no longer available.",
        }
    }
}
