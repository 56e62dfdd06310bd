use crate::storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Raised before any request is built.
    #[error("no bearer token stored")]
    MissingToken,
    #[error("invalid API base url: {0}")]
    BaseUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
    /// Endpoint answered with a body of the wrong shape.
    #[error("malformed response from {endpoint}: {detail}")]
    MalformedResponse { endpoint: &'static str, detail: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Fixed text suitable for an inline banner. Never includes server detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingToken => "You are not signed in.",
            Self::Status { status: 401 | 403, .. } => "You are not allowed to do that.",
            Self::Status { status: 404, .. } => "Not found.",
            Self::Status { status: 400..=499, .. } => "The request was rejected. Please check your input.",
            Self::Status { .. } | Self::Transport(_) => {
                "The server is unavailable. Please try again later."
            }
            Self::MalformedResponse { .. } => "The server sent an unexpected response.",
            Self::BaseUrl(_) | Self::Storage(_) => "The client is misconfigured.",
        }
    }
}
