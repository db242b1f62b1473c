use reqwest::StatusCode;

/// Errors surfaced by [`crate::ApiClient`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a complete response (DNS, refused connection, reset body).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No usable session: missing refresh token, refresh rejected, or login rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The API answered with a non-success status.
    #[error("api returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Application {
        status: StatusCode,
        code: Option<String>,
        detail: Option<String>,
        body: String,
    },

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("session store error: {0:#}")]
    Store(anyhow::Error),
}

impl ApiError {
    /// True when the caller should ask the user to log in again.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication(_))
    }

    /// HTTP status of an application error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Application { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;
