use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Access/refresh token pair for the current session.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_token: Secret<String>,
    pub refresh_token: Secret<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Secret::new(access_token.into()),
            refresh_token: Secret::new(refresh_token.into()),
        }
    }
}

/// Body of `POST {base}/token/`.
#[derive(Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Response of `POST {base}/token/`.
#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: Secret<String>,
    pub refresh: Secret<String>,
}

impl From<TokenPair> for Credentials {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access,
            refresh_token: pair.refresh,
        }
    }
}

/// Body of `POST {base}/token/refresh/`.
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// Response of `POST {base}/token/refresh/`.
///
/// `refresh` is only present when the server rotates refresh tokens.
#[derive(Debug, Deserialize)]
pub struct RefreshResponse {
    pub access: Secret<String>,
    #[serde(default)]
    pub refresh: Option<Secret<String>>,
}

/// Error body returned by the API: `{"code": "...", "detail": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Error code the server uses for an expired or otherwise invalid access token.
pub const TOKEN_NOT_VALID: &str = "token_not_valid";

impl ErrorBody {
    /// Parse an error body, tolerating anything that is not the expected shape.
    pub fn parse(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn is_token_not_valid(&self) -> bool {
        self.code.as_deref() == Some(TOKEN_NOT_VALID)
    }
}

/// Render a bearer header value for `token`.
pub fn bearer(token: &Secret<String>) -> String {
    format!("Bearer {}", token.expose_secret())
}
