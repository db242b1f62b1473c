use {
    reqwest::{StatusCode, header::HeaderMap},
    salesdesk_auth::ErrorBody,
    serde::de::DeserializeOwned,
    url::Url,
};

use crate::error::{ApiError, Result};

/// A fully buffered response.
///
/// Buffering lets the client inspect a 401 body for the token error code and
/// still hand the untouched response back to the caller.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    url: Url,
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self {
            url,
            status,
            headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn error_body(&self) -> ErrorBody {
        ErrorBody::parse(&self.body)
    }

    /// A 401 carrying the `token_not_valid` code. Any other 401 is final.
    pub fn is_token_not_valid(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED && self.error_body().is_token_not_valid()
    }

    /// Turn a non-2xx response into [`ApiError::Application`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let ErrorBody { code, detail } = self.error_body();
        Err(ApiError::Application {
            status: self.status,
            code,
            detail,
            body: self.text(),
        })
    }
}
