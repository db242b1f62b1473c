use {
    reqwest::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
    },
    secrecy::Secret,
    serde::Serialize,
    url::Url,
};

use crate::error::Result;

/// Everything needed to issue one outbound call.
///
/// A descriptor is never mutated while a call is in flight; re-authorizing
/// it for a retry produces a new value.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: Url) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn patch(url: Url) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: Url) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Attach a JSON body.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append query parameters, skipping pairs whose value is empty.
    pub fn with_query<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs = pairs
            .into_iter()
            .filter(|(_, v)| !v.as_ref().is_empty())
            .peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (k, v) in pairs {
                query.append_pair(k.as_ref(), v.as_ref());
            }
        }
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&serde_json::Value> {
        self.body.as_ref()
    }

    /// A copy carrying the bearer token (when there is one) and a JSON content type.
    ///
    /// An explicit `Content-Type` set by the caller is kept.
    pub fn authorized(&self, token: Option<&Secret<String>>) -> Result<Self> {
        let mut next = self.clone();
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&salesdesk_auth::bearer(token))?;
            value.set_sensitive(true);
            next.headers.insert(AUTHORIZATION, value);
        }
        next.ensure_json_content_type();
        Ok(next)
    }

    /// A copy without credentials, for endpoints that take none.
    pub fn anonymous(&self) -> Self {
        let mut next = self.clone();
        next.headers.remove(AUTHORIZATION);
        next.ensure_json_content_type();
        next
    }

    fn ensure_json_content_type(&mut self) {
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
    }
}
