use std::sync::Arc;

use {
    reqwest::Method,
    salesdesk_auth::{
        CredentialStore, Credentials, KeyValueStore, LoginRequest, RefreshRequest,
        RefreshResponse, TokenPair,
    },
    salesdesk_config::SalesdeskConfig,
    secrecy::{ExposeSecret, Secret},
    serde::{Serialize, de::DeserializeOwned},
    tracing::{debug, info, warn},
    url::Url,
};

#[cfg(feature = "metrics")]
use metrics::counter;

use crate::{
    cache::ReferenceCache,
    error::{ApiError, Result},
    models::UserRegistration,
    request::RequestDescriptor,
    response::ApiResponse,
};

/// First attempt plus the single retry after a token refresh.
const MAX_ATTEMPTS: u32 = 2;

/// HTTP client for the sales API.
///
/// Every authorized call reads the current access token from the session
/// store. A 401 carrying `token_not_valid` refreshes the token once and
/// replays the call; any other response goes back to the caller as-is.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn KeyValueStore>,
    credentials: CredentialStore,
    cache: ReferenceCache,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        // `Url::join` drops the last path segment unless the base ends in '/'.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            credentials: CredentialStore::new(Arc::clone(&store)),
            cache: ReferenceCache::new(Arc::clone(&store), true),
            store,
        })
    }

    pub fn from_config(config: &SalesdeskConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let client = Self::new(config.api.normalized_base_url(), store)?;
        Ok(client.with_cache_enabled(config.cache.enabled))
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache = ReferenceCache::new(Arc::clone(&self.store), enabled);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Absolute URL for a path relative to the API base, e.g. `accounts/3/`.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Send with the bearer token, refreshing and retrying once on `token_not_valid`.
    pub async fn send(&self, descriptor: RequestDescriptor) -> Result<ApiResponse> {
        self.send_with(descriptor, true).await
    }

    /// Like [`Self::send`]; `allow_retry = false` returns the first response whatever it is.
    pub async fn send_with(
        &self,
        descriptor: RequestDescriptor,
        allow_retry: bool,
    ) -> Result<ApiResponse> {
        let attempts = if allow_retry {
            MAX_ATTEMPTS
        } else {
            1
        };
        let token = self.credentials.access_token().map_err(ApiError::Store)?;
        if token.is_none() {
            debug!(url = %descriptor.url(), "no access token stored, sending without authorization");
        }
        let mut current = descriptor.authorized(token.as_ref())?;
        let mut attempt = 1;
        loop {
            let response = self.dispatch(&current).await?;
            if attempt >= attempts || !response.is_token_not_valid() {
                return Ok(response);
            }
            warn!(
                method = %descriptor.method(),
                url = %descriptor.url(),
                "access token rejected, refreshing"
            );
            let token = self.refresh_token().await?;
            current = descriptor.authorized(Some(&token))?;
            attempt += 1;
        }
    }

    /// Send without credentials. Used for login, refresh and public endpoints.
    pub async fn send_anonymous(&self, descriptor: RequestDescriptor) -> Result<ApiResponse> {
        self.dispatch(&descriptor.anonymous()).await
    }

    async fn dispatch(&self, descriptor: &RequestDescriptor) -> Result<ApiResponse> {
        let mut request = self
            .http
            .request(descriptor.method().clone(), descriptor.url().clone())
            .headers(descriptor.headers().clone());
        if let Some(body) = descriptor.body() {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await.inspect_err(|e| {
            warn!(method = %descriptor.method(), url = %descriptor.url(), error = %e, "request failed");
        })?;
        let response = ApiResponse::read(response).await?;
        debug!(
            method = %descriptor.method(),
            url = %descriptor.url(),
            status = response.status().as_u16(),
            "api response"
        );

        #[cfg(feature = "metrics")]
        counter!(
            "salesdesk_api_requests_total",
            "method" => descriptor.method().to_string(),
            "status" => response.status().as_u16().to_string()
        )
        .increment(1);

        Ok(response)
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// The new token (and a rotated refresh token, if the server sent one) is
    /// persisted before returning. Never retried.
    pub async fn refresh_token(&self) -> Result<Secret<String>> {
        let Some(refresh) = self.credentials.refresh_token().map_err(ApiError::Store)? else {
            warn!("no refresh token stored");
            return Err(ApiError::Authentication(
                "no refresh token stored, log in again".into(),
            ));
        };

        let descriptor = RequestDescriptor::post(self.endpoint("token/refresh/")?).with_json(
            &RefreshRequest {
                refresh: refresh.expose_secret(),
            },
        )?;
        let response = self.send_anonymous(descriptor).await?;

        if !response.is_success() {
            #[cfg(feature = "metrics")]
            counter!("salesdesk_token_refresh_total", "outcome" => "rejected").increment(1);

            let detail = response
                .error_body()
                .detail
                .unwrap_or_else(|| "no detail".into());
            warn!(status = response.status().as_u16(), %detail, "token refresh rejected");
            return Err(ApiError::Authentication(format!(
                "refresh failed with status {}: {detail}",
                response.status()
            )));
        }

        let refreshed: RefreshResponse = response.json().map_err(|e| {
            ApiError::Authentication(format!("refresh failed, unexpected response: {e}"))
        })?;
        self.credentials
            .set_access_token(&refreshed.access)
            .map_err(ApiError::Store)?;
        if let Some(rotated) = &refreshed.refresh {
            self.credentials
                .set_refresh_token(rotated)
                .map_err(ApiError::Store)?;
        }

        #[cfg(feature = "metrics")]
        counter!("salesdesk_token_refresh_total", "outcome" => "success").increment(1);

        info!(rotated = refreshed.refresh.is_some(), "access token refreshed");
        Ok(refreshed.access)
    }

    /// Obtain a token pair and store it with the username.
    pub async fn login(&self, username: &str, password: &Secret<String>) -> Result<Credentials> {
        let descriptor =
            RequestDescriptor::post(self.endpoint("token/")?).with_json(&LoginRequest {
                username,
                password: password.expose_secret(),
            })?;
        let response = self.send_anonymous(descriptor).await?;

        if !response.is_success() {
            let detail = response
                .error_body()
                .detail
                .unwrap_or_else(|| format!("status {}", response.status()));
            warn!(username, status = response.status().as_u16(), "login rejected");
            return Err(ApiError::Authentication(format!("login failed: {detail}")));
        }

        let credentials = Credentials::from(response.json::<TokenPair>()?);
        self.credentials
            .save_login(username, &credentials)
            .map_err(ApiError::Store)?;
        info!(username, "logged in");
        Ok(credentials)
    }

    /// Forget the session and all cached reference data.
    pub fn logout(&self) -> Result<()> {
        let username = self.credentials.username().map_err(ApiError::Store)?;
        self.store.clear().map_err(ApiError::Store)?;
        info!(username = username.as_deref().unwrap_or("-"), "logged out");
        Ok(())
    }

    /// Forget the session credentials but keep cached reference data.
    pub fn logout_keep_cache(&self) -> Result<()> {
        let username = self.credentials.username().map_err(ApiError::Store)?;
        self.credentials.clear().map_err(ApiError::Store)?;
        info!(username = username.as_deref().unwrap_or("-"), "logged out, cache kept");
        Ok(())
    }

    pub async fn register(&self, user: &UserRegistration) -> Result<serde_json::Value> {
        let descriptor = RequestDescriptor::post(self.endpoint("users/register/")?).with_json(user)?;
        let response = self.send_anonymous(descriptor).await?.error_for_status()?;
        info!(username = %user.username, "user registered");
        response.json()
    }

    pub async fn health(&self) -> Result<serde_json::Value> {
        let descriptor = RequestDescriptor::get(self.endpoint("health/")?);
        self.send_anonymous(descriptor)
            .await?
            .error_for_status()?
            .json()
    }

    /// `GET` a path and decode the JSON body. Non-2xx becomes [`ApiError::Application`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(RequestDescriptor::get(self.endpoint(path)?))
            .await
    }

    /// `GET` with query parameters; empty values are left out.
    pub async fn get_json_with_query<T, K, V>(
        &self,
        path: &str,
        query: impl IntoIterator<Item = (K, V)>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.execute(RequestDescriptor::get(self.endpoint(path)?).with_query(query))
            .await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_with_body(Method::POST, path, body).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_with_body(Method::PUT, path, body).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.execute_with_body(Method::PATCH, path, body).await
    }

    /// `DELETE` a path. The body, usually empty, is ignored.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(RequestDescriptor::delete(self.endpoint(path)?))
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn execute_with_body<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let descriptor = RequestDescriptor::new(method, self.endpoint(path)?).with_json(body)?;
        self.execute(descriptor).await
    }

    async fn execute<T: DeserializeOwned>(&self, descriptor: RequestDescriptor) -> Result<T> {
        self.send(descriptor).await?.error_for_status()?.json()
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        mockito::{Matcher, Server, ServerGuard},
        std::io::Write,
        reqwest::StatusCode,
        salesdesk_auth::MemoryStore,
        serde_json::{Value, json},
    };

    const TOKEN_NOT_VALID_BODY: &str = r#"{"detail":"Given token not valid for any token type","code":"token_not_valid","messages":[{"token_class":"AccessToken","token_type":"access","message":"Token is invalid or expired"}]}"#;

    fn client_for(server: &ServerGuard) -> (ApiClient, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let client = ApiClient::new(&format!("{}/api", server.url()), store.clone()).unwrap();
        (client, store)
    }

    fn logged_in(store: &MemoryStore, access: &str, refresh: &str) {
        store.set("token", access).unwrap();
        store.set("refresh_token", refresh).unwrap();
    }

    fn get(client: &ApiClient, path: &str) -> RequestDescriptor {
        RequestDescriptor::get(client.endpoint(path).unwrap())
    }

    #[test]
    fn endpoint_keeps_base_path() {
        let store = Arc::new(MemoryStore::new());
        let client = ApiClient::new("http://localhost:8000/api/", store).unwrap();
        assert_eq!(
            client.endpoint("accounts/3/sales-rep/").unwrap().as_str(),
            "http://localhost:8000/api/accounts/3/sales-rep/"
        );
        assert_eq!(
            client.endpoint("/token/").unwrap().as_str(),
            "http://localhost:8000/api/token/"
        );
    }

    #[tokio::test]
    async fn non_401_is_returned_without_refresh() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let accounts = server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A1")
            .match_header("content-type", "application/json")
            .with_status(500)
            .with_body(r#"{"detail":"boom"}"#)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let response = client.send(get(&client, "accounts/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.text(), r#"{"detail":"boom"}"#);
        accounts.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn other_401_codes_are_final() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let accounts = server
            .mock("GET", "/api/accounts/")
            .with_status(401)
            .with_body(r#"{"detail":"Authentication credentials were not provided.","code":"not_authenticated"}"#)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let response = client.send(get(&client, "accounts/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.error_body().code.as_deref(), Some("not_authenticated"));
        accounts.assert_async().await;
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn unparseable_401_is_final() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("GET", "/api/accounts/")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let response = client.send(get(&client, "accounts/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn expired_token_refreshes_once_and_retries() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let first = server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::Json(json!({"refresh": "R1"})))
            .with_status(200)
            .with_body(r#"{"access":"A2"}"#)
            .expect(1)
            .create_async()
            .await;
        let retried = server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"Mercy General"}]"#)
            .expect(1)
            .create_async()
            .await;

        let response = client.send(get(&client, "accounts/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().unwrap();
        assert_eq!(body[0]["name"], "Mercy General");

        assert_eq!(store.get("token").unwrap().as_deref(), Some("A2"));
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));
        first.assert_async().await;
        refresh.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn second_401_is_returned_without_another_refresh() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let first = server
            .mock("GET", "/api/invoices/")
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access":"A2"}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/invoices/")
            .match_header("authorization", "Bearer A2")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;

        let response = client.send(get(&client, "invoices/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.is_token_not_valid());
        first.assert_async().await;
        refresh.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn missing_refresh_token_fails_without_network() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        store.set("token", "A1").unwrap();

        server
            .mock("GET", "/api/accounts/")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let err = client.send(get(&client, "accounts/")).await.unwrap_err();
        assert!(err.is_authentication(), "{err:?}");
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_refresh_is_an_authentication_error() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let original = server
            .mock("GET", "/api/reps/")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/api/token/refresh/")
            .with_status(401)
            .with_body(r#"{"detail":"Token is blacklisted","code":"token_not_valid"}"#)
            .expect(1)
            .create_async()
            .await;

        let err = client.send(get(&client, "reps/")).await.unwrap_err();
        match &err {
            ApiError::Authentication(message) => assert!(message.contains("refresh failed")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));
        original.assert_async().await;
    }

    #[tokio::test]
    async fn retry_disabled_returns_first_401() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("GET", "/api/accounts/")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let response = client
            .send_with(get(&client, "accounts/"), false)
            .await
            .unwrap();
        assert!(response.is_token_not_valid());
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn rotated_refresh_token_is_persisted() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body(r#"{"access":"A2","refresh":"R2"}"#)
            .create_async()
            .await;

        let token = client.refresh_token().await.unwrap();
        assert_eq!(token.expose_secret(), "A2");
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A2"));
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R2"));
    }

    #[tokio::test]
    async fn malformed_refresh_response_is_an_authentication_error() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let err = client.refresh_token().await.unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));
    }

    #[tokio::test]
    async fn unauthenticated_calls_still_fire() {
        let mut server = Server::new_async().await;
        let (client, _store) = client_for(&server);

        let reps = server
            .mock("GET", "/api/reps/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let response = client.send(get(&client, "reps/")).await.unwrap();
        assert!(response.is_success());
        reps.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_transport() {
        let store = Arc::new(MemoryStore::new());
        logged_in(&store, "A1", "R1");
        // Nothing listens on port 1.
        let client = ApiClient::new("http://127.0.0.1:1/api", store).unwrap();

        let err = client
            .send(RequestDescriptor::get(client.endpoint("accounts/").unwrap()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
    }

    #[tokio::test]
    async fn login_then_expired_token_scenario() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);

        let login = server
            .mock("POST", "/api/token/")
            .match_body(Matcher::Json(json!({"username": "rep1", "password": "pw"})))
            .with_status(200)
            .with_body(r#"{"access":"A1","refresh":"R1"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/api/token/refresh/")
            .match_body(Matcher::Json(json!({"refresh": "R1"})))
            .with_status(200)
            .with_body(r#"{"access":"A2"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body(r#"[{"id":1,"name":"Mercy General"},{"id":2,"name":"St. Jude"}]"#)
            .expect(1)
            .create_async()
            .await;

        client
            .login("rep1", &Secret::new("pw".to_string()))
            .await
            .unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));
        assert_eq!(store.get("username").unwrap().as_deref(), Some("rep1"));

        let accounts: Vec<Value> = client.get_json("accounts/").await.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A2"));
        login.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_login_reports_detail() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);

        server
            .mock("POST", "/api/token/")
            .with_status(401)
            .with_body(r#"{"detail":"No active account found with the given credentials"}"#)
            .create_async()
            .await;

        let err = client
            .login("rep1", &Secret::new("wrong".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert!(err.to_string().contains("No active account"));
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_empties_the_store() {
        let server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");
        store.set("username", "rep1").unwrap();
        store.set("cache.salesReps", "[]").unwrap();

        client.logout().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[tokio::test]
    async fn logout_can_keep_the_cache() {
        let server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");
        store.set("username", "rep1").unwrap();
        store.set("cache.salesReps", "[]").unwrap();

        client.logout_keep_cache().unwrap();
        assert_eq!(store.keys().unwrap(), vec!["cache.salesReps"]);
        assert!(client.credentials().credentials().unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_expired_calls_each_refresh() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let expired = server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A1")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/token/refresh/")
            .match_body(Matcher::Json(json!({"refresh": "R1"})))
            .with_status(200)
            .with_body(r#"{"access":"A2"}"#)
            .expect(2)
            .create_async()
            .await;
        let retried = server
            .mock("GET", "/api/accounts/")
            .match_header("authorization", "Bearer A2")
            .with_status(200)
            .with_body("[]")
            .expect(2)
            .create_async()
            .await;

        let descriptor = get(&client, "accounts/");
        let (first, second) =
            tokio::join!(client.send(descriptor.clone()), client.send(descriptor));
        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A2"));
        expired.assert_async().await;
        refresh.assert_async().await;
        retried.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_during_refresh_stays_transport() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("GET", "/api/accounts/")
            .with_status(401)
            .with_body(TOKEN_NOT_VALID_BODY)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("POST", "/api/token/refresh/")
            .with_status(200)
            .with_chunked_body(|w| {
                w.write_all(br#"{"access":"#)?;
                Err(std::io::Error::other("connection reset"))
            })
            .create_async()
            .await;

        let err = client.send(get(&client, "accounts/")).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "{err:?}");
        assert!(!err.is_authentication());
        assert_eq!(store.get("token").unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn typed_helpers_map_errors() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("POST", "/api/accounts/")
            .with_status(400)
            .with_body(r#"{"name":["This field is required."]}"#)
            .create_async()
            .await;

        let err = client
            .post_json::<_, Value>("accounts/", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        match err {
            ApiError::Application { body, .. } => assert!(body.contains("This field is required.")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn delete_accepts_empty_body() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        let delete = server
            .mock("DELETE", "/api/invoices/9/")
            .match_header("authorization", "Bearer A1")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        client.delete("invoices/9/").await.unwrap();
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn health_and_register_are_anonymous() {
        let mut server = Server::new_async().await;
        let (client, store) = client_for(&server);
        logged_in(&store, "A1", "R1");

        server
            .mock("GET", "/api/health/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"status":"ok"}"#)
            .create_async()
            .await;
        let register = server
            .mock("POST", "/api/users/register/")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({"username": "rep2", "password2": "pw"})))
            .with_status(201)
            .with_body(r#"{"id":7,"username":"rep2"}"#)
            .expect(1)
            .create_async()
            .await;

        let health = client.health().await.unwrap();
        assert_eq!(health["status"], "ok");

        let created = client
            .register(&UserRegistration {
                username: "rep2".into(),
                email: "rep2@example.com".into(),
                password: "pw".into(),
                password2: "pw".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(created["id"], 7);
        register.assert_async().await;
    }
}
