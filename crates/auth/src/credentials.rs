use std::sync::Arc;

use {
    anyhow::Result,
    secrecy::{ExposeSecret, Secret},
    tracing::debug,
};

use crate::{store::KeyValueStore, types::Credentials};

/// Key holding the current access token.
pub const ACCESS_TOKEN_KEY: &str = "token";
/// Key holding the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
/// Key holding the name the session logged in with.
pub const USERNAME_KEY: &str = "username";

/// Typed view over the session store for credentials.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Result<Option<Secret<String>>> {
        Ok(self.store.get(ACCESS_TOKEN_KEY)?.map(Secret::new))
    }

    pub fn refresh_token(&self) -> Result<Option<Secret<String>>> {
        Ok(self.store.get(REFRESH_TOKEN_KEY)?.map(Secret::new))
    }

    pub fn username(&self) -> Result<Option<String>> {
        self.store.get(USERNAME_KEY)
    }

    /// Both tokens, if a session exists.
    pub fn credentials(&self) -> Result<Option<Credentials>> {
        match (self.access_token()?, self.refresh_token()?) {
            (Some(access_token), Some(refresh_token)) => Ok(Some(Credentials {
                access_token,
                refresh_token,
            })),
            _ => Ok(None),
        }
    }

    /// Persist a fresh login.
    pub fn save_login(&self, username: &str, credentials: &Credentials) -> Result<()> {
        self.store
            .set(ACCESS_TOKEN_KEY, credentials.access_token.expose_secret())?;
        self.store
            .set(REFRESH_TOKEN_KEY, credentials.refresh_token.expose_secret())?;
        self.store.set(USERNAME_KEY, username)?;
        debug!(username, "session credentials stored");
        Ok(())
    }

    /// Replace the current access token.
    pub fn set_access_token(&self, token: &Secret<String>) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token.expose_secret())
    }

    /// Replace the refresh token (servers that rotate refresh tokens).
    pub fn set_refresh_token(&self, token: &Secret<String>) -> Result<()> {
        self.store.set(REFRESH_TOKEN_KEY, token.expose_secret())
    }

    /// Forget the session credentials, leaving other entries alone.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        self.store.remove(USERNAME_KEY)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn store() -> (Arc<MemoryStore>, CredentialStore) {
        let kv = Arc::new(MemoryStore::new());
        let creds = CredentialStore::new(kv.clone());
        (kv, creds)
    }

    #[test]
    fn login_writes_canonical_keys() {
        let (kv, creds) = store();
        creds
            .save_login("rep1", &Credentials::new("A1", "R1"))
            .unwrap();

        assert_eq!(kv.get("token").unwrap().as_deref(), Some("A1"));
        assert_eq!(kv.get("refresh_token").unwrap().as_deref(), Some("R1"));
        assert_eq!(kv.get("username").unwrap().as_deref(), Some("rep1"));
        assert_eq!(kv.get("refreshToken").unwrap(), None);
    }

    #[test]
    fn refresh_overwrites_only_access_token() {
        let (_, creds) = store();
        creds
            .save_login("rep1", &Credentials::new("A1", "R1"))
            .unwrap();
        creds
            .set_access_token(&Secret::new("A2".to_string()))
            .unwrap();

        let current = creds.credentials().unwrap().unwrap();
        assert_eq!(current.access_token.expose_secret(), "A2");
        assert_eq!(current.refresh_token.expose_secret(), "R1");
    }

    #[test]
    fn clear_keeps_unrelated_entries() {
        let (kv, creds) = store();
        kv.set("cache.invoices", "[]").unwrap();
        creds
            .save_login("rep1", &Credentials::new("A1", "R1"))
            .unwrap();

        creds.clear().unwrap();
        assert!(creds.credentials().unwrap().is_none());
        assert!(creds.username().unwrap().is_none());
        assert_eq!(kv.keys().unwrap(), vec!["cache.invoices"]);
    }

    #[test]
    fn partial_session_is_not_credentials() {
        let (kv, creds) = store();
        kv.set("token", "A1").unwrap();
        assert!(creds.access_token().unwrap().is_some());
        assert!(creds.credentials().unwrap().is_none());
    }
}
