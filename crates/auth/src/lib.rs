pub mod credentials;
pub mod jwt;
pub mod store;
pub mod types;

pub use {
    credentials::{ACCESS_TOKEN_KEY, CredentialStore, REFRESH_TOKEN_KEY, USERNAME_KEY},
    store::{FileStore, KeyValueStore, MemoryStore},
    types::{
        Credentials, ErrorBody, LoginRequest, RefreshRequest, RefreshResponse, TOKEN_NOT_VALID,
        TokenPair, bearer,
    },
};
