//! Read claims from a JWT without verifying it. Display use only.

use {
    base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD},
    serde::Deserialize,
};

#[derive(Deserialize)]
struct Claims {
    exp: Option<u64>,
}

/// The `exp` claim (seconds since the Unix epoch), if the token carries one.
pub fn expires_at(token: &str) -> Option<u64> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice::<Claims>(&bytes).ok()?.exp
}

/// Human readable validity, e.g. `valid (0h 12m remaining)` or `expired`.
pub fn describe_expiry(token: &str, now: u64) -> String {
    match expires_at(token) {
        None => "unknown".to_string(),
        Some(exp) if exp > now => {
            let remaining = exp - now;
            let hours = remaining / 3600;
            let mins = (remaining % 3600) / 60;
            format!("valid ({hours}h {mins}m remaining)")
        },
        Some(_) => "expired".to_string(),
    }
}
