//! Stateless inspection of bearer tokens.
//!
//! The service issues JWTs in the compact `header.payload.signature` form.
//! The client holds no key material, so the signature is never verified;
//! the only check available client-side is whether the `exp` claim is still
//! in the future. Callers decide what to do with an invalid result
//! (typically: log out).

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// The subset of JWT claims the client reads.
#[derive(Debug, Deserialize)]
struct Claims {
    /// Expiry (seconds since epoch)
    exp: i64,
}

/// Decode the expiry claim of a compact JWT.
///
/// Returns `None` for anything that is not a well-formed three-segment
/// token with a base64url payload containing a numeric `exp` claim.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let _header = segments.next()?;
    let payload = segments.next()?;
    if segments.next().is_none() || payload.is_empty() {
        return None;
    }

    // Tolerate encoders that emit padded base64url.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    Utc.timestamp_opt(claims.exp, 0).single()
}

/// Whether the token's expiry claim is in the future right now.
pub fn is_valid_now(token: &str) -> bool {
    match expires_at(token) {
        Some(expiry) => expiry > Utc::now(),
        None => false,
    }
}
