//! API client for the notekeep REST service.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests against the auth and notes endpoints. Authentication is a JWT
//! bearer token set from the active session; requests made without a token
//! simply carry no Authorization header and let the backend answer 401.

use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::models::{
    LoginCredentials, Note, NoteDraft, PasswordChange, ProfileUpdate, RegisterCredentials, User,
};

use super::error::ApiError;
use super::response::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Successful auth payload: the `data` half of a login/register envelope.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: User,
    token: String,
}

/// Normalized result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthSuccess {
    pub user: User,
    pub token: String,
    pub message: Option<String>,
}

/// API client for the notekeep service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    /// (e.g. `http://localhost:5000/api/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token; subsequent requests go out unauthenticated
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    // ===== Auth Gateway =====

    /// Register a new account. On success the backend also issues a token,
    /// so registration doubles as a login.
    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<AuthSuccess, ApiError> {
        let envelope: Envelope<AuthPayload> =
            self.request(Method::POST, "/auth/register", Some(credentials)).await?;
        Self::unwrap_auth(envelope)
    }

    /// Exchange credentials for a `{user, token}` pair
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<AuthSuccess, ApiError> {
        let envelope: Envelope<AuthPayload> =
            self.request(Method::POST, "/auth/login", Some(credentials)).await?;
        Self::unwrap_auth(envelope)
    }

    /// Fetch the authenticated user's profile
    pub async fn profile(&self) -> Result<User, ApiError> {
        let envelope: Envelope<User> =
            self.request::<User, ()>(Method::GET, "/auth/profile", None).await?;
        envelope.into_content("the user profile")
    }

    /// Update the authenticated user's profile, returning the updated user
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let envelope: Envelope<User> =
            self.request(Method::PUT, "/auth/profile", Some(update)).await?;
        envelope.into_content("the updated profile")
    }

    /// Change the account password
    pub async fn change_password(&self, change: &PasswordChange) -> Result<String, ApiError> {
        // Message-only endpoints may or may not echo a payload; Value
        // accepts either without constraining the shape.
        let envelope: Envelope<serde_json::Value> =
            self.request(Method::PUT, "/auth/change-password", Some(change)).await?;
        envelope.into_message("Password updated")
    }

    // ===== Note Resource Client =====

    /// Fetch all notes for the authenticated user. A successful envelope
    /// with no collection means the user has no notes yet.
    pub async fn list_notes(&self) -> Result<Vec<Note>, ApiError> {
        let envelope: Envelope<Vec<Note>> =
            self.request::<Vec<Note>, ()>(Method::GET, "/allNotes", None).await?;
        Ok(envelope.into_optional_content()?.unwrap_or_default())
    }

    /// Create a note, returning the backend's confirmation message
    pub async fn create_note(&self, draft: &NoteDraft) -> Result<String, ApiError> {
        let envelope: Envelope<serde_json::Value> =
            self.request(Method::POST, "/addNote", Some(draft)).await?;
        envelope.into_message("Note saved")
    }

    /// Fetch a single note by id
    pub async fn note_details(&self, id: &str) -> Result<Note, ApiError> {
        let path = format!("/noteDetails/{}", id);
        let envelope: Envelope<Note> = self.request::<Note, ()>(Method::GET, &path, None).await?;
        envelope.into_content("the note")
    }

    /// Update a note by id, returning the backend's confirmation message
    pub async fn update_note(&self, id: &str, draft: &NoteDraft) -> Result<String, ApiError> {
        let path = format!("/updateNote/{}", id);
        let envelope: Envelope<serde_json::Value> =
            self.request(Method::PATCH, &path, Some(draft)).await?;
        envelope.into_message("Note updated")
    }

    /// Delete a note by id, returning the backend's confirmation message
    pub async fn delete_note(&self, id: &str) -> Result<String, ApiError> {
        let path = format!("/deleteNote/{}", id);
        let envelope: Envelope<serde_json::Value> =
            self.request::<serde_json::Value, ()>(Method::DELETE, &path, None).await?;
        envelope.into_message("Note deleted")
    }

    // ===== Request plumbing =====

    fn unwrap_auth(envelope: Envelope<AuthPayload>) -> Result<AuthSuccess, ApiError> {
        let message = envelope.message.clone();
        let payload = envelope.into_content("user and token")?;
        Ok(AuthSuccess {
            user: payload.user,
            token: payload.token,
            message,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers for the outgoing request. Carries `Authorization: Bearer`
    /// only when a token is set; with no session there is no auth header
    /// at all.
    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| {
                    ApiError::InvalidResponse("Bearer token is not a valid header value".to_string())
                })?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Issue one request and parse the response envelope. Failures are
    /// terminal - there is no retry at this layer or any other.
    async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(path);
        let mut builder = self
            .client
            .request(method.clone(), &url)
            .headers(self.auth_headers()?);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(%method, url = %url, status = %status, "API response received");

        if !status.is_success() {
            return Err(ApiError::from_status(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_token_means_no_authorization_header() {
        let client = ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        let headers = client.auth_headers().expect("Failed to build headers");
        assert!(headers.get(header::AUTHORIZATION).is_none());
        assert!(headers.is_empty());
    }

    #[test]
    fn test_token_becomes_bearer_header() {
        let mut client = ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        client.set_token("abc.def.ghi".to_string());
        let headers = client.auth_headers().expect("Failed to build headers");
        assert_eq!(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer abc.def.ghi")
        );
    }

    #[test]
    fn test_clear_token_removes_header() {
        let mut client = ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        client.set_token("abc.def.ghi".to_string());
        client.clear_token();
        let headers = client.auth_headers().expect("Failed to build headers");
        assert!(headers.get(header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_with_token_leaves_original_untouched() {
        let client = ApiClient::new("http://localhost:5000/api/v1").expect("Failed to build client");
        let authed = client.with_token("abc.def.ghi".to_string());
        assert!(client.auth_headers().unwrap().is_empty());
        assert!(!authed.auth_headers().unwrap().is_empty());
    }

    #[test]
    fn test_endpoint_joining_tolerates_trailing_slash() {
        let client = ApiClient::new("http://localhost:5000/api/v1/").expect("Failed to build client");
        assert_eq!(
            client.endpoint("/noteDetails/abc123"),
            "http://localhost:5000/api/v1/noteDetails/abc123"
        );
    }
}
