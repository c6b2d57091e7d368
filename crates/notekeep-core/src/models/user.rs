use serde::{Deserialize, Serialize};

/// The authenticated user's identity as returned by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    pub email: String,
}

/// Login request body.
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Registration request body. The confirmation field exists only for
/// client-side validation and is never sent to the backend.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing)]
    pub confirm_password: String,
}

/// Profile update request body. Only the provided fields are sent.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Password change request body (camelCase on the wire).
#[derive(Debug, Clone, Serialize)]
pub struct PasswordChange {
    #[serde(rename = "currentPassword")]
    pub current_password: String,
    #[serde(rename = "newPassword")]
    pub new_password: String,
}

impl User {
    /// Display label for prompts and headers.
    pub fn display_name(&self) -> &str {
        if !self.username.is_empty() {
            &self.username
        } else {
            &self.email
        }
    }
}
