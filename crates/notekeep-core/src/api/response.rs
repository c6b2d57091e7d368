use serde::Deserialize;

use super::error::{ApiError, GENERIC_FAILURE_MESSAGE};

/// The backend's response envelope: `{ success, content?|data?, message|msg? }`.
///
/// The payload key is spelled `content` by the notes endpoints and `data`
/// by the auth endpoints; the human-readable message is `msg` on some
/// routes and `message` on others. Serde aliases absorb both spellings so
/// nothing downstream ever guesses at the shape.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, alias = "data")]
    pub content: Option<T>,
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Reject `success: false` bodies that arrived with a 2xx status.
    fn ensure_success(&self) -> Result<(), ApiError> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                message: self
                    .message
                    .clone()
                    .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string()),
                fields: Default::default(),
            })
        }
    }

    /// Unwrap the payload, treating an absent one as a malformed response.
    /// `what` names the expected payload for the error message.
    pub fn into_content(self, what: &str) -> Result<T, ApiError> {
        self.ensure_success()?;
        self.content
            .ok_or_else(|| ApiError::InvalidResponse(format!("Response is missing {}", what)))
    }

    /// Unwrap the payload where the backend legitimately omits it
    /// (an empty collection, for instance).
    pub fn into_optional_content(self) -> Result<Option<T>, ApiError> {
        self.ensure_success()?;
        Ok(self.content)
    }

    /// Unwrap the confirmation message, falling back to `fallback` when the
    /// backend sends none.
    pub fn into_message(self, fallback: &str) -> Result<String, ApiError> {
        self.ensure_success()?;
        Ok(self.message.unwrap_or_else(|| fallback.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i64,
    }

    #[test]
    fn test_content_key_parses() {
        let envelope: Envelope<Payload> =
            serde_json::from_str(r#"{"success":true,"content":{"value":7},"msg":"ok"}"#)
                .expect("Failed to parse envelope");
        assert_eq!(envelope.into_content("payload").unwrap(), Payload { value: 7 });
    }

    #[test]
    fn test_data_key_parses_identically() {
        let envelope: Envelope<Payload> =
            serde_json::from_str(r#"{"success":true,"data":{"value":7},"message":"ok"}"#)
                .expect("Failed to parse envelope");
        assert_eq!(envelope.into_content("payload").unwrap(), Payload { value: 7 });
    }

    #[test]
    fn test_msg_and_message_normalize() {
        let with_msg: Envelope<Payload> =
            serde_json::from_str(r#"{"success":true,"msg":"Note added"}"#).unwrap();
        assert_eq!(with_msg.into_message("fallback").unwrap(), "Note added");

        let with_message: Envelope<Payload> =
            serde_json::from_str(r#"{"success":true,"message":"Note added"}"#).unwrap();
        assert_eq!(with_message.into_message("fallback").unwrap(), "Note added");
    }

    #[test]
    fn test_missing_message_uses_fallback() {
        let envelope: Envelope<Payload> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(envelope.into_message("Saved").unwrap(), "Saved");
    }

    #[test]
    fn test_success_false_is_rejected_even_with_2xx_status() {
        let envelope: Envelope<Payload> =
            serde_json::from_str(r#"{"success":false,"message":"Nope"}"#).unwrap();
        match envelope.into_content("payload") {
            Err(ApiError::Rejected { message, .. }) => assert_eq!(message, "Nope"),
            other => panic!("Expected Rejected, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_content_is_invalid_response() {
        let envelope: Envelope<Payload> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        match envelope.into_content("the note") {
            Err(ApiError::InvalidResponse(message)) => assert!(message.contains("the note")),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_content_allows_absence() {
        let envelope: Envelope<Vec<Payload>> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(envelope.into_optional_content().unwrap(), None);
    }
}
