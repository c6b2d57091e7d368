use serde::{Deserialize, Serialize};

/// A note as stored by the backend. The id is opaque to the client and is
/// serialized as `_id` on the wire (some endpoints spell it `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    pub details: String,
}

/// Client-authored payload for creating or updating a note. The backend
/// assigns and owns the id, so the draft never carries one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteDraft {
    pub title: String,
    pub details: String,
}

impl Note {
    /// One-line summary for list views: the title, falling back to the
    /// first line of the details when the title is blank.
    pub fn summary(&self) -> &str {
        let title = self.title.trim();
        if !title.is_empty() {
            title
        } else {
            self.details.lines().next().unwrap_or("").trim()
        }
    }

    pub fn draft(&self) -> NoteDraft {
        NoteDraft {
            title: self.title.clone(),
            details: self.details.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_parses_mongo_style_id() {
        let json = r#"{"_id":"665f1c2e9b1d4a0012ab34cd","title":"Groceries","details":"milk, eggs"}"#;
        let note: Note = serde_json::from_str(json).expect("Failed to parse note");
        assert_eq!(note.id, "665f1c2e9b1d4a0012ab34cd");
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.details, "milk, eggs");
    }

    #[test]
    fn test_note_parses_plain_id() {
        let json = r#"{"id":"abc123","title":"t","details":"d"}"#;
        let note: Note = serde_json::from_str(json).expect("Failed to parse note");
        assert_eq!(note.id, "abc123");
    }

    #[test]
    fn test_summary_falls_back_to_details() {
        let note = Note {
            id: "x".to_string(),
            title: "  ".to_string(),
            details: "first line\nsecond line".to_string(),
        };
        assert_eq!(note.summary(), "first line");
    }

    #[test]
    fn test_draft_omits_id() {
        let draft = NoteDraft {
            title: "t".to_string(),
            details: "d".to_string(),
        };
        let json = serde_json::to_value(&draft).expect("Failed to serialize draft");
        assert!(json.get("_id").is_none());
        assert!(json.get("id").is_none());
    }
}
