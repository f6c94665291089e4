//! # Wire models for notes, bookmarks and users
//!
//! The types in this module mirror the JSON the backend speaks. Field names are
//! camelCase on the wire and the server-assigned identifier arrives as `_id`
//! (plain `id` is accepted too).
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`Note`] | A stored note. `content` is required, `title` is optional. |
//! | [`Bookmark`] | A stored bookmark. `url` is required, `title` and `description` are optional. |
//! | [`NoteDraft`] / [`BookmarkDraft`] | Raw form input, tags still a single comma-separated string. |
//! | [`NotePayload`] / [`BookmarkPayload`] | Validated, trimmed write bodies with normalized tags. |
//! | [`UserInfo`] | The identity returned next to a token on login or registration. |
//!
//! Drafts only become payloads through [`crate::Resource::validate`], so nothing
//! with an empty required field or un-normalized tags ever leaves the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Split a comma-separated tag input into trimmed, non-empty tags.
///
/// Case is preserved and order is kept.
pub fn normalize_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// A note as returned by `GET /notes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Note {
    /// Title or the empty string.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

/// Note form input before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    /// Comma-separated tags, e.g. `"work, ideas"`.
    pub tags: String,
    pub is_favorite: bool,
}

impl From<&Note> for NoteDraft {
    fn from(note: &Note) -> Self {
        Self {
            title: note.title().to_string(),
            content: note.content.clone(),
            tags: note.tags.join(", "),
            is_favorite: note.is_favorite,
        }
    }
}

impl NoteDraft {
    pub fn validate(&self) -> Result<NotePayload, ValidationError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(ValidationError::MissingField("Content"));
        }
        Ok(NotePayload {
            title: self.title.trim().to_string(),
            content: content.to_string(),
            tags: normalize_tags(&self.tags),
            is_favorite: self.is_favorite,
        })
    }
}

/// Body of `POST /notes` and `PUT /notes/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePayload {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
}

/// A bookmark as returned by `GET /bookmarks`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Bookmark {
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }

    /// Hostname without a leading `www.`, or the raw url if it does not parse.
    pub fn domain(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|parsed| {
                parsed
                    .host_str()
                    .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
            })
            .unwrap_or_else(|| self.url.clone())
    }

    /// `{origin}/favicon.ico` for urls with a host.
    pub fn favicon_url(&self) -> Option<String> {
        let parsed = url::Url::parse(&self.url).ok()?;
        let origin = parsed.origin();
        if !origin.is_tuple() {
            return None;
        }
        Some(format!("{}/favicon.ico", origin.ascii_serialization()))
    }

    /// Full current fields with the favorite flag inverted.
    pub(crate) fn toggled_payload(&self) -> BookmarkPayload {
        BookmarkPayload {
            title: self.title().to_string(),
            url: self.url.clone(),
            description: self.description().to_string(),
            tags: clean_tags(&self.tags),
            is_favorite: !self.is_favorite,
        }
    }
}

/// Bookmark form input before validation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookmarkDraft {
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: String,
    pub is_favorite: bool,
}

impl From<&Bookmark> for BookmarkDraft {
    fn from(bookmark: &Bookmark) -> Self {
        Self {
            title: bookmark.title().to_string(),
            url: bookmark.url.clone(),
            description: bookmark.description().to_string(),
            tags: bookmark.tags.join(", "),
            is_favorite: bookmark.is_favorite,
        }
    }
}

impl BookmarkDraft {
    pub fn validate(&self) -> Result<BookmarkPayload, ValidationError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ValidationError::MissingField("URL"));
        }
        if url::Url::parse(url).is_err() {
            return Err(ValidationError::InvalidUrl(url.to_string()));
        }
        Ok(BookmarkPayload {
            title: self.title.trim().to_string(),
            url: url.to_string(),
            description: self.description.trim().to_string(),
            tags: normalize_tags(&self.tags),
            is_favorite: self.is_favorite,
        })
    }
}

/// Body of `POST /bookmarks` and `PUT /bookmarks/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkPayload {
    pub title: String,
    pub url: String,
    pub description: String,
    pub tags: Vec<String>,
    pub is_favorite: bool,
}

/// Identity of the logged-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    #[serde(alias = "_id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl UserInfo {
    /// Get display name, falling back to the username.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags() {
        assert_eq!(
            normalize_tags(" Work, ideas ,, ,Rust"),
            vec!["Work".to_string(), "ideas".to_string(), "Rust".to_string()]
        );
        assert!(normalize_tags("").is_empty());
        assert!(normalize_tags(" , ,").is_empty());
    }

    #[test]
    fn test_note_from_wire() {
        let json = r#"{
            "_id": "65f1",
            "title": "Groceries",
            "content": "milk",
            "tags": ["home"],
            "isFavorite": true,
            "createdAt": "2024-03-01T10:00:00.000Z",
            "updatedAt": "2024-03-02T10:00:00Z"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, "65f1");
        assert_eq!(note.title(), "Groceries");
        assert!(note.is_favorite);
        assert!(note.created_at.is_some());
        assert!(note.updated_at.unwrap() > note.created_at.unwrap());
    }

    #[test]
    fn test_note_missing_optional_fields() {
        let note: Note = serde_json::from_str(r#"{"id": "1", "content": "x"}"#).unwrap();
        assert_eq!(note.title(), "");
        assert!(note.tags.is_empty());
        assert!(!note.is_favorite);
        assert!(note.updated_at.is_none());
    }

    #[test]
    fn test_note_draft_requires_content() {
        let draft = NoteDraft {
            title: "Title only".into(),
            content: "   ".into(),
            ..Default::default()
        };
        assert_eq!(
            draft.validate(),
            Err(ValidationError::MissingField("Content"))
        );
    }

    #[test]
    fn test_note_draft_payload_is_trimmed() {
        let draft = NoteDraft {
            title: "  Plan ".into(),
            content: " ship it \n".into(),
            tags: "a, ,b".into(),
            is_favorite: true,
        };
        let payload = draft.validate().unwrap();
        assert_eq!(payload.title, "Plan");
        assert_eq!(payload.content, "ship it");
        assert_eq!(payload.tags, vec!["a", "b"]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["isFavorite"], true);
    }

    #[test]
    fn test_bookmark_draft_url_checks() {
        let mut draft = BookmarkDraft::default();
        assert_eq!(draft.validate(), Err(ValidationError::MissingField("URL")));

        draft.url = "not-a-url".into();
        assert_eq!(
            draft.validate(),
            Err(ValidationError::InvalidUrl("not-a-url".into()))
        );

        draft.url = " https://example.com ".into();
        assert_eq!(draft.validate().unwrap().url, "https://example.com");
    }

    #[test]
    fn test_draft_from_existing() {
        let note = Note {
            id: "n1".into(),
            title: None,
            content: "body".into(),
            tags: vec!["a".into(), "b".into()],
            is_favorite: true,
            created_at: None,
            updated_at: None,
        };
        let draft = NoteDraft::from(&note);
        assert_eq!(draft.title, "");
        assert_eq!(draft.tags, "a, b");
        assert!(draft.is_favorite);
    }

    #[test]
    fn test_bookmark_domain_and_favicon() {
        let mut bookmark: Bookmark =
            serde_json::from_str(r#"{"_id": "b1", "url": "https://www.rust-lang.org/learn"}"#)
                .unwrap();
        assert_eq!(bookmark.domain(), "rust-lang.org");
        assert_eq!(
            bookmark.favicon_url().as_deref(),
            Some("https://www.rust-lang.org/favicon.ico")
        );

        bookmark.url = "garbage".into();
        assert_eq!(bookmark.domain(), "garbage");
        assert!(bookmark.favicon_url().is_none());
    }

    #[test]
    fn test_user_display_name() {
        let user: UserInfo =
            serde_json::from_str(r#"{"_id": "u1", "username": "ada"}"#).unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(user.display_name(), "ada");
    }
}
