//! The [`Resource`] trait ties a wire model to its REST collection, its form
//! draft and its validated write body, so one generic store can serve both
//! notes and bookmarks.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ValidationError;
use crate::models::{Bookmark, BookmarkDraft, BookmarkPayload, Note, NoteDraft, NotePayload};

/// The two collections the backend exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Note,
    Bookmark,
}

impl ResourceKind {
    /// Collection path relative to the API base, e.g. `"notes"`.
    pub fn collection_path(self) -> &'static str {
        match self {
            Self::Note => "notes",
            Self::Bookmark => "bookmarks",
        }
    }

    /// Lower-case singular label for messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Bookmark => "bookmark",
        }
    }

    /// Capitalized singular label, e.g. `"Note"`.
    pub fn title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Bookmark => "Bookmark",
        }
    }
}

/// How a resource flips its favorite flag on the server.
#[derive(Clone, Debug, PartialEq)]
pub enum FavoriteChange<P> {
    /// `PATCH {collection}/{id}/favorite` with `{ "isFavorite": value }`.
    Flag(bool),
    /// `PUT {collection}/{id}` with the full current fields.
    Replace(P),
}

pub trait Resource: Clone + Debug + Send + Sync + DeserializeOwned + 'static {
    type Draft: Send + Sync;
    type Payload: Serialize + Clone + Debug + Send + Sync;

    const KIND: ResourceKind;

    fn id(&self) -> &str;
    fn is_favorite(&self) -> bool;
    fn tags(&self) -> &[String];

    /// Text fields matched by free-text search.
    fn search_fields(&self) -> Vec<&str>;

    fn validate(draft: &Self::Draft) -> Result<Self::Payload, ValidationError>;

    /// Request that inverts this resource's favorite flag.
    fn favorite_change(&self) -> FavoriteChange<Self::Payload>;
}

impl Resource for Note {
    type Draft = NoteDraft;
    type Payload = NotePayload;

    const KIND: ResourceKind = ResourceKind::Note;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title(), self.content.as_str()]
    }

    fn validate(draft: &NoteDraft) -> Result<NotePayload, ValidationError> {
        draft.validate()
    }

    fn favorite_change(&self) -> FavoriteChange<NotePayload> {
        FavoriteChange::Flag(!self.is_favorite)
    }
}

impl Resource for Bookmark {
    type Draft = BookmarkDraft;
    type Payload = BookmarkPayload;

    const KIND: ResourceKind = ResourceKind::Bookmark;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_favorite(&self) -> bool {
        self.is_favorite
    }

    fn tags(&self) -> &[String] {
        &self.tags
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.title(), self.url.as_str(), self.description()]
    }

    fn validate(draft: &BookmarkDraft) -> Result<BookmarkPayload, ValidationError> {
        draft.validate()
    }

    fn favorite_change(&self) -> FavoriteChange<BookmarkPayload> {
        FavoriteChange::Replace(self.toggled_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(is_favorite: bool) -> Bookmark {
        Bookmark {
            id: "b1".into(),
            title: Some("Docs".into()),
            url: "https://docs.rs".into(),
            description: None,
            tags: vec![" rust ".into(), "".into()],
            is_favorite,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_note_favorite_is_a_flag() {
        let note: Note = serde_json::from_str(r#"{"_id": "n1", "content": "c"}"#).unwrap();
        assert_eq!(note.favorite_change(), FavoriteChange::Flag(true));
    }

    #[test]
    fn test_bookmark_favorite_replaces_full_fields() {
        let FavoriteChange::Replace(payload) = bookmark(true).favorite_change() else {
            panic!("bookmarks replace the whole record");
        };
        assert!(!payload.is_favorite);
        assert_eq!(payload.url, "https://docs.rs");
        assert_eq!(payload.title, "Docs");
        assert_eq!(payload.description, "");
        assert_eq!(payload.tags, vec!["rust"]);
    }

    #[test]
    fn test_search_fields() {
        assert_eq!(bookmark(false).search_fields(), vec!["Docs", "https://docs.rs", ""]);
        assert_eq!(ResourceKind::Bookmark.collection_path(), "bookmarks");
    }
}
