pub mod error;
pub mod models;
pub mod resource;
pub mod session;

mod file_store;
mod memory;
pub use file_store::FileStore;
pub use memory::MemoryStore;

pub use error::ValidationError;
pub use models::{
    normalize_tags, Bookmark, BookmarkDraft, BookmarkPayload, Note, NoteDraft, NotePayload,
    UserInfo,
};
pub use resource::{FavoriteChange, Resource, ResourceKind};
pub use session::{SessionStorage, SESSION_TOKEN_KEY, SESSION_USER_KEY};
