//! Filtered and sorted views over a collection snapshot.
//!
//! Everything here is a pure function of `(items, criteria)`; callers may
//! re-project on every render.

use std::cmp::Ordering;

use chrono::{DateTime, TimeZone, Utc};
use store::{Bookmark, Note, Resource};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCriteria {
    /// Case-insensitive substring over the resource's text fields.
    pub search: String,
    /// Comma-separated tag terms; any term contained in any tag matches.
    pub tags: String,
    pub favorites_only: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Updated,
    Created,
    Title,
    Favorite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteSort {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl NoteSort {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }
}

/// Resources matching every active criterion, in collection order.
pub fn filter<'a, R: Resource>(items: &'a [R], criteria: &ViewCriteria) -> Vec<&'a R> {
    let needle = criteria.search.to_lowercase();
    let terms = tag_terms(&criteria.tags);

    items
        .iter()
        .filter(|item| !criteria.favorites_only || item.is_favorite())
        .filter(|item| {
            needle.is_empty()
                || item
                    .search_fields()
                    .iter()
                    .any(|field| field.to_lowercase().contains(&needle))
        })
        .filter(|item| {
            terms.is_empty()
                || item.tags().iter().any(|tag| {
                    let tag = tag.to_lowercase();
                    terms.iter().any(|term| tag.contains(term.as_str()))
                })
        })
        .collect()
}

pub fn project_notes<'a>(
    notes: &'a [Note],
    criteria: &ViewCriteria,
    sort: NoteSort,
) -> Vec<&'a Note> {
    let mut view = filter(notes, criteria);
    view.sort_by(|a, b| {
        let ordering = compare_notes(a, b, sort.key);
        match sort.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
    view
}

/// Bookmarks keep the order the server returned them in.
pub fn project_bookmarks<'a>(
    bookmarks: &'a [Bookmark],
    criteria: &ViewCriteria,
) -> Vec<&'a Bookmark> {
    filter(bookmarks, criteria)
}

pub fn favorite_count<R: Resource>(items: &[R]) -> usize {
    items.iter().filter(|item| item.is_favorite()).count()
}

fn tag_terms(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

fn compare_notes(a: &Note, b: &Note, key: SortKey) -> Ordering {
    match key {
        SortKey::Title => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
        SortKey::Favorite => a.is_favorite.cmp(&b.is_favorite),
        SortKey::Created => created_stamp(a).cmp(&created_stamp(b)),
        SortKey::Updated => updated_stamp(a).cmp(&updated_stamp(b)),
    }
}

/// Sort position in time. Resources with no usable time order before
/// dated ones and among themselves by id.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Stamp<'a> {
    Id(&'a str),
    At(DateTime<Utc>),
}

fn created_stamp(note: &Note) -> Stamp<'_> {
    match note.created_at {
        Some(at) => Stamp::At(at),
        None => id_stamp(&note.id),
    }
}

fn updated_stamp(note: &Note) -> Stamp<'_> {
    match note.updated_at {
        Some(at) => Stamp::At(at),
        None => created_stamp(note),
    }
}

/// 24-hex-digit object ids lead with their creation time in seconds.
fn id_stamp(id: &str) -> Stamp<'_> {
    let seconds = (id.len() == 24 && id.bytes().all(|b| b.is_ascii_hexdigit()))
        .then(|| u32::from_str_radix(&id[..8], 16).ok())
        .flatten()
        .and_then(|secs| Utc.timestamp_opt(i64::from(secs), 0).single());
    match seconds {
        Some(at) => Stamp::At(at),
        None => Stamp::Id(id),
    }
}
