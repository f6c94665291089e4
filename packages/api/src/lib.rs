//! # API crate: typed client for the notes & bookmarks REST backend
//!
//! Every request the application makes goes through [`ApiClient`]. Responses are
//! classified exactly once, at the network boundary, into the closed
//! [`ApiError`] set; callers branch on [`ApiError::kind`] and never inspect
//! status codes themselves.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`auth`] | Login / registration request and response bodies |
//! | [`client`] | [`ApiClient`]: URL building, header material, send + classify + decode |
//! | [`error`] | [`ApiError`], [`ErrorKind`] and user-facing messages |
//! | [`retry`] | [`RetryPolicy`]: bounded exponential backoff on rate limiting |
//!
//! ## Endpoints
//!
//! | Operation | Method & path |
//! |-----------|---------------|
//! | Login / register | `POST auth/login`, `POST auth/register` |
//! | List | `GET notes`, `GET bookmarks` |
//! | Create | `POST notes`, `POST bookmarks` |
//! | Update | `PUT notes/{id}`, `PUT bookmarks/{id}` |
//! | Favorite flag | `PATCH notes/{id}/favorite` |
//! | Delete | `DELETE notes/{id}`, `DELETE bookmarks/{id}` |

pub mod auth;
pub mod client;
pub mod error;
pub mod retry;

pub use auth::{AuthResponse, LoginRequest, RegisterRequest};
pub use client::{request_headers, ApiClient};
pub use error::{ApiError, ApiResult, ErrorKind, RATE_LIMITED_MESSAGE};
pub use reqwest::header::HeaderMap;
pub use retry::RetryPolicy;
pub use store::UserInfo;
