//! Request and response bodies for the authentication endpoints.

use serde::{Deserialize, Serialize};
use store::UserInfo;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Successful login or registration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserInfo,
}
