//! Models that represent users, authentication payloads, and channel views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::policy::Owned;
use crate::types::UserId;

#[derive(Debug, Clone, FromRow)]
/// Database representation of a user account, secrets included.
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Lower-cased handle, unique across accounts.
    pub user_name: String,
    /// Unique contact address, also accepted at login.
    pub email: String,
    /// Display name.
    pub full_name: String,
    /// Argon2 hash of the user's password.
    pub password_hash: String,
    /// Public URL of the avatar image.
    pub avatar_url: String,
    /// Media store handle for the avatar, used when it is replaced.
    pub avatar_public_id: String,
    /// Public URL of the optional cover image.
    pub cover_image_url: Option<String>,
    /// Media store handle for the cover image.
    pub cover_image_public_id: Option<String>,
    /// SHA-256 digest of the single currently valid refresh token.
    pub refresh_token_hash: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Owned for User {
    fn owner_id(&self) -> UserId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Identity attached to authenticated requests and returned by the API.
///
/// Carries no password or refresh-token material.
pub struct AuthUser {
    pub id: UserId,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            user_name: user.user_name,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar_url,
            cover_image: user.cover_image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone)]
/// Validated registration input with uploaded media already stored.
pub struct NewUser {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub avatar_public_id: String,
    pub cover_image_url: Option<String>,
    pub cover_image_public_id: Option<String>,
}

#[derive(Debug, Validate)]
/// Text fields of the multipart registration form.
pub struct RegisterFields {
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(custom(function = "crate::validation::validate_user_name"))]
    pub user_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Credentials submitted at login. Either handle or email identifies the account.
pub struct LoginRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Body form of the refresh call; the cookie wins when both are present.
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub old_password: String,
    #[validate(length(min = 8, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 100))]
    pub full_name: Option<String>,
    #[validate(custom(function = "crate::validation::validate_user_name"))]
    pub user_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: AuthUser,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Public projection of another user, embedded in videos and comments.
pub struct OwnerSummary {
    #[sqlx(rename = "owner_id")]
    pub id: UserId,
    #[sqlx(rename = "owner_user_name")]
    pub user_name: String,
    #[sqlx(rename = "owner_full_name")]
    pub full_name: String,
    #[sqlx(rename = "owner_avatar")]
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
/// Channel page for a user, seen from the caller's perspective.
pub struct ChannelProfile {
    pub id: UserId,
    pub user_name: String,
    pub full_name: String,
    pub email: String,
    pub avatar: String,
    pub cover_image: Option<String>,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}
