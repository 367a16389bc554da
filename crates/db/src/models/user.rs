//! Directory user model.

use sqlx::FromRow;

use salescore_core::types::{DbId, Timestamp};

/// A user row from the `users` table. `role` is the snake_case name from
/// `salescore_core::roles::Role`; parsing is the caller's concern so a bad
/// row surfaces as a validation error, not a decode panic.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub company_id: DbId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
