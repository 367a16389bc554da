//! Repository for the `users` table.
//!
//! The directory owns user lifecycle; this repository only reads.

use sqlx::PgPool;

use salescore_core::types::DbId;

use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, company_id, username, email, display_name, password_hash, \
                        role, is_active, created_at, updated_at";

/// Read-only access to directory users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Active users in one company holding any of the given role names.
    pub async fn list_by_company_and_roles(
        pool: &PgPool,
        company_id: DbId,
        roles: &[String],
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE company_id = $1 AND role = ANY($2) AND is_active
             ORDER BY display_name"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(company_id)
            .bind(roles)
            .fetch_all(pool)
            .await
    }

    /// Active users across all companies holding any of the given role
    /// names. Super-admin scope only.
    pub async fn list_by_roles(
        pool: &PgPool,
        roles: &[String],
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             WHERE role = ANY($1) AND is_active
             ORDER BY company_id, display_name"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(roles)
            .fetch_all(pool)
            .await
    }
}
