//! Team and membership models.

use sqlx::FromRow;

use salescore_core::types::{DbId, Timestamp};

/// A team row from the `teams` table.
#[derive(Debug, Clone, FromRow)]
pub struct Team {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    /// At most one manager per team.
    pub manager_id: Option<DbId>,
    pub created_at: Timestamp,
}
