//! Repository for the `teams` and `team_members` tables.

use sqlx::PgPool;

use salescore_core::types::DbId;

use crate::models::team::Team;
use crate::models::user::User;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, company_id, name, manager_id, created_at";

/// Read-only access to teams and memberships.
pub struct TeamRepo;

impl TeamRepo {
    /// Teams the user is a member of.
    pub async fn teams_of(pool: &PgPool, user_id: DbId) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT t.id, t.company_id, t.name, t.manager_id, t.created_at
             FROM teams t
             JOIN team_members tm ON tm.team_id = t.id
             WHERE tm.user_id = $1
             ORDER BY t.name",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Teams the user manages (manager-of-team, not membership).
    pub async fn teams_managed_by(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<Team>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM teams WHERE manager_id = $1 ORDER BY name"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// All members of a team.
    pub async fn members(pool: &PgPool, team_id: DbId) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.company_id, u.username, u.email, u.display_name,
                    u.password_hash, u.role, u.is_active, u.created_at, u.updated_at
             FROM users u
             JOIN team_members tm ON tm.user_id = u.id
             WHERE tm.team_id = $1
             ORDER BY u.display_name",
        )
        .bind(team_id)
        .fetch_all(pool)
        .await
    }
}
