//! Postgres-backed directory gateway.
//!
//! Translates directory rows into core types. Storage-level naming stays
//! in this file: the rest of the system never sees column or relation
//! names, so a directory schema rename is isolated here.

use async_trait::async_trait;

use salescore_core::directory::{DirectoryGateway, Subject, TeamRef};
use salescore_core::error::CoreError;
use salescore_core::roles::Role;
use salescore_core::scope::CompanyScope;
use salescore_core::types::DbId;

use crate::models::team::Team;
use crate::models::user::User;
use crate::repositories::{TeamRepo, UserRepo};
use crate::{map_db_error, DbPool};

/// Directory reads over the shared connection pool.
#[derive(Clone)]
pub struct PgDirectoryGateway {
    pool: DbPool,
}

impl PgDirectoryGateway {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn to_subject(user: User) -> Result<Subject, CoreError> {
    Ok(Subject {
        id: user.id,
        display_name: user.display_name,
        role: user.role.parse()?,
        company_id: user.company_id,
        is_active: user.is_active,
    })
}

fn to_team_ref(team: Team) -> TeamRef {
    TeamRef {
        id: team.id,
        name: team.name,
    }
}

#[async_trait]
impl DirectoryGateway for PgDirectoryGateway {
    async fn get_subject(&self, user_id: DbId) -> Result<Option<Subject>, CoreError> {
        UserRepo::find_by_id(&self.pool, user_id)
            .await
            .map_err(map_db_error)?
            .map(to_subject)
            .transpose()
    }

    async fn teams_of(&self, user_id: DbId) -> Result<Vec<TeamRef>, CoreError> {
        Ok(TeamRepo::teams_of(&self.pool, user_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(to_team_ref)
            .collect())
    }

    async fn teams_managed_by(&self, user_id: DbId) -> Result<Vec<TeamRef>, CoreError> {
        Ok(TeamRepo::teams_managed_by(&self.pool, user_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(to_team_ref)
            .collect())
    }

    async fn team_members(&self, team_id: DbId) -> Result<Vec<Subject>, CoreError> {
        TeamRepo::members(&self.pool, team_id)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(to_subject)
            .collect()
    }

    async fn members_in_scope(
        &self,
        scope: CompanyScope,
        roles: &[Role],
    ) -> Result<Vec<Subject>, CoreError> {
        let role_names: Vec<String> = roles.iter().map(|r| r.as_str().to_string()).collect();
        let users = match scope {
            CompanyScope::Company(company_id) => {
                UserRepo::list_by_company_and_roles(&self.pool, company_id, &role_names).await
            }
            CompanyScope::All => UserRepo::list_by_roles(&self.pool, &role_names).await,
        }
        .map_err(map_db_error)?;
        users.into_iter().map(to_subject).collect()
    }
}
