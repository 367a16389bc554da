//! Read-only directory seam.
//!
//! Users, teams, and regions are owned by an external directory service;
//! the core only reads them through [`DirectoryGateway`]. Storage-level
//! naming (column conventions, legacy relation names) is isolated behind
//! this trait -- a rename in the directory schema never reaches the
//! authorizer or the pipeline.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::roles::Role;
use crate::scope::CompanyScope;
use crate::types::DbId;

/// An authenticated principal, immutable for the duration of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: DbId,
    pub role: Role,
    pub company_id: DbId,
    pub is_active: bool,
}

/// A directory user as seen by the authorizer: the person who may be
/// evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: DbId,
    pub display_name: String,
    pub role: Role,
    pub company_id: DbId,
    pub is_active: bool,
}

/// A team reference carried through eligibility results so callers can show
/// which team a pairing was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: DbId,
    pub name: String,
}

/// Read-only access to the user/team directory.
///
/// Implementations must reflect membership and role state at call time;
/// the core assumes no caching contract. Transient backend failures map to
/// [`CoreError::Unavailable`] -- the gateway has no retry policy of its own.
#[async_trait]
pub trait DirectoryGateway: Send + Sync {
    /// Look up one user by id. `Ok(None)` when no such user exists.
    async fn get_subject(&self, user_id: DbId) -> Result<Option<Subject>, CoreError>;

    /// Teams the user is a member of.
    async fn teams_of(&self, user_id: DbId) -> Result<Vec<TeamRef>, CoreError>;

    /// Teams the user manages (manager-of-team, not membership).
    async fn teams_managed_by(&self, user_id: DbId) -> Result<Vec<TeamRef>, CoreError>;

    /// All members of a team.
    async fn team_members(&self, team_id: DbId) -> Result<Vec<Subject>, CoreError>;

    /// All users within the scope holding one of the given roles.
    async fn members_in_scope(
        &self,
        scope: CompanyScope,
        roles: &[Role],
    ) -> Result<Vec<Subject>, CoreError>;
}
