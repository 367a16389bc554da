//! Hierarchical authorization: who may evaluate whom.
//!
//! Both entry points -- the boolean check used by the submission pipeline
//! and the listing used by selection UIs -- are computed from the single
//! pure function [`eligible_subjects`] over a fetched
//! [`DirectorySnapshot`]. A listed subject therefore always passes the
//! check and vice versa; the two can not diverge.

use serde::{Deserialize, Serialize};

use crate::directory::{Actor, DirectoryGateway, Subject, TeamRef};
use crate::error::CoreError;
use crate::roles::{rule_for, RelationKind};
use crate::scope::CompanyScope;
use crate::types::DbId;

/// The directory data one authorization decision needs, fetched up front so
/// the decision itself is pure and synchronous.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    /// Teams the actor belongs to, each with its full member list.
    pub member_teams: Vec<(TeamRef, Vec<Subject>)>,
    /// Teams the actor manages, each with its full member list.
    pub managed_teams: Vec<(TeamRef, Vec<Subject>)>,
    /// Users in the resolved company scope holding an evaluable role.
    pub scope_members: Vec<Subject>,
}

impl DirectorySnapshot {
    /// Fetch the snapshot an authorization decision for `actor` needs.
    ///
    /// Only the relations the actor's rule actually uses are loaded; a
    /// sales lead never triggers the company-wide query.
    pub async fn fetch<G: DirectoryGateway + ?Sized>(
        gateway: &G,
        actor: &Actor,
        scope: CompanyScope,
    ) -> Result<Self, CoreError> {
        let Some(rule) = rule_for(actor.role) else {
            return Ok(Self::default());
        };

        let mut snapshot = Self::default();
        match rule.relation {
            RelationKind::SharedTeam => {
                for team in gateway.teams_of(actor.id).await? {
                    let members = gateway.team_members(team.id).await?;
                    snapshot.member_teams.push((team, members));
                }
            }
            RelationKind::ManagedTeam => {
                for team in gateway.teams_managed_by(actor.id).await? {
                    let members = gateway.team_members(team.id).await?;
                    snapshot.managed_teams.push((team, members));
                }
            }
            RelationKind::CompanyScope => {
                snapshot.scope_members = gateway.members_in_scope(scope, rule.subjects).await?;
            }
        }
        Ok(snapshot)
    }
}

/// A user the actor may evaluate, annotated with the team through which
/// eligibility was derived (absent for company-scope rules).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleSubject {
    pub subject: Subject,
    pub via_team: Option<TeamRef>,
}

/// The set of users `actor` may evaluate, given a snapshot.
///
/// Pure. Inactive subjects and the actor themselves are never eligible;
/// subjects outside `scope` are filtered even if the directory returned
/// them. A subject reachable through several teams appears once, annotated
/// with the first team that qualified it.
pub fn eligible_subjects(
    actor: &Actor,
    scope: CompanyScope,
    snapshot: &DirectorySnapshot,
) -> Vec<EligibleSubject> {
    let Some(rule) = rule_for(actor.role) else {
        return Vec::new();
    };
    if !actor.is_active {
        return Vec::new();
    }

    let qualifies = |s: &Subject| {
        s.id != actor.id
            && s.is_active
            && rule.subjects.contains(&s.role)
            && scope.covers(s.company_id)
    };

    let mut out: Vec<EligibleSubject> = Vec::new();
    let mut push = |subject: &Subject, via_team: Option<&TeamRef>| {
        if out.iter().any(|e| e.subject.id == subject.id) {
            return;
        }
        out.push(EligibleSubject {
            subject: subject.clone(),
            via_team: via_team.cloned(),
        });
    };

    match rule.relation {
        RelationKind::SharedTeam => {
            for (team, members) in &snapshot.member_teams {
                for member in members.iter().filter(|s| qualifies(s)) {
                    push(member, Some(team));
                }
            }
        }
        RelationKind::ManagedTeam => {
            for (team, members) in &snapshot.managed_teams {
                for member in members.iter().filter(|s| qualifies(s)) {
                    push(member, Some(team));
                }
            }
        }
        RelationKind::CompanyScope => {
            for member in snapshot.scope_members.iter().filter(|s| qualifies(s)) {
                push(member, None);
            }
        }
    }
    out
}

/// Authorization decisions over a live [`DirectoryGateway`].
pub struct Authorizer<'a, G: DirectoryGateway + ?Sized> {
    gateway: &'a G,
}

impl<'a, G: DirectoryGateway + ?Sized> Authorizer<'a, G> {
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// All users the actor may evaluate, with team annotations.
    pub async fn visible_subjects(
        &self,
        actor: &Actor,
        scope: CompanyScope,
    ) -> Result<Vec<EligibleSubject>, CoreError> {
        let snapshot = DirectorySnapshot::fetch(self.gateway, actor, scope).await?;
        Ok(eligible_subjects(actor, scope, &snapshot))
    }

    /// Whether the actor may evaluate the given user.
    ///
    /// `false` is a business-rule denial, not an error; callers translate
    /// it into a forbidden response.
    pub async fn can_evaluate(
        &self,
        actor: &Actor,
        scope: CompanyScope,
        subject_id: DbId,
    ) -> Result<bool, CoreError> {
        let visible = self.visible_subjects(actor, scope).await?;
        Ok(visible.iter().any(|e| e.subject.id == subject_id))
    }
}
