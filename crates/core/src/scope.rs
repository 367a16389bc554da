//! Company scope resolution, the single multi-tenant trust boundary.

use serde::{Deserialize, Serialize};

use crate::directory::Actor;
use crate::types::DbId;

/// The tenant scope every downstream query must be parameterized by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "company_id")]
pub enum CompanyScope {
    /// All tenants. Only reachable by a super admin asking for it.
    All,
    /// A single tenant.
    Company(DbId),
}

/// What the caller asked for, before trust is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedScope {
    /// No explicit request; the actor's own company applies.
    #[default]
    Own,
    /// The "all companies" sentinel.
    All,
    /// A specific company id.
    Company(DbId),
}

impl CompanyScope {
    /// Resolve the scope a request may touch.
    ///
    /// A super admin's explicit request (including the "all" sentinel) is
    /// honored. Everyone else is silently narrowed to their own company --
    /// never an error, so a probing caller learns nothing about foreign
    /// tenants.
    pub fn resolve(actor: &Actor, requested: RequestedScope) -> CompanyScope {
        if actor.role.is_cross_company() {
            return match requested {
                RequestedScope::Own => CompanyScope::Company(actor.company_id),
                RequestedScope::All => CompanyScope::All,
                RequestedScope::Company(id) => CompanyScope::Company(id),
            };
        }
        CompanyScope::Company(actor.company_id)
    }

    /// Whether the scope covers the given company.
    pub fn covers(self, company_id: DbId) -> bool {
        match self {
            CompanyScope::All => true,
            CompanyScope::Company(id) => id == company_id,
        }
    }
}
