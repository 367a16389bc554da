//! Role hierarchy and the declarative evaluation rule table.
//!
//! Roles form a closed, totally-ordered set (most senior first). Who may
//! evaluate whom is data, not branching: [`EVALUATION_RULES`] maps each
//! evaluator role to its permitted subject roles and the relation through
//! which eligibility must be derived. Adding a role is a table edit, not a
//! new conditional in every consumer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Closed set of roles, declared most senior first.
///
/// The derived `Ord` matches seniority: `SuperAdmin` sorts before (is
/// senior to) `Salesperson`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    SalesDirector,
    RegionalSalesManager,
    RegionalManager,
    SalesLead,
    Salesperson,
}

impl Role {
    /// Stable snake_case name used in the database and in JWT claims.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::SuperAdmin => "super_admin",
            Role::Admin => "admin",
            Role::SalesDirector => "sales_director",
            Role::RegionalSalesManager => "regional_sales_manager",
            Role::RegionalManager => "regional_manager",
            Role::SalesLead => "sales_lead",
            Role::Salesperson => "salesperson",
        }
    }

    /// Whether the role may request data for a company other than its own.
    pub fn is_cross_company(self) -> bool {
        self == Role::SuperAdmin
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "super_admin" => Ok(Role::SuperAdmin),
            "admin" => Ok(Role::Admin),
            "sales_director" => Ok(Role::SalesDirector),
            "regional_sales_manager" => Ok(Role::RegionalSalesManager),
            "regional_manager" => Ok(Role::RegionalManager),
            "sales_lead" => Ok(Role::SalesLead),
            "salesperson" => Ok(Role::Salesperson),
            other => Err(CoreError::Validation(format!("Unknown role: {other}"))),
        }
    }
}

/// The relation an evaluator must hold to a subject for the pairing to be
/// permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Evaluator and subject are members of the same team.
    SharedTeam,
    /// Subject is a member of a team the evaluator manages
    /// (manager-of-team, not mere membership).
    ManagedTeam,
    /// Any matching subject within the evaluator's company scope.
    CompanyScope,
}

/// One row of the evaluation rule table.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationRule {
    pub evaluator: Role,
    pub subjects: &'static [Role],
    pub relation: RelationKind,
}

/// Who may evaluate whom, and through which relation.
///
/// Evaluation is downward-one-level only: each role evaluates exactly the
/// role directly below it, except the top three roles which may evaluate
/// either operational role. Salespersons never evaluate, so they have no
/// row. Skip-level pairings (e.g. regional manager → salesperson) are
/// deliberately absent.
pub const EVALUATION_RULES: &[EvaluationRule] = &[
    EvaluationRule {
        evaluator: Role::SalesLead,
        subjects: &[Role::Salesperson],
        relation: RelationKind::SharedTeam,
    },
    EvaluationRule {
        evaluator: Role::RegionalManager,
        subjects: &[Role::SalesLead],
        relation: RelationKind::ManagedTeam,
    },
    EvaluationRule {
        evaluator: Role::RegionalSalesManager,
        subjects: &[Role::SalesLead],
        relation: RelationKind::ManagedTeam,
    },
    EvaluationRule {
        evaluator: Role::SalesDirector,
        subjects: &[Role::Salesperson, Role::SalesLead],
        relation: RelationKind::CompanyScope,
    },
    EvaluationRule {
        evaluator: Role::Admin,
        subjects: &[Role::Salesperson, Role::SalesLead],
        relation: RelationKind::CompanyScope,
    },
    EvaluationRule {
        evaluator: Role::SuperAdmin,
        subjects: &[Role::Salesperson, Role::SalesLead],
        relation: RelationKind::CompanyScope,
    },
];

/// Look up the rule for an evaluator role. `None` means the role never
/// evaluates anyone.
pub fn rule_for(evaluator: Role) -> Option<&'static EvaluationRule> {
    EVALUATION_RULES.iter().find(|r| r.evaluator == evaluator)
}
