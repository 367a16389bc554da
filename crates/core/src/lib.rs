//! Domain logic for the sales performance evaluation platform.
//!
//! Everything here is independent of the HTTP layer and the database:
//! the role hierarchy and evaluation rule table ([`roles`], [`authz`]),
//! company scope resolution ([`scope`]), the weighted scoring engine
//! ([`scoring`]), and the submission pipeline ([`pipeline`]) orchestrating
//! them over the [`directory::DirectoryGateway`] and
//! [`pipeline::EvaluationStore`] seams.

pub mod authz;
pub mod directory;
pub mod error;
pub mod pipeline;
pub mod roles;
pub mod scope;
pub mod scoring;
pub mod types;
