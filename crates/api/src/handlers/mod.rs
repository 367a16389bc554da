pub mod auth;
pub mod evaluations;
