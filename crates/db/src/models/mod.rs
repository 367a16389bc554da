pub mod evaluation;
pub mod form;
pub mod session;
pub mod team;
pub mod user;
