pub mod evaluation_repo;
pub mod form_repo;
pub mod session_repo;
pub mod team_repo;
pub mod user_repo;

pub use evaluation_repo::EvaluationRepo;
pub use form_repo::FormRepo;
pub use session_repo::SessionRepo;
pub use team_repo::TeamRepo;
pub use user_repo::UserRepo;
