use crate::types::DbId;

/// Domain error taxonomy shared by every crate in the workspace.
///
/// The variants map one-to-one onto the recovery policy of the client:
/// `Validation` and `Forbidden` are never retried, `Duplicate` is a
/// success-equivalent no-op carrying the prior evaluation id,
/// `Unavailable` is safe to retry with backoff, and `Unauthorized`
/// triggers exactly one credential refresh.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A matching evaluation was submitted within the duplicate window.
    /// Carries the id of the evaluation that already exists.
    #[error("Duplicate submission; existing evaluation id {evaluation_id}")]
    Duplicate { evaluation_id: DbId },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Directory or store transiently unreachable. Not retried here;
    /// surfaced intact so the caller can apply its own backoff.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
