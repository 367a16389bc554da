//! Route definitions for the `/evaluations` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::evaluations;
use crate::state::AppState;

/// Routes mounted at `/evaluations`.
///
/// ```text
/// POST /           -> create evaluation
/// GET  /subjects   -> list evaluable subjects
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(evaluations::create_evaluation))
        .route("/subjects", get(evaluations::list_evaluable_subjects))
}
