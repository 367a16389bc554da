//! Handlers for the `/evaluations` resource.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use salescore_core::authz::{Authorizer, EligibleSubject};
use salescore_core::pipeline::{
    EvaluationRequest, EvaluationSummary, SubmissionPipeline, SubmitOutcome,
};
use salescore_core::scope::{CompanyScope, RequestedScope};
use salescore_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Response body for `POST /evaluations`.
///
/// A duplicate submission is success-equivalent: the response carries the
/// prior evaluation's id with `duplicate: true` and no new row is written.
#[derive(Debug, Serialize)]
pub struct CreateEvaluationResponse {
    pub evaluation_id: DbId,
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<EvaluationSummary>,
}

/// Response body for `GET /evaluations/subjects`.
#[derive(Debug, Serialize)]
pub struct EvaluableSubjectsResponse {
    pub subjects: Vec<EligibleSubject>,
}

/// Query string for `GET /evaluations/subjects`.
///
/// `company` may be `all` or a company id. Scope resolution silently
/// narrows the request to the caller's own company unless the caller is
/// a super admin.
#[derive(Debug, Default, Deserialize)]
pub struct SubjectsQuery {
    pub company: Option<String>,
}

impl SubjectsQuery {
    fn requested_scope(&self) -> Result<RequestedScope, AppError> {
        match self.company.as_deref() {
            None => Ok(RequestedScope::Own),
            Some("all") => Ok(RequestedScope::All),
            Some(raw) => raw
                .parse::<DbId>()
                .map(RequestedScope::Company)
                .map_err(|_| {
                    AppError::BadRequest(format!(
                        "company must be 'all' or a company id, got '{raw}'"
                    ))
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/evaluations
///
/// Run the submission pipeline for the authenticated evaluator: validate,
/// dedupe, authorize, score, persist.
pub async fn create_evaluation(
    user: AuthUser,
    State(state): State<AppState>,
    Json(request): Json<EvaluationRequest>,
) -> AppResult<(StatusCode, Json<CreateEvaluationResponse>)> {
    let actor = user.actor(&state).await?;
    let pipeline = SubmissionPipeline::new(
        &state.directory,
        &state.evaluations,
        state.config.pipeline(),
    );

    let response = match pipeline.submit(&actor, &request).await? {
        SubmitOutcome::Created(summary) => (
            StatusCode::CREATED,
            Json(CreateEvaluationResponse {
                evaluation_id: summary.id,
                duplicate: false,
                summary: Some(summary),
            }),
        ),
        SubmitOutcome::Duplicate { evaluation_id } => (
            StatusCode::OK,
            Json(CreateEvaluationResponse {
                evaluation_id,
                duplicate: true,
                summary: None,
            }),
        ),
    };
    Ok(response)
}

/// GET /api/v1/evaluations/subjects
///
/// The users the authenticated actor may evaluate, each annotated with the
/// team through which eligibility was derived. Backed by the same
/// predicate as the submit-time authorization check.
pub async fn list_evaluable_subjects(
    user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubjectsQuery>,
) -> AppResult<Json<EvaluableSubjectsResponse>> {
    let actor = user.actor(&state).await?;
    let scope = CompanyScope::resolve(&actor, query.requested_scope()?);
    let subjects = Authorizer::new(&state.directory)
        .visible_subjects(&actor, scope)
        .await?;
    Ok(Json(EvaluableSubjectsResponse { subjects }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(company: Option<&str>) -> SubjectsQuery {
        SubjectsQuery {
            company: company.map(str::to_owned),
        }
    }

    #[test]
    fn absent_company_param_means_own_scope() {
        assert_eq!(query(None).requested_scope().unwrap(), RequestedScope::Own);
    }

    #[test]
    fn all_sentinel_and_ids_parse() {
        assert_eq!(
            query(Some("all")).requested_scope().unwrap(),
            RequestedScope::All
        );
        assert_eq!(
            query(Some("42")).requested_scope().unwrap(),
            RequestedScope::Company(42)
        );
    }

    #[test]
    fn garbage_company_param_is_a_bad_request() {
        assert!(query(Some("acme")).requested_scope().is_err());
    }
}
