//! Evaluation submission pipeline.
//!
//! One entry point, [`SubmissionPipeline::submit`], runs the steps in a
//! fixed order -- structural validation, duplicate suppression, scope
//! resolution, authorization, form selection, scoring, atomic persist --
//! and short-circuits on the first failure. Exactly one durable write on
//! success, zero writes on any failure branch.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::authz::Authorizer;
use crate::directory::{Actor, DirectoryGateway};
use crate::error::CoreError;
use crate::roles::Role;
use crate::scope::{CompanyScope, RequestedScope};
use crate::scoring::{self, EvaluationForm, ItemScore, ScoreCard, MAX_RATING, MIN_RATING};
use crate::types::{DbId, Timestamp};

/// Default trailing window for duplicate suppression, in seconds.
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 10;

/// Tunable pipeline policy. The duplicate window is a business choice with
/// no documented rationale for an exact value, so it stays configurable.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub duplicate_window_secs: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: DEFAULT_DUPLICATE_WINDOW_SECS,
        }
    }
}

/// One rated item within a submission request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ItemScoreInput {
    pub behavior_item_id: DbId,
    #[validate(range(min = 1, max = 4, message = "rating must be between 1 and 4"))]
    pub rating: i16,
    pub comment: Option<String>,
}

/// The `createEvaluation` request shape.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EvaluationRequest {
    pub subject_id: DbId,
    pub visit_date: NaiveDate,
    /// Discriminator selecting among form variants for the target role.
    #[validate(length(min = 1, message = "customer_type must not be empty"))]
    pub customer_type: String,
    #[validate(length(min = 1, message = "customer_name must not be empty"))]
    pub customer_name: String,
    pub location: Option<String>,
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "at least one item must be scored"), nested)]
    pub items: Vec<ItemScoreInput>,
}

impl EvaluationRequest {
    fn item_scores(&self) -> Vec<ItemScore> {
        self.items
            .iter()
            .map(|i| ItemScore {
                behavior_item_id: i.behavior_item_id,
                rating: i.rating,
                comment: i.comment.clone(),
            })
            .collect()
    }
}

/// Identity of a submission for duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    pub evaluator_id: DbId,
    pub subject_id: DbId,
    pub visit_date: NaiveDate,
    pub customer_name: String,
}

/// The write unit handed to the store: header plus all item scores,
/// persisted as one atomic unit.
#[derive(Debug, Clone)]
pub struct NewEvaluation {
    pub company_id: DbId,
    pub evaluator_id: DbId,
    pub subject_id: DbId,
    pub form_id: DbId,
    pub visit_date: NaiveDate,
    pub customer_type: String,
    pub customer_name: String,
    pub location: Option<String>,
    pub comment: Option<String>,
    pub overall_score: Option<f64>,
    pub items: Vec<ItemScore>,
}

/// Summary of a created evaluation, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationSummary {
    pub id: DbId,
    pub company_id: DbId,
    pub evaluator_id: DbId,
    pub subject_id: DbId,
    pub visit_date: NaiveDate,
    pub customer_type: String,
    pub customer_name: String,
    pub scores: ScoreCard,
}

/// Outcome of a submission. A duplicate is success-equivalent: the prior
/// evaluation already covers the request, so no new row is written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SubmitOutcome {
    Created(EvaluationSummary),
    Duplicate { evaluation_id: DbId },
}

/// Durable evaluation storage.
///
/// `insert` must enforce the duplicate window atomically with respect to
/// other writers (in Postgres, an advisory transaction lock on the
/// submission key), returning [`CoreError::Duplicate`] when it loses the
/// race. `find_recent` is the cheap pre-flight check; it must never write.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Id of an evaluation with the same key created within the trailing
    /// window, if any.
    async fn find_recent(
        &self,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<Option<DbId>, CoreError>;

    /// Atomically re-check the window and insert header + items as one
    /// unit. Returns the new evaluation id.
    async fn insert(
        &self,
        new: &NewEvaluation,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<DbId, CoreError>;

    /// The active form for (company, target role, customer type), if the
    /// tenant has configured one.
    async fn active_form(
        &self,
        company_id: DbId,
        target_role: Role,
        customer_type: &str,
    ) -> Result<Option<EvaluationForm>, CoreError>;
}

/// Orchestrates one evaluation submission over the directory and store
/// seams. Stateless; build one per request.
pub struct SubmissionPipeline<'a, G: DirectoryGateway + ?Sized, S: EvaluationStore + ?Sized> {
    gateway: &'a G,
    store: &'a S,
    config: PipelineConfig,
}

impl<'a, G: DirectoryGateway + ?Sized, S: EvaluationStore + ?Sized> SubmissionPipeline<'a, G, S> {
    pub fn new(gateway: &'a G, store: &'a S, config: PipelineConfig) -> Self {
        Self {
            gateway,
            store,
            config,
        }
    }

    /// Validate, dedupe, authorize, score, and persist one evaluation.
    pub async fn submit(
        &self,
        actor: &Actor,
        request: &EvaluationRequest,
    ) -> Result<SubmitOutcome, CoreError> {
        // 1. Structural validation.
        request
            .validate()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        debug_assert!(request
            .items
            .iter()
            .all(|i| (MIN_RATING..=MAX_RATING).contains(&i.rating)));

        // 2. Duplicate suppression (pre-flight; the insert re-checks
        // atomically).
        let key = SubmissionKey {
            evaluator_id: actor.id,
            subject_id: request.subject_id,
            visit_date: request.visit_date,
            customer_name: request.customer_name.clone(),
        };
        if let Some(evaluation_id) = self
            .store
            .find_recent(&key, self.config.duplicate_window_secs)
            .await?
        {
            tracing::info!(evaluation_id, "duplicate submission suppressed");
            return Ok(SubmitOutcome::Duplicate { evaluation_id });
        }

        // 3. Scope resolution and authorization. The subject's role and
        // company come from the same eligibility listing the check uses,
        // so an unknown or out-of-reach subject is indistinguishable from
        // a forbidden one.
        if !actor.is_active {
            return Err(CoreError::Forbidden("Account is deactivated".into()));
        }
        let scope = CompanyScope::resolve(actor, RequestedScope::Own);
        let visible = Authorizer::new(self.gateway)
            .visible_subjects(actor, scope)
            .await?;
        let subject = visible
            .iter()
            .map(|e| &e.subject)
            .find(|s| s.id == request.subject_id)
            .ok_or_else(|| {
                CoreError::Forbidden("You are not permitted to evaluate this user".into())
            })?;

        // 4. Form selection, falling back to the built-in default so the
        // system is usable before a tenant has configured forms.
        let form = match self
            .store
            .active_form(subject.company_id, subject.role, &request.customer_type)
            .await?
        {
            Some(form) => form,
            None => scoring::default_form(subject.role, &request.customer_type),
        };

        // Every scored item must belong to the selected form version.
        let item_scores = request.item_scores();
        for item in &item_scores {
            if !form.contains_item(item.behavior_item_id) {
                return Err(CoreError::Validation(format!(
                    "Behavior item {} is not on the active form",
                    item.behavior_item_id
                )));
            }
        }

        // 5. Scoring.
        let scores = scoring::score(&form, &item_scores);

        // 6. Atomic persist. The store may still detect a duplicate under
        // a race; that is the same success-equivalent outcome.
        let new = NewEvaluation {
            company_id: subject.company_id,
            evaluator_id: actor.id,
            subject_id: subject.id,
            form_id: form.id,
            visit_date: request.visit_date,
            customer_type: request.customer_type.clone(),
            customer_name: request.customer_name.clone(),
            location: request.location.clone(),
            comment: request.comment.clone(),
            overall_score: scores.overall,
            items: item_scores,
        };
        let id = match self
            .store
            .insert(&new, &key, self.config.duplicate_window_secs)
            .await
        {
            Ok(id) => id,
            Err(CoreError::Duplicate { evaluation_id }) => {
                tracing::info!(evaluation_id, "duplicate submission lost insert race");
                return Ok(SubmitOutcome::Duplicate { evaluation_id });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            evaluation_id = id,
            evaluator_id = actor.id,
            subject_id = subject.id,
            "evaluation created"
        );
        Ok(SubmitOutcome::Created(EvaluationSummary {
            id,
            company_id: new.company_id,
            evaluator_id: new.evaluator_id,
            subject_id: new.subject_id,
            visit_date: new.visit_date,
            customer_type: new.customer_type,
            customer_name: new.customer_name,
            scores,
        }))
    }
}

/// Stored row shape used by tests and by in-memory store impls.
#[derive(Debug, Clone)]
pub struct StoredEvaluation {
    pub id: DbId,
    pub key: SubmissionKey,
    pub new: NewEvaluation,
    pub created_at: Timestamp,
}
