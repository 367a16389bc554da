//! Postgres-backed evaluation store.

use async_trait::async_trait;

use salescore_core::error::CoreError;
use salescore_core::pipeline::{EvaluationStore, NewEvaluation, SubmissionKey};
use salescore_core::roles::Role;
use salescore_core::scoring::EvaluationForm;
use salescore_core::types::DbId;

use crate::repositories::evaluation_repo::InsertResult;
use crate::repositories::{EvaluationRepo, FormRepo};
use crate::{map_db_error, DbPool};

/// Evaluation persistence over the shared connection pool.
#[derive(Clone)]
pub struct PgEvaluationStore {
    pool: DbPool,
}

impl PgEvaluationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EvaluationStore for PgEvaluationStore {
    async fn find_recent(
        &self,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<Option<DbId>, CoreError> {
        EvaluationRepo::find_recent(&self.pool, key, window_secs)
            .await
            .map_err(map_db_error)
    }

    async fn insert(
        &self,
        new: &NewEvaluation,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<DbId, CoreError> {
        match EvaluationRepo::insert(&self.pool, new, key, window_secs)
            .await
            .map_err(map_db_error)?
        {
            InsertResult::Created(id) => Ok(id),
            InsertResult::Duplicate(evaluation_id) => Err(CoreError::Duplicate { evaluation_id }),
        }
    }

    async fn active_form(
        &self,
        company_id: DbId,
        target_role: Role,
        customer_type: &str,
    ) -> Result<Option<EvaluationForm>, CoreError> {
        FormRepo::find_active(&self.pool, company_id, target_role.as_str(), customer_type)
            .await
            .map_err(map_db_error)
    }
}
