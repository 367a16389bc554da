//! Repository for the `evaluations` and `evaluation_item_scores` tables.
//!
//! The insert path is the one place duplicate suppression must hold under
//! concurrent writers: the transaction takes an advisory xact lock on the
//! submission key before re-checking the window, so check-then-insert is
//! atomic with respect to every other writer of the same key.

use sqlx::PgPool;

use salescore_core::pipeline::{NewEvaluation, SubmissionKey};
use salescore_core::types::DbId;

use crate::models::evaluation::EvaluationRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, company_id, evaluator_id, subject_id, form_id, visit_date, \
                        customer_type, customer_name, location, comment, overall_score, created_at";

/// Result of an atomic insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    Created(DbId),
    /// An evaluation with the same key already exists inside the window.
    Duplicate(DbId),
}

/// Provides evaluation persistence. Evaluations are immutable: there is no
/// update or delete path.
pub struct EvaluationRepo;

impl EvaluationRepo {
    /// Id of an evaluation with the same submission key created within the
    /// trailing window, if any. Read-only pre-flight check.
    pub async fn find_recent(
        pool: &PgPool,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<Option<DbId>, sqlx::Error> {
        let row: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM evaluations
             WHERE evaluator_id = $1 AND subject_id = $2
               AND visit_date = $3 AND customer_name = $4
               AND created_at > NOW() - make_interval(secs => $5)
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(key.evaluator_id)
        .bind(key.subject_id)
        .bind(key.visit_date)
        .bind(&key.customer_name)
        .bind(window_secs as f64)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(id,)| id))
    }

    /// Insert header and item scores as one transaction, re-checking the
    /// duplicate window under an advisory xact lock keyed on the
    /// submission tuple. Partial writes are never observable.
    pub async fn insert(
        pool: &PgPool,
        new: &NewEvaluation,
        key: &SubmissionKey,
        window_secs: i64,
    ) -> Result<InsertResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Serialize writers of the same submission key. The lock is
        // released automatically at commit or rollback.
        let lock_key = format!(
            "{}:{}:{}:{}",
            key.evaluator_id, key.subject_id, key.visit_date, key.customer_name
        );
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(&lock_key)
            .execute(&mut *tx)
            .await?;

        let existing: Option<(DbId,)> = sqlx::query_as(
            "SELECT id FROM evaluations
             WHERE evaluator_id = $1 AND subject_id = $2
               AND visit_date = $3 AND customer_name = $4
               AND created_at > NOW() - make_interval(secs => $5)
             LIMIT 1",
        )
        .bind(key.evaluator_id)
        .bind(key.subject_id)
        .bind(key.visit_date)
        .bind(&key.customer_name)
        .bind(window_secs as f64)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((id,)) = existing {
            tx.rollback().await?;
            return Ok(InsertResult::Duplicate(id));
        }

        let query = format!(
            "INSERT INTO evaluations
                (company_id, evaluator_id, subject_id, form_id, visit_date,
                 customer_type, customer_name, location, comment, overall_score)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        // The built-in default form has no database row; store NULL.
        let form_id: Option<DbId> = (new.form_id >= 0).then_some(new.form_id);
        let header = sqlx::query_as::<_, EvaluationRow>(&query)
            .bind(new.company_id)
            .bind(new.evaluator_id)
            .bind(new.subject_id)
            .bind(form_id)
            .bind(new.visit_date)
            .bind(&new.customer_type)
            .bind(&new.customer_name)
            .bind(&new.location)
            .bind(&new.comment)
            .bind(new.overall_score)
            .fetch_one(&mut *tx)
            .await?;

        for item in &new.items {
            sqlx::query(
                "INSERT INTO evaluation_item_scores
                    (evaluation_id, behavior_item_id, rating, comment)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(header.id)
            .bind(item.behavior_item_id)
            .bind(item.rating)
            .bind(&item.comment)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(InsertResult::Created(header.id))
    }
}
