//! Evaluation rows. Immutable after insert.

use chrono::NaiveDate;
use sqlx::FromRow;

use salescore_core::types::{DbId, Timestamp};

/// A row from `evaluations`.
#[derive(Debug, Clone, FromRow)]
pub struct EvaluationRow {
    pub id: DbId,
    pub company_id: DbId,
    pub evaluator_id: DbId,
    pub subject_id: DbId,
    /// `None` when scored against the built-in default form.
    pub form_id: Option<DbId>,
    pub visit_date: NaiveDate,
    pub customer_type: String,
    pub customer_name: String,
    pub location: Option<String>,
    pub comment: Option<String>,
    pub overall_score: Option<f64>,
    pub created_at: Timestamp,
}
