//! Evaluation form rows.
//!
//! A form is stored as three tables (form, categories, items); the
//! repository assembles them into `salescore_core::scoring::EvaluationForm`.

use sqlx::FromRow;

use salescore_core::types::{DbId, Timestamp};

/// A row from `evaluation_forms`.
#[derive(Debug, Clone, FromRow)]
pub struct FormRow {
    pub id: DbId,
    pub company_id: DbId,
    pub name: String,
    pub target_role: String,
    pub customer_type: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}

/// A row from `form_categories`.
#[derive(Debug, Clone, FromRow)]
pub struct CategoryRow {
    pub id: DbId,
    pub form_id: DbId,
    pub name: String,
    pub weight: f64,
    pub position: i32,
}

/// A row from `behavior_items`.
#[derive(Debug, Clone, FromRow)]
pub struct BehaviorItemRow {
    pub id: DbId,
    pub category_id: DbId,
    pub text: String,
    pub position: i32,
}
