//! Repository for evaluation form versions.

use sqlx::PgPool;

use salescore_core::scoring::{BehaviorItem, Category, EvaluationForm};
use salescore_core::types::DbId;

use crate::models::form::{BehaviorItemRow, CategoryRow, FormRow};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, company_id, name, target_role, customer_type, is_active, created_at";

/// Read access to evaluation forms. Authoring is external; this crate only
/// resolves and assembles the active version.
pub struct FormRepo;

impl FormRepo {
    /// The single active form for (company, target role, customer type),
    /// assembled with its categories and items in position order.
    ///
    /// `Ok(None)` when the tenant has not configured one; the caller falls
    /// back to the built-in default form.
    pub async fn find_active(
        pool: &PgPool,
        company_id: DbId,
        target_role: &str,
        customer_type: &str,
    ) -> Result<Option<EvaluationForm>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM evaluation_forms
             WHERE company_id = $1 AND target_role = $2 AND customer_type = $3
               AND is_active"
        );
        let Some(form_row) = sqlx::query_as::<_, FormRow>(&query)
            .bind(company_id)
            .bind(target_role)
            .bind(customer_type)
            .fetch_optional(pool)
            .await?
        else {
            return Ok(None);
        };

        let category_rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, form_id, name, weight, position
             FROM form_categories WHERE form_id = $1 ORDER BY position",
        )
        .bind(form_row.id)
        .fetch_all(pool)
        .await?;

        let item_rows = sqlx::query_as::<_, BehaviorItemRow>(
            "SELECT bi.id, bi.category_id, bi.text, bi.position
             FROM behavior_items bi
             JOIN form_categories fc ON fc.id = bi.category_id
             WHERE fc.form_id = $1
             ORDER BY bi.position",
        )
        .bind(form_row.id)
        .fetch_all(pool)
        .await?;

        let categories = category_rows
            .into_iter()
            .map(|c| Category {
                id: c.id,
                name: c.name,
                weight: c.weight,
                items: item_rows
                    .iter()
                    .filter(|i| i.category_id == c.id)
                    .map(|i| BehaviorItem {
                        id: i.id,
                        text: i.text.clone(),
                    })
                    .collect(),
            })
            .collect();

        Ok(Some(EvaluationForm {
            id: form_row.id,
            company_id: Some(form_row.company_id),
            target_role: form_row.target_role.parse().map_err(|_| {
                sqlx::Error::Decode(
                    format!("unknown target_role '{}' on form {}", form_row.target_role, form_row.id)
                        .into(),
                )
            })?,
            customer_type: form_row.customer_type,
            categories,
        }))
    }
}
