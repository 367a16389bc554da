//! Weighted scoring engine.
//!
//! Pure and deterministic: item ratings plus category weights in, cluster
//! and overall scores out. No I/O, no clock, no rounding policy -- scores
//! stay on the raw 1-4 scale and presentation-layer rescaling is the
//! caller's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::types::DbId;

/// Inclusive rating bounds for a single behavior item.
pub const MIN_RATING: i16 = 1;
/// Inclusive upper rating bound.
pub const MAX_RATING: i16 = 4;

/// One behavior item on a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorItem {
    pub id: DbId,
    pub text: String,
}

/// An ordered, weighted group of behavior items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: DbId,
    pub name: String,
    /// Weight in (0, 1]. Weights across a form need not sum to 1; the
    /// engine normalizes by the participating total.
    pub weight: f64,
    pub items: Vec<BehaviorItem>,
}

/// The form version an evaluation is interpreted against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationForm {
    pub id: DbId,
    /// `None` for the built-in default form shared by all tenants.
    pub company_id: Option<DbId>,
    pub target_role: Role,
    /// Customer-type discriminator selecting among form variants.
    pub customer_type: String,
    pub categories: Vec<Category>,
}

impl EvaluationForm {
    /// Whether the given behavior item belongs to this form.
    pub fn contains_item(&self, behavior_item_id: DbId) -> bool {
        self.categories
            .iter()
            .any(|c| c.items.iter().any(|i| i.id == behavior_item_id))
    }
}

/// A single rated behavior item within a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemScore {
    pub behavior_item_id: DbId,
    /// Rating in `[MIN_RATING, MAX_RATING]`. Range is validated upstream,
    /// never clamped here.
    pub rating: i16,
    pub comment: Option<String>,
}

/// Result of scoring one evaluation against one form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    /// Mean rating per category, keyed by category id. Categories with no
    /// scored item are absent, not zero.
    pub cluster_scores: BTreeMap<DbId, f64>,
    /// Weighted mean over scored categories, normalized by the sum of
    /// their weights. `None` when nothing was scored -- "no data" is never
    /// the lowest possible score.
    pub overall: Option<f64>,
}

/// Score a set of item ratings against a form.
///
/// A category with zero scored items contributes neither a cluster score
/// nor weight to the overall aggregation; this is the partial-form policy.
/// Ratings for items not on the form are ignored here (the pipeline
/// rejects them before scoring).
pub fn score(form: &EvaluationForm, item_scores: &[ItemScore]) -> ScoreCard {
    let mut cluster_scores = BTreeMap::new();
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;

    for category in &form.categories {
        let ratings: Vec<f64> = item_scores
            .iter()
            .filter(|s| category.items.iter().any(|i| i.id == s.behavior_item_id))
            .map(|s| f64::from(s.rating))
            .collect();
        if ratings.is_empty() {
            continue;
        }
        let cluster = ratings.iter().sum::<f64>() / ratings.len() as f64;
        cluster_scores.insert(category.id, cluster);
        weighted_sum += cluster * category.weight;
        weight_total += category.weight;
    }

    let overall = (weight_total > 0.0).then(|| weighted_sum / weight_total);
    ScoreCard {
        cluster_scores,
        overall,
    }
}

/// The built-in form used when a tenant has not configured one for the
/// (company, target role, customer type) tuple. Item and category ids are
/// negative so they can never collide with tenant-configured rows.
pub fn default_form(target_role: Role, customer_type: &str) -> EvaluationForm {
    let category = |id: DbId, name: &str, weight: f64, items: &[(DbId, &str)]| Category {
        id,
        name: name.to_string(),
        weight,
        items: items
            .iter()
            .map(|(id, text)| BehaviorItem {
                id: *id,
                text: (*text).to_string(),
            })
            .collect(),
    };

    EvaluationForm {
        id: -1,
        company_id: None,
        target_role,
        customer_type: customer_type.to_string(),
        categories: vec![
            category(
                -10,
                "Customer engagement",
                0.3,
                &[
                    (-101, "Greets the customer and establishes rapport"),
                    (-102, "Identifies the customer's needs with open questions"),
                ],
            ),
            category(
                -20,
                "Product knowledge",
                0.3,
                &[
                    (-201, "Presents relevant products accurately"),
                    (-202, "Handles objections with factual answers"),
                ],
            ),
            category(
                -30,
                "Closing",
                0.2,
                &[
                    (-301, "Proposes a concrete next step"),
                    (-302, "Secures commitment or follow-up"),
                ],
            ),
            category(
                -40,
                "Professional conduct",
                0.2,
                &[
                    (-401, "Presentation and punctuality"),
                    (-402, "Follows visit reporting standards"),
                ],
            ),
        ],
    }
}
