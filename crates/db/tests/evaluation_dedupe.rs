//! Integration tests for the evaluation insert path.
//!
//! Exercises the duplicate window against a real database, including the
//! case the advisory transaction lock exists for: two identical
//! submissions racing through `insert` at the same time.

use chrono::NaiveDate;
use sqlx::PgPool;

use salescore_core::pipeline::{NewEvaluation, SubmissionKey};
use salescore_core::scoring::ItemScore;
use salescore_db::repositories::evaluation_repo::InsertResult;
use salescore_db::repositories::EvaluationRepo;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_user(pool: &PgPool, company_id: i64, username: &str, role: &str) -> i64 {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (company_id, username, email, display_name, password_hash, role)
         VALUES ($1, $2, $2 || '@example.com', $2, 'x', $3)
         RETURNING id",
    )
    .bind(company_id)
    .bind(username)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

/// One company with a sales lead and a salesperson. User rows are written
/// directly; user management is outside this crate.
async fn seed_pair(pool: &PgPool) -> (i64, i64, i64) {
    let (company_id,): (i64,) =
        sqlx::query_as("INSERT INTO companies (name) VALUES ('Acme Sales') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let evaluator_id = seed_user(pool, company_id, "lead", "sales_lead").await;
    let subject_id = seed_user(pool, company_id, "rep", "salesperson").await;
    (company_id, evaluator_id, subject_id)
}

fn new_evaluation(company_id: i64, evaluator_id: i64, subject_id: i64) -> NewEvaluation {
    NewEvaluation {
        company_id,
        evaluator_id,
        subject_id,
        // Negative id: scored against the built-in default form.
        form_id: -1,
        visit_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        customer_type: "retail".into(),
        customer_name: "Acme Market".into(),
        location: None,
        comment: None,
        overall_score: Some(2.9),
        items: vec![ItemScore {
            behavior_item_id: -101,
            rating: 3,
            comment: None,
        }],
    }
}

fn key_of(new: &NewEvaluation) -> SubmissionKey {
    SubmissionKey {
        evaluator_id: new.evaluator_id,
        subject_id: new.subject_id,
        visit_date: new.visit_date,
        customer_name: new.customer_name.clone(),
    }
}

async fn count_evaluations(pool: &PgPool) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM evaluations")
        .fetch_one(pool)
        .await
        .unwrap();
    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn insert_writes_header_and_items_in_one_unit(pool: PgPool) {
    let (company_id, evaluator_id, subject_id) = seed_pair(&pool).await;
    let new = new_evaluation(company_id, evaluator_id, subject_id);

    let result = EvaluationRepo::insert(&pool, &new, &key_of(&new), 10)
        .await
        .unwrap();
    let InsertResult::Created(id) = result else {
        panic!("expected Created, got {result:?}");
    };

    // Default form is stored as a NULL form_id.
    let (form_id,): (Option<i64>,) =
        sqlx::query_as("SELECT form_id FROM evaluations WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(form_id, None);

    let (items,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM evaluation_item_scores WHERE evaluation_id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(items, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn second_insert_inside_the_window_is_a_duplicate(pool: PgPool) {
    let (company_id, evaluator_id, subject_id) = seed_pair(&pool).await;
    let new = new_evaluation(company_id, evaluator_id, subject_id);
    let key = key_of(&new);

    let first = EvaluationRepo::insert(&pool, &new, &key, 60).await.unwrap();
    let InsertResult::Created(first_id) = first else {
        panic!("expected Created, got {first:?}");
    };

    let second = EvaluationRepo::insert(&pool, &new, &key, 60).await.unwrap();
    assert_eq!(second, InsertResult::Duplicate(first_id));
    assert_eq!(count_evaluations(&pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn insert_outside_the_window_creates_a_second_row(pool: PgPool) {
    let (company_id, evaluator_id, subject_id) = seed_pair(&pool).await;
    let new = new_evaluation(company_id, evaluator_id, subject_id);
    let key = key_of(&new);

    let first = EvaluationRepo::insert(&pool, &new, &key, 0).await.unwrap();
    assert!(matches!(first, InsertResult::Created(_)));

    // A zero-second window: the prior row no longer counts.
    let second = EvaluationRepo::insert(&pool, &new, &key, 0).await.unwrap();
    assert!(matches!(second, InsertResult::Created(_)));
    assert_eq!(count_evaluations(&pool).await, 2);
}

/// The race the advisory lock guards: two identical submissions inserting
/// concurrently must yield exactly one row, one `Created` and one
/// `Duplicate` carrying the winner's id.
#[sqlx::test(migrations = "./migrations")]
async fn concurrent_identical_inserts_yield_one_row(pool: PgPool) {
    let (company_id, evaluator_id, subject_id) = seed_pair(&pool).await;
    let new = new_evaluation(company_id, evaluator_id, subject_id);
    let key = key_of(&new);

    let (a, b) = tokio::join!(
        EvaluationRepo::insert(&pool, &new, &key, 60),
        EvaluationRepo::insert(&pool, &new, &key, 60),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let (created, duplicate) = match (a, b) {
        (InsertResult::Created(id), InsertResult::Duplicate(dup)) => (id, dup),
        (InsertResult::Duplicate(dup), InsertResult::Created(id)) => (id, dup),
        other => panic!("expected one Created and one Duplicate, got {other:?}"),
    };
    assert_eq!(created, duplicate);
    assert_eq!(count_evaluations(&pool).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn find_recent_honours_the_window(pool: PgPool) {
    let (company_id, evaluator_id, subject_id) = seed_pair(&pool).await;
    let new = new_evaluation(company_id, evaluator_id, subject_id);
    let key = key_of(&new);

    assert_eq!(EvaluationRepo::find_recent(&pool, &key, 60).await.unwrap(), None);

    let InsertResult::Created(id) = EvaluationRepo::insert(&pool, &new, &key, 60).await.unwrap()
    else {
        panic!("expected Created");
    };

    assert_eq!(
        EvaluationRepo::find_recent(&pool, &key, 60).await.unwrap(),
        Some(id)
    );
    assert_eq!(EvaluationRepo::find_recent(&pool, &key, 0).await.unwrap(), None);
}
