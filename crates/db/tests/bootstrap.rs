//! Bootstrap tests: connect, migrate, verify the schema landed.

use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn full_bootstrap(pool: PgPool) {
    salescore_db::health_check(&pool).await.unwrap();

    let tables = [
        "companies",
        "users",
        "teams",
        "team_members",
        "evaluation_forms",
        "form_categories",
        "behavior_items",
        "evaluations",
        "evaluation_item_scores",
        "user_sessions",
    ];

    for table in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, 0, "{table} should exist and start empty");
    }
}

/// The partial unique index that enforces one active form per
/// (company, target role, customer type) must be present.
#[sqlx::test(migrations = "./migrations")]
async fn active_form_uniqueness_is_enforced(pool: PgPool) {
    let (company_id,): (i64,) =
        sqlx::query_as("INSERT INTO companies (name) VALUES ('Acme Sales') RETURNING id")
            .fetch_one(&pool)
            .await
            .unwrap();

    let insert = "INSERT INTO evaluation_forms (company_id, name, target_role, customer_type)
                  VALUES ($1, $2, 'salesperson', 'retail')";
    sqlx::query(insert)
        .bind(company_id)
        .bind("v1")
        .execute(&pool)
        .await
        .unwrap();

    let err = sqlx::query(insert)
        .bind(company_id)
        .bind("v2")
        .execute(&pool)
        .await
        .unwrap_err();
    match err {
        sqlx::Error::Database(db_err) => {
            assert_eq!(db_err.code().as_deref(), Some("23505"));
            assert_eq!(db_err.constraint(), Some("uq_evaluation_forms_active"));
        }
        other => panic!("expected a unique violation, got {other}"),
    }
}
