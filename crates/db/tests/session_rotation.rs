//! Integration tests for refresh-session rotation.
//!
//! Rotation must be all-or-nothing: the presented session is revoked in
//! the same transaction that inserts its replacement, so a failed
//! exchange never burns a credential without issuing a new one.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use salescore_db::models::session::CreateSession;
use salescore_db::repositories::SessionRepo;

async fn seed_user(pool: &PgPool) -> i64 {
    let (company_id,): (i64,) =
        sqlx::query_as("INSERT INTO companies (name) VALUES ('Acme Sales') RETURNING id")
            .fetch_one(pool)
            .await
            .unwrap();
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (company_id, username, email, display_name, password_hash, role)
         VALUES ($1, 'lead', 'lead@example.com', 'Lead', 'x', 'sales_lead')
         RETURNING id",
    )
    .bind(company_id)
    .fetch_one(pool)
    .await
    .unwrap();
    id
}

fn session_for(user_id: i64, hash: &str) -> CreateSession {
    CreateSession {
        user_id,
        refresh_token_hash: hash.to_string(),
        expires_at: Utc::now() + Duration::days(7),
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn rotate_revokes_the_old_session_and_creates_the_new(pool: PgPool) {
    let user_id = seed_user(&pool).await;
    let old = SessionRepo::create(&pool, &session_for(user_id, "hash-old"))
        .await
        .unwrap();

    let new = SessionRepo::rotate(&pool, old.id, &session_for(user_id, "hash-new"))
        .await
        .unwrap();
    assert_ne!(new.id, old.id);

    // The old token no longer resolves; the new one does.
    assert!(
        SessionRepo::find_by_refresh_token_hash(&pool, "hash-old")
            .await
            .unwrap()
            .is_none()
    );
    let found = SessionRepo::find_by_refresh_token_hash(&pool, "hash-new")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, new.id);
}

#[sqlx::test(migrations = "./migrations")]
async fn rotate_of_a_spent_session_changes_nothing(pool: PgPool) {
    let user_id = seed_user(&pool).await;
    let old = SessionRepo::create(&pool, &session_for(user_id, "hash-old"))
        .await
        .unwrap();
    SessionRepo::rotate(&pool, old.id, &session_for(user_id, "hash-new"))
        .await
        .unwrap();

    // Replaying the spent session must fail without inserting anything:
    // the revoke-miss rolls the transaction back.
    let err = SessionRepo::rotate(&pool, old.id, &session_for(user_id, "hash-replay"))
        .await
        .unwrap_err();
    assert!(matches!(err, sqlx::Error::RowNotFound));

    assert!(
        SessionRepo::find_by_refresh_token_hash(&pool, "hash-replay")
            .await
            .unwrap()
            .is_none()
    );
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_sessions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}
