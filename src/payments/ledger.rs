use sqlx::PgPool;
use uuid::Uuid;

/// key: payments-ledger -> idempotency gate over provider event ids
pub async fn already_processed(pool: &PgPool, event_id: &str) -> sqlx::Result<bool> {
    let existing: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM processed_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(pool)
            .await?;
    Ok(existing.is_some())
}

/// Record an event as processed. The ledger is append-only and `event_id` is
/// unique; a concurrent delivery that lost the insert race surfaces here as
/// `Ok(false)` rather than an error.
pub async fn record(
    pool: &PgPool,
    event_id: &str,
    event_type: &str,
    booking_id: Option<Uuid>,
    metadata: serde_json::Value,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO processed_events (id, event_id, event_type, booking_id, metadata)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(event_id)
    .bind(event_type)
    .bind(booking_id)
    .bind(metadata)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
