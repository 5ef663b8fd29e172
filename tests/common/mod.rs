#![allow(dead_code)]

use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use venue_backend::config::ReconcilerConfig;
use venue_backend::payments::signature;

pub const TEST_SECRET: &str = "whsec_test_secret";

pub fn test_config() -> ReconcilerConfig {
    ReconcilerConfig {
        signing_secret: Some(TEST_SECRET.to_string()),
        signature_tolerance_secs: 300,
        staff_notify_url: None,
        customer_email_url: None,
        crm_sync_url: None,
        outbound_timeout_secs: 2,
        balance_due_days: 14,
        balance_retry_offset_days: vec![3, 7, 10],
    }
}

pub fn event_body(event_id: &str, event_type: &str, metadata: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": event_id,
        "type": event_type,
        "data": {
            "object": {
                "id": format!("cs_{event_id}"),
                "payment_intent": format!("pi_{event_id}"),
                "amount_total": 50_000,
                "currency": "usd",
                "metadata": metadata,
            }
        }
    }))
    .unwrap()
}

pub fn sign(body: &[u8]) -> String {
    signature::sign(TEST_SECRET, body, Utc::now().timestamp())
}

pub async fn insert_booking(pool: &PgPool) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO bookings (customer_name, customer_email, total_cents, deposit_cents, balance_cents)
        VALUES ('Ada Lovelace', 'ada@example.com', 100000, 50000, 50000)
        RETURNING id
        "#,
    )
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn insert_pending_job(pool: &PgPool, booking_id: Uuid, job_type: &str) -> Uuid {
    sqlx::query_scalar(
        "INSERT INTO scheduled_jobs (booking_id, job_type, run_at) VALUES ($1, $2, NOW()) RETURNING id",
    )
    .bind(booking_id)
    .bind(job_type)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn ledger_count(pool: &PgPool, event_id: &str) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM processed_events WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
