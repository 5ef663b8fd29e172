use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::time::{self, Duration as TokioDuration};
use tracing::{info, warn};

use crate::collaborators::CollaboratorClient;
use crate::payments::models::Booking;

/// Deferred work tracked in the `scheduled_jobs` queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    CreateBalancePaymentLink,
    BalanceRetry1,
    BalanceRetry2,
    BalanceRetry3,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CreateBalancePaymentLink => "create_balance_payment_link",
            JobType::BalanceRetry1 => "balance_retry_1",
            JobType::BalanceRetry2 => "balance_retry_2",
            JobType::BalanceRetry3 => "balance_retry_3",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "create_balance_payment_link" => Some(JobType::CreateBalancePaymentLink),
            "balance_retry_1" => Some(JobType::BalanceRetry1),
            "balance_retry_2" => Some(JobType::BalanceRetry2),
            "balance_retry_3" => Some(JobType::BalanceRetry3),
            _ => None,
        }
    }
}

/// Job types made moot once a booking's balance is settled.
pub const BALANCE_JOB_TYPES: &[&str] = &[
    "create_balance_payment_link",
    "balance_retry_1",
    "balance_retry_2",
    "balance_retry_3",
];

const MAX_ATTEMPTS: i32 = 3;

/// A worker that dies after claiming leaves its rows in `processing`; rows
/// older than this are handed back to the queue on the next scan.
const STALE_PROCESSING_MINUTES: i64 = 10;

/// key: jobs -> enqueue the post-deposit balance collection sequence
///
/// One payment-link job `due_days` out, then a reminder for each configured
/// offset after that. Returns the number of jobs enqueued.
pub async fn schedule_balance_jobs(
    pool: &PgPool,
    booking_id: uuid::Uuid,
    due_days: i64,
    retry_offset_days: &[i64],
) -> sqlx::Result<u32> {
    let link_run_at = Utc::now() + Duration::days(due_days);
    insert_job(pool, booking_id, JobType::CreateBalancePaymentLink, link_run_at).await?;
    let mut count = 1;

    let retries = [
        JobType::BalanceRetry1,
        JobType::BalanceRetry2,
        JobType::BalanceRetry3,
    ];
    for (job_type, offset) in retries.iter().zip(retry_offset_days) {
        insert_job(pool, booking_id, *job_type, link_run_at + Duration::days(*offset)).await?;
        count += 1;
    }
    Ok(count)
}

async fn insert_job(
    pool: &PgPool,
    booking_id: uuid::Uuid,
    job_type: JobType,
    run_at: DateTime<Utc>,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO scheduled_jobs (id, booking_id, job_type, run_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(booking_id)
    .bind(job_type.as_str())
    .bind(run_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Cancel every pending job of the given types for a booking, annotating the
/// reason. Idempotent: completed, cancelled, and failed rows are untouched,
/// and repeating the call affects zero rows.
pub async fn cancel_pending_jobs(
    pool: &PgPool,
    booking_id: uuid::Uuid,
    job_types: &[&str],
    reason: &str,
) -> sqlx::Result<u64> {
    let types: Vec<String> = job_types.iter().map(|t| t.to_string()).collect();
    let result = sqlx::query(
        r#"
        UPDATE scheduled_jobs
        SET status = 'cancelled', last_error = $3, updated_at = NOW()
        WHERE booking_id = $1 AND job_type = ANY($2) AND status = 'pending'
        "#,
    )
    .bind(booking_id)
    .bind(&types)
    .bind(reason)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// key: jobs -> stale-job canceller for settled balances
pub async fn cancel_pending_balance_jobs(
    pool: &PgPool,
    booking_id: uuid::Uuid,
) -> sqlx::Result<u64> {
    cancel_pending_jobs(pool, booking_id, BALANCE_JOB_TYPES, "superseded: balance paid").await
}

#[derive(Debug, FromRow)]
struct DueJob {
    id: uuid::Uuid,
    booking_id: uuid::Uuid,
    job_type: String,
    attempts: i32,
}

/// key: jobs-worker -> background poller for due scheduled jobs
pub fn start_worker(pool: PgPool, collaborators: Arc<CollaboratorClient>, scan_interval_secs: u64) {
    let interval = TokioDuration::from_secs(scan_interval_secs);
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(err) = process_due_jobs(&pool, &collaborators, Utc::now()).await {
                warn!(?err, "scheduled job scan failed");
            }
        }
    });
}

/// One worker tick: claim due pending jobs and run them. Split out from the
/// spawn loop so tests can drive it with a fixed clock.
pub async fn process_due_jobs(
    pool: &PgPool,
    collaborators: &CollaboratorClient,
    now: DateTime<Utc>,
) -> anyhow::Result<u32> {
    let reclaimed = sqlx::query(
        "UPDATE scheduled_jobs SET status = 'pending', updated_at = NOW() WHERE status = 'processing' AND updated_at < $1",
    )
    .bind(now - Duration::minutes(STALE_PROCESSING_MINUTES))
    .execute(pool)
    .await?
    .rows_affected();
    if reclaimed > 0 {
        warn!(reclaimed, "re-pended jobs orphaned in processing");
    }

    let due = sqlx::query_as::<_, DueJob>(
        r#"
        UPDATE scheduled_jobs
        SET status = 'processing', attempts = attempts + 1, updated_at = NOW()
        WHERE id IN (
            SELECT id FROM scheduled_jobs
            WHERE status = 'pending' AND run_at <= $1
            ORDER BY run_at
            LIMIT 20
            FOR UPDATE SKIP LOCKED
        )
        RETURNING id, booking_id, job_type, attempts
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    let mut processed = 0;
    for job in due {
        match run_job(pool, collaborators, &job).await {
            Ok(outcome) => {
                finish_job(pool, job.id, outcome, None).await?;
                info!(job_id = %job.id, booking_id = %job.booking_id, job_type = %job.job_type, outcome, "scheduled job finished");
                processed += 1;
            }
            Err(err) => {
                if job.attempts >= MAX_ATTEMPTS {
                    finish_job(pool, job.id, "failed", Some(&err.to_string())).await?;
                    warn!(?err, job_id = %job.id, booking_id = %job.booking_id, "scheduled job exhausted retries");
                } else {
                    // Push the job back for another attempt.
                    sqlx::query(
                        "UPDATE scheduled_jobs SET status = 'pending', run_at = $2, last_error = $3, updated_at = NOW() WHERE id = $1",
                    )
                    .bind(job.id)
                    .bind(now + Duration::hours(1))
                    .bind(err.to_string())
                    .execute(pool)
                    .await?;
                    warn!(?err, job_id = %job.id, booking_id = %job.booking_id, attempts = job.attempts, "scheduled job failed, will retry");
                }
            }
        }
    }
    Ok(processed)
}

async fn run_job(
    pool: &PgPool,
    collaborators: &CollaboratorClient,
    job: &DueJob,
) -> anyhow::Result<&'static str> {
    let Some(job_type) = JobType::parse(&job.job_type) else {
        anyhow::bail!("unknown job type '{}'", job.job_type);
    };

    let booking: Option<Booking> = sqlx::query_as("SELECT * FROM bookings WHERE id = $1")
        .bind(job.booking_id)
        .fetch_optional(pool)
        .await?;
    let Some(booking) = booking else {
        anyhow::bail!("booking {} no longer exists", job.booking_id);
    };
    // A balance settled between scheduling and execution makes the job moot.
    if booking.balance_settled() {
        return Ok("cancelled");
    }

    let kind = match job_type {
        JobType::CreateBalancePaymentLink => "balance_payment_link",
        JobType::BalanceRetry1 | JobType::BalanceRetry2 | JobType::BalanceRetry3 => {
            "balance_reminder"
        }
    };
    collaborators
        .send_customer_confirmation(&json!({
            "kind": kind,
            "booking_id": job.booking_id,
            "job_type": job.job_type,
        }))
        .await?;
    Ok("completed")
}

async fn finish_job(
    pool: &PgPool,
    job_id: uuid::Uuid,
    status: &str,
    last_error: Option<&str>,
) -> sqlx::Result<()> {
    sqlx::query(
        "UPDATE scheduled_jobs SET status = $2, last_error = COALESCE($3, last_error), updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .bind(status)
    .bind(last_error)
    .execute(pool)
    .await?;
    Ok(())
}
