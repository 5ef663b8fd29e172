use axum::{
    extract::{Extension, Path},
    Json,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::payments::models::{
    AddonInvoice, Booking, BookingEvent, Invoice, ProcessedEvent, RevenueLineItem,
};

/// key: bookings-api -> read surfaces for the admin dashboards
///
/// Booking intake and editing live outside this service; these endpoints only
/// expose the payment-relevant state the reconciler maintains.
pub async fn list_bookings(Extension(pool): Extension<PgPool>) -> AppResult<Json<Vec<Booking>>> {
    let bookings =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings ORDER BY created_at DESC LIMIT 200")
            .fetch_all(&pool)
            .await?;
    Ok(Json(bookings))
}

pub async fn get_booking(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Booking>> {
    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    booking.map(Json).ok_or(AppError::NotFound)
}

pub async fn booking_events(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<BookingEvent>>> {
    let events = sqlx::query_as::<_, BookingEvent>(
        "SELECT * FROM booking_events WHERE booking_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(events))
}

/// Provider-event ledger entries attributed to a booking.
pub async fn booking_payment_events(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ProcessedEvent>>> {
    let events = sqlx::query_as::<_, ProcessedEvent>(
        "SELECT * FROM processed_events WHERE booking_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(events))
}

pub async fn booking_addon_invoices(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<AddonInvoice>>> {
    let invoices = sqlx::query_as::<_, AddonInvoice>(
        "SELECT * FROM addon_invoices WHERE booking_id = $1 ORDER BY created_at",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(invoices))
}

pub async fn booking_revenue(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<RevenueLineItem>>> {
    let lines = sqlx::query_as::<_, RevenueLineItem>(
        "SELECT * FROM revenue_line_items WHERE booking_id = $1 ORDER BY recognized_at",
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(lines))
}

pub async fn list_invoices(Extension(pool): Extension<PgPool>) -> AppResult<Json<Vec<Invoice>>> {
    let invoices =
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices ORDER BY created_at DESC LIMIT 200")
            .fetch_all(&pool)
            .await?;
    Ok(Json(invoices))
}

pub async fn get_invoice(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await?;
    invoice.map(Json).ok_or(AppError::NotFound)
}

#[derive(Debug, serde::Serialize, sqlx::FromRow)]
pub struct ScheduledJobView {
    pub id: Uuid,
    pub job_type: String,
    pub run_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub attempts: i32,
    pub last_error: Option<String>,
}

pub async fn booking_jobs(
    Extension(pool): Extension<PgPool>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<ScheduledJobView>>> {
    let jobs = sqlx::query_as::<_, ScheduledJobView>(
        r#"
        SELECT id, job_type, run_at, status, attempts, last_error
        FROM scheduled_jobs
        WHERE booking_id = $1
        ORDER BY run_at
        "#,
    )
    .bind(id)
    .fetch_all(&pool)
    .await?;
    Ok(Json(jobs))
}
