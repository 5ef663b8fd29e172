use sqlx::PgPool;
use uuid::Uuid;

use super::models::BookingPolicy;

/// key: payments-policy -> zero-or-one policy per booking
pub async fn resolve(pool: &PgPool, booking_id: Uuid) -> sqlx::Result<Option<BookingPolicy>> {
    sqlx::query_as::<_, BookingPolicy>(
        "SELECT * FROM booking_policies WHERE booking_id = $1",
    )
    .bind(booking_id)
    .fetch_optional(pool)
    .await
}

/// A booking with no policy row is treated as payment-required, so real
/// payments are never dropped by a missing configuration row.
pub fn payment_required(policy: &Option<BookingPolicy>) -> bool {
    policy.as_ref().map(|p| p.requires_payment).unwrap_or(true)
}

pub fn confirmation_allowed(policy: &Option<BookingPolicy>) -> bool {
    policy
        .as_ref()
        .map(|p| p.send_customer_confirmation)
        .unwrap_or(true)
}
