use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// key: payments-models -> booking aggregate
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub event_date: Option<NaiveDate>,
    pub total_cents: i64,
    pub deposit_cents: i64,
    pub balance_cents: i64,
    pub package_cents: i64,
    pub tax_cents: i64,
    pub currency: String,
    pub payment_status: String,
    pub lifecycle_status: String,
    pub deposit_paid_at: Option<DateTime<Utc>>,
    pub balance_paid_at: Option<DateTime<Utc>>,
    pub provider_session_id: Option<String>,
    pub provider_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn deposit_settled(&self) -> bool {
        self.deposit_paid_at.is_some()
    }

    pub fn balance_settled(&self) -> bool {
        self.balance_paid_at.is_some()
    }
}

/// key: payments-models -> per-booking post-processing policy
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingPolicy {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub policy_name: String,
    pub requires_payment: bool,
    pub send_customer_confirmation: bool,
    pub created_at: DateTime<Utc>,
}

/// key: payments-models -> standalone payable line item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// key: payments-models -> per-booking add-on line item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AddonInvoice {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub description: String,
    pub amount_cents: i64,
    pub currency: String,
    pub payment_status: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub provider_payment_intent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// key: payments-models -> event ledger row, one per provider event id ever handled
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub id: Uuid,
    pub event_id: String,
    pub event_type: String,
    pub booking_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// key: payments-models -> append-only domain audit trail
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// key: payments-models -> revenue bookkeeping row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RevenueLineItem {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub category: String,
    pub amount_cents: i64,
    pub currency: String,
    pub recognized_at: DateTime<Utc>,
}
