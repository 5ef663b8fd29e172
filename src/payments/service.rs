use sqlx::PgPool;
use uuid::Uuid;

/// Result of a guarded state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The guarded write applied; this call performed the transition.
    Applied,
    /// The paid-at guard held: the target was already settled by an earlier
    /// event. A successful no-op, not an error.
    AlreadySettled,
    /// The referenced booking or invoice does not exist.
    NotFound,
}

/// key: payments-service -> booking/invoice state machine
///
/// Every transition is a single guarded UPDATE that sets the status, the
/// paid-at timestamp, and the provider reference ids in one statement. The
/// paid-at guard is the application-level idempotency backstop beneath the
/// event ledger: it also catches two distinct provider events claiming the
/// same payment.
#[derive(Clone)]
pub struct PaymentService {
    pool: PgPool,
}

impl PaymentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn apply_deposit(
        &self,
        booking_id: Uuid,
        session_id: Option<&str>,
        payment_intent_id: Option<&str>,
    ) -> sqlx::Result<TransitionOutcome> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE bookings
            SET payment_status = 'deposit_paid',
                deposit_paid_at = NOW(),
                provider_session_id = COALESCE($2, provider_session_id),
                provider_payment_intent_id = COALESCE($3, provider_payment_intent_id),
                updated_at = NOW()
            WHERE id = $1 AND deposit_paid_at IS NULL
            RETURNING id
            "#,
        )
        .bind(booking_id)
        .bind(session_id)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(_) => Ok(TransitionOutcome::Applied),
            None => self.booking_guard_outcome(booking_id).await,
        }
    }

    /// Balance transitions do not require the deposit to be settled first;
    /// provider events carry no cross-event ordering guarantee.
    pub async fn apply_balance(
        &self,
        booking_id: Uuid,
        session_id: Option<&str>,
        payment_intent_id: Option<&str>,
    ) -> sqlx::Result<TransitionOutcome> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE bookings
            SET payment_status = 'fully_paid',
                balance_paid_at = NOW(),
                provider_session_id = COALESCE($2, provider_session_id),
                provider_payment_intent_id = COALESCE($3, provider_payment_intent_id),
                updated_at = NOW()
            WHERE id = $1 AND balance_paid_at IS NULL
            RETURNING id
            "#,
        )
        .bind(booking_id)
        .bind(session_id)
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(_) => Ok(TransitionOutcome::Applied),
            None => self.booking_guard_outcome(booking_id).await,
        }
    }

    pub async fn apply_addon_invoice(
        &self,
        invoice_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> sqlx::Result<TransitionOutcome> {
        self.apply_invoice("addon_invoices", invoice_id, payment_intent_id)
            .await
    }

    pub async fn apply_standalone_invoice(
        &self,
        invoice_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> sqlx::Result<TransitionOutcome> {
        self.apply_invoice("invoices", invoice_id, payment_intent_id)
            .await
    }

    async fn apply_invoice(
        &self,
        table: &str,
        invoice_id: Uuid,
        payment_intent_id: Option<&str>,
    ) -> sqlx::Result<TransitionOutcome> {
        let query = format!(
            r#"
            UPDATE {table}
            SET payment_status = 'paid',
                paid_at = NOW(),
                provider_payment_intent_id = COALESCE($2, provider_payment_intent_id)
            WHERE id = $1 AND paid_at IS NULL
            RETURNING id
            "#
        );
        let updated: Option<Uuid> = sqlx::query_scalar(&query)
            .bind(invoice_id)
            .bind(payment_intent_id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(_) => Ok(TransitionOutcome::Applied),
            None => self.invoice_guard_outcome(table, invoice_id).await,
        }
    }

    /// Expiry of a standalone invoice's checkout session. Only a still-pending
    /// invoice moves to `expired`; a race with a payment notification leaves
    /// the paid state untouched.
    pub async fn expire_standalone_invoice(
        &self,
        invoice_id: Uuid,
    ) -> sqlx::Result<TransitionOutcome> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE invoices
            SET payment_status = 'expired'
            WHERE id = $1 AND payment_status = 'pending'
            RETURNING id
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(_) => Ok(TransitionOutcome::Applied),
            None => self.invoice_guard_outcome("invoices", invoice_id).await,
        }
    }

    /// Write a row to the append-only domain audit trail.
    pub async fn record_booking_event(
        &self,
        booking_id: Option<Uuid>,
        event_type: &str,
        metadata: serde_json::Value,
    ) -> sqlx::Result<()> {
        sqlx::query(
            "INSERT INTO booking_events (id, booking_id, event_type, metadata) VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(event_type)
        .bind(metadata)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Populate a revenue line for a settled payment.
    pub async fn add_revenue_line(
        &self,
        booking_id: Option<Uuid>,
        invoice_id: Option<Uuid>,
        category: &str,
        amount_cents: i64,
        currency: &str,
    ) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revenue_line_items (id, booking_id, invoice_id, category, amount_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking_id)
        .bind(invoice_id)
        .bind(category)
        .bind(amount_cents)
        .bind(currency)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn booking_guard_outcome(&self, booking_id: Uuid) -> sqlx::Result<TransitionOutcome> {
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match exists {
            Some(_) => TransitionOutcome::AlreadySettled,
            None => TransitionOutcome::NotFound,
        })
    }

    async fn invoice_guard_outcome(
        &self,
        table: &str,
        invoice_id: Uuid,
    ) -> sqlx::Result<TransitionOutcome> {
        let query = format!("SELECT id FROM {table} WHERE id = $1");
        let exists: Option<Uuid> = sqlx::query_scalar(&query)
            .bind(invoice_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(match exists {
            Some(_) => TransitionOutcome::AlreadySettled,
            None => TransitionOutcome::NotFound,
        })
    }
}
