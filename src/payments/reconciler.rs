use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::collaborators::CollaboratorClient;
use crate::config::ReconcilerConfig;
use crate::error::AppError;
use crate::jobs;

use super::classifier::{self, ClassifiedPayment, PaymentCategory, ProviderEvent};
use super::ledger;
use super::policy;
use super::service::{PaymentService, TransitionOutcome};
use super::side_effects::{run_isolated, SideEffect};
use super::signature;

pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";

/// A safe no-op outcome, reported to the provider as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The event id is already in the ledger.
    AlreadyProcessed,
    /// The booking's policy opts out of payment post-processing.
    Policy,
    /// The paid-at guard held: a different event already settled this payment.
    Duplicate,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::AlreadyProcessed => "already_processed",
            SkipReason::Policy => "policy",
            SkipReason::Duplicate => "duplicate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    Skipped(SkipReason),
}

/// key: payments-reconciler -> exactly-once booking lifecycle orchestration
///
/// Fixed per-event sequence: signature verify, ledger check, policy gate,
/// classification, guarded state transition, stale-job cancellation (balance
/// only), isolated side effects, ledger commit. The ledger write is the final
/// step so a crash mid-processing leaves the event unledgered and provider
/// redelivery retries it.
pub struct PaymentReconciler {
    pool: PgPool,
    config: ReconcilerConfig,
    collaborators: Arc<CollaboratorClient>,
}

impl PaymentReconciler {
    pub fn new(pool: PgPool, config: ReconcilerConfig) -> Self {
        let collaborators = Arc::new(CollaboratorClient::new(&config));
        Self {
            pool,
            config,
            collaborators,
        }
    }

    pub fn collaborators(&self) -> Arc<CollaboratorClient> {
        self.collaborators.clone()
    }

    pub async fn process(
        &self,
        body: &[u8],
        signature_header: Option<&str>,
    ) -> Result<WebhookOutcome, AppError> {
        let secret = self
            .config
            .signing_secret
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("webhook signing secret not configured".into()))?;
        let header = signature_header
            .ok_or_else(|| AppError::BadRequest("missing signature header".into()))?;
        signature::verify(
            secret,
            header,
            body,
            self.config.signature_tolerance_secs,
            Utc::now().timestamp(),
        )
        .map_err(|_| AppError::InvalidSignature)?;

        let event: ProviderEvent = serde_json::from_slice(body)
            .map_err(|err| AppError::BadRequest(format!("malformed event payload: {err}")))?;

        if ledger::already_processed(&self.pool, &event.id).await? {
            return Ok(WebhookOutcome::Skipped(SkipReason::AlreadyProcessed));
        }

        match event.event_type.as_str() {
            CHECKOUT_COMPLETED => self.handle_completed(&event).await,
            CHECKOUT_EXPIRED => self.handle_expired(&event).await,
            other => {
                info!(event_id = %event.id, event_type = other, "ignoring unhandled event type");
                ledger::record(
                    &self.pool,
                    &event.id,
                    &event.event_type,
                    None,
                    json!({ "ignored": true }),
                )
                .await?;
                Ok(WebhookOutcome::Processed)
            }
        }
    }

    async fn handle_completed(&self, event: &ProviderEvent) -> Result<WebhookOutcome, AppError> {
        let session = &event.data.object;
        let classified = classifier::classify(&event.id, session)?;

        let booking_policy = match classified.booking_id {
            Some(booking_id) => policy::resolve(&self.pool, booking_id).await?,
            None => None,
        };
        if classified.booking_id.is_some() && !policy::payment_required(&booking_policy) {
            info!(
                event_id = %event.id,
                booking_id = ?classified.booking_id,
                policy = ?booking_policy.as_ref().map(|p| p.policy_name.as_str()),
                "policy opts out of payment processing, ledgering as skipped",
            );
            ledger::record(
                &self.pool,
                &event.id,
                &event.event_type,
                classified.booking_id,
                json!({ "skipped": "policy" }),
            )
            .await?;
            return Ok(WebhookOutcome::Skipped(SkipReason::Policy));
        }

        let service = PaymentService::new(self.pool.clone());
        let session_id = session.id.as_deref();
        let payment_intent = session.payment_intent.as_deref();

        // Single guarded write per category. A database failure here aborts
        // the request before any side effects, leaving the event unledgered.
        let outcome = match classified.category {
            PaymentCategory::Deposit => {
                let booking_id = required_booking(&classified)?;
                service
                    .apply_deposit(booking_id, session_id, payment_intent)
                    .await?
            }
            PaymentCategory::Balance => {
                let booking_id = required_booking(&classified)?;
                service
                    .apply_balance(booking_id, session_id, payment_intent)
                    .await?
            }
            PaymentCategory::AddonInvoice => {
                let invoice_id = required_invoice(&classified)?;
                service.apply_addon_invoice(invoice_id, payment_intent).await?
            }
            PaymentCategory::StandaloneInvoice => {
                let invoice_id = required_invoice(&classified)?;
                service
                    .apply_standalone_invoice(invoice_id, payment_intent)
                    .await?
            }
        };

        match outcome {
            TransitionOutcome::NotFound => Err(AppError::MissingReference(format!(
                "{} target not found",
                classified.category.as_str()
            ))),
            TransitionOutcome::AlreadySettled => {
                info!(
                    event_id = %event.id,
                    category = classified.category.as_str(),
                    "paid-at guard held, ledgering duplicate payment event",
                );
                ledger::record(
                    &self.pool,
                    &event.id,
                    &event.event_type,
                    classified.booking_id,
                    json!({ "skipped": "duplicate", "category": classified.category.as_str() }),
                )
                .await?;
                Ok(WebhookOutcome::Skipped(SkipReason::Duplicate))
            }
            TransitionOutcome::Applied => {
                if classified.category == PaymentCategory::Balance {
                    self.cancel_stale_balance_jobs(event, &classified).await;
                }
                self.audit(event, &classified, &service).await;

                let effects = self.build_side_effects(event, &classified, &booking_policy);
                run_isolated(&event.id, classified.booking_id, effects).await;

                ledger::record(
                    &self.pool,
                    &event.id,
                    &event.event_type,
                    classified.booking_id,
                    json!({
                        "category": classified.category.as_str(),
                        "invoice_id": classified.invoice_id,
                        "amount_cents": session.amount_total,
                    }),
                )
                .await?;
                Ok(WebhookOutcome::Processed)
            }
        }
    }

    async fn handle_expired(&self, event: &ProviderEvent) -> Result<WebhookOutcome, AppError> {
        let session = &event.data.object;
        let classified = classifier::classify(&event.id, session)?;

        // Only standalone invoices track session expiry; expired deposit or
        // balance sessions are recreated from the booking flow.
        if classified.category != PaymentCategory::StandaloneInvoice {
            ledger::record(
                &self.pool,
                &event.id,
                &event.event_type,
                classified.booking_id,
                json!({ "ignored": true, "category": classified.category.as_str() }),
            )
            .await?;
            return Ok(WebhookOutcome::Processed);
        }

        let invoice_id = required_invoice(&classified)?;
        let service = PaymentService::new(self.pool.clone());
        match service.expire_standalone_invoice(invoice_id).await? {
            TransitionOutcome::NotFound => Err(AppError::MissingReference(format!(
                "invoice {invoice_id} not found"
            ))),
            TransitionOutcome::AlreadySettled => {
                // Raced with a payment notification; the settled state wins.
                ledger::record(
                    &self.pool,
                    &event.id,
                    &event.event_type,
                    None,
                    json!({ "skipped": "duplicate", "invoice_id": invoice_id }),
                )
                .await?;
                Ok(WebhookOutcome::Skipped(SkipReason::Duplicate))
            }
            TransitionOutcome::Applied => {
                if let Err(err) = service
                    .record_booking_event(None, "invoice_expired", json!({ "invoice_id": invoice_id }))
                    .await
                {
                    warn!(?err, event_id = %event.id, %invoice_id, "failed to write audit event");
                }
                ledger::record(
                    &self.pool,
                    &event.id,
                    &event.event_type,
                    None,
                    json!({ "invoice_id": invoice_id }),
                )
                .await?;
                Ok(WebhookOutcome::Processed)
            }
        }
    }

    async fn cancel_stale_balance_jobs(&self, event: &ProviderEvent, classified: &ClassifiedPayment) {
        let Some(booking_id) = classified.booking_id else {
            return;
        };
        // Best effort: a late-firing stale job is a lesser harm than failing
        // an already-paid booking.
        match jobs::cancel_pending_balance_jobs(&self.pool, booking_id).await {
            Ok(cancelled) if cancelled > 0 => {
                info!(event_id = %event.id, %booking_id, cancelled, "cancelled stale balance jobs");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(?err, event_id = %event.id, %booking_id, "failed to cancel stale balance jobs");
            }
        }
    }

    async fn audit(
        &self,
        event: &ProviderEvent,
        classified: &ClassifiedPayment,
        service: &PaymentService,
    ) {
        let audit_type = match classified.category {
            PaymentCategory::Deposit => "deposit_paid",
            PaymentCategory::Balance => "balance_paid",
            PaymentCategory::AddonInvoice => "addon_invoice_paid",
            PaymentCategory::StandaloneInvoice => "invoice_paid",
        };
        if let Err(err) = service
            .record_booking_event(
                classified.booking_id,
                audit_type,
                json!({
                    "event_id": event.id,
                    "invoice_id": classified.invoice_id,
                    "amount_cents": event.data.object.amount_total,
                }),
            )
            .await
        {
            warn!(?err, event_id = %event.id, audit_type, "failed to write audit event");
        }
    }

    fn build_side_effects(
        &self,
        event: &ProviderEvent,
        classified: &ClassifiedPayment,
        booking_policy: &Option<super::models::BookingPolicy>,
    ) -> Vec<SideEffect> {
        let session = &event.data.object;
        let payload = json!({
            "event_id": event.id,
            "category": classified.category.as_str(),
            "booking_id": classified.booking_id,
            "invoice_id": classified.invoice_id,
            "amount_cents": session.amount_total,
            "currency": session.currency,
        });

        let mut effects = Vec::new();

        let collaborators = self.collaborators.clone();
        let staff_payload = payload.clone();
        effects.push(SideEffect::new("staff_notification", async move {
            collaborators.notify_staff(&staff_payload).await
        }));

        if policy::confirmation_allowed(booking_policy) {
            let collaborators = self.collaborators.clone();
            let customer_payload = payload.clone();
            effects.push(SideEffect::new("customer_confirmation", async move {
                collaborators
                    .send_customer_confirmation(&customer_payload)
                    .await
            }));
        }

        let collaborators = self.collaborators.clone();
        let crm_payload = payload.clone();
        effects.push(SideEffect::new("crm_sync", async move {
            collaborators.sync_crm(&crm_payload).await
        }));

        if classified.category == PaymentCategory::Deposit {
            if let Some(booking_id) = classified.booking_id {
                let pool = self.pool.clone();
                let due_days = self.config.balance_due_days;
                let offsets = self.config.balance_retry_offset_days.clone();
                effects.push(SideEffect::new("schedule_balance_jobs", async move {
                    jobs::schedule_balance_jobs(&pool, booking_id, due_days, &offsets).await?;
                    Ok(())
                }));
            }
        }

        let service = PaymentService::new(self.pool.clone());
        let booking_id = classified.booking_id;
        let invoice_id = classified.invoice_id;
        let category = classified.category.as_str();
        let amount = session.amount_total.unwrap_or(0);
        let currency = session.currency.clone().unwrap_or_else(|| "usd".to_string());
        effects.push(SideEffect::new("revenue_line", async move {
            service
                .add_revenue_line(booking_id, invoice_id, category, amount, &currency)
                .await?;
            Ok(())
        }));

        effects
    }
}

fn required_booking(classified: &ClassifiedPayment) -> Result<Uuid, AppError> {
    classified
        .booking_id
        .ok_or_else(|| AppError::MissingReference("booking_id".into()))
}

fn required_invoice(classified: &ClassifiedPayment) -> Result<Uuid, AppError> {
    classified
        .invoice_id
        .ok_or_else(|| AppError::MissingReference("invoice_id".into()))
}
