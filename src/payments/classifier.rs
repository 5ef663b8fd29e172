use std::collections::HashMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppError;

/// key: payments-classifier -> provider event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: ProviderEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEventData {
    pub object: CheckoutSession,
}

/// The checkout-session object carried inside completed/expired events.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentCategory {
    Deposit,
    Balance,
    AddonInvoice,
    StandaloneInvoice,
}

impl PaymentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentCategory::Deposit => "deposit",
            PaymentCategory::Balance => "balance",
            PaymentCategory::AddonInvoice => "addon_invoice",
            PaymentCategory::StandaloneInvoice => "standalone_invoice",
        }
    }
}

/// A classified payment together with the reference ids its category requires.
#[derive(Debug, Clone)]
pub struct ClassifiedPayment {
    pub category: PaymentCategory,
    pub booking_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
}

/// Determine the payment category and required reference for a session.
///
/// An absent `payment_type` falls back to `deposit`. This mirrors how untagged
/// checkout sessions have historically been treated; callers get a warn log so
/// misclassified balance payments remain observable.
pub fn classify(event_id: &str, session: &CheckoutSession) -> Result<ClassifiedPayment, AppError> {
    let category = match session.metadata.get("payment_type").map(String::as_str) {
        Some("deposit") => PaymentCategory::Deposit,
        Some("balance") => PaymentCategory::Balance,
        Some("addon_invoice") => PaymentCategory::AddonInvoice,
        Some("standalone_invoice") => PaymentCategory::StandaloneInvoice,
        Some(other) => {
            return Err(AppError::BadRequest(format!(
                "unknown payment_type '{other}'"
            )))
        }
        None => {
            tracing::warn!(%event_id, "payment_type missing from event metadata, assuming deposit");
            PaymentCategory::Deposit
        }
    };

    let booking_id = parse_reference(session, "booking_id")?;
    let invoice_id = parse_reference(session, "invoice_id")?;

    match category {
        PaymentCategory::Deposit | PaymentCategory::Balance => {
            if booking_id.is_none() {
                return Err(AppError::MissingReference(format!(
                    "booking_id absent for {} payment",
                    category.as_str()
                )));
            }
        }
        PaymentCategory::AddonInvoice | PaymentCategory::StandaloneInvoice => {
            if invoice_id.is_none() {
                return Err(AppError::MissingReference(format!(
                    "invoice_id absent for {} payment",
                    category.as_str()
                )));
            }
        }
    }

    Ok(ClassifiedPayment {
        category,
        booking_id,
        invoice_id,
    })
}

fn parse_reference(session: &CheckoutSession, key: &str) -> Result<Option<Uuid>, AppError> {
    match session.metadata.get(key) {
        None => Ok(None),
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| AppError::MissingReference(format!("{key} '{raw}' is not a valid id"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(metadata: &[(&str, &str)]) -> CheckoutSession {
        CheckoutSession {
            id: Some("cs_test".into()),
            payment_intent: Some("pi_test".into()),
            amount_total: Some(50_000),
            currency: Some("usd".into()),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn explicit_balance_category() {
        let booking = Uuid::new_v4().to_string();
        let classified =
            classify("evt_1", &session(&[("payment_type", "balance"), ("booking_id", &booking)]))
                .unwrap();
        assert_eq!(classified.category, PaymentCategory::Balance);
        assert_eq!(classified.booking_id, Some(booking.parse().unwrap()));
    }

    #[test]
    fn missing_payment_type_defaults_to_deposit() {
        let booking = Uuid::new_v4().to_string();
        let classified = classify("evt_1", &session(&[("booking_id", &booking)])).unwrap();
        assert_eq!(classified.category, PaymentCategory::Deposit);
    }

    #[test]
    fn deposit_without_booking_reference_is_rejected() {
        let err = classify("evt_1", &session(&[("payment_type", "deposit")])).unwrap_err();
        assert!(matches!(err, AppError::MissingReference(_)));
    }

    #[test]
    fn invoice_categories_require_invoice_id() {
        let err = classify("evt_1", &session(&[("payment_type", "addon_invoice")])).unwrap_err();
        assert!(matches!(err, AppError::MissingReference(_)));

        let invoice = Uuid::new_v4().to_string();
        let classified = classify(
            "evt_1",
            &session(&[("payment_type", "standalone_invoice"), ("invoice_id", &invoice)]),
        )
        .unwrap();
        assert_eq!(classified.category, PaymentCategory::StandaloneInvoice);
        assert_eq!(classified.invoice_id, Some(invoice.parse().unwrap()));
    }

    #[test]
    fn unknown_payment_type_is_rejected() {
        let err = classify("evt_1", &session(&[("payment_type", "gratuity")])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn garbage_reference_is_rejected() {
        let err = classify(
            "evt_1",
            &session(&[("payment_type", "deposit"), ("booking_id", "not-a-uuid")]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::MissingReference(_)));
    }
}
