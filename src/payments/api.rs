use std::sync::Arc;

use axum::{extract::Extension, http::HeaderMap, Json};
use serde::Serialize;

use crate::error::AppResult;

use super::reconciler::{PaymentReconciler, WebhookOutcome};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// key: payments-api -> webhook entry point
///
/// Takes the raw body so the signature covers exactly the bytes the provider
/// signed. All safe no-ops respond 200 so the provider stops redelivering.
pub async fn payment_webhook(
    Extension(reconciler): Extension<Arc<PaymentReconciler>>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> AppResult<Json<WebhookResponse>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let outcome = reconciler.process(&body, signature).await?;
    Ok(Json(WebhookResponse::from(outcome)))
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<&'static str>,
}

impl From<WebhookOutcome> for WebhookResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        match outcome {
            WebhookOutcome::Processed => WebhookResponse {
                received: true,
                skipped: None,
            },
            WebhookOutcome::Skipped(reason) => WebhookResponse {
                received: true,
                skipped: Some(reason.as_str()),
            },
        }
    }
}
