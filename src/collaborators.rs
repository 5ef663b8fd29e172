use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::config::ReconcilerConfig;

/// key: collaborators -> outbound calls to dependent services
///
/// Each call is an independent HTTP POST with its own timeout so one slow
/// dependent cannot hold the webhook connection open. Endpoints left
/// unconfigured are skipped.
pub struct CollaboratorClient {
    client: Client,
    staff_notify_url: Option<String>,
    customer_email_url: Option<String>,
    crm_sync_url: Option<String>,
}

impl CollaboratorClient {
    pub fn new(config: &ReconcilerConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(config.outbound_timeout_secs))
                .build()
                .expect("client build"),
            staff_notify_url: config.staff_notify_url.clone(),
            customer_email_url: config.customer_email_url.clone(),
            crm_sync_url: config.crm_sync_url.clone(),
        }
    }

    pub async fn notify_staff(&self, payload: &Value) -> anyhow::Result<()> {
        self.post(&self.staff_notify_url, "staff notification", payload)
            .await
    }

    pub async fn send_customer_confirmation(&self, payload: &Value) -> anyhow::Result<()> {
        self.post(&self.customer_email_url, "customer confirmation", payload)
            .await
    }

    pub async fn sync_crm(&self, payload: &Value) -> anyhow::Result<()> {
        self.post(&self.crm_sync_url, "crm sync", payload).await
    }

    async fn post(
        &self,
        url: &Option<String>,
        what: &'static str,
        payload: &Value,
    ) -> anyhow::Result<()> {
        let Some(url) = url else {
            tracing::debug!(collaborator = what, "no endpoint configured, skipping");
            return Ok(());
        };
        self.client
            .post(url)
            .json(payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
