use once_cell::sync::Lazy;

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. Defaults to `3000`.
pub static BIND_PORT: Lazy<u16> = Lazy::new(|| {
    std::env::var("BIND_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3000)
});

/// When set to a truthy value, allows the application to continue running even if database
/// migrations fail. Defaults to `false`.
pub static ALLOW_MIGRATION_FAILURE: Lazy<bool> = Lazy::new(|| {
    std::env::var("ALLOW_MIGRATION_FAILURE")
        .ok()
        .map(|value| {
            let normalized = value.trim().to_ascii_lowercase();
            matches!(normalized.as_str(), "1" | "true" | "yes")
        })
        .unwrap_or(false)
});

/// key: payments-config -> webhook signing secret shared with the provider
pub static WEBHOOK_SIGNING_SECRET: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("WEBHOOK_SIGNING_SECRET"));

/// key: payments-config -> max age of a signed webhook timestamp
pub static WEBHOOK_SIGNATURE_TOLERANCE_SECS: Lazy<i64> = Lazy::new(|| {
    std::env::var("WEBHOOK_SIGNATURE_TOLERANCE_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(300)
});

/// key: payments-config -> collaborator endpoints for post-transition actions
pub static STAFF_NOTIFY_URL: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("STAFF_NOTIFY_URL"));
pub static CUSTOMER_EMAIL_URL: Lazy<Option<String>> =
    Lazy::new(|| read_optional_env("CUSTOMER_EMAIL_URL"));
pub static CRM_SYNC_URL: Lazy<Option<String>> = Lazy::new(|| read_optional_env("CRM_SYNC_URL"));

/// key: payments-config -> timeout applied to each outbound collaborator call
pub static OUTBOUND_TIMEOUT_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("OUTBOUND_TIMEOUT_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(10)
});

/// key: jobs-config -> worker poll cadence
pub static JOB_SCAN_INTERVAL_SECS: Lazy<u64> = Lazy::new(|| {
    std::env::var("JOB_SCAN_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(60)
});

/// key: jobs-config -> days after a deposit before the balance link job runs
pub static BALANCE_DUE_DAYS: Lazy<i64> = Lazy::new(|| {
    std::env::var("BALANCE_DUE_DAYS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value >= 0)
        .unwrap_or(14)
});

/// key: jobs-config -> staggered reminder offsets, comma-separated days after the link job
pub static BALANCE_RETRY_OFFSET_DAYS: Lazy<Vec<i64>> = Lazy::new(|| {
    std::env::var("BALANCE_RETRY_OFFSET_DAYS")
        .ok()
        .map(|value| {
            value
                .split(',')
                .filter_map(|raw| raw.trim().parse::<i64>().ok())
                .collect::<Vec<_>>()
        })
        .filter(|offsets| !offsets.is_empty())
        .unwrap_or_else(|| vec![3, 7, 10])
});

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Explicit configuration handed to the reconciler at construction time.
/// Tests build this directly instead of going through the environment.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub signing_secret: Option<String>,
    pub signature_tolerance_secs: i64,
    pub staff_notify_url: Option<String>,
    pub customer_email_url: Option<String>,
    pub crm_sync_url: Option<String>,
    pub outbound_timeout_secs: u64,
    pub balance_due_days: i64,
    pub balance_retry_offset_days: Vec<i64>,
}

pub fn reconciler_config_from_env() -> ReconcilerConfig {
    ReconcilerConfig {
        signing_secret: WEBHOOK_SIGNING_SECRET.clone(),
        signature_tolerance_secs: *WEBHOOK_SIGNATURE_TOLERANCE_SECS,
        staff_notify_url: STAFF_NOTIFY_URL.clone(),
        customer_email_url: CUSTOMER_EMAIL_URL.clone(),
        crm_sync_url: CRM_SYNC_URL.clone(),
        outbound_timeout_secs: *OUTBOUND_TIMEOUT_SECS,
        balance_due_days: *BALANCE_DUE_DAYS,
        balance_retry_offset_days: BALANCE_RETRY_OFFSET_DAYS.clone(),
    }
}
