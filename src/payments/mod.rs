pub mod api;
pub mod classifier;
pub mod ledger;
pub mod models;
pub mod policy;
pub mod reconciler;
pub mod service;
pub mod side_effects;
pub mod signature;

pub use api::{payment_webhook, WebhookResponse, SIGNATURE_HEADER};
pub use classifier::{ClassifiedPayment, PaymentCategory, ProviderEvent};
pub use models::{
    AddonInvoice, Booking, BookingEvent, BookingPolicy, Invoice, ProcessedEvent, RevenueLineItem,
};
pub use reconciler::{PaymentReconciler, SkipReason, WebhookOutcome};
pub use service::{PaymentService, TransitionOutcome};
pub use side_effects::{run_isolated, SideEffect, SideEffectFailure};
