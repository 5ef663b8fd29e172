use axum::{
    routing::{get, post},
    Router,
};

use crate::{bookings, payments};

pub fn api_routes() -> Router {
    Router::new()
        .route("/api/payments/webhook", post(payments::payment_webhook))
        .route("/api/bookings", get(bookings::list_bookings))
        .route("/api/bookings/:id", get(bookings::get_booking))
        .route("/api/bookings/:id/events", get(bookings::booking_events))
        .route("/api/bookings/:id/jobs", get(bookings::booking_jobs))
        .route("/api/bookings/:id/payments", get(bookings::booking_payment_events))
        .route(
            "/api/bookings/:id/addon-invoices",
            get(bookings::booking_addon_invoices),
        )
        .route("/api/bookings/:id/revenue", get(bookings::booking_revenue))
        .route("/api/invoices", get(bookings::list_invoices))
        .route("/api/invoices/:id", get(bookings::get_invoice))
}
