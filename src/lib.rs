pub mod bookings;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod jobs;
pub mod payments;
pub mod routes;
