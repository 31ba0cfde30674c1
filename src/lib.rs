//! # barberbook-backend
//!
//! Appointment scheduling and conflict-resolution engine for the BarberBook
//! booking platform: recurring weekly availability, derived bookable slots,
//! buffered conflict detection, and the appointment lifecycle behind an
//! axum HTTP surface.

pub mod app;
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod scheduling;
pub mod telemetry;
pub mod websocket;
