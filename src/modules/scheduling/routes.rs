use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    cancel_appointment, complete_appointment, confirm_appointment, create_appointment,
    get_availability, list_slots, replace_availability, reschedule_appointment,
};
use crate::app_state::AppState;

pub fn scheduling_routes() -> Router<AppState> {
    Router::new()
        .route("/providers/:provider_id/slots", get(list_slots))
        .route(
            "/providers/:provider_id/availability",
            get(get_availability).put(replace_availability),
        )
        .route("/appointments", post(create_appointment))
        .route("/appointments/:id/confirm", post(confirm_appointment))
        .route("/appointments/:id/reschedule", post(reschedule_appointment))
        .route("/appointments/:id/cancel", post(cancel_appointment))
        .route("/appointments/:id/complete", post(complete_appointment))
}
