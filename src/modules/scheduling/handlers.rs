use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::types::Uuid;
use time::Date;
use validator::Validate;

use crate::app_state::AppState;
use crate::db::models::{
    Appointment, AvailabilityWindow, NewAppointment, NewAvailabilityWindow, RescheduleRequest,
};
use crate::error::{AppError, AppResult};
use crate::scheduling::slots::Slot;

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: Date,
}

pub async fn list_slots(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
) -> AppResult<Json<Vec<Slot>>> {
    let slots = state
        .scheduling
        .list_available_slots(provider_id, query.date)
        .await?;
    Ok(Json(slots))
}

#[derive(Debug, Deserialize)]
pub struct WindowsQuery {
    pub day_of_week: i16,
}

pub async fn get_availability(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Query(query): Query<WindowsQuery>,
) -> AppResult<Json<Vec<AvailabilityWindow>>> {
    let windows = state
        .scheduling
        .windows(provider_id, query.day_of_week)
        .await?;
    Ok(Json(windows))
}

/// Full overwrite of the provider's weekly schedule; the payload is the
/// complete desired set, not a delta.
pub async fn replace_availability(
    State(state): State<AppState>,
    Path(provider_id): Path<Uuid>,
    Json(windows): Json<Vec<NewAvailabilityWindow>>,
) -> AppResult<Json<Vec<AvailabilityWindow>>> {
    for window in &windows {
        window
            .validate()
            .map_err(|err| AppError::Validation(err.to_string()))?;
    }
    let replaced = state
        .scheduling
        .replace_availability(provider_id, windows)
        .await?;
    Ok(Json(replaced))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Json(new): Json<NewAppointment>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    new.validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let appointment = state.scheduling.create_appointment(new).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.scheduling.confirm_appointment(id).await?;
    Ok(Json(appointment))
}

pub async fn reschedule_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<RescheduleRequest>,
) -> AppResult<Json<Appointment>> {
    request
        .validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;
    let appointment = state.scheduling.reschedule_appointment(id, request).await?;
    Ok(Json(appointment))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.scheduling.cancel_appointment(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Appointment>> {
    let appointment = state.scheduling.complete_appointment(id).await?;
    Ok(Json(appointment))
}
