//! Doctor endpoints. Any authenticated user may do anything here.

use crate::api::{
    error::ApiError,
    extract::{RecordId, ValidJson},
    get_object,
};
use crate::auth::Identity;
use crate::policy::Owned;
use crate::records::{Doctor, DoctorPayload, DoctorResponse};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;

fn locate(state: &AppState, identity: &Identity, id: i64) -> Result<Doctor, ApiError> {
    get_object(identity, state.doctors.find(id)?)
}

/// GET /doctors
pub async fn list_doctors(
    State(state): State<AppState>,
) -> Result<Json<Vec<DoctorResponse>>, ApiError> {
    Ok(Json(state.doctors.list()?))
}

/// POST /doctors
pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidJson(payload): ValidJson<DoctorPayload>,
) -> Result<(StatusCode, Json<DoctorResponse>), ApiError> {
    let fields = payload.validate()?;
    let doctor = state.doctors.insert(&fields)?;

    info!(
        doctor_id = doctor.id,
        user_id = identity.user_id,
        "Doctor created"
    );

    Ok((StatusCode::CREATED, Json(doctor)))
}

/// GET /doctors/:id
pub async fn get_doctor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<Json<DoctorResponse>, ApiError> {
    Ok(Json(locate(&state, &identity, id)?))
}

/// PUT /doctors/:id
pub async fn replace_doctor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
    ValidJson(payload): ValidJson<DoctorPayload>,
) -> Result<Json<DoctorResponse>, ApiError> {
    update(&state, &identity, id, payload, false)
}

/// PATCH /doctors/:id
pub async fn patch_doctor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
    ValidJson(payload): ValidJson<DoctorPayload>,
) -> Result<Json<DoctorResponse>, ApiError> {
    update(&state, &identity, id, payload, true)
}

fn update(
    state: &AppState,
    identity: &Identity,
    id: i64,
    payload: DoctorPayload,
    partial: bool,
) -> Result<Json<DoctorResponse>, ApiError> {
    let current = locate(state, identity, id)?;

    let payload = if partial {
        payload.merged_with(&current)
    } else {
        payload
    };
    let fields = payload.validate()?;

    let doctor = state
        .doctors
        .update(id, &fields)?
        .ok_or(ApiError::NotFound(Doctor::KIND))?;

    Ok(Json(doctor))
}

/// DELETE /doctors/:id
/// Mappings that reference the doctor go with it.
pub async fn delete_doctor(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ApiError> {
    locate(&state, &identity, id)?;

    if !state.doctors.delete(id)? {
        return Err(ApiError::NotFound(Doctor::KIND));
    }

    info!(doctor_id = id, user_id = identity.user_id, "Doctor deleted");

    Ok(StatusCode::NO_CONTENT)
}
