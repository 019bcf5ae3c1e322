//! Patient endpoints
//!
//! Lists are scoped to the caller by query; single-record routes go through
//! [`get_object`] so another user's patient is a 403.

use crate::api::{
    error::ApiError,
    extract::{RecordId, ValidJson},
    get_object,
};
use crate::auth::Identity;
use crate::policy::Owned;
use crate::records::{Patient, PatientPayload, PatientResponse};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;

fn locate(state: &AppState, identity: &Identity, id: i64) -> Result<Patient, ApiError> {
    get_object(identity, state.patients.find(id)?)
}

/// GET /patients
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<Vec<PatientResponse>>, ApiError> {
    let patients = state.patients.list_by_owner(identity.user_id)?;
    Ok(Json(
        patients.iter().map(PatientResponse::from_patient).collect(),
    ))
}

/// POST /patients
pub async fn create_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidJson(payload): ValidJson<PatientPayload>,
) -> Result<(StatusCode, Json<PatientResponse>), ApiError> {
    let fields = payload.validate()?;
    let patient = state.patients.insert(identity.user_id, &fields)?;

    info!(
        patient_id = patient.id,
        user_id = identity.user_id,
        "Patient created"
    );

    Ok((
        StatusCode::CREATED,
        Json(PatientResponse::from_patient(&patient)),
    ))
}

/// GET /patients/:id
pub async fn get_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<Json<PatientResponse>, ApiError> {
    let patient = locate(&state, &identity, id)?;
    Ok(Json(PatientResponse::from_patient(&patient)))
}

/// PUT /patients/:id
pub async fn replace_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
    ValidJson(payload): ValidJson<PatientPayload>,
) -> Result<Json<PatientResponse>, ApiError> {
    update(&state, &identity, id, payload, false)
}

/// PATCH /patients/:id
pub async fn patch_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
    ValidJson(payload): ValidJson<PatientPayload>,
) -> Result<Json<PatientResponse>, ApiError> {
    update(&state, &identity, id, payload, true)
}

fn update(
    state: &AppState,
    identity: &Identity,
    id: i64,
    payload: PatientPayload,
    partial: bool,
) -> Result<Json<PatientResponse>, ApiError> {
    let current = locate(state, identity, id)?;

    let payload = if partial {
        payload.merged_with(&current)
    } else {
        payload
    };
    let fields = payload.validate()?;

    // The row can vanish between locate and update under a concurrent delete.
    let patient = state
        .patients
        .update(id, &fields)?
        .ok_or(ApiError::NotFound(Patient::KIND))?;

    Ok(Json(PatientResponse::from_patient(&patient)))
}

/// DELETE /patients/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ApiError> {
    locate(&state, &identity, id)?;

    if !state.patients.delete(id)? {
        return Err(ApiError::NotFound(Patient::KIND));
    }

    info!(patient_id = id, user_id = identity.user_id, "Patient deleted");

    Ok(StatusCode::NO_CONTENT)
}
