//! Patient-doctor mapping endpoints
//!
//! Retrieve and delete are gated on the owner of the referenced patient.
//! Listing by `patient_id` is not scoped to the caller.

use crate::api::{
    error::ApiError,
    extract::{RecordId, ValidJson},
    get_object,
};
use crate::auth::Identity;
use crate::db::is_constraint_violation;
use crate::policy::Owned;
use crate::records::{
    mapping::does_not_exist, Mapping, MappingPayload, MappingResponse,
};
use crate::state::AppState;
use crate::validation::FieldErrors;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

pub const NOT_YOUR_PATIENT: &str = "You can only assign doctors to your own patients.";

#[derive(Debug, Default, Deserialize)]
pub struct MappingListQuery {
    pub patient_id: Option<String>,
}

impl MappingListQuery {
    /// An empty `patient_id` means no filter
    fn patient_id(&self) -> Result<Option<i64>, ApiError> {
        match self.patient_id.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::validation("patient_id must be an integer")),
        }
    }
}

fn list(state: &AppState, patient_id: Option<i64>) -> Result<Json<Vec<MappingResponse>>, ApiError> {
    let mappings = state.mappings.list(patient_id)?;
    Ok(Json(
        mappings.iter().map(MappingResponse::from_mapping).collect(),
    ))
}

/// GET /mappings?patient_id=
pub async fn list_mappings(
    State(state): State<AppState>,
    Query(query): Query<MappingListQuery>,
) -> Result<Json<Vec<MappingResponse>>, ApiError> {
    list(&state, query.patient_id()?)
}

/// GET /mappings/patient/:patient_id
pub async fn list_patient_mappings(
    State(state): State<AppState>,
    RecordId(patient_id): RecordId,
) -> Result<Json<Vec<MappingResponse>>, ApiError> {
    list(&state, Some(patient_id))
}

/// POST /mappings
pub async fn create_mapping(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    ValidJson(payload): ValidJson<MappingPayload>,
) -> Result<(StatusCode, Json<MappingResponse>), ApiError> {
    let (patient_id, doctor_id) = payload.validate()?;

    let patient = state.patients.find(patient_id)?;
    let doctor = state.doctors.find(doctor_id)?;

    let mut errors = FieldErrors::new();
    if patient.is_none() {
        errors.add("patient", does_not_exist(patient_id));
    }
    if doctor.is_none() {
        errors.add("doctor", does_not_exist(doctor_id));
    }
    let (Some(patient), Some(_)) = (patient, doctor) else {
        return Err(errors.into());
    };

    if !patient.permits(identity.user_id) {
        warn!(
            patient_id,
            user_id = identity.user_id,
            "Mapping rejected: patient owned by another user"
        );
        return Err(ApiError::validation(NOT_YOUR_PATIENT));
    }

    let assigned_at = Utc::now().to_rfc3339();
    let mapping = state
        .mappings
        .insert(patient_id, doctor_id, &assigned_at)
        .map_err(|e| {
            if is_constraint_violation(&e) {
                ApiError::validation("Referenced patient or doctor no longer exists.")
            } else {
                ApiError::from(e)
            }
        })?;

    info!(
        mapping_id = mapping.id,
        patient_id,
        doctor_id,
        user_id = identity.user_id,
        "Doctor assigned to patient"
    );

    Ok((
        StatusCode::CREATED,
        Json(MappingResponse::from_mapping(&mapping)),
    ))
}

fn locate(state: &AppState, identity: &Identity, id: i64) -> Result<Mapping, ApiError> {
    get_object(identity, state.mappings.find(id)?)
}

/// GET /mappings/:id
pub async fn get_mapping(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<Json<MappingResponse>, ApiError> {
    let mapping = locate(&state, &identity, id)?;
    Ok(Json(MappingResponse::from_mapping(&mapping)))
}

/// DELETE /mappings/:id
pub async fn delete_mapping(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    RecordId(id): RecordId,
) -> Result<StatusCode, ApiError> {
    locate(&state, &identity, id)?;

    if !state.mappings.delete(id)? {
        return Err(ApiError::NotFound(Mapping::KIND));
    }

    info!(mapping_id = id, user_id = identity.user_id, "Mapping deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(raw: Option<&str>) -> MappingListQuery {
        MappingListQuery {
            patient_id: raw.map(str::to_string),
        }
    }

    #[test]
    fn test_patient_id_query_parsing() {
        assert_eq!(query(None).patient_id().unwrap(), None);
        assert_eq!(query(Some("")).patient_id().unwrap(), None);
        assert_eq!(query(Some("12")).patient_id().unwrap(), Some(12));
        assert!(matches!(
            query(Some("abc")).patient_id(),
            Err(ApiError::Validation { .. })
        ));
    }
}
