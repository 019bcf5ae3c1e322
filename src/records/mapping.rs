//! Patient-Doctor Mappings
//! Mission: Link patients to doctors; ownership follows the patient

use crate::auth::models::UserId;
use crate::db::Database;
use crate::policy::Owned;
use crate::validation::{self, FieldErrors};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// Stored mapping, joined with its patient and doctor. The owner is read
/// from the patient row on every load, never stored on the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub patient_name: String,
    pub doctor_name: String,
    pub patient_owner: UserId,
    pub assigned_at: String,
}

impl Owned for Mapping {
    const KIND: &'static str = "Mapping";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn permits(&self, identity: UserId) -> bool {
        self.patient_owner == identity
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MappingPayload {
    pub patient: Option<i64>,
    pub doctor: Option<i64>,
}

impl MappingPayload {
    /// Returns `(patient_id, doctor_id)`
    pub fn validate(self) -> Result<(i64, i64), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.patient.is_none() {
            errors.add("patient", validation::REQUIRED);
        }
        if self.doctor.is_none() {
            errors.add("doctor", validation::REQUIRED);
        }
        match (self.patient, self.doctor) {
            (Some(patient), Some(doctor)) => Ok((patient, doctor)),
            _ => Err(errors),
        }
    }
}

pub fn does_not_exist(pk: i64) -> String {
    format!("Invalid pk \"{pk}\" - object does not exist.")
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingResponse {
    pub id: i64,
    pub patient: i64,
    pub doctor: i64,
    pub patient_name: String,
    pub doctor_name: String,
    pub assigned_at: String,
}

impl MappingResponse {
    pub fn from_mapping(mapping: &Mapping) -> Self {
        Self {
            id: mapping.id,
            patient: mapping.patient_id,
            doctor: mapping.doctor_id,
            patient_name: mapping.patient_name.clone(),
            doctor_name: mapping.doctor_name.clone(),
            assigned_at: mapping.assigned_at.clone(),
        }
    }
}

pub trait MappingRepository: Send + Sync {
    /// All mappings, or only those of one patient. No ownership scoping.
    fn list(&self, patient_id: Option<i64>) -> Result<Vec<Mapping>>;

    fn find(&self, id: i64) -> Result<Option<Mapping>>;

    fn insert(&self, patient_id: i64, doctor_id: i64, assigned_at: &str) -> Result<Mapping>;

    fn delete(&self, id: i64) -> Result<bool>;
}

const MAPPING_SELECT: &str = "SELECT m.id, m.patient_id, m.doctor_id, p.name, d.name,
        p.created_by, m.assigned_at
     FROM patient_doctor_mappings m
     JOIN patients p ON p.id = m.patient_id
     JOIN doctors d ON d.id = m.doctor_id";

fn row_to_mapping(row: &Row<'_>) -> rusqlite::Result<Mapping> {
    Ok(Mapping {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        patient_name: row.get(3)?,
        doctor_name: row.get(4)?,
        patient_owner: row.get(5)?,
        assigned_at: row.get(6)?,
    })
}

fn query_mapping(conn: &Connection, id: i64) -> Result<Option<Mapping>> {
    let mapping = conn
        .query_row(
            &format!("{MAPPING_SELECT} WHERE m.id = ?1"),
            params![id],
            row_to_mapping,
        )
        .optional()?;
    Ok(mapping)
}

impl MappingRepository for Database {
    fn list(&self, patient_id: Option<i64>) -> Result<Vec<Mapping>> {
        let conn = self.conn();
        let mappings = match patient_id {
            Some(patient_id) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "{MAPPING_SELECT} WHERE m.patient_id = ?1 ORDER BY m.id"
                ))?;
                let rows = stmt
                    .query_map(params![patient_id], row_to_mapping)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!("{MAPPING_SELECT} ORDER BY m.id"))?;
                let rows = stmt
                    .query_map([], row_to_mapping)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(mappings)
    }

    fn find(&self, id: i64) -> Result<Option<Mapping>> {
        query_mapping(&self.conn(), id)
    }

    fn insert(&self, patient_id: i64, doctor_id: i64, assigned_at: &str) -> Result<Mapping> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO patient_doctor_mappings (patient_id, doctor_id, assigned_at)
             VALUES (?1, ?2, ?3)",
            params![patient_id, doctor_id, assigned_at],
        )
        .context("Failed to insert mapping")?;

        query_mapping(&conn, conn.last_insert_rowid())?.context("Inserted mapping not found")
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute(
                "DELETE FROM patient_doctor_mappings WHERE id = ?1",
                params![id],
            )
            .context("Failed to delete mapping")?;
        Ok(rows > 0)
    }
}
