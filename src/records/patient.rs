//! Patient Records
//! Mission: Owned patient records, always scoped to their creator

use crate::auth::models::UserId;
use crate::db::Database;
use crate::policy::Owned;
use crate::validation::{self, FieldErrors, Nullable};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const MAX_AGE: u32 = 150;

/// Stored patient. `created_by` is set once at insert and never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub created_by: UserId,
    pub owner_email: String,
    pub created_at: String,
}

impl Owned for Patient {
    const KIND: &'static str = "Patient";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn permits(&self, identity: UserId) -> bool {
        self.created_by == identity
    }
}

/// Validated, client-writable patient attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFields {
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
}

/// Patient body as sent by clients. Unknown keys (`created_by`, `id`, ...)
/// are dropped by deserialization. Each field keeps absent and `null` apart.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PatientPayload {
    #[serde(default, deserialize_with = "validation::nullable")]
    pub name: Nullable<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub age: Nullable<u32>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub gender: Nullable<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub address: Nullable<String>,
}

impl PatientPayload {
    pub fn validate(self) -> Result<PatientFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = validation::required_field(&mut errors, "name", self.name, 100);
        let age = self.age.flatten();
        if let Some(age) = age {
            if age > MAX_AGE {
                errors.add(
                    "age",
                    format!("Ensure this value is less than or equal to {MAX_AGE}."),
                );
            }
        }
        let gender = validation::optional_text(&mut errors, "gender", self.gender.flatten(), 20);
        let address =
            validation::optional_text(&mut errors, "address", self.address.flatten(), 255);

        errors.finish(PatientFields {
            name,
            age,
            gender,
            address,
        })
    }

    /// Partial update: keys the client left out keep their stored value,
    /// an explicit `null` clears the field
    pub fn merged_with(self, current: &Patient) -> Self {
        Self {
            name: self.name.or_else(|| Some(Some(current.name.clone()))),
            age: self.age.or(Some(current.age)),
            gender: self.gender.or_else(|| Some(current.gender.clone())),
            address: self.address.or_else(|| Some(current.address.clone())),
        }
    }
}

/// Patient response; `created_by` is rendered as the owner's email
#[derive(Debug, Clone, Serialize)]
pub struct PatientResponse {
    pub id: i64,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub created_by: String,
    pub created_at: String,
}

impl PatientResponse {
    pub fn from_patient(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name.clone(),
            age: patient.age,
            gender: patient.gender.clone(),
            address: patient.address.clone(),
            created_by: patient.owner_email.clone(),
            created_at: patient.created_at.clone(),
        }
    }
}

pub trait PatientRepository: Send + Sync {
    /// Patients created by `owner`, oldest first
    fn list_by_owner(&self, owner: UserId) -> Result<Vec<Patient>>;

    fn find(&self, id: i64) -> Result<Option<Patient>>;

    fn insert(&self, owner: UserId, fields: &PatientFields) -> Result<Patient>;

    /// `None` when the row no longer exists
    fn update(&self, id: i64, fields: &PatientFields) -> Result<Option<Patient>>;

    /// `false` when there was nothing to delete
    fn delete(&self, id: i64) -> Result<bool>;
}

const PATIENT_SELECT: &str = "SELECT p.id, p.name, p.age, p.gender, p.address,
        p.created_by, u.email, p.created_at
     FROM patients p JOIN users u ON u.id = p.created_by";

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        address: row.get(4)?,
        created_by: row.get(5)?,
        owner_email: row.get(6)?,
        created_at: row.get(7)?,
    })
}

fn query_patient(conn: &Connection, id: i64) -> Result<Option<Patient>> {
    let patient = conn
        .query_row(
            &format!("{PATIENT_SELECT} WHERE p.id = ?1"),
            params![id],
            row_to_patient,
        )
        .optional()?;
    Ok(patient)
}

impl PatientRepository for Database {
    fn list_by_owner(&self, owner: UserId) -> Result<Vec<Patient>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare_cached(&format!("{PATIENT_SELECT} WHERE p.created_by = ?1 ORDER BY p.id"))?;
        let patients = stmt
            .query_map(params![owner], row_to_patient)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(patients)
    }

    fn find(&self, id: i64) -> Result<Option<Patient>> {
        query_patient(&self.conn(), id)
    }

    fn insert(&self, owner: UserId, fields: &PatientFields) -> Result<Patient> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO patients (name, age, gender, address, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                fields.name,
                fields.age,
                fields.gender,
                fields.address,
                owner,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert patient")?;

        let id = conn.last_insert_rowid();
        debug!(patient_id = id, owner, "Inserted patient");
        query_patient(&conn, id)?.context("Inserted patient not found")
    }

    fn update(&self, id: i64, fields: &PatientFields) -> Result<Option<Patient>> {
        let conn = self.conn();
        let rows = conn
            .execute(
                "UPDATE patients SET name = ?1, age = ?2, gender = ?3, address = ?4
                 WHERE id = ?5",
                params![fields.name, fields.age, fields.gender, fields.address, id],
            )
            .context("Failed to update patient")?;

        if rows == 0 {
            return Ok(None);
        }
        query_patient(&conn, id)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM patients WHERE id = ?1", params![id])
            .context("Failed to delete patient")?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::seed_user;

    fn fields(name: &str) -> PatientFields {
        PatientFields {
            name: name.to_string(),
            age: Some(30),
            gender: None,
            address: None,
        }
    }

    #[test]
    fn test_payload_requires_name() {
        let errors = PatientPayload::default().validate().unwrap_err();
        assert_eq!(
            errors.get("name").unwrap(),
            [validation::REQUIRED.to_string()]
        );
    }

    #[test]
    fn test_payload_rejects_out_of_range_age() {
        let payload = PatientPayload {
            name: Some(Some("Jo".to_string())),
            age: Some(Some(151)),
            ..Default::default()
        };
        let errors = payload.validate().unwrap_err();
        assert!(errors.get("age").is_some());
        assert!(errors.get("name").is_none());
    }

    #[test]
    fn test_payload_ignores_created_by() {
        let payload: PatientPayload =
            serde_json::from_str(r#"{"name": "Jo", "created_by": 99, "id": 5}"#).unwrap();
        let fields = payload.validate().unwrap();
        assert_eq!(fields.name, "Jo");
    }

    #[test]
    fn test_merged_with_keeps_stored_values() {
        let db = Database::in_memory().unwrap();
        let owner = seed_user(&db, "a@x.com");
        let stored = db.insert(owner, &fields("Jo")).unwrap();

        let patch = PatientPayload {
            gender: Some(Some("F".to_string())),
            ..Default::default()
        };
        let merged = patch.merged_with(&stored).validate().unwrap();
        assert_eq!(merged.name, "Jo");
        assert_eq!(merged.age, Some(30));
        assert_eq!(merged.gender.as_deref(), Some("F"));
    }

    #[test]
    fn test_merged_with_null_clears_optional_fields() {
        let db = Database::in_memory().unwrap();
        let owner = seed_user(&db, "a@x.com");
        let stored = db.insert(owner, &fields("Jo")).unwrap();

        let patch: PatientPayload = serde_json::from_str(r#"{"age": null}"#).unwrap();
        let merged = patch.merged_with(&stored).validate().unwrap();
        assert_eq!(merged.name, "Jo");
        assert_eq!(merged.age, None);

        let patch: PatientPayload = serde_json::from_str(r#"{"name": null}"#).unwrap();
        let errors = patch.merged_with(&stored).validate().unwrap_err();
        assert_eq!(errors.get("name").unwrap(), [validation::NULL.to_string()]);
    }

    #[test]
    fn test_insert_sets_owner_and_email() {
        let db = Database::in_memory().unwrap();
        let owner = seed_user(&db, "a@x.com");

        let patient = db.insert(owner, &fields("Jo")).unwrap();
        assert_eq!(patient.id, 1);
        assert_eq!(patient.created_by, owner);
        assert_eq!(patient.owner_email, "a@x.com");

        let response = PatientResponse::from_patient(&patient);
        assert_eq!(response.created_by, "a@x.com");
    }

    #[test]
    fn test_list_is_scoped_to_owner() {
        let db = Database::in_memory().unwrap();
        let a = seed_user(&db, "a@x.com");
        let b = seed_user(&db, "b@x.com");
        db.insert(a, &fields("Jo")).unwrap();
        db.insert(a, &fields("Sam")).unwrap();
        db.insert(b, &fields("Kim")).unwrap();

        let mine = db.list_by_owner(a).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.created_by == a));

        let theirs = db.list_by_owner(b).unwrap();
        assert_eq!(theirs.len(), 1);
        assert_eq!(theirs[0].name, "Kim");
    }

    #[test]
    fn test_update_keeps_owner() {
        let db = Database::in_memory().unwrap();
        let owner = seed_user(&db, "a@x.com");
        let patient = db.insert(owner, &fields("Jo")).unwrap();

        let updated = db.update(patient.id, &fields("Joanna")).unwrap().unwrap();
        assert_eq!(updated.name, "Joanna");
        assert_eq!(updated.created_by, owner);

        assert!(db.update(999, &fields("Nobody")).unwrap().is_none());
    }

    #[test]
    fn test_delete_twice() {
        let db = Database::in_memory().unwrap();
        let owner = seed_user(&db, "a@x.com");
        let patient = db.insert(owner, &fields("Jo")).unwrap();

        assert!(db.delete(patient.id).unwrap());
        assert!(!db.delete(patient.id).unwrap());
        assert!(PatientRepository::find(&db, patient.id).unwrap().is_none());
    }
}
