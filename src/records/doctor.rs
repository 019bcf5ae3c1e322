//! Doctor Records
//! Mission: Shared doctor directory, editable by any signed-in user

use crate::auth::models::UserId;
use crate::db::Database;
use crate::policy::Owned;
use crate::validation::{self, FieldErrors, Nullable};
use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Doctor {
    pub id: i64,
    pub name: String,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: String,
}

/// Doctors are unowned.
impl Owned for Doctor {
    const KIND: &'static str = "Doctor";

    fn record_id(&self) -> i64 {
        self.id
    }

    fn permits(&self, _identity: UserId) -> bool {
        true
    }
}

pub type DoctorResponse = Doctor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorFields {
    pub name: String,
    pub specialization: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DoctorPayload {
    #[serde(default, deserialize_with = "validation::nullable")]
    pub name: Nullable<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub specialization: Nullable<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub email: Nullable<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub phone: Nullable<String>,
}

impl DoctorPayload {
    pub fn validate(self) -> Result<DoctorFields, FieldErrors> {
        let mut errors = FieldErrors::new();

        let name = validation::required_field(&mut errors, "name", self.name, 100);
        let specialization = validation::optional_text(
            &mut errors,
            "specialization",
            self.specialization.flatten(),
            100,
        );
        let email = validation::optional_text(&mut errors, "email", self.email.flatten(), 254)
            .map(|e| validation::normalize_email(&e));
        if let Some(email) = &email {
            if !validation::is_valid_email(email) {
                errors.add("email", "Enter a valid email address.");
            }
        }
        let phone = validation::optional_text(&mut errors, "phone", self.phone.flatten(), 20);

        errors.finish(DoctorFields {
            name,
            specialization,
            email,
            phone,
        })
    }

    /// Absent keys keep the stored value; `null` clears
    pub fn merged_with(self, current: &Doctor) -> Self {
        Self {
            name: self.name.or_else(|| Some(Some(current.name.clone()))),
            specialization: self
                .specialization
                .or_else(|| Some(current.specialization.clone())),
            email: self.email.or_else(|| Some(current.email.clone())),
            phone: self.phone.or_else(|| Some(current.phone.clone())),
        }
    }
}

pub trait DoctorRepository: Send + Sync {
    fn list(&self) -> Result<Vec<Doctor>>;

    fn find(&self, id: i64) -> Result<Option<Doctor>>;

    fn insert(&self, fields: &DoctorFields) -> Result<Doctor>;

    fn update(&self, id: i64, fields: &DoctorFields) -> Result<Option<Doctor>>;

    /// Removes the doctor and, through the foreign key cascade, every
    /// mapping that references it
    fn delete(&self, id: i64) -> Result<bool>;
}

const DOCTOR_SELECT: &str =
    "SELECT id, name, specialization, email, phone, created_at FROM doctors";

fn row_to_doctor(row: &Row<'_>) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        name: row.get(1)?,
        specialization: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn query_doctor(conn: &Connection, id: i64) -> Result<Option<Doctor>> {
    let doctor = conn
        .query_row(
            &format!("{DOCTOR_SELECT} WHERE id = ?1"),
            params![id],
            row_to_doctor,
        )
        .optional()?;
    Ok(doctor)
}

impl DoctorRepository for Database {
    fn list(&self) -> Result<Vec<Doctor>> {
        let conn = self.conn();
        let mut stmt = conn.prepare_cached(&format!("{DOCTOR_SELECT} ORDER BY id"))?;
        let doctors = stmt
            .query_map([], row_to_doctor)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(doctors)
    }

    fn find(&self, id: i64) -> Result<Option<Doctor>> {
        query_doctor(&self.conn(), id)
    }

    fn insert(&self, fields: &DoctorFields) -> Result<Doctor> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO doctors (name, specialization, email, phone, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                fields.name,
                fields.specialization,
                fields.email,
                fields.phone,
                Utc::now().to_rfc3339(),
            ],
        )
        .context("Failed to insert doctor")?;

        query_doctor(&conn, conn.last_insert_rowid())?.context("Inserted doctor not found")
    }

    fn update(&self, id: i64, fields: &DoctorFields) -> Result<Option<Doctor>> {
        let conn = self.conn();
        let rows = conn
            .execute(
                "UPDATE doctors SET name = ?1, specialization = ?2, email = ?3, phone = ?4
                 WHERE id = ?5",
                params![
                    fields.name,
                    fields.specialization,
                    fields.email,
                    fields.phone,
                    id
                ],
            )
            .context("Failed to update doctor")?;

        if rows == 0 {
            return Ok(None);
        }
        query_doctor(&conn, id)
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM doctors WHERE id = ?1", params![id])
            .context("Failed to delete doctor")?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> DoctorFields {
        DoctorFields {
            name: name.to_string(),
            specialization: Some("Cardiology".to_string()),
            email: None,
            phone: None,
        }
    }

    #[test]
    fn test_payload_validation() {
        let errors = DoctorPayload {
            email: Some(Some("nope".to_string())),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert!(errors.get("name").is_some());
        assert!(errors.get("email").is_some());

        let ok = DoctorPayload {
            name: Some(Some(" Dr. Lee ".to_string())),
            email: Some(Some("lee@Clinic.org".to_string())),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(ok.name, "Dr. Lee");
        assert_eq!(ok.email.as_deref(), Some("lee@clinic.org"));
    }

    #[test]
    fn test_crud_cycle() {
        let db = Database::in_memory().unwrap();

        let doctor = db.insert(&fields("Dr. Lee")).unwrap();
        assert_eq!(doctor.id, 1);
        assert_eq!(db.list().unwrap().len(), 1);

        let patch = DoctorPayload {
            phone: Some(Some("555-0100".to_string())),
            ..Default::default()
        };
        let merged = patch.merged_with(&doctor).validate().unwrap();
        let updated = db.update(doctor.id, &merged).unwrap().unwrap();
        assert_eq!(updated.name, "Dr. Lee");
        assert_eq!(updated.specialization.as_deref(), Some("Cardiology"));
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));

        assert!(db.delete(doctor.id).unwrap());
        assert!(!db.delete(doctor.id).unwrap());
        assert!(db.find(doctor.id).unwrap().is_none());
        assert!(db.update(doctor.id, &merged).unwrap().is_none());
    }

    #[test]
    fn test_patch_null_clears_specialization() {
        let db = Database::in_memory().unwrap();
        let doctor = db.insert(&fields("Dr. Lee")).unwrap();

        let patch: DoctorPayload = serde_json::from_str(r#"{"specialization": null}"#).unwrap();
        let merged = patch.merged_with(&doctor).validate().unwrap();
        assert_eq!(merged.name, "Dr. Lee");
        assert_eq!(merged.specialization, None);
    }
}
