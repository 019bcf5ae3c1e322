//! Record Store
//! Mission: Persist patients, doctors and patient-doctor mappings
//!
//! Handlers only see the repository traits; [`Database`](crate::db::Database)
//! implements all three on top of SQLite.

pub mod doctor;
pub mod mapping;
pub mod patient;

pub use doctor::{Doctor, DoctorFields, DoctorPayload, DoctorRepository, DoctorResponse};
pub use mapping::{Mapping, MappingPayload, MappingRepository, MappingResponse};
pub use patient::{Patient, PatientFields, PatientPayload, PatientRepository, PatientResponse};
