//! Application State
//! Mission: Wire the stores and token handler that every handler shares

use crate::auth::{JwtHandler, UserStore};
use crate::db::Database;
use crate::records::{DoctorRepository, MappingRepository, PatientRepository};
use std::sync::Arc;

/// Shared across all requests; every field is an injected collaborator
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UserStore>,
    pub patients: Arc<dyn PatientRepository>,
    pub doctors: Arc<dyn DoctorRepository>,
    pub mappings: Arc<dyn MappingRepository>,
    pub jwt_handler: Arc<JwtHandler>,
}

impl AppState {
    /// All record repositories backed by the same SQLite database
    pub fn new(db: Database, users: UserStore, jwt_handler: JwtHandler) -> Self {
        let db = Arc::new(db);
        Self {
            users: Arc::new(users),
            patients: db.clone(),
            doctors: db.clone(),
            mappings: db,
            jwt_handler: Arc::new(jwt_handler),
        }
    }
}
