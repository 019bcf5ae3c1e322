//! HTTP API
//! Mission: Resource handlers for patients, doctors and mappings

pub mod doctors;
pub mod error;
pub mod extract;
pub mod mappings;
pub mod patients;
pub mod routes;

pub use error::ApiError;
pub use routes::create_router;

use crate::auth::Identity;
use crate::policy::Owned;
use tracing::warn;

/// Locate-then-authorize: a missing record is a 404, a record the caller
/// may not act on is a 403
pub(crate) fn get_object<R: Owned>(identity: &Identity, found: Option<R>) -> Result<R, ApiError> {
    let record = found.ok_or(ApiError::NotFound(R::KIND))?;

    if !record.permits(identity.user_id) {
        warn!(
            kind = R::KIND,
            record_id = record.record_id(),
            user_id = identity.user_id,
            "Object permission denied"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(record)
}
