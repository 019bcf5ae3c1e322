//! Authorization Policy
//! Mission: Decide whether an identity may act on a record it has located
//!
//! Each record kind owns its own rule by implementing [`Owned`]. The check
//! is object-level only: it runs after a primary-key lookup and never filters
//! lists (list scoping is a query concern of the handlers). A denial is a
//! plain `false`; callers turn it into a 403.

use crate::auth::models::UserId;

pub trait Owned {
    /// Record kind, used in log lines and "not found" messages
    const KIND: &'static str;

    fn record_id(&self) -> i64;

    /// Whether `identity` may read or mutate this record
    fn permits(&self, identity: UserId) -> bool;
}
