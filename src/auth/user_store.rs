//! User Storage
//! Mission: Securely store user accounts with hashed credentials

use crate::auth::models::{NewUser, User, UserId};
use crate::db::Database;
use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at";

/// Identity store backed by the shared SQLite database
pub struct UserStore {
    db: Database,
    bcrypt_cost: u32,
}

impl UserStore {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            bcrypt_cost: DEFAULT_COST,
        }
    }

    /// Lower costs are only sensible in tests
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    fn query_user(conn: &Connection, id: UserId) -> Result<Option<User>> {
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Get user by primary key
    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Self::query_user(&self.db.conn(), id)
    }

    /// Get user by email (case-insensitive)
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.db.conn();
        let user = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Verify email and password, returning the user on success
    pub fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.get_user_by_email(email)? else {
            return Ok(None);
        };
        let valid = verify(password, &user.password_hash).context("Failed to verify password")?;
        Ok(valid.then_some(user))
    }

    /// Create a new user. The password is hashed before it reaches the store.
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        let password_hash =
            hash(&new_user.password, self.bcrypt_cost).context("Failed to hash password")?;
        let created_at = Utc::now().to_rfc3339();

        let conn = self.db.conn();
        conn.execute(
            "INSERT INTO users (name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![new_user.name, new_user.email, password_hash, created_at],
        )
        .context("Failed to insert user")?;

        let user = User {
            id: conn.last_insert_rowid(),
            name: new_user.name.clone(),
            email: new_user.email.clone(),
            password_hash,
            created_at,
        };

        info!(user_id = user.id, "Created user");

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::is_constraint_violation;
    use tempfile::NamedTempFile;

    fn create_test_store() -> UserStore {
        UserStore::new(Database::in_memory().unwrap()).with_bcrypt_cost(4)
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Alice".to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let store = create_test_store();
        let created = store.create_user(&new_user("alice@x.com")).unwrap();
        assert_eq!(created.id, 1);

        let by_id = store.get_user(created.id).unwrap().unwrap();
        assert_eq!(by_id.email, "alice@x.com");

        let by_email = store.get_user_by_email("ALICE@x.com").unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(store.get_user(99).unwrap().is_none());
    }

    #[test]
    fn test_password_stored_hashed() {
        let store = create_test_store();
        let user = store.create_user(&new_user("alice@x.com")).unwrap();
        let stored = store.get_user(user.id).unwrap().unwrap();

        assert_ne!(stored.password_hash, "password123");
        assert!(stored.password_hash.starts_with("$2"));
    }

    #[test]
    fn test_authenticate() {
        let store = create_test_store();
        store.create_user(&new_user("alice@x.com")).unwrap();

        assert!(store
            .authenticate("alice@x.com", "password123")
            .unwrap()
            .is_some());
        assert!(store
            .authenticate("alice@x.com", "wrongpassword")
            .unwrap()
            .is_none());
        assert!(store
            .authenticate("nobody@x.com", "password123")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_email_is_constraint_violation() {
        let store = create_test_store();
        store.create_user(&new_user("alice@x.com")).unwrap();

        let err = store.create_user(&new_user("Alice@x.com")).unwrap_err();
        assert!(is_constraint_violation(&err));
    }

    #[test]
    fn test_users_persist_across_reopen() {
        let temp = NamedTempFile::new().unwrap();
        let path = temp.path().to_str().unwrap();

        let store = UserStore::new(Database::open(path).unwrap()).with_bcrypt_cost(4);
        store.create_user(&new_user("alice@x.com")).unwrap();
        drop(store);

        let reopened = UserStore::new(Database::open(path).unwrap());
        assert!(reopened.get_user_by_email("alice@x.com").unwrap().is_some());
    }
}
