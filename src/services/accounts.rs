//! Registration and login.
//!
//! bcrypt runs on the blocking pool with the store lock released, so a slow
//! hash never holds up booking requests.

use std::sync::Mutex;

use chrono::Utc;
use rusqlite::Connection;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::user::{is_strong_password, is_valid_email};
use crate::models::{Account, Session};
use crate::state::lock_db;

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn register(
    db: &Mutex<Connection>,
    config: &AppConfig,
    registration: Registration,
) -> Result<Account, AppError> {
    let name = registration.name.trim().to_string();
    let email = registration.email.trim().to_string();
    if name.is_empty() || email.is_empty() || registration.password.is_empty() {
        return Err(AppError::Validation("all fields are required".to_string()));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("invalid email address".to_string()));
    }
    if !is_strong_password(&registration.password) {
        return Err(AppError::Validation(
            "password must be at least 8 characters long and contain at least one \
             uppercase letter, one lowercase letter, and one digit"
                .to_string(),
        ));
    }

    let taken = email == config.admin_email || {
        let conn = lock_db(db)?;
        let existing = queries::get_account_by_email(&conn, &email)?;
        existing.is_some()
    };
    if taken {
        return Err(AppError::Conflict(format!("{email} is already registered")));
    }

    let password_hash = hash_password(registration.password, config.bcrypt_cost).await?;

    let account = Account {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        password_hash,
        created_at: Utc::now().naive_utc(),
    };

    // Another registration for the same email may have won the race while
    // the hash was running.
    {
        let conn = lock_db(db)?;
        queries::insert_account(&conn, &account).map_err(|e| {
            if queries::is_unique_violation(&e) {
                AppError::Conflict(format!("{} is already registered", account.email))
            } else {
                AppError::Store(e)
            }
        })?;
    }

    tracing::info!(email = %account.email, "registered account");
    Ok(account)
}

/// Checks credentials. The configured admin login wins over stored accounts.
pub async fn login(
    db: &Mutex<Connection>,
    config: &AppConfig,
    email: &str,
    password: &str,
) -> Result<Session, AppError> {
    let email = email.trim();

    if !config.admin_password.is_empty()
        && email == config.admin_email
        && constant_time_eq::constant_time_eq(
            password.as_bytes(),
            config.admin_password.as_bytes(),
        )
    {
        tracing::info!(email, "admin login");
        return Ok(Session::admin(email));
    }

    let account = {
        let conn = lock_db(db)?;
        queries::get_account_by_email(&conn, email)?
    };

    let Some(account) = account else {
        return Err(AppError::Unauthorized);
    };

    if !verify_password(password.to_string(), account.password_hash.clone()).await? {
        tracing::warn!(email, "failed login");
        return Err(AppError::Unauthorized);
    }

    Ok(Session::customer(account.email))
}

async fn hash_password(password: String, cost: u32) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// A malformed stored hash counts as a mismatch.
async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("password check task failed: {e}")))?;
    Ok(matches.unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn config() -> AppConfig {
        AppConfig {
            bcrypt_cost: 4,
            admin_email: "admin@bikes.test".to_string(),
            admin_password: "AdminPass1".to_string(),
            ..AppConfig::default()
        }
    }

    fn setup_db() -> Mutex<Connection> {
        Mutex::new(db::init_db(":memory:").unwrap())
    }

    fn registration(email: &str, password: &str) -> Registration {
        Registration {
            name: "Karthik".to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let db = setup_db();
        let config = config();

        let account = register(&db, &config, registration("k@x.com", "Secret123"))
            .await
            .unwrap();
        assert_ne!(account.password_hash, "Secret123");

        let session = login(&db, &config, "k@x.com", "Secret123").await.unwrap();
        assert_eq!(session, Session::customer("k@x.com"));
        assert!(matches!(
            login(&db, &config, "k@x.com", "Wrong1234").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let db = setup_db();
        let config = config();

        for (email, password) in [("", "Secret123"), ("bad", "Secret123"), ("k@x.com", "weak")] {
            let err = register(&db, &config, registration(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{email}/{password}");
        }
    }

    #[tokio::test]
    async fn test_duplicate_and_admin_email_conflict() {
        let db = setup_db();
        let config = config();

        register(&db, &config, registration("k@x.com", "Secret123"))
            .await
            .unwrap();
        assert!(matches!(
            register(&db, &config, registration("k@x.com", "Secret123")).await,
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            register(&db, &config, registration("admin@bikes.test", "Secret123")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_registrations_for_one_email() {
        let db = setup_db();
        let config = config();

        let (first, second) = tokio::join!(
            register(&db, &config, registration("race@x.com", "Secret123")),
            register(&db, &config, registration("race@x.com", "Secret123")),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(AppError::Conflict(_)))));
    }

    #[tokio::test]
    async fn test_admin_login() {
        let db = setup_db();
        let config = config();

        let session = login(&db, &config, "admin@bikes.test", "AdminPass1")
            .await
            .unwrap();
        assert!(session.is_admin());
        for attempt in ["nope", "AdminPass", "AdminPass12", ""] {
            assert!(matches!(
                login(&db, &config, "admin@bikes.test", attempt).await,
                Err(AppError::Unauthorized)
            ));
        }
        assert!(matches!(
            login(&db, &config, "ghost@x.com", "Secret123").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_a_mismatch() {
        let db = setup_db();
        let config = config();
        {
            let conn = lock_db(&db).unwrap();
            queries::insert_account(
                &conn,
                &Account {
                    id: "acc-1".to_string(),
                    name: "Ravi".to_string(),
                    email: "ravi@x.com".to_string(),
                    password_hash: "not-a-bcrypt-hash".to_string(),
                    created_at: Utc::now().naive_utc(),
                },
            )
            .unwrap();
        }

        assert!(matches!(
            login(&db, &config, "ravi@x.com", "Secret123").await,
            Err(AppError::Unauthorized)
        ));
    }
}
