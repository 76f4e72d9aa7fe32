use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::assistant::Assistant;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub assistant: Box<dyn Assistant>,
}

impl AppState {
    /// Locks the booking store for one unit of work. Never hold the guard
    /// across an `.await`.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        lock_db(&self.db)
    }
}

pub fn lock_db(db: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, AppError> {
    db.lock()
        .map_err(|_| AppError::Store(anyhow::anyhow!("database lock poisoned")))
}
