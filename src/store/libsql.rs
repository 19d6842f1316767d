//! libSQL backend — async `UserStore` implementation.
//!
//! Supports local file and in-memory databases. `libsql::Connection`
//! is `Send + Sync` and safe for concurrent async use; id uniqueness
//! is carried by the primary key, so racing writers resolve through
//! the upsert's conflict clause rather than a lost update.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Connection, Database, params};
use tracing::info;

use crate::error::StorageError;
use crate::events::UserId;
use crate::store::traits::{UserRecord, UserStore};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    phone TEXT,
    first_interaction INTEGER NOT NULL DEFAULT 0
)";

/// libSQL user store.
pub struct LibSqlUserStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlUserStore {
    /// Open (or create) a local database file and init the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Unavailable(format!("Failed to open database: {e}")))?;

        let store = Self::from_db(db).await?;
        info!(path = %path.display(), "User database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StorageError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_db(db).await
    }

    async fn from_db(db: Database) -> Result<Self, StorageError> {
        let conn = db
            .connect()
            .map_err(|e| StorageError::Unavailable(format!("Failed to create connection: {e}")))?;
        conn.execute(SCHEMA, ())
            .await
            .map_err(|e| StorageError::Query(format!("Failed to init schema: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }
}

fn query_err(e: libsql::Error) -> StorageError {
    StorageError::Query(e.to_string())
}

#[async_trait]
impl UserStore for LibSqlUserStore {
    async fn upsert_user(&self, id: UserId, phone: Option<&str>) -> Result<(), StorageError> {
        // First write wins: a phone already on file is never replaced,
        // but a NULL left by mark_first_interaction_done is filled.
        self.conn
            .execute(
                "INSERT INTO users (user_id, phone, first_interaction) VALUES (?1, ?2, 1)
                 ON CONFLICT(user_id) DO UPDATE
                 SET phone = COALESCE(users.phone, excluded.phone)",
                params![id, phone.map(str::to_owned)],
            )
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn has_phone(&self, id: UserId) -> Result<bool, StorageError> {
        let mut rows = self
            .conn
            .query("SELECT phone FROM users WHERE user_id = ?1", params![id])
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => {
                let phone: Option<String> = row.get(0).ok();
                Ok(phone.is_some())
            }
            None => Ok(false),
        }
    }

    async fn is_first_interaction_done(&self, id: UserId) -> Result<bool, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT first_interaction FROM users WHERE user_id = ?1",
                params![id],
            )
            .await
            .map_err(query_err)?;
        match rows.next().await.map_err(query_err)? {
            Some(row) => {
                let flag: i64 = row.get(0).map_err(query_err)?;
                Ok(flag != 0)
            }
            None => Ok(false),
        }
    }

    async fn mark_first_interaction_done(&self, id: UserId) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO users (user_id, first_interaction) VALUES (?1, 1)
                 ON CONFLICT(user_id) DO UPDATE SET first_interaction = 1",
                params![id],
            )
            .await
            .map_err(query_err)?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT user_id, phone, first_interaction FROM users",
                (),
            )
            .await
            .map_err(query_err)?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await.map_err(query_err)? {
            let id: i64 = row.get(0).map_err(query_err)?;
            let phone: Option<String> = row.get(1).ok();
            let flag: i64 = row.get(2).map_err(query_err)?;
            users.push(UserRecord {
                id,
                phone,
                first_interaction_done: flag != 0,
            });
        }
        Ok(users)
    }
}
