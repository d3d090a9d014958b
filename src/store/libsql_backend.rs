//! libSQL backend — async `CommitmentStore` implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Commitment, CommitmentStore, NewCommitment};

const COMMITMENT_COLUMNS: &str =
    "id, user_id, title, short_description, cadence, proof_mode, reason, created_at";

/// libSQL commitment store.
///
/// Holds a single connection reused for all operations. The database handle
/// must outlive it, so it is kept alongside.
pub struct LibSqlCommitmentStore {
    _db: libsql::Database,
    conn: Connection,
}

impl LibSqlCommitmentStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::connect(db).await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::connect(db).await
    }

    async fn connect(db: libsql::Database) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self { _db: db, conn })
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Column order matches COMMITMENT_COLUMNS.
fn row_to_commitment(row: &libsql::Row) -> Result<Commitment, DatabaseError> {
    let text = |idx: i32| {
        row.get::<String>(idx)
            .map_err(|e| DatabaseError::Query(format!("commitment column {idx}: {e}")))
    };

    let id = text(0)?;
    let cadence = text(4)?;
    let proof_mode = text(5)?;

    Ok(Commitment {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::Serialization(format!("commitment id {id}: {e}")))?,
        user_id: text(1)?,
        title: text(2)?,
        short_description: text(3)?,
        cadence: cadence.parse().map_err(DatabaseError::Serialization)?,
        proof_mode: proof_mode.parse().map_err(DatabaseError::Serialization)?,
        reason: text(6)?,
        created_at: parse_datetime(&text(7)?),
    })
}

#[async_trait]
impl CommitmentStore for LibSqlCommitmentStore {
    async fn create_commitment(&self, new: NewCommitment) -> Result<Commitment, DatabaseError> {
        let commitment = Commitment {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            title: new.title,
            short_description: new.short_description,
            cadence: new.cadence,
            proof_mode: new.proof_mode,
            reason: new.reason,
            created_at: Utc::now(),
        };

        self.conn
            .execute(
                &format!(
                    "INSERT INTO commitments ({COMMITMENT_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    commitment.id.to_string(),
                    commitment.user_id.clone(),
                    commitment.title.clone(),
                    commitment.short_description.clone(),
                    commitment.cadence.to_string(),
                    commitment.proof_mode.to_string(),
                    commitment.reason.clone(),
                    commitment.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("create_commitment: {e}")))?;

        debug!(id = %commitment.id, user_id = %commitment.user_id, "Commitment created");
        Ok(commitment)
    }

    async fn list_commitments(&self, user_id: &str) -> Result<Vec<Commitment>, DatabaseError> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {COMMITMENT_COLUMNS} FROM commitments \
                     WHERE user_id = ?1 ORDER BY created_at ASC, rowid ASC"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_commitments: {e}")))?;

        let mut commitments = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_commitments: {e}")))?
        {
            commitments.push(row_to_commitment(&row)?);
        }
        Ok(commitments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::model::{Cadence, ProofMode};

    fn new_commitment(user_id: &str, title: &str) -> NewCommitment {
        NewCommitment {
            user_id: user_id.to_string(),
            title: title.to_string(),
            short_description: "Two minutes a day.".to_string(),
            cadence: Cadence::Daily,
            proof_mode: ProofMode::TickOnly,
            reason: "You asked for small steps.".to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_list() {
        let store = LibSqlCommitmentStore::new_memory().await.unwrap();
        let created = store
            .create_commitment(new_commitment("u1", "Stretch"))
            .await
            .unwrap();
        store
            .create_commitment(new_commitment("u1", "Journal"))
            .await
            .unwrap();

        let listed = store.list_commitments("u1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, created.id);
        assert_eq!(listed[0].title, "Stretch");
        assert_eq!(listed[1].title, "Journal");
        assert_eq!(listed[0].proof_mode, ProofMode::TickOnly);
    }

    #[tokio::test]
    async fn list_is_scoped_to_user() {
        let store = LibSqlCommitmentStore::new_memory().await.unwrap();
        store
            .create_commitment(new_commitment("u1", "Stretch"))
            .await
            .unwrap();
        assert!(store.list_commitments("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("habitloop.db");

        {
            let store = LibSqlCommitmentStore::new_local(&path).await.unwrap();
            let mut weekly = new_commitment("u1", "Weekly review");
            weekly.cadence = Cadence::Weekly;
            store.create_commitment(weekly).await.unwrap();
        }

        let store = LibSqlCommitmentStore::new_local(&path).await.unwrap();
        let listed = store.list_commitments("u1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].cadence, Cadence::Weekly);
    }

    #[test]
    fn parse_datetime_formats() {
        let dt = parse_datetime("2024-03-01T10:00:00+00:00");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        let dt = parse_datetime("2024-03-01 10:00:00");
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:00:00+00:00");
        assert_eq!(parse_datetime("garbage"), DateTime::<Utc>::MIN_UTC);
    }
}
