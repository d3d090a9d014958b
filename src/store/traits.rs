//! `CommitmentStore` trait — async interface for persisting chosen commitments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::onboarding::model::{Cadence, CommitmentRecommendation, ProofMode};

/// A commitment about to be created for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommitment {
    pub user_id: String,
    pub title: String,
    pub short_description: String,
    pub cadence: Cadence,
    pub proof_mode: ProofMode,
    pub reason: String,
}

impl NewCommitment {
    pub fn from_recommendation(user_id: &str, rec: &CommitmentRecommendation) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: rec.title.clone(),
            short_description: rec.short_description.clone(),
            cadence: rec.cadence,
            proof_mode: rec.proof_mode,
            reason: rec.reason.clone(),
        }
    }
}

/// A persisted commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub short_description: String,
    pub cadence: Cadence,
    pub proof_mode: ProofMode,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Backend-agnostic commitment persistence.
#[async_trait]
pub trait CommitmentStore: Send + Sync {
    /// Insert a commitment and return the stored row.
    async fn create_commitment(&self, new: NewCommitment) -> Result<Commitment, DatabaseError>;

    /// All commitments for a user, oldest first.
    async fn list_commitments(&self, user_id: &str) -> Result<Vec<Commitment>, DatabaseError>;
}
