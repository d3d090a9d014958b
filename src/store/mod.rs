//! Persistence layer — libSQL-backed storage for chosen commitments.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlCommitmentStore;
pub use traits::{Commitment, CommitmentStore, NewCommitment};
