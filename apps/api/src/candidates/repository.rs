use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use crate::models::candidate::{CandidateRow, NewCandidate};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage seam for candidate rows. Each call is atomic.
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Inserts a candidate, or updates the existing row with the same email.
    async fn upsert(&self, candidate: NewCandidate) -> Result<CandidateRow, RepositoryError>;

    async fn find(&self, id: i64) -> Result<Option<CandidateRow>, RepositoryError>;
}

pub struct PgCandidateRepository {
    pool: PgPool,
}

impl PgCandidateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateRepository for PgCandidateRepository {
    async fn upsert(&self, candidate: NewCandidate) -> Result<CandidateRow, RepositoryError> {
        // Single statement; NULL emails never conflict, so they always insert.
        let row = sqlx::query_as::<_, CandidateRow>(
            r#"
            INSERT INTO candidates
                (full_name, email, position, resume_path, notification_note)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (email) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                position = EXCLUDED.position,
                resume_path = COALESCE(EXCLUDED.resume_path, candidates.resume_path),
                notification_note = EXCLUDED.notification_note
            RETURNING *
            "#,
        )
        .bind(&candidate.full_name)
        .bind(&candidate.email)
        .bind(&candidate.position)
        .bind(&candidate.resume_path)
        .bind(&candidate.notification_note)
        .fetch_one(&self.pool)
        .await?;

        info!("Saved candidate {} for position {}", row.id, row.position);
        Ok(row)
    }

    async fn find(&self, id: i64) -> Result<Option<CandidateRow>, RepositoryError> {
        Ok(
            sqlx::query_as::<_, CandidateRow>("SELECT * FROM candidates WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}
