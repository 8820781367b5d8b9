use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{CompanyId, CrewId, MyworkerId, UserId};

/// Roster link between a company and a worker. At most one per pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Myworker {
    pub id: MyworkerId,
    pub company_id: CompanyId,
    pub worker_user_id: UserId,
    pub crew_id: Option<CrewId>,
    pub created_at: DateTime<Utc>,
}

impl Myworker {
    pub fn new(company_id: CompanyId, worker_user_id: UserId) -> Self {
        Self {
            id: MyworkerId::new(),
            company_id,
            worker_user_id,
            crew_id: None,
            created_at: Utc::now(),
        }
    }

    pub async fn find_worker_ids_for_company(
        company_id: CompanyId,
        pool: &PgPool,
    ) -> Result<Vec<UserId>> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT worker_user_id FROM myworkers WHERE company_id = $1 ORDER BY created_at",
        )
        .bind(company_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Returns `(link, created)`.
    pub async fn find_or_create(
        company_id: CompanyId,
        worker_user_id: UserId,
        pool: &PgPool,
    ) -> Result<(Self, bool)> {
        let candidate = Self::new(company_id, worker_user_id);
        let inserted = sqlx::query_as::<_, Self>(
            "INSERT INTO myworkers (id, company_id, worker_user_id, crew_id, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (company_id, worker_user_id) DO NOTHING
             RETURNING *",
        )
        .bind(candidate.id)
        .bind(candidate.company_id)
        .bind(candidate.worker_user_id)
        .bind(candidate.crew_id)
        .bind(candidate.created_at)
        .fetch_optional(pool)
        .await?;

        if let Some(link) = inserted {
            return Ok((link, true));
        }

        let existing = sqlx::query_as::<_, Self>(
            "SELECT * FROM myworkers WHERE company_id = $1 AND worker_user_id = $2",
        )
        .bind(company_id)
        .bind(worker_user_id)
        .fetch_one(pool)
        .await?;
        Ok((existing, false))
    }
}
