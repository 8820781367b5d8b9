use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{CompanyId, JobId, RecruitId, UserId};

/// What the company asked for when recruiting for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruitRequest {
    pub job_id: JobId,
    pub broadcast_radius: Option<f64>,
    #[serde(default)]
    pub re_recruit_worker_user_ids: Vec<UserId>,
}

/// Audit record of one recruit call for one job and who it reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recruit {
    pub id: RecruitId,
    pub company_id: CompanyId,
    pub company_user_id: UserId,
    pub request: RecruitRequest,
    pub recruited_worker_user_ids: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Recruit {
    pub fn build(
        company_id: CompanyId,
        company_user_id: UserId,
        request: RecruitRequest,
        recruited_worker_user_ids: Vec<UserId>,
    ) -> Self {
        Self {
            id: RecruitId::new(),
            company_id,
            company_user_id,
            request,
            recruited_worker_user_ids,
            created_at: Utc::now(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RecruitRow {
    id: RecruitId,
    company_id: CompanyId,
    company_user_id: UserId,
    job_id: JobId,
    broadcast_radius: Option<f64>,
    re_recruit_worker_user_ids: Vec<UserId>,
    recruited_worker_user_ids: Vec<UserId>,
    created_at: DateTime<Utc>,
}

impl From<RecruitRow> for Recruit {
    fn from(row: RecruitRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            company_user_id: row.company_user_id,
            request: RecruitRequest {
                job_id: row.job_id,
                broadcast_radius: row.broadcast_radius,
                re_recruit_worker_user_ids: row.re_recruit_worker_user_ids,
            },
            recruited_worker_user_ids: row.recruited_worker_user_ids,
            created_at: row.created_at,
        }
    }
}

impl Recruit {
    pub async fn insert(&self, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, RecruitRow>(
            "INSERT INTO recruits (
                id, company_id, company_user_id, job_id, broadcast_radius,
                re_recruit_worker_user_ids, recruited_worker_user_ids, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.company_id)
        .bind(self.company_user_id)
        .bind(self.request.job_id)
        .bind(self.request.broadcast_radius)
        .bind(&self.request.re_recruit_worker_user_ids)
        .bind(&self.recruited_worker_user_ids)
        .bind(self.created_at)
        .fetch_one(pool)
        .await
        .map(Into::into)
        .map_err(Into::into)
    }

    /// Newest first.
    pub async fn find_for_company(
        company_id: CompanyId,
        job_id: Option<JobId>,
        pool: &PgPool,
    ) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, RecruitRow>(
            "SELECT * FROM recruits
             WHERE company_id = $1 AND ($2::uuid IS NULL OR job_id = $2)
             ORDER BY created_at DESC",
        )
        .bind(company_id)
        .bind(job_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
