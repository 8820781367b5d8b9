use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::PgPool;

use crate::common::{CompanyId, GeoPoint, JobId};

/// A worksite for a job; broadcasts search around `loc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLocation {
    #[serde(default)]
    pub address: String,
    pub loc: GeoPoint,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Job {
    pub id: JobId,
    pub company_id: CompanyId,
    pub title: String,
    pub pay_rate: Option<f64>,
    pub pay_unit: String,
    pub locations: Json<Vec<JobLocation>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(company_id: CompanyId, title: impl Into<String>, locations: Vec<JobLocation>) -> Self {
        Self {
            id: JobId::new(),
            company_id,
            title: title.into(),
            pay_rate: None,
            pay_unit: "hour".to_string(),
            locations: Json(locations),
            created_at: Utc::now(),
        }
    }

    pub fn locations(&self) -> &[JobLocation] {
        &self.locations.0
    }

    /// Pay formatted for SMS, e.g. `$15.50/hour`.
    pub fn pay_label(&self) -> Option<String> {
        self.pay_rate
            .map(|rate| format!("${:.2}/{}", rate, self.pay_unit))
    }

    pub async fn find_by_id(id: JobId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn find_by_ids(ids: &[JobId], pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM jobs WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }
}
