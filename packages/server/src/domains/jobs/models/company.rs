use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::CompanyId;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CompanyId::new(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    pub async fn find_by_id(id: CompanyId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM companies WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }
}
