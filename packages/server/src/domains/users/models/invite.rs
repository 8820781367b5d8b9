use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::{CompanyId, InviteId, PhoneNumber, UserId};

/// Record that a company invited a phone number to the app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub company_id: CompanyId,
    pub phone_number: PhoneNumber,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: InviteId,
    company_id: CompanyId,
    phone_country: String,
    phone_country_code: String,
    phone_local_number: String,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

impl From<InviteRow> for Invite {
    fn from(row: InviteRow) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            phone_number: PhoneNumber {
                country: row.phone_country,
                country_code: row.phone_country_code,
                local_number: row.phone_local_number,
            },
            user_id: row.user_id,
            created_at: row.created_at,
        }
    }
}

impl Invite {
    pub fn new(company_id: CompanyId, phone_number: PhoneNumber, user_id: UserId) -> Self {
        Self {
            id: InviteId::new(),
            company_id,
            phone_number,
            user_id,
            created_at: Utc::now(),
        }
    }

    /// Returns `(invite, created)`. Uniqueness is on company plus phone pair.
    pub async fn find_or_create(
        company_id: CompanyId,
        phone_number: &PhoneNumber,
        user_id: UserId,
        pool: &PgPool,
    ) -> Result<(Self, bool)> {
        let candidate = Self::new(company_id, phone_number.clone(), user_id);
        let inserted = sqlx::query_as::<_, InviteRow>(
            "INSERT INTO invites (
                id, company_id, phone_country, phone_country_code, phone_local_number,
                user_id, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (company_id, phone_country_code, phone_local_number) DO NOTHING
             RETURNING *",
        )
        .bind(candidate.id)
        .bind(candidate.company_id)
        .bind(&candidate.phone_number.country)
        .bind(&candidate.phone_number.country_code)
        .bind(&candidate.phone_number.local_number)
        .bind(candidate.user_id)
        .bind(candidate.created_at)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = sqlx::query_as::<_, InviteRow>(
            "SELECT * FROM invites
             WHERE company_id = $1 AND phone_country_code = $2 AND phone_local_number = $3",
        )
        .bind(company_id)
        .bind(&phone_number.country_code)
        .bind(&phone_number.local_number)
        .fetch_one(pool)
        .await?;
        Ok((existing.into(), false))
    }
}
