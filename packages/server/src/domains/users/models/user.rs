use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

use crate::common::utils::geo::BoundingBox;
use crate::common::{CompanyId, GeoPoint, Language, PhoneNumber, UserId};

/// Account type. Workers created from a bare phone number start as
/// `OnboardingWorker` and are promoted to `Worker` by the signup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserType {
    Worker,
    OnboardingWorker,
    CompanyRegular,
    CompanyAdmin,
    FacebookLeadWorker,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Worker => "worker",
            UserType::OnboardingWorker => "onboarding-worker",
            UserType::CompanyRegular => "company-regular",
            UserType::CompanyAdmin => "company-admin",
            UserType::FacebookLeadWorker => "facebook-lead-worker",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "worker" => Ok(UserType::Worker),
            "onboarding-worker" => Ok(UserType::OnboardingWorker),
            "company-regular" => Ok(UserType::CompanyRegular),
            "company-admin" => Ok(UserType::CompanyAdmin),
            "facebook-lead-worker" => Ok(UserType::FacebookLeadWorker),
            other => anyhow::bail!("unknown user type '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerLocation {
    #[serde(default)]
    pub address: String,
    /// `None` is the placeholder location of workers who never set one.
    pub loc: Option<GeoPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerProfile {
    #[serde(default)]
    pub location: WorkerLocation,
    #[serde(default)]
    pub is_newjob_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMembership {
    pub company_id: CompanyId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "type")]
    pub user_type: UserType,
    pub username: String,
    pub phone_number: Option<PhoneNumber>,
    pub worker: Option<WorkerProfile>,
    pub company: Option<CompanyMembership>,
    #[serde(default)]
    pub player_ids: Vec<String>,
    #[serde(default)]
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Stub account for a phone number that has never signed up.
    ///
    /// Locked for new-job broadcasts and without a location until the
    /// worker finishes signup.
    pub fn new_onboarding_worker(phone_number: PhoneNumber) -> Self {
        Self {
            id: UserId::new(),
            user_type: UserType::OnboardingWorker,
            username: phone_number.local_number.clone(),
            phone_number: Some(phone_number),
            worker: Some(WorkerProfile {
                location: WorkerLocation::default(),
                is_newjob_lock: true,
            }),
            company: None,
            player_ids: Vec::new(),
            language: Language::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_onboarding(&self) -> bool {
        self.user_type == UserType::OnboardingWorker
    }

    pub fn company_id(&self) -> Option<CompanyId> {
        self.company.as_ref().map(|c| c.company_id)
    }

    pub fn location(&self) -> Option<GeoPoint> {
        self.worker.as_ref().and_then(|w| w.location.loc)
    }

    pub fn is_newjob_locked(&self) -> bool {
        self.worker.as_ref().map(|w| w.is_newjob_lock).unwrap_or(false)
    }
}

/// Flat row shape of the `users` table.
#[derive(sqlx::FromRow, Debug, Clone)]
struct UserRow {
    id: UserId,
    user_type: String,
    username: String,
    phone_country: Option<String>,
    phone_country_code: Option<String>,
    phone_local_number: Option<String>,
    worker_address: Option<String>,
    worker_lng: Option<f64>,
    worker_lat: Option<f64>,
    is_newjob_lock: Option<bool>,
    company_id: Option<CompanyId>,
    player_ids: Vec<String>,
    language: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self> {
        let phone_number = match (row.phone_country_code, row.phone_local_number) {
            (Some(country_code), Some(local_number)) => Some(PhoneNumber {
                country: row.phone_country.unwrap_or_default(),
                country_code,
                local_number,
            }),
            _ => None,
        };

        let worker = row.is_newjob_lock.map(|is_newjob_lock| WorkerProfile {
            location: WorkerLocation {
                address: row.worker_address.unwrap_or_default(),
                loc: match (row.worker_lng, row.worker_lat) {
                    (Some(lng), Some(lat)) => Some(GeoPoint::new(lng, lat)),
                    _ => None,
                },
            },
            is_newjob_lock,
        });

        Ok(Self {
            id: row.id,
            user_type: row.user_type.parse()?,
            username: row.username,
            phone_number,
            worker,
            company: row.company_id.map(|company_id| CompanyMembership { company_id }),
            player_ids: row.player_ids,
            language: Language::from_code(&row.language).unwrap_or_default(),
            created_at: row.created_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

/// Parameters for the broadcast geo query.
#[derive(Debug, Clone)]
pub struct NearQuery {
    pub point: GeoPoint,
    pub max_distance_radians: f64,
    pub eligibility: EligibilityFilter,
}

/// Who a broadcast may reach.
///
/// A user passes when they are not new-job locked, when their account is
/// older than `locked_created_before`, or when they are on the calling
/// company's roster.
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    pub locked_created_before: DateTime<Utc>,
    pub roster: Vec<UserId>,
}

impl EligibilityFilter {
    pub fn admits(&self, user: &User) -> bool {
        !user.is_newjob_locked()
            || user.created_at < self.locked_created_before
            || self.roster.contains(&user.id)
    }
}

impl User {
    pub async fn find_by_id(id: UserId, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    pub async fn find_by_ids(ids: &[UserId], pool: &PgPool) -> Result<Vec<Self>> {
        let rows = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await?;
        into_users(rows)
    }

    pub async fn find_by_phone_numbers(phones: &[PhoneNumber], pool: &PgPool) -> Result<Vec<Self>> {
        if phones.is_empty() {
            return Ok(Vec::new());
        }

        let codes: Vec<&str> = phones.iter().map(|p| p.country_code.as_str()).collect();
        let locals: Vec<&str> = phones.iter().map(|p| p.local_number.as_str()).collect();

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT u.*
             FROM users u
             JOIN UNNEST($1::text[], $2::text[]) AS p(country_code, local_number)
               ON u.phone_country_code = p.country_code
              AND u.phone_local_number = p.local_number",
        )
        .bind(&codes)
        .bind(&locals)
        .fetch_all(pool)
        .await?;
        into_users(rows)
    }

    /// Workers whose location lies within `max_distance_radians` of the point
    /// and who pass the eligibility filter.
    ///
    /// The bounding box lets `idx_users_worker_location` narrow the scan before
    /// the haversine check runs.
    pub async fn find_near(query: &NearQuery, pool: &PgPool) -> Result<Vec<Self>> {
        let bbox = BoundingBox::around(query.point, query.max_distance_radians);
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT u.*
             FROM users u
             WHERE u.worker_lat IS NOT NULL
               AND u.worker_lng IS NOT NULL
               AND u.worker_lat BETWEEN $6 AND $7
               AND u.worker_lng BETWEEN $8 AND $9
               AND 2 * ASIN(LEAST(1.0, SQRT(
                     POWER(SIN(RADIANS(u.worker_lat - $2) / 2), 2)
                     + COS(RADIANS($2)) * COS(RADIANS(u.worker_lat))
                       * POWER(SIN(RADIANS(u.worker_lng - $1) / 2), 2)
                   ))) <= $3
               AND (
                     u.is_newjob_lock IS NOT TRUE
                     OR u.created_at < $4
                     OR u.id = ANY($5)
                   )
             ORDER BY u.created_at ASC",
        )
        .bind(query.point.lng)
        .bind(query.point.lat)
        .bind(query.max_distance_radians)
        .bind(query.eligibility.locked_created_before)
        .bind(&query.eligibility.roster)
        .bind(bbox.min_lat)
        .bind(bbox.max_lat)
        .bind(bbox.min_lng)
        .bind(bbox.max_lng)
        .fetch_all(pool)
        .await?;
        into_users(rows)
    }

    /// Insert, or return the existing user holding the same phone pair.
    ///
    /// Returns `(user, created)`.
    pub async fn insert_or_find_by_phone(&self, pool: &PgPool) -> Result<(Self, bool)> {
        let inserted = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (
                id, user_type, username,
                phone_country, phone_country_code, phone_local_number,
                worker_address, worker_lng, worker_lat, is_newjob_lock,
                company_id, player_ids, language, created_at
             )
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             ON CONFLICT (phone_country_code, phone_local_number) DO NOTHING
             RETURNING *",
        )
        .bind(self.id)
        .bind(self.user_type.as_str())
        .bind(&self.username)
        .bind(self.phone_number.as_ref().map(|p| p.country.clone()))
        .bind(self.phone_number.as_ref().map(|p| p.country_code.clone()))
        .bind(self.phone_number.as_ref().map(|p| p.local_number.clone()))
        .bind(self.worker.as_ref().map(|w| w.location.address.clone()))
        .bind(self.location().map(|p| p.lng))
        .bind(self.location().map(|p| p.lat))
        .bind(self.worker.as_ref().map(|w| w.is_newjob_lock))
        .bind(self.company_id())
        .bind(&self.player_ids)
        .bind(self.language.code())
        .bind(self.created_at)
        .fetch_optional(pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((User::try_from(row)?, true));
        }

        let phone = self
            .phone_number
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("user {} conflicted without a phone number", self.id))?;
        let existing = Self::find_by_phone_numbers(std::slice::from_ref(phone), pool)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("phone conflict for {} but no user found", phone))?;
        Ok((existing, false))
    }
}
