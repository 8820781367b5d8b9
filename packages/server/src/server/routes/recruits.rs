use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Query};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::{AppError, AppResult, JobId, UserId};
use crate::domains::recruiting::{create_recruits, list_recruits, CreateRecruits, Recruit};
use crate::server::app::AppState;
use crate::server::middleware::{require_auth, AuthUser};
use crate::server::routes::params::empty_string_as_none;

#[derive(Debug, Deserialize)]
pub struct CreateRecruitsBody {
    pub job_ids: Vec<JobId>,
    #[serde(default)]
    pub broadcast_radius: Option<f64>,
    #[serde(default)]
    pub re_recruit_worker_user_ids: Vec<UserId>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

impl From<CreateRecruitsBody> for CreateRecruits {
    fn from(body: CreateRecruitsBody) -> Self {
        Self {
            job_ids: body.job_ids,
            broadcast_radius: body.broadcast_radius,
            re_recruit_worker_user_ids: body.re_recruit_worker_user_ids,
            phone_numbers: body.phone_numbers,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecruitsQuery {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub job_id: Option<JobId>,
}

#[derive(Debug, Serialize)]
pub struct RecruitsResponse {
    pub success: bool,
    pub recruits: Vec<Recruit>,
}

/// `POST /recruits`
pub async fn create_recruits_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    payload: Result<Json<CreateRecruitsBody>, JsonRejection>,
) -> AppResult<Json<RecruitsResponse>> {
    let user = require_auth(auth)?;
    let Json(body) = payload.map_err(|e| AppError::validation(e.body_text()))?;

    let recruits = create_recruits(user.user_id, user.company_id, body.into(), &state.deps).await?;

    Ok(Json(RecruitsResponse {
        success: true,
        recruits,
    }))
}

/// `GET /recruits?job_id=`
pub async fn list_recruits_handler(
    Extension(state): Extension<AppState>,
    auth: Option<Extension<AuthUser>>,
    Query(query): Query<RecruitsQuery>,
) -> AppResult<Json<RecruitsResponse>> {
    let user = require_auth(auth)?;
    let recruits = list_recruits(user.company_id, query.job_id, &state.deps).await?;

    Ok(Json(RecruitsResponse {
        success: true,
        recruits,
    }))
}
