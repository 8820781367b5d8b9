//! Recruit workers for one or more jobs
//!
//! For each job, in request order: resolve recipients, write the Recruit
//! audit record, then hand the recipients to the messaging fan-out. A
//! fan-out failure for one job is logged and does not affect the others.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::common::{AppError, AppResult, CompanyId, JobId, PhoneNumber, UserId};
use crate::domains::jobs::Job;
use crate::domains::messaging::activities::compose::recruit_message_body;
use crate::domains::messaging::{send_message, MessageType, Recipient, SendMessage};
use crate::domains::recruiting::activities::build_recruit::record_recruit;
use crate::domains::recruiting::activities::resolve_recipients::{
    resolve_recipients, RecipientQuery,
};
use crate::domains::recruiting::models::Recruit;
use crate::kernel::ServerDeps;

#[derive(Debug, Clone, Default)]
pub struct CreateRecruits {
    pub job_ids: Vec<JobId>,
    pub broadcast_radius: Option<f64>,
    pub re_recruit_worker_user_ids: Vec<UserId>,
    pub phone_numbers: Vec<String>,
}

#[instrument(skip(input, deps), fields(jobs = input.job_ids.len()))]
pub async fn create_recruits(
    company_user_id: UserId,
    company_id: Option<CompanyId>,
    input: CreateRecruits,
    deps: &ServerDeps,
) -> AppResult<Vec<Recruit>> {
    let store = deps.store.as_ref();

    if input.job_ids.is_empty() {
        return Err(AppError::validation("At least one job_id is required"));
    }
    if let Some(radius) = input.broadcast_radius {
        if !radius.is_finite() || radius < 0.0 {
            return Err(AppError::validation("broadcast_radius must be a non-negative number of miles"));
        }
    }

    let recruiter = store
        .find_user(company_user_id)
        .await?
        .ok_or_else(|| AppError::validation("User not found"))?;
    let company_id = company_id
        .or_else(|| recruiter.company_id())
        .ok_or_else(|| AppError::validation("Only company users can recruit"))?;
    let company = store
        .find_company(company_id)
        .await?
        .ok_or_else(|| AppError::validation(format!("Company {} not found", company_id)))?;

    let phone_numbers = input
        .phone_numbers
        .iter()
        .map(|raw| {
            PhoneNumber::parse(raw)
                .map_err(|e| AppError::validation(format!("Invalid phone number '{}': {}", raw, e)))
        })
        .collect::<AppResult<Vec<_>>>()?;

    let jobs = load_jobs(&input.job_ids, deps).await?;

    let resolved = resolve_recipients(
        RecipientQuery {
            jobs: &jobs,
            company_id,
            broadcast_radius_miles: input.broadcast_radius,
            re_recruit_user_ids: &input.re_recruit_worker_user_ids,
            phone_numbers: &phone_numbers,
        },
        store,
        Utc::now(),
    )
    .await?;

    // Jobs run in order so stub users created for one job are found by the next.
    let mut recruits = Vec::with_capacity(jobs.len());
    for (job, recipients) in jobs.iter().zip(&resolved.by_job) {
        let recruit = record_recruit(
            job,
            company_id,
            company_user_id,
            input.broadcast_radius,
            &input.re_recruit_worker_user_ids,
            &recipients.user_ids,
            store,
        )
        .await?;
        recruits.push(recruit);

        let mut targets: Vec<Recipient> = recipients
            .user_ids
            .iter()
            .copied()
            .map(Recipient::ByUserId)
            .collect();
        targets.extend(
            resolved
                .unmatched_phone_numbers
                .iter()
                .cloned()
                .map(Recipient::ByPhoneNumber),
        );
        if targets.is_empty() {
            continue;
        }

        let request = SendMessage::builder()
            .sender_user_id(company_user_id)
            .sender_company_id(company_id)
            .message_type(MessageType::Recruit)
            .job_id(job.id)
            .body(recruit_message_body(job, &company))
            .recipients(targets)
            .build();

        if let Err(e) = send_message(request, deps).await {
            error!(job_id = %job.id, error = %e, "recruit fan-out failed");
        }
    }

    info!(
        company_id = %company_id,
        recruits = recruits.len(),
        unmatched_numbers = resolved.unmatched_phone_numbers.len(),
        "recruits created"
    );
    Ok(recruits)
}

/// Jobs in request order. Missing ids are skipped with a warning.
async fn load_jobs(ids: &[JobId], deps: &ServerDeps) -> AppResult<Vec<Job>> {
    let mut unique: Vec<JobId> = Vec::new();
    let mut seen = HashSet::new();
    for id in ids {
        if seen.insert(*id) {
            unique.push(*id);
        }
    }

    let found = deps.store.find_jobs(&unique).await?;
    let mut jobs = Vec::with_capacity(found.len());
    for id in &unique {
        match found.iter().find(|j| j.id == *id) {
            Some(job) => jobs.push(job.clone()),
            None => warn!(job_id = %id, "job not found, skipping"),
        }
    }
    Ok(jobs)
}

/// Recruit history for the company, newest first.
pub async fn list_recruits(
    company_id: Option<CompanyId>,
    job_id: Option<JobId>,
    deps: &ServerDeps,
) -> AppResult<Vec<Recruit>> {
    let company_id =
        company_id.ok_or_else(|| AppError::validation("Only company users can view recruits"))?;
    Ok(deps.store.find_recruits(company_id, job_id).await?)
}
