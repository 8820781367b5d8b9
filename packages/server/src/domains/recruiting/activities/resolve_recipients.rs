//! Who a recruit call reaches, per job

use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::common::utils::geo::miles_to_radians;
use crate::common::{CompanyId, JobId, PhoneNumber, UserId};
use crate::domains::jobs::Job;
use crate::domains::users::{EligibilityFilter, NearQuery, User};
use crate::kernel::BaseStore;

/// New-job-locked accounts younger than this are left out of broadcasts.
pub const NEWJOB_LOCK_WINDOW_DAYS: i64 = 365;

#[derive(Debug, Clone)]
pub struct RecipientQuery<'a> {
    pub jobs: &'a [Job],
    pub company_id: CompanyId,
    pub broadcast_radius_miles: Option<f64>,
    pub re_recruit_user_ids: &'a [UserId],
    pub phone_numbers: &'a [PhoneNumber],
}

#[derive(Debug, Clone, PartialEq)]
pub struct JobRecipients {
    pub job_id: JobId,
    /// Deduplicated, broadcast hits first
    pub user_ids: Vec<UserId>,
}

#[derive(Debug, Default)]
pub struct ResolvedRecipients {
    /// Same order as the input jobs
    pub by_job: Vec<JobRecipients>,
    /// Numbers that matched an existing user; these get no invite
    pub matched_phone_numbers: Vec<PhoneNumber>,
    /// Numbers with no user; these get a stub account and an invite SMS
    pub unmatched_phone_numbers: Vec<PhoneNumber>,
}

#[instrument(skip(query, store), fields(jobs = query.jobs.len(), radius = ?query.broadcast_radius_miles))]
pub async fn resolve_recipients(
    query: RecipientQuery<'_>,
    store: &dyn BaseStore,
    now: DateTime<Utc>,
) -> Result<ResolvedRecipients> {
    let explicit = explicit_users(query.re_recruit_user_ids, store).await?;

    let phone_users = if query.phone_numbers.is_empty() {
        Vec::new()
    } else {
        store.find_users_by_phone(query.phone_numbers).await?
    };
    let (matched_phone_numbers, unmatched_phone_numbers) =
        split_phone_numbers(query.phone_numbers, &phone_users);

    let broadcast = match query.broadcast_radius_miles {
        Some(miles) if miles > 0.0 => {
            broadcast_hits(query.jobs, query.company_id, miles, store, now).await?
        }
        _ => vec![Vec::new(); query.jobs.len()],
    };

    let by_job = query
        .jobs
        .iter()
        .zip(broadcast)
        .map(|(job, hits)| JobRecipients {
            job_id: job.id,
            user_ids: union_ids(hits.iter().chain(&explicit).chain(&phone_users)),
        })
        .collect::<Vec<_>>();

    for job in &by_job {
        debug!(job_id = %job.job_id, recipients = job.user_ids.len(), "resolved job recipients");
    }

    Ok(ResolvedRecipients {
        by_job,
        matched_phone_numbers,
        unmatched_phone_numbers,
    })
}

async fn explicit_users(ids: &[UserId], store: &dyn BaseStore) -> Result<Vec<User>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut users = store.find_users(ids).await?;
    users.sort_by_key(|u| ids.iter().position(|id| *id == u.id));
    Ok(users)
}

/// One geo query per (job, location), all in flight together.
async fn broadcast_hits(
    jobs: &[Job],
    company_id: CompanyId,
    miles: f64,
    store: &dyn BaseStore,
    now: DateTime<Utc>,
) -> Result<Vec<Vec<User>>> {
    let eligibility = EligibilityFilter {
        locked_created_before: now - Duration::days(NEWJOB_LOCK_WINDOW_DAYS),
        roster: store.find_roster_user_ids(company_id).await?,
    };
    let max_distance_radians = miles_to_radians(miles);

    let queries: Vec<(usize, NearQuery)> = jobs
        .iter()
        .enumerate()
        .flat_map(|(index, job)| {
            let eligibility = eligibility.clone();
            job.locations().iter().map(move |location| {
                (
                    index,
                    NearQuery {
                        point: location.loc,
                        max_distance_radians,
                        eligibility: eligibility.clone(),
                    },
                )
            })
        })
        .collect();

    let results = try_join_all(
        queries
            .iter()
            .map(|(_, near)| store.find_users_near(near)),
    )
    .await?;

    let mut per_job: Vec<Vec<User>> = vec![Vec::new(); jobs.len()];
    for ((index, _), users) in queries.iter().zip(results) {
        per_job[*index].extend(users);
    }
    Ok(per_job)
}

fn split_phone_numbers(
    requested: &[PhoneNumber],
    found: &[User],
) -> (Vec<PhoneNumber>, Vec<PhoneNumber>) {
    let known: HashSet<&PhoneNumber> = found.iter().filter_map(|u| u.phone_number.as_ref()).collect();
    let mut seen: HashSet<&PhoneNumber> = HashSet::new();
    let mut matched = Vec::new();
    let mut unmatched = Vec::new();
    for phone in requested {
        if !seen.insert(phone) {
            continue;
        }
        if known.contains(phone) {
            matched.push(phone.clone());
        } else {
            unmatched.push(phone.clone());
        }
    }
    (matched, unmatched)
}

fn union_ids<'a>(users: impl Iterator<Item = &'a User>) -> Vec<UserId> {
    let mut seen = HashSet::new();
    users
        .filter(|u| seen.insert(u.id))
        .map(|u| u.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_keeps_first_occurrence_order() {
        let a = User::new_onboarding_worker(PhoneNumber::us("5550000001"));
        let b = User::new_onboarding_worker(PhoneNumber::us("5550000002"));
        let ids = union_ids([&a, &b, &a, &b].into_iter());
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[test]
    fn matched_numbers_are_not_unmatched() {
        let user = User::new_onboarding_worker(PhoneNumber::us("5551234567"));
        let requested = vec![
            PhoneNumber::us("5551234567"),
            PhoneNumber::us("5559999999"),
            PhoneNumber::us("5559999999"),
        ];
        let (matched, unmatched) = split_phone_numbers(&requested, &[user]);
        assert_eq!(matched, vec![PhoneNumber::us("5551234567")]);
        assert_eq!(unmatched, vec![PhoneNumber::us("5559999999")]);
    }
}
