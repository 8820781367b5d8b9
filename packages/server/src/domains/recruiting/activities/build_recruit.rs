use anyhow::Result;
use tracing::debug;

use crate::common::{CompanyId, UserId};
use crate::domains::jobs::Job;
use crate::domains::recruiting::models::{Recruit, RecruitRequest};
use crate::kernel::BaseStore;

/// Write the audit record for one job, even when nobody was reached.
pub async fn record_recruit(
    job: &Job,
    company_id: CompanyId,
    company_user_id: UserId,
    broadcast_radius: Option<f64>,
    re_recruit_ids: &[UserId],
    recipients: &[UserId],
    store: &dyn BaseStore,
) -> Result<Recruit> {
    let recruit = Recruit::build(
        company_id,
        company_user_id,
        RecruitRequest {
            job_id: job.id,
            broadcast_radius,
            re_recruit_worker_user_ids: re_recruit_ids.to_vec(),
        },
        recipients.to_vec(),
    );

    let saved = store.insert_recruit(&recruit).await?;
    debug!(
        recruit_id = %saved.id,
        job_id = %job.id,
        recruited = saved.recruited_worker_user_ids.len(),
        "recruit recorded"
    );
    Ok(saved)
}
