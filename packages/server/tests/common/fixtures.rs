//! Test fixtures for creating test data.
//!
//! Each fixture builds the record and seeds it into the memory store.

use chrono::{Duration, Utc};
use laborhub_core::common::{GeoPoint, Language, PhoneNumber, UserId};
use laborhub_core::domains::jobs::{Company, Job, JobLocation};
use laborhub_core::domains::users::{
    CompanyMembership, User, UserType, WorkerLocation, WorkerProfile,
};
use laborhub_core::kernel::test_dependencies::MemoryStore;

/// Downtown Minneapolis
pub const JOBSITE: GeoPoint = GeoPoint {
    lng: -93.2650,
    lat: 44.9778,
};

/// About 0.7 miles north of `JOBSITE`
pub const NEARBY: GeoPoint = GeoPoint {
    lng: -93.2650,
    lat: 44.9878,
};

/// About 69 miles north of `JOBSITE`
pub const FAR_AWAY: GeoPoint = GeoPoint {
    lng: -93.2650,
    lat: 45.9778,
};

pub fn create_company(store: &MemoryStore, name: &str) -> Company {
    let company = Company::new(name);
    store.put_company(company.clone());
    company
}

/// A company admin belonging to `company`
pub fn create_company_user(store: &MemoryStore, company: &Company) -> User {
    let user = User {
        id: UserId::new(),
        user_type: UserType::CompanyAdmin,
        username: format!("admin@{}", company.name.to_lowercase().replace(' ', "")),
        phone_number: None,
        worker: None,
        company: Some(CompanyMembership {
            company_id: company.id,
        }),
        player_ids: vec!["player-admin".to_string()],
        language: Language::En,
        created_at: Utc::now(),
    };
    store.put_user(user.clone());
    user
}

/// Registered worker with the app installed, unlocked, signed up two years ago
pub fn create_worker_at(store: &MemoryStore, phone: &str, point: GeoPoint) -> User {
    let user = worker(phone, Some(point), false, Utc::now() - Duration::days(730));
    store.put_user(user.clone());
    user
}

/// Registered worker created yesterday with the new-job lock still on
pub fn create_locked_worker_at(store: &MemoryStore, phone: &str, point: GeoPoint) -> User {
    let user = worker(phone, Some(point), true, Utc::now() - Duration::days(1));
    store.put_user(user.clone());
    user
}

/// Stub account that has not finished signup
pub fn create_onboarding_worker(store: &MemoryStore, phone: &str) -> User {
    let user = User::new_onboarding_worker(PhoneNumber::us(phone));
    store.put_user(user.clone());
    user
}

pub fn create_job_at(store: &MemoryStore, company: &Company, title: &str, point: GeoPoint) -> Job {
    let mut job = Job::new(
        company.id,
        title,
        vec![JobLocation {
            address: "Jobsite".to_string(),
            loc: point,
        }],
    );
    job.pay_rate = Some(18.0);
    store.put_job(job.clone());
    job
}

fn worker(phone: &str, loc: Option<GeoPoint>, locked: bool, created_at: chrono::DateTime<Utc>) -> User {
    User {
        id: UserId::new(),
        user_type: UserType::Worker,
        username: format!("worker-{}", phone),
        phone_number: Some(PhoneNumber::us(phone)),
        worker: Some(WorkerProfile {
            location: WorkerLocation {
                address: String::new(),
                loc,
            },
            is_newjob_lock: locked,
        }),
        company: None,
        player_ids: vec![format!("player-{}", phone)],
        language: Language::En,
        created_at,
    }
}
