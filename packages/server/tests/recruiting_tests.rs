//! Recruit creation: broadcast search, lock filtering, audit records and the
//! hand-off to messaging.

mod common;

use std::collections::HashSet;

use common::*;
use laborhub_core::common::{JobId, PhoneNumber};
use laborhub_core::domains::messaging::MessageType;
use laborhub_core::domains::recruiting::{create_recruits, list_recruits, CreateRecruits};
use laborhub_core::domains::users::UserType;
use laborhub_core::kernel::test_dependencies::{MemoryStore, StoreWrite};
use laborhub_core::kernel::{DispatchTask, TestDependencies};
use test_context::test_context;

#[test_context(TestHarness)]
#[tokio::test]
async fn broadcast_reaches_nearby_unlocked_and_roster_workers_only(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job_a = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let job_b = create_job_at(store, &company, "Picker", JOBSITE);

    let nearby = create_worker_at(store, "5550000001", NEARBY);
    let far = create_worker_at(store, "5550000002", FAR_AWAY);
    let locked_stranger = create_locked_worker_at(store, "5550000003", NEARBY);
    let locked_roster = create_locked_worker_at(store, "5550000004", NEARBY);
    store.put_myworker(company.id, locked_roster.id);

    let recruits = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job_a.id, job_b.id],
            broadcast_radius: Some(5.0),
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    assert_eq!(recruits.len(), 2);
    for recruit in &recruits {
        let ids: HashSet<_> = recruit.recruited_worker_user_ids.iter().copied().collect();
        assert!(ids.contains(&nearby.id));
        assert!(ids.contains(&locked_roster.id));
        assert!(!ids.contains(&far.id));
        assert!(!ids.contains(&locked_stranger.id));
        assert_eq!(ids.len(), recruit.recruited_worker_user_ids.len());
    }
    assert_eq!(recruits[0].request.job_id, job_a.id);
    assert_eq!(recruits[1].request.job_id, job_b.id);

    // One recruit message per job
    let messages = store.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages
        .iter()
        .all(|m| m.message_type == MessageType::Recruit && m.sender.user_id == recruiter.id));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn explicit_re_recruit_overrides_the_new_job_lock(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let locked = create_locked_worker_at(store, "5550000003", NEARBY);

    let recruits = create_recruits(
        recruiter.id,
        None,
        CreateRecruits {
            job_ids: vec![job.id],
            broadcast_radius: Some(5.0),
            re_recruit_worker_user_ids: vec![locked.id],
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    assert_eq!(recruits[0].recruited_worker_user_ids, vec![locked.id]);
    assert_eq!(recruits[0].request.re_recruit_worker_user_ids, vec![locked.id]);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn overlapping_broadcast_and_re_recruit_lists_count_each_worker_once(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let nearby = create_worker_at(store, "5550000001", NEARBY);
    let also_nearby = create_worker_at(store, "5550000005", NEARBY);

    let recruits = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            broadcast_radius: Some(5.0),
            re_recruit_worker_user_ids: vec![nearby.id, nearby.id],
            phone_numbers: vec!["(555) 000-0005".to_string()],
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    let ids = &recruits[0].recruited_worker_user_ids;
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&nearby.id));
    assert!(ids.contains(&also_nearby.id));

    let message = &store.messages()[0];
    assert_eq!(message.receivers.len(), 2);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn phone_number_of_an_existing_worker_is_not_treated_as_unmatched(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let u1 = create_worker_at(store, "5550000001", FAR_AWAY);
    let u2 = create_worker_at(store, "5551234567", FAR_AWAY);
    let users_before = store.users().len();

    let recruits = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            re_recruit_worker_user_ids: vec![u1.id, u2.id],
            phone_numbers: vec!["5551234567".to_string()],
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    assert_eq!(recruits[0].recruited_worker_user_ids, vec![u1.id, u2.id]);
    assert_eq!(store.users().len(), users_before);
    assert!(store.invites().is_empty());
    assert!(ctx.deps.dispatch_queue.sms_tasks().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn unknown_phone_number_is_onboarded_once_across_jobs(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job_a = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let job_b = create_job_at(store, &company, "Picker", JOBSITE);

    create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job_a.id, job_b.id],
            phone_numbers: vec!["555-999-9999".to_string()],
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    let stub = store
        .user_by_phone(&PhoneNumber::us("5559999999"))
        .expect("stub user created");
    assert_eq!(stub.user_type, UserType::OnboardingWorker);
    assert_eq!(store.myworkers().len(), 1);
    assert_eq!(store.invites().len(), 1);

    let messages = store.messages();
    assert_eq!(messages.len(), 2);
    for message in &messages {
        assert!(message.is_addressed_to(stub.id));
    }

    let sms = ctx.deps.dispatch_queue.sms_tasks();
    assert_eq!(sms.len(), 2);
    match &sms[0] {
        DispatchTask::Sms { body, billable, .. } => {
            assert_eq!(
                body,
                "Acme Staffing is hiring: Forklift Operator, $18.00/hour. \
                 Download the app to apply: https://laborhub.test/download?phone=%2B15559999999"
            );
            assert!(*billable);
        }
        other => panic!("expected sms task, got {:?}", other),
    }

    // The stub user is written before the first message that names it
    let writes = store.writes();
    let user_write = writes
        .iter()
        .position(|w| *w == StoreWrite::User(stub.id))
        .unwrap();
    let first_message = writes
        .iter()
        .position(|w| matches!(w, StoreWrite::Message(_)))
        .unwrap();
    assert!(user_write < first_message);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn missing_jobs_are_skipped_and_empty_jobs_still_get_a_recruit(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let staffed = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let remote = create_job_at(store, &company, "Remote Picker", FAR_AWAY);
    create_worker_at(store, "5550000001", NEARBY);

    let recruits = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![JobId::new(), staffed.id, remote.id],
            broadcast_radius: Some(5.0),
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    assert_eq!(recruits.len(), 2);
    assert_eq!(recruits[0].request.job_id, staffed.id);
    assert_eq!(recruits[0].recruited_worker_user_ids.len(), 1);
    assert_eq!(recruits[1].request.job_id, remote.id);
    assert!(recruits[1].recruited_worker_user_ids.is_empty());

    assert_eq!(store.recruits().len(), 2);
    // Nobody to message for the remote job
    assert_eq!(store.messages().len(), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn radius_of_zero_disables_the_broadcast(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    create_worker_at(store, "5550000001", JOBSITE);

    let recruits = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            broadcast_radius: Some(0.0),
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap();

    assert!(recruits[0].recruited_worker_user_ids.is_empty());
    assert!(store.messages().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn validation_failures_write_nothing(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let worker = create_worker_at(store, "5550000001", NEARBY);
    let deps = ctx.server_deps();

    let no_jobs = create_recruits(recruiter.id, Some(company.id), CreateRecruits::default(), deps)
        .await
        .unwrap_err();
    assert!(no_jobs.is_validation());

    let negative_radius = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            broadcast_radius: Some(-1.0),
            ..Default::default()
        },
        deps,
    )
    .await
    .unwrap_err();
    assert!(negative_radius.is_validation());

    let not_a_company = create_recruits(
        worker.id,
        None,
        CreateRecruits {
            job_ids: vec![job.id],
            ..Default::default()
        },
        deps,
    )
    .await
    .unwrap_err();
    assert!(not_a_company.is_validation());

    let bad_phone = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            phone_numbers: vec!["12345".to_string()],
            ..Default::default()
        },
        deps,
    )
    .await
    .unwrap_err();
    assert!(bad_phone.is_validation());

    assert!(store.writes().is_empty());
    assert!(ctx.deps.dispatch_queue.all_tasks().is_empty());
}

#[tokio::test]
async fn geo_query_failure_aborts_before_any_write() {
    let company = laborhub_core::domains::jobs::Company::new("Acme Staffing");
    let deps = TestDependencies::new()
        .mock_store(MemoryStore::new().with_company(company.clone()).failing_geo_queries());
    let ctx = TestHarness::with_deps(deps);
    let store = ctx.store();
    let recruiter = create_company_user(store, &company);
    let job = create_job_at(store, &company, "Forklift Operator", JOBSITE);

    let err = create_recruits(
        recruiter.id,
        Some(company.id),
        CreateRecruits {
            job_ids: vec![job.id],
            broadcast_radius: Some(5.0),
            ..Default::default()
        },
        ctx.server_deps(),
    )
    .await
    .unwrap_err();

    assert!(!err.is_validation());
    assert!(store.writes().is_empty());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn recruit_history_is_scoped_to_the_company_and_job(ctx: &TestHarness) {
    let store = ctx.store();
    let company = create_company(store, "Acme Staffing");
    let rival = create_company(store, "Rival Labor");
    let recruiter = create_company_user(store, &company);
    let rival_recruiter = create_company_user(store, &rival);
    let job_a = create_job_at(store, &company, "Forklift Operator", JOBSITE);
    let job_b = create_job_at(store, &company, "Picker", JOBSITE);
    let rival_job = create_job_at(store, &rival, "Loader", JOBSITE);
    let deps = ctx.server_deps();

    let input = |job_ids: Vec<JobId>| CreateRecruits {
        job_ids,
        ..Default::default()
    };
    create_recruits(recruiter.id, Some(company.id), input(vec![job_a.id, job_b.id]), deps)
        .await
        .unwrap();
    create_recruits(rival_recruiter.id, Some(rival.id), input(vec![rival_job.id]), deps)
        .await
        .unwrap();

    let all = list_recruits(Some(company.id), None, deps).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(|r| r.company_id == company.id));
    assert!(all[0].created_at >= all[1].created_at);

    let only_b = list_recruits(Some(company.id), Some(job_b.id), deps).await.unwrap();
    assert_eq!(only_b.len(), 1);
    assert_eq!(only_b[0].request.job_id, job_b.id);

    assert!(list_recruits(None, None, deps).await.unwrap_err().is_validation());
}
