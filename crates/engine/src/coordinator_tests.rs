// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use baton_core::FakeClock;
use baton_storage::{MemoryStore, StoreError};
use proptest::prelude::*;

fn make_coordinator() -> (Coordinator<MemoryStore, FakeClock>, FakeClock) {
    make_coordinator_with(CoordinatorConfig::new())
}

fn make_coordinator_with(
    config: CoordinatorConfig,
) -> (Coordinator<MemoryStore, FakeClock>, FakeClock) {
    let clock = FakeClock::new();
    let coordinator = Coordinator::new(MemoryStore::new(), clock.clone(), config);
    (coordinator, clock)
}

fn id(s: &str) -> JobId {
    JobId::new(s)
}

/// Submit `ids` one second apart
async fn submit_all(
    coordinator: &Coordinator<MemoryStore, FakeClock>,
    clock: &FakeClock,
    ids: &[&str],
) {
    for job in ids {
        coordinator.submit(&id(job)).await.unwrap();
        clock.advance(Duration::from_secs(1));
    }
}

async fn granted(coordinator: &Coordinator<MemoryStore, FakeClock>, ids: &[&str]) -> Vec<String> {
    let mut out = Vec::new();
    for job in ids {
        if coordinator.poll_turn(&id(job)).await.unwrap() {
            out.push(job.to_string());
        }
    }
    out
}

#[tokio::test]
async fn submit_creates_pending_record() {
    let (coordinator, clock) = make_coordinator();
    let record = coordinator.submit(&id("a")).await.unwrap();

    assert_eq!(record.status, JobStatus::Pending);
    assert_eq!(record.submitted_at, clock.utc_now());
    assert!(record.run_time.is_none());
    assert!(record.error.is_none());
    assert_eq!(coordinator.jobs().await.unwrap(), vec![record]);
}

#[tokio::test]
async fn submit_with_expiry_sets_deadline() {
    let (coordinator, clock) = make_coordinator();
    let record = coordinator
        .submit_with_expiry(&id("a"), Duration::from_secs(10))
        .await
        .unwrap();
    assert_eq!(
        record.expires_at,
        Some(utc_after(clock.utc_now(), Duration::from_secs(10)))
    );
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let (coordinator, _clock) = make_coordinator();
    coordinator.submit(&id("a")).await.unwrap();

    let err = coordinator.submit(&id("a")).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::Store(StoreError::DuplicateKey(_))));
    assert_eq!(coordinator.jobs().await.unwrap().len(), 1);
}

#[tokio::test]
async fn operations_release_the_lock() {
    let (coordinator, _clock) = make_coordinator();
    coordinator.submit(&id("a")).await.unwrap();
    coordinator.poll_turn(&id("a")).await.unwrap();
    let _ = coordinator.complete(&id("zzz"), JobStatus::Failed, None).await;

    let lock = coordinator
        .store()
        .find_one(&Filter::by_id("job_queue_lock"))
        .await
        .unwrap();
    assert!(lock.is_none());
}

#[tokio::test]
async fn empty_queue_grants_nobody() {
    let (coordinator, _clock) = make_coordinator();
    assert!(!coordinator.poll_turn(&id("a")).await.unwrap());
    assert!(coordinator.first_in_line().await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_id_is_never_granted() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;
    assert!(!coordinator.poll_turn(&id("stranger")).await.unwrap());
}

#[tokio::test]
async fn turns_are_granted_in_submission_order() {
    let (coordinator, clock) = make_coordinator();
    let ids = ["a", "b", "c"];
    submit_all(&coordinator, &clock, &ids).await;

    for (i, current) in ids.iter().enumerate() {
        assert_eq!(granted(&coordinator, &ids).await, vec![current.to_string()]);

        coordinator.start(&id(current)).await.unwrap();
        // Nobody else gets in while the turn is held
        assert!(granted(&coordinator, &ids).await.is_empty());

        clock.advance(Duration::from_millis(250));
        let done = coordinator
            .complete(&id(current), JobStatus::Succeeded, None)
            .await
            .unwrap();
        assert_eq!(done.status, JobStatus::Succeeded);
        assert!(done.run_time.unwrap() >= Duration::from_millis(250));

        let remaining = &ids[i + 1..];
        assert_eq!(
            coordinator.first_in_line().await.unwrap().map(|r| r.id),
            remaining.first().map(|s| id(s))
        );
    }
    assert!(granted(&coordinator, &ids).await.is_empty());
}

#[tokio::test]
async fn failed_job_does_not_block_the_next() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a", "b"]).await;

    coordinator.start(&id("a")).await.unwrap();
    let failed = coordinator
        .complete(&id("a"), JobStatus::Failed, Some("Crash".to_string()))
        .await
        .unwrap();
    assert_eq!(failed.error.as_deref(), Some("Crash"));

    assert!(coordinator.poll_turn(&id("b")).await.unwrap());
}

#[tokio::test]
async fn complete_unknown_job_is_not_found() {
    let (coordinator, _clock) = make_coordinator();
    let err = coordinator
        .complete(&id("ghost"), JobStatus::Succeeded, None)
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::NotFound(ref missing) if missing.as_str() == "ghost"));
}

#[tokio::test]
async fn terminal_status_is_final() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;
    coordinator.start(&id("a")).await.unwrap();
    let done = coordinator
        .complete(&id("a"), JobStatus::Succeeded, None)
        .await
        .unwrap();

    for status in [JobStatus::Succeeded, JobStatus::Failed] {
        let err = coordinator
            .complete(&id("a"), status, Some("late".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoordinatorError::IllegalTransition { from: JobStatus::Succeeded, .. }
        ));
    }
    assert!(matches!(
        coordinator.start(&id("a")).await,
        Err(CoordinatorError::IllegalTransition { .. })
    ));
    assert_eq!(coordinator.jobs().await.unwrap(), vec![done]);
}

#[tokio::test]
async fn pending_job_can_fail_but_not_succeed() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a", "b"]).await;

    let err = coordinator
        .complete(&id("a"), JobStatus::Succeeded, None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::IllegalTransition {
            from: JobStatus::Pending,
            to: JobStatus::Succeeded,
            ..
        }
    ));

    let failed = coordinator
        .complete(&id("b"), JobStatus::Failed, Some("gave up".to_string()))
        .await
        .unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.run_time, Some(Duration::from_secs(1)));
}

#[tokio::test]
async fn complete_rejects_non_terminal_status() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;
    for status in [JobStatus::Pending, JobStatus::InProgress] {
        assert!(matches!(
            coordinator.complete(&id("a"), status, None).await,
            Err(CoordinatorError::IllegalTransition { .. })
        ));
    }
}

#[tokio::test]
async fn success_drops_error_text() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;
    coordinator.start(&id("a")).await.unwrap();
    let done = coordinator
        .complete(&id("a"), JobStatus::Succeeded, Some("ignored".to_string()))
        .await
        .unwrap();
    assert!(done.error.is_none());
}

#[tokio::test]
async fn skewed_submission_is_recorded_as_failed() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;

    clock.skew_utc(chrono::Duration::seconds(-30));
    let err = coordinator.submit(&id("b")).await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::OutOfOrderSubmission { ref id, ref first_in_line, .. }
            if id.as_str() == "b" && first_in_line.as_str() == "a"
    ));

    let jobs = coordinator.jobs().await.unwrap();
    let b = jobs.iter().find(|r| r.id.as_str() == "b").unwrap();
    assert_eq!(b.status, JobStatus::Failed);
    assert_eq!(b.error.as_deref(), Some(OUT_OF_ORDER_REASON));

    // The queue itself is unaffected
    assert!(coordinator.poll_turn(&id("a")).await.unwrap());
}

#[tokio::test]
async fn equal_timestamps_fall_back_to_id_order() {
    let (coordinator, _clock) = make_coordinator();
    coordinator.submit(&id("b")).await.unwrap();
    coordinator.submit(&id("a")).await.unwrap();

    assert!(coordinator.poll_turn(&id("a")).await.unwrap());
    assert!(!coordinator.poll_turn(&id("b")).await.unwrap());
}

#[tokio::test]
async fn expired_pending_job_is_skipped() {
    let (coordinator, clock) = make_coordinator();
    coordinator
        .submit_with_expiry(&id("a"), Duration::from_secs(5))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(1));
    coordinator.submit(&id("b")).await.unwrap();

    assert!(!coordinator.poll_turn(&id("b")).await.unwrap());
    clock.advance(Duration::from_secs(5));
    assert!(coordinator.poll_turn(&id("b")).await.unwrap());
    assert!(!coordinator.poll_turn(&id("a")).await.unwrap());
}

#[tokio::test]
async fn running_job_blocks_without_lease() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a", "b"]).await;
    coordinator.start(&id("a")).await.unwrap();

    clock.advance(Duration::from_secs(86_400));
    assert!(!coordinator.poll_turn(&id("b")).await.unwrap());
}

#[tokio::test]
async fn lapsed_lease_stops_blocking() {
    let (coordinator, clock) =
        make_coordinator_with(CoordinatorConfig::new().with_turn_lease(Duration::from_secs(10)));
    submit_all(&coordinator, &clock, &["a", "b"]).await;

    let started = coordinator.start(&id("a")).await.unwrap();
    assert_eq!(
        started.lease_expires_at,
        Some(utc_after(clock.utc_now(), Duration::from_secs(10)))
    );

    clock.advance(Duration::from_secs(8));
    coordinator.renew(&id("a")).await.unwrap();
    clock.advance(Duration::from_secs(8));
    assert!(!coordinator.poll_turn(&id("b")).await.unwrap());

    clock.advance(Duration::from_secs(3));
    assert!(coordinator.poll_turn(&id("b")).await.unwrap());

    // The stalled participant can still close out its own record
    coordinator
        .complete(&id("a"), JobStatus::Failed, Some("stalled".to_string()))
        .await
        .unwrap();
}

#[tokio::test]
async fn renew_requires_running_job() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a"]).await;
    assert!(matches!(
        coordinator.renew(&id("a")).await,
        Err(CoordinatorError::IllegalTransition {
            from: JobStatus::Pending,
            ..
        })
    ));
    assert!(matches!(
        coordinator.renew(&id("ghost")).await,
        Err(CoordinatorError::NotFound(_))
    ));
}

#[tokio::test]
async fn expired_grant_cannot_be_claimed() {
    let (coordinator, clock) = make_coordinator();
    coordinator
        .submit_with_expiry(&id("a"), Duration::from_secs(10))
        .await
        .unwrap();
    clock.advance(Duration::from_secs(1));
    coordinator
        .submit_with_expiry(&id("b"), Duration::from_secs(100))
        .await
        .unwrap();

    clock.advance(Duration::from_secs(7));
    assert!(coordinator.poll_turn(&id("a")).await.unwrap());

    // a stalls between its grant and its claim until its record expires
    clock.advance(Duration::from_secs(2));
    assert!(coordinator.poll_turn(&id("b")).await.unwrap());

    let err = coordinator.start(&id("a")).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::NotFirstInLine(ref job) if *job == id("a")));
    assert!(err.is_turn_lost());
    coordinator.start(&id("b")).await.unwrap();

    let running: Vec<JobId> = coordinator
        .jobs()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.status == JobStatus::InProgress)
        .map(|r| r.id)
        .collect();
    assert_eq!(running, vec![id("b")]);
}

#[tokio::test]
async fn start_fails_while_another_job_holds_the_turn() {
    let (coordinator, clock) =
        make_coordinator_with(CoordinatorConfig::new().with_turn_lease(Duration::from_secs(10)));
    submit_all(&coordinator, &clock, &["a", "b"]).await;
    assert!(coordinator.poll_turn(&id("a")).await.unwrap());
    coordinator.start(&id("a")).await.unwrap();

    // b claims without a grant
    let err = coordinator.start(&id("b")).await.unwrap_err();
    assert!(matches!(
        err,
        CoordinatorError::TurnHeld { ref id, ref holder } if id.as_str() == "b" && holder.as_str() == "a"
    ));

    // Once a's lease lapses b may claim; a cannot claim twice
    clock.advance(Duration::from_secs(11));
    assert!(coordinator.poll_turn(&id("b")).await.unwrap());
    coordinator.start(&id("b")).await.unwrap();
    assert!(matches!(
        coordinator.start(&id("a")).await,
        Err(CoordinatorError::IllegalTransition { .. })
    ));
}

#[tokio::test]
async fn out_of_turn_start_is_not_transient() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a", "b"]).await;
    let err = coordinator.start(&id("b")).await.unwrap_err();
    assert!(!err.is_transient());
    assert!(CoordinatorError::Store(StoreError::MissingId).is_transient());
}

#[tokio::test]
async fn jobs_skips_the_lock_document() {
    let (coordinator, clock) = make_coordinator();
    submit_all(&coordinator, &clock, &["a", "b"]).await;

    coordinator.guard().acquire().await.unwrap();
    let ids: Vec<_> = coordinator
        .jobs()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id.0)
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
    coordinator.guard().release().await.unwrap();
}

proptest! {
    #[test]
    fn admission_follows_submission_time(gaps in prop::collection::vec(1u64..5_000, 1..8)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (submitted, admitted) = runtime.block_on(async {
            let (coordinator, clock) = make_coordinator();
            let ids: Vec<JobId> = (0..gaps.len()).map(|i| id(&format!("job-{i}"))).collect();
            for (job, gap) in ids.iter().zip(&gaps) {
                coordinator.submit(job).await.unwrap();
                clock.advance(Duration::from_millis(*gap));
            }

            let mut order = Vec::new();
            while order.len() < ids.len() {
                let mut granted = Vec::new();
                for job in &ids {
                    if coordinator.poll_turn(job).await.unwrap() {
                        granted.push(job.clone());
                    }
                }
                assert_eq!(granted.len(), 1, "exactly one participant may be granted");
                let job = granted.remove(0);
                coordinator.start(&job).await.unwrap();
                coordinator.complete(&job, JobStatus::Succeeded, None).await.unwrap();
                order.push(job);
            }
            (ids, order)
        });

        prop_assert_eq!(submitted, admitted);
    }
}
