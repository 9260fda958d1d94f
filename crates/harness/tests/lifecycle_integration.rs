//! 라이프사이클 하네스 통합 테스트
//!
//! 인메모리 클라이언트로 전체 시퀀스, 실패 경로, 정리 보장을 검증합니다.

use std::sync::Arc;
use std::time::Duration;

use volsmoke_core::error::StorageError;
use volsmoke_harness::{
    BaselinePolicy, CleanupGuard, HarnessConfig, HarnessError, InMemoryStorageClient,
    LifecycleHarness, LifecycleState, StorageOp, Verdict,
};

fn harness(
    client: &Arc<InMemoryStorageClient>,
    config: HarnessConfig,
) -> LifecycleHarness<InMemoryStorageClient> {
    LifecycleHarness::builder()
        .client(Arc::clone(client))
        .config(config)
        .build()
        .unwrap()
}

fn default_harness(client: &Arc<InMemoryStorageClient>) -> LifecycleHarness<InMemoryStorageClient> {
    harness(client, HarnessConfig::default())
}

#[tokio::test(start_paused = true)]
async fn concrete_scenario_passes_and_restores_inventory() {
    let client = Arc::new(InMemoryStorageClient::new());

    let report = default_harness(&client).run().await;

    assert!(report.passed(), "failure: {:?}", report.failure);
    assert_eq!(report.baseline, Some(0));
    assert_eq!(report.completed_states(), LifecycleState::ALL.to_vec());
    assert!(report.failure.is_none());
    assert_eq!(client.live_count(), 0);

    use StorageOp::*;
    assert_eq!(
        client.calls(),
        vec![
            List, Create, List, Mount, Write, Read, Unmount, Delete, List,
            // 정리: 이미 원상태라 unmount/delete는 NotFound로 끝남
            Unmount, Delete, CleanupResidue,
        ]
    );
    assert!(report.cleanup.is_clean(), "cleanup: {:?}", report.cleanup);
    assert!(report.cleanup.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn create_failure_stops_sequence_but_cleanup_runs() {
    let client = Arc::new(
        InMemoryStorageClient::new()
            .with_failure(StorageOp::Create, StorageError::operation("create", "quota exceeded")),
    );

    let report = default_harness(&client).run().await;

    assert_eq!(
        report.verdict,
        Verdict::Aborted {
            at: LifecycleState::Provisioned
        }
    );
    assert_eq!(
        report.failure,
        Some(HarnessError::Operation {
            state: LifecycleState::Provisioned,
            reason: "create failed: quota exceeded".to_owned(),
        })
    );
    assert_eq!(report.completed_states(), vec![LifecycleState::Baseline]);

    assert_eq!(client.call_count(StorageOp::Mount), 0);
    assert_eq!(client.call_count(StorageOp::Write), 0);
    assert_eq!(client.call_count(StorageOp::Unmount), 1);
    assert_eq!(client.call_count(StorageOp::Delete), 1);
    // 생성된 적 없는 볼륨의 정리는 성공으로 간주
    assert!(report.cleanup.is_clean());
}

#[tokio::test(start_paused = true)]
async fn eventual_consistency_lag_is_absorbed() {
    let client = Arc::new(
        InMemoryStorageClient::new()
            .with_preexisting(3)
            .with_visibility_lag(2),
    );

    let report = default_harness(&client).run().await;

    assert!(report.passed(), "failure: {:?}", report.failure);
    assert_eq!(report.baseline, Some(3));
    // baseline 1회 + 수렴 폴링 3회씩 두 번
    assert_eq!(client.call_count(StorageOp::List), 7);
    // 미수렴 두 번씩, 2초 간격
    assert_eq!(report.duration_ms, 8_000);
    assert_eq!(client.live_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn convergence_timeout_reports_expected_and_observed() {
    let client = Arc::new(InMemoryStorageClient::new().with_visibility_lag(100));
    let start = tokio::time::Instant::now();

    let report = default_harness(&client).run().await;

    assert_eq!(
        report.failure,
        Some(HarnessError::ConvergenceTimeout {
            state: LifecycleState::Provisioned,
            baseline: 0,
            expected: 1,
            attempts: 10,
            last_observed: Some(0),
        })
    );
    assert_eq!(start.elapsed(), Duration::from_secs(20));
    assert_eq!(client.call_count(StorageOp::Mount), 0);

    // 정리로 생성된 볼륨은 삭제됨
    assert!(report.cleanup.delete_ok);
    assert!(!client.volume_exists());

    let message = report.failure.unwrap().to_string();
    assert!(message.contains("expected 1"));
    assert!(message.contains("never converged"));
}

#[tokio::test(start_paused = true)]
async fn transient_list_failures_do_not_abort() {
    let client = Arc::new(InMemoryStorageClient::new().with_flaky_lists_after_create(3));

    let report = default_harness(&client).run().await;

    assert!(report.passed(), "failure: {:?}", report.failure);
}

#[tokio::test(start_paused = true)]
async fn wrapped_read_passes_containment_check() {
    let client = Arc::new(
        InMemoryStorageClient::new().with_read_wrapping("pod/reader: ", "\n"),
    );

    let report = default_harness(&client).run().await;

    assert!(report.passed(), "failure: {:?}", report.failure);
}

#[tokio::test(start_paused = true)]
async fn content_mismatch_is_distinct_failure() {
    let client = Arc::new(InMemoryStorageClient::new().with_corrupted_reads("garbage"));

    let report = default_harness(&client).run().await;

    assert_eq!(
        report.failure,
        Some(HarnessError::ContentMismatch {
            target: "testFile1".to_owned(),
            expected: "Test Data".to_owned(),
            actual: "garbage".to_owned(),
        })
    );
    assert_eq!(
        report.verdict,
        Verdict::Aborted {
            at: LifecycleState::Verified
        }
    );
    assert!(report.cleanup.is_clean());
    assert_eq!(client.live_count(), 0);
    assert!(!client.is_mounted());
}

#[tokio::test(start_paused = true)]
async fn panicking_step_is_reported_and_cleaned_up() {
    let client = Arc::new(InMemoryStorageClient::new().with_panic_on(StorageOp::Mount));

    let report = default_harness(&client).run().await;

    match report.failure {
        Some(HarnessError::Aborted { state, ref reason }) => {
            assert_eq!(state, LifecycleState::Mounted);
            assert!(reason.contains("injected panic"), "reason: {reason}");
        }
        ref other => panic!("expected Aborted, got {other:?}"),
    }
    assert_eq!(
        report.completed_states(),
        vec![LifecycleState::Baseline, LifecycleState::Provisioned]
    );
    assert!(report.cleanup.delete_ok);
    assert!(!client.volume_exists());
}

#[tokio::test(start_paused = true)]
async fn strict_baseline_failure_is_fatal() {
    let client = Arc::new(InMemoryStorageClient::new().with_failure(
        StorageOp::List,
        StorageError::Connection("api server unreachable".to_owned()),
    ));

    let report = default_harness(&client).run().await;

    assert_eq!(report.baseline, None);
    assert!(matches!(report.failure, Some(HarnessError::Baseline { .. })));
    assert_eq!(
        report.verdict,
        Verdict::Aborted {
            at: LifecycleState::Baseline
        }
    );
    assert_eq!(client.call_count(StorageOp::Create), 0);
    // 정리는 baseline 실패에도 시도됨
    assert_eq!(client.call_count(StorageOp::CleanupResidue), 1);
}

#[tokio::test(start_paused = true)]
async fn assume_empty_baseline_continues_with_zero() {
    let client = Arc::new(InMemoryStorageClient::new().with_failure(
        StorageOp::List,
        StorageError::Connection("api server unreachable".to_owned()),
    ));
    let config = HarnessConfig::builder()
        .baseline_policy(BaselinePolicy::AssumeEmpty)
        .max_attempts(3)
        .poll_delay_ms(100)
        .build()
        .unwrap();

    let report = harness(&client, config).run().await;

    assert_eq!(report.baseline, Some(0));
    assert_eq!(client.call_count(StorageOp::Create), 1);
    assert_eq!(
        report.failure,
        Some(HarnessError::ConvergenceTimeout {
            state: LifecycleState::Provisioned,
            baseline: 0,
            expected: 1,
            attempts: 3,
            last_observed: None,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn skip_cleanup_leaves_platform_untouched() {
    let client = Arc::new(InMemoryStorageClient::new().with_failure(
        StorageOp::Write,
        StorageError::operation("write", "read-only filesystem"),
    ));
    let config = HarnessConfig::builder().skip_cleanup(true).build().unwrap();

    let report = harness(&client, config).run().await;

    assert!(!report.passed());
    assert!(report.cleanup.skipped);
    assert_eq!(client.call_count(StorageOp::Unmount), 0);
    assert!(client.volume_exists());
    assert!(client.is_mounted());
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let client = Arc::new(InMemoryStorageClient::new().with_residue(2));
    let guard = CleanupGuard::register(Arc::clone(&client));

    assert!(!guard.has_run().await);
    let first = guard.run().await;
    let second = guard.run().await;

    assert_eq!(first, second);
    assert!(guard.has_run().await);
    assert_eq!(client.call_count(StorageOp::Unmount), 1);
    assert_eq!(client.call_count(StorageOp::Delete), 1);
    assert_eq!(client.call_count(StorageOp::CleanupResidue), 1);
    assert_eq!(client.residue(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelled_run_still_cleans_up() {
    let client = Arc::new(InMemoryStorageClient::new().with_visibility_lag(100));
    let harness = default_harness(&client);

    let result = tokio::time::timeout(Duration::from_secs(3), harness.run()).await;
    assert!(result.is_err(), "run should have been cancelled mid-poll");

    // 드롭된 가드가 띄운 정리 태스크가 실행될 시간
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(client.call_count(StorageOp::Delete), 1);
    assert!(!client.volume_exists());
}

#[test]
fn builder_requires_client() {
    let result = LifecycleHarness::<InMemoryStorageClient>::builder().build();
    assert!(matches!(
        result,
        Err(HarnessError::Config { ref field, .. }) if field == "client"
    ));
}

#[test]
fn builder_rejects_invalid_config() {
    let config = HarnessConfig {
        target_name: "a/b".to_owned(),
        ..HarnessConfig::default()
    };
    let result = LifecycleHarness::builder()
        .client(Arc::new(InMemoryStorageClient::new()))
        .config(config)
        .build();
    assert!(matches!(
        result,
        Err(HarnessError::Config { ref field, .. }) if field == "target_name"
    ));
}

#[tokio::test(start_paused = true)]
async fn report_serializes_failure_kind() {
    let client = Arc::new(InMemoryStorageClient::new().with_corrupted_reads("x"));

    let report = default_harness(&client).run().await;
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["verdict"]["verdict"], "aborted");
    assert_eq!(json["verdict"]["at"], "verified");
    assert_eq!(json["failure"]["kind"], "content_mismatch");
    assert_eq!(json["baseline"], 0);
}
