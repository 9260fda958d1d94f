//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `volsmoke_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! 레코더가 설치되지 않으면 모든 호출은 no-op입니다.

use metrics::{describe_counter, describe_histogram};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (passed, aborted)
pub const LABEL_RESULT: &str = "result";

/// 라이프사이클 상태 레이블 키 (provisioned, mounted, ...)
pub const LABEL_STATE: &str = "state";

/// 스토리지 연산 레이블 키 (unmount, delete, cleanup_residue)
pub const LABEL_OPERATION: &str = "operation";

// ─── Harness 메트릭 ─────────────────────────────────────────────────

/// 실행된 라이프사이클 수 (counter, label: result)
pub const LIFECYCLE_RUNS_TOTAL: &str = "volsmoke_lifecycle_runs_total";

/// 스텝별 소요 시간 (histogram, 초, label: state)
pub const LIFECYCLE_STEP_DURATION_SECONDS: &str = "volsmoke_lifecycle_step_duration_seconds";

/// 수렴 폴링 시도 수 (counter)
pub const CONVERGENCE_ATTEMPTS_TOTAL: &str = "volsmoke_convergence_attempts_total";

/// 수렴 실패(예산 소진) 수 (counter)
pub const CONVERGENCE_TIMEOUTS_TOTAL: &str = "volsmoke_convergence_timeouts_total";

/// 정리 작업 중 무시된 실패 수 (counter, label: operation)
pub const CLEANUP_FAILURES_TOTAL: &str = "volsmoke_cleanup_failures_total";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    describe_counter!(
        LIFECYCLE_RUNS_TOTAL,
        "Total number of lifecycle verification runs by result"
    );
    describe_histogram!(
        LIFECYCLE_STEP_DURATION_SECONDS,
        "Time spent in each lifecycle step in seconds"
    );
    describe_counter!(
        CONVERGENCE_ATTEMPTS_TOTAL,
        "Total number of inventory polls made while waiting for convergence"
    );
    describe_counter!(
        CONVERGENCE_TIMEOUTS_TOTAL,
        "Total number of convergence waits that exhausted their attempt budget"
    );
    describe_counter!(
        CLEANUP_FAILURES_TOTAL,
        "Total number of best-effort cleanup operations that failed"
    );
}
