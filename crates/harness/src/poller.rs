//! 수렴 폴링 -- 최종 일관성 지연 흡수
//!
//! 플랫폼의 create/delete 호출은 인벤토리에 반영되기 전에 반환될 수 있습니다.
//! [`ConvergencePoller`]는 인벤토리 개수를 반복 조회하여
//! `현재 개수 == 기준 + 기대 변화량`이 관측될 때까지 기다립니다.
//!
//! - 조회 실패는 "아직 수렴하지 않음"으로 취급하고 계속 폴링합니다.
//! - 일치하는 즉시 반환합니다 (남은 시도를 기다리지 않음).
//! - 예산을 모두 써도 일치하지 않으면 에러가 아닌 `converged == false`를 반환합니다.
//! - 일치하지 않은 시도 뒤에는 매번 (마지막 시도 포함) 지연을 둡니다.
//!   따라서 최악의 대기 시간은 `max_attempts * delay` 입니다.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use volsmoke_core::client::StorageClient;
use volsmoke_core::error::StorageError;
use volsmoke_core::metrics as m;

/// 기본 최대 시도 횟수
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;
/// 기본 시도 간격
pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

/// 수렴 기대값: (기준 개수, 기대 변화량)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceExpectation {
    /// 기준 인벤토리 개수
    pub baseline: usize,
    /// 기준 대비 기대 변화량
    pub delta: isize,
}

impl ConvergenceExpectation {
    /// 새 기대값을 생성합니다.
    pub fn new(baseline: usize, delta: isize) -> Self {
        Self { baseline, delta }
    }

    /// 기대하는 인벤토리 개수. 음수가 되는 조합이면 `None` (절대 만족 불가).
    pub fn target(&self) -> Option<usize> {
        self.baseline.checked_add_signed(self.delta)
    }

    /// 관측값이 기대를 만족하는지 여부
    pub fn is_met_by(&self, observed: usize) -> bool {
        self.target() == Some(observed)
    }
}

/// 폴링 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceOutcome {
    /// 수렴 여부
    pub converged: bool,
    /// 실제 수행한 시도 횟수
    pub attempts: u32,
    /// 마지막으로 성공한 조회의 개수
    pub last_observed: Option<usize>,
}

/// 수렴 폴러
///
/// 순차적으로만 동작합니다. 시도끼리 겹치지 않으며,
/// 지연은 `tokio::time::sleep`으로 실행기에 양보합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergencePoller {
    max_attempts: u32,
    delay: Duration,
}

impl Default for ConvergencePoller {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY)
    }
}

impl ConvergencePoller {
    /// 새 폴러를 생성합니다.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// 최대 시도 횟수
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 시도 간격
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// 최악의 경우 총 대기 시간
    pub fn worst_case_wait(&self) -> Duration {
        self.delay.saturating_mul(self.max_attempts)
    }

    /// `probe`가 반환하는 개수가 기대값과 같아질 때까지 폴링합니다.
    pub async fn wait_for<F, Fut>(
        &self,
        expectation: ConvergenceExpectation,
        mut probe: F,
    ) -> ConvergenceOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<usize, StorageError>>,
    {
        let mut last_observed = None;

        for attempt in 1..=self.max_attempts {
            metrics::counter!(m::CONVERGENCE_ATTEMPTS_TOTAL).increment(1);

            match probe().await {
                Ok(observed) => {
                    last_observed = Some(observed);
                    if expectation.is_met_by(observed) {
                        debug!(
                            attempt,
                            observed,
                            baseline = expectation.baseline,
                            delta = expectation.delta,
                            "inventory converged"
                        );
                        return ConvergenceOutcome {
                            converged: true,
                            attempts: attempt,
                            last_observed,
                        };
                    }
                    debug!(
                        attempt,
                        observed,
                        expected = ?expectation.target(),
                        "inventory not yet converged"
                    );
                }
                Err(e) => {
                    // 수렴 중에는 플랫폼이 일시적으로 응답하지 않을 수 있음
                    warn!(attempt, error = %e, "inventory probe failed, treating as not converged");
                }
            }

            tokio::time::sleep(self.delay).await;
        }

        metrics::counter!(m::CONVERGENCE_TIMEOUTS_TOTAL).increment(1);
        warn!(
            attempts = self.max_attempts,
            last_observed = ?last_observed,
            expected = ?expectation.target(),
            "inventory never converged"
        );

        ConvergenceOutcome {
            converged: false,
            attempts: self.max_attempts,
            last_observed,
        }
    }

    /// 스토리지 클라이언트의 `list_volumes` 개수로 폴링합니다.
    pub async fn wait_for_inventory<S: StorageClient>(
        &self,
        client: &S,
        expectation: ConvergenceExpectation,
    ) -> ConvergenceOutcome {
        self.wait_for(expectation, || async move {
            client.list_volumes().await.map(|volumes| volumes.len())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting_probe(
        calls: Arc<AtomicU32>,
        respond: impl Fn(u32) -> Result<usize, StorageError>,
    ) -> impl FnMut() -> std::future::Ready<Result<usize, StorageError>> {
        move || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(respond(n))
        }
    }

    #[test]
    fn expectation_target_handles_negative_delta() {
        assert_eq!(ConvergenceExpectation::new(5, 1).target(), Some(6));
        assert_eq!(ConvergenceExpectation::new(5, 0).target(), Some(5));
        assert_eq!(ConvergenceExpectation::new(5, -2).target(), Some(3));
        assert_eq!(ConvergenceExpectation::new(0, -1).target(), None);
        assert!(!ConvergenceExpectation::new(0, -1).is_met_by(0));
    }

    #[test]
    fn default_poller_uses_ten_attempts_two_seconds() {
        let poller = ConvergencePoller::default();
        assert_eq!(poller.max_attempts(), 10);
        assert_eq!(poller.delay(), Duration::from_secs(2));
        assert_eq!(poller.worst_case_wait(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn converges_immediately_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::default();
        let start = tokio::time::Instant::now();

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(0, 0),
                counting_probe(Arc::clone(&calls), |_| Ok(0)),
            )
            .await;

        assert!(outcome.converged);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn short_circuits_on_third_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::default();
        let start = tokio::time::Instant::now();

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(5, 1),
                counting_probe(Arc::clone(&calls), |n| Ok(if n >= 3 { 6 } else { 5 })),
            )
            .await;

        assert!(outcome.converged);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_observed, Some(6));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "attempts 4-10 must not run");
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_and_reports_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::default();
        let start = tokio::time::Instant::now();

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(5, 1),
                counting_probe(Arc::clone(&calls), |_| Ok(5)),
            )
            .await;

        assert!(!outcome.converged);
        assert_eq!(outcome.attempts, 10);
        assert_eq!(outcome.last_observed, Some(5));
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn probe_errors_do_not_abort_polling() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::new(5, Duration::from_millis(100));

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(2, 1),
                counting_probe(Arc::clone(&calls), |n| {
                    if n < 4 {
                        Err(StorageError::Connection("transient".to_owned()))
                    } else {
                        Ok(3)
                    }
                }),
            )
            .await;

        assert!(outcome.converged);
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn all_probes_failing_reports_no_observation() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::new(3, Duration::from_millis(10));

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(0, 1),
                counting_probe(Arc::clone(&calls), |_| {
                    Err(StorageError::Connection("down".to_owned()))
                }),
            )
            .await;

        assert!(!outcome.converged);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_observed, None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_attempt_budget_never_probes() {
        let calls = Arc::new(AtomicU32::new(0));
        let poller = ConvergencePoller::new(0, Duration::from_secs(1));

        let outcome = poller
            .wait_for(
                ConvergenceExpectation::new(0, 0),
                counting_probe(Arc::clone(&calls), |_| Ok(0)),
            )
            .await;

        assert!(!outcome.converged);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
