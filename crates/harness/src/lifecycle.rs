//! 라이프사이클 하네스 -- 상태 머신 구동, 수렴 확인, 정리 보장
//!
//! [`LifecycleHarness`]는 스토리지 클라이언트에 대해 볼륨 한 개의 전체
//! 라이프사이클을 순서대로 실행하고 결과를 [`LifecycleReport`]로 돌려줍니다.
//!
//! # 내부 흐름
//! ```text
//! run()
//!  ├─ CleanupGuard::register()           (가장 먼저 등록)
//!  ├─ tokio::spawn(StepDriver::run())     (패닉 격리)
//!  │    Baseline → Provisioned → Mounted → Written → Verified → Unmounted → Deprovisioned
//!  │    각 스텝: 연산 → (필요 시) 수렴 폴링 → 검증
//!  ├─ CleanupGuard::run()                 (성공/실패/패닉 무관)
//!  └─ LifecycleReport
//! ```
//!
//! 스텝 재시도는 없습니다. 재시도는 수렴 관측에만 적용됩니다.

use std::any::Any;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinError};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use volsmoke_core::client::StorageClient;
use volsmoke_core::error::StorageError;
use volsmoke_core::metrics as m;

use crate::cleanup::CleanupGuard;
use crate::config::{BaselinePolicy, HarnessConfig};
use crate::error::HarnessError;
use crate::poller::ConvergencePoller;
use crate::report::{LifecycleReport, StepRecord, Verdict};
use crate::session::LifecycleSession;
use crate::state::LifecycleState;

/// 볼륨 라이프사이클 검증 하네스
///
/// 한 번에 하나의 라이프사이클만 실행합니다. 병렬로 실행하려면
/// 하네스마다 독립된 클라이언트/볼륨 이름을 사용해야 인벤토리 개수가 섞이지 않습니다.
///
/// # 사용 예시
/// ```ignore
/// use std::sync::Arc;
/// use volsmoke_harness::{LifecycleHarness, InMemoryStorageClient};
///
/// let harness = LifecycleHarness::builder()
///     .client(Arc::new(InMemoryStorageClient::new()))
///     .build()?;
///
/// let report = harness.run().await;
/// assert!(report.passed());
/// ```
pub struct LifecycleHarness<S: StorageClient> {
    client: Arc<S>,
    config: HarnessConfig,
    poller: ConvergencePoller,
}

impl<S: StorageClient> LifecycleHarness<S> {
    /// 빌더를 생성합니다.
    pub fn builder() -> LifecycleHarnessBuilder<S> {
        LifecycleHarnessBuilder::new()
    }

    /// 하네스 설정
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// 수렴 폴러
    pub fn poller(&self) -> ConvergencePoller {
        self.poller
    }

    /// 라이프사이클을 한 번 실행합니다.
    ///
    /// 어떤 스텝에서 실패하거나 패닉이 나도 정리 작업은 정확히 한 번 실행됩니다.
    /// 반환된 리포트의 `failure`에는 주 실패 원인 하나만 담깁니다.
    pub async fn run(&self) -> LifecycleReport {
        let started = Instant::now();

        let guard = if self.config.skip_cleanup {
            CleanupGuard::disarmed(Arc::clone(&self.client))
        } else {
            CleanupGuard::register(Arc::clone(&self.client))
        };

        info!(
            target_name = self.config.target_name.as_str(),
            max_attempts = self.poller.max_attempts(),
            poll_delay_ms = self.config.poll_delay_ms,
            "starting volume lifecycle"
        );

        let progress = Arc::new(Mutex::new(Progress::default()));
        let driver = StepDriver {
            session: LifecycleSession::new(Arc::clone(&self.client)),
            poller: self.poller,
            config: self.config.clone(),
            progress: Arc::clone(&progress),
        };

        let task = tokio::spawn(driver.run());
        // 드롭 순서: 드라이버 중단이 정리 가드보다 먼저
        let _abort = AbortOnDrop(task.abort_handle());

        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                let state = lock(&progress).current;
                Err(HarnessError::Aborted {
                    state,
                    reason: describe_join_error(e),
                })
            }
        };

        let cleanup = guard.run().await;

        let progress = std::mem::take(&mut *lock(&progress));
        let failure = result.err();
        let verdict = match &failure {
            None => Verdict::Passed,
            Some(_) => Verdict::Aborted {
                at: progress.current,
            },
        };

        match &failure {
            None => {
                metrics::counter!(m::LIFECYCLE_RUNS_TOTAL, m::LABEL_RESULT => "passed")
                    .increment(1);
                info!(
                    baseline = ?progress.baseline,
                    cleanup_clean = cleanup.is_clean(),
                    "volume lifecycle verified"
                );
            }
            Some(err) => {
                metrics::counter!(m::LIFECYCLE_RUNS_TOTAL, m::LABEL_RESULT => "aborted")
                    .increment(1);
                error!(
                    state = %progress.current,
                    kind = err.kind(),
                    error = %err,
                    "volume lifecycle aborted"
                );
            }
        }

        LifecycleReport {
            baseline: progress.baseline,
            completed: progress.completed,
            verdict,
            failure,
            cleanup,
            duration_ms: millis(started.elapsed()),
        }
    }
}

/// 하네스 빌더
pub struct LifecycleHarnessBuilder<S: StorageClient> {
    client: Option<Arc<S>>,
    config: HarnessConfig,
}

impl<S: StorageClient> LifecycleHarnessBuilder<S> {
    /// 기본 설정으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            client: None,
            config: HarnessConfig::default(),
        }
    }

    /// 스토리지 클라이언트를 설정합니다.
    pub fn client(mut self, client: Arc<S>) -> Self {
        self.client = Some(client);
        self
    }

    /// 하네스 설정을 지정합니다.
    pub fn config(mut self, config: HarnessConfig) -> Self {
        self.config = config;
        self
    }

    /// 하네스를 빌드합니다.
    pub fn build(self) -> Result<LifecycleHarness<S>, HarnessError> {
        self.config.validate()?;

        let client = self.client.ok_or_else(|| HarnessError::Config {
            field: "client".to_owned(),
            reason: "storage client must be provided".to_owned(),
        })?;

        let poller = ConvergencePoller::new(self.config.max_attempts, self.config.poll_delay());

        Ok(LifecycleHarness {
            client,
            config: self.config,
            poller,
        })
    }
}

impl<S: StorageClient> Default for LifecycleHarnessBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// 드라이버 태스크와 공유하는 진행 상황
///
/// 드라이버가 패닉해도 어디까지 진행했는지 남기기 위해 태스크 밖에 둡니다.
#[derive(Debug, Default)]
struct Progress {
    baseline: Option<usize>,
    current: LifecycleState,
    completed: Vec<StepRecord>,
}

/// 상태 머신을 실제로 구동하는 태스크 본체
struct StepDriver<S: StorageClient> {
    session: LifecycleSession<S>,
    poller: ConvergencePoller,
    config: HarnessConfig,
    progress: Arc<Mutex<Progress>>,
}

impl<S: StorageClient> StepDriver<S> {
    async fn run(mut self) -> Result<(), HarnessError> {
        let mut next = Some(LifecycleState::first());

        while let Some(state) = next {
            lock(&self.progress).current = state;
            info!(state = %state, "entering lifecycle step");

            let started = Instant::now();
            self.enter(state).await?;
            let elapsed = started.elapsed();

            metrics::histogram!(m::LIFECYCLE_STEP_DURATION_SECONDS, m::LABEL_STATE => state.as_str())
                .record(elapsed.as_secs_f64());
            lock(&self.progress).completed.push(StepRecord {
                state,
                duration_ms: millis(elapsed),
            });
            info!(state = %state, elapsed_ms = millis(elapsed), "lifecycle step completed");

            next = state.next();
        }

        Ok(())
    }

    /// 단일 상태에 진입합니다: 연산 → (필요 시) 수렴 확인 → 검증.
    async fn enter(&mut self, state: LifecycleState) -> Result<(), HarnessError> {
        let op_err = |e: StorageError| HarnessError::operation(state, &e);

        match state {
            LifecycleState::Baseline => {
                let count = self.capture_baseline().await?;
                self.session.record_baseline(count);
                lock(&self.progress).baseline = Some(count);
            }
            LifecycleState::Provisioned => {
                let volume = self.session.client().create_volume().await.map_err(op_err)?;
                info!(volume = %volume, "volume created, waiting for inventory to converge");
            }
            LifecycleState::Mounted => {
                let output = self.session.client().mount_volume().await.map_err(op_err)?;
                debug!(output = output.as_str(), "volume mounted");
            }
            LifecycleState::Written => {
                let output = self
                    .session
                    .client()
                    .write_content(&self.config.payload, &self.config.target_name)
                    .await
                    .map_err(op_err)?;
                debug!(output = output.as_str(), "content written");
            }
            LifecycleState::Verified => {
                let content = self
                    .session
                    .client()
                    .read_content(&self.config.target_name)
                    .await
                    .map_err(op_err)?;
                // 읽은 내용은 payload를 포함해야 함 (앞뒤 출력은 허용)
                if !content.contains(&self.config.payload) {
                    return Err(HarnessError::ContentMismatch {
                        target: self.config.target_name.clone(),
                        expected: self.config.payload.clone(),
                        actual: content,
                    });
                }
            }
            LifecycleState::Unmounted => {
                let output = self.session.client().unmount_volume().await.map_err(op_err)?;
                debug!(output = output.as_str(), "volume unmounted");
            }
            LifecycleState::Deprovisioned => {
                let output = self.session.client().delete_volume().await.map_err(op_err)?;
                debug!(output = output.as_str(), "volume deleted, waiting for inventory to converge");
            }
        }

        if let Some(delta) = state.convergence_delta() {
            self.await_convergence(state, delta).await?;
        }

        Ok(())
    }

    async fn capture_baseline(&self) -> Result<usize, HarnessError> {
        match self.session.client().list_volumes().await {
            Ok(volumes) => {
                info!(baseline = volumes.len(), "captured baseline inventory");
                Ok(volumes.len())
            }
            Err(e) => match self.config.baseline_policy {
                BaselinePolicy::Strict => Err(HarnessError::Baseline {
                    reason: e.to_string(),
                }),
                BaselinePolicy::AssumeEmpty => {
                    warn!(error = %e, "baseline inventory unavailable, assuming empty");
                    Ok(0)
                }
            },
        }
    }

    async fn await_convergence(
        &self,
        state: LifecycleState,
        delta: isize,
    ) -> Result<(), HarnessError> {
        let expectation = self.session.expectation(delta);
        let outcome = self
            .poller
            .wait_for_inventory(self.session.client(), expectation)
            .await;

        if outcome.converged {
            info!(
                state = %state,
                attempts = outcome.attempts,
                observed = ?outcome.last_observed,
                "inventory converged"
            );
            return Ok(());
        }

        Err(HarnessError::ConvergenceTimeout {
            state,
            baseline: expectation.baseline,
            expected: expectation.baseline.saturating_add_signed(delta),
            attempts: outcome.attempts,
            last_observed: outcome.last_observed,
        })
    }
}

struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn lock(progress: &Mutex<Progress>) -> std::sync::MutexGuard<'_, Progress> {
    // 잠금을 쥔 채로 패닉하는 경로는 없지만, 있더라도 기록은 유효함
    progress.lock().unwrap_or_else(PoisonError::into_inner)
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        format!("step panicked: {}", panic_message(err.into_panic()))
    } else {
        "step task was cancelled".to_owned()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
