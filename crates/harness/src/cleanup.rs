//! 보장된 정리 -- 어떤 경로로 끝나도 플랫폼을 기준 상태로 되돌림
//!
//! [`CleanupGuard`]는 라이프사이클 시작 시 한 번 등록되고, 다음 순서로
//! 최선 노력(best-effort) 정리를 수행합니다.
//!
//! 1. unmount (마운트된 적 없을 수 있으므로 실패 무시)
//! 2. delete (생성된 적 없을 수 있으므로 실패 무시)
//! 3. 동적 프로비저닝 잔여물 정리 (실패 무시)
//!
//! 이미 해제된 리소스(`StorageError::NotFound`)는 성공으로 간주합니다.
//! 그 외의 정리 실패는 경고 로그와 [`CleanupReport`]에만 남으며, 라이프사이클의
//! 주 실패 원인을 덮어쓰지 않습니다.
//!
//! 정상 경로에서는 [`CleanupGuard::run`]을 명시적으로 호출합니다. 그 전에
//! 가드가 드롭되면 (실행 future 취소 등) `Drop`이 현재 Tokio 런타임에
//! 같은 정리 작업을 분리된 태스크로 띄웁니다.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use volsmoke_core::client::StorageClient;
use volsmoke_core::error::StorageError;
use volsmoke_core::metrics as m;

/// 정리 작업 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// 설정에 의해 정리를 생략했는지 여부
    pub skipped: bool,
    /// unmount 성공 여부
    pub unmount_ok: bool,
    /// delete 성공 여부
    pub delete_ok: bool,
    /// 잔여물 정리 성공 여부
    pub residue_ok: bool,
    /// 무시된 에러 메시지 (연산 순서대로)
    pub errors: Vec<String>,
}

impl CleanupReport {
    /// 정리를 생략한 리포트
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    /// 모든 정리 연산이 성공했는지 여부
    pub fn is_clean(&self) -> bool {
        !self.skipped && self.unmount_ok && self.delete_ok && self.residue_ok
    }
}

/// 정리 가드
///
/// 여러 번 `run`을 호출해도 실제 정리는 첫 호출에서만 수행되고,
/// 이후 호출은 첫 결과를 그대로 반환합니다.
pub struct CleanupGuard<S: StorageClient> {
    client: Arc<S>,
    armed: bool,
    report: Arc<Mutex<Option<CleanupReport>>>,
}

impl<S: StorageClient> CleanupGuard<S> {
    /// 정리 작업을 등록합니다.
    pub fn register(client: Arc<S>) -> Self {
        Self {
            client,
            armed: true,
            report: Arc::new(Mutex::new(None)),
        }
    }

    /// 정리를 수행하지 않는 가드를 만듭니다 (플랫폼 사후 분석용).
    pub fn disarmed(client: Arc<S>) -> Self {
        Self {
            client,
            armed: false,
            report: Arc::new(Mutex::new(None)),
        }
    }

    /// 정리 작업을 수행하고 결과를 반환합니다. 멱등입니다.
    pub async fn run(&self) -> CleanupReport {
        let mut slot = self.report.lock().await;
        if let Some(report) = slot.as_ref() {
            debug!("cleanup already ran, returning first report");
            return report.clone();
        }

        let report = if self.armed {
            release(self.client.as_ref()).await
        } else {
            info!("cleanup skipped by configuration");
            CleanupReport::skipped()
        };

        *slot = Some(report.clone());
        report
    }

    /// 정리가 이미 수행되었는지 여부
    pub async fn has_run(&self) -> bool {
        self.report.lock().await.is_some()
    }
}

impl<S: StorageClient> Drop for CleanupGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.report.try_lock() {
            Ok(slot) if slot.is_some() => return,
            Ok(_) => warn!("lifecycle dropped before cleanup ran, spawning detached cleanup"),
            // run()이 잠금을 쥔 채 취소된 경우: 잠금이 풀리면 남은 정리를 이어서 수행
            Err(_) => warn!(
                "lifecycle dropped while cleanup was in progress, spawning detached cleanup"
            ),
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let client = Arc::clone(&self.client);
                let report = Arc::clone(&self.report);
                handle.spawn(async move {
                    let mut slot = report.lock().await;
                    if slot.is_none() {
                        *slot = Some(release(client.as_ref()).await);
                    }
                });
            }
            Err(_) => {
                warn!("lifecycle dropped outside a tokio runtime, cleanup could not run");
            }
        }
    }
}

/// unmount → delete → 잔여물 정리를 순서대로 시도합니다.
async fn release<S: StorageClient>(client: &S) -> CleanupReport {
    let mut report = CleanupReport::default();

    report.unmount_ok = absorb("unmount", client.unmount_volume().await, &mut report.errors);
    report.delete_ok = absorb("delete", client.delete_volume().await, &mut report.errors);
    report.residue_ok = absorb(
        "cleanup_residue",
        client.cleanup_dynamic_residue().await,
        &mut report.errors,
    );

    info!(
        unmount_ok = report.unmount_ok,
        delete_ok = report.delete_ok,
        residue_ok = report.residue_ok,
        "cleanup finished"
    );
    report
}

fn absorb(
    operation: &'static str,
    result: Result<String, StorageError>,
    errors: &mut Vec<String>,
) -> bool {
    match result {
        Ok(output) => {
            debug!(operation, output = output.as_str(), "cleanup operation succeeded");
            true
        }
        Err(StorageError::NotFound(what)) => {
            debug!(operation, what = what.as_str(), "already released");
            true
        }
        Err(e) => {
            warn!(operation, error = %e, "cleanup operation failed, ignoring");
            metrics::counter!(m::CLEANUP_FAILURES_TOTAL, m::LABEL_OPERATION => operation)
                .increment(1);
            errors.push(format!("{operation}: {e}"));
            false
        }
    }
}
