//! 라이프사이클 세션 -- 한 번의 실행 동안만 유지되는 상태

use std::sync::Arc;

use volsmoke_core::client::StorageClient;

use crate::poller::ConvergenceExpectation;

/// 라이프사이클 세션
///
/// 스토리지 클라이언트 핸들과 Baseline 상태에서 확보한 기준 개수만 보관합니다.
/// 그 외의 상태는 플랫폼 쪽 부수효과로만 존재하며, 세션은 저장되지 않습니다.
pub struct LifecycleSession<S: StorageClient> {
    client: Arc<S>,
    baseline: usize,
}

impl<S: StorageClient> LifecycleSession<S> {
    /// 기준 개수 0으로 새 세션을 생성합니다.
    pub fn new(client: Arc<S>) -> Self {
        Self {
            client,
            baseline: 0,
        }
    }

    /// 스토리지 클라이언트
    pub fn client(&self) -> &S {
        &self.client
    }

    /// 기준 인벤토리 개수
    pub fn baseline(&self) -> usize {
        self.baseline
    }

    /// 기준 인벤토리 개수를 기록합니다.
    pub fn record_baseline(&mut self, count: usize) {
        self.baseline = count;
    }

    /// 기준 대비 `delta`만큼 변한 인벤토리를 기대값으로 만듭니다.
    pub fn expectation(&self, delta: isize) -> ConvergenceExpectation {
        ConvergenceExpectation::new(self.baseline, delta)
    }
}
