//! 라이프사이클 실행 리포트

use serde::{Deserialize, Serialize};

use crate::cleanup::CleanupReport;
use crate::error::HarnessError;
use crate::state::LifecycleState;

/// 라이프사이클 종료 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// 모든 상태를 통과하여 Deprovisioned에 도달
    Passed,
    /// 지정한 상태에서 중단됨
    Aborted {
        /// 실패한 상태
        at: LifecycleState,
    },
}

/// 완료된 스텝 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 완료된 상태
    pub state: LifecycleState,
    /// 소요 시간 (밀리초)
    pub duration_ms: u64,
}

/// 라이프사이클 한 번의 실행 결과
///
/// 주 실패 원인은 최대 하나(`failure`)이며, 정리 결과는 별도로 보고됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReport {
    /// 기준 인벤토리 개수 (확보 실패 시 `None`)
    pub baseline: Option<usize>,
    /// 완료된 스텝 (실행 순서)
    pub completed: Vec<StepRecord>,
    /// 종료 판정
    pub verdict: Verdict,
    /// 주 실패 원인
    pub failure: Option<HarnessError>,
    /// 정리 결과
    pub cleanup: CleanupReport,
    /// 전체 소요 시간 (밀리초, 정리 포함)
    pub duration_ms: u64,
}

impl LifecycleReport {
    /// 라이프사이클이 통과했는지 여부
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed)
    }

    /// 마지막으로 완료된 상태
    pub fn last_completed(&self) -> Option<LifecycleState> {
        self.completed.last().map(|record| record.state)
    }

    /// 완료된 상태 목록
    pub fn completed_states(&self) -> Vec<LifecycleState> {
        self.completed.iter().map(|record| record.state).collect()
    }

    /// 통과했으면 리포트를, 아니면 주 실패 원인을 반환합니다.
    pub fn into_result(self) -> Result<Self, HarnessError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
