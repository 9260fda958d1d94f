//! 라이프사이클 상태 머신 정의
//!
//! 각 상태는 정확히 하나의 다음 상태만 가지며, 순서는 고정입니다.
//!
//! ```text
//! Baseline -> Provisioned -> Mounted -> Written -> Verified -> Unmounted -> Deprovisioned
//! ```
//!
//! 어느 상태에서든 실패하면 라이프사이클은 그 상태에서 중단(Aborted)되고,
//! 남은 상태는 실행되지 않습니다. 정리 작업은 상태 머신 밖에서 항상 실행됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};

/// 라이프사이클 상태
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// 기준 인벤토리 개수 확보
    #[default]
    Baseline,
    /// 볼륨 생성 및 인벤토리 +1 수렴 확인
    Provisioned,
    /// 볼륨 마운트
    Mounted,
    /// 내용 기록
    Written,
    /// 내용 읽기 및 포함 여부 검증
    Verified,
    /// 볼륨 언마운트
    Unmounted,
    /// 볼륨 삭제 및 기준 개수 복귀 확인
    Deprovisioned,
}

impl LifecycleState {
    /// 실행 순서대로 나열한 전체 상태
    pub const ALL: [Self; 7] = [
        Self::Baseline,
        Self::Provisioned,
        Self::Mounted,
        Self::Written,
        Self::Verified,
        Self::Unmounted,
        Self::Deprovisioned,
    ];

    /// 첫 상태를 반환합니다.
    pub fn first() -> Self {
        Self::Baseline
    }

    /// 허용된 유일한 다음 상태를 반환합니다. 종료 상태면 `None`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Baseline => Some(Self::Provisioned),
            Self::Provisioned => Some(Self::Mounted),
            Self::Mounted => Some(Self::Written),
            Self::Written => Some(Self::Verified),
            Self::Verified => Some(Self::Unmounted),
            Self::Unmounted => Some(Self::Deprovisioned),
            Self::Deprovisioned => None,
        }
    }

    /// 종료 상태인지 여부
    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// 이 상태 진입 후 기대하는 인벤토리 변화량 (기준 대비).
    ///
    /// 수렴 폴링이 필요 없는 상태는 `None`.
    pub fn convergence_delta(self) -> Option<isize> {
        match self {
            Self::Provisioned => Some(1),
            Self::Deprovisioned => Some(0),
            _ => None,
        }
    }

    /// 로그/메트릭용 고정 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Provisioned => "provisioned",
            Self::Mounted => "mounted",
            Self::Written => "written",
            Self::Verified => "verified",
            Self::Unmounted => "unmounted",
            Self::Deprovisioned => "deprovisioned",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
