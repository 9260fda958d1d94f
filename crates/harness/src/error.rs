//! 하네스 에러 타입
//!
//! [`HarnessError`]는 라이프사이클 한 번의 실행이 실패한 "주 원인"을 표현합니다.
//! 정리 작업 실패는 여기 포함되지 않으며 [`CleanupReport`](crate::cleanup::CleanupReport)에만 기록됩니다.
//!
//! 리포트에 그대로 담아 JSON으로 출력할 수 있도록 `Serialize`를 구현합니다.

use serde::{Deserialize, Serialize};

use volsmoke_core::error::{ConfigError, StorageError, VolsmokeError};

use crate::state::LifecycleState;

/// 라이프사이클 실패 원인
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HarnessError {
    /// 기준 인벤토리 조회 실패 (strict 정책)
    #[error("baseline inventory unavailable: {reason}")]
    Baseline {
        /// 조회 실패 사유
        reason: String,
    },

    /// 상태 변경 연산 실패
    #[error("{state} step failed: {reason}")]
    Operation {
        /// 실패한 상태
        state: LifecycleState,
        /// 스토리지 클라이언트가 보고한 사유
        reason: String,
    },

    /// 수렴 폴링 예산 소진
    #[error(
        "{state} step: expected {expected} volumes (baseline {baseline}), platform never converged after {attempts} attempts (last observed: {})",
        describe_observed(.last_observed)
    )]
    ConvergenceTimeout {
        /// 폴링한 상태
        state: LifecycleState,
        /// 기준 인벤토리 개수
        baseline: usize,
        /// 기대한 인벤토리 개수
        expected: usize,
        /// 실제 시도 횟수
        attempts: u32,
        /// 마지막으로 관측된 개수 (모든 조회가 실패했으면 `None`)
        last_observed: Option<usize>,
    },

    /// 읽은 내용에 기록한 내용이 없음
    #[error("content mismatch in '{target}': expected to contain {expected:?}, got {actual:?}")]
    ContentMismatch {
        /// 대상 파일 이름
        target: String,
        /// 기록한 내용
        expected: String,
        /// 읽은 내용
        actual: String,
    },

    /// 스텝 실행 중 패닉 등으로 중단됨
    #[error("{state} step aborted: {reason}")]
    Aborted {
        /// 중단된 상태
        state: LifecycleState,
        /// 중단 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl HarnessError {
    /// 스토리지 에러를 해당 상태의 연산 실패로 변환합니다.
    pub fn operation(state: LifecycleState, err: &StorageError) -> Self {
        Self::Operation {
            state,
            reason: err.to_string(),
        }
    }

    /// 실패가 발생한 상태 (상태와 무관한 설정 에러는 `None`)
    pub fn state(&self) -> Option<LifecycleState> {
        match self {
            Self::Baseline { .. } => Some(LifecycleState::Baseline),
            Self::Operation { state, .. }
            | Self::ConvergenceTimeout { state, .. }
            | Self::Aborted { state, .. } => Some(*state),
            Self::ContentMismatch { .. } => Some(LifecycleState::Verified),
            Self::Config { .. } => None,
        }
    }

    /// 메트릭/출력용 고정 종류명
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Baseline { .. } => "baseline",
            Self::Operation { .. } => "operation",
            Self::ConvergenceTimeout { .. } => "convergence_timeout",
            Self::ContentMismatch { .. } => "content_mismatch",
            Self::Aborted { .. } => "aborted",
            Self::Config { .. } => "config",
        }
    }
}

fn describe_observed(observed: &Option<usize>) -> String {
    match observed {
        Some(count) => count.to_string(),
        None => "none, every inventory probe failed".to_owned(),
    }
}

impl From<HarnessError> for VolsmokeError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::Config { field, reason } => {
                VolsmokeError::Config(ConfigError::InvalidValue { field, reason })
            }
            other => VolsmokeError::Storage(StorageError::operation(
                other.state().map_or("lifecycle", LifecycleState::as_str),
                other.to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_error_names_state() {
        let err = HarnessError::operation(
            LifecycleState::Provisioned,
            &StorageError::Connection("refused".to_owned()),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("provisioned step failed"));
        assert!(msg.contains("refused"));
        assert_eq!(err.state(), Some(LifecycleState::Provisioned));
    }

    #[test]
    fn convergence_timeout_display_is_distinct_from_operation() {
        let err = HarnessError::ConvergenceTimeout {
            state: LifecycleState::Provisioned,
            baseline: 0,
            expected: 1,
            attempts: 10,
            last_observed: Some(0),
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 1 volumes"));
        assert!(msg.contains("never converged"));
        assert!(msg.contains("last observed: 0"));
        assert_eq!(err.kind(), "convergence_timeout");
    }

    #[test]
    fn convergence_timeout_without_observation() {
        let err = HarnessError::ConvergenceTimeout {
            state: LifecycleState::Deprovisioned,
            baseline: 3,
            expected: 3,
            attempts: 2,
            last_observed: None,
        };
        assert!(err.to_string().contains("every inventory probe failed"));
    }

    #[test]
    fn content_mismatch_is_attributed_to_verified() {
        let err = HarnessError::ContentMismatch {
            target: "testFile1".to_owned(),
            expected: "Test Data".to_owned(),
            actual: "garbage".to_owned(),
        };
        assert_eq!(err.state(), Some(LifecycleState::Verified));
        assert!(err.to_string().contains("testFile1"));
    }

    #[test]
    fn serializes_with_kind_tag() {
        let err = HarnessError::Operation {
            state: LifecycleState::Mounted,
            reason: "busy".to_owned(),
        };
        let json: serde_json::Value = serde_json::to_value(&err).unwrap();
        assert_eq!(json["kind"], "operation");
        assert_eq!(json["state"], "mounted");
    }

    #[test]
    fn config_error_converts_to_core_config_error() {
        let err = HarnessError::Config {
            field: "max_attempts".to_owned(),
            reason: "must be 1-100".to_owned(),
        };
        let core: VolsmokeError = err.into();
        assert!(matches!(core, VolsmokeError::Config(_)));
    }
}
