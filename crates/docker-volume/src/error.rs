//! Docker 볼륨 클라이언트 에러 타입
//!
//! [`DockerVolumeError`]는 클라이언트 생성/설정 단계의 에러를 표현합니다.
//! 연결 이후의 개별 연산은 [`StorageError`]를 반환합니다.
//! `From<DockerVolumeError> for VolsmokeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.

use volsmoke_core::error::{ConfigError, StorageError, VolsmokeError};

/// Docker 볼륨 클라이언트 에러
#[derive(Debug, thiserror::Error)]
pub enum DockerVolumeError {
    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 헬퍼 컨테이너 내 명령 실패
    #[error("exec '{command}' exited with {exit_code}: {stderr}")]
    Exec {
        /// 실행한 명령 (요약)
        command: String,
        /// 종료 코드
        exit_code: i64,
        /// 표준 에러 출력
        stderr: String,
    },

    /// 종료 코드를 확인할 수 없는 명령
    #[error("exec '{0}' finished without an exit code")]
    ExecStatusUnknown(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl From<DockerVolumeError> for StorageError {
    fn from(err: DockerVolumeError) -> Self {
        match err {
            DockerVolumeError::DockerConnection(msg) => StorageError::Connection(msg),
            DockerVolumeError::DockerApi(msg) => StorageError::operation("docker", msg),
            DockerVolumeError::Exec {
                command,
                exit_code,
                stderr,
            } => StorageError::operation(command, format!("exited with {exit_code}: {stderr}")),
            DockerVolumeError::ExecStatusUnknown(command) => {
                StorageError::operation(command, "exit code unavailable")
            }
            DockerVolumeError::Config { field, reason } => {
                StorageError::InvalidInput(format!("{field}: {reason}"))
            }
        }
    }
}

impl From<DockerVolumeError> for VolsmokeError {
    fn from(err: DockerVolumeError) -> Self {
        match err {
            DockerVolumeError::Config { field, reason } => {
                VolsmokeError::Config(ConfigError::InvalidValue {
                    field: format!("docker.{field}"),
                    reason,
                })
            }
            other => VolsmokeError::Storage(other.into()),
        }
    }
}
