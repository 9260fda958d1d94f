//! 에러 타입 — 도메인별 에러 정의

/// volsmoke 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum VolsmokeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스토리지 클라이언트 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 스토리지 클라이언트 에러
///
/// [`StorageClient`](crate::client::StorageClient)의 모든 연산이 반환하는 에러입니다.
/// 하네스는 이 에러를 해석하지 않고 호출한 스텝의 실패로만 보고합니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// 플랫폼 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 연산 실패
    #[error("{op} failed: {reason}")]
    Operation { op: String, reason: String },

    /// 대상 볼륨/파일을 찾을 수 없음
    #[error("not found: {0}")]
    NotFound(String),

    /// 잘못된 입력 (대상 이름 등)
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// 연산 이름과 사유로 [`StorageError::Operation`]을 생성합니다.
    pub fn operation(op: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Operation {
            op: op.into(),
            reason: reason.into(),
        }
    }
}
