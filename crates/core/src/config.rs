//! 설정 관리 — volsmoke.toml 파싱 및 런타임 설정
//!
//! [`VolsmokeConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`VOLSMOKE_CONVERGENCE_MAX_ATTEMPTS=20` 형식)
//! 3. 설정 파일 (`volsmoke.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), volsmoke_core::error::VolsmokeError> {
//! use volsmoke_core::config::VolsmokeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = VolsmokeConfig::load("volsmoke.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = VolsmokeConfig::parse("[convergence]\nmax_attempts = 5")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, VolsmokeError};

/// 수렴 폴링 최대 시도 횟수 상한
pub const MAX_CONVERGENCE_ATTEMPTS: u32 = 100;
/// 수렴 폴링 간격 상한 (밀리초)
pub const MAX_CONVERGENCE_DELAY_MS: u64 = 60_000;
/// 대상 파일 이름 최대 길이 (바이트)
pub const MAX_TARGET_NAME_LEN: usize = 255;

/// volsmoke 통합 설정
///
/// `volsmoke.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 크레이트는 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolsmokeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수렴 폴링 설정
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    /// 라이프사이클 설정
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    /// Docker 볼륨 클라이언트 설정
    #[serde(default)]
    pub docker: DockerConfig,
}

impl VolsmokeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, VolsmokeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 파일이 있으면 [`load`](Self::load)와 같고, 없으면 기본값에
    /// 환경변수 오버라이드를 적용합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, VolsmokeError> {
        match Self::load(path.as_ref()).await {
            Err(VolsmokeError::Config(ConfigError::FileNotFound { path })) => {
                warn!(path = path.as_str(), "config file not found, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VolsmokeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VolsmokeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                VolsmokeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, VolsmokeError> {
        toml::from_str(toml_str).map_err(|e| {
            VolsmokeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `VOLSMOKE_{SECTION}_{FIELD}`
    /// 예: `VOLSMOKE_DOCKER_VOLUME_NAME=ci-volume`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "VOLSMOKE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "VOLSMOKE_GENERAL_LOG_FORMAT");

        // Convergence
        override_u32(
            &mut self.convergence.max_attempts,
            "VOLSMOKE_CONVERGENCE_MAX_ATTEMPTS",
        );
        override_u64(
            &mut self.convergence.delay_ms,
            "VOLSMOKE_CONVERGENCE_DELAY_MS",
        );

        // Lifecycle
        override_string(&mut self.lifecycle.payload, "VOLSMOKE_LIFECYCLE_PAYLOAD");
        override_string(
            &mut self.lifecycle.target_name,
            "VOLSMOKE_LIFECYCLE_TARGET_NAME",
        );
        override_string(
            &mut self.lifecycle.baseline_policy,
            "VOLSMOKE_LIFECYCLE_BASELINE_POLICY",
        );
        override_bool(
            &mut self.lifecycle.skip_cleanup,
            "VOLSMOKE_LIFECYCLE_SKIP_CLEANUP",
        );

        // Docker
        override_string(&mut self.docker.socket, "VOLSMOKE_DOCKER_SOCKET");
        override_string(&mut self.docker.volume_name, "VOLSMOKE_DOCKER_VOLUME_NAME");
        override_string(&mut self.docker.label, "VOLSMOKE_DOCKER_LABEL");
        override_string(&mut self.docker.driver, "VOLSMOKE_DOCKER_DRIVER");
        override_string(
            &mut self.docker.helper_image,
            "VOLSMOKE_DOCKER_HELPER_IMAGE",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VolsmokeError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.convergence.max_attempts == 0
            || self.convergence.max_attempts > MAX_CONVERGENCE_ATTEMPTS
        {
            return Err(ConfigError::InvalidValue {
                field: "convergence.max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_CONVERGENCE_ATTEMPTS}"),
            }
            .into());
        }

        if self.convergence.delay_ms == 0 || self.convergence.delay_ms > MAX_CONVERGENCE_DELAY_MS
        {
            return Err(ConfigError::InvalidValue {
                field: "convergence.delay_ms".to_owned(),
                reason: format!("must be 1-{MAX_CONVERGENCE_DELAY_MS}"),
            }
            .into());
        }

        if self.lifecycle.payload.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "lifecycle.payload".to_owned(),
                reason: "payload must not be empty".to_owned(),
            }
            .into());
        }

        validate_target_name(&self.lifecycle.target_name).map_err(|reason| {
            ConfigError::InvalidValue {
                field: "lifecycle.target_name".to_owned(),
                reason,
            }
        })?;

        let valid_policies = ["strict", "assume_empty"];
        if !valid_policies.contains(&self.lifecycle.baseline_policy.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "lifecycle.baseline_policy".to_owned(),
                reason: format!("must be one of: {}", valid_policies.join(", ")),
            }
            .into());
        }

        if self.docker.volume_name.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "docker.volume_name".to_owned(),
                reason: "volume_name must not be empty".to_owned(),
            }
            .into());
        }

        if self.docker.label.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "docker.label".to_owned(),
                reason: "label must not be empty".to_owned(),
            }
            .into());
        }

        if self.docker.helper_image.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "docker.helper_image".to_owned(),
                reason: "helper_image must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 볼륨 안의 파일 이름으로 쓸 수 있는지 검사합니다.
///
/// 경로 구분자나 `.`/`..`는 마운트 경로를 벗어날 수 있으므로 거부합니다.
pub fn validate_target_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.len() > MAX_TARGET_NAME_LEN {
        return Err(format!(
            "length {} (must be 1-{MAX_TARGET_NAME_LEN})",
            name.len()
        ));
    }
    if name == "." || name == ".." {
        return Err("must not be '.' or '..'".to_owned());
    }
    if name.contains('/') || name.contains('\0') {
        return Err("must not contain '/' or NUL".to_owned());
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 수렴 폴링 설정
///
/// 플랫폼마다 수렴 속도가 다르므로 시도 횟수와 간격을 조정할 수 있습니다.
/// 최악의 대기 시간은 `max_attempts * delay_ms` 입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// 최대 시도 횟수
    pub max_attempts: u32,
    /// 시도 간 대기 시간 (밀리초)
    pub delay_ms: u64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            delay_ms: 2_000,
        }
    }
}

/// 라이프사이클 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// 볼륨에 기록할 내용
    pub payload: String,
    /// 볼륨 안의 대상 파일 이름
    pub target_name: String,
    /// 기준 인벤토리 조회 실패 시 정책 (strict, assume_empty)
    pub baseline_policy: String,
    /// 정리 작업 생략 (플랫폼 사후 분석용)
    pub skip_cleanup: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            payload: "Test Data".to_owned(),
            target_name: "testFile1".to_owned(),
            baseline_policy: "strict".to_owned(),
            skip_cleanup: false,
        }
    }
}

/// Docker 볼륨 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (빈 문자열이면 로컬 기본값)
    pub socket: String,
    /// 테스트 볼륨 이름
    pub volume_name: String,
    /// 테스트 리소스에 붙이는 레이블 키 (값은 볼륨 이름)
    pub label: String,
    /// 볼륨 드라이버
    pub driver: String,
    /// 마운트용 헬퍼 컨테이너 이미지
    pub helper_image: String,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            volume_name: "volsmoke-test".to_owned(),
            label: "io.volsmoke.test".to_owned(),
            driver: "local".to_owned(),
            helper_image: "busybox:latest".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
