//! Docker 볼륨 클라이언트 설정
//!
//! [`DockerVolumeConfig`]는 core의 [`DockerConfig`](volsmoke_core::config::DockerConfig)를
//! 기반으로 클라이언트 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use volsmoke_core::config::VolsmokeConfig;
//! use volsmoke_docker::config::DockerVolumeConfig;
//!
//! let core_config = VolsmokeConfig::default();
//! let config = DockerVolumeConfig::from_core(&core_config.docker);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DockerVolumeError;

/// 헬퍼 컨테이너 안에서 볼륨이 마운트되는 경로
pub const MOUNT_PATH: &str = "/mnt/volsmoke";

/// 설정 상한값 상수
const MAX_VOLUME_NAME_LEN: usize = 128;
const MAX_CONNECT_TIMEOUT_SECS: u64 = 600;

/// Docker 볼륨 클라이언트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockerVolumeConfig {
    /// Docker 소켓 경로 (빈 문자열이면 로컬 기본값)
    pub socket: String,
    /// 테스트 볼륨 이름
    pub volume_name: String,
    /// 테스트 리소스에 붙이는 레이블 키 (값은 볼륨 이름)
    pub label: String,
    /// 볼륨 드라이버
    pub driver: String,
    /// 헬퍼 컨테이너 이미지
    pub helper_image: String,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 소켓 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

impl Default for DockerVolumeConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            volume_name: "volsmoke-test".to_owned(),
            label: "io.volsmoke.test".to_owned(),
            driver: "local".to_owned(),
            helper_image: "busybox:latest".to_owned(),
            connect_timeout_secs: 120,
        }
    }
}

impl DockerVolumeConfig {
    /// core의 `DockerConfig`에서 클라이언트 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &volsmoke_core::config::DockerConfig) -> Self {
        Self {
            socket: core.socket.clone(),
            volume_name: core.volume_name.clone(),
            label: core.label.clone(),
            driver: core.driver.clone(),
            helper_image: core.helper_image.clone(),
            ..Self::default()
        }
    }

    /// 빌더를 생성합니다.
    pub fn builder() -> DockerVolumeConfigBuilder {
        DockerVolumeConfigBuilder::new()
    }

    /// 헬퍼 컨테이너 이름
    pub fn helper_container_name(&self) -> String {
        format!("{}-helper", self.volume_name)
    }

    /// 이 세션이 만든 리소스에만 일치하는 레이블 셀렉터 (`<label>=<volume>`)
    ///
    /// 볼륨 이름이 다른 세션끼리는 인벤토리 조회/정리 대상이 겹치지 않습니다.
    pub fn label_selector(&self) -> String {
        format!("{}={}", self.label, self.volume_name)
    }

    /// 볼륨 바인드 문자열 (`<volume>:<mount path>`)
    pub fn volume_bind(&self) -> String {
        format!("{}:{MOUNT_PATH}", self.volume_name)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), DockerVolumeError> {
        validate_volume_name(&self.volume_name).map_err(|reason| DockerVolumeError::Config {
            field: "volume_name".to_owned(),
            reason,
        })?;

        if self.label.is_empty()
            || self.label.contains('=')
            || self.label.chars().any(char::is_whitespace)
        {
            return Err(DockerVolumeError::Config {
                field: "label".to_owned(),
                reason: "must be a non-empty key without '=' or whitespace".to_owned(),
            });
        }

        if self.driver.is_empty() {
            return Err(DockerVolumeError::Config {
                field: "driver".to_owned(),
                reason: "driver must not be empty".to_owned(),
            });
        }

        if self.helper_image.is_empty() {
            return Err(DockerVolumeError::Config {
                field: "helper_image".to_owned(),
                reason: "helper_image must not be empty".to_owned(),
            });
        }

        if self.connect_timeout_secs == 0 || self.connect_timeout_secs > MAX_CONNECT_TIMEOUT_SECS {
            return Err(DockerVolumeError::Config {
                field: "connect_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_CONNECT_TIMEOUT_SECS}"),
            });
        }

        Ok(())
    }
}

/// Docker 볼륨 이름 규칙: `[a-zA-Z0-9][a-zA-Z0-9_.-]+`
fn validate_volume_name(name: &str) -> Result<(), String> {
    if name.len() < 2 || name.len() > MAX_VOLUME_NAME_LEN {
        return Err(format!(
            "length {} (must be 2-{MAX_VOLUME_NAME_LEN})",
            name.len()
        ));
    }
    let mut chars = name.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_alphanumeric()) {
        return Err("must start with an ASCII letter or digit".to_owned());
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')) {
        return Err("may only contain [a-zA-Z0-9_.-]".to_owned());
    }
    Ok(())
}

/// Docker 볼륨 클라이언트 설정 빌더
#[derive(Default)]
pub struct DockerVolumeConfigBuilder {
    config: DockerVolumeConfig,
}

impl DockerVolumeConfigBuilder {
    /// 기본 설정으로 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.config.socket = socket.into();
        self
    }

    /// 볼륨 이름을 설정합니다.
    pub fn volume_name(mut self, name: impl Into<String>) -> Self {
        self.config.volume_name = name.into();
        self
    }

    /// 레이블 키를 설정합니다.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// 볼륨 드라이버를 설정합니다.
    pub fn driver(mut self, driver: impl Into<String>) -> Self {
        self.config.driver = driver.into();
        self
    }

    /// 헬퍼 이미지를 설정합니다.
    pub fn helper_image(mut self, image: impl Into<String>) -> Self {
        self.config.helper_image = image.into();
        self
    }

    /// 연결 타임아웃을 설정합니다.
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    /// 설정을 빌드합니다. 유효성 검증을 수행합니다.
    pub fn build(self) -> Result<DockerVolumeConfig, DockerVolumeError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
