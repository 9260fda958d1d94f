//! 하네스 설정
//!
//! [`HarnessConfig`]는 core의 [`ConvergenceConfig`](volsmoke_core::config::ConvergenceConfig)와
//! [`LifecycleConfig`](volsmoke_core::config::LifecycleConfig)를 기반으로 만들어집니다.
//!
//! # 사용 예시
//! ```ignore
//! use volsmoke_core::config::VolsmokeConfig;
//! use volsmoke_harness::config::HarnessConfig;
//!
//! let core_config = VolsmokeConfig::default();
//! let config = HarnessConfig::from_core(&core_config.convergence, &core_config.lifecycle)?;
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use volsmoke_core::config::{
    ConvergenceConfig, LifecycleConfig, MAX_CONVERGENCE_ATTEMPTS, MAX_CONVERGENCE_DELAY_MS,
    validate_target_name,
};

use crate::error::HarnessError;

/// 기준 인벤토리 조회가 실패했을 때의 처리 정책
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselinePolicy {
    /// 조회 실패를 라이프사이클 실패로 처리
    #[default]
    Strict,
    /// 조회 실패 시 기준 개수를 0으로 간주하고 경고만 남김
    AssumeEmpty,
}

impl FromStr for BaselinePolicy {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "assume_empty" => Ok(Self::AssumeEmpty),
            other => Err(HarnessError::Config {
                field: "baseline_policy".to_owned(),
                reason: format!("unknown policy '{other}' (expected: strict, assume_empty)"),
            }),
        }
    }
}

impl fmt::Display for BaselinePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::AssumeEmpty => write!(f, "assume_empty"),
        }
    }
}

/// 하네스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// 수렴 폴링 최대 시도 횟수
    pub max_attempts: u32,
    /// 수렴 폴링 간격 (밀리초)
    pub poll_delay_ms: u64,
    /// 기록할 내용
    pub payload: String,
    /// 대상 파일 이름
    pub target_name: String,
    /// 기준 조회 실패 정책
    pub baseline_policy: BaselinePolicy,
    /// 정리 작업 생략
    pub skip_cleanup: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            poll_delay_ms: 2_000,
            payload: "Test Data".to_owned(),
            target_name: "testFile1".to_owned(),
            baseline_policy: BaselinePolicy::Strict,
            skip_cleanup: false,
        }
    }
}

impl HarnessConfig {
    /// 빌더를 생성합니다.
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }

    /// core 설정 섹션에서 하네스 설정을 생성합니다.
    pub fn from_core(
        convergence: &ConvergenceConfig,
        lifecycle: &LifecycleConfig,
    ) -> Result<Self, HarnessError> {
        Ok(Self {
            max_attempts: convergence.max_attempts,
            poll_delay_ms: convergence.delay_ms,
            payload: lifecycle.payload.clone(),
            target_name: lifecycle.target_name.clone(),
            baseline_policy: lifecycle.baseline_policy.parse()?,
            skip_cleanup: lifecycle.skip_cleanup,
        })
    }

    /// 폴링 간격을 `Duration`으로 반환합니다.
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.max_attempts == 0 || self.max_attempts > MAX_CONVERGENCE_ATTEMPTS {
            return Err(HarnessError::Config {
                field: "max_attempts".to_owned(),
                reason: format!("must be 1-{MAX_CONVERGENCE_ATTEMPTS}"),
            });
        }

        if self.poll_delay_ms == 0 || self.poll_delay_ms > MAX_CONVERGENCE_DELAY_MS {
            return Err(HarnessError::Config {
                field: "poll_delay_ms".to_owned(),
                reason: format!("must be 1-{MAX_CONVERGENCE_DELAY_MS}"),
            });
        }

        if self.payload.is_empty() {
            return Err(HarnessError::Config {
                field: "payload".to_owned(),
                reason: "payload must not be empty".to_owned(),
            });
        }

        validate_target_name(&self.target_name).map_err(|reason| HarnessError::Config {
            field: "target_name".to_owned(),
            reason,
        })?;

        Ok(())
    }
}

/// 하네스 설정 빌더
#[derive(Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 수렴 폴링 최대 시도 횟수를 설정합니다.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// 수렴 폴링 간격(밀리초)을 설정합니다.
    pub fn poll_delay_ms(mut self, ms: u64) -> Self {
        self.config.poll_delay_ms = ms;
        self
    }

    /// 기록할 내용을 설정합니다.
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.config.payload = payload.into();
        self
    }

    /// 대상 파일 이름을 설정합니다.
    pub fn target_name(mut self, name: impl Into<String>) -> Self {
        self.config.target_name = name.into();
        self
    }

    /// 기준 조회 실패 정책을 설정합니다.
    pub fn baseline_policy(mut self, policy: BaselinePolicy) -> Self {
        self.config.baseline_policy = policy;
        self
    }

    /// 정리 작업 생략 여부를 설정합니다.
    pub fn skip_cleanup(mut self, skip: bool) -> Self {
        self.config.skip_cleanup = skip;
        self
    }

    /// 설정을 검증하고 `HarnessConfig`를 생성합니다.
    pub fn build(self) -> Result<HarnessConfig, HarnessError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
