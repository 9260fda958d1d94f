//! 도메인 타입 — 스토리지 클라이언트와 하네스가 공유하는 타입

use std::fmt;

use serde::{Deserialize, Serialize};

/// 플랫폼 볼륨 식별자
///
/// 플랫폼이 부여한 이름 또는 ID를 그대로 담습니다.
/// 하네스는 식별자를 추적하지 않고 인벤토리 개수 비교에만 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolumeId(String);

impl VolumeId {
    /// 새 볼륨 식별자를 생성합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 식별자 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VolumeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VolumeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
