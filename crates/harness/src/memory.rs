//! 인메모리 스토리지 클라이언트
//!
//! 실제 플랫폼 없이 하네스를 구동하기 위한 [`StorageClient`] 구현입니다.
//! 테스트와 CLI의 `--backend memory` 드라이런에서 사용합니다.
//!
//! 다음 플랫폼 특성을 흉내냅니다.
//! - 최종 일관성: create/delete 결과가 `lag`번의 list 호출 뒤에야 보임
//! - 상태 검사: 마운트 전 쓰기, 사용 중 삭제 등은 실패
//! - 장애 주입: 특정 연산 실패/패닉, 일시적 list 실패, 읽기 내용 변형

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use volsmoke_core::client::StorageClient;
use volsmoke_core::config::validate_target_name;
use volsmoke_core::error::StorageError;
use volsmoke_core::types::VolumeId;

/// 기본 볼륨 이름
pub const DEFAULT_VOLUME_NAME: &str = "volsmoke-test";

/// 스토리지 클라이언트 연산 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageOp {
    /// `list_volumes`
    List,
    /// `create_volume`
    Create,
    /// `mount_volume`
    Mount,
    /// `write_content`
    Write,
    /// `read_content`
    Read,
    /// `unmount_volume`
    Unmount,
    /// `delete_volume`
    Delete,
    /// `cleanup_dynamic_residue`
    CleanupResidue,
}

impl StorageOp {
    /// 연산 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Mount => "mount",
            Self::Write => "write",
            Self::Read => "read",
            Self::Unmount => "unmount",
            Self::Delete => "delete",
            Self::CleanupResidue => "cleanup_residue",
        }
    }
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 읽기 결과 변형 방식
#[derive(Debug, Clone)]
enum ReadShape {
    Verbatim,
    Wrapped { prefix: String, suffix: String },
    Replaced(String),
}

/// 플랫폼 쪽 가변 상태
#[derive(Debug, Default)]
struct Platform {
    exists: bool,
    visible: bool,
    lag_remaining: u32,
    mounted: bool,
    files: HashMap<String, String>,
    residue: usize,
    failing_lists: u32,
    calls: Vec<StorageOp>,
}

/// 인메모리 스토리지 클라이언트
///
/// 볼륨은 하나만 관리합니다. 빌더 메서드로 장애 시나리오를 구성한 뒤
/// `Arc`로 감싸 하네스에 주입합니다.
pub struct InMemoryStorageClient {
    volume_name: String,
    preexisting: usize,
    lag: u32,
    list_failures_after_create: u32,
    failures: HashMap<StorageOp, StorageError>,
    panics: HashSet<StorageOp>,
    read_shape: ReadShape,
    platform: Mutex<Platform>,
}

impl Default for InMemoryStorageClient {
    fn default() -> Self {
        Self {
            volume_name: DEFAULT_VOLUME_NAME.to_owned(),
            preexisting: 0,
            lag: 0,
            list_failures_after_create: 0,
            failures: HashMap::new(),
            panics: HashSet::new(),
            read_shape: ReadShape::Verbatim,
            platform: Mutex::new(Platform::default()),
        }
    }
}

impl InMemoryStorageClient {
    /// 빈 플랫폼으로 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 관리할 볼륨 이름을 지정합니다.
    pub fn with_volume_name(mut self, name: impl Into<String>) -> Self {
        self.volume_name = name.into();
        self
    }

    /// 인벤토리에 이미 존재하는 (하네스와 무관한) 볼륨 개수를 지정합니다.
    pub fn with_preexisting(mut self, count: usize) -> Self {
        self.preexisting = count;
        self
    }

    /// create/delete가 인벤토리에 반영되기까지 필요한 list 호출 수를 지정합니다.
    pub fn with_visibility_lag(mut self, lists: u32) -> Self {
        self.lag = lists;
        self
    }

    /// create 성공 직후 `count`번의 list 호출을 연결 에러로 실패시킵니다.
    pub fn with_flaky_lists_after_create(mut self, count: u32) -> Self {
        self.list_failures_after_create = count;
        self
    }

    /// 지정한 연산이 항상 `err`로 실패하도록 설정합니다.
    pub fn with_failure(mut self, op: StorageOp, err: StorageError) -> Self {
        self.failures.insert(op, err);
        self
    }

    /// 지정한 연산이 패닉하도록 설정합니다.
    pub fn with_panic_on(mut self, op: StorageOp) -> Self {
        self.panics.insert(op);
        self
    }

    /// 정리 대상 잔여 볼륨 개수를 지정합니다.
    pub fn with_residue(self, count: usize) -> Self {
        self.lock().residue = count;
        self
    }

    /// 읽은 내용을 앞뒤로 감싸서 반환합니다 (플랫폼 출력 장식 흉내).
    pub fn with_read_wrapping(mut self, prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.read_shape = ReadShape::Wrapped {
            prefix: prefix.into(),
            suffix: suffix.into(),
        };
        self
    }

    /// 읽기 결과를 고정 문자열로 바꿉니다 (데이터 손상 흉내).
    pub fn with_corrupted_reads(mut self, content: impl Into<String>) -> Self {
        self.read_shape = ReadShape::Replaced(content.into());
        self
    }

    /// 지금까지 호출된 연산 (호출 순서)
    pub fn calls(&self) -> Vec<StorageOp> {
        self.lock().calls.clone()
    }

    /// 특정 연산의 호출 횟수
    pub fn call_count(&self, op: StorageOp) -> usize {
        self.lock().calls.iter().filter(|&&c| c == op).count()
    }

    /// 실제 (지연과 무관한) 인벤토리 개수
    pub fn live_count(&self) -> usize {
        self.preexisting + usize::from(self.lock().exists)
    }

    /// 볼륨이 존재하는지 여부
    pub fn volume_exists(&self) -> bool {
        self.lock().exists
    }

    /// 볼륨이 마운트되어 있는지 여부
    pub fn is_mounted(&self) -> bool {
        self.lock().mounted
    }

    /// 남은 잔여 볼륨 개수
    pub fn residue(&self) -> usize {
        self.lock().residue
    }

    fn lock(&self) -> MutexGuard<'_, Platform> {
        self.platform.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 호출을 기록하고 주입된 장애를 적용합니다.
    fn begin(&self, op: StorageOp) -> Result<MutexGuard<'_, Platform>, StorageError> {
        {
            let mut platform = self.lock();
            platform.calls.push(op);
        }
        if self.panics.contains(&op) {
            panic!("injected panic in {op}");
        }
        if let Some(err) = self.failures.get(&op) {
            debug!(op = op.as_str(), error = %err, "injected failure");
            return Err(err.clone());
        }
        Ok(self.lock())
    }

    fn volume_id(&self) -> VolumeId {
        VolumeId::new(self.volume_name.as_str())
    }
}

impl StorageClient for InMemoryStorageClient {
    async fn list_volumes(&self) -> Result<Vec<VolumeId>, StorageError> {
        let mut platform = self.begin(StorageOp::List)?;

        if platform.failing_lists > 0 {
            platform.failing_lists -= 1;
            return Err(StorageError::Connection(
                "inventory temporarily unavailable".to_owned(),
            ));
        }

        if platform.lag_remaining > 0 {
            platform.lag_remaining -= 1;
        } else {
            platform.visible = platform.exists;
        }

        let mut volumes: Vec<VolumeId> = (0..self.preexisting)
            .map(|i| VolumeId::new(format!("preexisting-{i}")))
            .collect();
        if platform.visible {
            volumes.push(self.volume_id());
        }
        Ok(volumes)
    }

    async fn create_volume(&self) -> Result<VolumeId, StorageError> {
        let mut platform = self.begin(StorageOp::Create)?;

        if platform.exists {
            return Err(StorageError::operation(
                "create",
                format!("volume {} already exists", self.volume_name),
            ));
        }

        platform.exists = true;
        platform.lag_remaining = self.lag;
        platform.failing_lists = self.list_failures_after_create;
        Ok(self.volume_id())
    }

    async fn mount_volume(&self) -> Result<String, StorageError> {
        let mut platform = self.begin(StorageOp::Mount)?;

        if !platform.exists {
            return Err(StorageError::NotFound(self.volume_name.clone()));
        }
        if platform.mounted {
            return Err(StorageError::operation("mount", "volume is already mounted"));
        }

        platform.mounted = true;
        Ok(format!("volume/{} mounted", self.volume_name))
    }

    async fn write_content(&self, payload: &str, target_name: &str) -> Result<String, StorageError> {
        validate_target_name(target_name).map_err(StorageError::InvalidInput)?;
        let mut platform = self.begin(StorageOp::Write)?;

        if !platform.mounted {
            return Err(StorageError::operation("write", "volume is not mounted"));
        }

        platform
            .files
            .insert(target_name.to_owned(), payload.to_owned());
        Ok(format!("{} bytes written to {target_name}", payload.len()))
    }

    async fn read_content(&self, target_name: &str) -> Result<String, StorageError> {
        validate_target_name(target_name).map_err(StorageError::InvalidInput)?;
        let platform = self.begin(StorageOp::Read)?;

        if !platform.mounted {
            return Err(StorageError::operation("read", "volume is not mounted"));
        }

        let content = platform
            .files
            .get(target_name)
            .ok_or_else(|| StorageError::NotFound(target_name.to_owned()))?;

        Ok(match &self.read_shape {
            ReadShape::Verbatim => content.clone(),
            ReadShape::Wrapped { prefix, suffix } => format!("{prefix}{content}{suffix}"),
            ReadShape::Replaced(replacement) => replacement.clone(),
        })
    }

    async fn unmount_volume(&self) -> Result<String, StorageError> {
        let mut platform = self.begin(StorageOp::Unmount)?;

        if !platform.mounted {
            return Err(StorageError::NotFound(format!(
                "mount of {}",
                self.volume_name
            )));
        }

        platform.mounted = false;
        Ok(format!("volume/{} unmounted", self.volume_name))
    }

    async fn delete_volume(&self) -> Result<String, StorageError> {
        let mut platform = self.begin(StorageOp::Delete)?;

        if !platform.exists {
            return Err(StorageError::NotFound(self.volume_name.clone()));
        }
        if platform.mounted {
            return Err(StorageError::operation("delete", "volume is in use"));
        }

        platform.exists = false;
        platform.files.clear();
        platform.lag_remaining = self.lag;
        Ok(format!("volume/{} deleted", self.volume_name))
    }

    async fn cleanup_dynamic_residue(&self) -> Result<String, StorageError> {
        let mut platform = self.begin(StorageOp::CleanupResidue)?;

        let pruned = std::mem::take(&mut platform.residue);
        Ok(format!("{pruned} residual volumes pruned"))
    }
}
