#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 스토리지 클라이언트 trait
pub use client::StorageClient;

// 에러
pub use error::{ConfigError, StorageError, VolsmokeError};

// 설정
pub use config::VolsmokeConfig;

// 도메인 타입
pub use types::VolumeId;
