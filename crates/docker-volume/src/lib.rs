#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`DockerVolumeError`)
//! - [`config`]: Client configuration (`DockerVolumeConfig`, builder)
//! - [`client`]: `StorageClient` implementation (`DockerVolumeClient`)

pub mod client;
pub mod config;
pub mod error;

// --- Public API Re-exports ---

pub use client::DockerVolumeClient;
pub use config::{DockerVolumeConfig, DockerVolumeConfigBuilder, MOUNT_PATH};
pub use error::DockerVolumeError;
