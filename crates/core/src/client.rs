//! Storage client abstraction.
//!
//! The [`StorageClient`] trait is the only boundary between the lifecycle
//! harness and the platform under test. The harness never knows how an
//! operation reaches the platform; production code injects a real client
//! (e.g. the Docker volume client) while tests inject an in-memory one.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐
//! │ LifecycleHarness  │
//! └─────────┬─────────┘
//!           │
//!           ▼
//!   ┌───────────────┐
//!   │ StorageClient │ (trait)
//!   └───────────────┘
//!        │       │
//!        ▼       ▼
//!   ┌────────┐ ┌────────┐
//!   │ Docker │ │ Memory │
//!   └───┬────┘ └────────┘
//!       │
//!       ▼
//!   Docker Daemon
//! ```
//!
//! # Eventual consistency
//!
//! `create_volume` and `delete_volume` may return before their effect is
//! visible through `list_volumes`. Callers that need to observe the effect
//! poll the inventory instead of trusting the return value.

use std::future::Future;

use crate::error::StorageError;
use crate::types::VolumeId;

/// Trait abstracting the storage-management platform.
///
/// Every operation is fallible. Operations other than `list_volumes`,
/// `create_volume` and `read_content` return the platform's free-form
/// command output, which callers may log but must not interpret.
///
/// The trait is `Send + Sync + 'static` so a single client can be shared
/// as `Arc<S>` between the lifecycle driver task and the cleanup guard.
pub trait StorageClient: Send + Sync + 'static {
    /// Lists the volumes currently known to the platform.
    ///
    /// Only the length of the result is meaningful to the harness.
    fn list_volumes(&self)
    -> impl Future<Output = Result<Vec<VolumeId>, StorageError>> + Send;

    /// Provisions the volume under test.
    ///
    /// The returned identifier may not yet appear in `list_volumes`.
    fn create_volume(&self) -> impl Future<Output = Result<VolumeId, StorageError>> + Send;

    /// Attaches the provisioned volume so content can be written to it.
    fn mount_volume(&self) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Writes `payload` to the file `target_name` on the mounted volume.
    fn write_content(
        &self,
        payload: &str,
        target_name: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Reads the file `target_name` back from the mounted volume.
    ///
    /// The platform may wrap the content (e.g. trailing newline or metadata),
    /// so callers check containment rather than equality.
    fn read_content(
        &self,
        target_name: &str,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Detaches the volume.
    fn unmount_volume(&self) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Deprovisions the volume. The removal may become visible later.
    fn delete_volume(&self) -> impl Future<Output = Result<String, StorageError>> + Send;

    /// Removes platform-specific leftovers of dynamic provisioning
    /// (claims, bound images, dangling volumes).
    fn cleanup_dynamic_residue(
        &self,
    ) -> impl Future<Output = Result<String, StorageError>> + Send;
}
