//! Docker named volume 기반 스토리지 클라이언트
//!
//! [`DockerVolumeClient`] maps the storage façade onto a Docker named volume and
//! a short-lived helper container that keeps the volume mounted.
//!
//! # Operation Mapping
//!
//! ```text
//! list      -> GET  /volumes?filters={"label":[<label>=<volume>]}
//! create    -> POST /volumes/create (name, driver, label <label>=<volume>)
//! mount     -> POST /containers/create + start (helper, bind <volume>:/mnt/volsmoke)
//! write     -> exec sh -c 'printf %s "$1" > /mnt/volsmoke/"$2"'
//! read      -> exec cat /mnt/volsmoke/<target>
//! unmount   -> DELETE /containers/<helper>?force=true
//! delete    -> DELETE /volumes/<volume>
//! residue   -> POST /volumes/prune?filters={"label":[<label>=<volume>],"all":["true"]}
//! ```
//!
//! Every resource carries `<label>=<volume name>`, so sessions with different
//! volume names never see or prune each other's volumes.
//!
//! # Target Name Validation
//!
//! Target names are validated before any exec is issued: they must be
//! non-empty, at most 255 bytes, must not be `.` or `..`, and must not
//! contain `/` or NUL. The payload and target are passed to `sh` as
//! positional arguments, never interpolated into the script.

use std::collections::HashMap;
use std::sync::Arc;

use bollard::container::{
    Config, CreateContainerOptions, LogOutput, RemoveContainerOptions, StartContainerOptions,
};
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use bollard::volume::{CreateVolumeOptions, ListVolumesOptions, PruneVolumesOptions};
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use volsmoke_core::client::StorageClient;
use volsmoke_core::config::validate_target_name;
use volsmoke_core::error::StorageError;
use volsmoke_core::types::VolumeId;

use crate::config::{DockerVolumeConfig, MOUNT_PATH};
use crate::error::DockerVolumeError;

/// Production storage client backed by Docker named volumes.
///
/// Internally uses `Arc<bollard::Docker>` for safe sharing across async tasks.
///
/// # Examples
///
/// ```ignore
/// use volsmoke_docker::{DockerVolumeClient, DockerVolumeConfig};
///
/// let client = DockerVolumeClient::connect(DockerVolumeConfig::default())?;
/// client.ping().await?;
/// # Ok::<(), volsmoke_docker::DockerVolumeError>(())
/// ```
pub struct DockerVolumeClient {
    docker: Arc<bollard::Docker>,
    config: DockerVolumeConfig,
}

impl DockerVolumeClient {
    /// Validates the configuration and connects to the Docker daemon.
    ///
    /// An empty `socket` uses the platform's local defaults.
    ///
    /// # Errors
    ///
    /// - `DockerVolumeError::Config`: Invalid configuration
    /// - `DockerVolumeError::DockerConnection`: Socket not found, permission denied, etc.
    pub fn connect(config: DockerVolumeConfig) -> Result<Self, DockerVolumeError> {
        config.validate()?;

        let docker = if config.socket.is_empty() {
            bollard::Docker::connect_with_local_defaults().map_err(|e| {
                DockerVolumeError::DockerConnection(format!("failed to connect to docker: {e}"))
            })?
        } else {
            bollard::Docker::connect_with_socket(
                &config.socket,
                config.connect_timeout_secs,
                bollard::API_DEFAULT_VERSION,
            )
            .map_err(|e| {
                DockerVolumeError::DockerConnection(format!(
                    "failed to connect to docker at {}: {e}",
                    config.socket
                ))
            })?
        };

        Ok(Self {
            docker: Arc::new(docker),
            config,
        })
    }

    /// Client configuration.
    pub fn config(&self) -> &DockerVolumeConfig {
        &self.config
    }

    /// Checks Docker daemon connectivity.
    ///
    /// # Errors
    ///
    /// Returns `DockerVolumeError::DockerConnection` if the daemon is unreachable.
    pub async fn ping(&self) -> Result<(), DockerVolumeError> {
        self.docker
            .ping()
            .await
            .map_err(|e| DockerVolumeError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }

    /// Pulls the helper image unless it is already present.
    async fn ensure_helper_image(&self) -> Result<(), StorageError> {
        let image = &self.config.helper_image;
        if self.docker.inspect_image(image).await.is_ok() {
            return Ok(());
        }

        info!(image = image.as_str(), "pulling helper image");
        let options = CreateImageOptions {
            from_image: image.clone(),
            ..Default::default()
        };
        self.docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| classify("mount", e))?;
        Ok(())
    }

    /// Runs `cmd` in the helper container and returns its stdout.
    async fn exec(&self, op: &str, cmd: Vec<String>) -> Result<String, StorageError> {
        let helper = self.config.helper_container_name();

        let created = self
            .docker
            .create_exec(
                &helper,
                CreateExecOptions {
                    cmd: Some(cmd),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| classify(op, e))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        if let StartExecResults::Attached { mut output, .. } = self
            .docker
            .start_exec(&created.id, None)
            .await
            .map_err(|e| classify(op, e))?
        {
            while let Some(chunk) = output.next().await {
                match chunk.map_err(|e| classify(op, e))? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspect = self
            .docker
            .inspect_exec(&created.id)
            .await
            .map_err(|e| classify(op, e))?;
        let exit_code = check_exit(op, inspect.exit_code, &stderr)?;

        debug!(op, exit_code, bytes = stdout.len(), "exec finished");
        Ok(stdout)
    }
}

impl StorageClient for DockerVolumeClient {
    async fn list_volumes(&self) -> Result<Vec<VolumeId>, StorageError> {
        let options = ListVolumesOptions {
            filters: label_filters(&self.config),
        };

        let response = self
            .docker
            .list_volumes(Some(options))
            .await
            .map_err(|e| classify("list", e))?;

        Ok(response
            .volumes
            .unwrap_or_default()
            .into_iter()
            .map(|volume| VolumeId::new(volume.name))
            .collect())
    }

    async fn create_volume(&self) -> Result<VolumeId, StorageError> {
        let options = CreateVolumeOptions {
            name: self.config.volume_name.clone(),
            driver: self.config.driver.clone(),
            driver_opts: HashMap::new(),
            labels: resource_labels(&self.config),
        };

        let volume = self
            .docker
            .create_volume(options)
            .await
            .map_err(|e| classify("create", e))?;

        Ok(VolumeId::new(volume.name))
    }

    async fn mount_volume(&self) -> Result<String, StorageError> {
        self.ensure_helper_image().await?;

        let helper = self.config.helper_container_name();
        let options = CreateContainerOptions {
            name: helper.clone(),
            platform: None,
        };
        let container = Config {
            image: Some(self.config.helper_image.clone()),
            cmd: Some(vec!["sleep".to_owned(), "3600".to_owned()]),
            labels: Some(resource_labels(&self.config)),
            host_config: Some(HostConfig {
                binds: Some(vec![self.config.volume_bind()]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let created = self
            .docker
            .create_container(Some(options), container)
            .await
            .map_err(|e| classify("mount", e))?;

        self.docker
            .start_container(&helper, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| classify("mount", e))?;

        Ok(format!(
            "container {helper} ({}) started with {} at {MOUNT_PATH}",
            created.id, self.config.volume_name
        ))
    }

    async fn write_content(&self, payload: &str, target_name: &str) -> Result<String, StorageError> {
        validate_target_name(target_name).map_err(StorageError::InvalidInput)?;

        self.exec("write", write_command(payload, target_name)).await?;
        Ok(format!(
            "{} bytes written to {MOUNT_PATH}/{target_name}",
            payload.len()
        ))
    }

    async fn read_content(&self, target_name: &str) -> Result<String, StorageError> {
        validate_target_name(target_name).map_err(StorageError::InvalidInput)?;

        self.exec("read", read_command(target_name)).await
    }

    async fn unmount_volume(&self) -> Result<String, StorageError> {
        let helper = self.config.helper_container_name();

        self.docker
            .remove_container(
                &helper,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
            .map_err(|e| classify("unmount", e))?;

        Ok(format!("container {helper} removed"))
    }

    async fn delete_volume(&self) -> Result<String, StorageError> {
        let name = &self.config.volume_name;

        self.docker
            .remove_volume(name, None)
            .await
            .map_err(|e| classify("delete", e))?;

        Ok(format!("volume {name} removed"))
    }

    async fn cleanup_dynamic_residue(&self) -> Result<String, StorageError> {
        let options = PruneVolumesOptions {
            filters: prune_filters(&self.config),
        };

        let response = self
            .docker
            .prune_volumes(Some(options))
            .await
            .map_err(|e| classify("cleanup_residue", e))?;

        let pruned = response.volumes_deleted.unwrap_or_default();
        Ok(format!(
            "{} labelled volumes pruned, {} bytes reclaimed",
            pruned.len(),
            response.space_reclaimed.unwrap_or(0)
        ))
    }
}

/// `{"label": [<label>=<volume>]}` filter for list.
fn label_filters(config: &DockerVolumeConfig) -> HashMap<String, Vec<String>> {
    HashMap::from([("label".to_owned(), vec![config.label_selector()])])
}

/// Prune filter. Without `all=true` the daemon (API >= 1.42) only prunes
/// anonymous volumes.
fn prune_filters(config: &DockerVolumeConfig) -> HashMap<String, Vec<String>> {
    let mut filters = label_filters(config);
    filters.insert("all".to_owned(), vec!["true".to_owned()]);
    filters
}

/// Labels attached to every resource the client creates.
fn resource_labels(config: &DockerVolumeConfig) -> HashMap<String, String> {
    HashMap::from([(config.label.clone(), config.volume_name.clone())])
}

/// Turns an inspected exec status into the command's exit code.
///
/// A missing exit code means the daemon could not report completion and is
/// treated as a failure.
fn check_exit(op: &str, exit_code: Option<i64>, stderr: &str) -> Result<i64, DockerVolumeError> {
    match exit_code {
        Some(0) => Ok(0),
        Some(exit_code) => Err(DockerVolumeError::Exec {
            command: op.to_owned(),
            exit_code,
            stderr: stderr.trim().to_owned(),
        }),
        None => Err(DockerVolumeError::ExecStatusUnknown(op.to_owned())),
    }
}

/// Payload and target travel as positional parameters (`$1`, `$2`).
fn write_command(payload: &str, target_name: &str) -> Vec<String> {
    vec![
        "sh".to_owned(),
        "-c".to_owned(),
        format!("printf %s \"$1\" > {MOUNT_PATH}/\"$2\""),
        "volsmoke".to_owned(),
        payload.to_owned(),
        target_name.to_owned(),
    ]
}

fn read_command(target_name: &str) -> Vec<String> {
    vec!["cat".to_owned(), format!("{MOUNT_PATH}/{target_name}")]
}

/// Maps a bollard error onto the façade taxonomy.
///
/// - **404**: `StorageError::NotFound`
/// - **other daemon responses**: `StorageError::Operation`
/// - **transport failures**: `StorageError::Connection`
fn classify(op: &str, err: bollard::errors::Error) -> StorageError {
    use bollard::errors::Error;

    match err {
        Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => StorageError::NotFound(message),
        Error::DockerResponseServerError {
            status_code,
            message,
        } => StorageError::operation(op, format!("docker returned {status_code}: {message}")),
        other => StorageError::Connection(format!("{op}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(volume: &str) -> DockerVolumeConfig {
        DockerVolumeConfig::builder()
            .volume_name(volume)
            .build()
            .unwrap()
    }

    #[test]
    fn label_filters_select_by_label_and_volume() {
        let filters = label_filters(&config_for("volsmoke-test"));
        assert_eq!(filters.len(), 1);
        assert_eq!(
            filters["label"],
            vec!["io.volsmoke.test=volsmoke-test".to_owned()]
        );
    }

    #[test]
    fn unique_sessions_have_disjoint_filters() {
        let a = config_for("volsmoke-test-1a2b3c4d");
        let b = config_for("volsmoke-test-5e6f7a8b");

        assert_ne!(label_filters(&a)["label"], label_filters(&b)["label"]);
        assert_ne!(prune_filters(&a)["label"], prune_filters(&b)["label"]);

        // b의 리소스 레이블은 a의 셀렉터와 일치하지 않음
        let labels = resource_labels(&b);
        let selector = format!("{}={}", a.label, labels[&a.label]);
        assert!(!label_filters(&a)["label"].contains(&selector));
    }

    #[test]
    fn resource_labels_carry_volume_name() {
        let labels = resource_labels(&config_for("volsmoke-test"));
        assert_eq!(labels["io.volsmoke.test"], "volsmoke-test");
    }

    #[test]
    fn prune_filters_include_named_volumes() {
        let filters = prune_filters(&config_for("volsmoke-test"));
        assert_eq!(filters.len(), 2);
        assert_eq!(filters["all"], vec!["true".to_owned()]);
        assert_eq!(
            filters["label"],
            vec!["io.volsmoke.test=volsmoke-test".to_owned()]
        );
    }

    #[test]
    fn check_exit_accepts_only_zero() {
        assert_eq!(check_exit("read", Some(0), "").unwrap(), 0);

        let err = check_exit("read", Some(1), "cat: can't open\n").unwrap_err();
        assert!(matches!(
            err,
            DockerVolumeError::Exec { exit_code: 1, ref stderr, .. } if stderr == "cat: can't open"
        ));
    }

    #[test]
    fn check_exit_rejects_missing_exit_code() {
        let err = check_exit("write", None, "").unwrap_err();
        assert!(matches!(err, DockerVolumeError::ExecStatusUnknown(ref op) if op == "write"));

        let storage: StorageError = err.into();
        assert_eq!(storage.to_string(), "write failed: exit code unavailable");
    }

    #[test]
    fn write_command_passes_payload_as_argument() {
        let cmd = write_command("it's \"quoted\" $HOME", "testFile1");
        assert_eq!(cmd[0], "sh");
        assert_eq!(cmd[1], "-c");
        assert_eq!(cmd[2], "printf %s \"$1\" > /mnt/volsmoke/\"$2\"");
        // 페이로드는 스크립트에 섞이지 않음
        assert!(!cmd[2].contains("HOME"));
        assert_eq!(cmd[4], "it's \"quoted\" $HOME");
        assert_eq!(cmd[5], "testFile1");
    }

    #[test]
    fn read_command_targets_mount_path() {
        assert_eq!(
            read_command("testFile1"),
            vec!["cat".to_owned(), "/mnt/volsmoke/testFile1".to_owned()]
        );
    }

    #[test]
    fn classify_maps_404_to_not_found() {
        let err = classify(
            "delete",
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message: "no such volume".to_owned(),
            },
        );
        assert_eq!(err, StorageError::NotFound("no such volume".to_owned()));
    }

    #[test]
    fn classify_maps_conflict_to_operation() {
        let err = classify(
            "delete",
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message: "volume is in use".to_owned(),
            },
        );
        assert_eq!(
            err.to_string(),
            "delete failed: docker returned 409: volume is in use"
        );
    }

    #[test]
    fn connect_rejects_invalid_config_before_dialing() {
        let config = DockerVolumeConfig {
            volume_name: "x".to_owned(),
            ..DockerVolumeConfig::default()
        };
        assert!(matches!(
            DockerVolumeClient::connect(config),
            Err(DockerVolumeError::Config { .. })
        ));
    }

    #[test]
    fn docker_volume_client_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DockerVolumeClient>();
    }
}
