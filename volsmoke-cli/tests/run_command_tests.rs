//! Integration tests for `volsmoke run` and `volsmoke config`.
//!
//! Drives the same path the CLI takes: config file -> harness config ->
//! in-memory backend -> report.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use volsmoke_core::config::VolsmokeConfig;
use volsmoke_harness::{
    HarnessConfig, InMemoryStorageClient, LifecycleHarness, LifecycleState, StorageOp, Verdict,
};

async fn load(contents: &str) -> VolsmokeConfig {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("volsmoke.toml");
    fs::write(&config_path, contents).expect("should write config");
    VolsmokeConfig::load(&config_path)
        .await
        .expect("config should load")
}

#[tokio::test(start_paused = true)]
#[serial_test::serial]
async fn test_memory_run_from_config_file() {
    // Given: A config with a custom payload and short polling
    let config = load(
        r#"
[convergence]
max_attempts = 5
delay_ms = 100

[lifecycle]
payload = "volsmoke says hi"
target_name = "probe.txt"
"#,
    )
    .await;

    let harness_config = HarnessConfig::from_core(&config.convergence, &config.lifecycle)
        .expect("harness config");
    let client = Arc::new(InMemoryStorageClient::new().with_visibility_lag(3));

    // When: Running the lifecycle
    let report = LifecycleHarness::builder()
        .client(Arc::clone(&client))
        .config(harness_config)
        .build()
        .expect("harness should build")
        .run()
        .await;

    // Then: Passes and the platform is back to baseline
    assert!(report.passed(), "failure: {:?}", report.failure);
    assert_eq!(client.live_count(), 0);
    assert_eq!(client.call_count(StorageOp::Write), 1);
}

#[tokio::test(start_paused = true)]
#[serial_test::serial]
async fn test_lag_beyond_budget_fails_with_timeout() {
    // Given: Fewer attempts than the platform needs to converge
    let config = load("[convergence]\nmax_attempts = 2\ndelay_ms = 50\n").await;
    let harness_config = HarnessConfig::from_core(&config.convergence, &config.lifecycle)
        .expect("harness config");
    let client = Arc::new(InMemoryStorageClient::new().with_visibility_lag(5));

    // When
    let report = LifecycleHarness::builder()
        .client(Arc::clone(&client))
        .config(harness_config)
        .build()
        .expect("harness should build")
        .run()
        .await;

    // Then: Aborted at Provisioned, and cleanup removed the volume
    assert_eq!(
        report.verdict,
        Verdict::Aborted {
            at: LifecycleState::Provisioned
        }
    );
    assert!(!client.volume_exists());
}

#[tokio::test]
#[serial_test::serial]
async fn test_invalid_baseline_policy_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config_path = temp_dir.path().join("volsmoke.toml");
    fs::write(&config_path, "[lifecycle]\nbaseline_policy = \"yolo\"\n")
        .expect("should write config");

    let result = VolsmokeConfig::load(&config_path).await;

    assert!(result.is_err(), "unknown baseline policy should fail validation");
}

#[tokio::test]
#[serial_test::serial]
async fn test_empty_config_uses_defaults() {
    let config = load("").await;

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.convergence.max_attempts, 10);
    assert_eq!(config.docker.label, "io.volsmoke.test");
}
