#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`state`]: Lifecycle state machine (`LifecycleState`)
//! - [`poller`]: Convergence polling (`ConvergencePoller`, `ConvergenceExpectation`)
//! - [`session`]: Per-run session holding the baseline (`LifecycleSession`)
//! - [`cleanup`]: Guaranteed cleanup (`CleanupGuard`, `CleanupReport`)
//! - [`lifecycle`]: Main orchestrator (`LifecycleHarness`, `LifecycleHarnessBuilder`)
//! - [`report`]: Run results (`LifecycleReport`, `Verdict`)
//! - [`memory`]: In-memory storage client with fault injection
//! - [`config`]: Harness configuration (`HarnessConfig`, builder)
//! - [`error`]: Lifecycle failure taxonomy (`HarnessError`)
//!
//! # Architecture
//!
//! ```text
//! LifecycleHarness::run()
//!      |
//!  CleanupGuard (registered first)
//!      |
//!  StepDriver --> StorageClient op --> ConvergencePoller --> assertion --> next state
//!      |
//!  CleanupGuard::run() --> LifecycleReport
//! ```

pub mod cleanup;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod poller;
pub mod report;
pub mod session;
pub mod state;

// --- Public API Re-exports ---

// Harness (main orchestrator)
pub use lifecycle::{LifecycleHarness, LifecycleHarnessBuilder};

// Configuration
pub use config::{BaselinePolicy, HarnessConfig, HarnessConfigBuilder};

// Error
pub use error::HarnessError;

// State machine
pub use state::LifecycleState;

// Convergence
pub use poller::{ConvergenceExpectation, ConvergenceOutcome, ConvergencePoller};

// Cleanup
pub use cleanup::{CleanupGuard, CleanupReport};

// Report
pub use report::{LifecycleReport, StepRecord, Verdict};

// Session
pub use session::LifecycleSession;

// In-memory client
pub use memory::{InMemoryStorageClient, StorageOp};
