//! Shipmate Core - Release records and local release logic
//!
//! This crate provides the types shared by every shipmate crate:
//! - `RepoRecord`: A repository taking part in a release and its release state
//! - `TagGenerator`: Calver/semver tag generation with an injected clock
//! - `ConfigStore`: Typed configuration loaded from TOML
//! - `classify`: The one status classification used for every remote call
//! - `manifest`: Chart metadata and values updates
//! - `Reporter` / `OperatorGate`: Output and approval ports

pub mod classify;
pub mod config;
pub mod error;
pub mod manifest;
pub mod record;
pub mod report;
pub mod tag;

pub use classify::{EndpointKind, ResponseClass, classify};
pub use config::{ChartSettings, ConfigStore, Settings, TomlConfigStore};
pub use error::{CoreError, FailureKind, Result};
pub use record::{ContainerImage, ContainerRegistry, RepoRecord, SourceRef, TagType, looks_like_sha};
pub use report::{
    NullReporter, OperatorGate, RecordingReporter, ReportEvent, Reporter, ScriptedGate, Table,
};
pub use tag::{Clock, FixedClock, SystemClock, TagGenerator, calver, generate_at};
