//! Shipmate Chart - Chart release publishing
//!
//! Git and packaging are reached through the [`GitClient`] and
//! [`PackageTool`] ports. [`SystemGit`] and [`Helm`] run the real tools;
//! [`ReleasePublisher`] sequences them, and [`MockGit`] / [`MockPackage`]
//! stand in for both in tests.

pub mod error;
pub mod git;
pub mod mock;
pub mod package;
pub mod publisher;

pub use error::{ChartError, Result};
pub use git::{GitClient, SystemGit};
pub use mock::{MockGit, MockPackage};
pub use package::{Helm, PackageTool};
pub use publisher::{INDEX_FILE, PreparedRelease, ReleasePublisher, validate_chart_version};
