//! Shipmate Host - Remote side of a release
//!
//! This crate talks to the repository host API and container registries:
//!
//! - **CommitResolver**: branch, commit and tag lookups
//! - **TagPublisher**: two-phase annotated tag creation
//! - **WorkflowMonitor**: CI run discovery and convergence polling
//! - **ContainerVerifier**: single-tag registry existence checks
//!
//! Every response status is classified with [`shipmate_core::classify`];
//! nothing is retried.

pub mod client;
pub mod commits;
pub mod containers;
pub mod credentials;
pub mod error;
pub mod tags;
pub mod workflows;

pub use client::{ACCEPT, HostClient, Reply};
pub use commits::CommitResolver;
pub use containers::ContainerVerifier;
pub use credentials::Token;
pub use error::{HostError, Result};
pub use tags::{PublishedTag, TagPublisher, retag_message};
pub use workflows::{
    MonitorSummary, Selector, TERMINAL_CONCLUSIONS, WINDOW_MINUTES, WorkflowMonitor, WorkflowRef,
    converged, is_terminal, status_table,
};
