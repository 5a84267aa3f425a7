//! Shipmate Pipeline - Release orchestration
//!
//! The [`Orchestrator`] runs the release flows (tag, retag, monitor, verify
//! and chart release) on top of the host and chart crates. Output goes to an
//! injected `Reporter` and every irreversible step waits for the injected
//! `OperatorGate`.

pub mod error;
pub mod orchestrator;
pub mod token;

pub use error::{PipelineError, Result};
pub use orchestrator::{Orchestrator, TagOutcome, Verification};
pub use token::acquire_token;
