//! CLI commands

pub mod monitor;
pub mod release;
pub mod retag;
pub mod tag;
pub mod verify_containers;

use std::path::Path;

use shipmate_core::{ConfigStore, Reporter, RepoRecord, Settings, TomlConfigStore};
use shipmate_host::{ContainerVerifier, HostClient, Token};
use shipmate_pipeline::{Orchestrator, acquire_token};

use crate::display::ConsoleReporter;
use crate::error::Result;
use crate::gate::TerminalGate;

/// Everything a command needs, built from the configuration file
pub struct Session {
    pub settings: Settings,
    pub records: Vec<RepoRecord>,
    pub client: HostClient,
    pub containers: ContainerVerifier,
    pub reporter: ConsoleReporter,
    pub gate: TerminalGate,
}

impl Session {
    /// Load configuration without asking for a token
    pub fn open(config: &Path) -> Result<Self> {
        let store = TomlConfigStore::load_from(config)?;
        Self::from_store(store, None, ConsoleReporter::new(), TerminalGate::new())
    }

    /// Load configuration and settle on a token
    pub fn open_with_token(config: &Path, explicit: Option<String>) -> Result<Self> {
        let store = TomlConfigStore::load_from(config)?;
        let reporter = ConsoleReporter::new();
        let gate = TerminalGate::new();
        let token = acquire_token(explicit, &gate, &reporter)?;
        Self::from_store(store, token, reporter, gate)
    }

    fn from_store(
        store: TomlConfigStore,
        token: Option<Token>,
        reporter: ConsoleReporter,
        gate: TerminalGate,
    ) -> Result<Self> {
        let settings = store.settings().clone();
        let records = store.records();
        let client = HostClient::from_settings(&settings, token)?;
        let containers = ContainerVerifier::from_settings(&settings)?;
        tracing::debug!(repos = records.len(), api = %settings.api_url, "session ready");
        reporter.info(&format!("Loaded {} repositories", records.len()));
        Ok(Self {
            settings,
            records,
            client,
            containers,
            reporter,
            gate,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(
            &self.client,
            &self.containers,
            &self.settings,
            &self.reporter,
            &self.gate,
        )
    }
}
