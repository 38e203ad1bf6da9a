//! Scenario configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use peerfetch_sim::{ProxyScenario, ProxyScenarioConfig, ScenarioReport, SimConfig};

use crate::error::Result;

/// Everything needed to run a proxy scenario, as stored on disk.
///
/// Missing fields take their defaults, so `{}` is a valid file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub sim: SimConfig,
    pub scenario: ProxyScenarioConfig,
}

impl ScenarioConfig {
    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading scenario config");
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build the scenario and run it to completion.
    pub fn run(&self) -> Result<ScenarioReport> {
        let mut scenario = ProxyScenario::build(self.sim.clone(), self.scenario.clone())?;
        Ok(scenario.run()?)
    }
}
