use crate::{muted_error, weak_error};
use log::error;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::Path;
use std::time::Duration;

/// How the controller talks to an adapter process.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Adapter speaks DAP over its stdin/stdout.
    #[default]
    Stdio,
    /// Adapter listens on a TCP port, `{port}` in arguments is substituted.
    Tcp,
}

/// A single debug adapter description.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct AdapterConfig {
    #[serde(default)]
    pub extensions: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub adapter_id: String,
    #[serde(default)]
    pub transport: TransportMode,
    /// Extra arguments merged into a DAP `launch` request.
    #[serde(default)]
    pub launch: Map<String, Value>,
}

/// Launch configuration resolved for a target program.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchConfig {
    pub name: String,
    pub adapter: AdapterConfig,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Timeouts {
    pub start_ms: u64,
    pub step_ms: u64,
    pub targeted_ms: u64,
    pub request_ms: u64,
}

impl Timeouts {
    /// Wait for a stop event after untargeted start.
    pub fn start(&self) -> Duration {
        Duration::from_millis(self.start_ms)
    }

    /// Wait for a stop event after an ordinary step.
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    /// Wait for a stop event when the program runs freely to a breakpoint.
    pub fn targeted(&self) -> Duration {
        Duration::from_millis(self.targeted_ms)
    }

    /// Request/response round-trip limit.
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            start_ms: 2000,
            step_ms: 5000,
            targeted_ms: 10000,
            request_ms: 10000,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 1000 }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    pub max_steps: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self { max_steps: 1000 }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SnapshotConfig {
    pub excerpt_radius: u32,
    pub stack_depth: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            excerpt_radius: 2,
            stack_depth: 64,
        }
    }
}

/// Controller configuration.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub snapshot: SnapshotConfig,
    #[serde(default)]
    pub adapters: BTreeMap<String, AdapterConfig>,
}

impl Default for Config {
    fn default() -> Self {
        let preset = include_str!("preset/config.toml");
        toml::de::from_str(preset).expect("should de")
    }
}

impl Config {
    const DEFAULT_PATH: &'static str = ".config/stepback/config.toml";

    /// Load configuration from file. Return [`None`] on errors.
    pub fn from_file(path: Option<&Path>) -> Option<Self> {
        let data = match path {
            None => {
                let path = home::home_dir()?;
                let path = path.join(Self::DEFAULT_PATH);
                muted_error!(read_to_string(path))?
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    error!(target: "controller", "Error while load config file: {err}");
                    return None;
                }
            },
        };

        weak_error!(toml::de::from_str(&data), "config:")
    }

    /// Load configuration from file, fall back to the built-in preset.
    pub fn load(path: Option<&Path>) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// Map a target program to the adapter able to run it, using the file extension.
    pub fn resolve(&self, target: &Path) -> Option<LaunchConfig> {
        let ext = target.extension()?.to_str()?;
        self.adapters
            .iter()
            .find(|(_, adapter)| adapter.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .map(|(name, adapter)| LaunchConfig {
                name: name.clone(),
                adapter: adapter.clone(),
            })
    }
}
