//! Configuration for the prediction gateway.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use predict_common::ServiceEntry;
use serde::Deserialize;

use crate::engine::OutputProtocol;

/// Main configuration structure for the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Procedure code to model identifier table.
    /// Replaces the built-in table entirely when present.
    ///
    /// A list of `{ code, model }` rather than a table keyed by code, since
    /// config keys are lowercased and codes must match exactly.
    #[serde(default = "default_services")]
    pub services: Vec<ServiceEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
            services: default_services(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Worker process configuration.
///
/// The worker is started as `program [args...] <model_id> <payload_json>`.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Interpreter or binary to run (e.g., "python").
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments inserted BEFORE the model id and payload.
    /// Example: `["backend/main.py"]`. Comma-separated when set from the environment.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Working directory for the worker. Inherits the gateway's when unset.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Deadline for a single invocation in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Time between SIGTERM and SIGKILL when a worker overruns its deadline.
    #[serde(default = "default_kill_grace")]
    pub kill_grace_secs: u64,
    /// Maximum number of worker processes running at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// How long a request may wait for a free worker slot. 0 rejects immediately.
    #[serde(default = "default_queue_timeout")]
    pub queue_timeout_secs: u64,
    /// How worker stdout is turned into a classification.
    #[serde(default)]
    pub protocol: OutputProtocol,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            working_dir: None,
            timeout_secs: default_timeout(),
            kill_grace_secs: default_kill_grace(),
            max_concurrent: default_max_concurrent(),
            queue_timeout_secs: default_queue_timeout(),
            protocol: OutputProtocol::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_program() -> String {
    "python".to_string()
}
fn default_args() -> Vec<String> {
    vec!["backend/main.py".to_string()]
}
fn default_timeout() -> u64 {
    60
}
fn default_kill_grace() -> u64 {
    5
}
fn default_max_concurrent() -> usize {
    4
}
fn default_queue_timeout() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Built-in procedure code table of the reference deployment.
pub fn default_services() -> Vec<ServiceEntry> {
    [
        ("81210", "cancer_prediction"),
        ("81479", "ascvd_prediction"),
        ("93015", "cardio_prediction"),
        ("82947", "diabetes_prediction"),
        ("92235", "dme_prediction"),
        ("93784", "hypertension_prediction"),
        ("75557", "imaging_prediction"),
        ("82565", "kidney_disease_prediction"),
        ("84443", "liver_disease_prediction"),
        ("95970", "neurology_prediction"),
    ]
    .into_iter()
    .map(|(code, model)| ServiceEntry {
        code: code.to_string(),
        model: model.to_string(),
    })
    .collect()
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (PREDICT__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Same as [`Config::load`] with an explicit config file base name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        Self::load_with(file, environment())
    }

    fn load_with(file: &str, env: Environment) -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port() as i64)?
            .set_default("logging.level", default_log_level())?
            .add_source(File::with_name(file).required(false))
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }
}

/// `PREDICT__SECTION__KEY` variables; `worker.args` splits on commas.
fn environment() -> Environment {
    Environment::with_prefix("PREDICT")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("worker.args")
}
