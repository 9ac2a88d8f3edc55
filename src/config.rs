//! Agent configuration and command-line overrides

use anyhow::{bail, Context, Result};
use clap::Parser;
use remote_agent_shared::timing;
use std::path::PathBuf;
use std::time::Duration;

/// Sizing and idle timeout of one serial executor
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Name used in logs
    pub name: String,
    /// Pending actions accepted while one is running
    pub capacity: usize,
    /// Idle wait before the executor stops itself
    pub idle_timeout: Duration,
}

impl ExecutorConfig {
    pub fn new(name: impl Into<String>, capacity: usize, idle_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            capacity,
            idle_timeout,
        }
    }

    /// Executor running push commands
    pub fn commands() -> Self {
        Self::new(
            "command-executor",
            timing::COMMAND_QUEUE_CAPACITY,
            Duration::from_millis(timing::COMMAND_IDLE_TIMEOUT_MS),
        )
    }

    /// Executor running connect/disconnect/registration callbacks
    pub fn registration() -> Self {
        Self::new(
            "registration-dispatcher",
            timing::REGISTRATION_QUEUE_CAPACITY,
            Duration::from_millis(timing::REGISTRATION_IDLE_TIMEOUT_MS),
        )
    }
}

/// Backend and push registration settings
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL of the device registry, without the `/api/1` suffix
    pub base_url: String,
    /// Sender id the push transport registers against
    pub sender_id: String,
    /// Name the device registers under
    pub device_name: String,
    /// Bearer token for the account; `None` means the user has not granted one yet
    pub auth_token: Option<String>,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "https://r2droidhq.appspot.com".into(),
            sender_id: "remote-agent@example.com".into(),
            device_name: "Unknown Device".into(),
            auth_token: None,
            user_agent: concat!("remote-agent/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Timings of the simulated device used by the binary
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// How long the simulated ringtone plays
    pub ring_duration: Duration,
    /// Simulated speech time per character
    pub speech_per_char: Duration,
    /// Locale used for speech
    pub locale: String,
    /// Whether the simulated push service accepts registrations
    pub push_available: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ring_duration: Duration::from_secs(5),
            speech_per_char: Duration::from_millis(60),
            locale: "en".into(),
            push_available: true,
        }
    }
}

/// Complete agent configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub commands: ExecutorConfig,
    pub registration: ExecutorConfig,
    pub backend: BackendConfig,
    pub simulation: SimulationConfig,
    /// How long `vibrate` runs
    pub vibrate_duration: Duration,
    /// File holding account, registration id and online flag
    pub prefs_path: PathBuf,
    /// Account to store before starting, if any
    pub account: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            commands: ExecutorConfig::commands(),
            registration: ExecutorConfig::registration(),
            backend: BackendConfig::default(),
            simulation: SimulationConfig::default(),
            vibrate_duration: Duration::from_millis(timing::VIBRATE_DURATION_MS),
            prefs_path: PathBuf::from("remote-agent-prefs.json"),
            account: None,
        }
    }
}

/// Command-line options; each one can also come from the environment
#[derive(Debug, Parser)]
#[command(name = "remote-agent", about = "Run push-triggered device actions")]
pub struct Cli {
    /// Base URL of the device registry
    #[arg(long, env = "REMOTE_AGENT_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Account used to authenticate against the registry
    #[arg(long, env = "REMOTE_AGENT_ACCOUNT")]
    pub account: Option<String>,

    /// Bearer token for the account
    #[arg(long, env = "REMOTE_AGENT_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Name the device registers under
    #[arg(long, env = "REMOTE_AGENT_DEVICE_NAME")]
    pub device_name: Option<String>,

    /// Preferences file
    #[arg(long, env = "REMOTE_AGENT_PREFS")]
    pub prefs: Option<PathBuf>,

    /// Seconds the command executor waits for work before stopping
    #[arg(long)]
    pub command_idle_secs: Option<u64>,

    /// Seconds the registration executor waits for work before stopping
    #[arg(long)]
    pub registration_idle_secs: Option<u64>,

    /// Make the simulated push service refuse registrations
    #[arg(long)]
    pub push_unavailable: bool,
}

impl Cli {
    /// Apply the overrides on top of the defaults
    pub fn into_config(self) -> Result<AgentConfig> {
        let mut config = AgentConfig::default();

        if let Some(url) = self.backend_url {
            config.backend.base_url = url;
        }
        reqwest::Url::parse(&config.backend.base_url)
            .with_context(|| format!("invalid backend URL: {}", config.backend.base_url))?;

        if let Some(name) = self.device_name {
            if name.trim().is_empty() {
                bail!("device name must not be empty");
            }
            config.backend.device_name = name;
        }
        config.backend.auth_token = self.auth_token;
        config.account = self.account;

        if let Some(path) = self.prefs {
            config.prefs_path = path;
        }
        if let Some(secs) = self.command_idle_secs {
            config.commands.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.registration_idle_secs {
            config.registration.idle_timeout = Duration::from_secs(secs);
        }
        config.simulation.push_available = !self.push_unavailable;

        Ok(config)
    }
}
