use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chatbot_core::{ConcurrentPollPolicy, ConversationConfig};
use chatbot_engine::ClientSettings;
use clap::Parser;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use super::logging::LogDestination;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "chatbot-cli",
    version,
    about = "Terminal client for the Abogado Virtual chatbot: one question per line on stdin"
)]
pub struct Cli {
    /// RON configuration file; missing file means defaults
    #[arg(long, default_value = "chatbot.ron")]
    pub config: PathBuf,

    /// Base URL of the chatbot server
    #[arg(long)]
    pub base_url: Option<String>,

    /// CSRF token to send instead of fetching the csrftoken cookie
    #[arg(long)]
    pub csrf_token: Option<String>,

    /// Where log output goes
    #[arg(long, value_enum)]
    pub log: Option<LogDestination>,

    /// Cancel a running progress poll when a new question is accepted
    #[arg(long)]
    pub cancel_previous_polls: bool,

    /// Stop polling a job after this many status queries
    #[arg(long)]
    pub max_poll_attempts: Option<u32>,

    /// Directory for the first-visit marker
    #[arg(long)]
    pub state_dir: Option<PathBuf>,
}

/// On-disk configuration. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub base_url: String,
    pub csrf_token: Option<String>,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: Option<u32>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub status_reset_grace_ms: u64,
    pub typing_threshold_chars: usize,
    pub typing_ms_per_char: u64,
    pub typing_delay_cap_ms: u64,
    pub cancel_previous_polls: bool,
    pub log: LogDestination,
    pub log_level: String,
    pub state_dir: PathBuf,
}

impl Default for FileConfig {
    fn default() -> Self {
        let client = ClientSettings::default();
        let conversation = ConversationConfig::default();
        Self {
            base_url: client.base_url,
            csrf_token: None,
            poll_interval_ms: millis(client.poll_interval),
            max_poll_attempts: None,
            connect_timeout_secs: client.connect_timeout.as_secs(),
            request_timeout_secs: client.request_timeout.as_secs(),
            status_reset_grace_ms: millis(conversation.status_reset_grace),
            typing_threshold_chars: conversation.typing_threshold_chars,
            typing_ms_per_char: conversation.typing_ms_per_char,
            typing_delay_cap_ms: millis(conversation.typing_delay_cap),
            cancel_previous_polls: false,
            log: LogDestination::File,
            log_level: "info".to_string(),
            state_dir: PathBuf::from("."),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub client: ClientSettings,
    pub conversation: ConversationConfig,
    pub log: LogDestination,
    pub log_level: LevelFilter,
    pub state_dir: PathBuf,
}

pub fn load(cli: &Cli) -> Result<AppConfig> {
    let file = load_file_config(&cli.config)?;
    resolve(cli, file)
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read config {}", path.display()))
        }
    };
    ron::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}

/// Applies command-line overrides on top of the file configuration.
pub fn resolve(cli: &Cli, file: FileConfig) -> Result<AppConfig> {
    let log_level: LevelFilter = file
        .log_level
        .parse()
        .map_err(|_| anyhow!("invalid log level {:?}", file.log_level))?;

    let client = ClientSettings {
        base_url: cli.base_url.clone().unwrap_or(file.base_url),
        csrf_token: cli.csrf_token.clone().or(file.csrf_token),
        connect_timeout: Duration::from_secs(file.connect_timeout_secs),
        request_timeout: Duration::from_secs(file.request_timeout_secs),
        poll_interval: Duration::from_millis(file.poll_interval_ms),
        max_poll_attempts: cli.max_poll_attempts.or(file.max_poll_attempts),
        ..ClientSettings::default()
    };
    client
        .send_url()
        .with_context(|| format!("invalid base url {:?}", client.base_url))?;

    let concurrent_polls = if cli.cancel_previous_polls || file.cancel_previous_polls {
        ConcurrentPollPolicy::CancelPrevious
    } else {
        ConcurrentPollPolicy::KeepAll
    };
    let conversation = ConversationConfig {
        typing_threshold_chars: file.typing_threshold_chars,
        typing_ms_per_char: file.typing_ms_per_char,
        typing_delay_cap: Duration::from_millis(file.typing_delay_cap_ms),
        status_reset_grace: Duration::from_millis(file.status_reset_grace_ms),
        concurrent_polls,
    };

    Ok(AppConfig {
        client,
        conversation,
        log: cli.log.unwrap_or(file.log),
        log_level,
        state_dir: cli.state_dir.clone().unwrap_or(file.state_dir),
    })
}
