use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use billing_core::ExportFormat;
use billing_engine::{EngineConfig, PollPolicy, Selectors, SessionMode, WebDriverSettings};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::cli::{Cli, LogTarget};

/// Looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "billing_export.ron";
pub const DEFAULT_PAGE_URL: &str = "https://d-tools.cloud/billing/home";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollPolicy::default().into()
    }
}

impl From<PollPolicy> for PollSettings {
    fn from(policy: PollPolicy) -> Self {
        Self {
            interval_ms: u64::try_from(policy.interval.as_millis()).unwrap_or(u64::MAX),
            max_attempts: policy.max_attempts,
        }
    }
}

impl PollSettings {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(self.interval_ms),
            max_attempts: self.max_attempts,
        }
    }
}

/// Contents of `billing_export.ron`. Every field is optional in the file.
///
/// ```text
/// (
///     session_id: Some("6f1c..."),
///     output_dir: "exports",
///     format: both,
///     transition_poll: (interval_ms: 500, max_attempts: 40),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub webdriver_url: String,
    /// Attach to this session instead of starting a new browser.
    pub session_id: Option<String>,
    /// Opened before exporting; `None` keeps the page the browser shows.
    pub page_url: Option<String>,
    pub output_dir: PathBuf,
    pub format: ExportFormat,
    pub headless: bool,
    pub request_timeout_secs: u64,
    pub transition_poll: PollSettings,
    pub table_poll: PollSettings,
    pub selectors: Selectors,
    pub log: LogTarget,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let webdriver = WebDriverSettings::default();
        Self {
            webdriver_url: webdriver.endpoint,
            session_id: None,
            page_url: Some(DEFAULT_PAGE_URL.to_string()),
            output_dir: PathBuf::from("."),
            format: ExportFormat::default(),
            headless: false,
            request_timeout_secs: webdriver.request_timeout.as_secs(),
            transition_poll: PollPolicy::default().into(),
            table_poll: PollPolicy::table_ready().into(),
            selectors: Selectors::default(),
            log: LogTarget::default(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Command-line flags take precedence over the file.
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(url) = &cli.webdriver {
            self.webdriver_url = url.clone();
        }
        if let Some(session) = &cli.session {
            self.session_id = Some(session.clone());
        }
        if cli.no_navigate {
            self.page_url = None;
        } else if let Some(url) = &cli.url {
            self.page_url = Some(url.clone());
        }
        if let Some(format) = cli.format {
            self.format = format;
        }
        if let Some(out) = &cli.out {
            self.output_dir = out.clone();
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
        self.headless |= cli.headless;
        self
    }

    pub fn engine_config(&self) -> EngineConfig {
        let mut capabilities = json!({ "browserName": "chrome" });
        if self.headless {
            capabilities["goog:chromeOptions"] = json!({ "args": ["--headless=new"] });
        }

        let session = match &self.session_id {
            Some(id) => SessionMode::Attach(id.clone()),
            None => SessionMode::New,
        };

        let mut config = EngineConfig::default_with_output(self.output_dir.clone());
        config.webdriver = WebDriverSettings {
            endpoint: self.webdriver_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            capabilities,
        };
        config.session = session;
        config.start_url = self.page_url.clone();
        config.selectors = self.selectors.clone();
        config.transition_poll = self.transition_poll.policy();
        config.table_poll = self.table_poll.policy();
        config
    }
}

/// Reads the config at `path`, or `./billing_export.ron` if it exists, or
/// falls back to defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => read_config(path),
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.is_file() {
                read_config(path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

fn read_config(path: &Path) -> anyhow::Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ron::from_str(&content).with_context(|| format!("failed to parse config {}", path.display()))
}
