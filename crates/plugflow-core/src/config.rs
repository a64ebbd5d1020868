//! Engine configuration.
//!
//! Defaults match the values the engine has always used (5-minute command
//! timeout, 1-second backoff base). Every field can be overridden from the
//! environment via [`EngineConfig::from_env`].

use std::time::Duration;

/// Default timeout for COMMAND steps that do not declare one.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Default backoff unit; retry `n` waits `base * 2^n`.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Tunables shared by the workflow, step and agent executors.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Timeout applied to COMMAND steps without an explicit `timeout`.
    pub default_command_timeout: Duration,
    /// Base unit of the exponential retry backoff.
    pub backoff_base: Duration,
    /// Debug mode: agents get `--debug`, raw agent output is kept on parse errors.
    pub debug: bool,
    /// Stream flag forwarded to in-process agents.
    pub stream: bool,
    /// Shell used for COMMAND steps (invoked as `<shell> -c <command>`).
    pub shell: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_command_timeout: DEFAULT_COMMAND_TIMEOUT,
            backoff_base: DEFAULT_BACKOFF_BASE,
            debug: false,
            stream: false,
            shell: "sh".to_string(),
        }
    }
}

impl EngineConfig {
    /// Build a config from defaults overlaid with `PLUGFLOW_*` environment variables.
    ///
    /// - `PLUGFLOW_COMMAND_TIMEOUT_SECS`
    /// - `PLUGFLOW_BACKOFF_BASE_MS`
    /// - `PLUGFLOW_DEBUG` (`1`/`true`)
    /// - `PLUGFLOW_SHELL`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(secs) = env_parse::<u64>("PLUGFLOW_COMMAND_TIMEOUT_SECS") {
            config.default_command_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("PLUGFLOW_BACKOFF_BASE_MS") {
            config.backoff_base = Duration::from_millis(ms);
        }
        if let Ok(v) = std::env::var("PLUGFLOW_DEBUG") {
            config.debug = matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Ok(shell) = std::env::var("PLUGFLOW_SHELL") {
            if !shell.trim().is_empty() {
                config.shell = shell;
            }
        }

        config
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Wait before retry number `attempt` (0-based): `base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(2u32.saturating_pow(attempt))
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("[EngineConfig] Ignoring invalid value for {}: {:?}", key, raw);
            None
        }
    }
}
