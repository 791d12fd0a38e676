//! Connection configuration.

use crate::{error::Result, Error};
use std::time::Duration;

/// Tunables shared by every collection opened through a cluster handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// Deadline for key/value operations.
    pub operation_timeout: Duration,

    /// Deadline for view queries.
    pub view_timeout: Duration,

    /// Delay between observe polls for persist_to/replicate_to.
    pub durability_interval: Duration,

    /// Overall deadline for persist_to/replicate_to.
    pub durability_timeout: Duration,

    /// Deadline for HTTP services.
    pub http_timeout: Duration,

    /// Deadline for the initial cluster configuration.
    pub config_timeout: Duration,

    /// Minimum delay between configuration refreshes.
    pub config_delay: Duration,

    /// Per-node deadline while fetching configuration.
    pub config_node_timeout: Duration,

    /// Idle time before an HTTP configuration stream is closed.
    pub htconfig_idle_timeout: Duration,

    /// Background configuration polling interval (0 = never).
    pub config_poll_interval: Duration,

    /// Whether mutations should ask for mutation tokens.
    pub mutation_tokens: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            operation_timeout: Duration::from_millis(2500),
            view_timeout: Duration::from_secs(75),
            durability_interval: Duration::from_millis(100),
            durability_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(75),
            config_timeout: Duration::from_secs(5),
            config_delay: Duration::from_millis(10),
            config_node_timeout: Duration::from_secs(2),
            htconfig_idle_timeout: Duration::from_secs(4),
            config_poll_interval: Duration::from_millis(2500),
            mutation_tokens: true,
        }
    }
}

impl ConnectionOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn operation_timeout(mut self, value: Duration) -> Self {
        self.operation_timeout = value;
        self
    }

    #[must_use]
    pub const fn view_timeout(mut self, value: Duration) -> Self {
        self.view_timeout = value;
        self
    }

    #[must_use]
    pub const fn durability_interval(mut self, value: Duration) -> Self {
        self.durability_interval = value;
        self
    }

    #[must_use]
    pub const fn durability_timeout(mut self, value: Duration) -> Self {
        self.durability_timeout = value;
        self
    }

    #[must_use]
    pub const fn http_timeout(mut self, value: Duration) -> Self {
        self.http_timeout = value;
        self
    }

    #[must_use]
    pub const fn config_timeout(mut self, value: Duration) -> Self {
        self.config_timeout = value;
        self
    }

    #[must_use]
    pub const fn config_delay(mut self, value: Duration) -> Self {
        self.config_delay = value;
        self
    }

    #[must_use]
    pub const fn config_node_timeout(mut self, value: Duration) -> Self {
        self.config_node_timeout = value;
        self
    }

    #[must_use]
    pub const fn htconfig_idle_timeout(mut self, value: Duration) -> Self {
        self.htconfig_idle_timeout = value;
        self
    }

    #[must_use]
    pub const fn config_poll_interval(mut self, value: Duration) -> Self {
        self.config_poll_interval = value;
        self
    }

    #[must_use]
    pub const fn mutation_tokens(mut self, value: bool) -> Self {
        self.mutation_tokens = value;
        self
    }

    /// Load overrides from `KVDOC_*` environment variables.
    ///
    /// Durations are given in milliseconds, e.g.
    /// `KVDOC_OPERATION_TIMEOUT_MS=5000`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ConnectionOptions::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut options = Self::default();
        let millis = |name: &str, target: &mut Duration| -> Result<()> {
            if let Some(raw) = lookup(name) {
                let ms = raw.trim().parse::<u64>().map_err(|_| {
                    Error::InvalidArgument(format!("{name} must be milliseconds, got '{raw}'"))
                })?;
                *target = Duration::from_millis(ms);
            }
            Ok(())
        };

        millis("KVDOC_OPERATION_TIMEOUT_MS", &mut options.operation_timeout)?;
        millis("KVDOC_VIEW_TIMEOUT_MS", &mut options.view_timeout)?;
        millis("KVDOC_DURABILITY_INTERVAL_MS", &mut options.durability_interval)?;
        millis("KVDOC_DURABILITY_TIMEOUT_MS", &mut options.durability_timeout)?;
        millis("KVDOC_HTTP_TIMEOUT_MS", &mut options.http_timeout)?;
        millis("KVDOC_CONFIG_TIMEOUT_MS", &mut options.config_timeout)?;
        millis("KVDOC_CONFIG_DELAY_MS", &mut options.config_delay)?;
        millis("KVDOC_CONFIG_NODE_TIMEOUT_MS", &mut options.config_node_timeout)?;
        millis("KVDOC_HTCONFIG_IDLE_TIMEOUT_MS", &mut options.htconfig_idle_timeout)?;
        millis("KVDOC_CONFIG_POLL_INTERVAL_MS", &mut options.config_poll_interval)?;

        if let Some(raw) = lookup("KVDOC_MUTATION_TOKENS") {
            options.mutation_tokens = match raw.trim() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "KVDOC_MUTATION_TOKENS must be a boolean, got '{raw}'"
                    )))
                }
            };
        }

        Ok(options)
    }
}
