//! Agent configuration.

use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default timeout for outbound messages.
pub const DEFAULT_MSG_TIMEOUT_SECS: u64 = 10;

/// Environment variable holding the spool directory.
pub const SPOOL_DIR_ENV: &str = "ACTION_AGENT_SPOOL_DIR";

/// Environment variable holding the message timeout, in seconds.
pub const MSG_TIMEOUT_ENV: &str = "ACTION_AGENT_MSG_TIMEOUT";

/// Configuration consumed by the request processor.
///
/// Injected once at startup; nothing reads it from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Root under which one directory per non-blocking job is created.
    pub spool_dir: PathBuf,

    /// Timeout applied to every outbound message.
    #[serde(default = "default_msg_timeout", with = "duration_secs")]
    pub msg_timeout: Duration,
}

const fn default_msg_timeout() -> Duration {
    Duration::from_secs(DEFAULT_MSG_TIMEOUT_SECS)
}

impl AgentConfig {
    /// Config with the default message timeout.
    #[must_use]
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
            msg_timeout: default_msg_timeout(),
        }
    }

    /// Override the message timeout.
    #[must_use]
    pub const fn with_msg_timeout(mut self, timeout: Duration) -> Self {
        self.msg_timeout = timeout;
        self
    }

    /// Read the config from the environment.
    ///
    /// Returns `None` when the spool directory is not set. An unparseable
    /// timeout falls back to the default.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let spool_dir = std::env::var_os(SPOOL_DIR_ENV)?;
        let mut config = Self::new(spool_dir);
        if let Ok(raw) = std::env::var(MSG_TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => config.msg_timeout = Duration::from_secs(secs),
                Err(e) => tracing::warn!("Ignoring {MSG_TIMEOUT_ENV}={raw:?}: {e}"),
            }
        }
        Some(config)
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
