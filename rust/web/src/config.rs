use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the TOML file to load.
pub const CONFIG_ENV: &str = "BLACKJACK_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Everything the server reads at startup. Every section and field is
/// optional in the file; missing ones take their defaults.
///
/// ```
/// use blackjack_web::config::BlackjackConfig;
///
/// let config = BlackjackConfig::from_toml_str("[game]\ninitial_bank = 500\n").unwrap();
/// assert_eq!(config.game.initial_bank, 500);
/// assert_eq!(config.game.max_history_entries, 20);
/// assert_eq!(config.server.port, 8080);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlackjackConfig {
    pub server: ServerSettings,
    pub game: GameSettings,
    #[serde(alias = "blockchain")]
    pub wallet: WalletSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameSettings {
    /// Chips a new session starts with
    pub initial_bank: u64,
    /// Rounds returned by the status query, newest first
    pub max_history_entries: usize,
    /// Idle time after which a session is dropped
    pub session_timeout_minutes: u64,
    /// Shuffle seed for every new session. Unset means a fresh random seed each.
    pub seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            initial_bank: 1000,
            max_history_entries: 20,
            session_timeout_minutes: 30,
            seed: None,
        }
    }
}

impl GameSettings {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes.saturating_mul(60))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSettings {
    #[serde(alias = "enable_blockchain")]
    pub enabled: bool,
    pub confirmation_delay_ms: u64,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            confirmation_delay_ms: 1000,
        }
    }
}

impl WalletSettings {
    pub fn confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.confirmation_delay_ms)
    }
}

impl BlackjackConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Loads the file named by `BLACKJACK_CONFIG`, or the defaults when the
    /// variable is unset or empty.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.game.initial_bank == 0 {
            return Err(ConfigError::Invalid(
                "game.initial_bank must be > 0".into(),
            ));
        }
        if self.game.max_history_entries == 0 {
            return Err(ConfigError::Invalid(
                "game.max_history_entries must be > 0".into(),
            ));
        }
        if self.game.session_timeout_minutes == 0 {
            return Err(ConfigError::Invalid(
                "game.session_timeout_minutes must be > 0".into(),
            ));
        }
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_yields_defaults() {
        let config = BlackjackConfig::from_toml_str("").expect("parse");
        assert_eq!(config, BlackjackConfig::default());
        assert_eq!(config.game.initial_bank, 1000);
        assert_eq!(config.game.session_ttl(), Duration::from_secs(30 * 60));
        assert!(config.wallet.enabled);
    }

    #[test]
    fn accepts_blockchain_section_names() {
        let source = r#"
            [game]
            initial_bank = 2500
            max_history_entries = 5

            [blockchain]
            enable_blockchain = false
            confirmation_blocks = 3
        "#;
        let config = BlackjackConfig::from_toml_str(source).expect("parse");
        assert_eq!(config.game.initial_bank, 2500);
        assert_eq!(config.game.max_history_entries, 5);
        assert!(!config.wallet.enabled);
        assert_eq!(config.wallet.confirmation_delay_ms, 1000);
    }

    #[test]
    fn rejects_zero_bank() {
        let err = BlackjackConfig::from_toml_str("[game]\ninitial_bank = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("initial_bank")));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = BlackjackConfig::from_toml_str("[game\ninitial_bank = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[server]\nport = 9090\n\n[wallet]\nconfirmation_delay_ms = 5").unwrap();

        let config = BlackjackConfig::load(file.path()).expect("load");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.wallet.confirmation_delay(), Duration::from_millis(5));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.toml");
        match BlackjackConfig::load(&path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
