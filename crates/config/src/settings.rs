//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{catalog, endpoints, observability, sessions, timing};
use crate::ConfigError;

/// Runtime environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - relaxed validation, warnings only
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Composing delays
    #[serde(default)]
    pub timing: TimingConfig,

    /// Conversation flow policy
    #[serde(default)]
    pub flow: FlowConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Path to the content catalog (YAML)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
}

fn default_catalog_path() -> String {
    catalog::DEFAULT_PATH.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            environment: RuntimeEnvironment::default(),
            server: ServerConfig::default(),
            timing: TimingConfig::default(),
            flow: FlowConfig::default(),
            observability: ObservabilityConfig::default(),
            catalog_path: default_catalog_path(),
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.timing.validate()?;
        self.validate_flow()?;
        self.validate_observability()?;

        if self.catalog_path.trim().is_empty() {
            return Err(ConfigError::MissingField("catalog_path".to_string()));
        }

        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        let server = &self.server;

        if server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port cannot be 0".to_string(),
            });
        }

        if server.max_sessions == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_sessions".to_string(),
                message: "Max sessions must be at least 1".to_string(),
            });
        }

        if server.timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: "Timeout must be at least 1 second".to_string(),
            });
        }

        if server.cleanup_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.cleanup_interval_secs".to_string(),
                message: "Cleanup interval must be at least 1 second".to_string(),
            });
        }

        if self.environment.is_strict() && server.cors_enabled && server.cors_origins.is_empty()
        {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_origins".to_string(),
                message: "Explicit CORS origins are required outside development".to_string(),
            });
        }

        Ok(())
    }

    fn validate_flow(&self) -> Result<(), ConfigError> {
        if self.flow.event_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "flow.event_buffer".to_string(),
                message: "Event buffer must hold at least 1 event".to_string(),
            });
        }
        Ok(())
    }

    fn validate_observability(&self) -> Result<(), ConfigError> {
        let level = self.observability.log_level.to_lowercase();
        if !observability::LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "observability.log_level".to_string(),
                message: format!(
                    "Unknown log level '{}', expected one of {:?}",
                    self.observability.log_level,
                    observability::LOG_LEVELS
                ),
            });
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins (empty = any, development only)
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// Sessions idle for longer than this are dropped
    #[serde(default = "default_idle_timeout")]
    pub session_idle_timeout_secs: u64,

    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_host() -> String {
    endpoints::DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    endpoints::DEFAULT_PORT
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_max_sessions() -> usize {
    sessions::MAX_SESSIONS
}
fn default_idle_timeout() -> u64 {
    sessions::IDLE_TIMEOUT_SECS
}
fn default_cleanup_interval() -> u64 {
    sessions::CLEANUP_INTERVAL_SECS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            max_sessions: default_max_sessions(),
            session_idle_timeout_secs: default_idle_timeout(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl ServerConfig {
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Simulated composing delays, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub intake_ms: u64,
    pub triage_ms: u64,
    pub guided_entry_ms: u64,
    pub next_step_ms: u64,
    pub escalation_text_ms: u64,
    pub escalation_card_ms: u64,
    pub resolution_ms: u64,
    pub summary_ms: u64,
    pub redirect_ms: u64,
    pub redirect_resume_ms: u64,
    pub free_text_reply_ms: u64,
    pub escalation_request_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            intake_ms: timing::INTAKE_MS,
            triage_ms: timing::TRIAGE_MS,
            guided_entry_ms: timing::GUIDED_ENTRY_MS,
            next_step_ms: timing::NEXT_STEP_MS,
            escalation_text_ms: timing::ESCALATION_TEXT_MS,
            escalation_card_ms: timing::ESCALATION_CARD_MS,
            resolution_ms: timing::RESOLUTION_MS,
            summary_ms: timing::SUMMARY_MS,
            redirect_ms: timing::REDIRECT_MS,
            redirect_resume_ms: timing::REDIRECT_RESUME_MS,
            free_text_reply_ms: timing::FREE_TEXT_REPLY_MS,
            escalation_request_ms: timing::ESCALATION_REQUEST_MS,
        }
    }
}

impl TimingConfig {
    /// All delays zero, for hosts that render immediately
    pub fn immediate() -> Self {
        Self {
            intake_ms: 0,
            triage_ms: 0,
            guided_entry_ms: 0,
            next_step_ms: 0,
            escalation_text_ms: 0,
            escalation_card_ms: 0,
            resolution_ms: 0,
            summary_ms: 0,
            redirect_ms: 0,
            redirect_resume_ms: 0,
            free_text_reply_ms: 0,
            escalation_request_ms: 0,
        }
    }

    fn entries(&self) -> [(&'static str, u64); 12] {
        [
            ("intake_ms", self.intake_ms),
            ("triage_ms", self.triage_ms),
            ("guided_entry_ms", self.guided_entry_ms),
            ("next_step_ms", self.next_step_ms),
            ("escalation_text_ms", self.escalation_text_ms),
            ("escalation_card_ms", self.escalation_card_ms),
            ("resolution_ms", self.resolution_ms),
            ("summary_ms", self.summary_ms),
            ("redirect_ms", self.redirect_ms),
            ("redirect_resume_ms", self.redirect_resume_ms),
            ("free_text_reply_ms", self.free_text_reply_ms),
            ("escalation_request_ms", self.escalation_request_ms),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.entries() {
            if value > timing::MAX_DELAY_MS {
                return Err(ConfigError::InvalidValue {
                    field: format!("timing.{}", name),
                    message: format!(
                        "Delay too high (maximum {}ms), got {}",
                        timing::MAX_DELAY_MS,
                        value
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Conversation flow policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Escalate straight from triage when every basic step was already tried.
    /// When false, deep steps still run and escalation waits for an empty order.
    #[serde(default = "default_true")]
    pub escalate_when_basics_exhausted: bool,

    /// Broadcast capacity for presentation events per session
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

fn default_event_buffer() -> usize {
    sessions::EVENT_BUFFER
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            escalate_when_basics_exhausted: true,
            event_buffer: default_event_buffer(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    observability::DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: true,
        }
    }
}

/// Load settings from files and environment
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from("config", env)
}

/// Load settings rooted at a specific config directory
pub fn load_settings_from(config_dir: &str, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::with_name(&format!("{}/default", config_dir)).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder
            .add_source(File::with_name(&format!("{}/{}", config_dir, env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix("DIAG_ASSIST")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert!(settings.flow.escalate_when_basics_exhausted);
        assert_eq!(settings.timing.intake_ms, 800);
        assert_eq!(settings.timing.escalation_card_ms, 400);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_timing_validation() {
        let mut settings = Settings::default();
        settings.timing.redirect_ms = 120_000;
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("timing.redirect_ms"));

        settings.timing = TimingConfig::immediate();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_server_validation() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());

        settings.server.port = 9000;
        settings.server.max_sessions = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_strict_environment_requires_cors_origins() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        assert!(settings.validate().is_err());

        settings.server.cors_origins = vec!["https://ops.example.com".to_string()];
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_log_level_validation() {
        let mut settings = Settings::default();
        settings.observability.log_level = "verbose".to_string();
        assert!(settings.validate().is_err());

        settings.observability.log_level = "DEBUG".to_string();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_settings_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "server:\n  port: 9100\ntiming:\n  intake_ms: 5\nflow:\n  escalate_when_basics_exhausted: false\n"
        )
        .unwrap();

        let settings = load_settings_from(dir.path().to_str().unwrap(), None).unwrap();
        assert_eq!(settings.server.port, 9100);
        assert_eq!(settings.timing.intake_ms, 5);
        // untouched fields keep their defaults
        assert_eq!(settings.timing.triage_ms, 1500);
        assert!(!settings.flow.escalate_when_basics_exhausted);
    }

    #[test]
    fn test_missing_config_dir_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path().to_str().unwrap(), Some("staging")).unwrap();
        assert_eq!(settings.catalog_path, catalog::DEFAULT_PATH);
    }
}
