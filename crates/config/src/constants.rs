//! Centralized constants for the diagnostic assistant
//!
//! Default values shared by settings, the orchestrator and the server.

/// Composing delays before each assistant output (milliseconds)
pub mod timing {
    pub const INTAKE_MS: u64 = 800;
    pub const TRIAGE_MS: u64 = 1500;
    pub const GUIDED_ENTRY_MS: u64 = 1500;
    pub const NEXT_STEP_MS: u64 = 1500;
    pub const ESCALATION_TEXT_MS: u64 = 1500;
    /// Shown without a typing indicator
    pub const ESCALATION_CARD_MS: u64 = 400;
    pub const RESOLUTION_MS: u64 = 1000;
    /// Shown without a typing indicator
    pub const SUMMARY_MS: u64 = 500;
    pub const REDIRECT_MS: u64 = 1200;
    pub const REDIRECT_RESUME_MS: u64 = 1200;
    pub const FREE_TEXT_REPLY_MS: u64 = 1200;
    pub const ESCALATION_REQUEST_MS: u64 = 1000;

    /// Upper bound accepted by settings validation
    pub const MAX_DELAY_MS: u64 = 60_000;
}

/// Session registry limits
pub mod sessions {
    pub const MAX_SESSIONS: usize = 1000;
    pub const IDLE_TIMEOUT_SECS: u64 = 1800;
    pub const CLEANUP_INTERVAL_SECS: u64 = 60;
    /// Broadcast capacity for presentation events per session
    pub const EVENT_BUFFER: usize = 256;
}

pub mod endpoints {
    pub const DEFAULT_HOST: &str = "0.0.0.0";
    pub const DEFAULT_PORT: u16 = 8080;
}

pub mod catalog {
    /// Reference catalog shipped with the repository
    pub const DEFAULT_PATH: &str = "config/catalogs/rtv_xg850_overheating.yaml";
}

pub mod observability {
    pub const DEFAULT_LOG_LEVEL: &str = "info";
    pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
}
