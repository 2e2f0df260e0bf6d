use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Protocol constants: shared by the gateway and every display client
pub const PROTOCOL_VERSION: u32 = 1;
pub const DEFAULT_PORT: u16 = 18790;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB hard cap per frame
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000; // close if client doesn't connect in 10s
pub const HEARTBEAT_INTERVAL_SECS: u64 = 1; // clock tick cadence for stage displays
pub const CLIENT_QUEUE_CAPACITY: usize = 64; // per-connection outbound queue

/// Top-level config (wishwall.toml + WISHWALL_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WishwallConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub stage: StageConfig,
    #[serde(default)]
    pub spotlight: SpotlightConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Shared-password gate for the admin view.
///
/// The password is compared as-is. This is an access deterrent for a live
/// event, not an account system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_password")]
    pub password: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            password: default_admin_password(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Stage display tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Seconds between automatic hero rotations.
    #[serde(default = "default_rotate_secs")]
    pub rotate_secs: u64,
    /// Only the newest `hero_cap` records take part in the rotation.
    #[serde(default = "default_hero_cap")]
    pub hero_cap: usize,
    /// Entries in the side list next to the hero.
    #[serde(default = "default_side_max")]
    pub side_max: usize,
    /// Entries in the scrolling ticker.
    #[serde(default = "default_ticker_max")]
    pub ticker_max: usize,
    /// Hero text is trimmed to one line of at most this many chars.
    #[serde(default = "default_hero_max_len")]
    pub hero_max_len: usize,
    /// When false (default) the stage only ever sees names, never wish text.
    #[serde(default)]
    pub show_wishes: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            rotate_secs: default_rotate_secs(),
            hero_cap: default_hero_cap(),
            side_max: default_side_max(),
            ticker_max: default_ticker_max(),
            hero_max_len: default_hero_max_len(),
            show_wishes: false,
        }
    }
}

/// Spotlight takeover settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotlightConfig {
    /// Default takeover length when the admin does not pass one.
    #[serde(default = "default_spotlight_secs")]
    pub duration_secs: u64,
    /// Default takeover message.
    #[serde(default = "default_spotlight_message")]
    pub message: String,
    /// Length of the `exiting` phase before the overlay is cleared.
    #[serde(default = "default_exit_ms")]
    pub exit_ms: u64,
    /// Countdown recompute cadence.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Disable to run on the persisted fallback only (no live push).
    #[serde(default = "bool_true")]
    pub live_enabled: bool,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_spotlight_secs(),
            message: default_spotlight_message(),
            exit_ms: default_exit_ms(),
            tick_ms: default_tick_ms(),
            live_enabled: true,
        }
    }
}

fn bool_true() -> bool {
    true
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_admin_password() -> String {
    "change-me".to_string()
}
fn default_rotate_secs() -> u64 {
    9
}
fn default_hero_cap() -> usize {
    10
}
fn default_side_max() -> usize {
    14
}
fn default_ticker_max() -> usize {
    30
}
fn default_hero_max_len() -> usize {
    160
}
fn default_spotlight_secs() -> u64 {
    120
}
fn default_spotlight_message() -> String {
    "WISH WALL".to_string()
}
fn default_exit_ms() -> u64 {
    480
}
fn default_tick_ms() -> u64 {
    200
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.wishwall/wishwall.db", home)
}

impl WishwallConfig {
    /// Load config from a TOML file with WISHWALL_* env var overrides.
    ///
    /// Path resolution: explicit argument, then `~/.wishwall/wishwall.toml`.
    /// Nested keys use a double underscore, e.g. `WISHWALL_STAGE__ROTATE_SECS=5`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: WishwallConfig = Figment::from(Serialized::defaults(WishwallConfig::default()))
            .merge(Toml::file(&path))
            .merge(Env::prefixed("WISHWALL_").split("__"))
            .extract()
            .map_err(|e| crate::error::WishwallError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.wishwall/wishwall.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_stage_screen() {
        let cfg = WishwallConfig::default();
        assert_eq!(cfg.stage.rotate_secs, 9);
        assert_eq!(cfg.stage.hero_cap, 10);
        assert_eq!(cfg.stage.side_max, 14);
        assert_eq!(cfg.spotlight.duration_secs, 120);
        assert_eq!(cfg.spotlight.tick_ms, 200);
        assert!(cfg.spotlight.live_enabled);
        assert!(!cfg.stage.show_wishes);
    }

    #[test]
    fn toml_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "wishwall.toml",
                r#"
                [admin]
                password = "from-file"

                [stage]
                hero_cap = 5
                "#,
            )?;
            jail.set_env("WISHWALL_STAGE__ROTATE_SECS", "3");

            let cfg = WishwallConfig::load(Some("wishwall.toml")).expect("load");
            assert_eq!(cfg.admin.password, "from-file");
            assert_eq!(cfg.stage.hero_cap, 5);
            assert_eq!(cfg.stage.rotate_secs, 3);
            // untouched sections keep their defaults
            assert_eq!(cfg.gateway.port, DEFAULT_PORT);
            Ok(())
        });
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let cfg = WishwallConfig::load(Some("nope.toml")).expect("load");
            assert_eq!(cfg.admin.password, "change-me");
            Ok(())
        });
    }
}
