use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carebook";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Length of one bookable slot, in minutes.
pub const SLOT_MINUTES: u32 = 30;

/// How many appointments the dashboards show as "latest".
pub const LATEST_APPOINTMENTS_LIMIT: usize = 5;

/// Default listen address for the HTTP API.
pub const DEFAULT_ADDR: &str = "127.0.0.1:5000";

/// Default `RUST_LOG` filter when none is set.
pub fn default_log_filter() -> &'static str {
    "carebook=info,carebook_lib=info,tower_http=warn"
}

/// Get the application data directory
/// ~/Carebook/ on all platforms
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

/// Default database file location.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("carebook.db")
}

/// Switches for lifecycle transitions whose intended behavior is a policy call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
    /// Permit marking a cancelled appointment as paid. Off by default.
    pub allow_payment_after_cancel: bool,
}

/// Runtime configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub admin_token: Option<String>,
    pub policy: LifecyclePolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

impl ServiceConfig {
    /// Read `CAREBOOK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (lets tests avoid touching the real env).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let addr_str = lookup("CAREBOOK_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr = addr_str.parse().map_err(|_| ConfigError::Invalid {
            key: "CAREBOOK_ADDR",
            value: addr_str.clone(),
        })?;

        let db_path = lookup("CAREBOOK_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let admin_token = lookup("CAREBOOK_ADMIN_TOKEN").filter(|t| !t.trim().is_empty());

        let allow_payment_after_cancel = match lookup("CAREBOOK_ALLOW_PAYMENT_AFTER_CANCEL") {
            None => false,
            Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid {
                key: "CAREBOOK_ALLOW_PAYMENT_AFTER_CANCEL",
                value: v,
            })?,
        };

        Ok(Self {
            addr,
            db_path,
            admin_token,
            policy: LifecyclePolicy {
                allow_payment_after_cancel,
            },
        })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
