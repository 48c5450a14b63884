use std::fmt;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};
use peacemaker_types::{BridgeError, Result};

/// What a login timeout takes down with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Fail the timed-out login and discard every other pending event.
    #[default]
    AbandonQueue,
    /// Fail only the timed-out login; later events still run.
    AbandonCurrent,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BridgeConfig {
    // Runtime resources
    /// Loader script locator (e.g. "unity/Build/Build.loader.js")
    #[serde(default = "default_loader_url")]
    pub loader_url: String,

    /// Data bundle locator
    #[serde(default = "default_data_url")]
    pub data_url: String,

    /// Framework script locator
    #[serde(default = "default_framework_url")]
    pub framework_url: String,

    /// WebAssembly code locator
    #[serde(default = "default_code_url")]
    pub code_url: String,

    /// Display width (CSS length)
    #[serde(default = "default_width")]
    pub width: String,

    /// Display height (CSS length)
    #[serde(default = "default_height")]
    pub height: String,

    // Bridge behaviour
    /// How long a login may wait for wallet selection, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,

    /// Runtime object that receives every response
    #[serde(default = "default_response_target")]
    pub response_target: String,

    /// Method invoked on `response_target`
    #[serde(default = "default_response_method")]
    pub response_method: String,

    /// Wallets offered when a login request names none
    #[serde(default = "default_wallets")]
    pub default_wallets: Vec<String>,

    /// Capacity of the runtime → bridge mailbox
    #[serde(default = "default_inbox_capacity")]
    pub inbox_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_loader_url() -> String {
    "unity/Build/Build.loader.js".to_string()
}

fn default_data_url() -> String {
    "unity/Build/Build.data".to_string()
}

fn default_framework_url() -> String {
    "unity/Build/Build.framework.js".to_string()
}

fn default_code_url() -> String {
    "unity/Build/Build.wasm".to_string()
}

fn default_width() -> String {
    "800px".to_string()
}

fn default_height() -> String {
    "600px".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_response_target() -> String {
    "SeiSdkManager".to_string()
}

fn default_response_method() -> String {
    "WebResponse".to_string()
}

fn default_wallets() -> Vec<String> {
    vec!["compass".to_string()]
}

fn default_inbox_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            loader_url: default_loader_url(),
            data_url: default_data_url(),
            framework_url: default_framework_url(),
            code_url: default_code_url(),
            width: default_width(),
            height: default_height(),
            timeout_ms: default_timeout_ms(),
            timeout_policy: TimeoutPolicy::default(),
            response_target: default_response_target(),
            response_method: default_response_method(),
            default_wallets: default_wallets(),
            inbox_capacity: default_inbox_capacity(),
            log_level: default_log_level(),
        }
    }
}

impl BridgeConfig {
    /// Load from `PEACEMAKER_*` environment variables.
    /// `PEACEMAKER_DEFAULT_WALLETS` is comma-separated.
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Config::builder()
            .add_source(
                Environment::with_prefix("PEACEMAKER")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("default_wallets"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Install the `fmt` subscriber at `log_level` (`RUST_LOG` still wins).
    pub fn init_tracing(&self) {
        crate::telemetry::init_tracing(&self.log_level);
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(BridgeError::Config("timeout_ms must be greater than zero".into()));
        }
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_level) {
            return Err(BridgeError::Config(format!("log_level {:?}: {}", self.log_level, e)));
        }
        if self.inbox_capacity == 0 {
            return Err(BridgeError::Config("inbox_capacity must be greater than zero".into()));
        }
        let required = [
            ("loader_url", &self.loader_url),
            ("data_url", &self.data_url),
            ("framework_url", &self.framework_url),
            ("code_url", &self.code_url),
            ("response_target", &self.response_target),
            ("response_method", &self.response_method),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(BridgeError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

/// Callback type for runtime error reports.
pub type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Callback type for the runtime's load-complete signal.
pub type LoadCallback = Box<dyn Fn() + Send + Sync>;

/// Optional host callbacks.
#[derive(Default)]
pub struct BridgeCallbacks {
    pub on_error: Option<ErrorCallback>,
    pub on_load: Option<LoadCallback>,
}

impl BridgeCallbacks {
    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_load(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_load = Some(Box::new(f));
        self
    }

    pub(crate) fn runtime_error(&self, message: &str) {
        if let Some(ref handler) = self.on_error {
            handler(message);
        }
    }

    pub(crate) fn runtime_loaded(&self) {
        if let Some(ref handler) = self.on_load {
            handler();
        }
    }
}

impl fmt::Debug for BridgeCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeCallbacks")
            .field("on_error", &self.on_error.is_some())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment is process-wide; keep env tests serial.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.timeout_policy, TimeoutPolicy::AbandonQueue);
        assert_eq!(config.width, "800px");
        assert_eq!(config.height, "600px");
        assert_eq!(config.response_target, "SeiSdkManager");
        assert_eq!(config.response_method, "WebResponse");
        assert_eq!(config.default_wallets, vec!["compass"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = BridgeConfig::from_json(
            r#"{"timeout_ms": 5000, "timeout_policy": "abandon_current", "width": "100%"}"#,
        )
        .unwrap();
        assert_eq!(config.timeout_ms, 5_000);
        assert_eq!(config.timeout_policy, TimeoutPolicy::AbandonCurrent);
        assert_eq!(config.width, "100%");
        assert_eq!(config.height, "600px");
        assert_eq!(config.code_url, "unity/Build/Build.wasm");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let err = BridgeConfig::from_json(r#"{"timeout_ms": 0}"#).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration: timeout_ms must be greater than zero");

        let config = BridgeConfig { response_target: " ".into(), ..Default::default() };
        assert!(config.validate().is_err());

        let config = BridgeConfig { inbox_capacity: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_drives_tracing() {
        let config = BridgeConfig { log_level: "peacemaker_bridge=verbose".into(), ..Default::default() };
        assert!(matches!(config.validate(), Err(BridgeError::Config(_))));

        let config = BridgeConfig::from_json(r#"{"log_level": "peacemaker_bridge=debug,warn"}"#).unwrap();
        config.init_tracing();
        // A second install is a no-op.
        config.init_tracing();
    }

    #[test]
    fn test_from_env() {
        let _lock = TEST_LOCK.lock().unwrap();

        std::env::set_var("PEACEMAKER_TIMEOUT_MS", "1500");
        std::env::set_var("PEACEMAKER_DEFAULT_WALLETS", "compass,keplr");
        std::env::set_var("PEACEMAKER_RESPONSE_TARGET", "WalletBridge");

        let config = BridgeConfig::from_env().unwrap();
        assert_eq!(config.timeout_ms, 1_500);
        assert_eq!(config.default_wallets, vec!["compass", "keplr"]);
        assert_eq!(config.response_target, "WalletBridge");
        assert_eq!(config.response_method, "WebResponse");

        std::env::remove_var("PEACEMAKER_TIMEOUT_MS");
        std::env::remove_var("PEACEMAKER_DEFAULT_WALLETS");
        std::env::remove_var("PEACEMAKER_RESPONSE_TARGET");
    }

    #[test]
    fn test_callbacks_fire() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let errors = seen.clone();
        let callbacks = BridgeCallbacks::default()
            .on_error(move |msg| errors.lock().unwrap().push(msg.to_string()));

        callbacks.runtime_error("out of memory");
        callbacks.runtime_loaded();
        assert_eq!(*seen.lock().unwrap(), vec!["out of memory"]);
    }
}
