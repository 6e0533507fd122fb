// Configuration module entry point
// Layers the config file and environment over built-in defaults

mod types;

use std::net::SocketAddr;
use url::Url;

pub use types::{AssetsConfig, Config, LoggingConfig, PerformanceConfig, ServerConfig};

/// Prefix for environment overrides, e.g. `DISPATCH_SERVER__PORT=8080`
pub const ENV_PREFIX: &str = "DISPATCH";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// The file is optional; every key has a default.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        Self::load_with_env(config_path, None)
    }

    /// `env` replaces the process environment when given
    fn load_with_env(
        config_path: &str,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, config::ConfigError> {
        Self::builder()?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }

    /// Defaults only
    pub fn defaults() -> Result<Self, config::ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    {
        config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("assets.enabled", true)?
            .set_default("assets.dir", "public")?
            .set_default("assets.max_age", 31_536_000)?
            .set_default("assets.immutable", true)?
            .set_default("assets.index_files", vec!["index.html"])?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "text")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.connection_timeout", 30)
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }

    /// Fixed base request targets are resolved against
    pub fn origin(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("http://localhost:{}", self.server.port))
    }
}
