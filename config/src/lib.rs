#[macro_use]
extern crate tracing;

mod args;
mod keys;

pub use args::Args;
use keys::SnakeCaseKeys;
use serde::Deserialize;
use std::{
    fmt,
    net::SocketAddr,
    path::Path,
    time::Duration,
};
use url::Url;

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

const CONFIG_FILE: &str = "config.yaml";

/// One year.
pub const MAX_SESSIONS_CLOSED_MINUTES: u64 = 365 * 24 * 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{0} is a mandatory input")]
    Missing(&'static str),
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("cannot load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// A secret that never shows up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// The merged layers, before validation.
#[derive(Debug, Deserialize)]
struct Layered {
    listen_address: String,
    telemetry_path: String,
    scrape_uri: String,
    skip_verify: bool,
    timeout: u64,
    sessions_closed_minutes: u64,
    #[serde(default)]
    wallix_username: Option<String>,
    #[serde(default)]
    wallix_password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub listen_address: SocketAddr,
    pub telemetry_path: String,
    pub scrape_uri: Url,
    pub skip_verify: bool,
    pub timeout: Duration,
    pub sessions_closed_window: Duration,
    pub wallix_username: String,
    pub wallix_password: Password,
}

impl Config {
    /// Loads the configuration with the following precedence: flag, environment variable, `config.yaml` in
    /// `args.config_dir`, built-in default. The config file is optional; the credentials are not.
    pub fn load(args: Args) -> Result<Self, ConfigError> {
        Self::load_with_env(args, config::Environment::default())
    }

    fn load_with_env(args: Args, environment: config::Environment) -> Result<Self, ConfigError> {
        let file = config_file_in(&args.config_dir);
        debug!(?file, "loading configuration");

        let layered: Layered = config::Config::builder()
            .add_source(SnakeCaseKeys::new(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Yaml,
            )))
            .add_source(SnakeCaseKeys::new(
                config::File::from(file).format(config::FileFormat::Yaml).required(false),
            ))
            .add_source(environment)
            .add_source(args)
            .build()?
            .try_deserialize()?;

        layered.validate()
    }

    /// The configured scrape URI without trailing slash, as the API routes are appended to it.
    pub fn scrape_base(&self) -> &str {
        self.scrape_uri.as_str().trim_end_matches('/')
    }
}

impl Layered {
    fn validate(self) -> Result<Config, ConfigError> {
        let wallix_username = non_empty(self.wallix_username).ok_or(ConfigError::Missing("wallix-username"))?;
        let wallix_password = non_empty(self.wallix_password).ok_or(ConfigError::Missing("wallix-password"))?;

        let listen_address = parse_listen_address(&self.listen_address)?;

        if !self.telemetry_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "telemetry-path",
                reason: format!("{:?} must start with '/'", self.telemetry_path),
            });
        }

        let scrape_uri = Url::parse(&self.scrape_uri).map_err(|e| ConfigError::Invalid {
            key: "scrape-uri",
            reason: format!("{:?}: {e}", self.scrape_uri),
        })?;
        if !matches!(scrape_uri.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: "scrape-uri",
                reason: format!("unsupported scheme {:?}", scrape_uri.scheme()),
            });
        }

        if self.timeout == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout",
                reason: "must be at least one second".to_string(),
            });
        }

        let sessions_closed_window = self
            .sessions_closed_minutes
            .checked_mul(60)
            .filter(|_| self.sessions_closed_minutes <= MAX_SESSIONS_CLOSED_MINUTES)
            .map(Duration::from_secs)
            .ok_or_else(|| ConfigError::Invalid {
                key: "sessions-closed-minutes",
                reason: format!(
                    "{} is more than the {MAX_SESSIONS_CLOSED_MINUTES} minutes allowed",
                    self.sessions_closed_minutes
                ),
            })?;

        Ok(Config {
            listen_address,
            telemetry_path: self.telemetry_path,
            scrape_uri,
            skip_verify: self.skip_verify,
            timeout: Duration::from_secs(self.timeout),
            sessions_closed_window,
            wallix_username,
            wallix_password: Password(wallix_password),
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Accepts `host:port` as well as the `:port` shorthand for all interfaces.
fn parse_listen_address(value: &str) -> Result<SocketAddr, ConfigError> {
    let full = match value.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{port}"),
        None => value.to_string(),
    };
    full.parse().map_err(|e| ConfigError::Invalid {
        key: "listen-address",
        reason: format!("{value:?}: {e}"),
    })
}

/// Location of the optional config file for the given directory.
pub fn config_file_in(dir: impl AsRef<Path>) -> std::path::PathBuf {
    dir.as_ref().join(CONFIG_FILE)
}
