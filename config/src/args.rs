use clap::Parser;
use std::{
    collections::HashMap,
    path::PathBuf,
};

/// Prometheus exporter for the Wallix Bastion API.
///
/// Every option can also be given as an upper-case environment variable (`WALLIX_USERNAME`, `SCRAPE_URI`, ...) or
/// in `config.yaml`. Flags win over the environment, which wins over the file.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory that may contain a `config.yaml`.
    #[arg(long, default_value = ".")]
    pub config_dir: PathBuf,

    /// Address to listen on for web interface and telemetry [default: :9191]
    #[arg(long)]
    pub listen_address: Option<String>,

    /// Path under which to expose metrics [default: /metrics]
    #[arg(long)]
    pub telemetry_path: Option<String>,

    /// URI on which to scrape Wallix Bastion API [default: https://127.0.0.1/api]
    #[arg(short = 'w', long)]
    pub scrape_uri: Option<String>,

    /// Disable TLS certificate verification for the scrape URI
    #[arg(short, long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub skip_verify: Option<bool>,

    /// Timeout in seconds for requests to Wallix Bastion API [default: 10]
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Trailing window in minutes used to count closed sessions [default: 5]
    #[arg(long)]
    pub sessions_closed_minutes: Option<u64>,

    /// The username used for authentication to request Wallix Bastion API
    #[arg(short = 'u', long)]
    pub wallix_username: Option<String>,

    /// The password used for authentication to request Wallix Bastion API
    #[arg(short = 'p', long)]
    pub wallix_password: Option<String>,
}

impl config::Source for Args {
    fn clone_into_box(&self) -> Box<dyn config::Source + Send + Sync> {
        Box::new((*self).clone())
    }

    /// Only the flags given on the command line, so that unset flags do not shadow lower layers.
    fn collect(&self) -> Result<config::Map<String, config::Value>, config::ConfigError> {
        let mut cache = HashMap::<String, config::Value>::new();
        if let Some(value) = &self.listen_address {
            cache.insert("listen_address".to_string(), value.clone().into());
        }
        if let Some(value) = &self.telemetry_path {
            cache.insert("telemetry_path".to_string(), value.clone().into());
        }
        if let Some(value) = &self.scrape_uri {
            cache.insert("scrape_uri".to_string(), value.clone().into());
        }
        if let Some(value) = self.skip_verify {
            cache.insert("skip_verify".to_string(), value.into());
        }
        if let Some(value) = self.timeout {
            cache.insert("timeout".to_string(), value.into());
        }
        if let Some(value) = self.sessions_closed_minutes {
            cache.insert("sessions_closed_minutes".to_string(), value.into());
        }
        if let Some(value) = &self.wallix_username {
            cache.insert("wallix_username".to_string(), value.clone().into());
        }
        if let Some(value) = &self.wallix_password {
            cache.insert("wallix_password".to_string(), value.clone().into());
        }
        Ok(cache)
    }
}
