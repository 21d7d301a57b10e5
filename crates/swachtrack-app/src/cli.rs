//! CLI argument definitions for the SwachTrack server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use swachtrack_core::config::SwachConfig;

pub const ENV_CONFIG_PATH: &str = "SWACHTRACK_CONFIG";

/// SwachTrack - civic issue classification and reporting API.
#[derive(Parser, Debug)]
#[command(name = "swachtrack", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Address to bind.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > SWACHTRACK_CONFIG env var > ~/.swachtrack/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply flags on top of an already env-overridden config.
    pub fn apply_to(&self, config: &mut SwachConfig) {
        if let Some(port) = self.port {
            config.general.port = port;
        }
        if let Some(ref host) = self.host {
            config.general.host = host.clone();
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".swachtrack").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".swachtrack").join("config.toml");
    }
    PathBuf::from("config.toml")
}
