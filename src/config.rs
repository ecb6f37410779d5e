use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::{env, fs, path::Path};
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Image reference (registry/repo:tag) that this host deploys.
    pub image: String,
    /// Running containers whose name starts with this prefix are considered
    /// candidates for the active instance.
    #[serde(default = "default_container_name_prefix")]
    pub container_name_prefix: String,
    pub env_file: EnvFile,
    pub switch: Switch,
    #[serde(default)]
    pub connectivity: Connectivity,
    pub webserver: Webserver,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvFile {
    pub path: PathBuf,
    #[serde(default = "default_env_file_key")]
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Switch {
    /// Shell command that performs the actual cutover. It re-reads the env
    /// file to learn the new image reference; no arguments are passed.
    pub command: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connectivity {
    #[serde(default = "default_probe_url")]
    pub probe_url: String,
    #[serde(default = "default_probe_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_probe_attempts")]
    pub attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Webserver {
    pub port: u16,
}

impl Default for Connectivity {
    fn default() -> Self {
        Connectivity {
            probe_url: default_probe_url(),
            timeout_seconds: default_probe_timeout_seconds(),
            attempts: default_probe_attempts(),
        }
    }
}

fn default_container_name_prefix() -> String {
    "app_".to_string()
}

fn default_env_file_key() -> String {
    "IMAGE_NAME".to_string()
}

fn default_probe_url() -> String {
    // Cloudflare DNS over HTTP, answers fast from anywhere
    "http://1.1.1.1".to_string()
}

fn default_probe_timeout_seconds() -> u64 {
    2
}

fn default_probe_attempts() -> u32 {
    1
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    info!("Loading config from file {}", path.as_ref().display());
    let yaml_str = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

    let expanded = expand_env_vars(&yaml_str)?;

    let config = serde_yaml_ng::from_str(&expanded)
        .context("Failed to parse YAML config after environment variable expansion")?;

    Ok(config)
}

/// Replaces `${VAR}` placeholders with environment variables values.
/// Returns an error if any env var is missing or regex fails.
fn expand_env_vars(input: &str) -> Result<String> {
    let re =
        Regex::new(r"\$\{([^}]+)}").context("Invalid regex pattern for env var substitution")?;

    let result = re.replace_all(input, |caps: &regex::Captures| {
        let var_name = &caps[1];
        env::var(var_name).unwrap_or_else(|_| panic!("Missing environment variable: {}", var_name))
    });

    Ok(result.into_owned())
}
