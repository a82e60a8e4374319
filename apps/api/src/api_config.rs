use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use jitgate_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_KUBE_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub kube_api_url: String,
    pub kube_token: Option<String>,
    pub kube_token_file: PathBuf,
    pub kube_accept_invalid_certs: bool,
    pub kube_timeout: Duration,
    pub config_name: String,
    pub config_cache_path: PathBuf,
    pub config_refresh_interval: Duration,
    pub jira_base_url: String,
    pub jira_username: String,
    pub jira_api_token: String,
    pub jira_timeout: Duration,
    pub allow_self_approve: bool,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_owned());
        let api_port = parse_env_u16("API_PORT", 9443)?;

        let kube_api_url = env::var("KUBE_API_URL")
            .unwrap_or_else(|_| "https://kubernetes.default.svc".to_owned());
        let kube_token = env::var("KUBE_TOKEN")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());
        let kube_token_file = PathBuf::from(
            env::var("KUBE_TOKEN_FILE").unwrap_or_else(|_| DEFAULT_KUBE_TOKEN_FILE.to_owned()),
        );
        let kube_accept_invalid_certs = env::var("KUBE_ACCEPT_INVALID_CERTS")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");
        let kube_timeout = Duration::from_secs(parse_env_u64("KUBE_TIMEOUT_SECONDS", 30)?);

        let config_name =
            env::var("JIT_CONFIG_NAME").unwrap_or_else(|_| "jitgate-config".to_owned());
        let config_cache_path = PathBuf::from(
            env::var("JIT_CONFIG_CACHE_PATH")
                .unwrap_or_else(|_| "/tmp/jitgate/config.json".to_owned()),
        );
        let config_refresh_interval_ms = parse_env_u64("CONFIG_REFRESH_INTERVAL_MS", 30_000)?;
        if config_refresh_interval_ms == 0 {
            return Err(AppError::Validation(
                "CONFIG_REFRESH_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        let jira_base_url = required_non_empty_env("JIRA_BASE_URL")?;
        let jira_username = required_non_empty_env("JIRA_USERNAME")?;
        let jira_api_token = required_non_empty_env("JIRA_API_TOKEN")?;
        let jira_timeout = Duration::from_secs(parse_env_u64("JIRA_TIMEOUT_SECONDS", 15)?);

        let allow_self_approve = env::var("JIT_ALLOW_SELF_APPROVE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        Ok(Self {
            api_host,
            api_port,
            kube_api_url,
            kube_token,
            kube_token_file,
            kube_accept_invalid_certs,
            kube_timeout,
            config_name,
            config_cache_path,
            config_refresh_interval: Duration::from_millis(config_refresh_interval_ms),
            jira_base_url,
            jira_username,
            jira_api_token,
            jira_timeout,
            allow_self_approve,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Validation(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    /// Returns the inline token, or reads the mounted service-account token.
    pub async fn resolve_kube_token(&self) -> AppResult<String> {
        if let Some(token) = self.kube_token.as_ref() {
            return Ok(token.clone());
        }

        let token = tokio::fs::read_to_string(&self.kube_token_file)
            .await
            .map_err(|error| {
                AppError::Configuration(format!(
                    "failed to read Kubernetes token from '{}': {error}",
                    self.kube_token_file.display()
                ))
            })?;
        Ok(token.trim().to_owned())
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parse_env_u16(name: &str, default: u16) -> AppResult<u16> {
    match env::var(name) {
        Ok(value) => value.parse::<u16>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
