use std::env;
use std::path::PathBuf;
use std::time::Duration;

use jitgate_core::{AppError, AppResult};
use tracing_subscriber::EnvFilter;

const DEFAULT_KUBE_API_URL: &str = "https://kubernetes.default.svc";
const DEFAULT_KUBE_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub kube_api_url: String,
    pub kube_token: TokenSource,
    pub kube_accept_invalid_certs: bool,
    pub kube_timeout: Duration,
    pub request_namespace: String,
    pub operator_namespace: String,
    pub config_name: String,
    pub config_cache_path: PathBuf,
    pub jira_base_url: String,
    pub jira_username: String,
    pub jira_api_token: String,
    pub jira_timeout: Duration,
    pub webhooks_enabled: bool,
    pub poll_interval: Duration,
    pub max_concurrent_reconciles: usize,
    pub error_backoff: Duration,
    pub status_update_max_attempts: u32,
    pub status_update_backoff: Duration,
}

/// Where the cluster bearer token comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Inline(String),
    File(PathBuf),
}

impl TokenSource {
    pub async fn resolve(&self) -> AppResult<String> {
        match self {
            Self::Inline(token) => Ok(token.clone()),
            Self::File(path) => {
                let token = tokio::fs::read_to_string(path).await.map_err(|error| {
                    AppError::Configuration(format!(
                        "failed to read Kubernetes token from '{}': {error}",
                        path.display()
                    ))
                })?;
                Ok(token.trim().to_owned())
            }
        }
    }
}

impl WorkerConfig {
    pub fn load() -> AppResult<Self> {
        let kube_api_url =
            env::var("KUBE_API_URL").unwrap_or_else(|_| DEFAULT_KUBE_API_URL.to_owned());
        let kube_token = match optional_env("KUBE_TOKEN") {
            Some(token) => TokenSource::Inline(token),
            None => TokenSource::File(PathBuf::from(
                optional_env("KUBE_TOKEN_FILE")
                    .unwrap_or_else(|| DEFAULT_KUBE_TOKEN_FILE.to_owned()),
            )),
        };
        let kube_accept_invalid_certs = parse_env_bool("KUBE_ACCEPT_INVALID_CERTS", false)?;
        let kube_timeout_seconds = parse_env_u64("KUBE_TIMEOUT_SECONDS", 30)?;
        let request_namespace =
            optional_env("JIT_NAMESPACE").unwrap_or_else(|| "default".to_owned());
        let operator_namespace =
            optional_env("OPERATOR_NAMESPACE").unwrap_or_else(|| request_namespace.clone());
        let config_name =
            optional_env("JIT_CONFIG_NAME").unwrap_or_else(|| "jitgate-config".to_owned());
        let config_cache_path = PathBuf::from(
            optional_env("JIT_CONFIG_CACHE_PATH")
                .unwrap_or_else(|| "/tmp/jitgate/config.json".to_owned()),
        );

        let jira_base_url = required_env("JIRA_BASE_URL")?;
        let jira_username = required_env("JIRA_USERNAME")?;
        let jira_api_token = required_env("JIRA_API_TOKEN")?;
        let jira_timeout_seconds = parse_env_u64("JIRA_TIMEOUT_SECONDS", 15)?;

        let webhooks_enabled = parse_env_bool("ENABLE_WEBHOOKS", false)?;
        let poll_interval_ms = parse_env_u64("WORKER_POLL_INTERVAL_MS", 5000)?;
        let max_concurrent_reconciles = parse_env_usize("WORKER_MAX_CONCURRENT_RECONCILES", 4)?;
        let error_backoff_ms = parse_env_u64("WORKER_ERROR_BACKOFF_MS", 10_000)?;
        let status_update_max_attempts = parse_env_u32("STATUS_UPDATE_MAX_ATTEMPTS", 3)?;
        let status_update_backoff_ms = parse_env_u64("STATUS_UPDATE_BACKOFF_MS", 2000)?;

        if poll_interval_ms == 0 {
            return Err(AppError::Validation(
                "WORKER_POLL_INTERVAL_MS must be greater than zero".to_owned(),
            ));
        }

        if max_concurrent_reconciles == 0 {
            return Err(AppError::Validation(
                "WORKER_MAX_CONCURRENT_RECONCILES must be greater than zero".to_owned(),
            ));
        }

        if status_update_max_attempts == 0 {
            return Err(AppError::Validation(
                "STATUS_UPDATE_MAX_ATTEMPTS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            kube_api_url,
            kube_token,
            kube_accept_invalid_certs,
            kube_timeout: Duration::from_secs(kube_timeout_seconds),
            request_namespace,
            operator_namespace,
            config_name,
            config_cache_path,
            jira_base_url,
            jira_username,
            jira_api_token,
            jira_timeout: Duration::from_secs(jira_timeout_seconds),
            webhooks_enabled,
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_concurrent_reconciles,
            error_backoff: Duration::from_millis(error_backoff_ms),
            status_update_max_attempts,
            status_update_backoff: Duration::from_millis(status_update_backoff_ms),
        })
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

fn required_env(name: &str) -> AppResult<String> {
    let value = env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(name, value.as_str()),
        Err(_) => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        _ => Err(AppError::Validation(format!(
            "invalid {name} value '{value}': expected true or false"
        ))),
    }
}

fn parse_env_usize(name: &str, default: usize) -> AppResult<usize> {
    match env::var(name) {
        Ok(value) => value.parse::<usize>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(matches!(parse_bool("ENABLE_WEBHOOKS", "TRUE"), Ok(true)));
        assert!(matches!(parse_bool("ENABLE_WEBHOOKS", " 1 "), Ok(true)));
        assert!(matches!(parse_bool("ENABLE_WEBHOOKS", "no"), Ok(false)));
    }

    #[test]
    fn malformed_flag_names_the_variable() {
        let error = parse_bool("ENABLE_WEBHOOKS", "maybe").err();
        assert_eq!(
            error.map(|error| error.to_string()),
            Some(
                "validation error: invalid ENABLE_WEBHOOKS value 'maybe': expected true or false"
                    .to_owned()
            )
        );
    }

    #[tokio::test]
    async fn inline_token_is_used_verbatim() {
        let source = TokenSource::Inline("abc".to_owned());
        assert_eq!(source.resolve().await.ok(), Some("abc".to_owned()));
    }

    #[tokio::test]
    async fn missing_token_file_is_a_configuration_error() {
        let source = TokenSource::File(PathBuf::from("/nonexistent/jitgate/token"));
        assert!(matches!(
            source.resolve().await,
            Err(AppError::Configuration(_))
        ));
    }
}
