//! Process configuration, read from flags or `BRIGADE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use brigade_auth::ValidatorConfig;
use brigade_auth::validator::DEFAULT_AUTHORITY;
use brigade_core::UserId;
use brigade_observability::LogFormat;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BRIGADE_AUTH_TENANT_ID is required unless BRIGADE_AUTH_DEV_BYPASS=true")]
    MissingTenant,

    #[error("invalid reviewer id '{0}'")]
    InvalidReviewer(String),

    #[error("unknown log format '{0}' (expected json or pretty)")]
    InvalidLogFormat(String),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "brigade-api", version, about = "Brigade coordination HTTP API")]
pub struct Cli {
    /// Listen address.
    #[arg(long, env = "BRIGADE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Skip token validation; every request is the mock developer identity.
    #[arg(long, env = "BRIGADE_AUTH_DEV_BYPASS")]
    pub auth_dev_bypass: bool,

    /// Directory tenant whose tokens are accepted.
    #[arg(long, env = "BRIGADE_AUTH_TENANT_ID")]
    pub auth_tenant_id: Option<String>,

    /// Client id of this API; tokens must carry it (or api://<id>) as audience.
    #[arg(long, env = "BRIGADE_AUTH_CLIENT_ID")]
    pub auth_client_id: Option<String>,

    #[arg(long, env = "BRIGADE_AUTH_AUTHORITY", default_value = DEFAULT_AUTHORITY)]
    pub auth_authority: String,

    /// Override for the signing key set URL.
    #[arg(long, env = "BRIGADE_AUTH_JWKS_URI")]
    pub auth_jwks_uri: Option<String>,

    /// Postgres URL. Without it rows live in memory.
    #[arg(long, env = "BRIGADE_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Web PubSub connection string. Without it live updates stay in-process.
    #[arg(long, env = "BRIGADE_PUBSUB_CONNECTION")]
    pub pubsub_connection: Option<String>,

    #[arg(long, env = "BRIGADE_PUBSUB_HUB", default_value = "brigades")]
    pub pubsub_hub: String,

    /// User ids allowed to review verification requests.
    #[arg(long, env = "BRIGADE_REVIEWERS", value_delimiter = ',')]
    pub reviewers: Vec<String>,

    /// JSON file of brigades imported (unclaimed) at startup.
    #[arg(long, env = "BRIGADE_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    #[arg(long, env = "BRIGADE_LOG_FORMAT", default_value = "json")]
    pub log_format: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub dev_bypass: bool,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub authority: String,
    pub jwks_uri: Option<String>,
}

impl AuthSettings {
    /// Validator settings, or `None` in bypass mode.
    pub fn validator_config(&self) -> Option<ValidatorConfig> {
        if self.dev_bypass {
            return None;
        }
        let tenant = self.tenant_id.as_deref()?;
        Some(ValidatorConfig::for_tenant(&self.authority, tenant, self.client_id.clone()))
    }

    pub fn jwks_uri(&self) -> Option<String> {
        if let Some(uri) = &self.jwks_uri {
            return Some(uri.clone());
        }
        let tenant = self.tenant_id.as_deref()?;
        Some(ValidatorConfig::jwks_uri(&self.authority, tenant))
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub auth: AuthSettings,
    pub database_url: Option<String>,
    pub pubsub_connection: Option<String>,
    pub pubsub_hub: String,
    pub reviewers: Vec<UserId>,
    pub seed_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl AppConfig {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let reviewers = cli
            .reviewers
            .iter()
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(|r| r.parse::<UserId>().map_err(|_| ConfigError::InvalidReviewer(r.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        let log_format =
            LogFormat::parse(&cli.log_format).ok_or_else(|| ConfigError::InvalidLogFormat(cli.log_format.clone()))?;

        let config = Self {
            bind: cli.bind,
            auth: AuthSettings {
                dev_bypass: cli.auth_dev_bypass,
                tenant_id: non_blank(cli.auth_tenant_id),
                client_id: non_blank(cli.auth_client_id),
                authority: cli.auth_authority.trim().trim_end_matches('/').to_string(),
                jwks_uri: non_blank(cli.auth_jwks_uri),
            },
            database_url: non_blank(cli.database_url),
            pubsub_connection: non_blank(cli.pubsub_connection),
            pubsub_hub: cli.pubsub_hub,
            reviewers,
            seed_file: cli.seed_file,
            log_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth.dev_bypass && self.auth.tenant_id.is_none() {
            return Err(ConfigError::MissingTenant);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<AppConfig, ConfigError> {
        let mut argv = vec!["brigade-api"];
        argv.extend_from_slice(args);
        AppConfig::from_cli(Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn tenant_is_required_without_bypass() {
        assert_eq!(parse(&[]).unwrap_err(), ConfigError::MissingTenant);
        assert_eq!(parse(&["--auth-tenant-id", "  "]).unwrap_err(), ConfigError::MissingTenant);
    }

    #[test]
    fn bypass_needs_no_tenant() {
        let cfg = parse(&["--auth-dev-bypass"]).unwrap();
        assert!(cfg.auth.dev_bypass);
        assert!(cfg.auth.validator_config().is_none());
    }

    #[test]
    fn derives_issuer_and_key_set_from_tenant() {
        let cfg = parse(&["--auth-tenant-id", "tid1", "--auth-client-id", "api-1"]).unwrap();
        let v = cfg.auth.validator_config().unwrap();
        assert_eq!(v.issuer, "https://login.microsoftonline.com/tid1/v2.0");
        assert_eq!(v.client_id.as_deref(), Some("api-1"));
        assert_eq!(
            cfg.auth.jwks_uri().as_deref(),
            Some("https://login.microsoftonline.com/tid1/discovery/v2.0/keys")
        );
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.pubsub_hub, "brigades");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn explicit_key_set_uri_wins() {
        let cfg = parse(&["--auth-tenant-id", "t", "--auth-jwks-uri", "http://localhost/keys"]).unwrap();
        assert_eq!(cfg.auth.jwks_uri().as_deref(), Some("http://localhost/keys"));
    }

    #[test]
    fn reviewers_are_comma_separated_user_ids() {
        let cfg = parse(&["--auth-dev-bypass", "--reviewers", "a.t1, b.t2,"]).unwrap();
        let ids: Vec<&str> = cfg.reviewers.iter().map(UserId::as_str).collect();
        assert_eq!(ids, ["a.t1", "b.t2"]);
    }

    #[test]
    fn rejects_unknown_log_format() {
        assert_eq!(
            parse(&["--auth-dev-bypass", "--log-format", "xml"]).unwrap_err(),
            ConfigError::InvalidLogFormat("xml".into())
        );
    }
}
