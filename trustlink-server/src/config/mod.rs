//! Server configuration module

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cli::CliArgs;

/// A service the server process can host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Profile,
    Feed,
    Connections,
    Notifications,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Profile,
        Service::Feed,
        Service::Connections,
        Service::Notifications,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Profile => "profile",
            Service::Feed => "feed",
            Service::Connections => "connections",
            Service::Notifications => "notifications",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "profile" => Ok(Service::Profile),
            "feed" => Ok(Service::Feed),
            "connections" => Ok(Service::Connections),
            "notifications" => Ok(Service::Notifications),
            other => Err(anyhow!("Unknown service: {}", other)),
        }
    }
}

/// Parse a comma separated service list, ignoring duplicates.
pub fn parse_services(list: &str) -> Result<Vec<Service>> {
    let mut services = Vec::new();
    for name in list.split(',').filter(|s| !s.trim().is_empty()) {
        let service: Service = name.parse()?;
        if !services.contains(&service) {
            services.push(service);
        }
    }
    if services.is_empty() {
        return Err(anyhow!("At least one service must be enabled"));
    }
    Ok(services)
}

/// Upstream locations the gateway proxies to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub profile_url: String,
    pub feed_url: String,
    pub connections_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            profile_url: "http://localhost:8081".to_string(),
            feed_url: "http://localhost:8082".to_string(),
            connections_url: "http://localhost:8083".to_string(),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Deployment environment; `prod` switches logs to JSON
    pub env: String,

    /// Services hosted by this process
    pub services: Vec<Service>,

    /// Trustlink configuration file
    pub config_file: Option<PathBuf>,

    /// Maximum request body size in bytes
    pub max_request_size: usize,

    /// Deadline for a whole request, including storage and bus calls
    pub request_timeout: Duration,

    /// Overrides `connections.enforce_recipient` from the Trustlink config
    pub enforce_recipient: Option<bool>,

    /// Overrides the configured log level
    pub log_level: Option<String>,

    /// Gateway upstreams
    pub gateway: GatewayConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            env: "dev".to_string(),
            services: Service::ALL.to_vec(),
            config_file: None,
            max_request_size: 1024 * 1024,
            request_timeout: Duration::from_secs(60),
            enforce_recipient: None,
            log_level: None,
            gateway: GatewayConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create configuration from CLI arguments and environment variables.
    /// CLI arguments take precedence over environment variables.
    pub fn from_cli_and_env(cli_args: CliArgs) -> Result<Self> {
        Self::resolve(cli_args, |key| env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_cli_and_env`] with a custom variable lookup.
    pub fn resolve<F>(cli_args: CliArgs, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());
        let mut config = Self::default();

        if let Some(port) = cli_args.port {
            config.port = port;
        } else if let Some(port) = var("PORT") {
            config.port = port
                .parse()
                .map_err(|e| anyhow!("Invalid PORT '{}': {}", port, e))?;
        }

        if let Some(env_name) = cli_args.env {
            config.env = env_name;
        } else if let Some(env_name) = var("ENV") {
            config.env = env_name;
        }

        if let Some(services) = cli_args.services {
            config.services = parse_services(&services)?;
        } else if let Some(services) = var("TRUSTLINK_SERVICES") {
            config.services = parse_services(&services)?;
        }

        if let Some(config_file) = cli_args.config_file {
            config.config_file = Some(config_file);
        } else if let Some(config_file) = var("TRUSTLINK_CONFIG_FILE") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if let Some(size) = cli_args.max_request_size {
            config.max_request_size = size;
        } else if let Some(size) = var("MAX_REQUEST_SIZE") {
            config.max_request_size = size.parse()?;
        }

        if let Some(secs) = cli_args.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        } else if let Some(secs) = var("REQUEST_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs.parse()?);
        }

        if let Some(enforce) = cli_args.enforce_recipient {
            config.enforce_recipient = Some(enforce);
        } else if let Some(enforce) = var("ENFORCE_RECIPIENT") {
            config.enforce_recipient = Some(enforce.parse()?);
        }

        config.log_level = cli_args.log_level;

        if let Some(url) = cli_args.profile_url.or_else(|| var("PROFILE_SERVICE_URL")) {
            config.gateway.profile_url = url;
        }
        if let Some(url) = cli_args.feed_url.or_else(|| var("FEED_SERVICE_URL")) {
            config.gateway.feed_url = url;
        }
        if let Some(url) = cli_args
            .connections_url
            .or_else(|| var("CONNECTIONS_SERVICE_URL"))
        {
            config.gateway.connections_url = url;
        }

        Ok(config)
    }

    /// Whether this process hosts `service`
    pub fn hosts(&self, service: Service) -> bool {
        self.services.contains(&service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve(CliArgs::default(), lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.env, "dev");
        assert_eq!(config.services, Service::ALL.to_vec());
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.gateway.connections_url, "http://localhost:8083");
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = ServerConfig::resolve(
            CliArgs::default(),
            lookup(&[
                ("PORT", "8083"),
                ("ENV", "prod"),
                ("TRUSTLINK_SERVICES", "connections, notifications"),
                ("FEED_SERVICE_URL", "http://feed:8082"),
                ("ENFORCE_RECIPIENT", "false"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 8083);
        assert_eq!(config.env, "prod");
        assert_eq!(
            config.services,
            vec![Service::Connections, Service::Notifications]
        );
        assert!(config.hosts(Service::Connections));
        assert!(!config.hosts(Service::Feed));
        assert_eq!(config.gateway.feed_url, "http://feed:8082");
        assert_eq!(config.enforce_recipient, Some(false));
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = CliArgs {
            port: Some(9000),
            services: Some("profile".to_string()),
            profile_url: Some("http://cli-profile".to_string()),
            ..CliArgs::default()
        };
        let config = ServerConfig::resolve(
            cli,
            lookup(&[
                ("PORT", "8081"),
                ("TRUSTLINK_SERVICES", "feed"),
                ("PROFILE_SERVICE_URL", "http://env-profile"),
            ]),
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.services, vec![Service::Profile]);
        assert_eq!(config.gateway.profile_url, "http://cli-profile");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(ServerConfig::resolve(CliArgs::default(), lookup(&[("PORT", "http")])).is_err());
        assert!(
            ServerConfig::resolve(CliArgs::default(), lookup(&[("TRUSTLINK_SERVICES", "mail")]))
                .is_err()
        );
        assert!(parse_services(" , ").is_err());
    }

    #[test]
    fn test_parse_services_dedupes() {
        let services = parse_services("feed,FEED,profile").unwrap();
        assert_eq!(services, vec![Service::Feed, Service::Profile]);
    }
}
