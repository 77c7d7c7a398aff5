use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use std::path::PathBuf;

/// CLI arguments shared by trustlink-server and trustlink-gateway
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub port: Option<u16>,
    pub env: Option<String>,
    pub services: Option<String>,
    pub config_file: Option<PathBuf>,
    pub max_request_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub enforce_recipient: Option<bool>,
    pub log_level: Option<String>,
    pub profile_url: Option<String>,
    pub feed_url: Option<String>,
    pub connections_url: Option<String>,
}

impl CliArgs {
    /// Parse command line arguments for the service host
    pub fn parse() -> Self {
        Self::from_matches(&server_command().get_matches())
    }

    /// Parse command line arguments for the gateway
    pub fn parse_gateway() -> Self {
        Self::from_matches(&gateway_command().get_matches())
    }

    /// Parse an explicit argument list for the service host
    pub fn try_parse_from<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Ok(Self::from_matches(&server_command().try_get_matches_from(args)?))
    }

    fn from_matches(matches: &ArgMatches) -> Self {
        fn one<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Option<T> {
            matches.try_get_one::<T>(id).ok().flatten().cloned()
        }
        fn flag(matches: &ArgMatches, id: &str) -> bool {
            matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false)
        }

        Self {
            port: one(matches, "port"),
            env: one(matches, "env"),
            services: one(matches, "services"),
            config_file: one(matches, "config"),
            max_request_size: one(matches, "max_request_size"),
            request_timeout_secs: one(matches, "request_timeout"),
            enforce_recipient: if flag(matches, "enforce_recipient") {
                Some(true)
            } else if flag(matches, "trust_caller") {
                Some(false)
            } else {
                None
            },
            log_level: one(matches, "log_level"),
            profile_url: one(matches, "profile_url"),
            feed_url: one(matches, "feed_url"),
            connections_url: one(matches, "connections_url"),
        }
    }
}

fn common_args(command: Command) -> Command {
    command
        .version(trustlink::VERSION)
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on")
                .long_help(
                    "Port number for the HTTP server to listen on.
Environment variable: PORT",
                )
                .value_hint(ValueHint::Other)
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("env")
                .long("env")
                .value_name("ENV")
                .help("Deployment environment (dev, prod)")
                .long_help(
                    "Deployment environment name. `prod` switches log output to JSON.
Environment variable: ENV",
                ),
        )
        .arg(
            Arg::new("max_request_size")
                .long("max-request-size")
                .value_name("BYTES")
                .help("Maximum request body size in bytes")
                .long_help(
                    "Maximum size allowed for HTTP request bodies.
Larger requests will be rejected.
Environment variable: MAX_REQUEST_SIZE",
                )
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("request_timeout")
                .long("request-timeout")
                .value_name("SECONDS")
                .help("Request timeout in seconds")
                .long_help(
                    "Deadline for handling a whole request.
Environment variable: REQUEST_TIMEOUT_SECS",
                )
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("log_level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Logging level")
                .long_help(
                    "Set the logging level. Valid values: error, warn, info, debug, trace
Environment variable: RUST_LOG",
                )
                .value_parser(["error", "warn", "info", "debug", "trace"]),
        )
}

/// Command definition for trustlink-server
pub fn server_command() -> Command {
    common_args(Command::new("trustlink-server"))
        .about("Profile, feed, connections and notification services")
        .long_about(
            r#"Trustlink Server hosts the profile, feed, connections and notification
services behind one HTTP listener. Every /v1 endpoint requires a bearer ID token.

The server can be configured through command line arguments, environment
variables and a Trustlink configuration file. Command line arguments take
precedence over environment variables.

Examples:
  trustlink-server --port 8083 --services connections
  trustlink-server --config trustlink.toml --env prod"#,
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .long_help(
                    "Path to a TOML, YAML or JSON Trustlink configuration file.
TRUSTLINK_* environment variables are merged on top of it.
Environment variable: TRUSTLINK_CONFIG_FILE",
                )
                .value_hint(ValueHint::FilePath)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("services")
                .long("services")
                .value_name("LIST")
                .help("Comma separated services to host")
                .long_help(
                    "Services hosted by this process: profile, feed, connections,
notifications. Defaults to all of them.
Environment variable: TRUSTLINK_SERVICES",
                ),
        )
        .arg(
            Arg::new("enforce_recipient")
                .long("enforce-recipient")
                .help("Only the recipient may accept or reject a request")
                .long_help(
                    "Reject accept/reject calls from anyone but the recipient of the
pending request.
Environment variable: ENFORCE_RECIPIENT",
                )
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trust_caller")
                .long("trust-caller")
                .help("Do not check who accepts or rejects a request")
                .action(ArgAction::SetTrue)
                .conflicts_with("enforce_recipient"),
        )
}

/// Command definition for trustlink-gateway
pub fn gateway_command() -> Command {
    let upstream = |id: &'static str, long: &'static str, help: &'static str, var: &'static str| {
        Arg::new(id)
            .long(long)
            .value_name("URL")
            .help(help)
            .long_help(format!("{}\nEnvironment variable: {}", help, var))
            .value_hint(ValueHint::Url)
    };

    common_args(Command::new("trustlink-gateway"))
        .about("Reverse proxy in front of the Trustlink services")
        .arg(upstream(
            "profile_url",
            "profile-url",
            "Profile service base URL",
            "PROFILE_SERVICE_URL",
        ))
        .arg(upstream(
            "feed_url",
            "feed-url",
            "Feed service base URL",
            "FEED_SERVICE_URL",
        ))
        .arg(upstream(
            "connections_url",
            "connections-url",
            "Connections service base URL",
            "CONNECTIONS_SERVICE_URL",
        ))
}
