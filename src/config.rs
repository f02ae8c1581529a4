use anyhow::Result;
use clap::Parser;
use std::fmt;
use std::time::Duration;

use crate::error::ApiError;

/// Default VerifyWise backend URL
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// VerifyWise MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// VerifyWise API base URL
    #[arg(long, env = "VERIFYWISE_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// VerifyWise admin email address
    #[arg(long, env = "VERIFYWISE_EMAIL")]
    pub email: Option<String>,

    /// VerifyWise admin password
    #[arg(long, env = "VERIFYWISE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "VERIFYWISE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// MCP transport mode (stdio, http)
    #[arg(long, env = "VERIFYWISE_TRANSPORT", default_value = "stdio")]
    pub transport: String,

    /// HTTP transport bind address (only used when transport=http)
    #[arg(long, env = "VERIFYWISE_HTTP_HOST", default_value = "127.0.0.1")]
    pub http_host: String,

    /// HTTP transport port (only used when transport=http)
    #[arg(long, env = "VERIFYWISE_HTTP_PORT", default_value = "8080")]
    pub http_port: u16,

    /// HTTP request timeout in seconds
    #[arg(long, env = "VERIFYWISE_REQUEST_TIMEOUT", default_value = "30.0")]
    pub request_timeout: f64,

    /// Maximum number of attempts for GET requests on transport failures
    #[arg(long, env = "VERIFYWISE_MAX_RETRIES", default_value = "3")]
    pub max_retries: u32,
}

/// Settings needed to build an `ApiClient`
#[derive(Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub email: String,
    pub password: String,
    pub request_timeout: Duration,
    pub max_retries: u32,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ClientConfig {
    /// Build a client configuration from `VERIFYWISE_*` environment variables
    /// (and a `.env` file if present), ignoring process arguments.
    pub fn from_env() -> std::result::Result<Self, ApiError> {
        dotenvy::dotenv().ok();
        let args = CliArgs::try_parse_from(["verifywise-mcp"])
            .map_err(|e| ApiError::Config(e.to_string()))?;
        let config = Config::from_args(args)?;
        config.validate()?;
        Ok(config.client)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportMode {
    Stdio,
    Http,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Upstream API
    pub client: ClientConfig,

    // MCP transport
    pub transport: TransportMode,
    pub http_host: String,
    pub http_port: u16,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > .env > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Ok(Self::from_args(args)?)
    }

    /// Build configuration from parsed arguments
    pub fn from_args(args: CliArgs) -> std::result::Result<Self, ApiError> {
        let email = args.email.ok_or_else(|| {
            ApiError::Config("VERIFYWISE_EMAIL is required (use --email or set the env var)".into())
        })?;
        let password = args.password.ok_or_else(|| {
            ApiError::Config(
                "VERIFYWISE_PASSWORD is required (use --password or set the env var)".into(),
            )
        })?;

        if !args.request_timeout.is_finite() || args.request_timeout <= 0.0 {
            return Err(ApiError::Config(format!(
                "VERIFYWISE_REQUEST_TIMEOUT must be a positive number of seconds, got {}",
                args.request_timeout
            )));
        }

        let request_timeout = Duration::try_from_secs_f64(args.request_timeout).map_err(|e| {
            ApiError::Config(format!(
                "VERIFYWISE_REQUEST_TIMEOUT is out of range ({}): {}",
                args.request_timeout, e
            ))
        })?;

        Ok(Config {
            client: ClientConfig {
                base_url: args.base_url.trim_end_matches('/').to_string(),
                email,
                password,
                request_timeout,
                max_retries: args.max_retries,
            },
            transport: parse_transport_mode(&args.transport)?,
            http_host: args.http_host,
            http_port: args.http_port,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), ApiError> {
        let url = reqwest::Url::parse(&self.client.base_url).map_err(|e| {
            ApiError::Config(format!(
                "VERIFYWISE_BASE_URL is not a valid URL ({}): {}",
                self.client.base_url, e
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ApiError::Config(format!(
                "VERIFYWISE_BASE_URL must use http or https, got {}",
                url.scheme()
            )));
        }

        if self.client.email.trim().is_empty() {
            return Err(ApiError::Config("VERIFYWISE_EMAIL must not be empty".into()));
        }
        if self.client.password.is_empty() {
            return Err(ApiError::Config(
                "VERIFYWISE_PASSWORD must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// Parse transport mode from string
fn parse_transport_mode(s: &str) -> std::result::Result<TransportMode, ApiError> {
    match s.to_lowercase().as_str() {
        "stdio" => Ok(TransportMode::Stdio),
        "http" | "streamable-http" => Ok(TransportMode::Http),
        other => Err(ApiError::Config(format!(
            "VERIFYWISE_TRANSPORT must be stdio or http, got {}",
            other
        ))),
    }
}
