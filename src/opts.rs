//! Connection options.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

/// Domain appended to the account name when no host is given.
pub const DEFAULT_DOMAIN: &str = "snowflakecomputing.com";

/// Connection options for Snowflake.
///
/// Authentication happens elsewhere; the options carry the already negotiated
/// session token and the names the session starts with.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Account identifier.
    ///
    /// Default: `""`
    pub account: String,

    /// Hostname. Empty means `<account>.snowflakecomputing.com`.
    ///
    /// Default: `""`
    pub host: String,

    /// Port number.
    ///
    /// Default: `443`
    pub port: u16,

    /// URL scheme (`https` or `http`).
    ///
    /// Default: `"https"`
    pub protocol: String,

    /// Login name.
    ///
    /// Default: `""`
    pub user: String,

    /// Initial database.
    ///
    /// Default: `None`
    pub database: Option<String>,

    /// Initial schema.
    ///
    /// Default: `None`
    pub schema: Option<String>,

    /// Initial warehouse.
    ///
    /// Default: `None`
    pub warehouse: Option<String>,

    /// Initial role.
    ///
    /// Default: `None`
    pub role: Option<String>,

    /// Session token obtained at login.
    ///
    /// Default: `None`
    pub token: Option<String>,

    /// Timeout for each request and chunk download (None = no timeout).
    ///
    /// Default: `None`
    pub request_timeout: Option<Duration>,

    /// Maximum number of chunk downloads in flight per result.
    ///
    /// Default: `4`
    pub prefetch_window: usize,

    /// Interval between session heartbeats when keepalive is enabled.
    ///
    /// Default: `3600s`
    pub keepalive_interval: Duration,

    /// Retries for transient transport failures (timeouts, connect errors, 429, 503).
    ///
    /// Default: `3`
    pub max_retries: u32,

    /// Initial session parameters, as returned by login.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,

    /// Span that scopes the connection's log events.
    ///
    /// Default: `None` (a `snowflake.conn` span is created)
    pub span: Option<tracing::Span>,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            account: String::new(),
            host: String::new(),
            port: 443,
            protocol: "https".to_string(),
            user: String::new(),
            database: None,
            schema: None,
            warehouse: None,
            role: None,
            token: None,
            request_timeout: None,
            prefetch_window: 4,
            keepalive_interval: Duration::from_secs(3600),
            max_retries: 3,
            params: Vec::new(),
            span: None,
        }
    }
}

impl Opts {
    /// Hostname to connect to, derived from the account when unset.
    pub fn host(&self) -> String {
        if self.host.is_empty() {
            format!("{}.{}", self.account, DEFAULT_DOMAIN)
        } else {
            self.host.clone()
        }
    }

    /// Base URL all endpoint paths are joined onto.
    pub fn base_url(&self) -> Result<Url> {
        if self.host.is_empty() && self.account.is_empty() {
            return Err(Error::InvalidUsage(
                "either host or account must be set".into(),
            ));
        }
        let url = Url::parse(&format!("{}://{}:{}", self.protocol, self.host(), self.port))?;
        Ok(url)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value {
        "true" | "True" | "1" | "yes" | "on" => Ok(true),
        "false" | "False" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidUsage(format!("Invalid {}: {}", key, value))),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| Error::InvalidUsage(format!("Invalid {}: {}", key, value)))
}

impl TryFrom<&Url> for Opts {
    type Error = Error;

    /// Parse a Snowflake connection URL.
    ///
    /// Format: `snowflake://[user[:token]@]account[:port][/database[/schema]][?param1=value1&..]`
    ///
    /// Supported query parameters:
    /// - `warehouse`, `role`, `token`, `host`, `protocol`
    /// - `request_timeout`, `keepalive_interval`: seconds
    /// - `prefetch_window`, `max_retries`: non-negative integers
    /// - `client_session_keep_alive`: true/True/1/yes/on or false/False/0/no/off
    ///
    /// Unknown parameters become initial session parameters.
    fn try_from(url: &Url) -> core::result::Result<Self, Self::Error> {
        if !["snowflake", "sf"].contains(&url.scheme()) {
            return Err(Error::InvalidUsage(format!(
                "Invalid scheme: expected 'snowflake://' or 'sf://', got '{}://'",
                url.scheme()
            )));
        }

        let mut segments = url
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let mut opts = Opts {
            account: url.host_str().unwrap_or_default().to_string(),
            port: url.port().unwrap_or(443),
            user: url.username().to_string(),
            token: url.password().map(str::to_string),
            database: segments.next(),
            schema: segments.next(),
            ..Opts::default()
        };

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "warehouse" => opts.warehouse = Some(value.to_string()),
                "role" => opts.role = Some(value.to_string()),
                "token" => opts.token = Some(value.to_string()),
                "host" => opts.host = value.to_string(),
                "protocol" => {
                    if value != "https" && value != "http" {
                        return Err(Error::InvalidUsage(format!(
                            "Invalid protocol: expected one of ['https', 'http'], got {}",
                            value
                        )));
                    }
                    opts.protocol = value.to_string();
                }
                "request_timeout" => {
                    opts.request_timeout = Some(parse_secs("request_timeout", &value)?);
                }
                "keepalive_interval" => {
                    opts.keepalive_interval = parse_secs("keepalive_interval", &value)?;
                }
                "prefetch_window" => {
                    opts.prefetch_window = value.parse().map_err(|_| {
                        Error::InvalidUsage(format!("Invalid prefetch_window: {}", value))
                    })?;
                }
                "max_retries" => {
                    opts.max_retries = value.parse().map_err(|_| {
                        Error::InvalidUsage(format!("Invalid max_retries: {}", value))
                    })?;
                }
                "client_session_keep_alive" => {
                    let enabled = parse_bool("client_session_keep_alive", &value)?;
                    opts.params
                        .push(("client_session_keep_alive".to_string(), enabled.to_string()));
                }
                _ => {
                    opts.params.push((key.to_string(), value.to_string()));
                }
            }
        }

        Ok(opts)
    }
}

impl TryFrom<&str> for Opts {
    type Error = Error;

    fn try_from(s: &str) -> core::result::Result<Self, Self::Error> {
        let url = Url::parse(s)?;
        Self::try_from(&url)
    }
}
