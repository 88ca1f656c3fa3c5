//! Configuration loading
//!
//! Settings come from an optional configuration file and the command line,
//! the command line winning. The file uses a ddclient-flavoured format:
//! - key=value pairs, comma-separated or on separate lines
//! - backslash line continuation
//! - `#` comments
//! - a bare value after a comma extends the previous key as a list
//!
//! Example:
//! ```text
//! server_url=https://members.example.com, \
//! server_username=alice, server_password=secret
//! dyndns_hostname=home.example.com,nas.example.com
//! ```

use crate::endpoint::{is_path, ServerEndpoint};
use crate::error::UpdateError;
use crate::fields::UpdateFields;
use base64::{engine::general_purpose, Engine as _};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_PATH: &str = "/nic/update";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// One hour; longer values make no sense for a single request
pub const MAX_TIMEOUT_SECS: u64 = 3600;
const CONFIG_FILE_NAME: &str = "dyndns-update.conf";

/// Raw settings, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub server_url: Option<String>,
    pub server_api_url: Option<String>,
    pub server_username: Option<String>,
    pub server_password: Option<String>,
    pub dyndns_myip: Option<String>,
    pub dyndns_hostname: Vec<String>,
    pub dyndns_wildcard: Option<String>,
    pub dyndns_backmx: Option<String>,
    pub dyndns_mx: Option<String>,
    pub dyndns_offline: Option<bool>,
    pub dyndns_static: Option<bool>,
    pub dyndns_url: Option<String>,
    pub timeout: Option<u64>,
    pub tls_insecure: Option<bool>,
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration file text.
    pub fn parse(content: &str) -> Result<Self, UpdateError> {
        let mut config = Config::default();
        let normalized = join_continued_lines(content);

        for (index, line) in normalized.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut last_key: Option<String> = None;
            for part in line.split(',').map(str::trim) {
                if part.is_empty() {
                    continue;
                }
                if part.starts_with('#') {
                    break;
                }
                match part.split_once('=') {
                    Some((key, value)) => {
                        let key = key.trim();
                        config.set(key, value.trim())?;
                        last_key = Some(key.to_string());
                    }
                    None => match last_key.as_deref() {
                        Some(key) => config.extend(key, part)?,
                        None => {
                            return Err(UpdateError::ConfigFile(format!(
                                "line {}: expected key=value, found '{}'",
                                index + 1,
                                part
                            )))
                        }
                    },
                }
            }
        }

        Ok(config)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), UpdateError> {
        match key {
            "server_url" => self.server_url = Some(value.to_string()),
            "server_api_url" => self.server_api_url = Some(value.to_string()),
            "server_username" => self.server_username = Some(value.to_string()),
            "server_password" => self.server_password = Some(value.to_string()),
            "dyndns_myip" => self.dyndns_myip = Some(value.to_string()),
            "dyndns_hostname" => self.dyndns_hostname = vec![value.to_string()],
            "dyndns_wildcard" => self.dyndns_wildcard = Some(value.to_string()),
            "dyndns_backmx" => self.dyndns_backmx = Some(value.to_string()),
            "dyndns_mx" => self.dyndns_mx = Some(value.to_string()),
            "dyndns_offline" => self.dyndns_offline = Some(parse_bool(key, value)?),
            "dyndns_static" => self.dyndns_static = Some(parse_bool(key, value)?),
            "dyndns_url" => self.dyndns_url = Some(value.to_string()),
            "timeout" => {
                let secs = value.parse().map_err(|_| {
                    UpdateError::ConfigFile(format!("timeout must be a number of seconds, got '{}'", value))
                })?;
                self.timeout = Some(secs);
            }
            "tls_insecure" => self.tls_insecure = Some(parse_bool(key, value)?),
            _ => return Err(UpdateError::ConfigFile(format!("unknown setting '{}'", key))),
        }
        Ok(())
    }

    /// Append a bare list item to the previous key; only hostnames are lists.
    fn extend(&mut self, key: &str, value: &str) -> Result<(), UpdateError> {
        if key == "dyndns_hostname" {
            self.dyndns_hostname.push(value.to_string());
            Ok(())
        } else {
            Err(UpdateError::ConfigFile(format!(
                "'{}' does not look like a setting (missing '=' after '{}'?)",
                value, key
            )))
        }
    }

    /// Combine an optional file-derived Config with CLI arguments, using CLI values when provided.
    pub fn merge(file_config: Option<Self>, args: &crate::args::Args) -> Self {
        let base = file_config.unwrap_or_default();

        let wildcard = if args.wildcard {
            Some("ON".to_string())
        } else if args.no_wildcard {
            Some("OFF".to_string())
        } else {
            base.dyndns_wildcard
        };
        let backmx = if args.backmx {
            Some("YES".to_string())
        } else if args.no_backmx {
            Some("NO".to_string())
        } else {
            base.dyndns_backmx
        };
        let hostnames = if args.dyn_hostname.is_empty() {
            base.dyndns_hostname
        } else {
            args.dyn_hostname.clone()
        };

        Config {
            server_url: args.dyn_server.clone().or(base.server_url),
            server_api_url: args.api_url.clone().or(base.server_api_url),
            server_username: args.username.clone().or(base.server_username),
            server_password: args.password.clone().or(base.server_password),
            dyndns_myip: args.dyn_address.clone().or(base.dyndns_myip),
            dyndns_hostname: hostnames,
            dyndns_wildcard: wildcard,
            dyndns_backmx: backmx,
            dyndns_mx: args.mx.clone().or(base.dyndns_mx),
            dyndns_offline: args.offline.then_some(true).or(base.dyndns_offline),
            dyndns_static: args.static_system.then_some(true).or(base.dyndns_static),
            dyndns_url: args.url.clone().or(base.dyndns_url),
            timeout: args.timeout.or(base.timeout),
            tls_insecure: args.insecure.then_some(true).or(base.tls_insecure),
        }
    }

    /// Read the file named by `--file`, or the default one when it exists, and merge the CLI over it.
    ///
    /// A file given explicitly must exist.
    pub fn load(args: &crate::args::Args) -> Result<Self, UpdateError> {
        let file_config = match &args.file {
            Some(path) => Some(Self::from_file(Path::new(path))?),
            None => match default_config_path() {
                Some(path) if path.exists() => {
                    log::debug!("reading configuration from {}", path.display());
                    Some(Self::from_file(&path)?)
                }
                _ => None,
            },
        };

        Ok(Self::merge(file_config, args))
    }
}

/// `<config dir>/dyndns-update.conf`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, UpdateError> {
    match value.to_lowercase().as_str() {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(UpdateError::ConfigFile(format!(
            "{} expects yes/no, got '{}'",
            key, value
        ))),
    }
}

/// Collapse lines ending with a backslash into single lines.
fn join_continued_lines(content: &str) -> String {
    let mut result = String::new();
    let mut current_line = String::new();

    for line in content.lines() {
        let trimmed = line.trim_end();

        if let Some(stripped) = trimmed.strip_suffix('\\') {
            current_line.push_str(stripped);
            current_line.push(' ');
        } else {
            current_line.push_str(trimmed);
            result.push_str(&current_line);
            result.push('\n');
            current_line.clear();
        }
    }

    if !current_line.is_empty() {
        result.push_str(&current_line);
        result.push('\n');
    }

    result
}

/// HTTP Basic credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    /// Only a complete, non-empty pair yields credentials.
    pub fn new(username: Option<&str>, password: Option<&str>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Credentials {
                username: u.to_string(),
                password: p.to_string(),
            }),
            _ => None,
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password))
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything one update needs, validated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub endpoint: ServerEndpoint,
    pub fields: UpdateFields,
    pub credentials: Option<Credentials>,
    pub timeout: Duration,
    pub tls_insecure: bool,
    pub api_path: String,
}

impl RunConfig {
    /// Validate every provided value, then check that the required ones are there.
    ///
    /// Malformed values are reported before missing ones, and missing settings
    /// are checked in the order server_url, myip, hostname.
    pub fn build(config: &Config) -> Result<Self, UpdateError> {
        let endpoint = config
            .server_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(ServerEndpoint::parse)
            .transpose()?;

        let mut fields = UpdateFields::new();
        if let Some(ip) = config.dyndns_myip.as_deref().filter(|ip| !ip.is_empty()) {
            fields.set_myip(ip)?;
        }
        if !config.dyndns_hostname.is_empty() {
            fields.set_hostname(&config.dyndns_hostname)?;
        }
        if let Some(wildcard) = config.dyndns_wildcard.as_deref() {
            fields.set_wildcard(wildcard)?;
            log::warn!("Deprecated: flag wildcard may be ignored by the server");
        }
        if let Some(backmx) = config.dyndns_backmx.as_deref() {
            fields.set_backmx(backmx)?;
        }
        if let Some(mx) = config.dyndns_mx.as_deref() {
            fields.set_mx(mx)?;
        }
        if let Some(url) = config.dyndns_url.as_deref() {
            fields.set_url(url);
        }
        fields.set_offline(config.dyndns_offline.unwrap_or(false));
        fields.set_static(config.dyndns_static.unwrap_or(false));

        let api_path = config
            .server_api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_PATH.to_string());
        if !is_path(&api_path) {
            return Err(UpdateError::validation("api url", &api_path, "not an absolute URL path"));
        }

        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout) {
            return Err(UpdateError::validation(
                "timeout",
                &timeout.to_string(),
                format!("must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
            ));
        }

        let endpoint = endpoint.ok_or(UpdateError::MissingSetting("server_url"))?;
        if fields.myip().is_empty() {
            return Err(UpdateError::MissingSetting("myip"));
        }
        if fields.hostname().is_empty() {
            return Err(UpdateError::MissingSetting("hostname"));
        }

        Ok(RunConfig {
            endpoint,
            fields,
            credentials: Credentials::new(
                config.server_username.as_deref(),
                config.server_password.as_deref(),
            ),
            timeout: Duration::from_secs(timeout),
            tls_insecure: config.tls_insecure.unwrap_or(false),
            api_path,
        })
    }
}
