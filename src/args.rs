use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone, Default)]
#[command(version, about = "Use the DynDNS protocol to update a dynhost with a new IP address", long_about = None)]
pub struct Args {
    /// IP address to publish for the hostname(s)
    #[arg(long = "dyn-address")]
    pub dyn_address: Option<String>,

    /// Hostname of the dynhost to update (repeatable, or comma-separated, at most 20)
    #[arg(long = "dyn-hostname")]
    pub dyn_hostname: Vec<String>,

    /// DynDNS server address ([http|https://]host[:port][/path])
    #[arg(long = "dyn-server")]
    pub dyn_server: Option<String>,

    /// Username for HTTP Basic authentication
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password for HTTP Basic authentication
    #[arg(short, long)]
    pub password: Option<String>,

    /// Endpoint path receiving the update query [default: /nic/update]
    #[arg(long = "api-url")]
    pub api_url: Option<String>,

    /// Set the backup MX option to YES
    #[arg(long, conflicts_with = "no_backmx")]
    pub backmx: bool,

    /// Set the backup MX option to NO
    #[arg(long)]
    pub no_backmx: bool,

    /// Set the wildcard option to ON
    #[arg(long, conflicts_with = "no_wildcard")]
    pub wildcard: bool,

    /// Set the wildcard option to OFF
    #[arg(long)]
    pub no_wildcard: bool,

    /// Mail exchanger for the hostname
    #[arg(long)]
    pub mx: Option<String>,

    /// Offline redirect URL
    #[arg(long)]
    pub url: Option<String>,

    /// Put the hostname in offline mode
    #[arg(long)]
    pub offline: bool,

    /// Use the static DNS system (statdns)
    #[arg(long = "static")]
    pub static_system: bool,

    /// HTTP timeout in seconds [default: 5]
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Disable TLS certificate verification for secure connections
    #[arg(long)]
    pub insecure: bool,

    /// Disable all output to stdout (cron mode)
    #[arg(long, conflicts_with = "verbose")]
    pub no_output: bool,

    /// Show more running messages (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Copy errors to stderr
    #[arg(long)]
    pub errors_to_stderr: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub file: Option<String>,
}

impl Args {
    pub fn new() -> Self {
        Self::parse()
    }
}
