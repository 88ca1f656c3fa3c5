use crate::error::UpdateError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// One octet in 0-255, no leading zeros
const OCTET: &str = r"(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9][0-9]|[0-9])";

/// RFC 1123 label: alphanumeric ends, inner hyphens, 1 to 63 characters
const LABEL: &str = r"[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?";

const PATH: &str = r"/(?:[A-Za-z0-9_~.%-]+/?)*";

fn ipv4_pattern() -> String {
    format!(r"(?:{OCTET}\.){{3}}{OCTET}")
}

fn hostname_pattern() -> String {
    format!(r"(?:{LABEL}\.)*{LABEL}")
}

static IPV4_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{}$", ipv4_pattern())).expect("valid IPv4 pattern"));

static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^{}$", hostname_pattern())).expect("valid hostname pattern")
});

static PATH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{PATH}$")).expect("valid path pattern"));

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"^(?:(?P<proto>https?)://)?(?P<host>{}|{})(?::(?P<port>[0-9]{{1,5}}))?(?P<path>{PATH})?$",
        ipv4_pattern(),
        hostname_pattern(),
    );
    Regex::new(&pattern).expect("valid url pattern")
});

/// Exactly four dot-separated octets, each in 0-255.
pub fn is_ipv4(value: &str) -> bool {
    IPV4_RE.is_match(value)
}

/// Dot-separated RFC 1123 labels.
pub fn is_hostname(value: &str) -> bool {
    HOSTNAME_RE.is_match(value)
}

/// Absolute path made of URL-safe segments.
pub fn is_path(value: &str) -> bool {
    PATH_RE.is_match(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    pub fn default_port(self) -> u16 {
        match self {
            Protocol::Http => 80,
            Protocol::Https => 443,
        }
    }

    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
        }
    }
}

impl FromStr for Protocol {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "http" => Ok(Protocol::Http),
            "https" => Ok(Protocol::Https),
            other => Err(UpdateError::Protocol(other.to_string())),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A validated update server address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    /// `None` when the address carried no scheme
    pub protocol: Option<Protocol>,
    pub host: String,
    pub port: Option<u16>,
    /// Empty when the address had no path
    pub path: String,
    pub raw: String,
}

impl ServerEndpoint {
    /// Parse `[(http|https)://]host-or-ipv4[:port][/path]`, anchored on both ends.
    pub fn parse(raw: &str) -> Result<Self, UpdateError> {
        let caps = URL_RE
            .captures(raw)
            .ok_or_else(|| UpdateError::validation("server url", raw, "not a valid http(s) address"))?;

        let protocol = caps
            .name("proto")
            .map(|m| m.as_str().parse::<Protocol>())
            .transpose()?;

        let port = match caps.name("port") {
            Some(m) => Some(m.as_str().parse::<u16>().map_err(|_| {
                UpdateError::validation("server url", raw, format!("port {} is out of range", m.as_str()))
            })?),
            None => None,
        };

        Ok(ServerEndpoint {
            protocol,
            host: caps["host"].to_string(),
            port,
            path: caps.name("path").map(|m| m.as_str().to_string()).unwrap_or_default(),
            raw: raw.to_string(),
        })
    }

    /// The scheme in force, HTTP when none was written.
    pub fn effective_protocol(&self) -> Protocol {
        self.protocol.unwrap_or(Protocol::Http)
    }

    /// Path prefix to put in front of the API path.
    pub fn base_path(&self) -> &str {
        self.path.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Outcome;

    #[test]
    fn test_ipv4_accepts_all_octet_boundaries() {
        for octet in [0, 1, 9, 10, 99, 100, 199, 200, 249, 250, 255] {
            let ip = format!("{octet}.{octet}.{octet}.{octet}");
            assert!(is_ipv4(&ip), "{ip} should be accepted");
        }
        assert!(is_ipv4("192.168.1.1"));
    }

    #[test]
    fn test_ipv4_rejects_out_of_range_and_garbage() {
        assert!(!is_ipv4("256.1.1.1"));
        assert!(!is_ipv4("1.1.1.256"));
        assert!(!is_ipv4("999.999.999.999"));
        assert!(!is_ipv4("192.168.1"));
        assert!(!is_ipv4("192.168.1.1.1"));
        assert!(!is_ipv4("192.168..1"));
        assert!(!is_ipv4("192.168.1.abc"));
        assert!(!is_ipv4(" 1.1.1.1"));
        assert!(!is_ipv4("1.1.1.1 "));
        assert!(!is_ipv4(""));
    }

    #[test]
    fn test_hostname_rfc1123_labels() {
        assert!(is_hostname("localhost"));
        assert!(is_hostname("my-host.example.COM"));
        assert!(is_hostname("a"));
        assert!(is_hostname(&"a".repeat(63)));
        assert!(!is_hostname(&"a".repeat(64)));
        assert!(!is_hostname("-bad.example.com"));
        assert!(!is_hostname("bad-.example.com"));
        assert!(!is_hostname("double..dot"));
        assert!(!is_hostname("under_score.com"));
        assert!(!is_hostname(""));
    }

    #[test]
    fn test_path_grammar() {
        assert!(is_path("/nic/update"));
        assert!(is_path("/"));
        assert!(is_path("/a/b/"));
        assert!(!is_path("nic/update"));
        assert!(!is_path("/a b"));
        assert!(!is_path("/a?b=c"));
    }

    #[test]
    fn test_parse_without_scheme_defaults_to_http() {
        let endpoint = ServerEndpoint::parse("www.api.com:81/").unwrap();
        assert_eq!(endpoint.protocol, None);
        assert_eq!(endpoint.effective_protocol(), Protocol::Http);
        assert_eq!(endpoint.host, "www.api.com");
        assert_eq!(endpoint.port, Some(81));
        assert_eq!(endpoint.path, "/");
        assert_eq!(endpoint.base_path(), "");
        assert_eq!(endpoint.raw, "www.api.com:81/");
    }

    #[test]
    fn test_parse_full_https_address() {
        let endpoint = ServerEndpoint::parse("https://10.0.0.1:8443/dyn/").unwrap();
        assert_eq!(endpoint.protocol, Some(Protocol::Https));
        assert_eq!(endpoint.host, "10.0.0.1");
        assert_eq!(endpoint.port, Some(8443));
        assert_eq!(endpoint.base_path(), "/dyn");
    }

    #[test]
    fn test_parse_bare_host() {
        let endpoint = ServerEndpoint::parse("http://lmdaz").unwrap();
        assert_eq!(endpoint.protocol, Some(Protocol::Http));
        assert_eq!(endpoint.host, "lmdaz");
        assert_eq!(endpoint.port, None);
        assert_eq!(endpoint.path, "");
    }

    #[test]
    fn test_parse_port_range() {
        assert_eq!(ServerEndpoint::parse("host:0").unwrap().port, Some(0));
        assert_eq!(ServerEndpoint::parse("host:65535").unwrap().port, Some(65535));
        assert!(ServerEndpoint::parse("host:65536").is_err());
        assert!(ServerEndpoint::parse("host:99999").is_err());
        assert!(ServerEndpoint::parse("host:123456").is_err());
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = ServerEndpoint::parse("ftp://lmdaz").unwrap_err();
        assert_eq!(err.outcome(), Outcome::ValidationError);
        assert!(err.to_string().contains("ftp://lmdaz"));
    }

    #[test]
    fn test_parse_rejects_trailing_garbage() {
        assert!(ServerEndpoint::parse("http://host/path?x=1").is_err());
        assert!(ServerEndpoint::parse("http://host:80:81").is_err());
        assert!(ServerEndpoint::parse("http://user@host").is_err());
        assert!(ServerEndpoint::parse("http://host name").is_err());
        assert!(ServerEndpoint::parse("").is_err());
    }

    #[test]
    fn test_protocol_from_str() {
        assert_eq!("https".parse::<Protocol>().unwrap(), Protocol::Https);
        let err = "ftp".parse::<Protocol>().unwrap_err();
        assert_eq!(err.outcome(), Outcome::ProtocolError);
    }
}
