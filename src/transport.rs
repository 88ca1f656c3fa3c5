use crate::endpoint::{Protocol, ServerEndpoint};
use crate::error::UpdateError;
use reqwest::blocking::Client;
use reqwest::redirect;
use std::time::Duration;

/// How to reach the update server: scheme, port, TLS checks and timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transport {
    protocol: Protocol,
    host: String,
    port: u16,
    verify_tls: bool,
    timeout: Duration,
}

/// Options the HTTP client is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub https_only: bool,
    pub accept_invalid_certs: bool,
}

/// Pick plain HTTP or TLS for the endpoint.
///
/// Certificate and hostname verification stay on unless `tls_insecure` is set.
/// Unsupported schemes never get here, they fail when the address is parsed.
pub fn select(endpoint: &ServerEndpoint, tls_insecure: bool, timeout: Duration) -> Transport {
    let protocol = endpoint.effective_protocol();
    let port = endpoint.port.unwrap_or_else(|| protocol.default_port());

    log::debug!("-> protocol {}", protocol);
    if protocol == Protocol::Https && tls_insecure {
        log::warn!("TLS certificate verification is DISABLED");
    }

    Transport {
        protocol,
        host: endpoint.host.clone(),
        port,
        verify_tls: protocol == Protocol::Http || !tls_insecure,
        timeout,
    }
}

impl Transport {
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the server certificate and hostname are checked.
    pub fn verifies_certificates(&self) -> bool {
        self.verify_tls
    }

    /// `scheme://host:port`, without a trailing slash.
    pub fn origin(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn settings(&self) -> ClientSettings {
        let https = self.protocol == Protocol::Https;
        ClientSettings {
            timeout: self.timeout,
            https_only: https,
            accept_invalid_certs: https && !self.verifies_certificates(),
        }
    }

    /// Build a single-use client: no redirects, no idle connection kept after the call.
    pub fn client(&self) -> Result<Client, UpdateError> {
        let settings = self.settings();
        Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.timeout)
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .https_only(settings.https_only)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .build()
            .map_err(|e| UpdateError::ClientSetup(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(raw: &str) -> ServerEndpoint {
        ServerEndpoint::parse(raw).unwrap()
    }

    #[test]
    fn test_http_default_port() {
        let transport = select(&endpoint("www.api.com"), false, Duration::from_secs(5));
        assert_eq!(transport.protocol(), Protocol::Http);
        assert_eq!(transport.port(), 80);
        assert_eq!(transport.origin(), "http://www.api.com:80");
    }

    #[test]
    fn test_explicit_port_wins() {
        let transport = select(&endpoint("www.api.com:81/"), false, Duration::from_secs(5));
        assert_eq!(transport.port(), 81);
        let transport = select(&endpoint("https://www.api.com:8443"), false, Duration::from_secs(5));
        assert_eq!(transport.port(), 8443);
    }

    #[test]
    fn test_https_verifies_by_default() {
        let transport = select(&endpoint("https://www.api.com/"), false, Duration::from_secs(5));
        assert_eq!(transport.protocol(), Protocol::Https);
        assert_eq!(transport.port(), 443);
        assert!(transport.verifies_certificates());
        let settings = transport.settings();
        assert!(settings.https_only);
        assert!(!settings.accept_invalid_certs);
        assert!(transport.client().is_ok());
    }

    #[test]
    fn test_https_insecure_disables_verification() {
        let transport = select(&endpoint("https://www.api.com/"), true, Duration::from_secs(5));
        assert!(!transport.verifies_certificates());
        let settings = transport.settings();
        assert!(settings.https_only);
        assert!(settings.accept_invalid_certs);
        assert!(transport.client().is_ok());
    }

    #[test]
    fn test_plain_http_ignores_insecure_flag() {
        let transport = select(&endpoint("http://www.api.com/"), true, Duration::from_secs(5));
        assert_eq!(
            transport.settings(),
            ClientSettings {
                timeout: Duration::from_secs(5),
                https_only: false,
                accept_invalid_certs: false,
            }
        );
    }

    #[test]
    fn test_timeout_is_carried() {
        let transport = select(&endpoint("1.2.3.4"), false, Duration::from_secs(7));
        assert_eq!(transport.timeout(), Duration::from_secs(7));
    }
}
