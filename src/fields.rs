//! DynDNS update parameters.
//!
//! See <https://help.dyn.com/remote-access-api/perform-update/> for the
//! meaning of each field.

use crate::endpoint::{is_hostname, is_ipv4};
use crate::error::UpdateError;
use std::str::FromStr;

/// A single update may carry at most this many hostnames
pub const MAX_HOSTNAMES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum System {
    #[default]
    Dyndns,
    Statdns,
}

impl System {
    pub fn as_str(self) -> &'static str {
        match self {
            System::Dyndns => "dyndns",
            System::Statdns => "statdns",
        }
    }
}

/// Value of the wildcard, backmx and offline switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    On,
    Off,
    #[default]
    NoChg,
    Yes,
    No,
}

impl Toggle {
    pub fn as_str(self) -> &'static str {
        match self {
            Toggle::On => "ON",
            Toggle::Off => "OFF",
            Toggle::NoChg => "NOCHG",
            Toggle::Yes => "YES",
            Toggle::No => "NO",
        }
    }
}

impl FromStr for Toggle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ON" => Ok(Toggle::On),
            "OFF" => Ok(Toggle::Off),
            "NOCHG" => Ok(Toggle::NoChg),
            "YES" => Ok(Toggle::Yes),
            "NO" => Ok(Toggle::No),
            other => Err(format!("unknown switch value '{}'", other)),
        }
    }
}

/// The fixed DynDNS field set sent with every update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateFields {
    system: System,
    hostname: String,
    myip: String,
    wildcard: Toggle,
    mx: String,
    backmx: Toggle,
    offline: Toggle,
    url: String,
}

impl UpdateFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the hostnames with commas.
    ///
    /// Each entry may itself be a comma-separated list. Every resulting token
    /// must be a non-empty RFC 1123 hostname and there may be at most
    /// [`MAX_HOSTNAMES`] of them. The field is left untouched on error.
    pub fn set_hostname<S: AsRef<str>>(&mut self, hostnames: &[S]) -> Result<(), UpdateError> {
        let mut tokens = Vec::new();
        for entry in hostnames {
            for token in entry.as_ref().split(',') {
                let token = token.trim();
                if token.is_empty() {
                    return Err(UpdateError::validation(
                        "hostname",
                        entry.as_ref(),
                        "empty hostname in list",
                    ));
                }
                if !is_hostname(token) {
                    return Err(UpdateError::validation("hostname", token, "not an RFC 1123 hostname"));
                }
                tokens.push(token);
            }
        }

        if tokens.len() > MAX_HOSTNAMES {
            return Err(UpdateError::validation(
                "hostname",
                &tokens.join(","),
                format!("{} hostnames given, at most {} allowed", tokens.len(), MAX_HOSTNAMES),
            ));
        }

        self.hostname = tokens.join(",");
        Ok(())
    }

    /// Set the address to publish; rejected values leave the field unset.
    pub fn set_myip(&mut self, ip: &str) -> Result<(), UpdateError> {
        if !is_ipv4(ip) {
            return Err(UpdateError::validation("ip address", ip, "not a dotted-quad IPv4 address"));
        }
        self.myip = ip.to_string();
        Ok(())
    }

    /// Only ON, OFF and NOCHG are meaningful for wildcard.
    pub fn set_wildcard(&mut self, value: &str) -> Result<(), UpdateError> {
        let toggle = match value.parse::<Toggle>() {
            Ok(t @ (Toggle::On | Toggle::Off | Toggle::NoChg)) => t,
            _ => return Err(UpdateError::validation("wildcard", value, "expected ON, OFF or NOCHG")),
        };
        self.wildcard = toggle;
        Ok(())
    }

    pub fn set_backmx(&mut self, value: &str) -> Result<(), UpdateError> {
        self.backmx = value
            .parse()
            .map_err(|reason: String| UpdateError::validation("backmx", value, reason))?;
        Ok(())
    }

    pub fn set_mx(&mut self, mx: &str) -> Result<(), UpdateError> {
        if !is_hostname(mx) {
            return Err(UpdateError::validation("mx", mx, "not an RFC 1123 hostname"));
        }
        self.mx = mx.to_string();
        Ok(())
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.offline = if offline { Toggle::Yes } else { Toggle::NoChg };
    }

    pub fn set_static(&mut self, statdns: bool) {
        self.system = if statdns { System::Statdns } else { System::Dyndns };
    }

    pub fn set_url(&mut self, url: &str) {
        self.url = url.to_string();
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn myip(&self) -> &str {
        &self.myip
    }

    /// Render the query string.
    ///
    /// `hostname` always comes first, followed by every non-empty field in a
    /// fixed order: myip, system, wildcard, mx, backmx, offline, url.
    pub fn render(&self) -> String {
        let rest = [
            ("myip", self.myip.as_str()),
            ("system", self.system.as_str()),
            ("wildcard", self.wildcard.as_str()),
            ("mx", self.mx.as_str()),
            ("backmx", self.backmx.as_str()),
            ("offline", self.offline.as_str()),
            ("url", self.url.as_str()),
        ];

        let mut query = format!("hostname={}", urlencoding::encode(&self.hostname));
        for (key, value) in rest.iter().filter(|(_, value)| !value.is_empty()) {
            query.push('&');
            query.push_str(key);
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }
        query
    }
}
