use crate::config::RunConfig;
use crate::error::{NetworkErrorKind, UpdateError};
use crate::transport;
use std::error::Error;
use std::io::{self, Read};

/// Longest server answer kept; DynDNS replies are a few words per hostname
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Steps of a single update exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Connecting,
    RequestSent,
    ResponseReceived,
    Success,
    AuthRequired,
    Failed,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Success | QueryState::AuthRequired | QueryState::Failed
        )
    }

    fn can_move_to(self, next: QueryState) -> bool {
        use QueryState::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, RequestSent)
                | (Connecting, Failed)
                | (RequestSent, ResponseReceived)
                | (RequestSent, Failed)
                | (ResponseReceived, Success)
                | (ResponseReceived, AuthRequired)
                | (ResponseReceived, Failed)
        )
    }
}

struct Exchange {
    state: QueryState,
}

impl Exchange {
    fn new() -> Self {
        Exchange { state: QueryState::Idle }
    }

    fn advance(&mut self, next: QueryState) {
        debug_assert!(!self.state.is_terminal(), "query already finished");
        debug_assert!(
            self.state.can_move_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        log::trace!("query state {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Status line and body of the server answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    pub status: u16,
    pub body: String,
}

impl ServerReply {
    /// First word of the body, e.g. `good` or `nochg`.
    pub fn return_code(&self) -> Option<&str> {
        self.body.split_whitespace().next()
    }
}

/// Human-readable meaning of a DynDNS return code.
pub fn describe_return_code(code: &str) -> Option<&'static str> {
    let text = match code {
        "good" => "update successful",
        "nochg" => "no change needed, the address was already set",
        "badauth" => "bad authorization (username or password)",
        "notfqdn" => "not a fully-qualified domain name",
        "nohost" => "hostname doesn't exist",
        "numhost" => "too many hosts specified",
        "!yours" => "hostname exists but not under this account",
        "abuse" => "hostname blocked for abuse",
        "badagent" => "user agent rejected by the server",
        "!donator" => "feature requires a donator account",
        "!active" => "hostname not activated",
        "dnserr" => "DNS error on server",
        "911" => "server maintenance, try again later",
        _ => return None,
    };
    Some(text)
}

/// `{endpoint path without trailing slash}{api path}?{fields}`
pub fn request_target(config: &RunConfig) -> String {
    format!(
        "{}{}?{}",
        config.endpoint.base_path(),
        config.api_path,
        config.fields.render()
    )
}

/// Send the update, exactly once.
///
/// 200 is a success and 401 means authentication is needed. Any other status
/// is a failure, while transport problems come back as `UpdateError::Network`.
/// The client and its connection are dropped before this returns.
pub fn execute(config: &RunConfig) -> Result<ServerReply, UpdateError> {
    let transport = transport::select(&config.endpoint, config.tls_insecure, config.timeout);
    let client = transport.client()?;
    log::debug!(
        "-> {} on port {}, timeout {:?}",
        transport.protocol(),
        transport.port(),
        transport.timeout()
    );
    let url = format!("{}{}", transport.origin(), request_target(config));
    log::debug!("set final url to \"{}\"", url);

    let mut request = client
        .get(&url)
        .header(reqwest::header::USER_AGENT, crate::USER_AGENT);
    match &config.credentials {
        Some(credentials) => {
            log::debug!("-> authentication enabled for {}", credentials.username);
            request = request.header(reqwest::header::AUTHORIZATION, credentials.authorization());
        }
        None => log::debug!("-> authentication disabled"),
    }

    let mut exchange = Exchange::new();
    exchange.advance(QueryState::Connecting);

    let response = match request.send() {
        Ok(response) => response,
        Err(e) => {
            let failed_at = if e.is_connect() {
                QueryState::Connecting
            } else {
                exchange.advance(QueryState::RequestSent);
                QueryState::RequestSent
            };
            exchange.advance(QueryState::Failed);
            let kind = classify(&e);
            log::debug!("=> {} while {:?}: {}", kind, failed_at, error_chain(&e));
            return Err(UpdateError::Network {
                kind,
                detail: error_chain(&e),
            });
        }
    };
    exchange.advance(QueryState::RequestSent);

    let status = response.status();
    let mut raw = Vec::new();
    if let Err(e) = response.take(MAX_BODY_BYTES).read_to_end(&mut raw) {
        exchange.advance(QueryState::Failed);
        return Err(UpdateError::Network {
            kind: classify(&e),
            detail: error_chain(&e),
        });
    }
    let body = String::from_utf8_lossy(&raw).into_owned();
    exchange.advance(QueryState::ResponseReceived);

    log::debug!("get HTTP status code : {}", status);
    log::debug!("get HTTP data : \"{}\"", body.trim());

    let reply = ServerReply {
        status: status.as_u16(),
        body,
    };
    if let Some(meaning) = reply.return_code().and_then(describe_return_code) {
        log::info!("server says: {}", meaning);
    }

    match reply.status {
        200 => {
            exchange.advance(QueryState::Success);
            Ok(reply)
        }
        401 => {
            exchange.advance(QueryState::AuthRequired);
            log::debug!(
                "=> the server at url \"{}\" may require an authentication",
                config.endpoint.raw
            );
            Err(UpdateError::AuthRequired)
        }
        other => {
            exchange.advance(QueryState::Failed);
            Err(UpdateError::Failure(other))
        }
    }
}

/// Sort a transport error into resolution, refusal, timeout, TLS or framing trouble.
fn classify(err: &(dyn Error + 'static)) -> NetworkErrorKind {
    let mut connect = false;
    let mut source = Some(err);
    while let Some(cause) = source {
        let mut next = cause.source();
        if let Some(req_err) = cause.downcast_ref::<reqwest::Error>() {
            if req_err.is_timeout() {
                return NetworkErrorKind::Timeout;
            }
            connect |= req_err.is_connect();
        } else {
            let mut wraps_reqwest = false;
            if let Some(io_err) = cause.downcast_ref::<io::Error>() {
                match io_err.kind() {
                    io::ErrorKind::TimedOut => return NetworkErrorKind::Timeout,
                    io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted => return NetworkErrorKind::Connect,
                    _ => {}
                }
                // io::Error::source skips the wrapped error itself
                if let Some(inner) = io_err.get_ref() {
                    wraps_reqwest = inner.is::<reqwest::Error>();
                    next = Some(inner as &(dyn Error + 'static));
                }
            }
            // reqwest's own message carries the request URL, so only causes are matched
            if !wraps_reqwest {
                if let Some(kind) = classify_message(&cause.to_string()) {
                    return kind;
                }
            }
        }
        source = next;
    }

    if connect {
        NetworkErrorKind::Connect
    } else {
        NetworkErrorKind::MalformedResponse
    }
}

/// Recognise resolver and TLS failures from the text of a lower-level error.
fn classify_message(text: &str) -> Option<NetworkErrorKind> {
    let text = text.to_lowercase();
    if text.contains("dns error") || text.contains("failed to lookup address") {
        return Some(NetworkErrorKind::Resolve);
    }
    const TLS_MARKERS: [&str; 6] = [
        "certificate",
        "tls",
        "handshake",
        "corrupt message",
        "received fatal alert",
        "peer is incompatible",
    ];
    if TLS_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Some(NetworkErrorKind::Tls);
    }
    None
}

fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}
