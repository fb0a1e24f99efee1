use std::error::Error as StdError;

/// Why a single status request to the device failed.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP status {code} {reason}")]
    Status { code: u16, reason: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote disconnected: {0}")]
    Disconnect(String),
    #[error("timed out")]
    Timeout,
}

impl FetchError {
    /// Short label used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Transport(_) => "transport",
            Self::Disconnect(_) => "disconnect",
            Self::Timeout => "timeout",
        }
    }

    pub fn from_status(status: reqwest::StatusCode) -> Self {
        Self::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
        }
    }
}

// hyper's wording when the peer hangs up before a full response arrived.
const INCOMPLETE_MESSAGE: &str = "connection closed before message completed";

fn is_disconnect(err: &reqwest::Error) -> bool {
    if err.is_body() || err.is_decode() {
        return true;
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::BrokenPipe
            ) {
                return true;
            }
        }
        if e.to_string().contains(INCOMPLETE_MESSAGE) {
            return true;
        }
        source = e.source();
    }
    false
}

fn root_reason(err: &reqwest::Error) -> String {
    let mut reason = err.to_string();
    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(e) = source {
        reason = e.to_string();
        source = e.source();
    }
    reason
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout;
        }
        if let Some(status) = err.status() {
            return Self::from_status(status);
        }
        if is_disconnect(&err) {
            return Self::Disconnect(root_reason(&err));
        }
        Self::Transport(root_reason(&err))
    }
}

/// Structural mismatch between the payload and the expected status layout.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error("`{0}` is not an array")]
    NotAnArray(String),
    #[error("outlet {outlet} has {found} sensor entries, expected {expected}")]
    SlotCount {
        outlet: usize,
        expected: usize,
        found: usize,
    },
    #[error("outlet {outlet} slot {slot} has no numeric `v`")]
    NonNumeric { outlet: usize, slot: usize },
    #[error("outlet index {0} does not fit an outlet id")]
    OutletIndex(usize),
}

/// Failures constructing a [`crate::device::PduStatusClient`].
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}
