use thiserror::Error;

/// Why a single domain could not be probed. None of these abort a run.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("cannot encode hostname {host}: {reason}")]
    Encoding { host: String, reason: String },
    #[error("resolution of {0} timed out")]
    ResolutionTimeout(String),
    #[error("resolution of {host} failed: {reason}")]
    Resolution { host: String, reason: String },
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),
    #[error("I/O error after handshake: {0}")]
    Io(#[source] std::io::Error),
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed HTTP response: {0}")]
    Protocol(String),
}

impl ProbeError {
    /// Short label used in logs and structured output.
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeError::Encoding { .. } => "encoding",
            ProbeError::ResolutionTimeout(_) => "resolution-timeout",
            ProbeError::Resolution { .. } => "resolution",
            ProbeError::Connect(_) => "connect",
            ProbeError::Io(_) => "io",
            ProbeError::TlsHandshake(_) => "tls-handshake",
            ProbeError::Timeout => "timeout",
            ProbeError::Protocol(_) => "protocol",
        }
    }
}
