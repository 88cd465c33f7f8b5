use std::fmt;

/// Startup/bootstrap failures. The dispatcher itself never raises to its
/// caller — it always resolves to an HTTP response (see `dispatch`) — so
/// this type only covers process-init error paths.
#[derive(Debug)]
pub enum ProxyError {
    InvalidListenAddr(String),
    Bind(String),
    Internal(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidListenAddr(addr) => write!(f, "invalid listen address: {addr}"),
            ProxyError::Bind(msg) => write!(f, "failed to bind listener: {msg}"),
            ProxyError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ProxyError {}
