use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProxyError>;

/// ProxyError names every reason a client connection can be aborted.
/// None of these are sent to the client; they exist for logging.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("unsupported SOCKS version: {0:#04x}")]
    UnsupportedVersion(u8),

    #[error("unsupported username/password sub-negotiation version: {0:#04x}")]
    UnsupportedAuthVersion(u8),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("unsupported command: {0:#04x}")]
    UnsupportedCommand(u8),

    #[error("unsupported address type: {0:#04x}")]
    UnsupportedAddressType(u8),

    #[error("handshake did not complete in time")]
    HandshakeTimeout,

    #[error("failed to connect to {target}: {source}")]
    ConnectFailed {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("network error: {0}")]
    Io(#[from] io::Error),
}

impl ProxyError {
    /// is_truncated reports whether the peer closed before a frame was complete
    pub fn is_truncated(&self) -> bool {
        matches!(self, ProxyError::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof)
    }
}
