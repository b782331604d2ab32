use anyhow::{Result, bail};
use std::net::{Ipv4Addr, SocketAddr};

/// Default SOCKS5 listen port
pub const DEFAULT_PORT: u16 = 1080;

/// Config is the static server configuration. It is built once at
/// startup and only ever shared read-only.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_port: u16,
    pub username: String,
    pub password: String,
}

impl Config {
    /// new validates and builds a Config; both credentials are required
    pub fn new(
        listen_port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.is_empty() || password.is_empty() {
            bail!("[ERR] both username and password must be provided");
        }

        Ok(Self {
            listen_port,
            username,
            password,
        })
    }

    /// listen_addr binds on all interfaces
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.listen_port))
    }
}
