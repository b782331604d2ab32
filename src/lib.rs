//! A minimal SOCKS5 proxy library
//!
//! ## SOCKS5 Implementation
//!
//! - Features:
//!     - CONNECT only (BIND and UDP ASSOCIATE requests are dropped)
//!     - Username/Password Authentication against a single configured pair
//!     - IPv4, IPv6 and domain name targets; domains are resolved by the dialer
//!     - Async using tokio, one task per client plus one per relay direction
//!     - Handshake deadline, no deadline on the relay
//! - [SOCKS5 (RFC 1928)](https://datatracker.ietf.org/doc/html/rfc1928)
//! - [Username/Password Authentication (RFC 1929)](https://datatracker.ietf.org/doc/html/rfc1929)
//!
//! # Example
//! ```no_run
//! use authsocks::{Config, Socks5Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::new(1080, "admin", "123456")?;
//!     let mut server = Socks5Server::new(config);
//!     server.run().await
//! }
//! ```

pub mod address;
pub mod auth;
pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod server;

// Re-export main types at crate root for convenience
pub use address::{Address, TargetAddress};
pub use config::Config;
pub use error::ProxyError;
pub use protocol::{AuthMethod, Command, ReplyCode, Version};
pub use server::Socks5Server;
