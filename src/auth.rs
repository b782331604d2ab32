use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::protocol::{AuthMethod, AuthStatus, USERPASS_VERSION, Version};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// negotiate_method handles method selection between the SOCKS server and client.
/// The offered methods are read but not inspected: username/password is always
/// selected and clients that cannot follow will fail the next stage.
pub async fn negotiate_method<S>(stream: &mut S) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // ClientHello format
    // +----+----------+----------+
    // |VER | NMETHODS | METHODS  |
    // +----+----------+----------+
    // | 1  |    1     | 1 to 255 |
    // +----+----------+----------+

    // Instantiate handshake buffer & read
    let mut buf = [0u8; 2];
    stream.read_exact(&mut buf).await?;

    // Parse version and client methods from handshake
    let version = buf[0];
    let n_methods = buf[1];

    // Ensure version is 0x05 -> SOCKS5
    if version != Version::SOCKS5 as u8 {
        return Err(ProxyError::UnsupportedVersion(version));
    }

    let mut methods = vec![0u8; n_methods as usize];
    stream.read_exact(&mut methods).await?;

    debug!("client offered methods {:?}", methods);

    // ServerChoice method selection reply format
    // +----+--------+
    // |VER | METHOD |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    stream
        .write_all(&[Version::SOCKS5 as u8, AuthMethod::UserPass as u8])
        .await?;

    Ok(())
}

/// authenticate_userpass handles username/password authentication according to RFC 1929
pub async fn authenticate_userpass<S>(stream: &mut S, config: &Config) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Client Username/Password Request
    // +----+------+----------+------+----------+
    // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    // +----+------+----------+------+----------+
    // | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    // +----+------+----------+------+----------+

    // Sub-negotiation version -> 0x01 expected
    let ver = stream.read_u8().await?;
    if ver != USERPASS_VERSION {
        return Err(ProxyError::UnsupportedAuthVersion(ver));
    }

    // Read username
    let username_len = stream.read_u8().await?;
    let mut username = vec![0u8; username_len as usize];
    stream.read_exact(&mut username).await?;

    // Read password
    let password_len = stream.read_u8().await?;
    let mut password = vec![0u8; password_len as usize];
    stream.read_exact(&mut password).await?;

    let status = if credentials_match(config, &username, &password) {
        AuthStatus::Success
    } else {
        AuthStatus::Failure
    };

    // Username/Password Server response
    // +----+--------+
    // |VER | STATUS |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    stream.write_all(&[USERPASS_VERSION, status as u8]).await?;

    match status {
        AuthStatus::Success => Ok(()),
        AuthStatus::Failure => Err(ProxyError::AuthenticationFailed),
    }
}

/// credentials_match compares the supplied credentials byte for byte
/// against the configured pair
pub fn credentials_match(config: &Config, username: &[u8], password: &[u8]) -> bool {
    username == config.username.as_bytes() && password == config.password.as_bytes()
}
