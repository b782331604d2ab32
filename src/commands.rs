use crate::address::{TargetAddress, build_reply, parse_address_from_stream};
use crate::error::{ProxyError, Result};
use crate::protocol::{Command, ReplyCode, Version};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

/// Upper bound on establishing the outbound connection
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-direction relay buffer
const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// handle_socks_request checks the incoming request for SOCKS5 version number
/// and command and returns the requested CONNECT target. Anything other than
/// CONNECT is dropped without a reply.
pub async fn handle_socks_request<S>(stream: &mut S) -> Result<TargetAddress>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // SOCKS5 request format
    // +----+-----+-------+------+----------+----------+
    // |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    // +----+-----+-------+------+----------+----------+
    // | 1  |  1  | X'00' |  1   | Variable |    2     |
    // +----+-----+-------+------+----------+----------+

    // Instantiate a request buffer & read
    let mut reqbuf = [0u8; 3];
    stream.read_exact(&mut reqbuf).await?;

    let version = reqbuf[0];
    let command = reqbuf[1];
    // Not retrieving RSV (RESERVED) -> 0x00

    if version != Version::SOCKS5 as u8 {
        return Err(ProxyError::UnsupportedVersion(version));
    }

    match Command::from_byte(command) {
        Some(Command::Connect) => parse_address_from_stream(stream).await,
        _ => Err(ProxyError::UnsupportedCommand(command)),
    }
}

/// handle_connect dials the target and reports the outcome to the client.
/// Every dial failure, including a timeout, is reported as connection refused.
pub async fn handle_connect<S>(stream: &mut S, target: &TargetAddress) -> Result<TcpStream>
where
    S: AsyncWrite + Unpin,
{
    let dial_string = target.dial_string();

    let dialed = if !target.is_dialable() {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "domain name is not valid UTF-8",
        ))
    } else {
        match timeout(DIAL_TIMEOUT, TcpStream::connect(&dial_string)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "connect timed out")),
        }
    };

    match dialed {
        Ok(outbound) => {
            stream.write_all(&build_reply(ReplyCode::Succeeded)).await?;
            Ok(outbound)
        }
        Err(source) => {
            stream
                .write_all(&build_reply(ReplyCode::ConnectionRefused))
                .await?;
            Err(ProxyError::ConnectFailed {
                target: dial_string,
                source,
            })
        }
    }
}

/// Connect holds both legs of an established CONNECT session
pub struct Connect<I, O> {
    pub inbound: I,
    pub outbound: O,
}

impl<I, O> Connect<I, O>
where
    I: AsyncRead + AsyncWrite + Send + 'static,
    O: AsyncRead + AsyncWrite + Send + 'static,
{
    /// run relays bytes in both directions until both directions have
    /// finished and returns (client -> target, target -> client) byte counts.
    ///
    /// Whichever direction ends first, by EOF or by error, closes the leg it
    /// was writing to and stops the opposite direction, so neither task can
    /// outlive the other side.
    pub async fn run(self) -> Result<(u64, u64)> {
        let (inbound_read, inbound_write) = tokio::io::split(self.inbound);
        let (outbound_read, outbound_write) = tokio::io::split(self.outbound);

        let (upstream_done, upstream_finished) = oneshot::channel();
        let (downstream_done, downstream_finished) = oneshot::channel();

        let upstream = tokio::spawn(pump(
            inbound_read,
            outbound_write,
            downstream_finished,
            upstream_done,
        ));
        let downstream = tokio::spawn(pump(
            outbound_read,
            inbound_write,
            upstream_finished,
            downstream_done,
        ));

        let (from_client, from_server) = tokio::join!(upstream, downstream);
        let (from_client, from_server) = (flatten(from_client), flatten(from_server));

        debug!(
            "relay finished: {:?} bytes from client, {:?} bytes from server",
            from_client, from_server
        );

        Ok((from_client?, from_server?))
    }
}

/// pump copies one direction until its source ends or the opposite direction
/// finishes, then closes the write side it was feeding and tells the opposite
/// direction to stop.
async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    peer_finished: oneshot::Receiver<()>,
    finished: oneshot::Sender<()>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut copied = 0u64;

    let result = tokio::select! {
        result = copy_counted(&mut reader, &mut writer, &mut copied) => result,
        // Resolves on send or when the other pump is dropped
        _ = peer_finished => Ok(()),
    };

    // The peer may already be gone
    let _ = writer.shutdown().await;
    let _ = finished.send(());

    result.map(|()| copied)
}

/// copy_counted copies until EOF, keeping a running byte count that
/// survives cancellation
async fn copy_counted<R, W>(reader: &mut R, writer: &mut W, copied: &mut u64) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return writer.flush().await;
        }

        writer.write_all(&buf[..n]).await?;
        *copied += n as u64;
    }
}

/// flatten folds a relay task's join outcome into its copy result
fn flatten(
    joined: std::result::Result<io::Result<u64>, tokio::task::JoinError>,
) -> io::Result<u64> {
    joined.unwrap_or_else(|e| Err(io::Error::other(e)))
}
