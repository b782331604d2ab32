//! End-to-end tests: a real Socks5Server on an ephemeral port, a tokio
//! target server, and a hand-rolled SOCKS5 client.

use authsocks::{Config, Socks5Server};
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const USER: &str = "admin";
const PASS: &str = "123456";

/// Start the proxy on an OS-assigned port and return its loopback address
async fn start_proxy(max_connections: Option<usize>) -> SocketAddr {
    let config = Config::new(0, USER, PASS).unwrap();
    let mut server = Socks5Server::new(config)
        .with_max_connections(max_connections.and_then(NonZeroUsize::new));
    let bound = server.bind().await.unwrap();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    SocketAddr::from(([127, 0, 0, 1], bound.port()))
}

/// Start a target that echoes everything back until the peer closes
async fn start_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });

    addr
}

/// Run method selection and authentication, returning the auth status byte
async fn authenticate(stream: &mut TcpStream, user: &str, pass: &str) -> u8 {
    stream.write_all(&[0x05, 0x02, 0x00, 0x02]).await.unwrap();
    let mut method = [0u8; 2];
    stream.read_exact(&mut method).await.unwrap();
    assert_eq!(method, [0x05, 0x02]);

    let mut frame = vec![0x01, user.len() as u8];
    frame.extend_from_slice(user.as_bytes());
    frame.push(pass.len() as u8);
    frame.extend_from_slice(pass.as_bytes());
    stream.write_all(&frame).await.unwrap();

    let mut status = [0u8; 2];
    stream.read_exact(&mut status).await.unwrap();
    assert_eq!(status[0], 0x01);
    status[1]
}

/// Send a CONNECT for an IPv4 target and return the full reply
async fn connect_ipv4(stream: &mut TcpStream, target: SocketAddr) -> [u8; 10] {
    let SocketAddr::V4(v4) = target else {
        panic!("expected IPv4 target");
    };
    let mut request = vec![0x05, 0x01, 0x00, 0x01];
    request.extend_from_slice(&v4.ip().octets());
    request.extend_from_slice(&v4.port().to_be_bytes());
    stream.write_all(&request).await.unwrap();

    let mut reply = [0u8; 10];
    stream.read_exact(&mut reply).await.unwrap();
    reply
}

async fn read_until_closed(stream: &mut TcpStream) -> Vec<u8> {
    let mut rest = Vec::new();
    timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("connection was not closed")
        .unwrap();
    rest
}

#[tokio::test]
async fn echo_through_proxy() {
    let proxy = start_proxy(None).await;
    let echo = start_echo_server().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    assert_eq!(
        connect_ipv4(&mut client, echo).await,
        [0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
    );

    let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let (mut reader, mut writer) = client.into_split();
    let sent = payload.clone();
    let send = tokio::spawn(async move {
        writer.write_all(&sent).await.unwrap();
        writer
    });

    let mut received = vec![0u8; payload.len()];
    timeout(Duration::from_secs(5), reader.read_exact(&mut received))
        .await
        .expect("echo did not finish")
        .unwrap();
    drop(send.await.unwrap());

    assert_eq!(received, payload);
}

#[tokio::test]
async fn connect_by_domain_name() {
    let proxy = start_proxy(None).await;
    let echo = start_echo_server().await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);

    let mut request = vec![0x05, 0x01, 0x00, 0x03, 9];
    request.extend_from_slice(b"localhost");
    request.extend_from_slice(&echo.port().to_be_bytes());
    client.write_all(&request).await.unwrap();

    let mut reply = [0u8; 10];
    client.read_exact(&mut reply).await.unwrap();
    assert_eq!(reply[..2], [0x05, 0x00]);

    client.write_all(b"via domain").await.unwrap();
    let mut buf = [0u8; 10];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"via domain");
}

#[tokio::test]
async fn target_close_reaches_client() {
    let proxy = start_proxy(None).await;

    let target = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = target.accept().await.unwrap();
        stream.write_all(b"bye").await.unwrap();
    });

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    assert_eq!(connect_ipv4(&mut client, target_addr).await[1], 0x00);

    assert_eq!(read_until_closed(&mut client).await, b"bye");
}

#[tokio::test]
async fn client_close_reaches_target() {
    let proxy = start_proxy(None).await;
    let target = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_addr = target.local_addr().unwrap();

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    assert_eq!(connect_ipv4(&mut client, target_addr).await[1], 0x00);

    let (mut peer, _) = target.accept().await.unwrap();
    client.write_all(b"last words").await.unwrap();
    drop(client);

    assert_eq!(read_until_closed(&mut peer).await, b"last words");
}

#[tokio::test]
async fn wrong_password_is_rejected_and_closed() {
    let proxy = start_proxy(None).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, "1234567").await, 0x01);

    assert!(read_until_closed(&mut client).await.is_empty());
}

#[tokio::test]
async fn closed_target_port_is_refused() {
    let proxy = start_proxy(None).await;
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    assert_eq!(
        connect_ipv4(&mut client, closed).await,
        [0x05, 0x05, 0x00, 0x01, 0, 0, 0, 0, 0, 0]
    );

    assert!(read_until_closed(&mut client).await.is_empty());
}

#[tokio::test]
async fn truncated_greeting_gets_no_reply() {
    let proxy = start_proxy(None).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    // NMETHODS=3 but only one method byte
    client.write_all(&[0x05, 0x03, 0x02]).await.unwrap();
    client.shutdown().await.unwrap();

    assert!(read_until_closed(&mut client).await.is_empty());
}

#[tokio::test]
async fn bind_command_is_dropped() {
    let proxy = start_proxy(None).await;

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    client
        .write_all(&[0x05, 0x02, 0x00, 0x01, 127, 0, 0, 1, 0x00, 0x50])
        .await
        .unwrap();

    assert!(read_until_closed(&mut client).await.is_empty());
}

#[tokio::test]
async fn server_keeps_accepting_after_bad_clients() {
    let proxy = start_proxy(None).await;
    let echo = start_echo_server().await;

    for _ in 0..3 {
        let mut bad = TcpStream::connect(proxy).await.unwrap();
        bad.write_all(&[0x04, 0x01]).await.unwrap();
        assert!(read_until_closed(&mut bad).await.is_empty());
    }

    let mut client = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut client, USER, PASS).await, 0x00);
    assert_eq!(connect_ipv4(&mut client, echo).await[1], 0x00);
}

#[tokio::test]
async fn connection_limit_frees_slots() {
    let proxy = start_proxy(Some(1)).await;
    let echo = start_echo_server().await;

    // Occupy and then release the only slot
    let mut first = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut first, USER, PASS).await, 0x00);
    drop(first);

    let mut second = TcpStream::connect(proxy).await.unwrap();
    let status = timeout(Duration::from_secs(5), authenticate(&mut second, USER, PASS))
        .await
        .expect("second client was never served");
    assert_eq!(status, 0x00);
    assert_eq!(connect_ipv4(&mut second, echo).await[1], 0x00);
}

#[tokio::test]
async fn client_leaving_frees_slot_held_by_silent_target() {
    let proxy = start_proxy(Some(1)).await;
    let echo = start_echo_server().await;

    // A target that accepts and then keeps its socket open without writing
    let silent = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap();
    let (held_tx, held_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (stream, _) = silent.accept().await.unwrap();
        let _ = held_tx.send(stream);
    });

    let mut first = TcpStream::connect(proxy).await.unwrap();
    assert_eq!(authenticate(&mut first, USER, PASS).await, 0x00);
    assert_eq!(connect_ipv4(&mut first, silent_addr).await[1], 0x00);
    let mut held = held_rx.await.unwrap();
    drop(first);

    // The only slot must come back even though the target never closes
    let mut second = TcpStream::connect(proxy).await.unwrap();
    let status = timeout(Duration::from_secs(5), authenticate(&mut second, USER, PASS))
        .await
        .expect("slot was never released");
    assert_eq!(status, 0x00);
    assert_eq!(connect_ipv4(&mut second, echo).await[1], 0x00);

    assert!(read_until_closed(&mut held).await.is_empty());
}
