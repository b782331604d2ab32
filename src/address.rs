use crate::error::{ProxyError, Result};
use crate::protocol::{AddressType, RSV, ReplyCode, Version};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Address represents a network address or domain to be used as the
/// SOCKS5 target address
#[derive(Debug, Clone, PartialEq)]
pub enum Address {
    IPv4(Ipv4Addr),
    DomainName(String),
    IPv6(Ipv6Addr),
}

/// TargetAddress represents the destination of a CONNECT request
#[derive(Debug, Clone, PartialEq)]
pub struct TargetAddress {
    pub address: Address,
    pub port: u16,
}

impl TargetAddress {
    /// host renders the address part of the dial string. IPv6 is
    /// bracketed so that appending ":port" stays unambiguous.
    pub fn host(&self) -> String {
        match &self.address {
            Address::IPv4(ip) => ip.to_string(),
            Address::DomainName(domain) => domain.clone(),
            Address::IPv6(ip) => format!("[{ip}]"),
        }
    }

    /// is_dialable is false for domains that were not valid UTF-8 on the wire
    pub fn is_dialable(&self) -> bool {
        match &self.address {
            Address::DomainName(domain) => !domain.contains(char::REPLACEMENT_CHARACTER),
            _ => true,
        }
    }

    /// dial_string renders "host:port" for the outbound dialer. Domains
    /// are left for the dialer to resolve.
    pub fn dial_string(&self) -> String {
        format!("{}:{}", self.host(), self.port)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host(), self.port)
    }
}

/// parse_address_from_stream reads ATYP, DST.ADDR and DST.PORT from
/// an incoming client request
pub async fn parse_address_from_stream<R>(stream: &mut R) -> Result<TargetAddress>
where
    R: AsyncRead + Unpin,
{
    // Read address type byte from stream
    let atyp = stream.read_u8().await?;

    let address = match AddressType::from_byte(atyp) {
        Some(AddressType::IPv4) => {
            let mut addr = [0u8; 4];
            stream.read_exact(&mut addr).await?;
            Address::IPv4(Ipv4Addr::from(addr))
        }
        Some(AddressType::DomainName) => {
            // First octet in DomainName contains the number of
            // octets to follow
            let len = stream.read_u8().await?;

            // Undecodable bytes become U+FFFD and fail at dial time
            let mut domain = vec![0u8; len as usize];
            stream.read_exact(&mut domain).await?;
            Address::DomainName(String::from_utf8_lossy(&domain).into_owned())
        }
        Some(AddressType::IPv6) => {
            let mut addr = [0u8; 16];
            stream.read_exact(&mut addr).await?;
            Address::IPv6(Ipv6Addr::from(addr))
        }
        None => return Err(ProxyError::UnsupportedAddressType(atyp)),
    };

    // Port -> BigEndian (network order)
    let port = stream.read_u16().await?;

    Ok(TargetAddress { address, port })
}

/// build_reply encodes a CONNECT reply. BND.ADDR and BND.PORT are
/// always reported as 0.0.0.0:0.
pub fn build_reply(reply_code: ReplyCode) -> [u8; 10] {
    // SOCKS5 reply format
    // +----+-----+-------+------+----------+----------+
    // |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
    // +----+-----+-------+------+----------+----------+
    // | 1  |  1  | X'00' |  1   |    4     |    2     |
    // +----+-----+-------+------+----------+----------+
    [
        Version::SOCKS5 as u8,
        reply_code as u8,
        RSV,
        AddressType::IPv4 as u8,
        0,
        0,
        0,
        0,
        0,
        0,
    ]
}
