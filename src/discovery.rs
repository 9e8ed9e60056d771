//! Discovery protocol client for the configuration endpoint.
//!
//! The configuration endpoint speaks the cache wire protocol's text command
//! channel. Discovery opens a short-lived connection, probes the engine
//! version, then asks for the cluster configuration:
//!
//! - engines at [`CONFIG_COMMAND_MIN_VERSION`] or newer answer
//!   `config get cluster`;
//! - older engines publish the same payload under the well-known pseudo-key
//!   [`LEGACY_CONFIG_KEY`].
//!
//! The payload carries a config version counter on one line and a
//! whitespace-separated list of `host|ip|port` tuples on the next,
//! terminated by `END`. Parsing tolerates whitespace and ordering variation
//! but fails loudly on structurally invalid tuples.
//!
//! No retry happens here; callers re-invoke discovery on their next demand.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time;

use crate::error::{Error, Result};
use crate::types::{
    CacheNode, ConfigEndpoint, CONFIG_COMMAND_MIN_VERSION, DEFAULT_DISCOVERY_TIMEOUT,
    LEGACY_CONFIG_KEY,
};

/// Seam over the discovery exchange so membership can be exercised without a
/// live configuration endpoint.
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Learn the current node list from the configuration endpoint.
    async fn discover(
        &self,
        endpoint: &ConfigEndpoint,
        timeout: Option<Duration>,
        ignore_errors: bool,
    ) -> Result<Vec<CacheNode>>;
}

/// The real wire-protocol discovery client.
#[derive(Debug, Default)]
pub struct ConfigEndpointDiscovery;

impl ConfigEndpointDiscovery {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Discovery for ConfigEndpointDiscovery {
    async fn discover(
        &self,
        endpoint: &ConfigEndpoint,
        timeout: Option<Duration>,
        ignore_errors: bool,
    ) -> Result<Vec<CacheNode>> {
        let limit = timeout.unwrap_or(DEFAULT_DISCOVERY_TIMEOUT);

        let outcome = match time::timeout(limit, run_exchange(endpoint)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Connectivity {
                endpoint: endpoint.address(),
                source: io::Error::new(io::ErrorKind::TimedOut, "discovery timed out"),
            }),
        };

        match outcome {
            Ok(nodes) => {
                debug!("discovery via {} returned {} node(s)", endpoint, nodes.len());
                Ok(nodes)
            }
            Err(err) if ignore_errors => {
                // Documented degrade policy: treat the configuration endpoint
                // itself as the only cache node.
                warn!(
                    "discovery via {} failed ({}), degrading to the endpoint itself",
                    endpoint, err
                );
                Ok(vec![CacheNode::new(endpoint.host.clone(), endpoint.port)])
            }
            Err(err) => Err(err),
        }
    }
}

async fn run_exchange(endpoint: &ConfigEndpoint) -> Result<Vec<CacheNode>> {
    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))
        .await
        .map_err(|source| Error::Connectivity {
            endpoint: endpoint.address(),
            source,
        })?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    send(endpoint, &mut write_half, "version\r\n").await?;
    let version_line = read_line(endpoint, &mut reader).await?;
    let version = parse_version(&version_line)?;

    let command = if version >= CONFIG_COMMAND_MIN_VERSION {
        "config get cluster\r\n".to_string()
    } else {
        format!("get {LEGACY_CONFIG_KEY}\r\n")
    };
    send(endpoint, &mut write_half, &command).await?;

    let mut payload = Vec::new();
    loop {
        let line = read_line(endpoint, &mut reader).await?;
        let trimmed = line.trim();
        if trimmed == "END" {
            break;
        }
        if trimmed == "ERROR"
            || trimmed.starts_with("CLIENT_ERROR")
            || trimmed.starts_with("SERVER_ERROR")
        {
            return Err(Error::Protocol(format!(
                "configuration endpoint rejected the discovery command: {trimmed}"
            )));
        }
        payload.push(line);
    }

    parse_node_payload(&payload)
}

async fn send(endpoint: &ConfigEndpoint, write_half: &mut OwnedWriteHalf, command: &str) -> Result<()> {
    write_half
        .write_all(command.as_bytes())
        .await
        .map_err(|source| Error::Connectivity {
            endpoint: endpoint.address(),
            source,
        })
}

async fn read_line(
    endpoint: &ConfigEndpoint,
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<String> {
    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .await
        .map_err(|source| Error::Connectivity {
            endpoint: endpoint.address(),
            source,
        })?;
    if read == 0 {
        return Err(Error::Connectivity {
            endpoint: endpoint.address(),
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "configuration endpoint closed the connection",
            ),
        });
    }
    Ok(line)
}

/// Parse a `VERSION x.y.z` reply into a comparable triple. Non-numeric
/// suffixes on a component (`1.4.14-beta`) are tolerated.
fn parse_version(line: &str) -> Result<(u64, u64, u64)> {
    let mut tokens = line.split_whitespace();
    let (Some("VERSION"), Some(version)) = (tokens.next(), tokens.next()) else {
        return Err(Error::Protocol(format!(
            "unrecognized version response: {:?}",
            line.trim()
        )));
    };

    let mut parts = version.split('.').map(|part| {
        part.chars()
            .take_while(|c| c.is_ascii_digit())
            .collect::<String>()
            .parse::<u64>()
            .ok()
    });
    let major = parts.next().flatten().ok_or_else(|| {
        Error::Protocol(format!("unparsable engine version: {version:?}"))
    })?;
    let minor = parts.next().flatten().unwrap_or(0);
    let patch = parts.next().flatten().unwrap_or(0);
    Ok((major, minor, patch))
}

/// Extract the node list from the response payload: skip the reply header and
/// the config version counter, then parse the line of `host|ip|port` tuples.
fn parse_node_payload(lines: &[String]) -> Result<Vec<CacheNode>> {
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.starts_with("CONFIG ")
            || trimmed.starts_with("VALUE ")
        {
            continue;
        }
        if trimmed.contains('|') {
            return parse_node_line(trimmed);
        }
    }
    Err(Error::Protocol(
        "discovery response carried no node list".to_string(),
    ))
}

fn parse_node_line(line: &str) -> Result<Vec<CacheNode>> {
    let mut nodes = Vec::new();
    for entry in line.split_whitespace() {
        let fields: Vec<&str> = entry.split('|').collect();
        let [hostname, ip, port] = fields[..] else {
            return Err(Error::Protocol(format!("malformed node entry {entry:?}")));
        };
        // The ip field may be empty while the cluster is still resolving it.
        let host = if ip.is_empty() { hostname } else { ip };
        if host.is_empty() {
            return Err(Error::Protocol(format!(
                "node entry without host or ip: {entry:?}"
            )));
        }
        let port = port.parse::<u16>().map_err(|_| {
            Error::Protocol(format!("invalid port in node entry {entry:?}"))
        })?;
        nodes.push(CacheNode::new(host, port));
    }
    if nodes.is_empty() {
        return Err(Error::Protocol(
            "discovery response carried an empty node list".to_string(),
        ));
    }
    Ok(nodes)
}
