//! Concrete probes: Bolt handshake, Qdrant collection listing, Redis PING

use super::{ProbeError, ServiceProbe};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Bolt magic preamble
const BOLT_MAGIC: [u8; 4] = [0x60, 0x60, 0xB0, 0x17];

/// Proposed versions, newest first: 5.4-5.0, 4.4-4.2, 4.1, 3.0
const BOLT_VERSIONS: [[u8; 4]; 4] = [
    [0x00, 0x04, 0x04, 0x05],
    [0x00, 0x02, 0x04, 0x04],
    [0x00, 0x00, 0x01, 0x04],
    [0x00, 0x00, 0x00, 0x03],
];

fn parse_url(raw: &str) -> Result<Url, ProbeError> {
    Url::parse(raw).map_err(|e| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })
}

fn host_port(url: &Url, raw: &str, default_port: u16) -> Result<String, ProbeError> {
    let host = url.host_str().ok_or_else(|| ProbeError::InvalidUrl {
        url: raw.to_string(),
        reason: "missing host".to_string(),
    })?;
    Ok(format!("{}:{}", host, url.port().unwrap_or(default_port)))
}

async fn connect(addr: &str) -> Result<TcpStream, ProbeError> {
    TcpStream::connect(addr)
        .await
        .map_err(|source| ProbeError::Connect {
            addr: addr.to_string(),
            source,
        })
}

// ============================================================================
// Graph database (Bolt)
// ============================================================================

/// Negotiates a Bolt protocol version with the graph database.
///
/// TLS schemes (`bolt+s`, `neo4j+s`, ...) only get a TCP reachability check.
pub struct GraphProbe {
    addr: String,
    tls: bool,
}

impl GraphProbe {
    pub fn new(uri: &str) -> Result<Self, ProbeError> {
        let url = parse_url(uri)?;
        let scheme = url.scheme();
        if !matches!(
            scheme,
            "bolt" | "neo4j" | "bolt+s" | "bolt+ssc" | "neo4j+s" | "neo4j+ssc"
        ) {
            return Err(ProbeError::InvalidUrl {
                url: uri.to_string(),
                reason: format!("unsupported scheme '{scheme}'"),
            });
        }
        Ok(Self {
            addr: host_port(&url, uri, 7687)?,
            tls: scheme.contains('+'),
        })
    }
}

#[async_trait]
impl ServiceProbe for GraphProbe {
    fn service(&self) -> &'static str {
        "Neo4j"
    }

    fn target(&self) -> String {
        self.addr.clone()
    }

    async fn check(&self) -> Result<String, ProbeError> {
        let mut stream = connect(&self.addr).await?;
        if self.tls {
            return Ok("TCP reachable (TLS handshake not verified)".to_string());
        }

        let mut handshake = Vec::with_capacity(20);
        handshake.extend_from_slice(&BOLT_MAGIC);
        for version in &BOLT_VERSIONS {
            handshake.extend_from_slice(version);
        }
        stream.write_all(&handshake).await?;

        let mut agreed = [0u8; 4];
        stream.read_exact(&mut agreed).await?;
        match agreed {
            [0, 0, 0, 0] => Err(ProbeError::Protocol(
                "server supports none of the proposed Bolt versions".to_string(),
            )),
            [_, _, minor, major] => Ok(format!("Bolt {major}.{minor} negotiated")),
        }
    }
}

// ============================================================================
// Vector index (Qdrant REST)
// ============================================================================

#[derive(Deserialize)]
struct CollectionsResponse {
    result: CollectionsResult,
}

#[derive(Deserialize)]
struct CollectionsResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Deserialize)]
struct CollectionDescription {
    name: String,
}

/// Lists collections and reports whether the search collection exists.
pub struct VectorStoreProbe {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    collection: String,
}

impl VectorStoreProbe {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        parse_url(url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            collection: collection.to_string(),
        })
    }
}

#[async_trait]
impl ServiceProbe for VectorStoreProbe {
    fn service(&self) -> &'static str {
        "Qdrant"
    }

    fn target(&self) -> String {
        self.base_url.clone()
    }

    async fn check(&self) -> Result<String, ProbeError> {
        let mut req = self.http.get(format!("{}/collections", self.base_url));
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(ProbeError::Status(resp.status().as_u16()));
        }
        let body = resp.bytes().await?;
        let parsed: CollectionsResponse = serde_json::from_slice(&body)
            .map_err(|e| ProbeError::Protocol(format!("unexpected /collections body: {e}")))?;

        let total = parsed.result.collections.len();
        let present = parsed
            .result
            .collections
            .iter()
            .any(|c| c.name == self.collection);
        let state = if present { "present" } else { "missing" };
        Ok(format!(
            "{total} collection(s), '{}' {state}",
            self.collection
        ))
    }
}

// ============================================================================
// Cache (Redis RESP)
// ============================================================================

/// Sends `PING` (after `AUTH` when the URL carries credentials).
///
/// `rediss://` only gets a TCP reachability check.
pub struct CacheProbe {
    addr: String,
    username: Option<String>,
    password: Option<String>,
    tls: bool,
}

impl CacheProbe {
    pub fn new(url: &str) -> Result<Self, ProbeError> {
        let parsed = parse_url(url)?;
        let tls = match parsed.scheme() {
            "redis" => false,
            "rediss" => true,
            other => {
                return Err(ProbeError::InvalidUrl {
                    url: url.to_string(),
                    reason: format!("unsupported scheme '{other}'"),
                })
            }
        };
        let username = Some(decode_credential(parsed.username())).filter(|u| !u.is_empty());
        Ok(Self {
            addr: host_port(&parsed, url, 6379)?,
            username,
            password: parsed.password().map(decode_credential),
            tls,
        })
    }
}

/// `Url` keeps userinfo percent-encoded; the server expects the raw bytes.
fn decode_credential(raw: &str) -> String {
    percent_encoding::percent_decode_str(raw)
        .decode_utf8_lossy()
        .into_owned()
}

/// Encode a command as a RESP array of bulk strings.
fn resp_command(parts: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", parts.len()).into_bytes();
    for part in parts {
        out.extend_from_slice(format!("${}\r\n{}\r\n", part.len(), part).as_bytes());
    }
    out
}

#[async_trait]
impl ServiceProbe for CacheProbe {
    fn service(&self) -> &'static str {
        "Redis"
    }

    fn target(&self) -> String {
        self.addr.clone()
    }

    async fn check(&self) -> Result<String, ProbeError> {
        let stream = connect(&self.addr).await?;
        if self.tls {
            return Ok("TCP reachable (TLS handshake not verified)".to_string());
        }
        let mut stream = BufReader::new(stream);
        let mut line = String::new();

        if let Some(password) = &self.password {
            let auth = match &self.username {
                Some(user) => resp_command(&["AUTH", user, password]),
                None => resp_command(&["AUTH", password]),
            };
            stream.get_mut().write_all(&auth).await?;
            stream.read_line(&mut line).await?;
            if !line.starts_with("+OK") {
                return Err(ProbeError::Auth(line.trim().to_string()));
            }
            line.clear();
        }

        stream.get_mut().write_all(&resp_command(&["PING"])).await?;
        stream.read_line(&mut line).await?;
        let reply = line.trim();
        if reply == "+PONG" {
            Ok("PING answered with PONG".to_string())
        } else if reply.is_empty() {
            Err(ProbeError::Protocol("connection closed before reply".to_string()))
        } else {
            Err(ProbeError::Protocol(format!("unexpected PING reply '{reply}'")))
        }
    }
}
