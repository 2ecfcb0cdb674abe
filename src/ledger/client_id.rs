//! Client identity resolution
//!
//! Anonymous clients send an opaque id they generated themselves. When none
//! is present the id is derived from the forwarded IP address. The two
//! spaces are namespaced (`cid:` / `ip:`) so they can never collide, and IPs
//! are stored only as a truncated SHA-256 digest.

use hyper::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::net::IpAddr;

/// Longest client-supplied id accepted before truncation
const MAX_SUPPLIED_LEN: usize = 128;

/// Namespaced, opaque client identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Id supplied by the client. Returns `None` for blank input.
    pub fn supplied(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let bounded: String = trimmed.chars().take(MAX_SUPPLIED_LEN).collect();
        Some(Self(format!("cid:{bounded}")))
    }

    /// Id derived from a network address
    pub fn from_ip(ip: IpAddr) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ip.to_string().as_bytes());
        let hash = hasher.finalize();
        Self(format!("ip:{}", hex::encode(&hash[..12])))
    }

    /// Resolve the id for a request: the supplied id when present, else the
    /// first `X-Forwarded-For` address, else `X-Real-IP`, else the peer.
    pub fn resolve(supplied: Option<&str>, headers: &HeaderMap, peer: IpAddr) -> Self {
        if let Some(id) = supplied.and_then(Self::supplied) {
            return id;
        }
        Self::from_ip(forwarded_ip(headers).unwrap_or(peer))
    }

    /// Rebuild from a stored, already-namespaced value
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_ip_derived(&self) -> bool {
        self.0.starts_with("ip:")
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_ip(headers, "x-forwarded-for").or_else(|| header_ip(headers, "x-real-ip"))
}
