//! # Domain Errors
//!
//! Identifier types and error types for the placement subsystem.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Registry block height at which node lists and stream counts are read.
pub type BlockNumber = u64;

/// Length of a node address in bytes.
pub const NODE_ADDRESS_LENGTH: usize = 20;

/// Length of a stream identifier in bytes.
pub const STREAM_ID_LENGTH: usize = 32;

/// Public-key-derived identity of a cluster member (20 bytes).
///
/// Equality is exact byte equality. Formats as `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress(pub [u8; NODE_ADDRESS_LENGTH]);

impl NodeAddress {
    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; NODE_ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; NODE_ADDRESS_LENGTH] {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({})", self)
    }
}

impl FromStr for NodeAddress {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| IdentifierError::InvalidHex(e.to_string()))?;
        let bytes: [u8; NODE_ADDRESS_LENGTH] =
            bytes
                .try_into()
                .map_err(|b: Vec<u8>| IdentifierError::InvalidLength {
                    expected: NODE_ADDRESS_LENGTH,
                    got: b.len(),
                })?;
        Ok(Self(bytes))
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Stream identifier. The leading byte is the stream-type tag, the rest is
/// treated as opaque high-entropy input to hashing.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub [u8; STREAM_ID_LENGTH]);

impl StreamId {
    /// Create a stream id from raw bytes.
    pub const fn new(bytes: [u8; STREAM_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Build a stream id from a byte slice of exactly [`STREAM_ID_LENGTH`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdentifierError> {
        let bytes: [u8; STREAM_ID_LENGTH] =
            bytes.try_into().map_err(|_| IdentifierError::InvalidLength {
                expected: STREAM_ID_LENGTH,
                got: bytes.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Stream-type tag (leading byte).
    pub fn stream_type(&self) -> u8 {
        self.0[0]
    }

    /// Raw id bytes.
    pub fn as_bytes(&self) -> &[u8; STREAM_ID_LENGTH] {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StreamId({})", self)
    }
}

/// Malformed identifier input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    /// Input was not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Input had the wrong number of bytes.
    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Required length
        expected: usize,
        /// Actual length
        got: usize,
    },
}

/// Failures reported by the node registry collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A registry read could not complete.
    #[error("Registry unavailable: {0}")]
    Unavailable(String),

    /// The event feed dropped events because the consumer fell behind.
    #[error("Registry event feed lagged, {0} events dropped")]
    FeedLagged(u64),

    /// The event feed was closed by the registry.
    #[error("Registry event feed closed")]
    FeedClosed,
}

/// Errors returned by placement operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// Fewer operational nodes than the requested replication factor.
    #[error("Insufficient nodes: requested {requested}, {available} operational")]
    InsufficientNodes {
        /// Requested replication factor
        requested: usize,
        /// Operational nodes at decision time
        available: usize,
    },

    /// Replication factor must be positive.
    #[error("Invalid replication factor: {0}")]
    InvalidReplicationFactor(usize),

    /// A required registry read failed. The inner error is passed through unchanged.
    #[error(transparent)]
    RegistryUnavailable(#[from] RegistryError),

    /// Operation referenced a node that is not in the membership view.
    #[error("Unknown node: {0}")]
    UnknownNode(NodeAddress),
}

/// Rejected membership events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MembershipError {
    /// The reported status change is not a legal node state transition.
    #[error("Invalid node transition for {address}: {from} -> {to}")]
    InvalidTransition {
        /// Node the event referred to
        address: NodeAddress,
        /// Current state
        from: String,
        /// Reported state
        to: String,
    },
}
