//! Connection identifiers for QUIC-style transports
//!
//! [`ConnectionId`] is the value type carried in every packet header: cheap to clone, compare
//! and hash, and free of heap allocation for identifiers up to [`DEFAULT_CID_SIZE`] bytes. How
//! the bytes are stored is chosen once per process through [`StorageStrategy`].
#![warn(missing_docs)]

#[cfg(test)]
mod tests;

// 1. the identifier itself
mod shared;
pub use crate::shared::ConnectionId;

// 2. process-wide storage strategy
mod config;
pub use crate::config::{ParseStrategyError, StorageStrategy, StrategyAlreadyResolved};

// 3. hash maps keyed by connection id
mod hash;
pub use crate::hash::{ConnectionIdMap, ConnectionIdSet};

// 4. generate connection id
mod cid_generator;
pub use crate::cid_generator::{ConnectionIdGenerator, RandomConnectionIdGenerator};

// 5. read connection ids out of packet headers
mod packet;
pub use crate::packet::{
    decode_long_cids, ConnectionIdParser, FixedLengthConnectionIdParser, PacketDecodeError,
};

/// Longest connection ID permitted by the protocol
pub const MAX_CID_SIZE: usize = 20;
/// Typical connection ID length, and the inline capacity of [`StorageStrategy::Hybrid`]
pub const DEFAULT_CID_SIZE: usize = 8;
