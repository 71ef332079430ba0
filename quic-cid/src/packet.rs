use bytes::Buf;
use thiserror::Error;

use crate::{shared::ConnectionId, MAX_CID_SIZE};

/// Parse connection id in short header packet
///
/// Short headers carry no CID length, so the endpoint that issued the CID must know how to find
/// its end.
pub trait ConnectionIdParser {
    /// Parse a connection id from given buffer
    fn parse(&self, buf: &mut dyn Buf) -> Result<ConnectionId, PacketDecodeError>;
}

/// A [`ConnectionIdParser`] implementation that assumes the connection ID is of fixed length
#[derive(Debug, Copy, Clone)]
pub struct FixedLengthConnectionIdParser {
    expected_len: usize,
}

impl FixedLengthConnectionIdParser {
    /// Create a new instance of `FixedLengthConnectionIdParser`
    pub fn new(expected_len: usize) -> Self {
        debug_assert!(expected_len <= MAX_CID_SIZE);
        Self {
            expected_len: expected_len.min(MAX_CID_SIZE),
        }
    }
}

impl ConnectionIdParser for FixedLengthConnectionIdParser {
    fn parse(&self, buffer: &mut dyn Buf) -> Result<ConnectionId, PacketDecodeError> {
        ConnectionId::from_buf(buffer, self.expected_len)
            .ok_or(PacketDecodeError::InvalidHeader("packet too small"))
    }
}

/// Long-header CIDs, destination first
///
/// Returns `PacketDecodeError::InvalidHeader` if either CID is truncated or too long.
pub fn decode_long_cids(
    buf: &mut impl Buf,
) -> Result<(ConnectionId, ConnectionId), PacketDecodeError> {
    let dst_cid =
        ConnectionId::decode_long(buf).ok_or(PacketDecodeError::InvalidHeader("malformed cid"))?;
    let src_cid =
        ConnectionId::decode_long(buf).ok_or(PacketDecodeError::InvalidHeader("malformed cid"))?;
    Ok((dst_cid, src_cid))
}

/// Errors that can occur when decoding the CIDs of a packet header
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PacketDecodeError {
    /// The packet header is invalid
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),
}
