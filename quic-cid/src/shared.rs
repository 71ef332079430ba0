use std::{
    alloc::{handle_alloc_error, Layout},
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    mem, ops,
};

use bytes::{Buf, BufMut};
use tracing::error;

use crate::{config::StorageStrategy, DEFAULT_CID_SIZE, MAX_CID_SIZE};

/// Number of 64-bit words folded together by [`ConnectionId::hash_value`]
const HASH_WORDS: usize = 3;
const _: () = assert!(HASH_WORDS * 8 >= MAX_CID_SIZE);
const _: () = assert!(MAX_CID_SIZE <= u8::MAX as usize);

/// Protocol-level identifier for a connection.
///
/// Mainly useful for identifying this connection's packets on the wire with tools like Wireshark.
///
/// Short identifiers never allocate. Under [`StorageStrategy::Hybrid`] an identifier longer than
/// [`DEFAULT_CID_SIZE`] keeps its bytes in a heap block of exactly its length; under
/// [`StorageStrategy::Legacy`] every identifier reserves [`MAX_CID_SIZE`] bytes inline.
/// Equality, ordering and hashing only ever look at the length and the bytes.
pub struct ConnectionId {
    /// length of CID
    len: u8,
    /// where the first `len` bytes live
    storage: Storage,
}

/// Backing storage of a [`ConnectionId`]
///
/// The variant encodes the strategy the identifier was created under, so the strategy is never
/// queried again once a value exists.
#[derive(Clone)]
enum Storage {
    /// 1. Legacy layout, always `MAX_CID_SIZE` bytes
    Fixed([u8; MAX_CID_SIZE]),
    /// 2. Hybrid layout, `len <= DEFAULT_CID_SIZE`
    Inline([u8; DEFAULT_CID_SIZE]),
    /// 3. Hybrid layout, `len > DEFAULT_CID_SIZE`; the block holds exactly `len` bytes
    Heap(Box<[u8]>),
}

impl ConnectionId {
    /// Construct a CID from `bytes` using the process-wide [`StorageStrategy`]
    ///
    /// Input longer than [`MAX_CID_SIZE`] is truncated to `MAX_CID_SIZE` bytes and reported
    /// through `tracing`; it is never rejected.
    pub fn new(bytes: &[u8]) -> Self {
        Self::with_strategy(bytes, StorageStrategy::global())
    }

    /// Construct a CID from `bytes` using an explicit [`StorageStrategy`]
    pub fn with_strategy(bytes: &[u8], strategy: StorageStrategy) -> Self {
        let len = clamp_len(bytes.len());
        let bytes = &bytes[..len];
        let storage = match strategy {
            StorageStrategy::Legacy => {
                let mut buf = [0; MAX_CID_SIZE];
                buf[..len].copy_from_slice(bytes);
                Storage::Fixed(buf)
            }
            StorageStrategy::Hybrid if len <= DEFAULT_CID_SIZE => {
                let mut buf = [0; DEFAULT_CID_SIZE];
                buf[..len].copy_from_slice(bytes);
                Storage::Inline(buf)
            }
            StorageStrategy::Hybrid => Storage::Heap(alloc_block(bytes, len)),
        };
        Self {
            len: len as u8,
            storage,
        }
    }

    /// The zero-length CID
    pub fn empty() -> Self {
        Self::new(&[])
    }

    /// Read a CID of `len` bytes from the front of `buf`
    ///
    /// Returns `None`, consuming nothing, if `buf` is shorter than `len` or `len` exceeds
    /// `MAX_CID_SIZE`.
    pub fn from_buf(buf: &mut (impl Buf + ?Sized), len: usize) -> Option<Self> {
        if len > MAX_CID_SIZE || buf.remaining() < len {
            return None;
        }
        let mut bytes = [0; MAX_CID_SIZE];
        buf.copy_to_slice(&mut bytes[..len]);
        Some(Self::new(&bytes[..len]))
    }

    /// Decode a length-prefixed CID, as found in long packet headers
    ///
    /// Returns `None` if the buffer is truncated or the encoded length exceeds `MAX_CID_SIZE`.
    pub fn decode_long(buf: &mut impl Buf) -> Option<Self> {
        if !buf.has_remaining() {
            return None;
        }
        let len = buf.get_u8() as usize;
        Self::from_buf(buf, len)
    }

    /// Encode in length-prefixed form
    pub fn encode_long(&self, buf: &mut impl BufMut) {
        buf.put_u8(self.len);
        buf.put_slice(self.data());
    }

    /// Number of bytes in the CID
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Whether this is the zero-length CID
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The storage strategy this CID was created under
    pub fn strategy(&self) -> StorageStrategy {
        match self.storage {
            Storage::Fixed(_) => StorageStrategy::Legacy,
            Storage::Inline(_) | Storage::Heap(_) => StorageStrategy::Hybrid,
        }
    }

    /// The CID's bytes, exactly [`len`](Self::len) of them
    pub fn data(&self) -> &[u8] {
        let len = self.len();
        match &self.storage {
            Storage::Fixed(buf) => &buf[..len],
            Storage::Inline(buf) => &buf[..len],
            Storage::Heap(block) => &block[..len],
        }
    }

    /// Mutable view of the CID's bytes
    pub fn data_mut(&mut self) -> &mut [u8] {
        let len = self.len();
        match &mut self.storage {
            Storage::Fixed(buf) => &mut buf[..len],
            Storage::Inline(buf) => &mut buf[..len],
            Storage::Heap(block) => &mut block[..len],
        }
    }

    /// Resize in place, keeping the first `min(self.len(), len)` bytes
    ///
    /// Bytes past the kept prefix are zeroed. Under the hybrid strategy this moves the bytes
    /// between inline and heap storage as the length crosses [`DEFAULT_CID_SIZE`]. Aborts the
    /// process if a needed allocation fails.
    pub fn set_len(&mut self, len: usize) {
        let new_len = clamp_len(len);
        let old_len = self.len();
        let keep = old_len.min(new_len);
        match &mut self.storage {
            Storage::Fixed(buf) => buf[keep..new_len].fill(0),
            Storage::Inline(buf) if new_len <= DEFAULT_CID_SIZE => buf[keep..new_len].fill(0),
            Storage::Inline(buf) => {
                let block = alloc_block(&buf[..keep], new_len);
                self.storage = Storage::Heap(block);
            }
            Storage::Heap(block) if new_len > DEFAULT_CID_SIZE => {
                let mut vec = mem::take(block).into_vec();
                if new_len > vec.len() && vec.try_reserve_exact(new_len - vec.len()).is_err() {
                    alloc_failed(new_len);
                }
                vec.resize(new_len, 0);
                *block = vec.into_boxed_slice();
            }
            Storage::Heap(block) => {
                let mut buf = [0; DEFAULT_CID_SIZE];
                buf[..keep].copy_from_slice(&block[..keep]);
                // dropping the old variant releases the heap block
                self.storage = Storage::Inline(buf);
            }
        }
        self.len = new_len as u8;
    }

    /// Hash of the CID's length and bytes
    ///
    /// The bytes are zero-padded to three 64-bit words which are XORed together with the length
    /// and [`DEFAULT_CID_SIZE`], and the result is read as big-endian. For an 8-byte CID this is
    /// the bytes' big-endian value, i.e. `u64::from_be_bytes`.
    pub fn hash_value(&self) -> u64 {
        let mut padded = [0u8; HASH_WORDS * 8];
        padded[..self.len()].copy_from_slice(self.data());
        let folded = padded.chunks_exact(8).fold(0u64, |acc, chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            acc ^ u64::from_ne_bytes(word)
        });
        u64::from_be(DEFAULT_CID_SIZE as u64 ^ u64::from(self.len) ^ folded)
    }

    #[cfg(test)]
    pub(crate) fn is_heap(&self) -> bool {
        matches!(self.storage, Storage::Heap(_))
    }
}

/// Clamp a requested length to `MAX_CID_SIZE`, reporting oversize requests
fn clamp_len(len: usize) -> usize {
    if len > MAX_CID_SIZE {
        error!(
            requested = len,
            max = MAX_CID_SIZE,
            "connection ID too long, truncating"
        );
        return MAX_CID_SIZE;
    }
    len
}

/// Allocate a heap block of exactly `len` bytes starting with `prefix`
fn alloc_block(prefix: &[u8], len: usize) -> Box<[u8]> {
    let mut block = Vec::new();
    if block.try_reserve_exact(len).is_err() {
        alloc_failed(len);
    }
    block.extend_from_slice(prefix);
    block.resize(len, 0);
    block.into_boxed_slice()
}

fn alloc_failed(len: usize) -> ! {
    error!(len, "failed to allocate connection ID storage");
    handle_alloc_error(Layout::array::<u8>(len).unwrap_or(Layout::new::<u8>()))
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::empty()
    }
}

impl Clone for ConnectionId {
    fn clone(&self) -> Self {
        Self {
            len: self.len,
            storage: self.storage.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if self.strategy() != source.strategy() {
            *self = source.clone();
            return;
        }
        self.set_len(source.len());
        self.data_mut().copy_from_slice(source.data());
    }
}

impl PartialEq for ConnectionId {
    fn eq(&self, other: &Self) -> bool {
        self.data() == other.data()
    }
}

impl Eq for ConnectionId {}

impl Ord for ConnectionId {
    /// Shorter CIDs sort first; equal lengths compare bytewise
    fn cmp(&self, other: &Self) -> Ordering {
        self.len
            .cmp(&other.len)
            .then_with(|| self.data().cmp(other.data()))
    }
}

impl PartialOrd for ConnectionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Hash for ConnectionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl ops::Deref for ConnectionId {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        self.data()
    }
}

impl ops::DerefMut for ConnectionId {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.data_mut()
    }
}

impl From<&[u8]> for ConnectionId {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data().fmt(f)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("0");
        }
        for byte in self.data() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
