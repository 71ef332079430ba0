use std::time::Duration;

use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::{config::StorageStrategy, shared::ConnectionId, DEFAULT_CID_SIZE, MAX_CID_SIZE};

/// Source of locally issued connection IDs
///
/// Issued CIDs must not let an outside observer link them to each other or to the connection.
pub trait ConnectionIdGenerator: Send {
    /// Next CID to hand out
    fn generate_cid(&mut self) -> ConnectionId;
    /// Length of every CID this generator issues
    ///
    /// Short headers carry no length, so this is also what a
    /// [`FixedLengthConnectionIdParser`](crate::FixedLengthConnectionIdParser) must expect.
    fn cid_len(&self) -> usize;
    /// How long an issued CID stays valid, if bounded
    fn cid_lifetime(&self) -> Option<Duration>;
}

/// Issues CIDs of uniformly random bytes
///
/// CIDs are built under the generator's [`StorageStrategy`], which defaults to the process-wide
/// one.
#[derive(Debug, Clone)]
pub struct RandomConnectionIdGenerator {
    cid_len: usize,
    lifetime: Option<Duration>,
    strategy: StorageStrategy,
    rng: StdRng,
}

impl Default for RandomConnectionIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CID_SIZE)
    }
}

impl RandomConnectionIdGenerator {
    /// Generator for `cid_len`-byte CIDs, seeded from the OS
    ///
    /// `cid_len` above `MAX_CID_SIZE` is clamped the same way [`ConnectionId::new`] clamps.
    pub fn new(cid_len: usize) -> Self {
        Self::with_rng(cid_len, StdRng::from_entropy())
    }

    /// Deterministic generator, for tests and reproducible simulations
    pub fn from_seed(cid_len: usize, seed: [u8; 32]) -> Self {
        Self::with_rng(cid_len, StdRng::from_seed(seed))
    }

    fn with_rng(cid_len: usize, rng: StdRng) -> Self {
        debug_assert!(cid_len <= MAX_CID_SIZE);
        Self {
            cid_len: cid_len.min(MAX_CID_SIZE),
            lifetime: None,
            strategy: StorageStrategy::global(),
            rng,
        }
    }

    /// Issue CIDs under `strategy` instead of the process-wide one
    pub fn strategy(&mut self, strategy: StorageStrategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    /// Retire issued CIDs after `d`
    pub fn set_lifetime(&mut self, d: Duration) -> &mut Self {
        self.lifetime = Some(d);
        self
    }
}

impl ConnectionIdGenerator for RandomConnectionIdGenerator {
    fn generate_cid(&mut self) -> ConnectionId {
        let mut cid = ConnectionId::with_strategy(&[], self.strategy);
        cid.set_len(self.cid_len);
        self.rng.fill_bytes(cid.data_mut());
        cid
    }

    fn cid_len(&self) -> usize {
        self.cid_len
    }

    fn cid_lifetime(&self) -> Option<Duration> {
        self.lifetime
    }
}
