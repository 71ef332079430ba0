use rustc_hash::{FxHashMap, FxHashSet};

use crate::shared::ConnectionId;

/// Map keyed by [`ConnectionId`]
///
/// `ConnectionId` feeds [`ConnectionId::hash_value`] to the hasher, which leaves the low bits
/// zero for short CIDs on little-endian hosts; `FxHasher` mixes them back in before bucketing.
pub type ConnectionIdMap<V> = FxHashMap<ConnectionId, V>;

/// Set of [`ConnectionId`]s, see [`ConnectionIdMap`]
pub type ConnectionIdSet = FxHashSet<ConnectionId>;
