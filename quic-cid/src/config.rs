use std::{fmt, str::FromStr, sync::OnceLock};

use thiserror::Error;
use tracing::debug;

/// Process-wide strategy, resolved on first use
static STORAGE_STRATEGY: OnceLock<StorageStrategy> = OnceLock::new();

/// How a [`ConnectionId`](crate::ConnectionId) stores its bytes
///
/// Chosen once per process. Each CID captures the strategy it was created under, so CIDs
/// built with [`ConnectionId::with_strategy`](crate::ConnectionId::with_strategy) may coexist
/// with ones using the process-wide value; they still compare and hash identically.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum StorageStrategy {
    /// Every CID reserves `MAX_CID_SIZE` bytes inline and never allocates
    Legacy,
    /// CIDs up to `DEFAULT_CID_SIZE` bytes are stored inline, longer ones in an exactly-sized
    /// heap block
    #[default]
    Hybrid,
}

impl StorageStrategy {
    /// The process-wide strategy
    ///
    /// Resolves to the value passed to [`install`](Self::install), or [`Hybrid`](Self::Hybrid)
    /// if nothing was installed before the first call.
    pub fn global() -> Self {
        *STORAGE_STRATEGY.get_or_init(|| {
            let strategy = Self::default();
            debug!(%strategy, "resolved connection ID storage strategy");
            strategy
        })
    }

    /// Make `self` the process-wide strategy
    ///
    /// Must happen before the first CID is constructed. Fails if a different strategy has
    /// already been resolved.
    pub fn install(self) -> Result<(), StrategyAlreadyResolved> {
        let current = *STORAGE_STRATEGY.get_or_init(|| self);
        if current != self {
            return Err(StrategyAlreadyResolved {
                current,
                requested: self,
            });
        }
        debug!(strategy = %self, "installed connection ID storage strategy");
        Ok(())
    }
}

impl fmt::Display for StorageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Legacy => "legacy",
            Self::Hybrid => "hybrid",
        })
    }
}

impl FromStr for StorageStrategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "fixed" => Ok(Self::Legacy),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(ParseStrategyError(s.to_owned())),
        }
    }
}

/// Returned by [`StorageStrategy::install`] once the process-wide strategy is fixed
#[derive(Debug, Copy, Clone, Eq, PartialEq, Error)]
#[error("connection ID storage strategy already resolved to {current}, cannot switch to {requested}")]
pub struct StrategyAlreadyResolved {
    /// 1. The strategy in effect
    pub current: StorageStrategy,
    /// 2. The strategy that was asked for
    pub requested: StorageStrategy,
}

/// Error returned when parsing an unknown [`StorageStrategy`] name
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[error("unknown connection ID storage strategy {0:?}")]
pub struct ParseStrategyError(String);
