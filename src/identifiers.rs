//! Type-safe identifiers.
//!
//! Newtype wrappers prevent mixing subscription and listener IDs at
//! compile time.
//!
//! | Type | Scope | Wire form |
//! |------|-------|-----------|
//! | [`SubscriptionId`] | One per `Transport::subscribe` call | `sub-<n>` (STOMP `id` header) |
//! | [`ListenerId`] | One per `MessageDispatcher::register` call | not sent |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Prefix of the STOMP subscription `id` header.
const SUBSCRIPTION_PREFIX: &str = "sub-";

// ============================================================================
// SubscriptionId
// ============================================================================

/// Identifier of a topic subscription on a single transport.
///
/// Allocated from a per-transport counter, so an ID is never reused for the
/// lifetime of the transport that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a subscription ID from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SUBSCRIPTION_PREFIX}{}", self.0)
    }
}

impl FromStr for SubscriptionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix(SUBSCRIPTION_PREFIX)
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| Error::protocol(format!("Invalid subscription id: {s}")))
    }
}

// ============================================================================
// ListenerId
// ============================================================================

/// Identifier of a registered chat message listener.
///
/// Listeners are keyed by registration, not by content: registering the
/// same closure twice yields two independent IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

// ============================================================================
// IdAllocator
// ============================================================================

/// Monotonic ID source.
#[derive(Debug, Default)]
pub(crate) struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Allocates the next subscription ID.
    #[inline]
    pub(crate) fn next_subscription(&self) -> SubscriptionId {
        SubscriptionId(self.bump())
    }

    /// Allocates the next listener ID.
    #[inline]
    pub(crate) fn next_listener(&self) -> ListenerId {
        ListenerId(self.bump())
    }

    #[inline]
    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

// ============================================================================
// Tests
// ============================================================================
