//! Event id generation.
//!
//! Every emitted event draws its `id` attribute from an [`IdGenerator`]. The
//! default is a process-local monotonic counter, which keeps ids cheap and
//! makes hook emission deterministic apart from the advancing counter. Hosts
//! that need globally unique, sortable ids can switch to ULIDs.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Source of `id` attributes for emitted events.
pub trait IdGenerator: Send + Sync {
    /// Produce the next id. Must never repeat within a process run.
    fn next_id(&self) -> String;
}

/// Monotonic counter ids: `"1"`, `"2"`, `"3"`, ...
///
/// The counter advances relaxed-atomically; ordering between threads is not
/// guaranteed, uniqueness is.
#[derive(Debug, Default)]
pub struct MonotonicIdGenerator {
    counter: AtomicU64,
}

impl MonotonicIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting from `n` instead of 1. Useful when resuming a stream
    /// whose consumer tracks the last seen id.
    pub fn starting_at(n: u64) -> Self {
        Self {
            counter: AtomicU64::new(n.saturating_sub(1)),
        }
    }
}

impl IdGenerator for MonotonicIdGenerator {
    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        n.to_string()
    }
}

/// ULID ids via [`EventId`].
#[derive(Debug, Default)]
pub struct UlidIdGenerator;

impl IdGenerator for UlidIdGenerator {
    fn next_id(&self) -> String {
        EventId::new().to_string()
    }
}

/// Strongly typed event identifier backed by ULID.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct EventId(pub ulid::Ulid);

impl EventId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn from_ulid(id: ulid::Ulid) -> Self {
        Self(id)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EventId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EventId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = ulid::Ulid::from_string(s)?;
        Ok(EventId(id))
    }
}

impl Serialize for EventId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<EventId>()
            .map_err(|_| serde::de::Error::custom("invalid event id"))
    }
}
