//! Request identifiers.
//!
//! Identifiers are sequential integers rendered as decimal strings on the
//! wire. The sequence wraps modulo [`MAX_SAFE_INTEGER`] so that every value
//! stays representable by a JSON number on any remote, and `0` is never
//! handed out (it marks "nothing issued yet").
//!
//! Uniqueness only holds among *outstanding* requests: after a wraparound an
//! identifier may be issued again. The engine enforces this by skipping any
//! identifier that still has a pending or queued entry.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Largest integer a IEEE-754 double represents exactly (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// Identifier correlating a request with its eventual response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw value.
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Serialize for RequestId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RequestIdVisitor;

        impl<'de> Visitor<'de> for RequestIdVisitor {
            type Value = RequestId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(RequestId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(RequestId)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(RequestIdVisitor)
    }
}

/// Sequential identifier source.
///
/// `next = (current + 1) mod MAX_SAFE_INTEGER`, except that `0` is never
/// handed out: after `MAX_SAFE_INTEGER - 1` the next identifier is `1`.
/// `0` is reserved for "nothing issued yet".
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    current: u64,
}

impl IdGenerator {
    /// Generator whose first identifier is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generator resuming after `current`.
    pub fn starting_at(current: u64) -> Self {
        Self {
            current: current % MAX_SAFE_INTEGER,
        }
    }

    /// Last identifier handed out (`0` if none).
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Advance and return the next identifier.
    pub fn next_id(&mut self) -> RequestId {
        self.current = (self.current + 1) % MAX_SAFE_INTEGER;
        if self.current == 0 {
            self.current = 1;
        }
        RequestId(self.current)
    }
}
