//! Entity identifiers as issued by the backend.
//!
//! The backend is not consistent about whether it sends ids as JSON numbers or as strings (query
//! strings and form selects always produce strings). `Id` accepts both at the deserialization
//! boundary so that everything past it can compare ids with plain equality.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};
use std::num::ParseIntError;
use std::str::FromStr;

/// An opaque, normalized entity id.
///
/// ```
/// # use expense_client::model::Id;
/// let a: Id = serde_json::from_str("7").unwrap();
/// let b: Id = serde_json::from_str("\"7\"").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u64);

impl Id {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Id {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Id)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(IdVisitor)
    }
}

struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer id, as a number or a numeric string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
        Ok(Id(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
        u64::try_from(v)
            .map(Id)
            .map_err(|_| E::custom(format!("negative id {v}")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        Id::from_str(v).map_err(|e| E::custom(format!("invalid id '{v}': {e}")))
    }
}
