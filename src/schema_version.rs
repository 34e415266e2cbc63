//! Management model versions.
//!
//! A subsystem's model version changes whenever its resource tree changes
//! shape; it is unrelated to release numbers and wire formats. Versions are
//! written `major.minor.micro` wherever they are stored or shown.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Field order gives the lexicographic (major, minor, micro) ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaVersionError {
    #[error("Model version '{version}' has {found} component(s), expected major.minor.micro")]
    ComponentCount { version: String, found: usize },

    #[error("Model version '{version}' has a non-numeric component '{component}'")]
    InvalidComponent { version: String, component: String },
}

impl SchemaVersion {
    pub const fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self { major, minor, micro }
    }

    /// Whether a peer speaking `self` needs trees transformed down from `current`.
    pub fn is_legacy_of(&self, current: &SchemaVersion) -> bool {
        self < current
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for SchemaVersion {
    type Err = SchemaVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let components = raw
            .split('.')
            .map(|component| {
                component.parse::<u32>().map_err(|_| SchemaVersionError::InvalidComponent {
                    version: raw.to_string(),
                    component: component.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        match components[..] {
            [major, minor, micro] => Ok(Self::new(major, minor, micro)),
            _ => Err(SchemaVersionError::ComponentCount {
                version: raw.to_string(),
                found: components.len(),
            }),
        }
    }
}

impl Serialize for SchemaVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SchemaVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
