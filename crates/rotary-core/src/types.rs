use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RotationError;

/// Opaque identifier naming one delegate of a delegating session factory.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingKey(String);

impl RoutingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoutingKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RoutingKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// One rotation target: the routing key selecting a session delegate and
/// the remote directory to poll through it.
///
/// Immutable once built. Both fields must be non-empty.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawKeyDirectory")]
pub struct KeyDirectory {
    key: RoutingKey,
    directory: String,
}

#[derive(Deserialize)]
struct RawKeyDirectory {
    key: RoutingKey,
    directory: String,
}

impl TryFrom<RawKeyDirectory> for KeyDirectory {
    type Error = RotationError;

    fn try_from(raw: RawKeyDirectory) -> Result<Self, Self::Error> {
        Self::new(raw.key, raw.directory)
    }
}

impl KeyDirectory {
    pub fn new(
        key: impl Into<RoutingKey>,
        directory: impl Into<String>,
    ) -> Result<Self, RotationError> {
        let key = key.into();
        let directory = directory.into();
        if key.as_str().is_empty() {
            return Err(RotationError::EmptyKey);
        }
        if directory.is_empty() {
            return Err(RotationError::EmptyDirectory(key.to_string()));
        }
        Ok(Self { key, directory })
    }

    pub fn key(&self) -> &RoutingKey {
        &self.key
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }
}

impl fmt::Display for KeyDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KeyDirectory [key={}, directory={}]",
            self.key, self.directory
        )
    }
}
