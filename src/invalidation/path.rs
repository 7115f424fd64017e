//! Cache path validation.

use std::fmt;
use thiserror::Error;

/// Reasons a candidate path cannot be invalidated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPathError {
    #[error("Path is empty")]
    Empty,

    #[error("Path must start with '/': {0:?}")]
    MissingLeadingSlash(String),
}

/// A validated CDN cache path.
///
/// Always starts with `/`. Templates are never interpreted here, the
/// content-mutation side is expected to hand over fully resolved paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CachePath(String);

impl CachePath {
    pub fn parse(raw: impl Into<String>) -> Result<Self, InvalidPathError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidPathError::Empty);
        }
        if !raw.starts_with('/') {
            return Err(InvalidPathError::MissingLeadingSlash(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CachePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CachePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CachePath {
    type Error = InvalidPathError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for CachePath {
    type Error = InvalidPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}
