//! Two-part record versions (`MM.mm`)
//!
//! Every record carries a version that is stamped once at creation and
//! advanced exactly once per successful update. The minor component counts
//! 0..=9; advancing past 9 bumps the major component and resets minor to 0,
//! so `00.09` is followed by `01.00`, never `00.10`.
//!
//! ## Parsing policy
//!
//! Two dot-separated components, ASCII digits only, each at least two digits
//! wide. `"1.2"` is rejected; `"100.00"` is accepted because majors past 99
//! print unpadded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::kind::EntityKind;

/// Highest minor value before a major rollover
pub const MAX_MINOR: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    major: u32,
    minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Creation-time version for an entity kind
    pub fn initial(kind: EntityKind) -> Self {
        kind.descriptor().initial_version
    }

    /// The version that follows this one.
    ///
    /// Fails only when the major component cannot grow any further; a
    /// version never wraps around to a smaller value.
    pub fn next(&self) -> Result<Self, StorageError> {
        if self.minor < MAX_MINOR {
            return Ok(Self::new(self.major, self.minor + 1));
        }
        self.major
            .checked_add(1)
            .map(|major| Self::new(major, 0))
            .ok_or_else(|| StorageError::VersionExhausted(self.to_string()))
    }

    pub fn parse(s: &str) -> Result<Self, StorageError> {
        let malformed = || StorageError::MalformedVersion(s.to_string());

        let (major, minor) = s.split_once('.').ok_or_else(malformed)?;
        let major = parse_component(major).ok_or_else(malformed)?;
        let minor = parse_component(minor).ok_or_else(malformed)?;

        Ok(Self::new(major, minor))
    }
}

fn parse_component(part: &str) -> Option<u32> {
    if part.len() < 2 || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Compute the version that follows a stored version string
pub fn next(current: &str) -> Result<Version, StorageError> {
    Version::parse(current)?.next()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}.{:02}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Version {
    type Error = StorageError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Version> for String {
    fn from(v: Version) -> Self {
        v.to_string()
    }
}
