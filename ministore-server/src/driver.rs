//! Selection of the storage driver backing the object API.
//!
//! The driver is chosen once at startup from a free-form identifier. Use [`DriverKind::resolve`]
//! to turn operator input into a [`DriverKind`]. Unknown identifiers are never fatal: they are
//! logged and replaced with [`DriverKind::FALLBACK`].

use std::fmt;
use std::str::FromStr;

/// The driver type used when none is configured.
///
/// Note that this differs from [`DriverKind::FALLBACK`], which applies to unrecognized input.
pub const DEFAULT_DRIVER_TYPE: &str = "donut";

/// The storage backend serving the object API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum DriverKind {
    /// Objects stored as plain files in a local directory (`"file"`).
    File,
    /// Objects held in process memory (`"memory"`).
    Memory,
    /// Content-addressable storage (`"donut"`).
    Donut,
}

impl DriverKind {
    /// The driver chosen when the configured identifier is not recognized.
    pub const FALLBACK: Self = Self::File;

    /// Returns the canonical identifier of this driver.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Memory => "memory",
            Self::Donut => "donut",
        }
    }

    /// Resolves a driver identifier, falling back to [`Self::FALLBACK`].
    ///
    /// Matching is exact and case-sensitive. When the input is not a known identifier, two warnings
    /// are logged (the rejected value and the chosen default) and the fallback is returned.
    pub fn resolve(input: &str) -> Self {
        match input.parse() {
            Ok(kind) => kind,
            Err(DriverParseError(input)) => {
                tracing::warn!("unknown driver type: {input}");
                tracing::warn!("choosing default driver type as '{}'", Self::FALLBACK);
                Self::FALLBACK
            }
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown driver identifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DriverParseError(String);

impl fmt::Display for DriverParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as driver type: expected one of "file", "memory", "donut""#,
            self.0
        )
    }
}

impl std::error::Error for DriverParseError {}

impl FromStr for DriverKind {
    type Err = DriverParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = match s {
            "file" => DriverKind::File,
            "memory" => DriverKind::Memory,
            "donut" => DriverKind::Donut,
            s => return Err(DriverParseError(s.into())),
        };

        Ok(result)
    }
}

/// Resolves a driver identifier. See [`DriverKind::resolve`].
pub fn resolve_driver(input: &str) -> DriverKind {
    DriverKind::resolve(input)
}
