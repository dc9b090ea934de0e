//! Version constraint policy

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Restricts which candidate versions count as in-scope updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionConstraint {
    /// Any newer version
    #[default]
    Major,
    /// Same major version as the current one
    Minor,
    /// Same major and minor version as the current one
    Patch,
}

impl VersionConstraint {
    /// Returns the configuration name of this constraint
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionConstraint::Major => "major",
            VersionConstraint::Minor => "minor",
            VersionConstraint::Patch => "patch",
        }
    }

    /// Returns true if this constraint narrows the candidate set
    pub fn is_restrictive(&self) -> bool {
        !matches!(self, VersionConstraint::Major)
    }
}

impl FromStr for VersionConstraint {
    type Err = ConfigError;

    /// An empty string is the same as `major`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "major" => Ok(VersionConstraint::Major),
            "minor" => Ok(VersionConstraint::Minor),
            "patch" => Ok(VersionConstraint::Patch),
            other => Err(ConfigError::InvalidConstraint {
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
