//! Workflow-type bitmask.
//!
//! A configure step declares which workflow variants it belongs to. Matching
//! is a bitwise intersection, so one step can serve an initial install and an
//! upgrade at the same time.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::error::{Result, StagehandError};

/// Bitset of workflow variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct WorkflowMask(u32);

impl WorkflowMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// First-time installation.
    pub const INSTALL: Self = Self(1 << 0);
    /// Upgrade of an existing installation.
    pub const UPGRADE: Self = Self(1 << 1);
    /// Repair of an existing installation.
    pub const REPAIR: Self = Self(1 << 2);
    /// Every workflow variant.
    pub const ALL: Self = Self(Self::INSTALL.0 | Self::UPGRADE.0 | Self::REPAIR.0);

    const NAMES: [(&'static str, WorkflowMask); 3] = [
        ("install", Self::INSTALL),
        ("upgrade", Self::UPGRADE),
        ("repair", Self::REPAIR),
    ];

    /// Raw bit value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if no bit is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if `self` and `other` share at least one variant.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True if every bit of `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Build a mask from a list of workflow names.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names
            .iter()
            .try_fold(Self::NONE, |acc, name| Ok(acc | name.as_ref().parse::<Self>()?))
    }

    /// Names of the variants set in this mask, in declaration order.
    pub fn names(self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(_, mask)| self.contains(*mask))
            .map(|(name, _)| *name)
            .collect()
    }
}

impl BitOr for WorkflowMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for WorkflowMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl FromStr for WorkflowMask {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_lowercase();
        if name == "all" {
            return Ok(Self::ALL);
        }
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, mask)| *mask)
            .ok_or_else(|| StagehandError::UnknownWorkflow {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for WorkflowMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ALL {
            return write!(f, "all");
        }
        if self.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", self.names().join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersects_is_bitwise() {
        let both = WorkflowMask::INSTALL | WorkflowMask::UPGRADE;
        assert!(both.intersects(WorkflowMask::INSTALL));
        assert!(both.intersects(WorkflowMask::UPGRADE));
        assert!(!both.intersects(WorkflowMask::REPAIR));
        assert!(WorkflowMask::ALL.intersects(WorkflowMask::REPAIR));
    }

    #[test]
    fn none_matches_nothing() {
        assert!(!WorkflowMask::NONE.intersects(WorkflowMask::ALL));
        assert!(WorkflowMask::NONE.is_empty());
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Install".parse::<WorkflowMask>().unwrap(), WorkflowMask::INSTALL);
        assert_eq!("all".parse::<WorkflowMask>().unwrap(), WorkflowMask::ALL);
        assert!(matches!(
            "reinstall".parse::<WorkflowMask>(),
            Err(StagehandError::UnknownWorkflow { .. })
        ));
    }

    #[test]
    fn from_names_combines_bits() {
        let mask = WorkflowMask::from_names(&["install", "repair"]).unwrap();
        assert!(mask.contains(WorkflowMask::INSTALL));
        assert!(mask.contains(WorkflowMask::REPAIR));
        assert!(!mask.contains(WorkflowMask::UPGRADE));
    }

    #[test]
    fn display_lists_names() {
        assert_eq!(WorkflowMask::ALL.to_string(), "all");
        assert_eq!(
            (WorkflowMask::INSTALL | WorkflowMask::UPGRADE).to_string(),
            "install+upgrade"
        );
        assert_eq!(WorkflowMask::NONE.to_string(), "none");
    }
}
