// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Scratch memory budget.

use crate::ArenaError;
use std::fmt;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// Suffixes accepted by [`MemoryBudget::parse`], longest first.
const SUFFIXES: [(&str, usize); 7] = [
    ("GB", GB),
    ("MB", MB),
    ("KB", KB),
    ("G", GB),
    ("M", MB),
    ("K", KB),
    ("B", 1),
];

/// Upper bound on live scratch bytes within one evaluation.
///
/// ```
/// use eval_arena::MemoryBudget;
///
/// assert_eq!(MemoryBudget::parse("64M").unwrap().as_bytes(), 64 << 20);
/// assert_eq!(MemoryBudget::parse("4096").unwrap().as_bytes(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MB }
    }

    /// No practical limit.
    pub fn unlimited() -> Self {
        Self { bytes: usize::MAX }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Parses `"64M"`, `"512KB"`, `"1g"` or a plain byte count.
    pub fn parse(s: &str) -> Result<Self, ArenaError> {
        let invalid = || ArenaError::InvalidBudget(s.to_string());
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();
        let (digits, unit) = SUFFIXES
            .iter()
            .find(|(suffix, _)| upper.ends_with(suffix))
            .map(|&(suffix, unit)| (&trimmed[..trimmed.len() - suffix.len()], unit))
            .unwrap_or((trimmed, 1));
        let count: usize = digits.trim().parse().map_err(|_| invalid())?;
        match count.checked_mul(unit) {
            Some(bytes) if bytes > 0 => Ok(Self { bytes }),
            _ => Err(invalid()),
        }
    }
}

impl Default for MemoryBudget {
    fn default() -> Self {
        Self::from_mb(64)
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bytes == usize::MAX {
            return f.write_str("unlimited");
        }
        match [(GB, "G"), (MB, "M"), (KB, "K")]
            .into_iter()
            .find(|&(unit, _)| self.bytes >= unit && self.bytes % unit == 0)
        {
            Some((unit, suffix)) => write!(f, "{}{suffix}", self.bytes / unit),
            None => write!(f, "{}B", self.bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(MemoryBudget::parse("64M").unwrap().as_bytes(), 64 * MB);
        assert_eq!(MemoryBudget::parse("64mb").unwrap().as_bytes(), 64 * MB);
        assert_eq!(MemoryBudget::parse("2G").unwrap().as_bytes(), 2 * GB);
        assert_eq!(MemoryBudget::parse(" 512 KB ").unwrap().as_bytes(), 512 * KB);
        assert_eq!(MemoryBudget::parse("100B").unwrap().as_bytes(), 100);
        assert_eq!(MemoryBudget::parse("100").unwrap().as_bytes(), 100);
    }

    #[test]
    fn test_parse_rejects() {
        for bad in ["", "M", "0K", "-1M", "twelve", "99999999999999999999G"] {
            assert_eq!(
                MemoryBudget::parse(bad),
                Err(ArenaError::InvalidBudget(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for budget in [
            MemoryBudget::from_mb(64),
            MemoryBudget::from_bytes(3 * GB),
            MemoryBudget::from_bytes(1536),
            MemoryBudget::from_bytes(1000),
        ] {
            assert_eq!(MemoryBudget::parse(&budget.to_string()).unwrap(), budget);
        }
        assert_eq!(MemoryBudget::default().to_string(), "64M");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&MemoryBudget::from_bytes(10)).unwrap();
        assert_eq!(json, r#"{"bytes":10}"#);
    }
}
