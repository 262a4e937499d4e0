// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Jamie Adams (a.k.a, Imodium Operator)
// ===========================================================================
//! MLS clearance range primitive for `SELinux` contexts and user declarations.
//!
//! A range pairs a low (current) level with an optional high (clearance)
//! level. When the high level is absent the range is a single point —
//! low and high coincide.
//!
//! Canonical forms supported:
//!
//! ```text
//! s0
//! s0:c0
//! s0-s2
//! s0:c0-s2:c0,c1
//! ```
// ===========================================================================

use std::fmt;
use std::str::FromStr;

use crate::mls::level::MlsLevel;

/// Represents an MLS clearance range: `low_level - high_level`.
///
/// When the range collapses to a single level (no `-` present in the
/// source form), `low` and `high` are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[must_use]
pub struct MlsRange {
    low: MlsLevel,
    high: MlsLevel,
}

impl MlsRange {
    /// Constructs a range from validated low/high levels.
    ///
    /// Does not itself check that `high` dominates `low`; callers that
    /// require a well-formed clearance range should call
    /// [`MlsRange::is_well_formed`] separately.
    pub const fn new(low: MlsLevel, high: MlsLevel) -> Self {
        Self { low, high }
    }

    /// Constructs a single-point range (low == high).
    pub fn single(level: MlsLevel) -> Self {
        Self {
            low: level.clone(),
            high: level,
        }
    }

    #[must_use]
    pub const fn low(&self) -> &MlsLevel {
        &self.low
    }

    #[must_use]
    pub const fn high(&self) -> &MlsLevel {
        &self.high
    }

    /// True when the high level of this range dominates its low level,
    /// per §9 of the MLS dominance lattice (higher sensitivity, superset
    /// of categories).
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.high.sensitivity() >= self.low.sensitivity()
            && self.high.categories().dominates(self.low.categories())
    }

    /// Range dominance test: does `self` dominate `other` as a whole?
    ///
    /// A range R1 dominates R2 when R1's high level dominates R2's high
    /// level and R1's low level is dominated by (or equal to) R2's low
    /// level — i.e. R1 is at least as permissive on both ends.
    #[must_use]
    pub fn dominates(&self, other: &Self) -> bool {
        level_dominates(&self.high, &other.high) && level_dominates(&other.low, &self.low)
    }
}

fn level_dominates(a: &MlsLevel, b: &MlsLevel) -> bool {
    a.sensitivity() >= b.sensitivity() && a.categories().dominates(b.categories())
}

impl fmt::Display for MlsRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}-{}", self.low, self.high)
        }
    }
}

/// Errors that can occur while parsing an MLS range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlsRangeError {
    Empty,
    InvalidLow,
    InvalidHigh,
}

impl fmt::Display for MlsRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "MLS range cannot be empty"),
            Self::InvalidLow => write!(f, "invalid low level in MLS range"),
            Self::InvalidHigh => write!(f, "invalid high level in MLS range"),
        }
    }
}

impl std::error::Error for MlsRangeError {}

impl FromStr for MlsRange {
    type Err = MlsRangeError;

    /// Parses `low-high` or a bare `low` (single-point range).
    ///
    /// The separating `-` is only recognized between two well-formed
    /// level strings; a level string itself never contains `-`, so a
    /// simple split on the first `-` is unambiguous.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.is_empty() {
            return Err(MlsRangeError::Empty);
        }

        match s.split_once('-') {
            Some((low_str, high_str)) => {
                let low =
                    MlsLevel::from_str(low_str).map_err(|_| MlsRangeError::InvalidLow)?;
                let high =
                    MlsLevel::from_str(high_str).map_err(|_| MlsRangeError::InvalidHigh)?;
                Ok(Self::new(low, high))
            }
            None => {
                let level = MlsLevel::from_str(s).map_err(|_| MlsRangeError::InvalidLow)?;
                Ok(Self::single(level))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_point_range_parses() {
        let r: MlsRange = "s0:c0".parse().unwrap();
        assert_eq!(r.low(), r.high());
        assert_eq!(r.to_string(), "s0:c0");
    }

    #[test]
    fn two_sided_range_parses_and_displays() {
        let r: MlsRange = "s0-s2:c0,c1".parse().unwrap();
        assert_eq!(r.to_string(), "s0-s2:c0,c1");
        assert!(r.is_well_formed());
    }

    #[test]
    fn malformed_high_is_rejected() {
        let err = MlsRange::from_str("s0-zzz").unwrap_err();
        assert_eq!(err, MlsRangeError::InvalidHigh);
    }

    #[test]
    fn range_dominance_is_reflexive() {
        let r: MlsRange = "s0-s2:c0,c1".parse().unwrap();
        assert!(r.dominates(&r));
    }
}
