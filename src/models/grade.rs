use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a grade string is not on the ordinal scale
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognised grade '{0}'")]
pub struct GradeParseError(pub String);

/// A-level grade on an ordinal scale, lowest first so derived ordering
/// matches grade quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    U,
    E,
    D,
    C,
    B,
    A,
    #[serde(rename = "A*")]
    AStar,
}

impl Grade {
    /// Position on the ordinal scale (U = 0 .. A* = 6)
    #[inline]
    pub fn ordinal(self) -> i32 {
        match self {
            Grade::U => 0,
            Grade::E => 1,
            Grade::D => 2,
            Grade::C => 3,
            Grade::B => 4,
            Grade::A => 5,
            Grade::AStar => 6,
        }
    }

    /// Number of grades `self` falls short of `required` (0 if it meets it)
    #[inline]
    pub fn shortfall(self, required: Grade) -> i32 {
        (required.ordinal() - self.ordinal()).max(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::U => "U",
            Grade::E => "E",
            Grade::D => "D",
            Grade::C => "C",
            Grade::B => "B",
            Grade::A => "A",
            Grade::AStar => "A*",
        }
    }
}

impl FromStr for Grade {
    type Err = GradeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        match folded.as_str() {
            "A*" | "A STAR" | "ASTAR" => Ok(Grade::AStar),
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            "U" => Ok(Grade::U),
            _ => Err(GradeParseError(s.to_string())),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
