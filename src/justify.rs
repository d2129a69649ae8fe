//! Horizontal and vertical justification of content inside a region.
//!
//! Both enums parse from their long names (`start`, `center`, `end`,
//! `even-split`) and from the single-character shorthand used in layout
//! descriptions (`<`, `^`, `>` horizontally; `^`, `=`, `v` vertically).

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;

/// Placement of a row's content within the row width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HJust {
    #[default]
    Start,
    Center,
    End,
}

impl HJust {
    /// Split `pad` blank columns into (left, right) amounts.
    pub fn split(self, pad: usize) -> (usize, usize) {
        match self {
            Self::Start => (0, pad),
            Self::Center => (pad / 2, pad - pad / 2),
            Self::End => (pad, 0),
        }
    }
}

impl FromStr for HJust {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "<" | "start" | "left" => Ok(Self::Start),
            "^" | "center" => Ok(Self::Center),
            ">" | "end" | "right" => Ok(Self::End),
            other => Err(ConfigurationError::InvalidJustification(other.to_string())),
        }
    }
}

impl fmt::Display for HJust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Center => "center",
            Self::End => "end",
        };
        f.write_str(name)
    }
}

/// Placement of a node's content rows within the node height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VJust {
    #[default]
    Start,
    /// Surplus rows split with the larger half above.
    Center,
    End,
    /// Surplus rows split with the smaller half (`surplus / 2`) above.
    EvenSplit,
}

impl VJust {
    /// Number of blank rows placed above the content.
    pub fn rows_above(self, surplus: usize) -> usize {
        match self {
            Self::Start => 0,
            Self::Center => surplus - surplus / 2,
            Self::End => surplus,
            Self::EvenSplit => surplus / 2,
        }
    }
}

impl FromStr for VJust {
    type Err = ConfigurationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "^" | "start" | "top" => Ok(Self::Start),
            "center" | "middle" => Ok(Self::Center),
            "v" | "end" | "bottom" => Ok(Self::End),
            "=" | "even-split" | "even_split" => Ok(Self::EvenSplit),
            other => Err(ConfigurationError::InvalidJustification(other.to_string())),
        }
    }
}

impl fmt::Display for VJust {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Center => "center",
            Self::End => "end",
            Self::EvenSplit => "even-split",
        };
        f.write_str(name)
    }
}
