// Distribution stages - the ordered lifecycle of the distribution

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown distribution stage: {0}")]
pub struct StageParseError(pub String);

/// A named phase of the distribution
///
/// Stages are totally ordered and the active stage only ever moves one step
/// forward. The derived `Ord` follows declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Presale1,
    Presale2,
    #[serde(rename = "DAOSaleStart")]
    DaoSaleStart,
    #[serde(rename = "DAOSaleEnd")]
    DaoSaleEnd,
    #[serde(rename = "DAOAMMStart")]
    DaoAmmStart,
    Presale2Unlock,
    FinalMint,
    FinalUnlock,
}

impl Stage {
    /// Every stage in lifecycle order
    pub const ALL: [Stage; 8] = [
        Stage::Presale1,
        Stage::Presale2,
        Stage::DaoSaleStart,
        Stage::DaoSaleEnd,
        Stage::DaoAmmStart,
        Stage::Presale2Unlock,
        Stage::FinalMint,
        Stage::FinalUnlock,
    ];

    /// The stage every distribution starts in
    pub const FIRST: Stage = Stage::Presale1;

    /// Position in the lifecycle (0-based)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Stage> {
        Self::ALL.get(index).copied()
    }

    /// The following stage, or `None` for the terminal stage
    pub fn next(self) -> Option<Stage> {
        Self::from_index(self.index() + 1)
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Canonical name used in config files and on the command line
    pub fn name(self) -> &'static str {
        match self {
            Stage::Presale1 => "Presale1",
            Stage::Presale2 => "Presale2",
            Stage::DaoSaleStart => "DAOSaleStart",
            Stage::DaoSaleEnd => "DAOSaleEnd",
            Stage::DaoAmmStart => "DAOAMMStart",
            Stage::Presale2Unlock => "Presale2Unlock",
            Stage::FinalMint => "FinalMint",
            Stage::FinalUnlock => "FinalUnlock",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stage {
    type Err = StageParseError;

    /// Case-insensitive; also accepts the numeric lifecycle index
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return Stage::from_index(index).ok_or_else(|| StageParseError(s.to_string()));
        }
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| StageParseError(s.to_string()))
    }
}
