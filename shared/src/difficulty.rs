use std::{fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;

/// the host's chosen pace. only the label crosses the wire, each peer derives the tick interval
/// from it locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn tick_interval(self) -> Duration {
        Duration::from_millis(match self {
            Difficulty::Easy => 80,
            Difficulty::Medium => 40,
            Difficulty::Hard => 20,
        })
    }
}

impl Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self.label(), f)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown difficulty {0:?}, expected easy, medium or hard")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseDifficultyError(s.to_owned()))
    }
}
