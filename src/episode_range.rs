//! Episode selection parsing
//!
//! Turns the user's episode expression (nothing, `"5"` or `"3-7"`) into the
//! list of episode numbers to process, checked against the show's episode
//! count.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while parsing or resolving an episode selection
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpisodeRangeError {
    /// The expression is neither a number nor a `start-end` range
    #[error("Invalid episode selection '{0}': expected a number like 5 or a range like 3-7")]
    InvalidSelection(String),

    /// A bound lies outside of the show's episode list
    #[error("Episode {episode} is out of range, the show has {available} episode(s)")]
    EpisodeOutOfRange { episode: usize, available: usize },
}

/// Which episodes of a show to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodeSelection {
    /// The whole series
    #[default]
    All,
    /// Exactly one episode
    Single(usize),
    /// An inclusive range; `start > end` selects nothing
    Range { start: usize, end: usize },
}

impl EpisodeSelection {
    /// Parses an optional episode expression; `None` or blank selects everything
    pub fn parse(expression: Option<&str>) -> Result<Self, EpisodeRangeError> {
        match expression.map(str::trim) {
            None | Some("") => Ok(EpisodeSelection::All),
            Some(expr) => expr.parse(),
        }
    }

    /// Resolves the selection to concrete episode numbers
    ///
    /// Every bound of a non-empty selection must lie within `1..=episode_count`.
    pub fn resolve(&self, episode_count: usize) -> Result<Vec<usize>, EpisodeRangeError> {
        let (start, end) = match *self {
            EpisodeSelection::All => return Ok((1..=episode_count).collect()),
            EpisodeSelection::Single(n) => (n, n),
            EpisodeSelection::Range { start, end } => (start, end),
        };

        if start > end {
            tracing::warn!(start, end, "episode range is reversed, nothing to do");
            return Ok(Vec::new());
        }

        for bound in [start, end] {
            if bound == 0 || bound > episode_count {
                return Err(EpisodeRangeError::EpisodeOutOfRange {
                    episode: bound,
                    available: episode_count,
                });
            }
        }

        Ok((start..=end).collect())
    }
}

impl FromStr for EpisodeSelection {
    type Err = EpisodeRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EpisodeRangeError::InvalidSelection(s.to_string());
        let number = |part: &str| part.trim().parse::<usize>().map_err(|_| invalid());

        match s.split_once('-') {
            None => Ok(EpisodeSelection::Single(number(s)?)),
            Some((start, end)) => Ok(EpisodeSelection::Range {
                start: number(start)?,
                end: number(end)?,
            }),
        }
    }
}

impl fmt::Display for EpisodeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpisodeSelection::All => f.write_str("all"),
            EpisodeSelection::Single(n) => write!(f, "{}", n),
            EpisodeSelection::Range { start, end } => write!(f, "{}-{}", start, end),
        }
    }
}
