use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grid coordinate: `x` is the column, `y` is the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Position {
    type Err = anyhow::Error;

    // Accepts "x,y" with optional whitespace and parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')');
        let (x, y) = trimmed
            .split_once(',')
            .ok_or_else(|| anyhow!("expected a position as \"x,y\", got {s:?}"))?;
        let x = x
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid x coordinate in {s:?}"))?;
        let y = y
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid y coordinate in {s:?}"))?;
        Ok(Position { x, y })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    #[default]
    Empty,
    Source,
    Goal,
    Obstacle,
}

impl CellType {
    pub(crate) fn symbol(self) -> char {
        match self {
            CellType::Empty => '.',
            CellType::Source => 'S',
            CellType::Goal => 'G',
            CellType::Obstacle => '#',
        }
    }
}
