use anyhow::{anyhow, bail, Context};
use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::str::FromStr;

use crate::algorithm::{Heuristic, Pathfinder};
use crate::common::{CellType, Position};

/// Roles to paint onto a fresh [`Pathfinder`] grid.
///
/// The text format is one character per cell: `.` empty, `@`, `T` or `#` obstacle,
/// `S` source, `G` goal. An optional MovingAI-style header (`type`, `height`,
/// `width`, `map` lines) fixes the dimensions; without it they are inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: usize,
    pub cols: usize,
    pub source: Option<Position>,
    pub goal: Option<Position>,
    pub obstacles: Vec<Position>,
}

impl GridLayout {
    pub fn empty(rows: usize, cols: usize) -> Self {
        GridLayout {
            rows,
            cols,
            source: None,
            goal: None,
            obstacles: Vec::new(),
        }
    }

    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open map file {path}"))?;
        let reader = BufReader::new(file);
        let lines = reader.lines().collect::<Result<Vec<_>, _>>()?;
        Self::parse(&lines).with_context(|| format!("error with map file: {path}"))
    }

    fn parse(lines: &[String]) -> anyhow::Result<Self> {
        let mut lines = lines.iter().map(|line| line.trim_end()).peekable();

        let mut dimensions = None;
        if lines.peek().is_some_and(|line| line.starts_with("type")) {
            let _type = lines.next();
            let height = Self::header_value(lines.next(), "height")?;
            let width = Self::header_value(lines.next(), "width")?;
            match lines.next() {
                Some("map") => {}
                other => bail!("expected \"map\" line, got {other:?}"),
            }
            dimensions = Some((height, width));
        }

        let rows: Vec<&str> = lines.filter(|line| !line.is_empty()).collect();
        let (height, width) = dimensions.unwrap_or_else(|| {
            let width = rows.first().map_or(0, |row| row.chars().count());
            (rows.len(), width)
        });
        if rows.len() != height {
            bail!("expected {height} rows, found {}", rows.len());
        }

        let mut layout = GridLayout::empty(height, width);
        for (y, row) in rows.iter().enumerate() {
            let tiles: Vec<char> = row.chars().collect();
            if tiles.len() != width {
                bail!("row {y} has {} cells, expected {width}", tiles.len());
            }
            for (x, tile) in tiles.into_iter().enumerate() {
                let position = Position::new(x, y);
                match tile {
                    '.' => {}
                    '@' | 'T' | '#' => layout.obstacles.push(position),
                    'S' => {
                        if layout.source.replace(position).is_some() {
                            bail!("second source at {position}");
                        }
                    }
                    'G' => {
                        if layout.goal.replace(position).is_some() {
                            bail!("second goal at {position}");
                        }
                    }
                    other => bail!("unknown tile {other:?} at {position}"),
                }
            }
        }

        Ok(layout)
    }

    fn header_value(line: Option<&str>, key: &str) -> anyhow::Result<usize> {
        let line = line.ok_or_else(|| anyhow!("missing {key} line"))?;
        let value = line
            .strip_prefix(key)
            .ok_or_else(|| anyhow!("expected {key} line, got {line:?}"))?;
        value
            .trim()
            .parse::<usize>()
            .with_context(|| format!("invalid {key} value {value:?}"))
    }

    /// Source in the top-left corner, goal in the bottom-right corner, and every
    /// other cell an obstacle with probability `density`.
    pub fn random<R: Rng + ?Sized>(rows: usize, cols: usize, density: f64, rng: &mut R) -> Self {
        let mut layout = GridLayout::empty(rows, cols);
        if rows == 0 || cols == 0 {
            return layout;
        }

        let source = Position::new(0, 0);
        let goal = Position::new(cols - 1, rows - 1);
        layout.source = Some(source);
        layout.goal = Some(goal);

        for y in 0..rows {
            for x in 0..cols {
                let position = Position::new(x, y);
                if position != source && position != goal && rng.gen_bool(density) {
                    layout.obstacles.push(position);
                }
            }
        }

        layout
    }

    pub fn with_source(mut self, source: Option<Position>) -> Self {
        if source.is_some() {
            self.obstacles.retain(|&position| Some(position) != source);
            self.source = source;
        }
        self
    }

    pub fn with_goal(mut self, goal: Option<Position>) -> Self {
        if goal.is_some() {
            self.obstacles.retain(|&position| Some(position) != goal);
            self.goal = goal;
        }
        self
    }

    /// Paints the layout onto a fresh grid. Cells out of bounds are dropped the
    /// same way `set_cell_type` drops them.
    pub fn to_pathfinder(&self, heuristic: Heuristic) -> Pathfinder {
        let mut pathfinder = Pathfinder::new(self.rows, self.cols, heuristic);
        for obstacle in &self.obstacles {
            pathfinder.set_cell_type(obstacle.x, obstacle.y, CellType::Obstacle);
        }
        if let Some(source) = self.source {
            pathfinder.set_cell_type(source.x, source.y, CellType::Source);
        }
        if let Some(goal) = self.goal {
            pathfinder.set_cell_type(goal.x, goal.y, CellType::Goal);
        }
        pathfinder
    }
}

impl FromStr for GridLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lines: Vec<String> = s.lines().map(str::to_string).collect();
        Self::parse(&lines)
    }
}
