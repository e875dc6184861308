use anyhow::anyhow;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::algorithm::{Heuristic, SortAlgorithm};
use crate::common::Position;

pub const MAX_GRID_SIZE: usize = 50;
/// Largest `n` whose `n! - 1` swaps fit in the iteration cap.
pub const MAX_PERMUTATION_SIZE: usize = 6;
pub const MAX_SORT_SIZE: usize = 100;

#[derive(Parser, Debug)]
#[command(
    name = "algoverse",
    about = "Step-by-step traces of classic algorithms: A*, Huffman coding, Johnson-Trotter and sorting.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(
        long,
        help = "Replay the steps on a timer instead of printing them at once",
        default_value_t = false
    )]
    pub play: bool,

    #[arg(long, help = "Delay between steps in play mode, in milliseconds")]
    pub interval_ms: Option<u64>,

    #[arg(long, help = "Playback speed multiplier (1-16)")]
    pub speed: Option<u32>,

    #[arg(long, help = "Log filter, e.g. info or algoverse=trace")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Step A* over a grid loaded from a map file or generated at random
    Astar {
        #[arg(long, help = "Path to the map file")]
        map_path: Option<String>,

        #[arg(long, help = "Rows of a generated grid")]
        rows: Option<usize>,

        #[arg(long, help = "Columns of a generated grid")]
        cols: Option<usize>,

        #[arg(long, help = "manhattan, diagonal or euclidean")]
        heuristic: Option<Heuristic>,

        #[arg(long, help = "Obstacle probability of a generated grid")]
        obstacle_density: Option<f64>,

        #[arg(long, help = "Source cell as x,y")]
        source: Option<Position>,

        #[arg(long, help = "Goal cell as x,y")]
        goal: Option<Position>,
    },
    /// Build a Huffman tree and its code table
    Huffman {
        #[arg(long, help = "Text to count symbol frequencies from")]
        text: Option<String>,
    },
    /// Enumerate permutations of 1..=n with Johnson-Trotter
    Permutations {
        #[arg(long, help = "Number of values to permute")]
        n: Option<usize>,
    },
    /// Trace a sorting algorithm
    Sort {
        #[arg(long, help = "bubble, insertion, selection, quick or merge")]
        algorithm: Option<SortAlgorithm>,

        #[arg(
            long,
            help = "Values to sort; random values are generated otherwise",
            use_value_delimiter = true,
            allow_negative_numbers = true
        )]
        values: Vec<i64>,

        #[arg(long, help = "Number of random values")]
        size: Option<usize>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("unknown output format {s:?}, expected text or json")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub map_path: Option<String>,
    pub rows: usize,
    pub cols: usize,
    pub heuristic: Heuristic,
    pub obstacle_density: f64,
    pub source: Option<Position>,
    pub goal: Option<Position>,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            map_path: None,
            rows: 20,
            cols: 20,
            heuristic: Heuristic::default(),
            obstacle_density: 0.25,
            source: None,
            goal: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HuffmanConfig {
    pub text: Option<String>,
    /// Overrides the classic six-symbol table when non-empty.
    pub frequencies: BTreeMap<char, u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PermutationConfig {
    pub n: usize,
}

impl Default for PermutationConfig {
    fn default() -> Self {
        PermutationConfig { n: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub algorithm: SortAlgorithm,
    pub values: Vec<i64>,
    pub size: usize,
    pub min: i64,
    pub max: i64,
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            algorithm: SortAlgorithm::default(),
            values: Vec::new(),
            size: 8,
            min: 1,
            max: 99,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub format: OutputFormat,
    pub seed: u64,
    pub play: bool,
    pub interval_ms: u64,
    pub speed: u32,
    pub log_level: String,
    pub grid: GridConfig,
    pub huffman: HuffmanConfig,
    pub permutations: PermutationConfig,
    pub sort: SortConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            format: OutputFormat::default(),
            seed: 0,
            play: false,
            interval_ms: 800,
            speed: 1,
            log_level: "info".to_string(),
            grid: GridConfig::default(),
            huffman: HuffmanConfig::default(),
            permutations: PermutationConfig::default(),
            sort: SortConfig::default(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Applies every option given on the command line, then validates.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(format) = cli.format {
            self.format = format;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if cli.play {
            self.play = true;
        }
        if let Some(interval_ms) = cli.interval_ms {
            self.interval_ms = interval_ms;
        }
        if let Some(speed) = cli.speed {
            self.speed = speed;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = log_level.clone();
        }

        match &cli.command {
            Command::Astar {
                map_path,
                rows,
                cols,
                heuristic,
                obstacle_density,
                source,
                goal,
            } => {
                let grid = &mut self.grid;
                if map_path.is_some() {
                    grid.map_path = map_path.clone();
                }
                grid.rows = rows.unwrap_or(grid.rows);
                grid.cols = cols.unwrap_or(grid.cols);
                grid.heuristic = heuristic.unwrap_or(grid.heuristic);
                grid.obstacle_density = obstacle_density.unwrap_or(grid.obstacle_density);
                grid.source = source.or(grid.source);
                grid.goal = goal.or(grid.goal);
            }
            Command::Huffman { text } => {
                if text.is_some() {
                    self.huffman.text = text.clone();
                }
            }
            Command::Permutations { n } => {
                self.permutations.n = n.unwrap_or(self.permutations.n);
            }
            Command::Sort {
                algorithm,
                values,
                size,
            } => {
                self.sort.algorithm = algorithm.unwrap_or(self.sort.algorithm);
                if !values.is_empty() {
                    self.sort.values = values.clone();
                }
                self.sort.size = size.unwrap_or(self.sort.size);
            }
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_ms == 0 {
            return Err(anyhow!("Play interval must be positive"));
        }
        if !(1..=crate::player::MAX_SPEED).contains(&self.speed) {
            return Err(anyhow!(
                "Speed must be between 1 and {}, got {}",
                crate::player::MAX_SPEED,
                self.speed
            ));
        }

        let grid = &self.grid;
        if grid.map_path.is_none() {
            for (name, value) in [("rows", grid.rows), ("cols", grid.cols)] {
                if !(1..=MAX_GRID_SIZE).contains(&value) {
                    return Err(anyhow!(
                        "Grid {name} must be between 1 and {MAX_GRID_SIZE}, got {value}"
                    ));
                }
            }
            for position in [grid.source, grid.goal].into_iter().flatten() {
                if position.x >= grid.cols || position.y >= grid.rows {
                    return Err(anyhow!(
                        "Position {position} is outside the {}x{} grid",
                        grid.rows,
                        grid.cols
                    ));
                }
            }
        }
        if !(0.0..1.0).contains(&grid.obstacle_density) {
            return Err(anyhow!(
                "Obstacle density must be in [0, 1), got {}",
                grid.obstacle_density
            ));
        }

        if self.huffman.frequencies.values().any(|&frequency| frequency == 0) {
            return Err(anyhow!("Huffman frequencies must be positive"));
        }
        let total = self
            .huffman
            .frequencies
            .values()
            .try_fold(0u64, |total, &frequency| total.checked_add(frequency));
        if total.is_none() {
            return Err(anyhow!("Huffman frequencies must sum to at most {}", u64::MAX));
        }

        if self.permutations.n > MAX_PERMUTATION_SIZE {
            return Err(anyhow!(
                "Permutation size must be at most {MAX_PERMUTATION_SIZE}, got {}",
                self.permutations.n
            ));
        }

        let sort = &self.sort;
        if sort.size > MAX_SORT_SIZE || sort.values.len() > MAX_SORT_SIZE {
            return Err(anyhow!("At most {MAX_SORT_SIZE} values can be sorted"));
        }
        if sort.min > sort.max {
            return Err(anyhow!(
                "Sort value range is empty: min {} > max {}",
                sort.min,
                sort.max
            ));
        }

        Ok(())
    }
}
