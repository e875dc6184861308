use crate::common::{CellType, Position};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::f64::consts::SQRT_2;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument, trace};

const AXIS_MOVES: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)]; // N, E, S, W
const DIAGONAL_MOVES: [(isize, isize); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)]; // NE, SE, SW, NW

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heuristic {
    /// `dx + dy`; also restricts movement to the four axis directions.
    Manhattan,
    /// `max(dx, dy) + (sqrt(2) - 1) * min(dx, dy)`.
    Diagonal,
    #[default]
    Euclidean,
}

impl Heuristic {
    pub fn estimate(self, from: Position, to: Position) -> f64 {
        let dx = from.x.abs_diff(to.x) as f64;
        let dy = from.y.abs_diff(to.y) as f64;
        match self {
            Heuristic::Manhattan => dx + dy,
            Heuristic::Diagonal => dx.max(dy) + (SQRT_2 - 1.0) * dx.min(dy),
            Heuristic::Euclidean => (dx * dx + dy * dy).sqrt(),
        }
    }

    pub fn allows_diagonal_moves(self) -> bool {
        !matches!(self, Heuristic::Manhattan)
    }
}

impl FromStr for Heuristic {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manhattan" => Ok(Heuristic::Manhattan),
            "diagonal" | "octile" => Ok(Heuristic::Diagonal),
            "euclidean" => Ok(Heuristic::Euclidean),
            _ => Err(anyhow!(
                "unknown heuristic {s:?}, expected manhattan, diagonal or euclidean"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub position: Position,
    pub cell_type: CellType,
    pub g: f64,
    pub h: f64,
    pub f: f64,
    /// Index of the predecessor on the best known path, into the grid's backing array.
    pub parent: Option<usize>,
    pub in_open_list: bool,
    pub in_closed_list: bool,
}

impl Cell {
    fn new(position: Position) -> Self {
        Cell {
            position,
            cell_type: CellType::Empty,
            g: f64::INFINITY,
            h: 0.0,
            f: f64::INFINITY,
            parent: None,
            in_open_list: false,
            in_closed_list: false,
        }
    }

    fn clear_search(&mut self) {
        self.g = f64::INFINITY;
        self.h = 0.0;
        self.f = f64::INFINITY;
        self.parent = None;
        self.in_open_list = false;
        self.in_closed_list = false;
    }
}

/// Everything a search step can tell an observer about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SearchEvent {
    Expanded { position: Position, g: f64, f: f64 },
    Discovered { position: Position, g: f64, h: f64 },
    Relaxed { position: Position, old_g: f64, new_g: f64 },
    PathFound { cost: f64, length: usize },
    Exhausted,
}

pub trait SearchObserver {
    fn on_event(&mut self, event: &SearchEvent);
}

impl<F: FnMut(&SearchEvent)> SearchObserver for F {
    fn on_event(&mut self, event: &SearchEvent) {
        self(event)
    }
}

// Open list ordering: lower f first, then lower h. Equal keys keep list order,
// which is insertion order since the open list is never reordered.
#[derive(Debug, Clone, Copy)]
struct OpenOrder {
    f: f64,
    h: f64,
}

impl PartialEq for OpenOrder {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenOrder {}

impl PartialOrd for OpenOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f
            .total_cmp(&other.f)
            .then_with(|| self.h.total_cmp(&other.h))
    }
}

/// Full snapshot handed to a presentation layer after every mutating call.
#[derive(Debug, Clone, Serialize)]
pub struct PathfinderState {
    pub rows: usize,
    pub cols: usize,
    pub heuristic: Heuristic,
    pub grid: Vec<Vec<Cell>>,
    pub open_list: Vec<Cell>,
    pub closed_list: Vec<Cell>,
    pub current_node: Option<Cell>,
    pub path: Vec<Cell>,
    pub is_complete: bool,
    pub is_path_found: bool,
    pub status_text: String,
    pub source: Option<Position>,
    pub goal: Option<Position>,
}

impl fmt::Display for PathfinderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.current_node.as_ref().map(|cell| cell.position);
        let on_path: Vec<Position> = self.path.iter().map(|cell| cell.position).collect();

        for row in &self.grid {
            let line: String = row
                .iter()
                .map(|cell| match cell.cell_type {
                    CellType::Source | CellType::Goal | CellType::Obstacle => {
                        cell.cell_type.symbol()
                    }
                    CellType::Empty if on_path.contains(&cell.position) => '*',
                    CellType::Empty if Some(cell.position) == current => '@',
                    CellType::Empty if cell.in_closed_list => 'x',
                    CellType::Empty if cell.in_open_list => 'o',
                    CellType::Empty => '.',
                })
                .collect();
            writeln!(f, "{line}")?;
        }
        write!(f, "{}", self.status_text)
    }
}

/// A* over a fixed-size grid, advanced one node expansion at a time.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    rows: usize,
    cols: usize,
    heuristic: Heuristic,
    grid: Vec<Cell>,
    open_list: Vec<usize>,
    closed_list: Vec<usize>,
    source: Option<Position>,
    goal: Option<Position>,
    current: Option<usize>,
    path: Vec<usize>,
    is_complete: bool,
    is_path_found: bool,
    status_text: String,
}

impl Pathfinder {
    pub fn new(rows: usize, cols: usize, heuristic: Heuristic) -> Self {
        let grid = (0..rows)
            .flat_map(|y| (0..cols).map(move |x| Cell::new(Position::new(x, y))))
            .collect();

        Pathfinder {
            rows,
            cols,
            heuristic,
            grid,
            open_list: Vec::new(),
            closed_list: Vec::new(),
            source: None,
            goal: None,
            current: None,
            path: Vec::new(),
            is_complete: false,
            is_path_found: false,
            status_text: "Ready to start".to_string(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn heuristic(&self) -> Heuristic {
        self.heuristic
    }

    pub fn set_heuristic(&mut self, heuristic: Heuristic) {
        self.heuristic = heuristic;
    }

    pub fn source(&self) -> Option<Position> {
        self.source
    }

    pub fn goal(&self) -> Option<Position> {
        self.goal
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn is_path_found(&self) -> bool {
        self.is_path_found
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.index(x, y).map(|idx| &self.grid[idx])
    }

    pub fn open_positions(&self) -> Vec<Position> {
        self.positions(&self.open_list)
    }

    pub fn closed_positions(&self) -> Vec<Position> {
        self.positions(&self.closed_list)
    }

    /// Reconstructed path from source to goal, empty until the goal is expanded.
    pub fn path_positions(&self) -> Vec<Position> {
        self.positions(&self.path)
    }

    /// Cost of the reconstructed path, i.e. the goal's `g`.
    pub fn path_cost(&self) -> Option<f64> {
        self.path.last().map(|&idx| self.grid[idx].g)
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.cols && y < self.rows).then_some(y * self.cols + x)
    }

    fn index_of(&self, position: Position) -> usize {
        position.y * self.cols + position.x
    }

    fn positions(&self, indices: &[usize]) -> Vec<Position> {
        indices.iter().map(|&idx| self.grid[idx].position).collect()
    }

    /// Assigns a role to a cell. Out-of-bounds coordinates are ignored.
    /// A new source or goal demotes the previous holder of that role to empty.
    pub fn set_cell_type(&mut self, x: usize, y: usize, cell_type: CellType) {
        let Some(idx) = self.index(x, y) else {
            trace!("ignore out of bounds cell ({x}, {y})");
            return;
        };
        let position = Position::new(x, y);

        match cell_type {
            CellType::Source => {
                if let Some(previous) = self.source.take() {
                    let previous_idx = self.index_of(previous);
                    self.grid[previous_idx].cell_type = CellType::Empty;
                }
            }
            CellType::Goal => {
                if let Some(previous) = self.goal.take() {
                    let previous_idx = self.index_of(previous);
                    self.grid[previous_idx].cell_type = CellType::Empty;
                }
            }
            CellType::Empty | CellType::Obstacle => {}
        }

        // Overwriting the current holder of a role forgets that role.
        if self.source == Some(position) {
            self.source = None;
        }
        if self.goal == Some(position) {
            self.goal = None;
        }

        self.grid[idx].cell_type = cell_type;
        match cell_type {
            CellType::Source => self.source = Some(position),
            CellType::Goal => self.goal = Some(position),
            CellType::Empty | CellType::Obstacle => {}
        }
    }

    pub fn clear_obstacles(&mut self) {
        for cell in self
            .grid
            .iter_mut()
            .filter(|cell| cell.cell_type == CellType::Obstacle)
        {
            cell.cell_type = CellType::Empty;
        }
    }

    /// Clears all search bookkeeping; roles are kept.
    pub fn reset(&mut self) {
        self.open_list.clear();
        self.closed_list.clear();
        self.current = None;
        self.path.clear();
        self.is_complete = false;
        self.is_path_found = false;
        self.status_text = "Ready to start".to_string();
        self.grid.iter_mut().for_each(Cell::clear_search);
    }

    /// Seeds the open list with the source. Returns false, without touching the
    /// grid, when source or goal is missing.
    pub fn initialize(&mut self) -> bool {
        let (Some(source), Some(goal)) = (self.source, self.goal) else {
            self.status_text = "Please set source and goal".to_string();
            return false;
        };

        self.reset();
        let source_idx = self.index_of(source);
        let h = self.heuristic.estimate(source, goal);
        let cell = &mut self.grid[source_idx];
        cell.g = 0.0;
        cell.h = h;
        cell.f = h;
        cell.in_open_list = true;
        self.open_list.push(source_idx);
        self.status_text = "Initialized - Source added to Open List".to_string();
        debug!("initialize search from {source} to {goal} with {:?}", self.heuristic);
        true
    }

    /// Expands one node. Returns true while the search should continue.
    pub fn step(&mut self) -> bool {
        self.step_observed(&mut |_: &SearchEvent| {})
    }

    #[instrument(
        skip_all,
        name = "astar_step",
        fields(closed = self.closed_list.len()),
        level = "trace"
    )]
    pub fn step_observed<O: SearchObserver + ?Sized>(&mut self, observer: &mut O) -> bool {
        if self.is_complete {
            return false;
        }

        let Some(slot) = self.select_open() else {
            self.status_text = "No path found - Open List is empty".to_string();
            self.is_complete = true;
            self.is_path_found = false;
            debug!("open list exhausted, no path");
            observer.on_event(&SearchEvent::Exhausted);
            return false;
        };

        let current = self.open_list.remove(slot);
        let cell = &mut self.grid[current];
        cell.in_open_list = false;
        cell.in_closed_list = true;
        let (position, current_g, current_f) = (cell.position, cell.g, cell.f);
        let is_goal = cell.cell_type == CellType::Goal;
        self.closed_list.push(current);
        self.current = Some(current);
        trace!("expand node {position} g={current_g:.3} f={current_f:.3}");
        observer.on_event(&SearchEvent::Expanded {
            position,
            g: current_g,
            f: current_f,
        });

        if is_goal {
            self.reconstruct_path(current);
            self.status_text = format!("Path found! Total cost: {current_g:.2}");
            self.is_complete = true;
            self.is_path_found = true;
            debug!("path found with cost {current_g:.3} over {} cells", self.path.len());
            observer.on_event(&SearchEvent::PathFound {
                cost: current_g,
                length: self.path.len(),
            });
            return false;
        }

        self.status_text = format!(
            "Processing node ({}, {}) with f={current_f:.2}",
            position.x, position.y
        );

        for (neighbor, is_diagonal) in self.neighbors(position) {
            let tentative_g = current_g + if is_diagonal { SQRT_2 } else { 1.0 };
            let neighbor_position = self.grid[neighbor].position;

            if !self.grid[neighbor].in_open_list {
                let h = self.estimate(neighbor_position);
                let cell = &mut self.grid[neighbor];
                cell.g = tentative_g;
                cell.h = h;
                cell.f = tentative_g + h;
                cell.parent = Some(current);
                cell.in_open_list = true;
                self.open_list.push(neighbor);
                observer.on_event(&SearchEvent::Discovered {
                    position: neighbor_position,
                    g: tentative_g,
                    h,
                });
            } else if tentative_g < self.grid[neighbor].g {
                // Relaxed in place; the next selection sees the new f.
                let cell = &mut self.grid[neighbor];
                let old_g = cell.g;
                cell.g = tentative_g;
                cell.f = tentative_g + cell.h;
                cell.parent = Some(current);
                observer.on_event(&SearchEvent::Relaxed {
                    position: neighbor_position,
                    old_g,
                    new_g: tentative_g,
                });
            }
        }
        trace!("open list {:?}", self.open_positions());

        true
    }

    /// Steps until the search terminates and returns the number of steps taken.
    pub fn run_to_completion(&mut self) -> usize {
        let mut steps = 0;
        while !self.is_complete {
            self.step();
            steps += 1;
        }
        steps
    }

    pub fn state(&self) -> PathfinderState {
        let cells = |indices: &[usize]| -> Vec<Cell> {
            indices.iter().map(|&idx| self.grid[idx].clone()).collect()
        };

        PathfinderState {
            rows: self.rows,
            cols: self.cols,
            heuristic: self.heuristic,
            grid: self
                .grid
                .chunks(self.cols.max(1))
                .map(|row| row.to_vec())
                .collect(),
            open_list: cells(&self.open_list),
            closed_list: cells(&self.closed_list),
            current_node: self.current.map(|idx| self.grid[idx].clone()),
            path: cells(&self.path),
            is_complete: self.is_complete,
            is_path_found: self.is_path_found,
            status_text: self.status_text.clone(),
            source: self.source,
            goal: self.goal,
        }
    }

    fn estimate(&self, position: Position) -> f64 {
        self.goal
            .map_or(0.0, |goal| self.heuristic.estimate(position, goal))
    }

    fn select_open(&self) -> Option<usize> {
        // `min_by_key` keeps the first of equal minima.
        self.open_list
            .iter()
            .enumerate()
            .min_by_key(|(_, &idx)| OpenOrder {
                f: self.grid[idx].f,
                h: self.grid[idx].h,
            })
            .map(|(slot, _)| slot)
    }

    fn neighbors(&self, position: Position) -> Vec<(usize, bool)> {
        let diagonal: &[(isize, isize)] = if self.heuristic.allows_diagonal_moves() {
            &DIAGONAL_MOVES
        } else {
            &[]
        };

        AXIS_MOVES
            .iter()
            .map(|&delta| (delta, false))
            .chain(diagonal.iter().map(|&delta| (delta, true)))
            .filter_map(|((dx, dy), is_diagonal)| {
                let x = position.x.checked_add_signed(dx)?;
                let y = position.y.checked_add_signed(dy)?;
                let idx = self.index(x, y)?;
                let cell = &self.grid[idx];
                (cell.cell_type != CellType::Obstacle && !cell.in_closed_list)
                    .then_some((idx, is_diagonal))
            })
            .collect()
    }

    fn reconstruct_path(&mut self, goal: usize) {
        let mut path = vec![goal];
        let mut current = goal;
        while let Some(parent) = self.grid[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        self.path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::GridLayout;

    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tracing_subscriber;

    const EPSILON: f64 = 1e-9;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("trace")
            .try_init();
    }

    fn open_grid(rows: usize, cols: usize, heuristic: Heuristic) -> Pathfinder {
        let mut pathfinder = Pathfinder::new(rows, cols, heuristic);
        pathfinder.set_cell_type(0, 0, CellType::Source);
        pathfinder.set_cell_type(cols - 1, rows - 1, CellType::Goal);
        pathfinder
    }

    fn move_cost(from: Position, to: Position) -> f64 {
        if from.x != to.x && from.y != to.y {
            SQRT_2
        } else {
            1.0
        }
    }

    // Plain Dijkstra with the same move set, used as the optimality reference.
    fn reference_cost(pathfinder: &Pathfinder) -> Option<f64> {
        let (rows, cols) = (pathfinder.rows(), pathfinder.cols());
        let source = pathfinder.source()?;
        let goal = pathfinder.goal()?;
        let diagonal = pathfinder.heuristic().allows_diagonal_moves();

        let mut dist = vec![f64::INFINITY; rows * cols];
        let mut done = vec![false; rows * cols];
        dist[source.y * cols + source.x] = 0.0;

        loop {
            let next = (0..rows * cols)
                .filter(|&idx| !done[idx] && dist[idx].is_finite())
                .min_by(|&a, &b| dist[a].total_cmp(&dist[b]));
            let Some(idx) = next else {
                return None;
            };
            if idx == goal.y * cols + goal.x {
                return Some(dist[idx]);
            }
            done[idx] = true;
            let (x, y) = ((idx % cols) as isize, (idx / cols) as isize);
            for dx in -1isize..=1 {
                for dy in -1isize..=1 {
                    if (dx == 0 && dy == 0) || (!diagonal && dx != 0 && dy != 0) {
                        continue;
                    }
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx >= cols as isize || ny >= rows as isize {
                        continue;
                    }
                    let cell = pathfinder.cell(nx as usize, ny as usize).unwrap();
                    if cell.cell_type == CellType::Obstacle {
                        continue;
                    }
                    let cost = dist[idx] + if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
                    let nidx = ny as usize * cols + nx as usize;
                    if cost < dist[nidx] {
                        dist[nidx] = cost;
                    }
                }
            }
        }
    }

    #[test]
    fn test_open_grid_manhattan_path() {
        init_tracing();
        let mut pathfinder = open_grid(5, 5, Heuristic::Manhattan);
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();

        assert!(pathfinder.is_path_found());
        let path = pathfinder.path_positions();
        assert_eq!(path.len() - 1, 8);
        assert_eq!(path.first(), Some(&Position::new(0, 0)));
        assert_eq!(path.last(), Some(&Position::new(4, 4)));
        assert!((pathfinder.path_cost().unwrap() - 8.0).abs() < EPSILON);
        assert_eq!(pathfinder.status_text(), "Path found! Total cost: 8.00");
    }

    #[test]
    fn test_open_grid_diagonal_path() {
        init_tracing();
        let mut pathfinder = open_grid(5, 5, Heuristic::Diagonal);
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();

        assert!(pathfinder.is_path_found());
        assert_eq!(pathfinder.path_positions().len(), 5);
        assert!((pathfinder.path_cost().unwrap() - 4.0 * SQRT_2).abs() < EPSILON);
    }

    #[test]
    fn test_initialize_requires_source_and_goal() {
        init_tracing();
        let mut pathfinder = Pathfinder::new(3, 3, Heuristic::Manhattan);
        pathfinder.set_cell_type(0, 0, CellType::Source);
        assert!(!pathfinder.initialize());
        assert_eq!(pathfinder.status_text(), "Please set source and goal");
        assert!(pathfinder.open_positions().is_empty());
        assert!(pathfinder.cell(0, 0).unwrap().g.is_infinite());

        // Stepping an uninitialized search finds nothing to expand.
        assert!(!pathfinder.step());
        assert!(!pathfinder.is_path_found());
    }

    #[test]
    fn test_single_source_and_goal() {
        let mut pathfinder = Pathfinder::new(3, 3, Heuristic::Euclidean);
        pathfinder.set_cell_type(0, 0, CellType::Source);
        pathfinder.set_cell_type(1, 1, CellType::Source);
        pathfinder.set_cell_type(2, 2, CellType::Goal);
        pathfinder.set_cell_type(2, 0, CellType::Goal);

        assert_eq!(pathfinder.cell(0, 0).unwrap().cell_type, CellType::Empty);
        assert_eq!(pathfinder.cell(1, 1).unwrap().cell_type, CellType::Source);
        assert_eq!(pathfinder.cell(2, 2).unwrap().cell_type, CellType::Empty);
        assert_eq!(pathfinder.cell(2, 0).unwrap().cell_type, CellType::Goal);
        assert_eq!(pathfinder.source(), Some(Position::new(1, 1)));
        assert_eq!(pathfinder.goal(), Some(Position::new(2, 0)));

        // Painting over the source forgets it.
        pathfinder.set_cell_type(1, 1, CellType::Obstacle);
        assert_eq!(pathfinder.source(), None);
        assert!(!pathfinder.initialize());
    }

    #[test]
    fn test_out_of_bounds_is_ignored() {
        let mut pathfinder = Pathfinder::new(2, 3, Heuristic::Manhattan);
        pathfinder.set_cell_type(3, 0, CellType::Source);
        pathfinder.set_cell_type(0, 2, CellType::Obstacle);
        assert_eq!(pathfinder.source(), None);
        assert!(pathfinder.cell(3, 0).is_none());
        assert!(pathfinder.cell(2, 1).is_some());
    }

    #[test]
    fn test_clear_obstacles_keeps_roles() {
        let mut pathfinder = open_grid(3, 3, Heuristic::Manhattan);
        pathfinder.set_cell_type(1, 1, CellType::Obstacle);
        pathfinder.set_cell_type(1, 0, CellType::Obstacle);
        pathfinder.clear_obstacles();

        assert_eq!(pathfinder.cell(1, 1).unwrap().cell_type, CellType::Empty);
        assert_eq!(pathfinder.cell(1, 0).unwrap().cell_type, CellType::Empty);
        assert_eq!(pathfinder.cell(0, 0).unwrap().cell_type, CellType::Source);
        assert_eq!(pathfinder.cell(2, 2).unwrap().cell_type, CellType::Goal);
    }

    #[test]
    fn test_wall_means_no_path() {
        init_tracing();
        let mut pathfinder = open_grid(5, 5, Heuristic::Euclidean);
        for y in 0..5 {
            pathfinder.set_cell_type(2, y, CellType::Obstacle);
        }
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();

        assert!(pathfinder.is_complete());
        assert!(!pathfinder.is_path_found());
        assert!(pathfinder.path_positions().is_empty());
        assert_eq!(pathfinder.status_text(), "No path found - Open List is empty");
        // Everything left of the wall got expanded.
        assert_eq!(pathfinder.closed_positions().len(), 10);
    }

    #[test]
    fn test_terminal_step_is_idempotent() {
        let mut pathfinder = open_grid(4, 4, Heuristic::Manhattan);
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();

        let before = pathfinder.state();
        assert!(!pathfinder.step());
        assert!(!pathfinder.step());
        let after = pathfinder.state();

        assert_eq!(before.grid, after.grid);
        assert_eq!(before.closed_list, after.closed_list);
        assert_eq!(before.path, after.path);
        assert_eq!(before.status_text, after.status_text);
    }

    #[test]
    fn test_reset_preserves_roles() {
        let mut pathfinder = open_grid(4, 4, Heuristic::Manhattan);
        pathfinder.set_cell_type(1, 1, CellType::Obstacle);
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();
        pathfinder.reset();

        let state = pathfinder.state();
        assert!(!state.is_complete);
        assert!(state.open_list.is_empty());
        assert!(state.closed_list.is_empty());
        assert!(state.path.is_empty());
        assert!(state.current_node.is_none());
        assert_eq!(state.status_text, "Ready to start");
        assert_eq!(state.grid[1][1].cell_type, CellType::Obstacle);
        assert_eq!(state.source, Some(Position::new(0, 0)));
        assert!(state
            .grid
            .iter()
            .flatten()
            .all(|cell| cell.g.is_infinite() && cell.h == 0.0 && cell.parent.is_none()));

        // The search can be run again after a reset.
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();
        assert!(pathfinder.is_path_found());
    }

    #[test]
    fn test_open_cells_have_finite_costs() {
        let mut pathfinder = open_grid(6, 6, Heuristic::Diagonal);
        pathfinder.set_cell_type(2, 2, CellType::Obstacle);
        assert!(pathfinder.initialize());
        while pathfinder.step() {
            let state = pathfinder.state();
            for cell in state.grid.iter().flatten() {
                if cell.in_open_list {
                    assert!(cell.g.is_finite() && cell.f.is_finite());
                    assert!((cell.f - (cell.g + cell.h)).abs() < EPSILON);
                } else if !cell.in_closed_list {
                    assert!(cell.g.is_infinite() && cell.f.is_infinite());
                    assert_eq!(cell.h, 0.0);
                }
            }
        }
    }

    #[test]
    fn test_path_is_connected_and_cost_matches() {
        let layout = GridLayout::from_file("map_file/test/test.map").unwrap();
        for heuristic in [Heuristic::Manhattan, Heuristic::Diagonal, Heuristic::Euclidean] {
            let mut pathfinder = layout.to_pathfinder(heuristic);
            assert!(pathfinder.initialize());
            pathfinder.run_to_completion();
            assert!(pathfinder.is_path_found());

            let path = pathfinder.path_positions();
            let cost: f64 = path.windows(2).map(|w| move_cost(w[0], w[1])).sum();
            for w in path.windows(2) {
                assert!(w[0].x.abs_diff(w[1].x) <= 1 && w[0].y.abs_diff(w[1].y) <= 1);
            }
            assert!((cost - pathfinder.path_cost().unwrap()).abs() < EPSILON);
            assert!((cost - reference_cost(&pathfinder).unwrap()).abs() < EPSILON);
        }
    }

    #[test]
    fn test_optimal_on_random_grids() {
        init_tracing();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = GridLayout::random(7, 9, 0.3, &mut rng);
            for heuristic in [Heuristic::Manhattan, Heuristic::Diagonal, Heuristic::Euclidean] {
                let mut pathfinder = layout.to_pathfinder(heuristic);
                assert!(pathfinder.initialize());
                let walkable = pathfinder
                    .state()
                    .grid
                    .iter()
                    .flatten()
                    .filter(|cell| cell.cell_type != CellType::Obstacle)
                    .count();
                let steps = pathfinder.run_to_completion();

                match reference_cost(&pathfinder) {
                    Some(expected) => {
                        assert!(pathfinder.is_path_found(), "seed {seed} {heuristic:?}");
                        assert!(steps <= walkable);
                        let cost = pathfinder.path_cost().unwrap();
                        assert!(
                            (cost - expected).abs() < EPSILON,
                            "seed {seed} {heuristic:?}: {cost} vs {expected}"
                        );
                    }
                    None => {
                        assert!(!pathfinder.is_path_found(), "seed {seed} {heuristic:?}");
                        assert!(pathfinder.path_positions().is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_observer_sees_every_expansion() {
        let mut pathfinder = open_grid(4, 4, Heuristic::Manhattan);
        assert!(pathfinder.initialize());
        let mut events = Vec::new();
        while pathfinder.step_observed(&mut |event: &SearchEvent| events.push(event.clone())) {}

        let expanded = events
            .iter()
            .filter(|event| matches!(event, SearchEvent::Expanded { .. }))
            .count();
        assert_eq!(expanded, pathfinder.closed_positions().len());
        assert_eq!(
            events.last(),
            Some(&SearchEvent::PathFound {
                cost: 6.0,
                length: 7
            })
        );
    }

    #[test]
    fn test_tie_break_prefers_lower_h() {
        let mut pathfinder = open_grid(3, 3, Heuristic::Manhattan);
        assert!(pathfinder.initialize());
        assert!(pathfinder.step());
        assert!(pathfinder.step());
        // Every open cell now has f = 4; (0, 1) is oldest but (2, 0) is closer.
        assert_eq!(
            pathfinder.open_positions(),
            vec![Position::new(0, 1), Position::new(2, 0), Position::new(1, 1)]
        );
        assert!(pathfinder.step());
        assert_eq!(pathfinder.state().current_node.unwrap().position, Position::new(2, 0));

        let mut pathfinder = Pathfinder::new(3, 3, Heuristic::Manhattan);
        pathfinder.set_cell_type(1, 1, CellType::Source);
        pathfinder.set_cell_type(2, 2, CellType::Goal);
        assert!(pathfinder.initialize());
        assert!(pathfinder.step());
        // East (2, 1) and south (1, 2) both have f = 2, h = 1; east was inserted first.
        assert!(pathfinder.step());
        assert_eq!(pathfinder.state().current_node.unwrap().position, Position::new(2, 1));
    }

    #[test]
    fn test_state_display() {
        let mut pathfinder = open_grid(2, 3, Heuristic::Manhattan);
        pathfinder.set_cell_type(1, 0, CellType::Obstacle);
        assert!(pathfinder.initialize());
        pathfinder.run_to_completion();
        let rendered = pathfinder.state().to_string();
        assert_eq!(rendered, "S#.\n**G\nPath found! Total cost: 3.00");
    }
}
