use tracing::info;

use crate::algorithm::{SearchEvent, SearchObserver};

/// Search counters collected from A* events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub expanded_nodes: usize,
    pub discovered_nodes: usize,
    pub relaxed_nodes: usize,
    pub peak_open_list: usize,
    pub path_cost: Option<f64>,
    pub path_length: usize,
    pub steps: usize,
    pub time_us: usize,
    // Source is opened by `initialize`, not by a step event.
    open_size: usize,
}

impl Stats {
    /// Counters for a search whose source is already on the open list.
    pub fn seeded() -> Self {
        Stats {
            open_size: 1,
            peak_open_list: 1,
            ..Default::default()
        }
    }

    pub fn print(&self) {
        let cost = self
            .path_cost
            .map_or_else(|| "none".to_string(), |cost| format!("{cost:.2}"));
        info!(
            "Cost {} Path length {:?} Steps {:?} Time(microseconds) {:?} Expanded nodes {:?} Discovered nodes {:?} Relaxed nodes {:?} Peak open list {:?}",
            cost,
            self.path_length,
            self.steps,
            self.time_us,
            self.expanded_nodes,
            self.discovered_nodes,
            self.relaxed_nodes,
            self.peak_open_list
        );
    }
}

impl SearchObserver for Stats {
    fn on_event(&mut self, event: &SearchEvent) {
        match event {
            SearchEvent::Expanded { .. } => {
                self.steps += 1;
                self.expanded_nodes += 1;
                self.open_size = self.open_size.saturating_sub(1);
            }
            SearchEvent::Discovered { .. } => {
                self.discovered_nodes += 1;
                self.open_size += 1;
                self.peak_open_list = self.peak_open_list.max(self.open_size);
            }
            SearchEvent::Relaxed { .. } => self.relaxed_nodes += 1,
            SearchEvent::PathFound { cost, length } => {
                self.path_cost = Some(*cost);
                self.path_length = *length;
            }
            SearchEvent::Exhausted => self.steps += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{Heuristic, Pathfinder};
    use crate::common::CellType;
    use crate::map::GridLayout;

    #[test]
    fn test_stats_follow_search() {
        let mut pathfinder = Pathfinder::new(5, 5, Heuristic::Manhattan);
        pathfinder.set_cell_type(0, 0, CellType::Source);
        pathfinder.set_cell_type(4, 4, CellType::Goal);
        assert!(pathfinder.initialize());

        let mut stats = Stats::seeded();
        while pathfinder.step_observed(&mut stats) {}
        stats.print();

        assert_eq!(stats.path_cost, Some(8.0));
        assert_eq!(stats.path_length, 9);
        assert_eq!(stats.expanded_nodes, pathfinder.closed_positions().len());
        assert_eq!(
            stats.discovered_nodes + 1,
            stats.expanded_nodes + pathfinder.open_positions().len()
        );
        assert!(stats.peak_open_list >= pathfinder.open_positions().len());
    }

    #[test]
    fn test_stats_without_path() {
        let layout = GridLayout::from_file("map_file/test/walled.map").unwrap();
        let mut pathfinder = layout.to_pathfinder(Heuristic::Manhattan);
        assert!(pathfinder.initialize());

        let mut stats = Stats::seeded();
        while pathfinder.step_observed(&mut stats) {}

        assert_eq!(stats.path_cost, None);
        assert_eq!(stats.path_length, 0);
        // Every reachable cell is expanded once, then one exhausted step.
        assert_eq!(stats.steps, stats.expanded_nodes + 1);
        assert_eq!(stats.expanded_nodes, 9);
    }
}
