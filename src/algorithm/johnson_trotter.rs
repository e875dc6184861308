use serde::Serialize;
use std::fmt;
use tracing::{debug, instrument, trace};

/// Upper bound on swap iterations; n! - 1 swaps are needed, so n <= 6 fits.
pub const MAX_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    fn reversed(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DirectedValue {
    pub value: usize,
    pub direction: Direction,
    pub position: usize,
}

impl fmt::Display for DirectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            Direction::Left => write!(f, "<{}", self.value),
            Direction::Right => write!(f, "{}>", self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationState {
    Idle,
    Scanning,
    FoundMobile,
    Swapping,
    Reversing,
    Complete,
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnimationState::Idle => "idle",
            AnimationState::Scanning => "scanning",
            AnimationState::FoundMobile => "found-mobile",
            AnimationState::Swapping => "swapping",
            AnimationState::Reversing => "reversing",
            AnimationState::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermutationStep {
    pub permutation: Vec<DirectedValue>,
    pub mobile_indices: Vec<usize>,
    pub largest_mobile_index: Option<usize>,
    pub action: String,
    pub state: AnimationState,
}

impl fmt::Display for PermutationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.permutation.iter().map(ToString::to_string).collect();
        write!(f, "[{}] {}: {}", self.state, values.join(" "), self.action)
    }
}

/// Generates every permutation of `1..=n` by adjacent transpositions,
/// recording each scan, swap and direction reversal.
#[derive(Debug, Clone)]
pub struct JohnsonTrotter {
    n: usize,
    permutation: Vec<DirectedValue>,
    permutations: Vec<Vec<usize>>,
    steps: Vec<PermutationStep>,
}

impl JohnsonTrotter {
    pub fn new(n: usize) -> Self {
        let permutation = (0..n)
            .map(|position| DirectedValue {
                value: position + 1,
                direction: Direction::Left,
                position,
            })
            .collect();
        let mut generator = JohnsonTrotter {
            n,
            permutation,
            permutations: Vec::new(),
            steps: Vec::new(),
        };
        generator.generate();
        generator
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn steps(&self) -> &[PermutationStep] {
        &self.steps
    }

    /// Permutations in generation order, the initial identity first.
    pub fn permutations(&self) -> &[Vec<usize>] {
        &self.permutations
    }

    // The neighbor in the pointed direction, if inside the sequence.
    fn target_index(&self, index: usize) -> Option<usize> {
        let target = match self.permutation[index].direction {
            Direction::Left => index.checked_sub(1)?,
            Direction::Right => index + 1,
        };
        (target < self.n).then_some(target)
    }

    fn is_mobile(&self, index: usize) -> bool {
        self.target_index(index)
            .is_some_and(|target| self.permutation[index].value > self.permutation[target].value)
    }

    fn mobile_indices(&self) -> Vec<usize> {
        (0..self.n).filter(|&index| self.is_mobile(index)).collect()
    }

    fn values(&self) -> Vec<usize> {
        self.permutation.iter().map(|entry| entry.value).collect()
    }

    fn record(
        &mut self,
        mobile_indices: Vec<usize>,
        largest_mobile_index: Option<usize>,
        action: String,
        state: AnimationState,
    ) {
        trace!("{state}: {action}");
        self.steps.push(PermutationStep {
            permutation: self.permutation.clone(),
            mobile_indices,
            largest_mobile_index,
            action,
            state,
        });
    }

    #[instrument(skip_all, name = "johnson_trotter", fields(n = self.n), level = "debug")]
    fn generate(&mut self) {
        self.record(
            Vec::new(),
            None,
            "Initial permutation".to_string(),
            AnimationState::Idle,
        );
        self.permutations.push(self.values());

        for _ in 0..MAX_ITERATIONS {
            let mobile = self.mobile_indices();
            let action = if mobile.is_empty() {
                "No mobile integers found".to_string()
            } else {
                let values: Vec<String> = mobile
                    .iter()
                    .map(|&index| self.permutation[index].value.to_string())
                    .collect();
                format!("Scanning... Found mobile: {}", values.join(", "))
            };
            self.record(mobile.clone(), None, action, AnimationState::Scanning);

            let Some(largest) = mobile
                .iter()
                .copied()
                .max_by_key(|&index| self.permutation[index].value)
            else {
                self.record(
                    Vec::new(),
                    None,
                    "Algorithm complete - no mobile integers remain".to_string(),
                    AnimationState::Complete,
                );
                break;
            };
            let Some(target) = self.target_index(largest) else {
                break;
            };
            let value = self.permutation[largest].value;

            self.record(
                mobile,
                Some(largest),
                format!("Largest mobile integer is {value}"),
                AnimationState::FoundMobile,
            );
            self.record(
                Vec::new(),
                Some(largest),
                format!(
                    "Swapping {value} with {}",
                    self.permutation[target].value
                ),
                AnimationState::Swapping,
            );

            self.permutation.swap(largest, target);
            self.permutation[largest].position = largest;
            self.permutation[target].position = target;
            self.permutations.push(self.values());

            let larger: Vec<String> = self
                .permutation
                .iter()
                .filter(|entry| entry.value > value)
                .map(|entry| entry.value.to_string())
                .collect();
            if !larger.is_empty() {
                self.record(
                    Vec::new(),
                    None,
                    format!(
                        "Reversing directions for integers > {value}: {}",
                        larger.join(", ")
                    ),
                    AnimationState::Reversing,
                );
                for entry in self.permutation.iter_mut().filter(|entry| entry.value > value) {
                    entry.direction = entry.direction.reversed();
                }
            }

            let joined: String = self.values().iter().map(ToString::to_string).collect();
            self.record(
                Vec::new(),
                None,
                format!("New permutation: {joined}"),
                AnimationState::Idle,
            );
        }

        debug!(
            "{} permutations in {} steps",
            self.permutations.len(),
            self.steps.len()
        );
    }
}
