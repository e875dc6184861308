use anyhow::anyhow;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortAlgorithm {
    #[default]
    Bubble,
    Insertion,
    Selection,
    Quick,
    Merge,
}

impl SortAlgorithm {
    pub const ALL: [SortAlgorithm; 5] = [
        SortAlgorithm::Bubble,
        SortAlgorithm::Insertion,
        SortAlgorithm::Selection,
        SortAlgorithm::Quick,
        SortAlgorithm::Merge,
    ];

    /// Listing that `SortStep::code_line` indexes into.
    pub fn pseudocode(self) -> &'static [&'static str] {
        match self {
            SortAlgorithm::Bubble => &[
                "procedure bubbleSort(arr)",
                "  for i = 0 to n - 2",
                "    swapped = false",
                "    for j = 0 to n - i - 2",
                "      if arr[j] > arr[j + 1]",
                "        swap(arr[j], arr[j + 1])",
                "        swapped = true",
                "    if not swapped: break",
                "  return arr",
            ],
            SortAlgorithm::Insertion => &[
                "procedure insertionSort(arr)",
                "  for i = 1 to n - 1",
                "    key = arr[i]",
                "    j = i - 1",
                "    while j >= 0 and arr[j] > key",
                "      arr[j + 1] = arr[j]",
                "      j = j - 1",
                "    arr[j + 1] = key",
                "  return arr",
            ],
            SortAlgorithm::Selection => &[
                "procedure selectionSort(arr)",
                "  for i = 0 to n - 2",
                "    min = i",
                "    for j = i + 1 to n - 1",
                "      if arr[j] < arr[min]",
                "        min = j",
                "    swap(arr[i], arr[min])",
                "  return arr",
            ],
            SortAlgorithm::Quick => &[
                "void quickSort(int arr[], int low, int high) {",
                "  if (low < high) {",
                "    int pi = partition(arr, low, high);",
                "    quickSort(arr, low, pi - 1);",
                "    quickSort(arr, pi + 1, high);",
                "  }",
                "}",
                "int partition(int arr[], int low, int high) {",
                "  int pivot = arr[high];",
                "  int i = (low - 1);",
                "  for (int j = low; j <= high - 1; j++) {",
                "    if (arr[j] < pivot) {",
                "      i++;",
                "      swap(arr[i], arr[j]);",
                "    }",
                "  }",
                "  swap(arr[i + 1], arr[high]);",
                "  return (i + 1);",
                "}",
            ],
            SortAlgorithm::Merge => &[
                "procedure mergeSort(arr)",
                "  for size = 1; size < n; size *= 2",
                "    for lo = 0; lo < n; lo += 2 * size",
                "      merge(arr, lo, lo + size - 1, min(lo + 2 * size - 1, n - 1))",
                "procedure merge(arr, lo, mid, hi)",
                "  while i <= mid and j <= hi",
                "    if arr[i] <= arr[j]",
                "      take arr[i++]",
                "    else take arr[j++]",
                "  copy the remaining run",
            ],
        }
    }

    /// Sorts a copy of `input` ascending and returns every step taken.
    #[instrument(
        skip_all,
        name = "sort_trace",
        fields(algorithm = %self, len = input.len()),
        level = "debug"
    )]
    pub fn trace(self, input: &[i64]) -> Vec<SortStep> {
        let mut tracer = Tracer::new(input);
        match self {
            SortAlgorithm::Bubble => bubble_sort(&mut tracer),
            SortAlgorithm::Insertion => insertion_sort(&mut tracer),
            SortAlgorithm::Selection => selection_sort(&mut tracer),
            SortAlgorithm::Quick => {
                if !input.is_empty() {
                    quick_sort(&mut tracer, 0, input.len() - 1);
                }
            }
            SortAlgorithm::Merge => merge_sort(&mut tracer),
        }
        let steps = tracer.finish(self);
        debug!("{} steps", steps.len());
        steps
    }
}

impl fmt::Display for SortAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortAlgorithm::Bubble => "bubble",
            SortAlgorithm::Insertion => "insertion",
            SortAlgorithm::Selection => "selection",
            SortAlgorithm::Quick => "quick",
            SortAlgorithm::Merge => "merge",
        };
        f.write_str(name)
    }
}

impl FromStr for SortAlgorithm {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortAlgorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| anyhow!("unknown sort algorithm {s:?}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SortAction {
    Start,
    Compare { left: usize, right: usize },
    Swap { left: usize, right: usize },
    /// Insertion sort moves a value one slot right to open a hole.
    Shift { from: usize, to: usize },
    PickKey { index: usize, key: i64 },
    InsertKey { index: usize, key: i64 },
    UpdateMin { index: usize },
    SelectPivot { index: usize, pivot: i64 },
    PlacePivot { index: usize },
    Divide { level: usize, size: usize },
    Merge { start: usize, mid: usize, end: usize },
    Place { index: usize, value: i64, from: Side },
    PassComplete { pass: usize },
    Complete,
}

impl SortAction {
    pub fn name(&self) -> &'static str {
        match self {
            SortAction::Start => "start",
            SortAction::Compare { .. } => "compare",
            SortAction::Swap { .. } => "swap",
            SortAction::Shift { .. } => "shift",
            SortAction::PickKey { .. } => "pick-key",
            SortAction::InsertKey { .. } => "insert-key",
            SortAction::UpdateMin { .. } => "update-min",
            SortAction::SelectPivot { .. } => "select-pivot",
            SortAction::PlacePivot { .. } => "place-pivot",
            SortAction::Divide { .. } => "divide",
            SortAction::Merge { .. } => "merge",
            SortAction::Place { .. } => "place",
            SortAction::PassComplete { .. } => "pass-complete",
            SortAction::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortStep {
    pub action: SortAction,
    /// Array contents after the action.
    pub array: Vec<i64>,
    /// Indices already holding their final value.
    pub sorted: Vec<usize>,
    pub code_line: Option<usize>,
    pub variables: BTreeMap<&'static str, i64>,
    pub description: String,
}

impl fmt::Display for SortStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:?} {}",
            self.action.name(),
            self.array,
            self.description
        )
    }
}

/// Uniform values in `min..=max`; the bounds may be given in either order.
pub fn random_array<R: Rng + ?Sized>(rng: &mut R, size: usize, min: i64, max: i64) -> Vec<i64> {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    (0..size).map(|_| rng.gen_range(low..=high)).collect()
}

struct Tracer {
    array: Vec<i64>,
    sorted: BTreeSet<usize>,
    steps: Vec<SortStep>,
}

impl Tracer {
    fn new(input: &[i64]) -> Self {
        let mut tracer = Tracer {
            array: input.to_vec(),
            sorted: BTreeSet::new(),
            steps: Vec::new(),
        };
        tracer.record(
            SortAction::Start,
            Some(0),
            &[("n", input.len() as i64)],
            format!("Initial array {input:?}"),
        );
        tracer
    }

    fn record(
        &mut self,
        action: SortAction,
        code_line: Option<usize>,
        variables: &[(&'static str, i64)],
        description: String,
    ) {
        self.steps.push(SortStep {
            action,
            array: self.array.clone(),
            sorted: self.sorted.iter().copied().collect(),
            code_line,
            variables: variables.iter().copied().collect(),
            description,
        });
    }

    fn mark_sorted(&mut self, index: usize) {
        self.sorted.insert(index);
    }

    fn finish(mut self, algorithm: SortAlgorithm) -> Vec<SortStep> {
        self.sorted.extend(0..self.array.len());
        let last_line = algorithm.pseudocode().len() - 1;
        let description = format!("Array sorted: {:?}", self.array);
        self.record(SortAction::Complete, Some(last_line), &[], description);
        self.steps
    }
}

fn bubble_sort(t: &mut Tracer) {
    let n = t.array.len();
    for i in 0..n.saturating_sub(1) {
        let mut swapped = false;
        for j in 0..n - i - 1 {
            let (a, b) = (t.array[j], t.array[j + 1]);
            let vars = [("i", i as i64), ("j", j as i64), ("arr[j]", a), ("arr[j+1]", b)];
            t.record(
                SortAction::Compare { left: j, right: j + 1 },
                Some(4),
                &vars,
                format!("Comparing {a} and {b}"),
            );
            if a > b {
                t.array.swap(j, j + 1);
                swapped = true;
                t.record(
                    SortAction::Swap { left: j, right: j + 1 },
                    Some(5),
                    &vars,
                    format!("Swapping {a} and {b}"),
                );
            }
        }
        t.mark_sorted(n - i - 1);

        let pass = i + 1;
        if !swapped {
            t.record(
                SortAction::PassComplete { pass },
                Some(7),
                &[("i", i as i64)],
                format!("Pass {pass} made no swaps, stopping early"),
            );
            break;
        }
        t.record(
            SortAction::PassComplete { pass },
            Some(1),
            &[("i", i as i64)],
            format!("Pass {pass} complete"),
        );
    }
}

fn insertion_sort(t: &mut Tracer) {
    for i in 1..t.array.len() {
        let key = t.array[i];
        t.record(
            SortAction::PickKey { index: i, key },
            Some(2),
            &[("i", i as i64), ("key", key)],
            format!("Picking key {key} at index {i}"),
        );

        // `hole` is j + 1 in the listing.
        let mut hole = i;
        while hole > 0 {
            let current = t.array[hole - 1];
            let vars = [("i", i as i64), ("j", hole as i64 - 1), ("key", key), ("arr[j]", current)];
            t.record(
                SortAction::Compare { left: hole - 1, right: hole },
                Some(4),
                &vars,
                format!("Comparing {current} with key {key}"),
            );
            if current <= key {
                break;
            }
            t.array[hole] = current;
            t.record(
                SortAction::Shift { from: hole - 1, to: hole },
                Some(5),
                &vars,
                format!("Shifting {current} right to index {hole}"),
            );
            hole -= 1;
        }

        t.array[hole] = key;
        t.record(
            SortAction::InsertKey { index: hole, key },
            Some(7),
            &[("i", i as i64), ("j", hole as i64 - 1), ("key", key)],
            format!("Inserting key {key} at index {hole}"),
        );
    }
}

fn selection_sort(t: &mut Tracer) {
    let n = t.array.len();
    for i in 0..n.saturating_sub(1) {
        let mut min = i;
        t.record(
            SortAction::UpdateMin { index: i },
            Some(2),
            &[("i", i as i64), ("min", i as i64)],
            format!("Assuming {} at index {i} is the minimum", t.array[i]),
        );

        for j in i + 1..n {
            let (value, current_min) = (t.array[j], t.array[min]);
            t.record(
                SortAction::Compare { left: j, right: min },
                Some(4),
                &[("i", i as i64), ("j", j as i64), ("min", min as i64)],
                format!("Comparing {value} with current minimum {current_min}"),
            );
            if value < current_min {
                min = j;
                t.record(
                    SortAction::UpdateMin { index: j },
                    Some(5),
                    &[("i", i as i64), ("j", j as i64), ("min", min as i64)],
                    format!("New minimum {value} at index {j}"),
                );
            }
        }

        if min != i {
            let (a, b) = (t.array[i], t.array[min]);
            t.array.swap(i, min);
            t.record(
                SortAction::Swap { left: i, right: min },
                Some(6),
                &[("i", i as i64), ("min", min as i64)],
                format!("Swapping {a} and {b}"),
            );
        }
        t.mark_sorted(i);
    }
}

// Lomuto partition on the inclusive range low..=high.
fn quick_sort(t: &mut Tracer, low: usize, high: usize) {
    if low >= high {
        if low == high {
            t.mark_sorted(low);
        }
        return;
    }

    let pivot = t.array[high];
    t.record(
        SortAction::SelectPivot { index: high, pivot },
        Some(8),
        &[("low", low as i64), ("high", high as i64), ("pivot", pivot)],
        format!("Selecting pivot {pivot} at index {high}"),
    );

    // `store` is i + 1 in the listing.
    let mut store = low;
    for j in low..high {
        let value = t.array[j];
        let vars = [("i", store as i64 - 1), ("j", j as i64), ("pivot", pivot)];
        t.record(
            SortAction::Compare { left: j, right: high },
            Some(11),
            &vars,
            format!("Comparing {value} with pivot {pivot}"),
        );
        if value < pivot {
            if store != j {
                let other = t.array[store];
                t.array.swap(store, j);
                t.record(
                    SortAction::Swap { left: store, right: j },
                    Some(13),
                    &vars,
                    format!("Swapping {other} and {value}"),
                );
            }
            store += 1;
        }
    }

    t.array.swap(store, high);
    t.mark_sorted(store);
    t.record(
        SortAction::PlacePivot { index: store },
        Some(16),
        &[("low", low as i64), ("high", high as i64), ("pi", store as i64)],
        format!("Placing pivot {pivot} at index {store}"),
    );

    if store > low {
        quick_sort(t, low, store - 1);
    }
    quick_sort(t, store + 1, high);
}

// Bottom-up: runs of 1, 2, 4, ... merged left to right.
fn merge_sort(t: &mut Tracer) {
    let n = t.array.len();
    let mut size = 1;
    let mut level = 0;
    while size < n {
        level += 1;
        t.record(
            SortAction::Divide { level, size },
            Some(1),
            &[("size", size as i64)],
            format!("Level {level}: Dividing into subarrays of size {size}"),
        );

        let mut start = 0;
        while start < n {
            let mid = (start + size - 1).min(n - 1);
            let end = (start + 2 * size - 1).min(n - 1);
            if mid + 1 < n {
                merge_runs(t, start, mid, end);
            }
            start += 2 * size;
        }
        size *= 2;
    }
}

fn merge_runs(t: &mut Tracer, start: usize, mid: usize, end: usize) {
    let left = t.array[start..=mid].to_vec();
    let right = t.array[mid + 1..=end].to_vec();
    t.record(
        SortAction::Merge { start, mid, end },
        Some(3),
        &[("lo", start as i64), ("mid", mid as i64), ("hi", end as i64)],
        format!("Merging {left:?} and {right:?}"),
    );

    let (mut i, mut j, mut k) = (0, 0, start);
    while i < left.len() && j < right.len() {
        let (a, b) = (left[i], right[j]);
        t.record(
            SortAction::Compare {
                left: start + i,
                right: mid + 1 + j,
            },
            Some(6),
            &[("i", (start + i) as i64), ("j", (mid + 1 + j) as i64)],
            format!("Comparing {a} (left) and {b} (right)"),
        );
        let (value, from) = if a <= b {
            i += 1;
            (a, Side::Left)
        } else {
            j += 1;
            (b, Side::Right)
        };
        t.array[k] = value;
        let line = if from == Side::Left { 7 } else { 8 };
        t.record(
            SortAction::Place { index: k, value, from },
            Some(line),
            &[("k", k as i64), ("value", value)],
            format!("Placing {value} from {} subarray at position {k}", side_name(from)),
        );
        k += 1;
    }

    let remaining = left[i..]
        .iter()
        .map(|&value| (value, Side::Left))
        .chain(right[j..].iter().map(|&value| (value, Side::Right)));
    for (value, from) in remaining {
        t.array[k] = value;
        t.record(
            SortAction::Place { index: k, value, from },
            Some(9),
            &[("k", k as i64), ("value", value)],
            format!(
                "Placing remaining {value} from {} subarray at position {k}",
                side_name(from)
            ),
        );
        k += 1;
    }
}

fn side_name(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tracing_subscriber;

    // Helper function to setup tracing
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("trace")
            .try_init();
    }

    fn check_trace(algorithm: SortAlgorithm, input: &[i64]) {
        let steps = algorithm.trace(input);
        let first = steps.first().unwrap();
        let last = steps.last().unwrap();
        assert_eq!(first.action, SortAction::Start);
        assert_eq!(first.array, input);
        assert_eq!(last.action, SortAction::Complete);

        let mut expected = input.to_vec();
        expected.sort();
        assert_eq!(last.array, expected, "{algorithm} on {input:?}");
        assert_eq!(last.sorted, (0..input.len()).collect::<Vec<_>>());

        let lines = algorithm.pseudocode().len();
        for step in &steps {
            assert!(step.code_line.is_some_and(|line| line < lines));
            assert_eq!(step.array.len(), input.len());
        }
    }

    #[test]
    fn test_every_algorithm_sorts() {
        init_tracing();
        let inputs: [&[i64]; 7] = [
            &[],
            &[7],
            &[2, 1],
            &[5, 1, 4, 2, 8],
            &[1, 2, 3, 4, 5, 6],
            &[9, 7, 5, 3, 1],
            &[3, -1, 3, 0, -1, 42, 7],
        ];
        for algorithm in SortAlgorithm::ALL {
            for input in inputs {
                check_trace(algorithm, input);
            }
        }
    }

    #[test]
    fn test_random_inputs() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..30 {
            let size = rng.gen_range(0..12);
            let input = random_array(&mut rng, size, 1, 20);
            for algorithm in SortAlgorithm::ALL {
                check_trace(algorithm, &input);
            }
        }
    }

    #[test]
    fn test_random_array_bounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let values = random_array(&mut rng, 50, 99, 1);
        assert_eq!(values.len(), 50);
        assert!(values.iter().all(|value| (1..=99).contains(value)));
    }

    #[test]
    fn test_bubble_stops_early() {
        let steps = SortAlgorithm::Bubble.trace(&[1, 2, 3, 4]);
        // start, three compares, one pass marker, complete
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[4].action, SortAction::PassComplete { pass: 1 });
        assert_eq!(steps[4].code_line, Some(7));
        assert!(steps
            .iter()
            .all(|step| !matches!(step.action, SortAction::Swap { .. })));
    }

    #[test]
    fn test_bubble_step_data() {
        let steps = SortAlgorithm::Bubble.trace(&[5, 1, 4]);
        assert_eq!(steps[1].action, SortAction::Compare { left: 0, right: 1 });
        assert_eq!(steps[1].variables["arr[j]"], 5);
        assert_eq!(steps[1].variables["arr[j+1]"], 1);
        assert_eq!(steps[2].action, SortAction::Swap { left: 0, right: 1 });
        assert_eq!(steps[2].array, vec![1, 5, 4]);
        assert_eq!(steps[2].description, "Swapping 5 and 1");
    }

    #[test]
    fn test_quick_partition() {
        let steps = SortAlgorithm::Quick.trace(&[3, 1, 2]);
        let actions: Vec<SortAction> = steps.iter().map(|step| step.action).collect();
        assert_eq!(
            actions,
            vec![
                SortAction::Start,
                SortAction::SelectPivot { index: 2, pivot: 2 },
                SortAction::Compare { left: 0, right: 2 },
                SortAction::Compare { left: 1, right: 2 },
                SortAction::Swap { left: 0, right: 1 },
                SortAction::PlacePivot { index: 1 },
                SortAction::Complete,
            ]
        );
        assert_eq!(steps[5].array, vec![1, 2, 3]);
        assert_eq!(steps[5].sorted, vec![1]);
    }

    #[test]
    fn test_insertion_shifts() {
        let steps = SortAlgorithm::Insertion.trace(&[4, 2]);
        let actions: Vec<SortAction> = steps.iter().map(|step| step.action).collect();
        assert_eq!(
            actions,
            vec![
                SortAction::Start,
                SortAction::PickKey { index: 1, key: 2 },
                SortAction::Compare { left: 0, right: 1 },
                SortAction::Shift { from: 0, to: 1 },
                SortAction::InsertKey { index: 0, key: 2 },
                SortAction::Complete,
            ]
        );
        assert_eq!(steps[3].array, vec![4, 4]);
        assert_eq!(steps[4].array, vec![2, 4]);
    }

    #[test]
    fn test_selection_marks_prefix() {
        let steps = SortAlgorithm::Selection.trace(&[3, 1, 2]);
        let swap = steps
            .iter()
            .find(|step| matches!(step.action, SortAction::Swap { .. }))
            .unwrap();
        assert_eq!(swap.action, SortAction::Swap { left: 0, right: 1 });
        assert_eq!(swap.array, vec![1, 3, 2]);
        assert!(steps.iter().any(|step| step.sorted == vec![0]));
    }

    #[test]
    fn test_merge_is_stable() {
        let steps = SortAlgorithm::Merge.trace(&[5, 5]);
        let actions: Vec<SortAction> = steps.iter().map(|step| step.action).collect();
        assert_eq!(
            actions,
            vec![
                SortAction::Start,
                SortAction::Divide { level: 1, size: 1 },
                SortAction::Merge { start: 0, mid: 0, end: 1 },
                SortAction::Compare { left: 0, right: 1 },
                SortAction::Place { index: 0, value: 5, from: Side::Left },
                SortAction::Place { index: 1, value: 5, from: Side::Right },
                SortAction::Complete,
            ]
        );
    }

    #[test]
    fn test_merge_levels() {
        let steps = SortAlgorithm::Merge.trace(&[8, 3, 5, 1, 9]);
        let levels: Vec<usize> = steps
            .iter()
            .filter_map(|step| match step.action {
                SortAction::Divide { size, .. } => Some(size),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![1, 2, 4]);
        assert_eq!(steps[2].description, "Merging [8] and [3]");
    }

    #[test]
    fn test_parse_algorithm() {
        assert_eq!("quick".parse::<SortAlgorithm>().unwrap(), SortAlgorithm::Quick);
        assert_eq!(" Merge ".parse::<SortAlgorithm>().unwrap(), SortAlgorithm::Merge);
        assert!("bogo".parse::<SortAlgorithm>().is_err());
    }

    #[test]
    fn test_step_serializes_with_tag() {
        let steps = SortAlgorithm::Merge.trace(&[2, 1]);
        let json = serde_json::to_value(&steps[4]).unwrap();
        assert_eq!(json["action"]["type"], "place");
        assert_eq!(json["action"]["from"], "right");
        assert_eq!(json["code_line"], 8);
    }
}
