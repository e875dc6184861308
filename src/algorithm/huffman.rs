use super::heap::MinHeap;

use anyhow::{anyhow, bail};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, instrument, trace};

/// The classic textbook table; its optimal weighted code length is 224 bits.
pub const DEFAULT_FREQUENCIES: [(char, u64); 6] = [
    ('a', 5),
    ('b', 9),
    ('c', 12),
    ('d', 13),
    ('e', 16),
    ('f', 45),
];

/// Identifier assigned at node creation, unique within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    /// Present on leaves only.
    pub symbol: Option<char>,
    pub frequency: u64,
    pub left: Option<Box<TreeNode>>,
    pub right: Option<Box<TreeNode>>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    fn label(&self) -> String {
        self.symbol
            .map_or_else(|| "internal".to_string(), |symbol| symbol.to_string())
    }

    /// Node ids from this node down to `target`, both inclusive. Empty when
    /// `target` is not in the subtree.
    pub fn path_to(&self, target: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        if self.collect_path(target, &mut path) {
            path
        } else {
            Vec::new()
        }
    }

    fn collect_path(&self, target: NodeId, path: &mut Vec<NodeId>) -> bool {
        path.push(self.id);
        if self.id == target {
            return true;
        }
        let found = [&self.left, &self.right]
            .into_iter()
            .flatten()
            .any(|child| child.collect_path(target, path));
        if !found {
            path.pop();
        }
        found
    }

    /// Walks the tree bit by bit: `0` goes left, `1` goes right. A lone leaf
    /// root decodes every `0` to its symbol.
    pub fn decode(&self, bits: &str) -> anyhow::Result<String> {
        let mut decoded = String::new();

        if self.is_leaf() {
            let symbol = self.symbol.ok_or_else(|| anyhow!("tree has no symbols"))?;
            for (offset, bit) in bits.chars().enumerate() {
                if bit != '0' {
                    bail!("unexpected bit {bit:?} at offset {offset}");
                }
                decoded.push(symbol);
            }
            return Ok(decoded);
        }

        let mut node = self;
        let mut inside_code_word = false;
        for (offset, bit) in bits.chars().enumerate() {
            let child = match bit {
                '0' => node.left.as_deref(),
                '1' => node.right.as_deref(),
                other => bail!("unexpected bit {other:?} at offset {offset}"),
            }
            .ok_or_else(|| anyhow!("bit {offset} leads out of the tree"))?;

            if child.is_leaf() {
                let symbol = child
                    .symbol
                    .ok_or_else(|| anyhow!("leaf {} has no symbol", child.id))?;
                decoded.push(symbol);
                node = self;
                inside_code_word = false;
            } else {
                node = child;
                inside_code_word = true;
            }
        }

        if inside_code_word {
            bail!("bit string ends inside a code word");
        }
        Ok(decoded)
    }
}

// Heap ordering: lower frequency first, then the earlier-created node.
#[derive(Debug, Clone)]
struct HeapEntry(TreeNode);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .frequency
            .cmp(&other.0.frequency)
            .then_with(|| self.0.id.cmp(&other.0.id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Building,
    Traversing,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Building => "building",
            Phase::Traversing => "traversing",
            Phase::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeapItem {
    pub node: TreeNode,
    pub is_extracting: bool,
    pub is_inserting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuffmanCode {
    pub symbol: char,
    pub code: String,
    pub frequency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HuffmanStep {
    pub phase: Phase,
    pub description: String,
    /// Heap contents in array order.
    pub heap: Vec<HeapItem>,
    pub tree: Option<TreeNode>,
    pub codes: Vec<HuffmanCode>,
    pub highlighted_nodes: Vec<NodeId>,
    pub highlighted_path: Vec<NodeId>,
    pub extracting_nodes: Vec<NodeId>,
    pub inserting_node: Option<NodeId>,
}

impl HuffmanStep {
    fn new(phase: Phase, description: impl Into<String>) -> Self {
        HuffmanStep {
            phase,
            description: description.into(),
            heap: Vec::new(),
            tree: None,
            codes: Vec::new(),
            highlighted_nodes: Vec::new(),
            highlighted_path: Vec::new(),
            extracting_nodes: Vec::new(),
            inserting_node: None,
        }
    }

    pub fn code_table(&self) -> CodeTable {
        CodeTable::new(self.codes.clone())
    }
}

impl fmt::Display for HuffmanStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.description)?;
        if !self.heap.is_empty() {
            let heap: Vec<String> = self
                .heap
                .iter()
                .map(|item| {
                    let marker = if item.is_extracting {
                        "-"
                    } else if item.is_inserting {
                        "+"
                    } else {
                        ""
                    };
                    let label = item.node.symbol.map_or('*', |symbol| symbol);
                    format!("{marker}{label}:{}", item.node.frequency)
                })
                .collect();
            write!(f, "\n  heap: [{}]", heap.join(", "))?;
        }
        if !self.codes.is_empty() {
            let codes: Vec<String> = self
                .codes
                .iter()
                .map(|entry| format!("{}={}", entry.symbol, entry.code))
                .collect();
            write!(f, "\n  codes: {}", codes.join(", "))?;
        }
        Ok(())
    }
}

/// Finalized symbol to code assignments, sorted by symbol.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CodeTable {
    codes: Vec<HuffmanCode>,
}

impl CodeTable {
    pub fn new(mut codes: Vec<HuffmanCode>) -> Self {
        codes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        CodeTable { codes }
    }

    pub fn codes(&self) -> &[HuffmanCode] {
        &self.codes
    }

    pub fn code_for(&self, symbol: char) -> Option<&str> {
        self.codes
            .iter()
            .find(|entry| entry.symbol == symbol)
            .map(|entry| entry.code.as_str())
    }

    /// Sum of `frequency * code length`, widened so no `u64` table can overflow it.
    pub fn weighted_length(&self) -> u128 {
        self.codes
            .iter()
            .map(|entry| u128::from(entry.frequency) * entry.code.len() as u128)
            .sum()
    }

    pub fn is_prefix_free(&self) -> bool {
        self.codes.iter().enumerate().all(|(i, a)| {
            self.codes
                .iter()
                .enumerate()
                .all(|(j, b)| i == j || !b.code.starts_with(&a.code))
        })
    }

    pub fn encode(&self, text: &str) -> anyhow::Result<String> {
        let mut bits = String::new();
        for symbol in text.chars() {
            let code = self
                .code_for(symbol)
                .ok_or_else(|| anyhow!("symbol {symbol:?} is not in the code table"))?;
            bits.push_str(code);
        }
        Ok(bits)
    }
}

/// Builds a Huffman tree from a frequency table and records every heap and
/// traversal operation as a replayable step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanBuilder {
    frequencies: Vec<(char, u64)>,
}

impl Default for HuffmanBuilder {
    fn default() -> Self {
        HuffmanBuilder::new(DEFAULT_FREQUENCIES.to_vec())
    }
}

impl HuffmanBuilder {
    pub fn new(frequencies: Vec<(char, u64)>) -> Self {
        HuffmanBuilder { frequencies }
    }

    /// Counts every character of `text`; symbols are ordered by code point.
    pub fn from_text(text: &str) -> Self {
        let mut counts = BTreeMap::new();
        for symbol in text.chars() {
            *counts.entry(symbol).or_insert(0u64) += 1;
        }
        HuffmanBuilder::new(counts.into_iter().collect())
    }

    pub fn frequencies(&self) -> &[(char, u64)] {
        &self.frequencies
    }

    /// Sum of all frequencies, or `None` when it does not fit in a `u64`.
    /// Every internal node weighs at most this much.
    pub fn total_frequency(&self) -> Option<u64> {
        self.frequencies
            .iter()
            .try_fold(0u64, |total, &(_, frequency)| total.checked_add(frequency))
    }

    #[instrument(
        skip_all,
        name = "huffman_steps",
        fields(symbols = self.frequencies.len()),
        level = "debug"
    )]
    pub fn generate_steps(&self) -> Vec<HuffmanStep> {
        let steps = StepRecorder::default().run(&self.frequencies);
        debug!("recorded {} steps", steps.len());
        steps
    }
}

/// Steps for [`DEFAULT_FREQUENCIES`].
pub fn generate_steps() -> Vec<HuffmanStep> {
    HuffmanBuilder::default().generate_steps()
}

fn snapshot(
    entries: &[HeapEntry],
    extracting: Option<NodeId>,
    inserting: Option<NodeId>,
) -> Vec<HeapItem> {
    entries
        .iter()
        .map(|HeapEntry(node)| HeapItem {
            node: node.clone(),
            is_extracting: Some(node.id) == extracting,
            is_inserting: Some(node.id) == inserting,
        })
        .collect()
}

#[derive(Debug, Default)]
struct StepRecorder {
    next_id: usize,
    steps: Vec<HuffmanStep>,
}

impl StepRecorder {
    fn create_node(
        &mut self,
        symbol: Option<char>,
        frequency: u64,
        left: Option<TreeNode>,
        right: Option<TreeNode>,
    ) -> TreeNode {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        TreeNode {
            id,
            symbol,
            frequency,
            left: left.map(Box::new),
            right: right.map(Box::new),
        }
    }

    fn run(mut self, frequencies: &[(char, u64)]) -> Vec<HuffmanStep> {
        let leaves: Vec<TreeNode> = frequencies
            .iter()
            .map(|&(symbol, frequency)| self.create_node(Some(symbol), frequency, None, None))
            .collect();
        let mut heap: MinHeap<HeapEntry> = leaves.into_iter().map(HeapEntry).collect();

        self.steps.push(HuffmanStep {
            heap: snapshot(heap.as_slice(), None, None),
            ..HuffmanStep::new(
                Phase::Building,
                "Initialized min-heap with character frequencies. Ready to build Huffman Tree.",
            )
        });

        let mut tree: Option<TreeNode> = None;
        while heap.len() > 1 {
            let before_first = heap.as_slice().to_vec();
            let Some(HeapEntry(left)) = heap.pop() else {
                break;
            };
            self.steps.push(HuffmanStep {
                heap: snapshot(&before_first, Some(left.id), None),
                tree: tree.clone(),
                extracting_nodes: vec![left.id],
                ..HuffmanStep::new(
                    Phase::Building,
                    format!(
                        "Extracting node '{}' (frequency: {}) from min-heap.",
                        left.label(),
                        left.frequency
                    ),
                )
            });

            let before_second = heap.as_slice().to_vec();
            let Some(HeapEntry(right)) = heap.pop() else {
                break;
            };
            self.steps.push(HuffmanStep {
                heap: snapshot(&before_second, Some(right.id), None),
                tree: tree.clone(),
                extracting_nodes: vec![left.id, right.id],
                ..HuffmanStep::new(
                    Phase::Building,
                    format!(
                        "Extracting node '{}' (frequency: {}) from min-heap.",
                        right.label(),
                        right.frequency
                    ),
                )
            });

            // Saturates only when the table total exceeds `u64::MAX`.
            let frequency = left.frequency.saturating_add(right.frequency);
            trace!("merge {} and {} into frequency {frequency}", left.id, right.id);
            let merged = self.create_node(None, frequency, Some(left), Some(right));
            let merged_id = merged.id;
            tree = Some(merged.clone());
            heap.push(HeapEntry(merged));

            self.steps.push(HuffmanStep {
                heap: snapshot(heap.as_slice(), None, Some(merged_id)),
                tree: tree.clone(),
                inserting_node: Some(merged_id),
                ..HuffmanStep::new(
                    Phase::Building,
                    format!(
                        "Created new internal node with frequency {frequency}. Inserted back into min-heap."
                    ),
                )
            });
        }

        let root = heap.pop().map(|HeapEntry(node)| node);
        let mut codes = Vec::new();
        if let Some(root) = &root {
            self.steps.push(HuffmanStep {
                tree: Some(root.clone()),
                ..HuffmanStep::new(
                    Phase::Building,
                    "Huffman Tree construction complete! Starting code generation by traversing the tree.",
                )
            });
            self.traverse(root, root, String::new(), &mut codes);
        }

        codes.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        self.steps.push(HuffmanStep {
            tree: root,
            codes,
            ..HuffmanStep::new(
                Phase::Complete,
                "Huffman coding complete! All characters have been assigned optimal prefix codes.",
            )
        });

        self.steps
    }

    // Depth first, left before right.
    fn traverse(
        &mut self,
        root: &TreeNode,
        node: &TreeNode,
        code: String,
        codes: &mut Vec<HuffmanCode>,
    ) {
        if node.is_leaf() {
            let Some(symbol) = node.symbol else {
                return;
            };
            let code = if code.is_empty() { "0".to_string() } else { code };
            self.steps.push(HuffmanStep {
                tree: Some(root.clone()),
                codes: codes.clone(),
                highlighted_path: root.path_to(node.id),
                highlighted_nodes: vec![node.id],
                ..HuffmanStep::new(
                    Phase::Traversing,
                    format!(
                        "Traversing to find code for '{symbol}'. Path: {code}. Found leaf '{symbol}'. Code is '{code}'."
                    ),
                )
            });
            codes.push(HuffmanCode {
                symbol,
                code,
                frequency: node.frequency,
            });
            return;
        }

        if let Some(left) = &node.left {
            self.traverse(root, left, format!("{code}0"), codes);
        }
        if let Some(right) = &node.right {
            self.traverse(root, right, format!("{code}1"), codes);
        }
    }
}
