mod astar;
mod heap;
mod huffman;
mod johnson_trotter;
mod sorting;

pub use astar::{Cell, Heuristic, Pathfinder, PathfinderState, SearchEvent, SearchObserver};
pub use heap::MinHeap;
pub use huffman::{
    generate_steps, CodeTable, HeapItem, HuffmanBuilder, HuffmanCode, HuffmanStep, NodeId, Phase,
    TreeNode, DEFAULT_FREQUENCIES,
};
pub use johnson_trotter::{
    AnimationState, DirectedValue, Direction, JohnsonTrotter, PermutationStep, MAX_ITERATIONS,
};
pub use sorting::{random_array, Side, SortAction, SortAlgorithm, SortStep};
