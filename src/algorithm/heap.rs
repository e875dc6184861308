/// Array-backed binary min-heap.
///
/// Unlike `std::collections::BinaryHeap` the backing array is exposed in heap
/// order so that every intermediate layout can be shown to a learner.
/// Uses 0-indexed storage with parent = (i-1)/2, children = 2i+1, 2i+2.
#[derive(Debug, Clone)]
pub struct MinHeap<T> {
    nodes: Vec<T>,
}

impl<T: Ord> MinHeap<T> {
    pub fn new() -> Self {
        MinHeap { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The heap contents in array order.
    pub fn as_slice(&self) -> &[T] {
        &self.nodes
    }

    pub fn peek(&self) -> Option<&T> {
        self.nodes.first()
    }

    pub fn push(&mut self, item: T) {
        self.nodes.push(item);
        self.sift_up(self.nodes.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.nodes.is_empty() {
            return None;
        }
        let last = self.nodes.len() - 1;
        self.nodes.swap(0, last);
        let min = self.nodes.pop();
        if !self.nodes.is_empty() {
            self.sift_down(0);
        }
        min
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if self.nodes[index] >= self.nodes[parent] {
                break;
            }
            self.nodes.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.nodes.len();
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut smallest = index;

            if left < len && self.nodes[left] < self.nodes[smallest] {
                smallest = left;
            }
            if right < len && self.nodes[right] < self.nodes[smallest] {
                smallest = right;
            }
            if smallest == index {
                break;
            }

            self.nodes.swap(index, smallest);
            index = smallest;
        }
    }
}

impl<T: Ord> Default for MinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> FromIterator<T> for MinHeap<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut heap = MinHeap::new();
        for item in iter {
            heap.push(item);
        }
        heap
    }
}
