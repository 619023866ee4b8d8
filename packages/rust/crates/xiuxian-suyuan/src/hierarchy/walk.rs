use crate::models::DocumentId;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Lifecycle of a single walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WalkState {
    /// Start document queued, nothing popped yet.
    Seeded,
    /// Queue non-empty.
    Draining,
    /// Queue exhausted.
    Done,
}

/// Breadth-first worklist bounded by depth.
///
/// `discovered` guards against attaching a document twice; `visited` guards
/// against expanding it twice. Both are scoped to one walk.
#[derive(Debug)]
pub(crate) struct BoundedWalk<T> {
    queue: VecDeque<(DocumentId, usize, T)>,
    discovered: HashSet<DocumentId>,
    visited: HashSet<DocumentId>,
    max_depth: usize,
    state: WalkState,
}

impl<T> BoundedWalk<T> {
    pub(crate) fn new(start: DocumentId, payload: T, max_depth: usize) -> Self {
        let mut discovered = HashSet::new();
        discovered.insert(start.clone());
        let mut queue = VecDeque::new();
        queue.push_back((start, 0, payload));
        Self {
            queue,
            discovered,
            visited: HashSet::new(),
            max_depth,
            state: WalkState::Seeded,
        }
    }

    pub(crate) const fn state(&self) -> WalkState {
        self.state
    }

    /// Next document to expand. Skips entries at or past the depth bound and
    /// entries already expanded.
    pub(crate) fn next_expandable(&mut self) -> Option<(DocumentId, usize, T)> {
        if self.state == WalkState::Done {
            return None;
        }
        while let Some((doc, depth, payload)) = self.queue.pop_front() {
            self.state = WalkState::Draining;
            if depth >= self.max_depth || self.visited.contains(&doc) {
                continue;
            }
            self.visited.insert(doc.clone());
            return Some((doc, depth, payload));
        }
        self.state = WalkState::Done;
        None
    }

    /// Record `doc` as discovered; `false` when it was already seen in this walk.
    pub(crate) fn discover(&mut self, doc: &DocumentId) -> bool {
        !self.visited.contains(doc) && self.discovered.insert(doc.clone())
    }

    pub(crate) fn enqueue(&mut self, doc: DocumentId, depth: usize, payload: T) {
        self.queue.push_back((doc, depth, payload));
    }
}
