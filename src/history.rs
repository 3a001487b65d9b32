//! Linear undo/redo over full collection snapshots.

use std::collections::VecDeque;

use crate::annotation::AnnotatedTask;

/// The ordered collection at one instant.
pub type Snapshot = Vec<AnnotatedTask>;

/// Undo and redo stacks of whole snapshots.
///
/// Recording a new snapshot discards the redo lane. Without a limit both
/// stacks grow unbounded; with one the oldest undo entry is evicted.
#[derive(Debug, Clone)]
pub struct HistoryManager<S = Snapshot> {
    undo_stack: VecDeque<S>,
    redo_stack: Vec<S>,
    limit: Option<usize>,
}

impl<S> Default for HistoryManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> HistoryManager<S> {
    pub fn new() -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            limit: None,
        }
    }

    /// Cap the undo depth. `Some(0)` disables undo entirely.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::new()
        }
    }

    /// Push the pre-mutation collection and clear the redo lane.
    pub fn record_snapshot(&mut self, before: S) {
        self.redo_stack.clear();
        self.push_undo(before);
    }

    /// Step back. `None` means there is nothing to undo.
    pub fn undo(&mut self, current: S) -> Option<S> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Step forward again. `None` means there is nothing to redo.
    pub fn redo(&mut self, current: S) -> Option<S> {
        let next = self.redo_stack.pop()?;
        self.push_undo(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_undo(&mut self, snapshot: S) {
        self.undo_stack.push_back(snapshot);
        if let Some(limit) = self.limit {
            while self.undo_stack.len() > limit {
                self.undo_stack.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_is_noop() {
        let mut history: HistoryManager<Vec<u32>> = HistoryManager::new();
        assert_eq!(history.undo(vec![1]), None);
        assert_eq!(history.redo(vec![1]), None);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn test_undo_then_redo_restores_current() {
        let mut history = HistoryManager::new();
        history.record_snapshot(vec![1]);
        let current = vec![1, 2];

        let restored = history.undo(current.clone()).unwrap();
        assert_eq!(restored, vec![1]);
        assert_eq!(history.redo(restored).unwrap(), current);
    }

    #[test]
    fn test_n_undos_then_n_redos() {
        let mut history = HistoryManager::new();
        let states: Vec<Vec<u32>> = vec![vec![], vec![1], vec![1, 2], vec![1, 2, 3]];
        for pair in states.windows(2) {
            history.record_snapshot(pair[0].clone());
        }

        let mut current = states[3].clone();
        for expected in states[..3].iter().rev() {
            current = history.undo(current).unwrap();
            assert_eq!(&current, expected);
        }
        assert_eq!(history.undo(current.clone()), None);

        for expected in &states[1..] {
            current = history.redo(current).unwrap();
            assert_eq!(&current, expected);
        }
        assert_eq!(history.redo(current), None);
    }

    #[test]
    fn test_new_snapshot_clears_redo() {
        let mut history = HistoryManager::new();
        history.record_snapshot(vec![0]);
        let current = history.undo(vec![0, 1]).unwrap();
        assert!(history.can_redo());

        history.record_snapshot(current);
        assert!(!history.can_redo());
        assert_eq!(history.redo(vec![0, 9]), None);
    }

    #[test]
    fn test_limit_evicts_oldest() {
        let mut history = HistoryManager::with_limit(Some(2));
        history.record_snapshot(1);
        history.record_snapshot(2);
        history.record_snapshot(3);
        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo(4), Some(3));
        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), None);
    }
}
