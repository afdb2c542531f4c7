use image::RgbaImage;
use std::collections::VecDeque;

use crate::settings::MAX_HISTORY_SIZE;

// ============================================================================
// HISTORY MANAGER - bounded stack of full-image snapshots
// ============================================================================

/// Undo/redo history over whole-image snapshots.
///
/// Once an image is loaded the undo stack is never empty and its top always
/// equals the session's current image. Every snapshot going in or coming out
/// is an independent copy, so edits to the live buffer never reach history.
pub struct HistoryManager {
    undo_stack: VecDeque<RgbaImage>,
    redo_stack: Vec<RgbaImage>,
    max_history_size: usize,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY_SIZE)
    }
}

impl HistoryManager {
    pub fn new(max_history_size: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            max_history_size: max_history_size.max(1),
        }
    }

    pub fn max_history_size(&self) -> usize {
        self.max_history_size
    }

    /// Start over from a freshly loaded image.
    pub fn reset_to(&mut self, baseline: &RgbaImage) {
        self.clear();
        self.undo_stack.push_back(baseline.clone());
    }

    /// Record a committed edit. Clears redo; evicts the oldest snapshot when full.
    pub fn push(&mut self, snapshot: &RgbaImage) {
        self.redo_stack.clear();
        self.undo_stack.push_back(snapshot.clone());
        self.prune();
    }

    /// Step back one edit. Returns a copy of the state to restore, or `None`
    /// when only the baseline is left.
    pub fn undo(&mut self) -> Option<RgbaImage> {
        if self.undo_stack.len() < 2 {
            return None;
        }
        let undone = self.undo_stack.pop_back()?;
        self.redo_stack.push(undone);
        self.undo_stack.back().cloned()
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self) -> Option<RgbaImage> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(next.clone());
        Some(next)
    }

    /// Drop everything after the oldest snapshot and return a copy of it.
    pub fn reset(&mut self) -> Option<RgbaImage> {
        let baseline = self.undo_stack.front()?.clone();
        self.undo_stack.truncate(1);
        self.redo_stack.clear();
        Some(baseline)
    }

    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() >= 2
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Oldest retained snapshot.
    pub fn baseline(&self) -> Option<&RgbaImage> {
        self.undo_stack.front()
    }

    /// Snapshot equal to the session's current image.
    pub fn current(&self) -> Option<&RgbaImage> {
        self.undo_stack.back()
    }

    /// Snapshots oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &RgbaImage> {
        self.undo_stack.iter()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Bytes held by both stacks.
    pub fn memory_usage(&self) -> usize {
        self.undo_stack
            .iter()
            .chain(self.redo_stack.iter())
            .map(|img| img.as_raw().len())
            .sum()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn prune(&mut self) {
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(v: u8) -> RgbaImage {
        RgbaImage::from_pixel(2, 2, Rgba([v, v, v, 255]))
    }

    fn tag(img: &RgbaImage) -> u8 {
        img.get_pixel(0, 0)[0]
    }

    #[test]
    fn bounded_fifo_eviction() {
        let mut history = HistoryManager::new(5);
        history.reset_to(&solid(0));
        for v in 1..=9 {
            history.push(&solid(v));
        }
        assert_eq!(history.undo_count(), 5);
        let tags: Vec<u8> = history.snapshots().map(tag).collect();
        assert_eq!(tags, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn undo_stops_at_baseline() {
        let mut history = HistoryManager::default();
        history.reset_to(&solid(0));
        assert!(history.undo().is_none());
        history.push(&solid(1));
        assert_eq!(history.undo().map(|i| tag(&i)), Some(0));
        assert!(history.undo().is_none());
        assert_eq!(history.redo_count(), 1);
    }

    #[test]
    fn undo_then_redo_restores_top() {
        let mut history = HistoryManager::default();
        history.reset_to(&solid(0));
        history.push(&solid(1));
        history.push(&solid(2));
        history.undo();
        let redone = history.redo().unwrap();
        assert_eq!(tag(&redone), 2);
        assert_eq!(history.current().map(tag), Some(2));
        assert!(history.redo().is_none());
    }

    #[test]
    fn push_clears_redo() {
        let mut history = HistoryManager::default();
        history.reset_to(&solid(0));
        history.push(&solid(1));
        history.undo();
        assert!(history.can_redo());
        history.push(&solid(3));
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 2);
    }

    #[test]
    fn reset_keeps_only_baseline() {
        let mut history = HistoryManager::default();
        assert!(history.reset().is_none());
        history.reset_to(&solid(0));
        history.push(&solid(1));
        history.push(&solid(2));
        history.undo();
        assert_eq!(history.reset().map(|i| tag(&i)), Some(0));
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn snapshots_are_independent_copies() {
        let mut history = HistoryManager::default();
        let mut live = solid(0);
        history.reset_to(&live);
        live.put_pixel(0, 0, Rgba([200, 0, 0, 255]));
        assert_eq!(history.baseline().map(tag), Some(0));

        let mut restored = {
            history.push(&solid(1));
            history.undo().unwrap()
        };
        restored.put_pixel(0, 0, Rgba([99, 0, 0, 255]));
        assert_eq!(history.current().map(tag), Some(0));
    }

    #[test]
    fn memory_counts_both_stacks() {
        let mut history = HistoryManager::new(0);
        assert_eq!(history.max_history_size(), 1);
        history.reset_to(&solid(0));
        history.push(&solid(1));
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.memory_usage(), 16);
    }
}
