//! Bounded selection of presets for side-by-side comparison.

use crate::preset::DEFAULT_MAX_COMPARE;
use tracing::debug;

/// Bounded multi-preset selection for side-by-side comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompareSelection {
    selected: Vec<String>,
    max_selected: usize,
}

impl Default for CompareSelection {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_COMPARE)
    }
}

impl CompareSelection {
    pub fn new(max_selected: usize) -> Self {
        Self {
            selected: Vec::new(),
            max_selected,
        }
    }

    /// Select or deselect `name`. Selecting past the limit is rejected and
    /// leaves the selection unchanged. Returns true if the selection changed.
    pub fn toggle(&mut self, name: &str) -> bool {
        if let Some(idx) = self.selected.iter().position(|n| n == name) {
            self.selected.remove(idx);
            return true;
        }
        if self.selected.len() >= self.max_selected {
            debug!(name, max = self.max_selected, "Compare selection full");
            return false;
        }
        self.selected.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selected.iter().any(|n| n == name)
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_full(&self) -> bool {
        self.selected.len() >= self.max_selected
    }

    /// Drop names that no longer exist (e.g. deleted elsewhere).
    pub fn retain_existing(&mut self, existing: &[String]) {
        self.selected.retain(|n| existing.contains(n));
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }
}
