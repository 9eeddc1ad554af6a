//! Shared employee selection state.
//!
//! The employee list and the chat view stay in sync through one app-wide
//! selection value. The cell has exactly one writer (the selection action);
//! every other component holds a read-only watcher and re-renders from the
//! current value on change.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// The currently selected employee, as shared between views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedEmployee {
    /// Employee identifier (the feedback record id).
    pub id: String,
    /// Employee display name.
    pub employee_name: String,
}

impl SelectedEmployee {
    /// Creates a selection value.
    pub fn new(id: impl Into<String>, employee_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            employee_name: employee_name.into(),
        }
    }
}

/// Single-writer cell holding the app-wide selection.
///
/// The cell must outlive every watcher handed out from it; it is the
/// component-tree root's job to keep it alive for the whole view lifetime.
#[derive(Debug)]
pub struct SelectionCell {
    tx: watch::Sender<Option<SelectedEmployee>>,
}

impl SelectionCell {
    /// Creates a cell with nothing selected.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Hands out a read-only watcher.
    pub fn watcher(&self) -> SelectionWatcher {
        SelectionWatcher {
            rx: self.tx.subscribe(),
        }
    }

    /// Selects an employee, replacing any previous selection.
    pub fn select(&self, employee: SelectedEmployee) {
        self.tx.send_replace(Some(employee));
    }

    /// Clears the selection; watchers observe the empty state.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// The current selection.
    pub fn current(&self) -> Option<SelectedEmployee> {
        self.tx.borrow().clone()
    }
}

impl Default for SelectionCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only view of the selection cell.
#[derive(Debug, Clone)]
pub struct SelectionWatcher {
    rx: watch::Receiver<Option<SelectedEmployee>>,
}

impl SelectionWatcher {
    /// The current selection. Never cached across changes by consumers;
    /// re-read after every `changed` wake-up.
    pub fn current(&self) -> Option<SelectedEmployee> {
        self.rx.borrow().clone()
    }

    /// Waits for the next selection change and returns the new value.
    ///
    /// # Panics
    ///
    /// Panics if the owning `SelectionCell` was dropped while this watcher
    /// is still in use. That is a wiring defect (a view outliving the
    /// selection root), not a runtime condition, and fails fast.
    pub async fn changed(&mut self) -> Option<SelectedEmployee> {
        if self.rx.changed().await.is_err() {
            panic!("SelectionWatcher used after its SelectionCell was dropped");
        }
        self.rx.borrow_and_update().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_select_and_clear() {
        let cell = SelectionCell::new();
        assert_eq!(cell.current(), None);

        cell.select(SelectedEmployee::new("emp-1", "Jane Doe"));
        assert_eq!(cell.current().unwrap().employee_name, "Jane Doe");

        cell.clear();
        assert_eq!(cell.current(), None);
    }

    #[tokio::test]
    async fn test_watcher_observes_changes() {
        let cell = SelectionCell::new();
        let mut watcher = cell.watcher();

        cell.select(SelectedEmployee::new("emp-1", "Jane Doe"));
        let seen = watcher.changed().await;
        assert_eq!(seen.unwrap().id, "emp-1");

        cell.clear();
        assert_eq!(watcher.changed().await, None);
    }

    #[tokio::test]
    async fn test_watchers_share_one_value() {
        let cell = SelectionCell::new();
        let first = cell.watcher();
        let second = cell.watcher();

        cell.select(SelectedEmployee::new("emp-2", "Ada"));

        assert_eq!(first.current(), second.current());
    }

    #[tokio::test]
    #[should_panic(expected = "SelectionCell was dropped")]
    async fn test_watcher_outliving_cell_is_fatal() {
        let cell = SelectionCell::new();
        let mut watcher = cell.watcher();
        drop(cell);

        watcher.changed().await;
    }
}
