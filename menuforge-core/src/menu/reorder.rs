//! Drag-and-drop reordering of one scope.
//!
//! The engine never patches individual positions. A drop produces the full
//! id sequence of the scope and hands it to a persistence callback, which
//! assigns `order = index`.

use std::future::Future;

use tracing::{debug, warn};

use crate::database::entities::{categories, labels, products};
use crate::errors::CatalogResult;

/// Anything that can sit in a reorderable list.
pub trait Reorderable {
    type Id: Clone + PartialEq + std::fmt::Debug;

    fn reorder_id(&self) -> Self::Id;
}

impl Reorderable for labels::Model {
    type Id = i32;

    fn reorder_id(&self) -> i32 {
        self.id
    }
}

impl Reorderable for categories::Model {
    type Id = i32;

    fn reorder_id(&self) -> i32 {
        self.id
    }
}

impl Reorderable for products::Model {
    type Id = i32;

    fn reorder_id(&self) -> i32 {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState<Id> {
    Idle,
    Dragging { dragged: Id, over: Option<Id> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome<Id> {
    /// Nothing moved; no persistence call was made.
    Unchanged,
    /// The new sequence was persisted.
    Persisted(Vec<Id>),
}

/// Move `dragged` to the index `target` occupies before the move.
///
/// Returns `None` when the drop is a no-op: same item, or either id absent.
pub fn reorder_ids<Id: Clone + PartialEq>(ids: &[Id], dragged: &Id, target: &Id) -> Option<Vec<Id>> {
    if dragged == target {
        return None;
    }
    let from = ids.iter().position(|id| id == dragged)?;
    let to = ids.iter().position(|id| id == target)?;

    let mut reordered = ids.to_vec();
    let moved = reordered.remove(from);
    reordered.insert(to.min(reordered.len()), moved);
    Some(reordered)
}

/// Transient drag state plus the list being reordered.
#[derive(Debug, Clone)]
pub struct ReorderEngine<T: Reorderable> {
    items: Vec<T>,
    committed: Vec<T>,
    dragged_id: Option<T::Id>,
    drag_over_id: Option<T::Id>,
}

impl<T> ReorderEngine<T>
where
    T: Reorderable + Clone,
{
    pub fn new(items: Vec<T>) -> Self {
        Self {
            committed: items.clone(),
            items,
            dragged_id: None,
            drag_over_id: None,
        }
    }

    /// Current (possibly optimistic) order.
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn ids(&self) -> Vec<T::Id> {
        self.items.iter().map(Reorderable::reorder_id).collect()
    }

    /// Replace the list after a re-fetch. Resets any drag in progress.
    pub fn reset(&mut self, items: Vec<T>) {
        self.committed = items.clone();
        self.items = items;
        self.drag_end();
    }

    pub fn state(&self) -> DragState<T::Id> {
        match &self.dragged_id {
            Some(dragged) => DragState::Dragging {
                dragged: dragged.clone(),
                over: self.drag_over_id.clone(),
            },
            None => DragState::Idle,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.dragged_id.is_some()
    }

    pub fn drag_start(&mut self, id: T::Id) {
        self.dragged_id = Some(id);
        self.drag_over_id = None;
    }

    pub fn drag_over(&mut self, id: T::Id) {
        if self.dragged_id.is_some() {
            self.drag_over_id = Some(id);
        }
    }

    pub fn drag_leave(&mut self) {
        self.drag_over_id = None;
    }

    pub fn drag_end(&mut self) {
        self.dragged_id = None;
        self.drag_over_id = None;
    }

    /// Drop the dragged row onto `target_id`.
    ///
    /// The optimistic order is applied before `persist` runs and is kept if
    /// it fails; call [`ReorderEngine::revert`] to fall back to the last
    /// committed order.
    pub async fn drop_on<F, Fut>(
        &mut self,
        target_id: T::Id,
        persist: F,
    ) -> CatalogResult<DropOutcome<T::Id>>
    where
        F: FnOnce(Vec<T::Id>) -> Fut,
        Fut: Future<Output = CatalogResult<()>>,
    {
        let dragged = self.dragged_id.take();
        self.drag_over_id = None;

        let Some(dragged) = dragged else {
            return Ok(DropOutcome::Unchanged);
        };

        let ids = self.ids();
        let Some(new_ids) = reorder_ids(&ids, &dragged, &target_id) else {
            debug!(?dragged, target = ?target_id, "Drop did not change order");
            return Ok(DropOutcome::Unchanged);
        };

        self.items = new_ids
            .iter()
            .filter_map(|id| {
                self.items
                    .iter()
                    .find(|item| item.reorder_id() == *id)
                    .cloned()
            })
            .collect();

        match persist(new_ids.clone()).await {
            Ok(()) => {
                self.committed = self.items.clone();
                Ok(DropOutcome::Persisted(new_ids))
            }
            Err(err) => {
                warn!(?dragged, target = ?target_id, "Failed to persist reorder: {}", err);
                Err(err)
            }
        }
    }

    /// Restore the last order that was successfully persisted.
    pub fn revert(&mut self) {
        self.items = self.committed.clone();
        self.drag_end();
    }

    /// True when the displayed order differs from the last persisted one.
    pub fn has_unsaved_order(&self) -> bool {
        let committed: Vec<T::Id> = self.committed.iter().map(Reorderable::reorder_id).collect();
        committed != self.ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CatalogError;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    struct Row(&'static str);

    impl Reorderable for Row {
        type Id = &'static str;

        fn reorder_id(&self) -> &'static str {
            self.0
        }
    }

    fn engine() -> ReorderEngine<Row> {
        ReorderEngine::new(vec![Row("A"), Row("B"), Row("C")])
    }

    #[test]
    fn reorder_ids_moves_to_target_index() {
        let ids = ["A", "B", "C"];
        assert_eq!(reorder_ids(&ids, &"C", &"A"), Some(vec!["C", "A", "B"]));
        assert_eq!(reorder_ids(&ids, &"A", &"C"), Some(vec!["B", "C", "A"]));
        assert_eq!(reorder_ids(&ids, &"B", &"C"), Some(vec!["A", "C", "B"]));
        assert_eq!(reorder_ids(&ids, &"A", &"A"), None);
        assert_eq!(reorder_ids(&ids, &"Z", &"A"), None);
        assert_eq!(reorder_ids(&ids, &"A", &"Z"), None);
    }

    #[test]
    fn drag_states_transition_between_idle_and_dragging() {
        let mut engine = engine();
        assert_eq!(engine.state(), DragState::Idle);

        engine.drag_over("B");
        assert_eq!(engine.state(), DragState::Idle);

        engine.drag_start("A");
        engine.drag_over("B");
        assert_eq!(
            engine.state(),
            DragState::Dragging {
                dragged: "A",
                over: Some("B")
            }
        );

        engine.drag_end();
        assert_eq!(engine.state(), DragState::Idle);
    }

    #[tokio::test]
    async fn drop_persists_full_sequence() {
        let mut engine = engine();
        let seen = Arc::new(Mutex::new(Vec::new()));

        engine.drag_start("C");
        let sink = seen.clone();
        let outcome = engine
            .drop_on("A", |ids| async move {
                sink.lock().unwrap().push(ids);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, DropOutcome::Persisted(vec!["C", "A", "B"]));
        assert_eq!(engine.ids(), vec!["C", "A", "B"]);
        assert_eq!(seen.lock().unwrap().as_slice(), &[vec!["C", "A", "B"]]);
        assert_eq!(engine.state(), DragState::Idle);
        assert!(!engine.has_unsaved_order());
    }

    #[tokio::test]
    async fn dropping_on_itself_skips_persistence() {
        let mut engine = engine();
        let calls = Arc::new(Mutex::new(0));

        engine.drag_start("B");
        let counter = calls.clone();
        let outcome = engine
            .drop_on("B", |_| async move {
                *counter.lock().unwrap() += 1;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(outcome, DropOutcome::Unchanged);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert_eq!(engine.ids(), vec!["A", "B", "C"]);
        assert_eq!(engine.state(), DragState::Idle);
    }

    #[tokio::test]
    async fn drop_without_drag_is_a_no_op() {
        let mut engine = engine();
        let outcome = engine
            .drop_on("A", |_| async { Err(CatalogError::validation("unreachable")) })
            .await
            .unwrap();
        assert_eq!(outcome, DropOutcome::Unchanged);
    }

    #[tokio::test]
    async fn failed_persist_keeps_optimistic_order_until_reverted() {
        let mut engine = engine();
        engine.drag_start("A");
        let result = engine
            .drop_on("C", |_| async { Err(CatalogError::validation("offline")) })
            .await;

        assert!(result.is_err());
        assert_eq!(engine.ids(), vec!["B", "C", "A"]);
        assert!(engine.has_unsaved_order());

        engine.revert();
        assert_eq!(engine.ids(), vec!["A", "B", "C"]);
        assert!(!engine.has_unsaved_order());
    }
}
