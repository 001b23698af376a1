//! Detaching children from one specific parent container.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::CatalogResult;

use super::bulk::BatchReport;
use super::kind::EntityKind;
use super::notify::{batch_summary, single_result, MenuAction, Notifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetachOutcome {
    pub ok: bool,
}

/// Removes the relation between a parent and one child.
#[async_trait]
pub trait Detacher: Send + Sync {
    async fn detach(&self, parent_id: i32, child_id: i32) -> CatalogResult<DetachOutcome>;
}

/// Maps the row an action was triggered from to the ids it should act on.
pub type TargetIds = Box<dyn Fn(i32) -> Vec<i32> + Send + Sync>;

pub struct DetachHandler {
    parent_id: Option<i32>,
    child_kind: EntityKind,
    detacher: Arc<dyn Detacher>,
    notifier: Arc<dyn Notifier>,
    target_ids: Option<TargetIds>,
}

impl DetachHandler {
    pub fn new(
        parent_id: Option<i32>,
        child_kind: EntityKind,
        detacher: Arc<dyn Detacher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            parent_id,
            child_kind,
            detacher,
            notifier,
            target_ids: None,
        }
    }

    /// Bulk mode: `target_ids` projects the triggering row to the ids to
    /// detach. More than one id detaches them all concurrently.
    pub fn with_targets<F>(mut self, target_ids: F) -> Self
    where
        F: Fn(i32) -> Vec<i32> + Send + Sync + 'static,
    {
        self.target_ids = Some(Box::new(target_ids));
        self
    }

    /// Bulk mode over a selection: a row inside `selected` acts on the whole
    /// selection, a row outside it acts on itself only.
    pub fn with_selection(self, selected: Vec<i32>) -> Self {
        self.with_targets(move |entity_id| {
            if selected.contains(&entity_id) {
                selected.clone()
            } else {
                vec![entity_id]
            }
        })
    }

    pub fn parent_id(&self) -> Option<i32> {
        self.parent_id
    }

    fn ids_for(&self, entity_id: i32) -> Vec<i32> {
        match self.target_ids.as_ref().map(|project| project(entity_id)) {
            Some(ids) if ids.len() > 1 => ids,
            _ => vec![entity_id],
        }
    }

    async fn detach_one(&self, parent_id: i32, child_id: i32) -> bool {
        match self.detacher.detach(parent_id, child_id).await {
            Ok(DetachOutcome { ok: true }) => true,
            Ok(DetachOutcome { ok: false }) => {
                warn!(
                    parent_id,
                    child_id,
                    "{} was not attached",
                    self.child_kind.display_name()
                );
                false
            }
            Err(err) => {
                warn!(parent_id, child_id, "Detach failed: {}", err);
                false
            }
        }
    }

    /// Detach `entity_id` (or the bulk targets) from the bound parent.
    ///
    /// Returns `None` without touching anything when no parent is bound.
    pub async fn handle_remove(&self, entity_id: i32) -> Option<BatchReport> {
        let Some(parent_id) = self.parent_id else {
            debug!(entity_id, "No parent bound; nothing to detach");
            return None;
        };

        let ids = self.ids_for(entity_id);

        if let [child_id] = ids.as_slice() {
            let ok = self.detach_one(parent_id, *child_id).await;
            self.notifier
                .notify(single_result(MenuAction::Detach, self.child_kind, ok));
            return Some(BatchReport {
                succeeded: usize::from(ok),
                failed: usize::from(!ok),
                skipped: 0,
            });
        }

        let results = join_all(ids.iter().map(|id| self.detach_one(parent_id, *id))).await;
        let succeeded = results.iter().filter(|ok| **ok).count();
        let report = BatchReport {
            succeeded,
            failed: results.len() - succeeded,
            skipped: 0,
        };

        info!(
            parent_id,
            "Detached {} of {} {}",
            report.succeeded,
            results.len(),
            self.child_kind.plural()
        );
        self.notifier
            .notify(batch_summary(MenuAction::Detach, &report));
        Some(report)
    }
}
