//! Bulk clone/remove over a multi-row selection.
//!
//! Each selected key is resolved through the [`IdentityRegistry`] to its
//! entity and the entity of the container it is rendered under, then routed
//! to the caller-supplied [`MenuMutations`] for its kind. Keys that no longer
//! resolve, and category/product rows without a parent row, are skipped.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{CatalogError, CatalogResult};

use super::kind::EntityKind;
use super::notify::{aborted, batch_summary, MenuAction, Notifier};
use super::registry::{IdentityRegistry, RowKey};

/// Per-kind mutation table supplied by the caller.
#[async_trait]
pub trait MenuMutations: Send + Sync {
    async fn clone_label(&self, label_id: i32) -> CatalogResult<()>;
    async fn clone_category(&self, category_id: i32, label_id: i32) -> CatalogResult<()>;
    async fn clone_product(&self, product_id: i32, category_id: i32) -> CatalogResult<()>;
    async fn remove_label(&self, label_id: i32) -> CatalogResult<()>;
    async fn remove_category(&self, category_id: i32, label_id: i32) -> CatalogResult<()>;
    async fn remove_product(&self, product_id: i32, category_id: i32) -> CatalogResult<()>;
}

/// Completion hooks, e.g. to clear the selection.
pub trait BatchObserver: Send + Sync {
    fn on_success(&self, _report: &BatchReport) {}
    fn on_error(&self, _error: &CatalogError) {}
}

/// Observer that ignores both hooks.
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Keys that did not resolve or had no parent in view.
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every key was skipped.
    Empty,
    AllSucceeded,
    AllFailed,
    Partial,
}

impl BatchReport {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn outcome(&self) -> BatchOutcome {
        if self.attempted() == 0 {
            BatchOutcome::Empty
        } else if self.failed == 0 {
            BatchOutcome::AllSucceeded
        } else if self.succeeded == 0 {
            BatchOutcome::AllFailed
        } else {
            BatchOutcome::Partial
        }
    }
}

/// A key resolved to the operation it should trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Label(i32),
    Category { id: i32, label_id: i32 },
    Product { id: i32, category_id: i32 },
}

pub struct BulkActionDispatcher {
    registry: Arc<IdentityRegistry>,
    mutations: Arc<dyn MenuMutations>,
    notifier: Arc<dyn Notifier>,
}

impl BulkActionDispatcher {
    pub fn new(
        registry: Arc<IdentityRegistry>,
        mutations: Arc<dyn MenuMutations>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registry,
            mutations,
            notifier,
        }
    }

    pub fn get_entity_id(&self, key: &RowKey) -> Option<i32> {
        self.registry.get_entity_id(key)
    }

    pub fn get_parent_id(&self, key: &RowKey) -> Option<i32> {
        self.registry.get_parent_entity_id(key)
    }

    fn resolve(&self, key: &RowKey) -> Option<Target> {
        let Some(entry) = self.registry.get(key) else {
            debug!(key = %key, "Skipping stale row key");
            return None;
        };
        let parent_id = self.get_parent_id(key);

        match (entry.kind, parent_id) {
            (EntityKind::Label, _) => Some(Target::Label(entry.entity_id)),
            (EntityKind::Category, Some(label_id)) => Some(Target::Category {
                id: entry.entity_id,
                label_id,
            }),
            (EntityKind::Product, Some(category_id)) => Some(Target::Product {
                id: entry.entity_id,
                category_id,
            }),
            (kind, None) => {
                debug!(key = %key, %kind, "Skipping row without a parent in view");
                None
            }
        }
    }

    /// Clone every selected row, in order, stopping at the first failure.
    ///
    /// Clones already made before the failure stay in place.
    pub async fn handle_clone(
        &self,
        keys: &[RowKey],
        observer: &dyn BatchObserver,
    ) -> CatalogResult<BatchReport> {
        let mut report = BatchReport::default();

        for key in keys {
            let Some(target) = self.resolve(key) else {
                report.skipped += 1;
                continue;
            };

            let result = match target {
                Target::Label(id) => self.mutations.clone_label(id).await,
                Target::Category { id, label_id } => {
                    self.mutations.clone_category(id, label_id).await
                }
                Target::Product { id, category_id } => {
                    self.mutations.clone_product(id, category_id).await
                }
            };

            if let Err(err) = result {
                warn!(key = %key, "Bulk clone aborted: {}", err);
                observer.on_error(&err);
                self.notifier.notify(aborted(MenuAction::Clone, &err));
                return Err(err);
            }
            report.succeeded += 1;
        }

        info!(
            "Bulk clone finished: {} cloned, {} skipped",
            report.succeeded, report.skipped
        );
        observer.on_success(&report);
        self.notifier
            .notify(batch_summary(MenuAction::Clone, &report));
        Ok(report)
    }

    /// Remove every selected row from its parent scope, continuing past
    /// failures.
    pub async fn handle_remove(
        &self,
        keys: &[RowKey],
        observer: &dyn BatchObserver,
    ) -> BatchReport {
        let mut report = BatchReport::default();

        for key in keys {
            let Some(target) = self.resolve(key) else {
                report.skipped += 1;
                continue;
            };

            let result = match target {
                Target::Label(id) => self.mutations.remove_label(id).await,
                Target::Category { id, label_id } => {
                    self.mutations.remove_category(id, label_id).await
                }
                Target::Product { id, category_id } => {
                    self.mutations.remove_product(id, category_id).await
                }
            };

            match result {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    warn!(key = %key, "Bulk remove failed for row: {}", err);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Bulk remove finished: {} removed, {} failed, {} skipped",
            report.succeeded, report.failed, report.skipped
        );
        observer.on_success(&report);
        self.notifier
            .notify(batch_summary(MenuAction::Remove, &report));
        report
    }
}
