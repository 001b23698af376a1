//! Database implementations of the menu's mutation collaborators.

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{CatalogError, CatalogResult};
use crate::menu::bulk::MenuMutations;
use crate::menu::detach::{DetachOutcome, Detacher};
use crate::menu::kind::EntityKind;
use crate::services::catalog_service::CatalogService;

/// Clone/remove table backed by [`CatalogService`].
///
/// Removing a label deletes it; removing a category or product only
/// detaches it from the row it was selected under.
#[derive(Clone)]
pub struct StoreMutations {
    catalog: Arc<CatalogService>,
}

impl StoreMutations {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl MenuMutations for StoreMutations {
    async fn clone_label(&self, label_id: i32) -> CatalogResult<()> {
        self.catalog.clone_label(label_id).await.map(|_| ())
    }

    async fn clone_category(&self, category_id: i32, label_id: i32) -> CatalogResult<()> {
        self.catalog
            .clone_category(category_id, label_id)
            .await
            .map(|_| ())
    }

    async fn clone_product(&self, product_id: i32, category_id: i32) -> CatalogResult<()> {
        self.catalog
            .clone_product(product_id, category_id)
            .await
            .map(|_| ())
    }

    async fn remove_label(&self, label_id: i32) -> CatalogResult<()> {
        self.catalog.delete_label_with_relations(label_id).await
    }

    async fn remove_category(&self, category_id: i32, label_id: i32) -> CatalogResult<()> {
        let removed = self
            .catalog
            .detach_category_from_label(label_id, category_id)
            .await?;
        removed
            .then_some(())
            .ok_or_else(|| CatalogError::not_found("Category link", category_id))
    }

    async fn remove_product(&self, product_id: i32, category_id: i32) -> CatalogResult<()> {
        let removed = self
            .catalog
            .detach_product_from_category(category_id, product_id)
            .await?;
        removed
            .then_some(())
            .ok_or_else(|| CatalogError::not_found("Product link", product_id))
    }
}

/// Which junction a [`ScopedDetacher`] deletes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachScope {
    LabelCategories,
    CategoryProducts,
}

impl DetachScope {
    /// Scope whose children are of `child_kind`.
    pub fn for_child(child_kind: EntityKind) -> Option<Self> {
        match child_kind {
            EntityKind::Category => Some(DetachScope::LabelCategories),
            EntityKind::Product => Some(DetachScope::CategoryProducts),
            EntityKind::Label => None,
        }
    }

    pub fn child_kind(&self) -> EntityKind {
        match self {
            DetachScope::LabelCategories => EntityKind::Category,
            DetachScope::CategoryProducts => EntityKind::Product,
        }
    }
}

#[derive(Clone)]
pub struct ScopedDetacher {
    catalog: Arc<CatalogService>,
    scope: DetachScope,
}

impl ScopedDetacher {
    pub fn new(catalog: Arc<CatalogService>, scope: DetachScope) -> Self {
        Self { catalog, scope }
    }
}

#[async_trait]
impl Detacher for ScopedDetacher {
    async fn detach(&self, parent_id: i32, child_id: i32) -> CatalogResult<DetachOutcome> {
        let ok = match self.scope {
            DetachScope::LabelCategories => {
                self.catalog
                    .detach_category_from_label(parent_id, child_id)
                    .await?
            }
            DetachScope::CategoryProducts => {
                self.catalog
                    .detach_product_from_category(parent_id, child_id)
                    .await?
            }
        };
        Ok(DetachOutcome { ok })
    }
}
