use std::future::Future;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::errors::{CatalogError, CatalogResult};
use crate::menu::{
    build_menu_tree, BulkActionDispatcher, DetachHandler, DropOutcome, EntityKind,
    IdentityRegistry, MenuNode, Notifier, ReorderEngine, Reorderable, TracingNotifier,
};
use crate::services::{CatalogService, DetachScope, ScopedDetacher, StoreMutations};

/// A list that can be reordered by drag and drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderScope {
    Labels,
    Categories,
    LabelCategories { label_id: i32 },
    CategoryProducts { category_id: i32 },
}

/// Shared application context wiring the catalog store to the menu handlers.
#[derive(Clone)]
pub struct AppContext {
    db: DatabaseConnection,
    catalog: Arc<CatalogService>,
    notifier: Arc<dyn Notifier>,
}

impl AppContext {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_notifier(db, Arc::new(TracingNotifier))
    }

    pub fn with_notifier(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        let catalog = Arc::new(CatalogService::new(db.clone()));
        Self {
            db,
            catalog,
            notifier,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn catalog(&self) -> Arc<CatalogService> {
        self.catalog.clone()
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        self.notifier.clone()
    }

    pub async fn load_menu_tree(&self) -> CatalogResult<Vec<MenuNode>> {
        let snapshot = self.catalog.load_menu_snapshot().await?;
        Ok(build_menu_tree(&snapshot))
    }

    /// Build the menu tree and the registry of its rows.
    pub async fn load_menu(&self) -> CatalogResult<(Vec<MenuNode>, Arc<IdentityRegistry>)> {
        let tree = self.load_menu_tree().await?;
        let registry = Arc::new(IdentityRegistry::from_tree(&tree));
        debug!("Menu registry holds {} rows", registry.len());
        Ok((tree, registry))
    }

    pub fn bulk_dispatcher(&self, registry: Arc<IdentityRegistry>) -> BulkActionDispatcher {
        BulkActionDispatcher::new(
            registry,
            Arc::new(StoreMutations::new(self.catalog.clone())),
            self.notifier.clone(),
        )
    }

    /// Detach handler for children of `child_kind` under `parent_id`.
    pub fn detach_handler(
        &self,
        parent_id: Option<i32>,
        child_kind: EntityKind,
    ) -> CatalogResult<DetachHandler> {
        let scope = DetachScope::for_child(child_kind).ok_or_else(|| {
            CatalogError::validation(format!("{} rows have no parent", child_kind.display_name()))
        })?;
        Ok(DetachHandler::new(
            parent_id,
            child_kind,
            Arc::new(ScopedDetacher::new(self.catalog.clone(), scope)),
            self.notifier.clone(),
        ))
    }

    /// Drag `dragged` onto `target` within `scope` and persist the result.
    pub async fn drop_in_scope(
        &self,
        scope: ReorderScope,
        dragged: i32,
        target: i32,
    ) -> CatalogResult<DropOutcome<i32>> {
        let catalog = self.catalog.clone();
        match scope {
            ReorderScope::Labels => {
                let items = catalog.list_labels().await?;
                drop_with(items, dragged, target, move |ids| async move {
                    catalog.reorder_labels(&ids).await.map(|_| ())
                })
                .await
            }
            ReorderScope::Categories => {
                let items = catalog.list_categories().await?;
                drop_with(items, dragged, target, move |ids| async move {
                    catalog.reorder_categories(&ids).await.map(|_| ())
                })
                .await
            }
            ReorderScope::LabelCategories { label_id } => {
                let items = catalog.list_label_categories(label_id).await?;
                drop_with(items, dragged, target, move |ids| async move {
                    catalog
                        .reorder_label_categories(label_id, &ids)
                        .await
                        .map(|_| ())
                })
                .await
            }
            ReorderScope::CategoryProducts { category_id } => {
                let items = catalog.list_category_products(category_id).await?;
                drop_with(items, dragged, target, move |ids| async move {
                    catalog
                        .reorder_category_products(category_id, &ids)
                        .await
                        .map(|_| ())
                })
                .await
            }
        }
    }
}

async fn drop_with<T, F, Fut>(
    items: Vec<T>,
    dragged: i32,
    target: i32,
    persist: F,
) -> CatalogResult<DropOutcome<i32>>
where
    T: Reorderable<Id = i32> + Clone,
    F: FnOnce(Vec<i32>) -> Fut,
    Fut: Future<Output = CatalogResult<()>>,
{
    let mut engine = ReorderEngine::new(items);
    engine.drag_start(dragged);
    engine.drag_over(target);
    engine.drop_on(target, persist).await
}
