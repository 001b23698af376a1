use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use menuforge::errors::{CatalogError, CatalogResult};
use menuforge::menu::{
    flatten_tree, BatchObserver, BatchReport, DetachHandler, DetachOutcome, Detacher,
    DropOutcome, EntityKind, Expansion, IdentityRegistry, RecordingNotifier, RowKey,
};
use menuforge::services::{DetachScope, ScopedDetacher};
use menuforge::{app_context::ReorderScope, AppContext};
use menuforge_test_utils::{seed_menu, MenuFixture, TestDb};

async fn context() -> (AppContext, Arc<RecordingNotifier>, MenuFixture) {
    let db = TestDb::new_in_memory()
        .connect()
        .await
        .expect("Failed to connect to test database");
    let notifier = Arc::new(RecordingNotifier::new());
    let ctx = AppContext::with_notifier(db, notifier.clone());
    let menu = seed_menu(&ctx.catalog()).await.expect("Failed to seed menu");
    (ctx, notifier, menu)
}

fn key_for(registry: &IdentityRegistry, kind: EntityKind, id: i32, parent_id: Option<i32>) -> RowKey {
    registry
        .keys_for(kind, id)
        .into_iter()
        .find(|key| registry.get_parent_entity_id(key) == parent_id)
        .cloned()
        .expect("row not rendered")
}

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<BatchReport>>,
    errors: Mutex<Vec<String>>,
}

impl BatchObserver for RecordingObserver {
    fn on_success(&self, report: &BatchReport) {
        self.successes.lock().unwrap().push(*report);
    }

    fn on_error(&self, error: &CatalogError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

/// Delegates to the store but refuses one child.
struct RefusingDetacher {
    inner: ScopedDetacher,
    refused: i32,
}

#[async_trait]
impl Detacher for RefusingDetacher {
    async fn detach(&self, parent_id: i32, child_id: i32) -> CatalogResult<DetachOutcome> {
        if child_id == self.refused {
            return Err(CatalogError::validation(format!("{child_id} is locked")));
        }
        self.inner.detach(parent_id, child_id).await
    }
}

#[tokio::test]
async fn tree_renders_shared_category_under_each_label() {
    let (ctx, _, menu) = context().await;
    let (tree, registry) = ctx.load_menu().await.unwrap();

    let roots: Vec<i32> = tree.iter().map(|n| n.entity_id).collect();
    assert_eq!(roots, vec![menu.drinks.id, menu.food.id]);

    let pastry_rows = registry.keys_for(EntityKind::Category, menu.pastries.id);
    assert_eq!(pastry_rows.len(), 2);
    let parents: Vec<Option<i32>> = pastry_rows
        .iter()
        .map(|key| registry.get_parent_entity_id(key))
        .collect();
    assert_eq!(parents, vec![Some(menu.drinks.id), Some(menu.food.id)]);

    let rows = flatten_tree(&tree, &Expansion::All);
    assert_eq!(rows.len(), registry.len());
}

#[tokio::test]
async fn bulk_clone_routes_through_parent_rows() {
    let (ctx, notifier, menu) = context().await;
    let (_, registry) = ctx.load_menu().await.unwrap();

    let under_food = key_for(&registry, EntityKind::Category, menu.pastries.id, Some(menu.food.id));
    let croissant = key_for(&registry, EntityKind::Product, menu.croissant.id, Some(menu.pastries.id));
    let stale = RowKey::from("label:999");

    let observer = RecordingObserver::default();
    let report = ctx
        .bulk_dispatcher(registry)
        .handle_clone(&[under_food, stale, croissant], &observer)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(observer.successes.lock().unwrap().len(), 1);

    let catalog = ctx.catalog();
    let food_categories: Vec<String> = catalog
        .list_label_categories(menu.food.id)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert_eq!(food_categories, vec!["pastries", "pastries-copy"]);

    let pastry_products: Vec<String> = catalog
        .list_category_products(menu.pastries.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.slug)
        .collect();
    assert_eq!(pastry_products, vec!["croissant", "croissant-copy"]);

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Cloned 2 items");
}

#[tokio::test]
async fn bulk_clone_skips_parentless_rows() {
    let (ctx, _, menu) = context().await;
    let catalog = ctx.catalog();

    // detach tea so it renders at the root without a parent row
    catalog
        .detach_category_from_label(menu.drinks.id, menu.tea.id)
        .await
        .unwrap();
    let (_, registry) = ctx.load_menu().await.unwrap();

    let coffee = key_for(&registry, EntityKind::Category, menu.coffee.id, Some(menu.drinks.id));
    let loose_tea = key_for(&registry, EntityKind::Category, menu.tea.id, None);

    let observer = RecordingObserver::default();
    let report = ctx
        .bulk_dispatcher(registry)
        .handle_clone(&[coffee, loose_tea], &observer)
        .await
        .unwrap();

    assert_eq!(report.succeeded, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(observer.successes.lock().unwrap().len(), 1);
    assert!(observer.errors.lock().unwrap().is_empty());

    let slugs: Vec<String> = catalog
        .list_categories()
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.slug)
        .collect();
    assert!(slugs.contains(&"coffee-copy".to_string()));
    assert!(!slugs.contains(&"tea-copy".to_string()));
}

#[tokio::test]
async fn bulk_clone_stops_at_first_failure() {
    let (ctx, notifier, menu) = context().await;
    let (_, registry) = ctx.load_menu().await.unwrap();
    let coffee = key_for(&registry, EntityKind::Category, menu.coffee.id, Some(menu.drinks.id));
    let tea = key_for(&registry, EntityKind::Category, menu.tea.id, Some(menu.drinks.id));

    // drinks disappears after the registry snapshot was taken
    ctx.catalog()
        .delete_label_with_relations(menu.drinks.id)
        .await
        .unwrap();

    let observer = RecordingObserver::default();
    let result = ctx
        .bulk_dispatcher(registry)
        .handle_clone(&[coffee, tea], &observer)
        .await;

    assert!(result.unwrap_err().is_not_found());
    assert!(observer.successes.lock().unwrap().is_empty());
    assert_eq!(observer.errors.lock().unwrap().len(), 1);
    assert!(notifier.notifications()[0].is_destructive());
}

#[tokio::test]
async fn bulk_remove_detaches_scoped_rows_and_deletes_labels() {
    let (ctx, notifier, menu) = context().await;
    let (_, registry) = ctx.load_menu().await.unwrap();

    let pastries_under_drinks =
        key_for(&registry, EntityKind::Category, menu.pastries.id, Some(menu.drinks.id));
    let latte = key_for(&registry, EntityKind::Product, menu.latte.id, Some(menu.coffee.id));
    let food = key_for(&registry, EntityKind::Label, menu.food.id, None);

    let report = ctx
        .bulk_dispatcher(registry)
        .handle_remove(&[pastries_under_drinks, latte, food], &RecordingObserver::default())
        .await;
    assert_eq!(report.succeeded, 3);

    let catalog = ctx.catalog();
    let drinks: Vec<i32> = catalog
        .list_label_categories(menu.drinks.id)
        .await
        .unwrap()
        .iter()
        .map(|c| c.id)
        .collect();
    assert!(!drinks.contains(&menu.pastries.id));
    assert!(catalog.list_label_categories(menu.food.id).await.unwrap_err().is_not_found());

    let coffee: Vec<i32> = catalog
        .list_category_products(menu.coffee.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(coffee, vec![menu.espresso.id]);

    // pastries is still a category, now rendered at the root
    let (tree, _) = ctx.load_menu().await.unwrap();
    assert!(tree
        .iter()
        .any(|n| n.kind == EntityKind::Category && n.entity_id == menu.pastries.id));

    assert_eq!(notifier.notifications()[0].title, "Removed 3 items");
}

#[tokio::test]
async fn bulk_detach_with_one_failure_is_partial() {
    let (ctx, notifier, menu) = context().await;
    let catalog = ctx.catalog();
    catalog
        .attach_products_to_category(menu.coffee.id, &[menu.green_tea.id], None)
        .await
        .unwrap();

    let detacher = RefusingDetacher {
        inner: ScopedDetacher::new(catalog.clone(), DetachScope::CategoryProducts),
        refused: menu.latte.id,
    };
    let handler = DetachHandler::new(
        Some(menu.coffee.id),
        EntityKind::Product,
        Arc::new(detacher),
        notifier.clone(),
    )
    .with_selection(vec![menu.espresso.id, menu.latte.id, menu.green_tea.id]);

    let report = handler.handle_remove(menu.espresso.id).await.unwrap();
    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);

    let remaining: Vec<i32> = catalog
        .list_category_products(menu.coffee.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(remaining, vec![menu.latte.id]);

    let notifications = notifier.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].title, "Detached with errors");
    assert_eq!(
        notifications[0].description.as_deref(),
        Some("2 succeeded, 1 failed.")
    );
}

#[tokio::test]
async fn single_detach_through_context() {
    let (ctx, notifier, menu) = context().await;

    let handler = ctx
        .detach_handler(Some(menu.drinks.id), EntityKind::Category)
        .unwrap();
    let report = handler.handle_remove(menu.tea.id).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(notifier.notifications()[0].title, "Category detached");

    let unbound = ctx.detach_handler(None, EntityKind::Category).unwrap();
    assert!(unbound.handle_remove(menu.coffee.id).await.is_none());

    assert!(ctx.detach_handler(Some(1), EntityKind::Label).is_err());
}

#[tokio::test]
async fn drop_reorders_and_persists_scope() {
    let (ctx, _, menu) = context().await;
    let scope = ReorderScope::CategoryProducts {
        category_id: menu.coffee.id,
    };

    let outcome = ctx
        .drop_in_scope(scope, menu.latte.id, menu.espresso.id)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        DropOutcome::Persisted(vec![menu.latte.id, menu.espresso.id])
    );

    let listed: Vec<i32> = ctx
        .catalog()
        .list_category_products(menu.coffee.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(listed, vec![menu.latte.id, menu.espresso.id]);

    let unchanged = ctx
        .drop_in_scope(ReorderScope::Labels, menu.food.id, menu.food.id)
        .await
        .unwrap();
    assert_eq!(unchanged, DropOutcome::Unchanged);
}

#[tokio::test]
async fn dropping_first_label_on_last_moves_it_to_the_end() {
    let (ctx, _, menu) = context().await;
    let third = menuforge_test_utils::fixtures::label(&ctx.catalog(), "Merch")
        .await
        .unwrap();

    ctx.drop_in_scope(ReorderScope::Labels, menu.drinks.id, third.id)
        .await
        .unwrap();

    let labels: Vec<i32> = ctx
        .catalog()
        .list_labels()
        .await
        .unwrap()
        .iter()
        .map(|l| l.id)
        .collect();
    assert_eq!(labels, vec![menu.food.id, third.id, menu.drinks.id]);
}

#[tokio::test]
async fn detach_from_row_outside_selection_leaves_selection_attached() {
    let (ctx, notifier, menu) = context().await;
    let catalog = ctx.catalog();
    catalog
        .attach_products_to_category(menu.coffee.id, &[menu.green_tea.id], None)
        .await
        .unwrap();

    let handler = ctx
        .detach_handler(Some(menu.coffee.id), EntityKind::Product)
        .unwrap()
        .with_selection(vec![menu.latte.id, menu.green_tea.id]);
    let report = handler.handle_remove(menu.espresso.id).await.unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 0);

    let remaining: Vec<i32> = catalog
        .list_category_products(menu.coffee.id)
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(remaining, vec![menu.latte.id, menu.green_tea.id]);
    assert_eq!(notifier.notifications()[0].title, "Product detached");
}

#[tokio::test]
async fn bulk_remove_counts_vanished_relation_as_failure() {
    let (ctx, notifier, menu) = context().await;
    let (_, registry) = ctx.load_menu().await.unwrap();
    let latte = key_for(&registry, EntityKind::Product, menu.latte.id, Some(menu.coffee.id));
    let espresso = key_for(&registry, EntityKind::Product, menu.espresso.id, Some(menu.coffee.id));

    // latte is detached after the registry snapshot was taken
    ctx.catalog()
        .detach_product_from_category(menu.coffee.id, menu.latte.id)
        .await
        .unwrap();

    let dispatcher = ctx.bulk_dispatcher(registry);
    let report = dispatcher
        .handle_remove(&[latte.clone(), espresso], &RecordingObserver::default())
        .await;
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed, 1);

    let only_stale = dispatcher
        .handle_remove(&[latte], &RecordingObserver::default())
        .await;
    assert_eq!(only_stale.succeeded, 0);
    assert_eq!(only_stale.failed, 1);

    let titles: Vec<String> = notifier
        .notifications()
        .into_iter()
        .map(|n| n.title)
        .collect();
    assert_eq!(titles, vec!["Removed with errors", "Failed to remove 1 item"]);
}
