use chrono::Utc;
use sea_orm::prelude::*;
use sea_orm::{ActiveModelTrait, Database, Set};
use sea_orm_migration::MigratorTrait;

use menuforge::database::entities::{categories, label_categories, labels};
use menuforge::database::migrations::Migrator;
use menuforge::errors::{CatalogError, DbErrorKind};

async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

async fn insert_label(db: &DatabaseConnection, name: &str) -> labels::Model {
    labels::ActiveModel {
        name: Set(name.into()),
        icon: Set(None),
        sort_order: Set(0),
        is_visible: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .unwrap()
}

async fn insert_category(
    db: &DatabaseConnection,
    slug: &str,
) -> Result<categories::Model, DbErr> {
    categories::ActiveModel {
        name: Set(slug.into()),
        slug: Set(slug.into()),
        sort_order: Set(0),
        is_visible: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

#[tokio::test]
async fn all_migrations_apply() {
    let db = setup_db().await;
    let pending = Migrator::get_pending_migrations(&db).await.unwrap();
    assert!(pending.is_empty());
    assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn migrations_roll_back_cleanly() {
    let db = setup_db().await;
    Migrator::down(&db, None).await.unwrap();
    assert_eq!(Migrator::get_pending_migrations(&db).await.unwrap().len(), 2);
    Migrator::up(&db, None).await.unwrap();
    insert_category(&db, "coffee").await.unwrap();
}

#[tokio::test]
async fn slug_index_rejects_duplicates() {
    let db = setup_db().await;
    insert_category(&db, "coffee").await.unwrap();

    let err = insert_category(&db, "coffee").await.unwrap_err();
    assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);
    assert!(CatalogError::from_db("Slug", "coffee", err).is_conflict());
}

#[tokio::test]
async fn relation_pairs_are_unique() {
    let db = setup_db().await;
    let label = insert_label(&db, "Drinks").await;
    let category = insert_category(&db, "coffee").await.unwrap();

    let link = || label_categories::ActiveModel {
        label_id: Set(label.id),
        category_id: Set(category.id),
        sort_order: Set(0),
        ..Default::default()
    };
    link().insert(&db).await.unwrap();
    let err = link().insert(&db).await.unwrap_err();
    assert_eq!(DbErrorKind::from_db_err(&err), DbErrorKind::UniqueViolation);
}
