#[cfg(test)]
use sea_orm::DatabaseConnection;

#[cfg(test)]
use crate::services::{CatalogService, CreateCategoryRequest, CreateLabelRequest};

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    super::connection::connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to set up test database")
}

#[cfg(test)]
pub async fn setup_test_catalog() -> CatalogService {
    CatalogService::new(setup_test_db().await)
}

#[cfg(test)]
pub async fn create_test_label(catalog: &CatalogService, name: &str) -> i32 {
    catalog
        .create_label(CreateLabelRequest {
            name: name.to_string(),
            icon: None,
        })
        .await
        .expect("Failed to create label")
        .id
}

#[cfg(test)]
pub async fn create_test_category(catalog: &CatalogService, slug: &str, label_ids: &[i32]) -> i32 {
    catalog
        .create_category_with_labels(CreateCategoryRequest {
            name: slug.to_string(),
            slug: slug.to_string(),
            label_ids: label_ids.to_vec(),
        })
        .await
        .expect("Failed to create category")
        .id
}
