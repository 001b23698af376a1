use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::entities::{
    categories, category_products, label_categories, labels, products,
};
use crate::errors::{CatalogError, CatalogResult};
use crate::menu::tree::{scope_ordering, MenuSnapshot};
use crate::services::validation::{copy_name, copy_slug, CatalogValidator};

/// Sort applied to the category listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderMode {
    #[default]
    NameAsc,
    NewestFirst,
}

impl OrderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::NameAsc => "name-asc",
            OrderMode::NewestFirst => "newest-first",
        }
    }
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderMode {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name-asc" | "name" => Ok(OrderMode::NameAsc),
            "newest-first" | "newest" => Ok(OrderMode::NewestFirst),
            other => Err(CatalogError::validation(format!(
                "unknown order mode '{other}' (expected name-asc or newest-first)"
            ))),
        }
    }
}

/// A label attached to a category, with its order inside that label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedLabel {
    pub label: labels::Model,
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithLabels {
    pub category: categories::Model,
    pub labels: Vec<AttachedLabel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryListing {
    pub categories: Vec<CategoryWithLabels>,
    pub labels: Vec<labels::Model>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateLabelRequest {
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub slug: String,
    pub label_ids: Vec<i32>,
}

/// Partial update. `label_ids: Some(..)` replaces every attachment, even
/// with an empty list; `None` leaves attachments alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCategoryRequest {
    pub id: i32,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub label_ids: Option<Vec<i32>>,
    pub is_visible: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub slug: String,
}

/// Order-preserving store for labels, categories, products and the two
/// junction tables between them.
#[derive(Clone)]
pub struct CatalogService {
    db: DatabaseConnection,
}

impl CatalogService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Categories with their attached labels, plus the flat label list.
    pub async fn list_categories_and_labels(
        &self,
        order_mode: OrderMode,
    ) -> CatalogResult<CategoryListing> {
        let query = categories::Entity::find();
        let query = match order_mode {
            OrderMode::NameAsc => query
                .order_by_asc(categories::Column::Name)
                .order_by_desc(categories::Column::Id),
            OrderMode::NewestFirst => query
                .order_by_desc(categories::Column::CreatedAt)
                .order_by_desc(categories::Column::SortOrder)
                .order_by_desc(categories::Column::Id),
        };
        let category_rows = query.all(&self.db).await?;

        let mut label_rows = labels::Entity::find().all(&self.db).await?;
        label_rows.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));

        let links = label_categories::Entity::find().all(&self.db).await?;
        let labels_by_id: HashMap<i32, &labels::Model> =
            label_rows.iter().map(|l| (l.id, l)).collect();

        let mut attached: HashMap<i32, Vec<AttachedLabel>> = HashMap::new();
        for link in &links {
            if let Some(label) = labels_by_id.get(&link.label_id) {
                attached
                    .entry(link.category_id)
                    .or_default()
                    .push(AttachedLabel {
                        label: (*label).clone(),
                        order: link.sort_order,
                    });
            }
        }
        for attached_labels in attached.values_mut() {
            attached_labels.sort_by(|a, b| {
                scope_ordering(
                    (a.label.sort_order, a.label.id),
                    (b.label.sort_order, b.label.id),
                )
            });
        }

        let categories = category_rows
            .into_iter()
            .map(|category| CategoryWithLabels {
                labels: attached.remove(&category.id).unwrap_or_default(),
                category,
            })
            .collect();

        Ok(CategoryListing {
            categories,
            labels: label_rows,
        })
    }

    pub async fn list_labels(&self) -> CatalogResult<Vec<labels::Model>> {
        let mut rows = labels::Entity::find().all(&self.db).await?;
        rows.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));
        Ok(rows)
    }

    pub async fn list_categories(&self) -> CatalogResult<Vec<categories::Model>> {
        let mut rows = categories::Entity::find().all(&self.db).await?;
        rows.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));
        Ok(rows)
    }

    pub async fn create_label(&self, input: CreateLabelRequest) -> CatalogResult<labels::Model> {
        let name = CatalogValidator::validate_name("Name", &input.name)?;
        let icon = input
            .icon
            .map(|icon| icon.trim().to_string())
            .filter(|icon| !icon.is_empty());

        let txn = self.db.begin().await?;
        let order = next_label_order(&txn).await?;
        let label = labels::ActiveModel {
            name: Set(name),
            icon: Set(icon),
            sort_order: Set(order),
            is_visible: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!("Created label {} ({}) at order {}", label.name, label.id, order);
        Ok(label)
    }

    /// Create a category at the end of the global order and attach it to
    /// `label_ids`, each link ordered by its position in the input.
    pub async fn create_category_with_labels(
        &self,
        input: CreateCategoryRequest,
    ) -> CatalogResult<categories::Model> {
        let name = CatalogValidator::validate_name("Name", &input.name)?;
        let slug = CatalogValidator::validate_slug(&input.slug)?;
        CatalogValidator::validate_unique_ids(&input.label_ids)?;

        let txn = self.db.begin().await?;

        if category_slug_taken(&txn, &slug, None).await? {
            return Err(CatalogError::slug_conflict(slug));
        }
        ensure_labels(&txn, &input.label_ids).await?;

        let order = next_category_order(&txn).await?;
        let category = categories::ActiveModel {
            name: Set(name),
            slug: Set(slug.clone()),
            sort_order: Set(order),
            is_visible: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CatalogError::from_db("Slug", &slug, e))?;

        insert_category_labels(&txn, category.id, &input.label_ids).await?;
        txn.commit().await?;

        info!(
            "Created category {} ({}) attached to {} labels",
            category.slug,
            category.id,
            input.label_ids.len()
        );
        Ok(category)
    }

    pub async fn update_category_with_labels(
        &self,
        input: UpdateCategoryRequest,
    ) -> CatalogResult<categories::Model> {
        let name = input
            .name
            .as_deref()
            .map(|name| CatalogValidator::validate_name("Name", name))
            .transpose()?;
        let slug = input
            .slug
            .as_deref()
            .map(CatalogValidator::validate_slug)
            .transpose()?;
        if let Some(label_ids) = &input.label_ids {
            CatalogValidator::validate_unique_ids(label_ids)?;
        }

        let txn = self.db.begin().await?;

        let existing = categories::Entity::find_by_id(input.id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category", input.id))?;

        let mut active: categories::ActiveModel = existing.clone().into();
        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(slug) = &slug {
            if *slug != existing.slug && category_slug_taken(&txn, slug, Some(input.id)).await? {
                return Err(CatalogError::slug_conflict(slug.clone()));
            }
            active.slug = Set(slug.clone());
        }
        if let Some(is_visible) = input.is_visible {
            active.is_visible = Set(is_visible);
        }

        let updated = if active.is_changed() {
            active.update(&txn).await.map_err(|e| {
                CatalogError::from_db("Slug", slug.as_deref().unwrap_or(&existing.slug), e)
            })?
        } else {
            existing
        };

        if let Some(label_ids) = &input.label_ids {
            ensure_labels(&txn, label_ids).await?;
            let removed = label_categories::Entity::delete_many()
                .filter(label_categories::Column::CategoryId.eq(input.id))
                .exec(&txn)
                .await?;
            insert_category_labels(&txn, input.id, label_ids).await?;
            debug!(
                "Replaced {} label links of category {} with {}",
                removed.rows_affected,
                input.id,
                label_ids.len()
            );
        }

        txn.commit().await?;

        info!("Updated category {} ({})", updated.slug, updated.id);
        Ok(updated)
    }

    /// Delete a category along with every relation row that references it.
    pub async fn delete_category_with_relations(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        if categories::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("Category", id));
        }

        label_categories::Entity::delete_many()
            .filter(label_categories::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        category_products::Entity::delete_many()
            .filter(category_products::Column::CategoryId.eq(id))
            .exec(&txn)
            .await?;
        categories::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!("Deleted category {} with its relations", id);
        Ok(())
    }

    pub async fn delete_label_with_relations(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        if labels::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("Label", id));
        }

        label_categories::Entity::delete_many()
            .filter(label_categories::Column::LabelId.eq(id))
            .exec(&txn)
            .await?;
        labels::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!("Deleted label {} with its relations", id);
        Ok(())
    }

    pub async fn delete_product_with_relations(&self, id: i32) -> CatalogResult<()> {
        let txn = self.db.begin().await?;

        if products::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(CatalogError::not_found("Product", id));
        }

        category_products::Entity::delete_many()
            .filter(category_products::Column::ProductId.eq(id))
            .exec(&txn)
            .await?;
        products::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!("Deleted product {} with its relations", id);
        Ok(())
    }

    pub async fn create_product(
        &self,
        input: CreateProductRequest,
    ) -> CatalogResult<products::Model> {
        let name = CatalogValidator::validate_name("Name", &input.name)?;
        let slug = CatalogValidator::validate_slug(&input.slug)?;

        let txn = self.db.begin().await?;
        if product_slug_taken(&txn, &slug).await? {
            return Err(CatalogError::slug_conflict(slug));
        }
        let product = products::ActiveModel {
            name: Set(name),
            slug: Set(slug.clone()),
            is_disabled: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CatalogError::from_db("Slug", &slug, e))?;
        txn.commit().await?;

        info!("Created product {} ({})", product.slug, product.id);
        Ok(product)
    }

    /// Attach categories to a label. Without `position` they are appended
    /// after the current last link; with one the scope is re-read, the new
    /// ids are inserted there and every link is reindexed. Categories already
    /// attached are skipped. Returns the number of new links.
    pub async fn attach_categories_to_label(
        &self,
        label_id: i32,
        category_ids: &[i32],
        position: Option<usize>,
    ) -> CatalogResult<usize> {
        CatalogValidator::validate_unique_ids(category_ids)?;

        let txn = self.db.begin().await?;
        ensure_label(&txn, label_id).await?;
        ensure_categories(&txn, category_ids).await?;

        let links = label_links(&txn, label_id).await?;
        let current: Vec<i32> = links.iter().map(|l| l.category_id).collect();
        let added = new_children(&current, category_ids);

        if !added.is_empty() {
            match position {
                Some(position) => {
                    let ordered = insert_children(&current, &added, position);
                    write_label_links(&txn, label_id, &links, &ordered).await?;
                }
                None => {
                    let mut order = next_scope_order(links.iter().map(|l| l.sort_order));
                    for category_id in &added {
                        insert_label_link(&txn, label_id, *category_id, order).await?;
                        order += 1;
                    }
                }
            }
        }

        txn.commit().await?;
        info!("Attached {} categories to label {}", added.len(), label_id);
        Ok(added.len())
    }

    pub async fn attach_products_to_category(
        &self,
        category_id: i32,
        product_ids: &[i32],
        position: Option<usize>,
    ) -> CatalogResult<usize> {
        CatalogValidator::validate_unique_ids(product_ids)?;

        let txn = self.db.begin().await?;
        ensure_category(&txn, category_id).await?;
        ensure_products(&txn, product_ids).await?;

        let links = product_links(&txn, category_id).await?;
        let current: Vec<i32> = links.iter().map(|l| l.product_id).collect();
        let added = new_children(&current, product_ids);

        if !added.is_empty() {
            match position {
                Some(position) => {
                    let ordered = insert_children(&current, &added, position);
                    write_product_links(&txn, category_id, &links, &ordered).await?;
                }
                None => {
                    let mut order = next_scope_order(links.iter().map(|l| l.sort_order));
                    for product_id in &added {
                        insert_product_link(&txn, category_id, *product_id, order).await?;
                        order += 1;
                    }
                }
            }
        }

        txn.commit().await?;
        info!("Attached {} products to category {}", added.len(), category_id);
        Ok(added.len())
    }

    /// Returns `false` when the category was not attached.
    pub async fn detach_category_from_label(
        &self,
        label_id: i32,
        category_id: i32,
    ) -> CatalogResult<bool> {
        let result = label_categories::Entity::delete_many()
            .filter(label_categories::Column::LabelId.eq(label_id))
            .filter(label_categories::Column::CategoryId.eq(category_id))
            .exec(&self.db)
            .await?;
        let detached = result.rows_affected > 0;
        if detached {
            info!("Detached category {} from label {}", category_id, label_id);
        }
        Ok(detached)
    }

    /// Returns `false` when the product was not attached.
    pub async fn detach_product_from_category(
        &self,
        category_id: i32,
        product_id: i32,
    ) -> CatalogResult<bool> {
        let result = category_products::Entity::delete_many()
            .filter(category_products::Column::CategoryId.eq(category_id))
            .filter(category_products::Column::ProductId.eq(product_id))
            .exec(&self.db)
            .await?;
        let detached = result.rows_affected > 0;
        if detached {
            info!("Detached product {} from category {}", product_id, category_id);
        }
        Ok(detached)
    }

    pub async fn reorder_labels(&self, ids: &[i32]) -> CatalogResult<Vec<i32>> {
        let txn = self.db.begin().await?;

        let mut rows = labels::Entity::find().all(&txn).await?;
        rows.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));
        let current: Vec<i32> = rows.iter().map(|l| l.id).collect();
        let ordered = merge_order("Label", &current, ids)?;

        for (index, id) in ordered.iter().enumerate() {
            let order = index as i32;
            if rows.iter().any(|l| l.id == *id && l.sort_order != order) {
                labels::ActiveModel {
                    id: Set(*id),
                    sort_order: Set(order),
                    ..Default::default()
                }
                .update(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        info!("Reordered {} labels", ordered.len());
        Ok(ordered)
    }

    pub async fn reorder_categories(&self, ids: &[i32]) -> CatalogResult<Vec<i32>> {
        let txn = self.db.begin().await?;

        let mut rows = categories::Entity::find().all(&txn).await?;
        rows.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));
        let current: Vec<i32> = rows.iter().map(|c| c.id).collect();
        let ordered = merge_order("Category", &current, ids)?;

        for (index, id) in ordered.iter().enumerate() {
            let order = index as i32;
            if rows.iter().any(|c| c.id == *id && c.sort_order != order) {
                categories::ActiveModel {
                    id: Set(*id),
                    sort_order: Set(order),
                    ..Default::default()
                }
                .update(&txn)
                .await?;
            }
        }

        txn.commit().await?;
        info!("Reordered {} categories", ordered.len());
        Ok(ordered)
    }

    /// Reindex the categories of one label: `order = index`.
    pub async fn reorder_label_categories(
        &self,
        label_id: i32,
        category_ids: &[i32],
    ) -> CatalogResult<Vec<i32>> {
        let txn = self.db.begin().await?;
        ensure_label(&txn, label_id).await?;

        let links = label_links(&txn, label_id).await?;
        let current: Vec<i32> = links.iter().map(|l| l.category_id).collect();
        let ordered = merge_order("Category", &current, category_ids)?;
        write_label_links(&txn, label_id, &links, &ordered).await?;

        txn.commit().await?;
        info!("Reordered {} categories in label {}", ordered.len(), label_id);
        Ok(ordered)
    }

    /// Reindex the products of one category: `order = index`.
    pub async fn reorder_category_products(
        &self,
        category_id: i32,
        product_ids: &[i32],
    ) -> CatalogResult<Vec<i32>> {
        let txn = self.db.begin().await?;
        ensure_category(&txn, category_id).await?;

        let links = product_links(&txn, category_id).await?;
        let current: Vec<i32> = links.iter().map(|l| l.product_id).collect();
        let ordered = merge_order("Product", &current, product_ids)?;
        write_product_links(&txn, category_id, &links, &ordered).await?;

        txn.commit().await?;
        info!(
            "Reordered {} products in category {}",
            ordered.len(),
            category_id
        );
        Ok(ordered)
    }

    /// Categories of one label in display order.
    pub async fn list_label_categories(
        &self,
        label_id: i32,
    ) -> CatalogResult<Vec<categories::Model>> {
        ensure_label(&self.db, label_id).await?;
        let links = label_links(&self.db, label_id).await?;
        let ids: Vec<i32> = links.iter().map(|l| l.category_id).collect();
        let mut by_id: HashMap<i32, categories::Model> = categories::Entity::find()
            .filter(categories::Column::Id.is_in(ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Products of one category in display order.
    pub async fn list_category_products(
        &self,
        category_id: i32,
    ) -> CatalogResult<Vec<products::Model>> {
        ensure_category(&self.db, category_id).await?;
        let links = product_links(&self.db, category_id).await?;
        let ids: Vec<i32> = links.iter().map(|l| l.product_id).collect();
        let mut by_id: HashMap<i32, products::Model> = products::Entity::find()
            .filter(products::Column::Id.is_in(ids.clone()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Duplicate a label with its category links, placed after the last
    /// label.
    pub async fn clone_label(&self, id: i32) -> CatalogResult<labels::Model> {
        let txn = self.db.begin().await?;
        let source = ensure_label(&txn, id).await?;

        let order = next_label_order(&txn).await?;
        let clone = labels::ActiveModel {
            name: Set(copy_name(&source.name)),
            icon: Set(source.icon.clone()),
            sort_order: Set(order),
            is_visible: Set(source.is_visible),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for link in label_links(&txn, id).await? {
            insert_label_link(&txn, clone.id, link.category_id, link.sort_order).await?;
        }

        txn.commit().await?;
        info!("Cloned label {} as {}", id, clone.id);
        Ok(clone)
    }

    /// Duplicate a category with its product links and attach the copy at
    /// the end of `label_id`.
    pub async fn clone_category(
        &self,
        id: i32,
        label_id: i32,
    ) -> CatalogResult<categories::Model> {
        let txn = self.db.begin().await?;
        let source = ensure_category(&txn, id).await?;
        ensure_label(&txn, label_id).await?;

        let slug = unique_category_slug(&txn, &source.slug).await?;
        let order = next_category_order(&txn).await?;
        let clone = categories::ActiveModel {
            name: Set(copy_name(&source.name)),
            slug: Set(slug.clone()),
            sort_order: Set(order),
            is_visible: Set(source.is_visible),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CatalogError::from_db("Slug", &slug, e))?;

        for link in product_links(&txn, id).await? {
            insert_product_link(&txn, clone.id, link.product_id, link.sort_order).await?;
        }

        let links = label_links(&txn, label_id).await?;
        let scope_order = next_scope_order(links.iter().map(|l| l.sort_order));
        insert_label_link(&txn, label_id, clone.id, scope_order).await?;

        txn.commit().await?;
        info!(
            "Cloned category {} as {} ({}) under label {}",
            id, clone.id, clone.slug, label_id
        );
        Ok(clone)
    }

    /// Duplicate a product and attach the copy at the end of `category_id`.
    pub async fn clone_product(
        &self,
        id: i32,
        category_id: i32,
    ) -> CatalogResult<products::Model> {
        let txn = self.db.begin().await?;
        let source = products::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", id))?;
        ensure_category(&txn, category_id).await?;

        let slug = unique_product_slug(&txn, &source.slug).await?;
        let clone = products::ActiveModel {
            name: Set(copy_name(&source.name)),
            slug: Set(slug.clone()),
            is_disabled: Set(source.is_disabled),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| CatalogError::from_db("Slug", &slug, e))?;

        let links = product_links(&txn, category_id).await?;
        let scope_order = next_scope_order(links.iter().map(|l| l.sort_order));
        insert_product_link(&txn, category_id, clone.id, scope_order).await?;

        txn.commit().await?;
        info!(
            "Cloned product {} as {} ({}) under category {}",
            id, clone.id, clone.slug, category_id
        );
        Ok(clone)
    }

    pub async fn set_label_visibility(
        &self,
        id: i32,
        is_visible: bool,
    ) -> CatalogResult<labels::Model> {
        let label = ensure_label(&self.db, id).await?;
        let mut active: labels::ActiveModel = label.into();
        active.is_visible = Set(is_visible);
        let label = active.update(&self.db).await?;
        info!("Label {} visibility set to {}", id, is_visible);
        Ok(label)
    }

    pub async fn set_product_disabled(
        &self,
        id: i32,
        is_disabled: bool,
    ) -> CatalogResult<products::Model> {
        let product = products::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product", id))?;
        let mut active: products::ActiveModel = product.into();
        active.is_disabled = Set(is_disabled);
        let product = active.update(&self.db).await?;
        info!("Product {} disabled set to {}", id, is_disabled);
        Ok(product)
    }

    /// Read everything the menu tree is built from in one transaction.
    pub async fn load_menu_snapshot(&self) -> CatalogResult<MenuSnapshot> {
        let txn = self.db.begin().await?;
        let snapshot = MenuSnapshot {
            labels: labels::Entity::find().all(&txn).await?,
            categories: categories::Entity::find().all(&txn).await?,
            products: products::Entity::find().all(&txn).await?,
            label_categories: label_categories::Entity::find().all(&txn).await?,
            category_products: category_products::Entity::find().all(&txn).await?,
        };
        txn.commit().await?;
        debug!(
            "Loaded menu snapshot: {} labels, {} categories, {} products",
            snapshot.labels.len(),
            snapshot.categories.len(),
            snapshot.products.len()
        );
        Ok(snapshot)
    }
}

/// `max + 1` over a scope's orders, or 0 for an empty scope.
fn next_scope_order(orders: impl Iterator<Item = i32>) -> i32 {
    orders.max().map_or(0, |max| max + 1)
}

/// Requested ids first, then anything in scope the caller left out, in its
/// current order.
fn merge_order(entity: &str, current: &[i32], requested: &[i32]) -> CatalogResult<Vec<i32>> {
    CatalogValidator::validate_unique_ids(requested)?;
    if let Some(stray) = requested.iter().find(|id| !current.contains(id)) {
        return Err(CatalogError::validation(format!(
            "{entity} {stray} is not in this list"
        )));
    }
    let mut ordered = requested.to_vec();
    ordered.extend(current.iter().filter(|id| !requested.contains(id)));
    Ok(ordered)
}

fn new_children(current: &[i32], requested: &[i32]) -> Vec<i32> {
    requested
        .iter()
        .filter(|id| !current.contains(id))
        .copied()
        .collect()
}

fn insert_children(current: &[i32], added: &[i32], position: usize) -> Vec<i32> {
    let at = position.min(current.len());
    let mut ordered = Vec::with_capacity(current.len() + added.len());
    ordered.extend_from_slice(&current[..at]);
    ordered.extend_from_slice(added);
    ordered.extend_from_slice(&current[at..]);
    ordered
}

async fn next_label_order<C: ConnectionTrait>(conn: &C) -> Result<i32, DbErr> {
    let last = labels::Entity::find()
        .order_by_desc(labels::Column::SortOrder)
        .one(conn)
        .await?;
    Ok(next_scope_order(last.map(|l| l.sort_order).into_iter()))
}

async fn next_category_order<C: ConnectionTrait>(conn: &C) -> Result<i32, DbErr> {
    let last = categories::Entity::find()
        .order_by_desc(categories::Column::SortOrder)
        .one(conn)
        .await?;
    Ok(next_scope_order(last.map(|c| c.sort_order).into_iter()))
}

async fn category_slug_taken<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    except_id: Option<i32>,
) -> Result<bool, DbErr> {
    let mut query = categories::Entity::find().filter(categories::Column::Slug.eq(slug));
    if let Some(id) = except_id {
        query = query.filter(categories::Column::Id.ne(id));
    }
    Ok(query.one(conn).await?.is_some())
}

async fn product_slug_taken<C: ConnectionTrait>(conn: &C, slug: &str) -> Result<bool, DbErr> {
    Ok(products::Entity::find()
        .filter(products::Column::Slug.eq(slug))
        .one(conn)
        .await?
        .is_some())
}

async fn unique_category_slug<C: ConnectionTrait>(conn: &C, base: &str) -> Result<String, DbErr> {
    let mut attempt = 1;
    loop {
        let candidate = copy_slug(base, attempt);
        if !category_slug_taken(conn, &candidate, None).await? {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

async fn unique_product_slug<C: ConnectionTrait>(conn: &C, base: &str) -> Result<String, DbErr> {
    let mut attempt = 1;
    loop {
        let candidate = copy_slug(base, attempt);
        if !product_slug_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

async fn ensure_label<C: ConnectionTrait>(conn: &C, id: i32) -> CatalogResult<labels::Model> {
    labels::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CatalogError::not_found("Label", id))
}

async fn ensure_category<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CatalogResult<categories::Model> {
    categories::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CatalogError::not_found("Category", id))
}

async fn ensure_labels<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> CatalogResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: HashSet<i32> = labels::Entity::find()
        .filter(labels::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(CatalogError::not_found("Label", *missing)),
        None => Ok(()),
    }
}

async fn ensure_categories<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> CatalogResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: HashSet<i32> = categories::Entity::find()
        .filter(categories::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(CatalogError::not_found("Category", *missing)),
        None => Ok(()),
    }
}

async fn ensure_products<C: ConnectionTrait>(conn: &C, ids: &[i32]) -> CatalogResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found: HashSet<i32> = products::Entity::find()
        .filter(products::Column::Id.is_in(ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    match ids.iter().find(|id| !found.contains(id)) {
        Some(missing) => Err(CatalogError::not_found("Product", *missing)),
        None => Ok(()),
    }
}

async fn label_links<C: ConnectionTrait>(
    conn: &C,
    label_id: i32,
) -> Result<Vec<label_categories::Model>, DbErr> {
    let mut links = label_categories::Entity::find()
        .filter(label_categories::Column::LabelId.eq(label_id))
        .all(conn)
        .await?;
    links.sort_by(|a, b| {
        scope_ordering((a.sort_order, a.category_id), (b.sort_order, b.category_id))
    });
    Ok(links)
}

async fn product_links<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
) -> Result<Vec<category_products::Model>, DbErr> {
    let mut links = category_products::Entity::find()
        .filter(category_products::Column::CategoryId.eq(category_id))
        .all(conn)
        .await?;
    links.sort_by(|a, b| {
        scope_ordering((a.sort_order, a.product_id), (b.sort_order, b.product_id))
    });
    Ok(links)
}

async fn insert_label_link<C: ConnectionTrait>(
    conn: &C,
    label_id: i32,
    category_id: i32,
    sort_order: i32,
) -> Result<label_categories::Model, DbErr> {
    label_categories::ActiveModel {
        label_id: Set(label_id),
        category_id: Set(category_id),
        sort_order: Set(sort_order),
        ..Default::default()
    }
    .insert(conn)
    .await
}

async fn insert_product_link<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    product_id: i32,
    sort_order: i32,
) -> Result<category_products::Model, DbErr> {
    category_products::ActiveModel {
        category_id: Set(category_id),
        product_id: Set(product_id),
        sort_order: Set(sort_order),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// One link per category of the input, ordered by input position.
async fn insert_category_labels<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    label_ids: &[i32],
) -> Result<(), DbErr> {
    for (position, label_id) in label_ids.iter().enumerate() {
        insert_label_link(conn, *label_id, category_id, position as i32).await?;
    }
    Ok(())
}

/// Rewrite a label's links so `order = index` of `ordered`, inserting links
/// for ids not yet attached.
async fn write_label_links<C: ConnectionTrait>(
    conn: &C,
    label_id: i32,
    existing: &[label_categories::Model],
    ordered: &[i32],
) -> Result<(), DbErr> {
    for (index, category_id) in ordered.iter().enumerate() {
        let order = index as i32;
        match existing.iter().find(|l| l.category_id == *category_id) {
            Some(link) if link.sort_order == order => {}
            Some(link) => {
                label_categories::ActiveModel {
                    id: Set(link.id),
                    sort_order: Set(order),
                    ..Default::default()
                }
                .update(conn)
                .await?;
            }
            None => {
                insert_label_link(conn, label_id, *category_id, order).await?;
            }
        }
    }
    Ok(())
}

async fn write_product_links<C: ConnectionTrait>(
    conn: &C,
    category_id: i32,
    existing: &[category_products::Model],
    ordered: &[i32],
) -> Result<(), DbErr> {
    for (index, product_id) in ordered.iter().enumerate() {
        let order = index as i32;
        match existing.iter().find(|l| l.product_id == *product_id) {
            Some(link) if link.sort_order == order => {}
            Some(link) => {
                category_products::ActiveModel {
                    id: Set(link.id),
                    sort_order: Set(order),
                    ..Default::default()
                }
                .update(conn)
                .await?;
            }
            None => {
                insert_product_link(conn, category_id, *product_id, order).await?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::{
        create_test_category, create_test_label, setup_test_catalog,
    };

    #[test]
    fn order_mode_parses_cli_spellings() {
        assert_eq!("name-asc".parse::<OrderMode>().unwrap(), OrderMode::NameAsc);
        assert_eq!(
            "Newest-First".parse::<OrderMode>().unwrap(),
            OrderMode::NewestFirst
        );
        assert!("oldest".parse::<OrderMode>().is_err());
        assert_eq!(OrderMode::NewestFirst.to_string(), "newest-first");
    }

    #[test]
    fn next_order_starts_at_zero() {
        assert_eq!(next_scope_order(std::iter::empty()), 0);
        assert_eq!(next_scope_order([0, 4, 2].into_iter()), 5);
    }

    #[test]
    fn merge_order_appends_omitted_ids() {
        assert_eq!(merge_order("Label", &[1, 2, 3], &[3, 1]).unwrap(), vec![3, 1, 2]);
        assert!(merge_order("Label", &[1, 2, 3], &[4]).is_err());
        assert!(merge_order("Label", &[1, 2, 3], &[1, 1]).is_err());
    }

    #[test]
    fn insert_children_clamps_position() {
        assert_eq!(insert_children(&[1, 2, 3], &[9], 1), vec![1, 9, 2, 3]);
        assert_eq!(insert_children(&[1, 2], &[9, 8], 10), vec![1, 2, 9, 8]);
        assert_eq!(insert_children(&[], &[9], 0), vec![9]);
    }

    #[test]
    fn new_children_skips_attached() {
        assert_eq!(new_children(&[1, 2], &[2, 3, 4]), vec![3, 4]);
    }

    #[tokio::test]
    async fn global_order_appends_after_max() {
        let catalog = setup_test_catalog().await;
        let first = create_test_label(&catalog, "Drinks").await;
        let second = create_test_label(&catalog, "Food").await;

        let labels = catalog.list_labels().await.unwrap();
        let orders: Vec<(i32, i32)> = labels.iter().map(|l| (l.id, l.sort_order)).collect();
        assert_eq!(orders, vec![(first, 0), (second, 1)]);
    }

    #[tokio::test]
    async fn duplicate_slug_is_a_conflict() {
        let catalog = setup_test_catalog().await;
        create_test_category(&catalog, "coffee", &[]).await;

        let err = catalog
            .create_category_with_labels(CreateCategoryRequest {
                name: "Coffee again".to_string(),
                slug: " coffee ".to_string(),
                label_ids: vec![],
            })
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Slug 'coffee' already exists");
    }

    #[tokio::test]
    async fn unknown_label_aborts_create() {
        let catalog = setup_test_catalog().await;
        let err = catalog
            .create_category_with_labels(CreateCategoryRequest {
                name: "Tea".to_string(),
                slug: "tea".to_string(),
                label_ids: vec![42],
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(catalog.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clone_slugs_stay_unique() {
        let catalog = setup_test_catalog().await;
        let label = create_test_label(&catalog, "Drinks").await;
        let coffee = create_test_category(&catalog, "coffee", &[label]).await;

        let first = catalog.clone_category(coffee, label).await.unwrap();
        let second = catalog.clone_category(coffee, label).await.unwrap();
        assert_eq!(first.slug, "coffee-copy");
        assert_eq!(second.slug, "coffee-copy-2");
        assert_eq!(first.name, "coffee (copy)");

        let ids: Vec<i32> = catalog
            .list_label_categories(label)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![coffee, first.id, second.id]);
    }
}
