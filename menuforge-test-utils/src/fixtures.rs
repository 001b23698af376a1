use menuforge::database::entities::{categories, labels, products};
use menuforge::errors::CatalogResult;
use menuforge::services::{
    CatalogService, CreateCategoryRequest, CreateLabelRequest, CreateProductRequest,
};

/// A small café menu.
///
/// ```text
/// Drinks ── Coffee ── Espresso, Latte
///        ├─ Tea ───── Green Tea
///        └─ Pastries ─ Croissant
/// Food ──── Pastries ─ Croissant
/// ```
pub struct MenuFixture {
    pub drinks: labels::Model,
    pub food: labels::Model,
    pub coffee: categories::Model,
    pub tea: categories::Model,
    pub pastries: categories::Model,
    pub espresso: products::Model,
    pub latte: products::Model,
    pub green_tea: products::Model,
    pub croissant: products::Model,
}

pub async fn label(catalog: &CatalogService, name: &str) -> CatalogResult<labels::Model> {
    catalog
        .create_label(CreateLabelRequest {
            name: name.to_string(),
            icon: None,
        })
        .await
}

pub async fn category(
    catalog: &CatalogService,
    name: &str,
    slug: &str,
    label_ids: &[i32],
) -> CatalogResult<categories::Model> {
    catalog
        .create_category_with_labels(CreateCategoryRequest {
            name: name.to_string(),
            slug: slug.to_string(),
            label_ids: label_ids.to_vec(),
        })
        .await
}

pub async fn product(
    catalog: &CatalogService,
    name: &str,
    slug: &str,
    category_id: i32,
) -> CatalogResult<products::Model> {
    let product = catalog
        .create_product(CreateProductRequest {
            name: name.to_string(),
            slug: slug.to_string(),
        })
        .await?;
    catalog
        .attach_products_to_category(category_id, &[product.id], None)
        .await?;
    Ok(product)
}

pub async fn seed_menu(catalog: &CatalogService) -> CatalogResult<MenuFixture> {
    let drinks = label(catalog, "Drinks").await?;
    let food = label(catalog, "Food").await?;

    let coffee = category(catalog, "Coffee", "coffee", &[drinks.id]).await?;
    let tea = category(catalog, "Tea", "tea", &[drinks.id]).await?;
    let pastries = category(catalog, "Pastries", "pastries", &[food.id]).await?;
    catalog
        .attach_categories_to_label(drinks.id, &[pastries.id], None)
        .await?;

    let espresso = product(catalog, "Espresso", "espresso", coffee.id).await?;
    let latte = product(catalog, "Latte", "latte", coffee.id).await?;
    let green_tea = product(catalog, "Green Tea", "green-tea", tea.id).await?;
    let croissant = product(catalog, "Croissant", "croissant", pastries.id).await?;

    Ok(MenuFixture {
        drinks,
        food,
        coffee,
        tea,
        pastries,
        espresso,
        latte,
        green_tea,
        croissant,
    })
}
