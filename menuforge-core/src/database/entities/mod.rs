pub mod categories;
pub mod category_products;
pub mod label_categories;
pub mod labels;
pub mod products;
