use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CatalogError;

/// The three levels of the storefront menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Label,
    Category,
    Product,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Label => "label",
            EntityKind::Category => "category",
            EntityKind::Product => "product",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Label => "Label",
            EntityKind::Category => "Category",
            EntityKind::Product => "Product",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntityKind::Label => "labels",
            EntityKind::Category => "categories",
            EntityKind::Product => "products",
        }
    }

    /// Kind of the container a row of this kind is rendered under, if any.
    pub fn parent_kind(&self) -> Option<EntityKind> {
        match self {
            EntityKind::Label => None,
            EntityKind::Category => Some(EntityKind::Label),
            EntityKind::Product => Some(EntityKind::Category),
        }
    }

    pub fn child_kind(&self) -> Option<EntityKind> {
        match self {
            EntityKind::Label => Some(EntityKind::Category),
            EntityKind::Category => Some(EntityKind::Product),
            EntityKind::Product => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "label" | "labels" => Ok(EntityKind::Label),
            "category" | "categories" => Ok(EntityKind::Category),
            "product" | "products" => Ok(EntityKind::Product),
            other => Err(CatalogError::validation(format!(
                "unknown entity kind '{other}'"
            ))),
        }
    }
}
