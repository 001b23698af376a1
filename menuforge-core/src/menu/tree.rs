//! Nested and flattened renderings of the menu.
//!
//! Labels sit at the root, ordered globally. Categories hang off every label
//! they are attached to, ordered by the label-scoped link order. Products
//! hang off every category they are attached to. Categories with no label
//! are shown at the root after the labels so they stay reachable.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::kind::EntityKind;
use super::registry::RowKey;
use crate::database::entities::{categories, category_products, label_categories, labels, products};

/// Everything needed to render the menu, read in one pass.
#[derive(Debug, Clone, Default)]
pub struct MenuSnapshot {
    pub labels: Vec<labels::Model>,
    pub categories: Vec<categories::Model>,
    pub products: Vec<products::Model>,
    pub label_categories: Vec<label_categories::Model>,
    pub category_products: Vec<category_products::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    pub key: RowKey,
    pub kind: EntityKind,
    pub entity_id: i32,
    pub name: String,
    pub visible: bool,
    /// Number of products attached; only set on category rows.
    pub product_count: Option<usize>,
    pub children: Vec<MenuNode>,
}

/// One row of the flattened table rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatRow {
    pub key: RowKey,
    pub parent_key: Option<RowKey>,
    pub kind: EntityKind,
    pub entity_id: i32,
    pub name: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub visible: bool,
}

/// Which rows of the tree are expanded. Owned by the view.
#[derive(Debug, Clone, Default)]
pub enum Expansion {
    #[default]
    All,
    Only(HashSet<RowKey>),
}

impl Expansion {
    pub fn is_expanded(&self, key: &RowKey) -> bool {
        match self {
            Expansion::All => true,
            Expansion::Only(keys) => keys.contains(key),
        }
    }
}

/// Display order inside one scope: `order` ascending, ties broken by id
/// descending. Arguments are `(order, id)` pairs.
pub fn scope_ordering(a: (i32, i32), b: (i32, i32)) -> Ordering {
    a.0.cmp(&b.0).then_with(|| b.1.cmp(&a.1))
}

pub fn build_menu_tree(snapshot: &MenuSnapshot) -> Vec<MenuNode> {
    let categories_by_id: HashMap<i32, &categories::Model> =
        snapshot.categories.iter().map(|c| (c.id, c)).collect();
    let products_by_id: HashMap<i32, &products::Model> =
        snapshot.products.iter().map(|p| (p.id, p)).collect();

    let mut links_by_label: HashMap<i32, Vec<&label_categories::Model>> = HashMap::new();
    for link in &snapshot.label_categories {
        links_by_label.entry(link.label_id).or_default().push(link);
    }
    for links in links_by_label.values_mut() {
        links.sort_by(|a, b| {
            scope_ordering((a.sort_order, a.category_id), (b.sort_order, b.category_id))
        });
    }

    let mut links_by_category: HashMap<i32, Vec<&category_products::Model>> = HashMap::new();
    for link in &snapshot.category_products {
        links_by_category
            .entry(link.category_id)
            .or_default()
            .push(link);
    }
    for links in links_by_category.values_mut() {
        links.sort_by(|a, b| {
            scope_ordering((a.sort_order, a.product_id), (b.sort_order, b.product_id))
        });
    }

    let category_node = |parent: Option<&RowKey>, category: &categories::Model| -> MenuNode {
        let key = RowKey::scoped(parent, EntityKind::Category, category.id);
        let links = links_by_category
            .get(&category.id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let children = links
            .iter()
            .filter_map(|link| products_by_id.get(&link.product_id))
            .map(|product| MenuNode {
                key: RowKey::scoped(Some(&key), EntityKind::Product, product.id),
                kind: EntityKind::Product,
                entity_id: product.id,
                name: product.name.clone(),
                visible: !product.is_disabled,
                product_count: None,
                children: Vec::new(),
            })
            .collect();
        MenuNode {
            key,
            kind: EntityKind::Category,
            entity_id: category.id,
            name: category.name.clone(),
            visible: category.is_visible,
            product_count: Some(links.len()),
            children,
        }
    };

    let mut ordered_labels: Vec<&labels::Model> = snapshot.labels.iter().collect();
    ordered_labels.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));

    let mut nodes: Vec<MenuNode> = ordered_labels
        .into_iter()
        .map(|label| {
            let key = RowKey::scoped(None, EntityKind::Label, label.id);
            let children = links_by_label
                .get(&label.id)
                .map(Vec::as_slice)
                .unwrap_or_default()
                .iter()
                .filter_map(|link| categories_by_id.get(&link.category_id))
                .map(|category| category_node(Some(&key), *category))
                .collect();
            MenuNode {
                key,
                kind: EntityKind::Label,
                entity_id: label.id,
                name: label.name.clone(),
                visible: label.is_visible,
                product_count: None,
                children,
            }
        })
        .collect();

    let attached: HashSet<i32> = snapshot
        .label_categories
        .iter()
        .map(|link| link.category_id)
        .collect();
    let mut unattached: Vec<&categories::Model> = snapshot
        .categories
        .iter()
        .filter(|category| !attached.contains(&category.id))
        .collect();
    unattached.sort_by(|a, b| scope_ordering((a.sort_order, a.id), (b.sort_order, b.id)));
    nodes.extend(
        unattached
            .into_iter()
            .map(|category| category_node(None, category)),
    );

    nodes
}

/// Flatten the tree depth-first. Children of collapsed rows are omitted.
pub fn flatten_tree(nodes: &[MenuNode], expansion: &Expansion) -> Vec<FlatRow> {
    let mut rows = Vec::new();
    for node in nodes {
        flatten_node(node, None, 0, expansion, &mut rows);
    }
    rows
}

fn flatten_node(
    node: &MenuNode,
    parent_key: Option<&RowKey>,
    depth: usize,
    expansion: &Expansion,
    rows: &mut Vec<FlatRow>,
) {
    let expanded = !node.children.is_empty() && expansion.is_expanded(&node.key);
    rows.push(FlatRow {
        key: node.key.clone(),
        parent_key: parent_key.cloned(),
        kind: node.kind,
        entity_id: node.entity_id,
        name: node.name.clone(),
        depth,
        has_children: !node.children.is_empty(),
        expanded,
        visible: node.visible,
    });
    if expanded {
        for child in &node.children {
            flatten_node(child, Some(&node.key), depth + 1, expansion, rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::registry::IdentityRegistry;
    use chrono::Utc;

    fn label(id: i32, sort_order: i32) -> labels::Model {
        labels::Model {
            id,
            name: format!("Label {id}"),
            icon: None,
            sort_order,
            is_visible: true,
            created_at: Utc::now(),
        }
    }

    fn category(id: i32, sort_order: i32) -> categories::Model {
        categories::Model {
            id,
            name: format!("Category {id}"),
            slug: format!("category-{id}"),
            sort_order,
            is_visible: true,
            created_at: Utc::now(),
        }
    }

    fn product(id: i32) -> products::Model {
        products::Model {
            id,
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            is_disabled: id % 2 == 0,
            created_at: Utc::now(),
        }
    }

    fn label_link(label_id: i32, category_id: i32, sort_order: i32) -> label_categories::Model {
        label_categories::Model {
            id: label_id * 100 + category_id,
            label_id,
            category_id,
            sort_order,
        }
    }

    fn product_link(category_id: i32, product_id: i32, sort_order: i32) -> category_products::Model {
        category_products::Model {
            id: category_id * 100 + product_id,
            category_id,
            product_id,
            sort_order,
        }
    }

    fn snapshot() -> MenuSnapshot {
        MenuSnapshot {
            labels: vec![label(1, 1), label(2, 0)],
            categories: vec![category(10, 0), category(11, 1), category(12, 2)],
            products: vec![product(100), product(101)],
            label_categories: vec![
                label_link(1, 10, 1),
                label_link(1, 11, 0),
                label_link(2, 10, 0),
            ],
            category_products: vec![product_link(10, 100, 0), product_link(10, 101, 0)],
        }
    }

    #[test]
    fn labels_and_scoped_children_follow_link_order() {
        let tree = build_menu_tree(&snapshot());
        let roots: Vec<(EntityKind, i32)> = tree.iter().map(|n| (n.kind, n.entity_id)).collect();
        assert_eq!(
            roots,
            vec![
                (EntityKind::Label, 2),
                (EntityKind::Label, 1),
                (EntityKind::Category, 12),
            ]
        );

        let label_one: Vec<i32> = tree[1].children.iter().map(|n| n.entity_id).collect();
        assert_eq!(label_one, vec![11, 10]);
    }

    #[test]
    fn ties_in_scope_order_break_by_id_descending() {
        let tree = build_menu_tree(&snapshot());
        let under_label_two = &tree[0].children[0];
        let products: Vec<i32> = under_label_two
            .children
            .iter()
            .map(|n| n.entity_id)
            .collect();
        assert_eq!(products, vec![101, 100]);
        assert_eq!(under_label_two.product_count, Some(2));
        assert!(under_label_two.children[0].visible);
        assert!(!under_label_two.children[1].visible);
    }

    #[test]
    fn shared_category_gets_one_row_per_label() {
        let tree = build_menu_tree(&snapshot());
        let registry = IdentityRegistry::from_tree(&tree);
        assert_eq!(registry.keys_for(EntityKind::Category, 10).len(), 2);
        assert_eq!(registry.keys_for(EntityKind::Product, 100).len(), 2);
    }

    #[test]
    fn flatten_respects_expansion() {
        let tree = build_menu_tree(&snapshot());
        let all = flatten_tree(&tree, &Expansion::All);
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].depth, 0);
        assert_eq!(all[1].depth, 1);
        assert_eq!(all[2].depth, 2);
        assert_eq!(all[1].parent_key.as_ref(), Some(&all[0].key));

        let only_first = Expansion::Only(HashSet::from([tree[0].key.clone()]));
        let rows = flatten_tree(&tree, &only_first);
        assert_eq!(rows.len(), 4);
        assert!(rows[0].expanded);
        assert!(rows[1].has_children);
        assert!(!rows[1].expanded);
    }

    #[test]
    fn rows_serialize_with_plain_keys() {
        let tree = build_menu_tree(&snapshot());
        let json = serde_json::to_value(&tree[0]).unwrap();
        assert_eq!(json["kind"], "label");
        assert_eq!(json["key"], tree[0].key.as_str());
        assert_eq!(json["children"][0]["product_count"], 2);
    }

    #[test]
    fn registry_from_rows_matches_registry_from_tree() {
        let tree = build_menu_tree(&snapshot());
        let rows = flatten_tree(&tree, &Expansion::All);
        let from_rows = IdentityRegistry::from_rows(&rows);
        let from_tree = IdentityRegistry::from_tree(&tree);
        assert_eq!(from_rows.len(), from_tree.len());
        for (key, entry) in from_tree.iter() {
            assert_eq!(from_rows.get(key), Some(entry));
        }
    }
}
