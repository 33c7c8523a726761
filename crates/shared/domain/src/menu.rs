//! Navigation menus and the per-user sidebar tree.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainResult, FieldErrors};
use crate::rbac::AccessProfile;

/// Stored menu entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Menu {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub route: Option<String>,
    pub icon: Option<String>,
    /// Permission required to see the entry and its subtree
    pub permission: Option<String>,
    pub position: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rendered tree node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MenuNode {
    pub id: Uuid,
    pub title: String,
    pub route: Option<String>,
    pub icon: Option<String>,
    pub permission: Option<String>,
    pub position: i32,
    pub children: Vec<MenuNode>,
}

/// Requested placement of one menu in a bulk reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct MenuPosition {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub position: i32,
}

fn children_index(menus: &[Menu]) -> HashMap<Option<Uuid>, Vec<&Menu>> {
    let known: HashSet<Uuid> = menus.iter().map(|m| m.id).collect();
    let mut index: HashMap<Option<Uuid>, Vec<&Menu>> = HashMap::new();
    for menu in menus {
        // Entries whose parent is gone are treated as roots.
        let parent = menu.parent_id.filter(|p| known.contains(p));
        index.entry(parent).or_default().push(menu);
    }
    for siblings in index.values_mut() {
        siblings.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.title.cmp(&b.title)));
    }
    index
}

fn node(menu: &Menu, children: Vec<MenuNode>) -> MenuNode {
    MenuNode {
        id: menu.id,
        title: menu.title.clone(),
        route: menu.route.clone(),
        icon: menu.icon.clone(),
        permission: menu.permission.clone(),
        position: menu.position,
        children,
    }
}

/// Full tree of every stored menu, for the admin screen.
pub fn build_tree(menus: &[Menu]) -> Vec<MenuNode> {
    fn walk(parent: Option<Uuid>, index: &HashMap<Option<Uuid>, Vec<&Menu>>) -> Vec<MenuNode> {
        index
            .get(&parent)
            .map(|siblings| {
                siblings
                    .iter()
                    .map(|menu| node(menu, walk(Some(menu.id), index)))
                    .collect()
            })
            .unwrap_or_default()
    }

    let index = children_index(menus);
    walk(None, &index)
}

/// Sidebar visible to `access`.
///
/// Inactive entries and entries guarded by a permission the user lacks are
/// dropped together with their subtree. A group (no route) left without
/// visible children is dropped as well.
pub fn build_sidebar(menus: &[Menu], access: &AccessProfile) -> Vec<MenuNode> {
    fn walk(
        parent: Option<Uuid>,
        index: &HashMap<Option<Uuid>, Vec<&Menu>>,
        access: &AccessProfile,
    ) -> Vec<MenuNode> {
        let Some(siblings) = index.get(&parent) else {
            return Vec::new();
        };

        siblings
            .iter()
            .filter(|menu| menu.is_active)
            .filter(|menu| {
                menu.permission
                    .as_deref()
                    .map_or(true, |p| access.has_permission(p))
            })
            .filter_map(|menu| {
                let children = walk(Some(menu.id), index, access);
                if menu.route.is_none() && children.is_empty() {
                    None
                } else {
                    Some(node(menu, children))
                }
            })
            .collect()
    }

    let index = children_index(menus);
    walk(None, &index, access)
}

/// Validate a bulk reorder against the stored menus.
///
/// Every id and parent must exist and the resulting parent links must be
/// acyclic.
pub fn check_reorder(existing: &[Menu], items: &[MenuPosition]) -> DomainResult<()> {
    let mut errors = FieldErrors::new();
    let known: HashSet<Uuid> = existing.iter().map(|m| m.id).collect();

    if items.is_empty() {
        errors.add("items", "The items field is required.");
    }

    for (i, item) in items.iter().enumerate() {
        if !known.contains(&item.id) {
            errors.add(format!("items.{}.id", i), "The selected menu is invalid.");
        }
        if let Some(parent) = item.parent_id {
            if !known.contains(&parent) {
                errors.add(format!("items.{}.parent_id", i), "The selected parent is invalid.");
            } else if parent == item.id {
                errors.add(
                    format!("items.{}.parent_id", i),
                    "A menu cannot be its own parent.",
                );
            }
        }
        if item.position < 0 {
            errors.add(format!("items.{}.position", i), "The position must be at least 0.");
        }
    }

    if !errors.is_empty() {
        return errors.into_result();
    }

    // Apply the requested parents over the stored ones, then walk up from
    // every node looking for a loop.
    let mut parents: HashMap<Uuid, Option<Uuid>> =
        existing.iter().map(|m| (m.id, m.parent_id)).collect();
    for item in items {
        parents.insert(item.id, item.parent_id);
    }

    for (i, item) in items.iter().enumerate() {
        let mut seen = HashSet::new();
        let mut cursor = Some(item.id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                errors.add(
                    format!("items.{}.parent_id", i),
                    "A menu cannot be nested inside its own descendant.",
                );
                break;
            }
            cursor = parents.get(&current).copied().flatten();
        }
    }

    errors.into_result()
}

/// True when `candidate` is `id` itself or one of its descendants.
pub fn is_descendant(menus: &[Menu], id: Uuid, candidate: Uuid) -> bool {
    let parents: HashMap<Uuid, Option<Uuid>> = menus.iter().map(|m| (m.id, m.parent_id)).collect();
    let mut seen = HashSet::new();
    let mut cursor = Some(candidate);
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn menu(title: &str, parent: Option<Uuid>, route: Option<&str>, perm: Option<&str>, position: i32) -> Menu {
        Menu {
            id: Uuid::new_v4(),
            parent_id: parent,
            title: title.to_string(),
            route: route.map(str::to_string),
            icon: None,
            permission: perm.map(str::to_string),
            position,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn access(perms: &[&str]) -> AccessProfile {
        AccessProfile {
            roles: Default::default(),
            permissions: perms.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_sidebar_filters_by_permission_and_sorts() {
        let dashboard = menu("Dashboard", None, Some("/dashboard"), Some("view-dashboard"), 0);
        let production = menu("Production", None, None, None, 2);
        let lines = menu("Lines", Some(production.id), Some("/dashboard/production/lines"), Some("view-production"), 1);
        let orders = menu("Orders", Some(production.id), Some("/dashboard/production/orders"), Some("view-production"), 0);
        let settings = menu("Settings", None, Some("/dashboard/settings"), Some("manage-settings"), 1);
        let menus = vec![settings, lines, dashboard, orders, production];

        let tree = build_sidebar(&menus, &access(&["view-dashboard", "view-production"]));

        let titles: Vec<_> = tree.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Dashboard", "Production"]);
        let children: Vec<_> = tree[1].children.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(children, vec!["Orders", "Lines"]);
    }

    #[test]
    fn test_empty_group_is_hidden() {
        let group = menu("Admin", None, None, None, 0);
        let child = menu("Roles", Some(group.id), Some("/admin/roles"), Some("manage-roles"), 0);

        assert!(build_sidebar(&[group.clone(), child.clone()], &access(&[])).is_empty());
        assert_eq!(build_tree(&[group, child])[0].children.len(), 1);
    }

    #[test]
    fn test_inactive_parent_hides_subtree() {
        let mut group = menu("Gallery", None, Some("/dashboard/gallery"), None, 0);
        group.is_active = false;
        let child = menu("Folders", Some(group.id), Some("/dashboard/gallery"), None, 0);

        assert!(build_sidebar(&[group, child], &access(&[])).is_empty());
    }

    #[test]
    fn test_reorder_rejects_cycles() {
        let a = menu("A", None, Some("/a"), None, 0);
        let b = menu("B", Some(a.id), Some("/b"), None, 0);
        let menus = vec![a.clone(), b.clone()];

        let cyclic = [MenuPosition {
            id: a.id,
            parent_id: Some(b.id),
            position: 0,
        }];
        assert!(check_reorder(&menus, &cyclic).is_err());

        let flat = [
            MenuPosition { id: a.id, parent_id: None, position: 1 },
            MenuPosition { id: b.id, parent_id: None, position: 0 },
        ];
        assert!(check_reorder(&menus, &flat).is_ok());

        let unknown = [MenuPosition { id: Uuid::new_v4(), parent_id: None, position: 0 }];
        assert!(check_reorder(&menus, &unknown).is_err());
    }

    #[test]
    fn test_is_descendant() {
        let a = menu("A", None, None, None, 0);
        let b = menu("B", Some(a.id), None, None, 0);
        let c = menu("C", Some(b.id), None, None, 0);
        let menus = vec![a.clone(), b.clone(), c.clone()];

        assert!(is_descendant(&menus, a.id, c.id));
        assert!(is_descendant(&menus, a.id, a.id));
        assert!(!is_descendant(&menus, c.id, a.id));
    }
}
