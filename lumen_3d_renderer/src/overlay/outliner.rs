/// Scene outliner - the hierarchy flattened for display

use crate::scene::{Scene, SceneObjectKey};

/// One line of the outliner tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlinerRow {
    pub key: SceneObjectKey,
    /// 0 for root objects
    pub depth: usize,
    pub name: String,
    /// Leaf rows have no expand arrow
    pub has_children: bool,
}

/// Depth-first rows from every root, children in insertion order
pub fn outliner_rows(scene: &Scene) -> Vec<OutlinerRow> {
    let mut rows = Vec::with_capacity(scene.object_count());
    for &root in scene.root_objects() {
        push_rows(scene, root, 0, &mut rows);
    }
    rows
}

fn push_rows(scene: &Scene, key: SceneObjectKey, depth: usize, rows: &mut Vec<OutlinerRow>) {
    let Some(object) = scene.object(key) else {
        return;
    };
    rows.push(OutlinerRow {
        key,
        depth,
        name: object.name().to_string(),
        has_children: !object.children().is_empty(),
    });
    for &child in object.children() {
        push_rows(scene, child, depth + 1, rows);
    }
}

#[cfg(test)]
#[path = "outliner_tests.rs"]
mod tests;
