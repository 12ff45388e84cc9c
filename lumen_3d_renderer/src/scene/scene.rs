/// Scene - arena-owned hierarchy of scene objects.
///
/// Uses a SlotMap for O(1) insert/remove with stable keys. The scene is the
/// sole owner of every object; parent/children links are keys into the same
/// map. World matrices are never cached: `world_matrix` walks the parent
/// chain on every call, so a parent mutation is visible to its descendants
/// immediately.

use std::sync::Arc;
use glam::{Mat4, Vec3};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use crate::error::Result;
use crate::render::{
    CameraUniform, ObjectUniform, PointLightData, PointLightsUniform, MAX_FRAMES_IN_FLIGHT,
    MAX_POINT_LIGHTS,
};
use crate::resource::{Mesh, Model, ResourceManager};
use crate::scene::{
    Transform, SceneObjectKey, SceneObject, SceneObjectKind, MeshInstance, Camera, PointLight,
};

/// One draw: primitive `primitive` of the mesh of instance `instance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawItem {
    pub instance: SceneObjectKey,
    pub primitive: usize,
}

/// GPU state of a removed object, kept until in-flight frames are done with it
struct RetiredObject {
    waits_left: usize,
    _kind: SceneObjectKind,
}

pub struct Scene {
    objects: SlotMap<SceneObjectKey, SceneObject>,
    /// Name -> key, every name unique
    names: FxHashMap<String, SceneObjectKey>,
    /// Top-level objects in creation order
    roots: Vec<SceneObjectKey>,
    /// Classified once when the instance is created
    opaque: Vec<DrawItem>,
    transparent: Vec<DrawItem>,
    main_camera: Option<SceneObjectKey>,
    retired: Vec<RetiredObject>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: SlotMap::with_key(),
            names: FxHashMap::default(),
            roots: Vec::new(),
            opaque: Vec::new(),
            transparent: Vec::new(),
            main_camera: None,
            retired: Vec::new(),
        }
    }

    // ===== NAMING =====

    /// `requested` if free, else `requested1`, `requested2`, ...
    pub fn unique_name(&self, requested: &str) -> String {
        let requested = if requested.is_empty() { "Object" } else { requested };
        if !self.names.contains_key(requested) {
            return requested.to_string();
        }
        (1u32..)
            .map(|counter| format!("{}{}", requested, counter))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or_else(|| requested.to_string())
    }

    fn insert(
        &mut self,
        name: String,
        transform: Transform,
        parent: Option<SceneObjectKey>,
        kind: SceneObjectKind,
    ) -> SceneObjectKey {
        let key = self.objects.insert(SceneObject {
            name: name.clone(),
            transform,
            parent: None,
            children: Vec::new(),
            kind,
        });
        self.names.insert(name, key);
        self.roots.push(key);

        if let Some(parent) = parent {
            if !self.set_parent(key, Some(parent)) {
                crate::engine_warn!("lumen3d::Scene", "Invalid parent for '{}', created at root", self.objects[key].name);
            }
        }
        key
    }

    // ===== CREATION =====

    /// Create a plain object (grouping node)
    pub fn create_scene_object(
        &mut self,
        name: &str,
        transform: Transform,
        parent: Option<SceneObjectKey>,
    ) -> SceneObjectKey {
        let name = self.unique_name(name);
        self.insert(name, transform, parent, SceneObjectKind::Empty)
    }

    /// Create a camera with per-slot camera uniforms
    ///
    /// The first camera becomes the main camera.
    pub fn create_camera(
        &mut self,
        resources: &ResourceManager,
        name: &str,
        transform: Transform,
        parent: Option<SceneObjectKey>,
    ) -> Result<SceneObjectKey> {
        let name = self.unique_name(name);
        let camera = Camera::new(resources.create_camera_resources(&name)?);
        let key = self.insert(name, transform, parent, SceneObjectKind::Camera(camera));

        if self.main_camera.is_none() {
            self.main_camera = Some(key);
        }
        Ok(key)
    }

    /// Create a point light
    ///
    /// Lights hold no GPU state of their own; `update_uniform_buffers` packs
    /// them into every camera's light block.
    pub fn create_point_light(
        &mut self,
        name: &str,
        transform: Transform,
        parent: Option<SceneObjectKey>,
        light: PointLight,
    ) -> SceneObjectKey {
        let name = self.unique_name(name);
        self.insert(name, transform, parent, SceneObjectKind::PointLight(light))
    }

    /// Create an instance of the loaded mesh `mesh_name`
    ///
    /// Returns `None` (and logs) when the mesh is unknown or its uniform
    /// buffers cannot be created; the scene is left unchanged.
    pub fn create_mesh_instance(
        &mut self,
        resources: &ResourceManager,
        name: &str,
        mesh_name: &str,
        transform: Transform,
        parent: Option<SceneObjectKey>,
    ) -> Option<SceneObjectKey> {
        let Some(mesh) = resources.mesh(mesh_name) else {
            crate::engine_warn!("lumen3d::Scene", "Cannot create instance '{}': mesh '{}' not found", name, mesh_name);
            return None;
        };
        self.create_instance_of(resources, name, mesh, transform, parent)
    }

    fn create_instance_of(
        &mut self,
        resources: &ResourceManager,
        name: &str,
        mesh: Arc<Mesh>,
        transform: Transform,
        parent: Option<SceneObjectKey>,
    ) -> Option<SceneObjectKey> {
        let name = self.unique_name(name);
        let instance_resources = match resources.create_instance_resources(&mesh, &name) {
            Ok(instance_resources) => instance_resources,
            Err(e) => {
                crate::engine_error!("lumen3d::Scene", "Failed to create GPU state for '{}': {}", name, e);
                return None;
            }
        };

        let primitives: Vec<bool> = mesh.primitives().iter().map(|p| p.is_transparent()).collect();
        let key = self.insert(
            name,
            transform,
            parent,
            SceneObjectKind::MeshInstance(MeshInstance { mesh, resources: instance_resources }),
        );

        for (primitive, transparent) in primitives.into_iter().enumerate() {
            let item = DrawItem { instance: key, primitive };
            if transparent {
                self.transparent.push(item);
            } else {
                self.opaque.push(item);
            }
        }
        Some(key)
    }

    /// Instantiate a loaded model as a tree of scene objects under a new root
    ///
    /// Mesh-bearing nodes become mesh instances, the others plain objects.
    /// Returns the root, or `None` when the model is unknown.
    pub fn instantiate_model(
        &mut self,
        resources: &ResourceManager,
        model_name: &str,
        transform: Transform,
    ) -> Option<SceneObjectKey> {
        let Some(model) = resources.model(model_name) else {
            crate::engine_warn!("lumen3d::Scene", "Cannot instantiate model '{}': not loaded", model_name);
            return None;
        };

        let root = self.create_scene_object(model_name, transform, None);
        for &node in model.roots() {
            self.instantiate_node(resources, &model, node, root);
        }

        crate::engine_info!(
            "lumen3d::Scene",
            "Instantiated model '{}' as '{}'",
            model_name, self.objects[root].name
        );
        Some(root)
    }

    fn instantiate_node(&mut self, resources: &ResourceManager, model: &Model, index: usize, parent: SceneObjectKey) {
        let Some(node) = model.node(index) else {
            return;
        };
        let transform = node.transform.to_transform();

        let key = match model.node_mesh(node) {
            Some(mesh) => self
                .create_instance_of(resources, &node.name, Arc::clone(mesh), transform, Some(parent))
                .unwrap_or_else(|| self.create_scene_object(&node.name, transform, Some(parent))),
            None => self.create_scene_object(&node.name, transform, Some(parent)),
        };

        for &child in &node.children {
            self.instantiate_node(resources, model, child, key);
        }
    }

    // ===== HIERARCHY =====

    /// Reparent `child` under `parent` (`None` = root level)
    ///
    /// No-op returning `true` when `parent` already is the parent. Refuses
    /// (returns `false`) unknown keys and a parent that is `child` itself or
    /// one of its descendants.
    pub fn set_parent(&mut self, child: SceneObjectKey, parent: Option<SceneObjectKey>) -> bool {
        let Some(current) = self.objects.get(child).map(|object| object.parent) else {
            return false;
        };
        if current == parent {
            return true;
        }
        if let Some(parent) = parent {
            if !self.objects.contains_key(parent) || self.is_self_or_ancestor(child, parent) {
                return false;
            }
        }

        // Detach from the old side
        match current {
            Some(old) => {
                if let Some(old) = self.objects.get_mut(old) {
                    old.children.retain(|k| *k != child);
                }
            }
            None => self.roots.retain(|k| *k != child),
        }

        // Attach to the new side
        match parent {
            Some(new) => {
                if let Some(new) = self.objects.get_mut(new) {
                    new.children.push(child);
                }
            }
            None => self.roots.push(child),
        }

        if let Some(object) = self.objects.get_mut(child) {
            object.parent = parent;
        }
        true
    }

    /// Whether `ancestor` is `key` or one of its ancestors
    fn is_self_or_ancestor(&self, ancestor: SceneObjectKey, key: SceneObjectKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.objects.get(k).and_then(|object| object.parent);
        }
        false
    }

    pub fn parent(&self, key: SceneObjectKey) -> Option<SceneObjectKey> {
        self.objects.get(key).and_then(|object| object.parent)
    }

    pub fn children(&self, key: SceneObjectKey) -> &[SceneObjectKey] {
        self.objects.get(key).map(|object| object.children.as_slice()).unwrap_or(&[])
    }

    /// Top-level objects
    pub fn root_objects(&self) -> &[SceneObjectKey] {
        &self.roots
    }

    // ===== TRANSFORMS =====

    pub fn local_matrix(&self, key: SceneObjectKey) -> Option<Mat4> {
        self.objects.get(key).map(|object| object.transform.local_matrix())
    }

    /// Parent world matrix * local matrix, walked up to the root on every call
    pub fn world_matrix(&self, key: SceneObjectKey) -> Option<Mat4> {
        let object = self.objects.get(key)?;
        let mut matrix = object.transform.local_matrix();
        let mut current = object.parent;
        while let Some(parent) = current.and_then(|k| self.objects.get(k)) {
            matrix = parent.transform.local_matrix() * matrix;
            current = parent.parent;
        }
        Some(matrix)
    }

    /// World-space position (translation of the world matrix)
    pub fn world_position(&self, key: SceneObjectKey) -> Option<Vec3> {
        self.world_matrix(key).map(|m| m.w_axis.truncate())
    }

    // ===== REMOVAL =====

    /// Remove an object
    ///
    /// The object is detached from its parent and its children become root
    /// objects (they are not removed). Its name is freed immediately, its GPU
    /// state is retired until in-flight frames are done with it.
    pub fn remove_object(&mut self, key: SceneObjectKey) -> bool {
        if !self.objects.contains_key(key) {
            return false;
        }
        self.set_parent(key, None);
        self.roots.retain(|k| *k != key);

        let Some(object) = self.objects.remove(key) else {
            return false;
        };
        for child in &object.children {
            if let Some(child_object) = self.objects.get_mut(*child) {
                child_object.parent = None;
                self.roots.push(*child);
            }
        }

        self.names.remove(&object.name);
        self.opaque.retain(|item| item.instance != key);
        self.transparent.retain(|item| item.instance != key);
        if self.main_camera == Some(key) {
            self.main_camera = None;
        }

        crate::engine_debug!("lumen3d::Scene", "Removed '{}'", object.name);
        if object.kind.holds_gpu_state() {
            self.retired.push(RetiredObject {
                waits_left: MAX_FRAMES_IN_FLIGHT,
                _kind: object.kind,
            });
        }
        true
    }

    /// Count one completed fence wait, releasing GPU state no frame can still read
    pub fn collect_retired(&mut self) {
        for retired in &mut self.retired {
            retired.waits_left = retired.waits_left.saturating_sub(1);
        }
        self.retired.retain(|retired| retired.waits_left > 0);
    }

    /// Number of removed objects whose GPU state is still retained
    pub fn retired_count(&self) -> usize {
        self.retired.len()
    }

    // ===== LOOKUP =====

    pub fn object(&self, key: SceneObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    pub fn object_mut(&mut self, key: SceneObjectKey) -> Option<&mut SceneObject> {
        self.objects.get_mut(key)
    }

    pub fn find_by_name(&self, name: &str) -> Option<SceneObjectKey> {
        self.names.get(name).copied()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = SceneObjectKey> + '_ {
        self.objects.keys()
    }

    pub fn mesh_instance(&self, key: SceneObjectKey) -> Option<&MeshInstance> {
        self.objects.get(key).and_then(|object| object.as_mesh_instance())
    }

    // ===== CAMERA =====

    pub fn main_camera(&self) -> Option<SceneObjectKey> {
        self.main_camera
    }

    /// Make `key` the main camera; `false` if it is not a camera
    pub fn set_main_camera(&mut self, key: SceneObjectKey) -> bool {
        if self.objects.get(key).and_then(|object| object.as_camera()).is_some() {
            self.main_camera = Some(key);
            true
        } else {
            false
        }
    }

    // ===== DRAW LISTS =====

    pub fn opaque_instances(&self) -> &[DrawItem] {
        &self.opaque
    }

    pub fn transparent_instances(&self) -> &[DrawItem] {
        &self.transparent
    }

    /// Transparent draws sorted farthest-first from `camera_position`
    ///
    /// Distance is Euclidean, camera position to instance world position.
    pub fn transparent_draw_order(&self, camera_position: Vec3) -> Vec<DrawItem> {
        let mut items: Vec<(f32, DrawItem)> = self
            .transparent
            .iter()
            .map(|item| {
                let position = self.world_position(item.instance).unwrap_or(Vec3::ZERO);
                (camera_position.distance(position), *item)
            })
            .collect();
        items.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        items.into_iter().map(|(_, item)| item).collect()
    }

    // ===== UNIFORM REFRESH =====

    /// Point lights in world space, at most `MAX_POINT_LIGHTS`
    ///
    /// Lights past the cap are dropped in arena order.
    pub fn point_lights(&self) -> Vec<PointLightData> {
        self.objects
            .iter()
            .filter_map(|(key, object)| {
                let light = object.as_point_light()?;
                let position = self.world_position(key)?;
                Some(PointLightData::new(position, light.color, light.radius, light.intensity))
            })
            .take(MAX_POINT_LIGHTS)
            .collect()
    }

    /// Write every instance's world matrix, and every camera's matrices and
    /// point lights, into `slot`
    ///
    /// Must run after this frame's transform edits and after the slot's
    /// fence wait, before recording.
    pub fn update_uniform_buffers(&self, slot: usize, extent: (u32, u32)) -> Result<()> {
        let aspect = if extent.1 == 0 {
            1.0
        } else {
            extent.0 as f32 / extent.1 as f32
        };
        let lights = PointLightsUniform::from_lights(&self.point_lights());

        for (key, object) in &self.objects {
            match &object.kind {
                SceneObjectKind::MeshInstance(instance) => {
                    if let Some(model) = self.world_matrix(key) {
                        instance.resources.write(slot, &ObjectUniform { model })?;
                    }
                }
                SceneObjectKind::Camera(camera) => {
                    if let Some(world) = self.world_matrix(key) {
                        let uniform = CameraUniform::new(world, camera.fov_degrees, aspect, camera.near, camera.far);
                        camera.resources.write(slot, &uniform)?;
                        camera.resources.write_lights(slot, &lights)?;
                    }
                }
                SceneObjectKind::Empty | SceneObjectKind::PointLight(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "scene_tests.rs"]
mod tests;
