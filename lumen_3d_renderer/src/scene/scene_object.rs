/// Scene objects and their kinds

use std::sync::Arc;
use glam::Vec3;
use slotmap::new_key_type;
use crate::resource::{Mesh, InstanceResources, CameraResources};
use crate::scene::Transform;

// ===== SLOT MAP KEY =====

new_key_type! {
    /// Stable key for a SceneObject within a Scene.
    ///
    /// Keys remain valid even after other objects are removed.
    /// A key becomes invalid only when its own object is removed.
    pub struct SceneObjectKey;
}

/// A mesh placed in the scene
///
/// Holds the shared mesh alive and owns the per-slot object uniforms the
/// uniform refresh writes its world matrix into.
pub struct MeshInstance {
    pub(crate) mesh: Arc<Mesh>,
    pub(crate) resources: InstanceResources,
}

impl MeshInstance {
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn resources(&self) -> &InstanceResources {
        &self.resources
    }
}

/// A perspective camera
pub struct Camera {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub(crate) resources: CameraResources,
}

impl Camera {
    pub const DEFAULT_FOV_DEGREES: f32 = 70.0;
    pub const DEFAULT_NEAR: f32 = 0.1;
    pub const DEFAULT_FAR: f32 = 1000.0;

    pub(crate) fn new(resources: CameraResources) -> Self {
        Self {
            fov_degrees: Self::DEFAULT_FOV_DEGREES,
            near: Self::DEFAULT_NEAR,
            far: Self::DEFAULT_FAR,
            resources,
        }
    }

    pub fn resources(&self) -> &CameraResources {
        &self.resources
    }
}

/// A point light
///
/// Lights own no GPU state: every frame the scene packs them into the
/// point light block of each camera set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    /// Linear RGB
    pub color: Vec3,
    /// Distance at which the contribution falls to zero
    pub radius: f32,
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            radius: 10.0,
            intensity: 1.0,
        }
    }
}

/// What a scene object is, beyond its place in the hierarchy
///
/// Fixed at creation: the scene tracks draw lists, the main camera and GPU
/// retirement by kind.
pub enum SceneObjectKind {
    Empty,
    MeshInstance(MeshInstance),
    Camera(Camera),
    PointLight(PointLight),
}

impl SceneObjectKind {
    /// Short label for editors and logs
    pub fn label(&self) -> &'static str {
        match self {
            SceneObjectKind::Empty => "Empty",
            SceneObjectKind::MeshInstance(_) => "MeshInstance",
            SceneObjectKind::Camera(_) => "Camera",
            SceneObjectKind::PointLight(_) => "PointLight",
        }
    }

    /// Whether the kind owns per-slot GPU buffers or binding sets
    pub(crate) fn holds_gpu_state(&self) -> bool {
        matches!(self, SceneObjectKind::MeshInstance(_) | SceneObjectKind::Camera(_))
    }
}

/// A named node of the scene graph
///
/// Parent and children are non-owning keys into the owning `Scene`; only
/// the scene mutates them, keeping both sides consistent.
pub struct SceneObject {
    pub(crate) name: String,
    pub transform: Transform,
    pub(crate) parent: Option<SceneObjectKey>,
    pub(crate) children: Vec<SceneObjectKey>,
    pub(crate) kind: SceneObjectKind,
}

impl SceneObject {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<SceneObjectKey> {
        self.parent
    }

    pub fn children(&self) -> &[SceneObjectKey] {
        &self.children
    }

    /// Kind of the object
    ///
    /// Read-only: replacing the kind would bypass the scene's bookkeeping.
    ///
    /// ```compile_fail
    /// use lumen_3d_renderer::lumen3d::scene::{Scene, SceneObjectKind, Transform};
    ///
    /// let mut scene = Scene::new();
    /// let key = scene.create_scene_object("Node", Transform::IDENTITY, None);
    /// scene.object_mut(key).unwrap().kind = SceneObjectKind::Empty;
    /// ```
    pub fn kind(&self) -> &SceneObjectKind {
        &self.kind
    }

    pub fn as_mesh_instance(&self) -> Option<&MeshInstance> {
        match &self.kind {
            SceneObjectKind::MeshInstance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            SceneObjectKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        match &mut self.kind {
            SceneObjectKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    pub fn as_point_light(&self) -> Option<&PointLight> {
        match &self.kind {
            SceneObjectKind::PointLight(light) => Some(light),
            _ => None,
        }
    }

    pub fn as_point_light_mut(&mut self) -> Option<&mut PointLight> {
        match &mut self.kind {
            SceneObjectKind::PointLight(light) => Some(light),
            _ => None,
        }
    }
}
