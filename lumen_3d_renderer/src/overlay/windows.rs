/// Dialog windows - create object, load model, instantiate model

use glam::Vec3;
use crate::overlay::euler_degrees_to_quat;
use crate::resource::ResourceManager;
use crate::scene::{PointLight, Scene, SceneObjectKey, Transform};

// ============================================================================
// CREATE OBJECT
// ============================================================================

/// Kind offered by the create object window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateObjectKind {
    Empty,
    /// Instance of an already loaded mesh
    MeshInstance { mesh_name: String },
    Camera,
    PointLight,
}

impl CreateObjectKind {
    pub fn label(&self) -> &'static str {
        match self {
            CreateObjectKind::Empty => "Empty Scene Object",
            CreateObjectKind::MeshInstance { .. } => "Mesh Instance",
            CreateObjectKind::Camera => "Camera",
            CreateObjectKind::PointLight => "Point Light",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CreateObjectState {
    pub selected_kind: Option<CreateObjectKind>,
}

impl CreateObjectState {
    pub fn can_submit(&self) -> bool {
        self.selected_kind.is_some()
    }

    /// Create the selected kind at the origin, then clear the selection
    ///
    /// A new camera becomes the main camera when there is none.
    pub fn create(&mut self, scene: &mut Scene, resources: &ResourceManager) -> Option<SceneObjectKey> {
        let kind = self.selected_kind.take()?;
        let transform = Transform::IDENTITY;

        match kind {
            CreateObjectKind::Empty => Some(scene.create_scene_object("Empty Scene Object", transform, None)),
            CreateObjectKind::PointLight => {
                Some(scene.create_point_light("Point Light", transform, None, PointLight::default()))
            }
            CreateObjectKind::MeshInstance { mesh_name } => {
                scene.create_mesh_instance(resources, &mesh_name, &mesh_name, transform, None)
            }
            CreateObjectKind::Camera => match scene.create_camera(resources, "Camera", transform, None) {
                Ok(key) => {
                    if scene.main_camera().is_none() {
                        scene.set_main_camera(key);
                    }
                    Some(key)
                }
                Err(e) => {
                    crate::engine_error!("lumen3d::Overlay", "Failed to create camera: {}", e);
                    None
                }
            },
        }
    }
}

// ============================================================================
// LOAD MODEL
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoadModelState {
    pub name: String,
    pub path: String,
}

impl LoadModelState {
    /// Both fields must be non-empty
    pub fn can_submit(&self) -> bool {
        !self.name.is_empty() && !self.path.is_empty()
    }

    /// Load the model; `false` when the form is incomplete or loading failed
    pub fn submit(&self, resources: &mut ResourceManager) -> bool {
        if !self.can_submit() {
            return false;
        }
        resources.load_model(&self.name, &self.path).is_some()
    }
}

// ============================================================================
// INSTANTIATE MODEL
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct InstantiateModelState {
    pub model_name: String,
    pub transform: Transform,
    euler_degrees: Vec3,
}

impl InstantiateModelState {
    pub fn can_submit(&self) -> bool {
        !self.model_name.is_empty()
    }

    pub fn euler_degrees(&self) -> Vec3 {
        self.euler_degrees
    }

    /// Same wrapping and rounding as the inspector
    pub fn set_euler_degrees(&mut self, degrees: Vec3) {
        let (degrees, rotation) = euler_degrees_to_quat(degrees);
        self.euler_degrees = degrees;
        self.transform.rotation = rotation;
    }

    pub fn submit(&self, scene: &mut Scene, resources: &ResourceManager) -> Option<SceneObjectKey> {
        if !self.can_submit() {
            return None;
        }
        scene.instantiate_model(resources, &self.model_name, self.transform)
    }
}

#[cfg(test)]
#[path = "windows_tests.rs"]
mod tests;
