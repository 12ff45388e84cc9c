/// Binding layout registry - the three fixed binding-set shapes used by every draw

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, BindingLayout, BindingLayoutDesc, BindingSlotDesc, BindingType, ShaderStageFlags,
};

/// Set index of the per-camera binding set (view/projection, point lights)
pub const CAMERA_SET: u32 = 0;
/// Set index of the per-object binding set (model matrix)
pub const OBJECT_SET: u32 = 1;
/// Set index of the per-primitive material binding set (factors + 3 textures)
pub const MATERIAL_SET: u32 = 2;

/// Owns the camera, object and material layouts
///
/// Created once at startup; meshes, instances, cameras and both pipelines
/// all reference these same layouts.
pub struct BindingLayoutRegistry {
    camera: Arc<dyn BindingLayout>,
    object: Arc<dyn BindingLayout>,
    material: Arc<dyn BindingLayout>,
}

impl BindingLayoutRegistry {
    pub fn new(device: &Arc<Mutex<dyn GraphicsDevice>>) -> Result<Self> {
        let mut device = device
            .lock()
            .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))?;

        let camera = device.create_binding_layout(&Self::camera_desc())?;
        let object = device.create_binding_layout(&Self::object_desc())?;
        let material = device.create_binding_layout(&Self::material_desc())?;

        crate::engine_debug!("lumen3d::BindingLayouts", "Created camera, object and material layouts");

        Ok(Self { camera, object, material })
    }

    /// Set 0: binding 0 camera uniform buffer, vertex stage; binding 1
    /// point light storage buffer, fragment stage
    pub fn camera_desc() -> BindingLayoutDesc {
        BindingLayoutDesc {
            name: "camera".to_string(),
            set_index: CAMERA_SET,
            entries: vec![
                uniform_slot(0, ShaderStageFlags::VERTEX),
                BindingSlotDesc {
                    binding: 1,
                    binding_type: BindingType::StorageBuffer,
                    stage_flags: ShaderStageFlags::FRAGMENT,
                },
            ],
        }
    }

    /// Set 1: binding 0 uniform buffer, vertex stage
    pub fn object_desc() -> BindingLayoutDesc {
        BindingLayoutDesc {
            name: "object".to_string(),
            set_index: OBJECT_SET,
            entries: vec![uniform_slot(0, ShaderStageFlags::VERTEX)],
        }
    }

    /// Set 2: binding 0 material factors, bindings 1..3 base color,
    /// metallic-roughness and normal textures, fragment stage
    pub fn material_desc() -> BindingLayoutDesc {
        let mut entries = vec![uniform_slot(0, ShaderStageFlags::FRAGMENT)];
        entries.extend((1..=3).map(|binding| BindingSlotDesc {
            binding,
            binding_type: BindingType::CombinedImageSampler,
            stage_flags: ShaderStageFlags::FRAGMENT,
        }));
        BindingLayoutDesc {
            name: "material".to_string(),
            set_index: MATERIAL_SET,
            entries,
        }
    }

    pub fn camera(&self) -> &Arc<dyn BindingLayout> {
        &self.camera
    }

    pub fn object(&self) -> &Arc<dyn BindingLayout> {
        &self.object
    }

    pub fn material(&self) -> &Arc<dyn BindingLayout> {
        &self.material
    }

    /// All layouts ordered by set index, as expected by pipeline creation
    pub fn all(&self) -> Vec<Arc<dyn BindingLayout>> {
        vec![
            Arc::clone(&self.camera),
            Arc::clone(&self.object),
            Arc::clone(&self.material),
        ]
    }
}

fn uniform_slot(binding: u32, stage_flags: ShaderStageFlags) -> BindingSlotDesc {
    BindingSlotDesc {
        binding,
        binding_type: BindingType::UniformBuffer,
        stage_flags,
    }
}

#[cfg(test)]
#[path = "binding_layouts_tests.rs"]
mod tests;
