/// Per-frame-in-flight uniform buffers and binding sets
///
/// Every piece of per-frame GPU state (camera matrices, model matrices,
/// material factors) lives in one buffer per frame slot, so the CPU can
/// rewrite slot `i` as soon as slot `i`'s fence has signaled while the GPU
/// still reads the other slot.

use std::marker::PhantomData;
use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Buffer, BufferDesc, BufferUsage, BindingLayout, BindingSet, BindingResource,
};
use crate::render::MAX_FRAMES_IN_FLIGHT;

// ============================================================================
// Uniform payloads
// ============================================================================

/// Camera uniform (set 0, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    pub view: Mat4,
    pub proj: Mat4,
}

impl CameraUniform {
    /// View from the camera's world matrix, projection with Vulkan clip-space Y flip
    pub fn new(camera_world: Mat4, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut proj = Mat4::perspective_rh(fov_degrees.to_radians(), aspect, near, far);
        proj.y_axis.y *= -1.0;
        Self {
            view: camera_world.inverse(),
            proj,
        }
    }
}

/// Object uniform (set 1, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: Mat4,
}

/// Material factors uniform (set 2, binding 0)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialFactorsUniform {
    /// Base color tint (RGBA)
    pub base_color: Vec4,
    /// y = roughness, z = metallic (glTF channel layout)
    pub metallic_roughness: Vec4,
}

impl MaterialFactorsUniform {
    pub fn new(base_color: Vec4, metallic: f32, roughness: f32) -> Self {
        Self {
            base_color,
            metallic_roughness: Vec4::new(0.0, roughness, metallic, 0.0),
        }
    }
}

/// Most point lights the camera set exposes to shading
pub const MAX_POINT_LIGHTS: usize = 16;

/// One point light as read by the fragment shader
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightData {
    /// xyz = world position, w = radius
    pub position_radius: Vec4,
    /// rgb = color, a = intensity
    pub color_intensity: Vec4,
}

impl PointLightData {
    pub fn new(position: Vec3, color: Vec3, radius: f32, intensity: f32) -> Self {
        Self {
            position_radius: position.extend(radius),
            color_intensity: color.extend(intensity),
        }
    }
}

/// Point light block (set 0, binding 1, storage buffer)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointLightsUniform {
    pub count: u32,
    pub _padding: [u32; 3],
    pub lights: [PointLightData; MAX_POINT_LIGHTS],
}

impl PointLightsUniform {
    /// Pack up to `MAX_POINT_LIGHTS` lights, ignoring the rest
    pub fn from_lights(lights: &[PointLightData]) -> Self {
        let mut block = Self::zeroed();
        let count = lights.len().min(MAX_POINT_LIGHTS);
        block.lights[..count].copy_from_slice(&lights[..count]);
        block.count = count as u32;
        block
    }

    pub fn active(&self) -> &[PointLightData] {
        &self.lights[..self.count as usize]
    }
}

// ============================================================================
// PerFrameUniform
// ============================================================================

/// One host-visible uniform buffer of `T` per frame slot
pub struct PerFrameUniform<T: Pod> {
    buffers: Vec<Arc<dyn Buffer>>,
    _payload: PhantomData<fn() -> T>,
}

impl<T: Pod> PerFrameUniform<T> {
    /// Create `MAX_FRAMES_IN_FLIGHT` uniform buffers named `label[slot]`
    pub fn new(device: &mut dyn GraphicsDevice, label: &str) -> Result<Self> {
        Self::with_usage(device, label, BufferUsage::Uniform)
    }

    /// Same as `new` with another buffer usage (storage blocks)
    pub fn with_usage(device: &mut dyn GraphicsDevice, label: &str, usage: BufferUsage) -> Result<Self> {
        let buffers = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|slot| {
                device.create_buffer(BufferDesc {
                    name: format!("{}[{}]", label, slot),
                    size: std::mem::size_of::<T>() as u64,
                    usage,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            buffers,
            _payload: PhantomData,
        })
    }

    /// Write `value` into the buffer of `slot`
    ///
    /// The caller must have waited on that slot's fence.
    pub fn write(&self, slot: usize, value: &T) -> Result<()> {
        let buffer = self.buffers.get(slot).ok_or_else(|| {
            Error::InvalidResource(format!(
                "Frame slot {} out of range (max {})",
                slot, MAX_FRAMES_IN_FLIGHT
            ))
        })?;
        buffer.update(0, bytemuck::bytes_of(value))
    }

    pub fn buffer(&self, slot: usize) -> Option<&Arc<dyn Buffer>> {
        self.buffers.get(slot)
    }

    pub fn buffers(&self) -> &[Arc<dyn Buffer>] {
        &self.buffers
    }
}

// ============================================================================
// Binding set allocation
// ============================================================================

/// Allocate one binding set per frame slot, `resources(slot)` supplying the bindings
///
/// Allocation failure (typically pool exhaustion) is logged and yields
/// `None`; the owner is then left without GPU-visible state and must not be
/// drawn. Sets already allocated for earlier slots are dropped, which
/// returns them to the pool.
pub fn allocate_per_frame_sets<'a>(
    device: &mut dyn GraphicsDevice,
    layout: &Arc<dyn BindingLayout>,
    label: &str,
    resources: impl Fn(usize) -> Vec<BindingResource<'a>>,
) -> Option<Vec<Arc<dyn BindingSet>>> {
    let mut sets = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
    for slot in 0..MAX_FRAMES_IN_FLIGHT {
        match device.create_binding_set(layout, &resources(slot)) {
            Ok(set) => sets.push(set),
            Err(e) => {
                crate::engine_error!(
                    "lumen3d::Resources",
                    "Failed to allocate {} binding set for '{}' (slot {}): {}",
                    layout.desc().name, label, slot, e
                );
                return None;
            }
        }
    }
    Some(sets)
}

/// A per-frame uniform plus the binding sets that expose it (object sets)
pub struct PerFrameBinding<T: Pod> {
    uniform: PerFrameUniform<T>,
    sets: Option<Vec<Arc<dyn BindingSet>>>,
}

impl<T: Pod> PerFrameBinding<T> {
    /// Create the buffers and a single-uniform binding set per slot
    ///
    /// Buffer creation failure is an error; binding set failure is not (see
    /// `allocate_per_frame_sets`).
    pub fn new(device: &mut dyn GraphicsDevice, layout: &Arc<dyn BindingLayout>, label: &str) -> Result<Self> {
        let uniform = PerFrameUniform::<T>::new(device, label)?;
        let sets = allocate_per_frame_sets(device, layout, label, |slot| {
            vec![BindingResource::UniformBuffer(uniform.buffers[slot].as_ref())]
        });
        Ok(Self { uniform, sets })
    }

    pub fn uniform(&self) -> &PerFrameUniform<T> {
        &self.uniform
    }

    pub fn write(&self, slot: usize, value: &T) -> Result<()> {
        self.uniform.write(slot, value)
    }

    /// Binding set of `slot`, `None` when allocation failed
    pub fn set(&self, slot: usize) -> Option<&Arc<dyn BindingSet>> {
        self.sets.as_ref().and_then(|sets| sets.get(slot))
    }

    /// Whether binding sets were allocated for every slot
    pub fn is_bound(&self) -> bool {
        self.sets.is_some()
    }
}

/// Camera GPU state: view/projection uniforms and the point light block,
/// both exposed through one camera set per slot
pub struct CameraBinding {
    camera: PerFrameUniform<CameraUniform>,
    lights: PerFrameUniform<PointLightsUniform>,
    sets: Option<Vec<Arc<dyn BindingSet>>>,
}

impl CameraBinding {
    /// Create `label.camera[slot]` and `label.lights[slot]` buffers and the camera sets
    pub fn new(device: &mut dyn GraphicsDevice, layout: &Arc<dyn BindingLayout>, label: &str) -> Result<Self> {
        let camera = PerFrameUniform::<CameraUniform>::new(device, &format!("{}.camera", label))?;
        let lights = PerFrameUniform::<PointLightsUniform>::with_usage(
            device,
            &format!("{}.lights", label),
            BufferUsage::Storage,
        )?;
        let sets = allocate_per_frame_sets(device, layout, label, |slot| {
            vec![
                BindingResource::UniformBuffer(camera.buffers[slot].as_ref()),
                BindingResource::StorageBuffer(lights.buffers[slot].as_ref()),
            ]
        });
        Ok(Self { camera, lights, sets })
    }

    pub fn uniform(&self) -> &PerFrameUniform<CameraUniform> {
        &self.camera
    }

    pub fn lights(&self) -> &PerFrameUniform<PointLightsUniform> {
        &self.lights
    }

    pub fn write(&self, slot: usize, value: &CameraUniform) -> Result<()> {
        self.camera.write(slot, value)
    }

    pub fn write_lights(&self, slot: usize, value: &PointLightsUniform) -> Result<()> {
        self.lights.write(slot, value)
    }

    /// Binding set of `slot`, `None` when allocation failed
    pub fn set(&self, slot: usize) -> Option<&Arc<dyn BindingSet>> {
        self.sets.as_ref().and_then(|sets| sets.get(slot))
    }

    pub fn is_bound(&self) -> bool {
        self.sets.is_some()
    }
}

#[cfg(test)]
#[path = "uniform_buffer_tests.rs"]
mod tests;
