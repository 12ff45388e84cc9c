//! Resource-level mesh types.
//!
//! A `Mesh` is a named, shareable list of primitives. Each primitive owns its
//! immutable vertex and index buffers plus its material: factors, three
//! textures, and one material binding set per frame slot built at load time.
//! Instances never duplicate material state; they only own an object set.
//!
//! # Hierarchy
//!
//! ```text
//! Mesh "Helmet::0"  (Arc, shared by every instance)
//! ├── object_layout (set 1 shape used by instances)
//! └── primitives
//!     ├── [0] vertex/index buffers, factors, textures, material_sets[slot]
//!     └── [1] ...
//! ```

use std::sync::Arc;
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use crate::graphics_device::{
    Buffer, Texture, BindingLayout, BindingSet, BufferFormat, VertexLayout, VertexBinding, VertexAttribute,
};
use crate::render::{PerFrameUniform, MaterialFactorsUniform};

// ============================================================================
// VERTEX
// ============================================================================

/// Interleaved vertex, one UV set per material texture
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub base_color_uv: [f32; 2],
    pub metallic_roughness_uv: [f32; 2],
    pub normal_uv: [f32; 2],
}

impl Vertex {
    /// Vertex input layout matching the shader locations 0..3
    pub fn layout() -> VertexLayout {
        let attribute = |location: u32, format: BufferFormat, offset: usize| VertexAttribute {
            location,
            binding: 0,
            format,
            offset: offset as u32,
        };

        VertexLayout {
            bindings: vec![VertexBinding {
                binding: 0,
                stride: std::mem::size_of::<Vertex>() as u32,
            }],
            attributes: vec![
                attribute(0, BufferFormat::R32G32B32_SFLOAT, std::mem::offset_of!(Vertex, position)),
                attribute(1, BufferFormat::R32G32_SFLOAT, std::mem::offset_of!(Vertex, base_color_uv)),
                attribute(2, BufferFormat::R32G32_SFLOAT, std::mem::offset_of!(Vertex, metallic_roughness_uv)),
                attribute(3, BufferFormat::R32G32_SFLOAT, std::mem::offset_of!(Vertex, normal_uv)),
            ],
        }
    }
}

// ============================================================================
// DESCRIPTORS
// ============================================================================

/// Material scalar factors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialFactors {
    /// Base color tint (RGBA)
    pub base_color: Vec4,
    pub metallic: f32,
    pub roughness: f32,
}

impl Default for MaterialFactors {
    fn default() -> Self {
        Self {
            base_color: Vec4::ONE,
            metallic: 1.0,
            roughness: 1.0,
        }
    }
}

impl MaterialFactors {
    pub fn uniform(&self) -> MaterialFactorsUniform {
        MaterialFactorsUniform::new(self.base_color, self.metallic, self.roughness)
    }
}

/// Optional material textures; `None` binds the fallback texture
#[derive(Clone, Default)]
pub struct PrimitiveTextures {
    pub base_color: Option<Arc<dyn Texture>>,
    pub metallic_roughness: Option<Arc<dyn Texture>>,
    pub normal: Option<Arc<dyn Texture>>,
}

/// Geometry and material of one primitive to load
#[derive(Clone, Default)]
pub struct MeshPrimitiveInfo {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Drawn in the blended, back-to-front pass
    pub transparent: bool,
    pub double_sided: bool,
    pub factors: MaterialFactors,
    pub textures: PrimitiveTextures,
}

/// Everything needed to load a mesh
#[derive(Clone, Default)]
pub struct MeshInfo {
    pub primitives: Vec<MeshPrimitiveInfo>,
}

// ============================================================================
// MESH PRIMITIVE
// ============================================================================

/// One drawable surface with its material
pub struct MeshPrimitive {
    pub(crate) vertex_buffer: Arc<dyn Buffer>,
    pub(crate) index_buffer: Arc<dyn Buffer>,
    pub(crate) vertex_count: u32,
    pub(crate) index_count: u32,
    pub(crate) transparent: bool,
    pub(crate) double_sided: bool,
    pub(crate) factors: MaterialFactors,
    /// Base color, metallic-roughness, normal (fallback already substituted)
    pub(crate) textures: [Arc<dyn Texture>; 3],
    pub(crate) material_uniform: PerFrameUniform<MaterialFactorsUniform>,
    pub(crate) material_sets: Option<Vec<Arc<dyn BindingSet>>>,
}

impl MeshPrimitive {
    pub fn vertex_buffer(&self) -> &Arc<dyn Buffer> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &Arc<dyn Buffer> {
        &self.index_buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    pub fn is_double_sided(&self) -> bool {
        self.double_sided
    }

    pub fn factors(&self) -> &MaterialFactors {
        &self.factors
    }

    pub fn base_color_texture(&self) -> &Arc<dyn Texture> {
        &self.textures[0]
    }

    pub fn metallic_roughness_texture(&self) -> &Arc<dyn Texture> {
        &self.textures[1]
    }

    pub fn normal_texture(&self) -> &Arc<dyn Texture> {
        &self.textures[2]
    }

    pub fn material_uniform(&self) -> &PerFrameUniform<MaterialFactorsUniform> {
        &self.material_uniform
    }

    /// Material binding set of `slot`, `None` when allocation failed at load time
    pub fn material_set(&self, slot: usize) -> Option<&Arc<dyn BindingSet>> {
        self.material_sets.as_ref().and_then(|sets| sets.get(slot))
    }
}

// ============================================================================
// MESH
// ============================================================================

/// Shared collection of primitives
///
/// Instances hold an `Arc<Mesh>`, so the mesh (and its GPU buffers) stays
/// alive until the last instance referencing it is gone.
pub struct Mesh {
    pub(crate) name: String,
    pub(crate) primitives: Vec<MeshPrimitive>,
    pub(crate) object_layout: Arc<dyn BindingLayout>,
}

impl Mesh {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primitives(&self) -> &[MeshPrimitive] {
        &self.primitives
    }

    pub fn primitive(&self, index: usize) -> Option<&MeshPrimitive> {
        self.primitives.get(index)
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    /// Layout every instance's object binding set is allocated from
    pub fn object_layout(&self) -> &Arc<dyn BindingLayout> {
        &self.object_layout
    }

    /// Whether any primitive is drawn in the transparent pass
    pub fn has_transparency(&self) -> bool {
        self.primitives.iter().any(|p| p.transparent)
    }
}
