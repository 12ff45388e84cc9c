/// Binding layouts, binding sets and the resources written into them
///
/// A binding layout is the shape of one descriptor set (which slots hold a
/// uniform buffer, which hold a texture and sampler). A binding set is an
/// immutable instance of a layout, allocated from the device's fixed pool
/// with concrete resources written at creation.

use bitflags::bitflags;
use crate::graphics_device::{Buffer, Texture, SamplerType};

// ============================================================================
// Binding types and layout description
// ============================================================================

/// Type of resource bound at a given slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingType {
    /// Uniform buffer (read-only structured data)
    UniformBuffer,
    /// Storage buffer (point light array)
    StorageBuffer,
    /// Combined image sampler (texture + sampler in one binding)
    CombinedImageSampler,
}

bitflags! {
    /// Shader stage visibility flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ShaderStageFlags: u32 {
        const VERTEX = 0x01;
        const FRAGMENT = 0x02;
        const VERTEX_FRAGMENT = Self::VERTEX.bits() | Self::FRAGMENT.bits();
    }
}

/// Description of a single binding slot within a layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingSlotDesc {
    /// Binding number (corresponds to `layout(binding = N)` in GLSL)
    pub binding: u32,
    /// Type of resource at this binding
    pub binding_type: BindingType,
    /// Shader stages that access this binding
    pub stage_flags: ShaderStageFlags,
}

/// Description of a binding layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingLayoutDesc {
    /// Debug label ("camera", "object", "material")
    pub name: String,
    /// Descriptor set index the layout is bound at
    pub set_index: u32,
    /// Binding slot descriptions, in binding order
    pub entries: Vec<BindingSlotDesc>,
}

/// Binding layout resource trait
pub trait BindingLayout: Send + Sync {
    /// Description this layout was created from
    fn desc(&self) -> &BindingLayoutDesc;
}

// ============================================================================
// Binding resources (concrete data passed at creation time)
// ============================================================================

/// A concrete resource to bind into a binding set
pub enum BindingResource<'a> {
    /// Uniform buffer binding
    UniformBuffer(&'a dyn Buffer),
    /// Storage buffer binding
    StorageBuffer(&'a dyn Buffer),
    /// Sampled texture (the backend resolves the actual GPU sampler from the type)
    SampledTexture(&'a dyn Texture, SamplerType),
}

impl BindingResource<'_> {
    /// Binding type this resource can be written to
    pub fn binding_type(&self) -> BindingType {
        match self {
            BindingResource::UniformBuffer(_) => BindingType::UniformBuffer,
            BindingResource::StorageBuffer(_) => BindingType::StorageBuffer,
            BindingResource::SampledTexture(_, _) => BindingType::CombinedImageSampler,
        }
    }
}

/// Check that `resources` match the slots of `desc` one-to-one
pub fn check_binding_resources(desc: &BindingLayoutDesc, resources: &[BindingResource]) -> crate::error::Result<()> {
    if desc.entries.len() != resources.len() {
        return Err(crate::error::Error::InvalidResource(format!(
            "Binding layout '{}' expects {} resources, got {}",
            desc.name, desc.entries.len(), resources.len()
        )));
    }
    for (entry, resource) in desc.entries.iter().zip(resources) {
        if entry.binding_type != resource.binding_type() {
            return Err(crate::error::Error::InvalidResource(format!(
                "Binding layout '{}' slot {} expects {:?}, got {:?}",
                desc.name, entry.binding, entry.binding_type, resource.binding_type()
            )));
        }
    }
    Ok(())
}

// ============================================================================
// BindingSet trait
// ============================================================================

/// An immutable set of GPU resource bindings
///
/// Create a new set to change resources. Dropping the last reference
/// returns the set to the device's pool.
pub trait BindingSet: Send + Sync {
    /// Returns the set index this binding set was created for
    fn set_index(&self) -> u32;
}
