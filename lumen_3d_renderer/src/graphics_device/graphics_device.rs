/// GraphicsDevice trait - factory for every GPU object the renderer uses

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{
    Buffer, BufferDesc, Texture, TextureDesc, Shader, ShaderDesc,
    BindingLayout, BindingLayoutDesc, BindingSet, BindingResource,
    Pipeline, PipelineDesc,
};

/// Device statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Live buffers created by this device
    pub buffers: u32,
    /// Live textures created by this device
    pub textures: u32,
    /// Live binding sets allocated from the pool
    pub binding_sets_allocated: u32,
    /// Binding set capacity of the pool
    pub binding_set_capacity: u32,
}

/// Central factory interface for creating GPU resources
///
/// Implemented by backends (e.g., VulkanGraphicsDevice). The renderer shares
/// one device as `Arc<Mutex<dyn GraphicsDevice>>` between the resource
/// manager, the scene and the frame controller.
pub trait GraphicsDevice: Send + Sync {
    /// Create a host-visible buffer
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>>;

    /// Create a sampled texture, uploading `desc.data` when present
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Create a shader module
    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>>;

    /// Create a binding layout (shape of a binding set)
    fn create_binding_layout(&mut self, desc: &BindingLayoutDesc) -> Result<Arc<dyn BindingLayout>>;

    /// Allocate a binding set from the device's fixed-size pool and write `resources` into it
    ///
    /// `resources[i]` is written to binding `i` of the layout.
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` when the pool has no room left; the pool never grows.
    fn create_binding_set(
        &mut self,
        layout: &Arc<dyn BindingLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingSet>>;

    /// Create a graphics pipeline
    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>>;

    /// Block until all submitted GPU work has completed
    fn wait_idle(&self) -> Result<()>;

    /// Device statistics
    fn stats(&self) -> DeviceStats;
}
