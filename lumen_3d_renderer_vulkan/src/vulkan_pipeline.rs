/// Pipeline - Vulkan implementation of the Pipeline trait

use lumen_3d_renderer::lumen3d::graphics_device::Pipeline as RendererPipeline;
use ash::vk;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan pipeline implementation
pub struct Pipeline {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan graphics pipeline
    pub(crate) pipeline: vk::Pipeline,
    /// Pipeline layout (used when binding descriptor sets)
    pub(crate) pipeline_layout: vk::PipelineLayout,
    /// Number of descriptor set layouts in the pipeline layout
    pub(crate) set_count: u32,
}

impl Pipeline {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline: vk::Pipeline,
        pipeline_layout: vk::PipelineLayout,
        set_count: u32,
    ) -> Self {
        Self { ctx, pipeline, pipeline_layout, set_count }
    }
}

impl RendererPipeline for Pipeline {
    fn binding_layout_count(&self) -> u32 {
        self.set_count
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_pipeline(self.pipeline, None);
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
    }
}
