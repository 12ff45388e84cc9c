/// CommandList - Vulkan implementation of the CommandList trait
///
/// Wraps one primary command buffer owned by the swapchain's command pool.
/// The swapchain opens and closes the render pass around the draw commands.

use lumen_3d_renderer::lumen3d::{Error, Result};
use lumen_3d_renderer::lumen3d::graphics_device::{
    CommandList as RendererCommandList,
    Pipeline as RendererPipeline,
    Buffer as RendererBuffer,
    BindingSet as RendererBindingSet,
    IndexType, Viewport, Rect2D,
};
use lumen_3d_renderer::{engine_bail, engine_err};
use ash::vk;
use std::sync::Arc;

use crate::vulkan::index_type_to_vk;
use crate::vulkan_binding::BindingSet;
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_pipeline::Pipeline;

/// Vulkan command list implementation
pub struct CommandList {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Command buffer for recording
    command_buffer: vk::CommandBuffer,
    /// Whether the command list is currently recording
    is_recording: bool,
}

impl CommandList {
    pub(crate) fn new(ctx: Arc<GpuContext>, command_buffer: vk::CommandBuffer) -> Self {
        Self {
            ctx,
            command_buffer,
            is_recording: false,
        }
    }

    /// Get the underlying Vulkan command buffer
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Reset the command buffer and start recording
    ///
    /// A recording left open by a dropped frame is discarded by the reset.
    pub(crate) fn begin(&mut self) -> Result<()> {
        self.is_recording = false;

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);

            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        Ok(())
    }

    /// Finish recording
    pub(crate) fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to end command buffer: {:?}", e))?;
        }

        self.is_recording = false;
        Ok(())
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.is_recording {
            Ok(())
        } else {
            Err(Error::BackendError("Command list not recording".to_string()))
        }
    }
}

impl RendererCommandList for CommandList {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.ensure_recording()?;

        let vk_viewport = vk::Viewport::default()
            .x(viewport.x)
            .y(viewport.y)
            .width(viewport.width)
            .height(viewport.height)
            .min_depth(viewport.min_depth)
            .max_depth(viewport.max_depth);

        unsafe {
            self.ctx.device.cmd_set_viewport(self.command_buffer, 0, &[vk_viewport]);
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.ensure_recording()?;

        let vk_scissor = vk::Rect2D::default()
            .offset(vk::Offset2D { x: scissor.x, y: scissor.y })
            .extent(vk::Extent2D { width: scissor.width, height: scissor.height });

        unsafe {
            self.ctx.device.cmd_set_scissor(self.command_buffer, 0, &[vk_scissor]);
        }
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn RendererPipeline>) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            let vk_pipeline = pipeline.as_ref() as *const dyn RendererPipeline as *const Pipeline;
            let vk_pipeline = &*vk_pipeline;

            self.ctx.device.cmd_bind_pipeline(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline,
            );
        }
        Ok(())
    }

    fn bind_binding_set(
        &mut self,
        pipeline: &Arc<dyn RendererPipeline>,
        set_index: u32,
        binding_set: &Arc<dyn RendererBindingSet>,
    ) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            let vk_pipeline = pipeline.as_ref() as *const dyn RendererPipeline as *const Pipeline;
            let vk_pipeline = &*vk_pipeline;

            if set_index >= vk_pipeline.set_count {
                engine_bail!("lumen3d::vulkan",
                    "bind_binding_set: set_index {} out of range (pipeline has {} layouts)",
                    set_index, vk_pipeline.set_count);
            }

            let vk_set = binding_set.as_ref() as *const dyn RendererBindingSet as *const BindingSet;
            let vk_set = &*vk_set;

            self.ctx.device.cmd_bind_descriptor_sets(
                self.command_buffer,
                vk::PipelineBindPoint::GRAPHICS,
                vk_pipeline.pipeline_layout,
                set_index,
                &[vk_set.descriptor_set],
                &[],
            );
        }
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            let vk_buffer = buffer.as_ref() as *const dyn RendererBuffer as *const Buffer;
            let vk_buffer = &*vk_buffer;

            self.ctx.device.cmd_bind_vertex_buffers(
                self.command_buffer,
                0,
                &[vk_buffer.buffer],
                &[offset],
            );
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn RendererBuffer>, offset: u64, index_type: IndexType) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            let vk_buffer = buffer.as_ref() as *const dyn RendererBuffer as *const Buffer;
            let vk_buffer = &*vk_buffer;

            self.ctx.device.cmd_bind_index_buffer(
                self.command_buffer,
                vk_buffer.buffer,
                offset,
                index_type_to_vk(index_type),
            );
        }
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.ensure_recording()?;

        unsafe {
            self.ctx.device.cmd_draw_indexed(
                self.command_buffer,
                index_count,
                1,
                first_index,
                vertex_offset,
                0,
            );
        }
        Ok(())
    }
}
