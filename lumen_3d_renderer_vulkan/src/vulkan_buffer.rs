/// Buffer - Vulkan implementation of the Buffer trait

use lumen_3d_renderer::lumen3d::Result;
use lumen_3d_renderer::lumen3d::graphics_device::{Buffer as RendererBuffer, check_buffer_write};
use lumen_3d_renderer::engine_err;
use ash::vk;
use gpu_allocator::vulkan::Allocation;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan buffer implementation
///
/// Always allocated in host-visible (CpuToGpu) memory and persistently mapped.
pub struct Buffer {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan buffer
    pub(crate) buffer: vk::Buffer,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Buffer size in bytes
    size: u64,
}

impl Buffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        buffer: vk::Buffer,
        allocation: Allocation,
        size: u64,
    ) -> Self {
        ctx.live_buffers.fetch_add(1, Ordering::Relaxed);
        Self {
            ctx,
            buffer,
            allocation: Some(allocation),
            size,
        }
    }
}

impl RendererBuffer for Buffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_buffer_write(self.size, offset, data.len())?;

        let allocation = self.allocation
            .as_ref()
            .ok_or_else(|| engine_err!("lumen3d::vulkan", "Buffer update failed: no GPU allocation"))?;

        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| engine_err!("lumen3d::vulkan", "Buffer update failed: memory is not host-visible"))?
            .as_ptr() as *mut u8;

        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                mapped_ptr.add(offset as usize),
                data.len(),
            );
        }

        Ok(())
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                // Don't panic if the lock fails, the buffer still has to be destroyed
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_buffer(self.buffer, None);
        }
        self.ctx.live_buffers.fetch_sub(1, Ordering::Relaxed);
    }
}
