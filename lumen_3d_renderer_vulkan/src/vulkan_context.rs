/// GpuContext - Vulkan objects shared by every GPU resource
///
/// Buffers, textures, pipelines, binding sets and the swapchain each hold an
/// `Arc<GpuContext>`. The allocator, the debug messenger, the logical device
/// and the instance are destroyed together when the last holder is dropped,
/// so no resource can outlive the device it was created on.

use ash::vk;
use gpu_allocator::vulkan::Allocator;
use lumen_3d_renderer::lumen3d::{Error, Result};
use lumen_3d_renderer::engine_err;
use std::mem::ManuallyDrop;
use std::sync::atomic::AtomicU32;
use std::sync::{Mutex, MutexGuard};

/// Shared GPU context for all Vulkan resources
pub(crate) struct GpuContext {
    /// Loader entry (keeps the Vulkan library loaded)
    pub(crate) entry: ash::Entry,

    /// Vulkan instance
    pub(crate) instance: ash::Instance,

    /// Selected physical device
    pub(crate) physical_device: vk::PhysicalDevice,

    /// Vulkan logical device
    pub(crate) device: ash::Device,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so its memory blocks are freed BEFORE the device is destroyed
    pub(crate) allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue and its family
    pub(crate) graphics_queue: vk::Queue,
    pub(crate) graphics_queue_family: u32,

    /// Present queue and its family (may be the graphics queue)
    pub(crate) present_queue: vk::Queue,
    pub(crate) present_queue_family: u32,

    /// Command pool for one-shot upload operations (TRANSIENT + RESET_COMMAND_BUFFER)
    pub(crate) upload_command_pool: Mutex<vk::CommandPool>,

    /// Largest anisotropy the device supports, None when the feature is not enabled
    pub(crate) max_anisotropy: Option<f32>,

    /// Live buffer and texture counters (reported through DeviceStats)
    pub(crate) live_buffers: AtomicU32,
    pub(crate) live_textures: AtomicU32,

    /// Validation messenger (only when validation layers are enabled)
    pub(crate) debug_messenger: Option<(ash::ext::debug_utils::Instance, vk::DebugUtilsMessengerEXT)>,
}

impl GpuContext {
    /// Lock the GPU allocator
    pub(crate) fn allocator(&self) -> Result<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| Error::BackendError("GPU allocator mutex poisoned".to_string()))
    }

    /// Record a one-shot command buffer, submit it on the graphics queue and
    /// block until it has completed
    pub(crate) fn submit_one_shot<F>(&self, record: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        let pool = self.upload_command_pool
            .lock()
            .map_err(|_| Error::BackendError("Upload command pool mutex poisoned".to_string()))?;

        unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = self.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to allocate upload command buffer: {:?}", e))?[0];

            let result = (|| -> Result<()> {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to begin upload command buffer: {:?}", e))?;

                record(&self.device, command_buffer);

                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to end upload command buffer: {:?}", e))?;

                let command_buffers = [command_buffer];
                let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
                self.device.queue_submit(self.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to submit upload commands: {:?}", e))?;

                self.device.queue_wait_idle(self.graphics_queue)
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to wait for upload completion: {:?}", e))
            })();

            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            if let Ok(pool) = self.upload_command_pool.get_mut() {
                if *pool != vk::CommandPool::null() {
                    self.device.destroy_command_pool(*pool, None);
                    *pool = vk::CommandPool::null();
                }
            }

            // Free VkDeviceMemory pages before the device goes away
            ManuallyDrop::drop(&mut self.allocator);

            if let Some((debug_utils, messenger)) = self.debug_messenger.take() {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
