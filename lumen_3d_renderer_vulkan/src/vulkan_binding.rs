/// Binding layouts, the fixed descriptor pool and binding sets
///
/// The pool is sized once from `RendererConfig::descriptor_pool_size` and
/// never grows: running out is reported as `Error::PoolExhausted`. A set is
/// freed back to the pool when its last reference drops; the pool itself is
/// destroyed once the device and every binding set holding it are gone.

use lumen_3d_renderer::lumen3d::{Error, Result};
use lumen_3d_renderer::lumen3d::graphics_device::{
    BindingLayout as RendererBindingLayout, BindingLayoutDesc,
    BindingSet as RendererBindingSet,
};
use lumen_3d_renderer::{engine_err, engine_error, engine_warn};
use ash::vk;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

// ============================================================================
// BindingLayout
// ============================================================================

/// Vulkan binding layout (VkDescriptorSetLayout)
pub struct BindingLayout {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::DescriptorSetLayout,
    desc: BindingLayoutDesc,
}

impl BindingLayout {
    pub(crate) fn new(ctx: Arc<GpuContext>, layout: vk::DescriptorSetLayout, desc: BindingLayoutDesc) -> Self {
        Self { ctx, layout, desc }
    }
}

impl RendererBindingLayout for BindingLayout {
    fn desc(&self) -> &BindingLayoutDesc {
        &self.desc
    }
}

impl Drop for BindingLayout {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

// ============================================================================
// DescriptorPool
// ============================================================================

/// Descriptors reserved per binding set: one uniform buffer, one storage
/// buffer (camera point lights) and up to three combined image samplers (the
/// material layout is the largest)
const UNIFORM_BUFFERS_PER_SET: u32 = 1;
const STORAGE_BUFFERS_PER_SET: u32 = 1;
const IMAGE_SAMPLERS_PER_SET: u32 = 3;

/// Pool sizes for a pool that can hold `capacity` binding sets
pub(crate) fn descriptor_pool_sizes(capacity: u32) -> [vk::DescriptorPoolSize; 3] {
    [
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::UNIFORM_BUFFER,
            descriptor_count: capacity.saturating_mul(UNIFORM_BUFFERS_PER_SET).max(1),
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::STORAGE_BUFFER,
            descriptor_count: capacity.saturating_mul(STORAGE_BUFFERS_PER_SET).max(1),
        },
        vk::DescriptorPoolSize {
            ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            descriptor_count: capacity.saturating_mul(IMAGE_SAMPLERS_PER_SET).max(1),
        },
    ]
}

/// Fixed-capacity descriptor pool
pub(crate) struct DescriptorPool {
    ctx: Arc<GpuContext>,
    pool: vk::DescriptorPool,
    capacity: u32,
    allocated: AtomicU32,
}

impl DescriptorPool {
    pub(crate) fn new(ctx: Arc<GpuContext>, capacity: u32) -> Result<Self> {
        let pool_sizes = descriptor_pool_sizes(capacity);
        let info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
            .pool_sizes(&pool_sizes)
            .max_sets(capacity.max(1));

        let pool = unsafe {
            ctx.device.create_descriptor_pool(&info, None)
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to create descriptor pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create descriptor pool: {:?}", e))
                })?
        };

        Ok(Self {
            ctx,
            pool,
            capacity,
            allocated: AtomicU32::new(0),
        })
    }

    /// Maximum number of binding sets
    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Live binding sets
    pub(crate) fn allocated(&self) -> u32 {
        self.allocated.load(Ordering::Relaxed)
    }

    /// Allocate one descriptor set of `layout`
    ///
    /// # Errors
    ///
    /// `Error::PoolExhausted` when the capacity is reached or the driver
    /// reports the pool out of memory.
    pub(crate) fn allocate(&self, layout: vk::DescriptorSetLayout, label: &str) -> Result<vk::DescriptorSet> {
        if self.allocated() >= self.capacity {
            engine_warn!("lumen3d::vulkan",
                "Descriptor pool exhausted ({} sets), cannot allocate '{}' binding set",
                self.capacity, label);
            return Err(Error::PoolExhausted(format!(
                "descriptor pool full ({} sets) while allocating '{}'", self.capacity, label
            )));
        }

        let layouts = [layout];
        let allocate_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        match unsafe { self.ctx.device.allocate_descriptor_sets(&allocate_info) } {
            Ok(sets) => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                Ok(sets[0])
            }
            Err(vk::Result::ERROR_OUT_OF_POOL_MEMORY) | Err(vk::Result::ERROR_FRAGMENTED_POOL) => {
                engine_warn!("lumen3d::vulkan",
                    "Descriptor pool out of memory after {} sets, cannot allocate '{}' binding set",
                    self.allocated(), label);
                Err(Error::PoolExhausted(format!(
                    "descriptor pool out of memory while allocating '{}'", label
                )))
            }
            Err(e) => Err(engine_err!("lumen3d::vulkan",
                "Failed to allocate '{}' binding set: {:?}", label, e)),
        }
    }

    /// Return one set to the pool
    ///
    /// The caller guarantees no pending command buffer still reads `set`.
    pub(crate) fn free(&self, set: vk::DescriptorSet) {
        match unsafe { self.ctx.device.free_descriptor_sets(self.pool, &[set]) } {
            Ok(()) => {
                self.allocated.fetch_sub(1, Ordering::Relaxed);
            }
            Err(e) => {
                engine_error!("lumen3d::vulkan", "Failed to free binding set: {:?}", e);
            }
        }
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

// ============================================================================
// BindingSet
// ============================================================================

/// Vulkan binding set (VkDescriptorSet allocated from the device's pool)
pub struct BindingSet {
    /// Keeps the pool alive while the set can still be bound
    pool: Arc<DescriptorPool>,
    pub(crate) descriptor_set: vk::DescriptorSet,
    set_index: u32,
}

impl BindingSet {
    pub(crate) fn new(pool: Arc<DescriptorPool>, descriptor_set: vk::DescriptorSet, set_index: u32) -> Self {
        Self {
            pool,
            descriptor_set,
            set_index,
        }
    }
}

impl RendererBindingSet for BindingSet {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for BindingSet {
    fn drop(&mut self) {
        self.pool.free(self.descriptor_set);
    }
}
