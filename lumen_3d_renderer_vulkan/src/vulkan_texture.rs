/// Texture - Vulkan implementation of the Texture trait
///
/// Also used for the swapchain's depth attachment, which is a texture the
/// device never hands out.

use lumen_3d_renderer::lumen3d::{Error, Result};
use lumen_3d_renderer::lumen3d::graphics_device::{Texture as RendererTexture, TextureInfo};
use lumen_3d_renderer::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Vulkan texture implementation
pub struct Texture {
    /// Shared GPU context
    ctx: Arc<GpuContext>,
    /// Vulkan image
    pub(crate) image: vk::Image,
    /// Vulkan image view
    pub(crate) view: vk::ImageView,
    /// GPU memory allocation
    allocation: Option<Allocation>,
    /// Read-only texture properties
    info: TextureInfo,
    /// Counted in DeviceStats (sampled textures only)
    tracked: bool,
}

impl Texture {
    /// Create a GPU-only 2D image with one mip level and a view on it
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `name` - Allocation label
    /// * `info` - Size and engine-side format
    /// * `format` - Vulkan format matching `info.format`
    /// * `usage` - Vulkan image usage
    /// * `aspect_mask` - COLOR for sampled images, DEPTH for depth attachments
    pub(crate) fn create(
        ctx: Arc<GpuContext>,
        name: &str,
        info: TextureInfo,
        format: vk::Format,
        usage: vk::ImageUsageFlags,
        aspect_mask: vk::ImageAspectFlags,
    ) -> Result<Self> {
        unsafe {
            let image_create_info = vk::ImageCreateInfo::default()
                .image_type(vk::ImageType::TYPE_2D)
                .format(format)
                .extent(vk::Extent3D {
                    width: info.width,
                    height: info.height,
                    depth: 1,
                })
                .mip_levels(1)
                .array_layers(1)
                .samples(vk::SampleCountFlags::TYPE_1)
                .tiling(vk::ImageTiling::OPTIMAL)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE)
                .initial_layout(vk::ImageLayout::UNDEFINED);

            let image = ctx.device.create_image(&image_create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create image '{}': {:?}", name, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);

            let allocation = ctx.allocator()
                .and_then(|mut allocator| {
                    allocator.allocate(&AllocationCreateDesc {
                        name,
                        requirements,
                        location: MemoryLocation::GpuOnly,
                        linear: false,
                        allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                    })
                    .map_err(|_| {
                        let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                        engine_error!("lumen3d::vulkan",
                            "Out of GPU memory for image '{}' ({}x{}, {:.2} MB)",
                            name, info.width, info.height, size_mb);
                        Error::OutOfMemory
                    })
                });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    return Err(e);
                }
            };

            // From here on, Drop releases whatever has been created
            let mut texture = Self {
                ctx: Arc::clone(&ctx),
                image,
                view: vk::ImageView::null(),
                allocation: None,
                info,
                tracked: false,
            };

            let (memory, offset) = (allocation.memory(), allocation.offset());
            texture.allocation = Some(allocation);
            ctx.device.bind_image_memory(image, memory, offset)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to bind image memory for '{}': {:?}", name, e))?;

            let view_create_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping {
                    r: vk::ComponentSwizzle::IDENTITY,
                    g: vk::ComponentSwizzle::IDENTITY,
                    b: vk::ComponentSwizzle::IDENTITY,
                    a: vk::ComponentSwizzle::IDENTITY,
                })
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });

            texture.view = ctx.device.create_image_view(&view_create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create image view for '{}': {:?}", name, e))?;

            Ok(texture)
        }
    }

    /// Count this texture in the device statistics until it is dropped
    pub(crate) fn track(mut self) -> Self {
        if !self.tracked {
            self.ctx.live_textures.fetch_add(1, Ordering::Relaxed);
            self.tracked = true;
        }
        self
    }
}

impl RendererTexture for Texture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            if self.view != vk::ImageView::null() {
                self.ctx.device.destroy_image_view(self.view, None);
            }

            if let Some(allocation) = self.allocation.take() {
                if let Ok(mut allocator) = self.ctx.allocator.lock() {
                    allocator.free(allocation).ok();
                }
            }

            self.ctx.device.destroy_image(self.image, None);
        }
        if self.tracked {
            self.ctx.live_textures.fetch_sub(1, Ordering::Relaxed);
        }
    }
}
