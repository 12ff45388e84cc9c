/// Swapchain - Vulkan implementation of the Swapchain trait
///
/// Owns the presentable images and their views, the depth attachment, the
/// frame render pass and one framebuffer per image, plus for each frame slot
/// a command buffer, an in-flight fence and the image-available and
/// render-finished semaphores.

use lumen_3d_renderer::lumen3d::{Error, Result, MAX_FRAMES_IN_FLIGHT};
use lumen_3d_renderer::lumen3d::graphics_device::{
    Swapchain as RendererSwapchain,
    CommandList as RendererCommandList,
    AcquireOutcome, PresentOutcome, TextureFormat, TextureInfo,
};
use lumen_3d_renderer::{engine_bail, engine_debug, engine_err, engine_error, engine_info};
use ash::vk;
use std::sync::Arc;

use crate::vulkan::{texture_format_to_vk, vk_to_texture_format};
use crate::vulkan_command_list::CommandList;
use crate::vulkan_context::GpuContext;
use crate::vulkan_texture::Texture;

/// Depth attachment format
const DEPTH_FORMAT: TextureFormat = TextureFormat::D32_FLOAT;

// ============================================================================
// Surface negotiation helpers
// ============================================================================

/// Pick the surface format: BGRA8/RGBA8 sRGB with the sRGB non-linear color
/// space when offered, otherwise the first format the surface reports
pub(crate) fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .find(|f| {
            (f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
                && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR
        })
        .or_else(|| formats.first())
        .copied()
}

/// Pick the present mode: FIFO with vsync, otherwise MAILBOX, then IMMEDIATE,
/// falling back to FIFO (always supported)
pub(crate) fn choose_present_mode(modes: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| modes.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Swapchain extent: the surface's current extent when it is fixed, otherwise
/// the drawable size clamped to the supported range
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One image more than the minimum, capped by the maximum (0 = no maximum)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Create the frame render pass: one color attachment cleared and handed to
/// presentation, one depth attachment cleared and discarded
///
/// Pipelines are created against a render pass built by this same function
/// with the same formats, which makes them compatible with the swapchain's.
pub(crate) fn create_frame_render_pass(
    device: &ash::Device,
    color_format: vk::Format,
    depth_format: vk::Format,
) -> Result<vk::RenderPass> {
    let attachments = [
        vk::AttachmentDescription::default()
            .format(color_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR),
        vk::AttachmentDescription::default()
            .format(depth_format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::DONT_CARE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
    ];

    let color_attachment_ref = vk::AttachmentReference::default()
        .attachment(0)
        .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    let depth_attachment_ref = vk::AttachmentReference::default()
        .attachment(1)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(std::slice::from_ref(&color_attachment_ref))
        .depth_stencil_attachment(&depth_attachment_ref);

    let stages = vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT
        | vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS;
    let dependency = vk::SubpassDependency::default()
        .src_subpass(vk::SUBPASS_EXTERNAL)
        .dst_subpass(0)
        .src_stage_mask(stages)
        .src_access_mask(vk::AccessFlags::empty())
        .dst_stage_mask(stages)
        .dst_access_mask(
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
        );

    let render_pass_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(std::slice::from_ref(&dependency));

    unsafe {
        device.create_render_pass(&render_pass_info, None)
            .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create frame render pass: {:?}", e))
    }
}

// ============================================================================
// Swapchain
// ============================================================================

/// Per-slot synchronization primitives
struct FrameSync {
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

/// Vulkan swapchain implementation
pub struct Swapchain {
    /// Shared GPU context
    ctx: Arc<GpuContext>,

    /// Surface
    surface: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,

    /// Swapchain and its images
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    surface_format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    vsync: bool,

    /// Depth attachment matching the extent
    depth: Option<Texture>,

    /// Frame render pass and one framebuffer per swapchain image
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,

    /// Per-slot command buffers
    command_pool: vk::CommandPool,
    command_lists: Vec<CommandList>,

    /// Per-slot fences and semaphores
    sync: Vec<FrameSync>,
}

impl Swapchain {
    /// Create a swapchain on `surface`
    ///
    /// # Arguments
    ///
    /// * `ctx` - Shared GPU context
    /// * `surface` - Window surface (owned by the swapchain from now on)
    /// * `surface_loader` - Surface extension loader
    /// * `width` / `height` - Drawable size used when the surface leaves the extent open
    /// * `vsync` - Present mode preference
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        surface: vk::SurfaceKHR,
        surface_loader: ash::khr::surface::Instance,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        let surface_formats = unsafe {
            surface_loader
                .get_physical_device_surface_formats(ctx.physical_device, surface)
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to query surface formats: {:?}", e);
                    Error::InitializationFailed(format!("Failed to get surface formats: {:?}", e))
                })?
        };

        let surface_format = choose_surface_format(&surface_formats)
            .ok_or_else(|| {
                engine_error!("lumen3d::vulkan", "Surface reports no formats");
                Error::InitializationFailed("Surface reports no formats".to_string())
            })?;

        let swapchain_loader = ash::khr::swapchain::Device::new(&ctx.instance, &ctx.device);

        let render_pass = create_frame_render_pass(
            &ctx.device,
            surface_format.format,
            texture_format_to_vk(DEPTH_FORMAT),
        )?;

        let command_pool = unsafe {
            let pool_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            ctx.device.create_command_pool(&pool_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create frame command pool: {:?}", e))?
        };

        let mut swapchain = Self {
            ctx: Arc::clone(&ctx),
            surface,
            surface_loader,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            surface_format,
            extent: vk::Extent2D { width, height },
            vsync,
            depth: None,
            render_pass,
            framebuffers: Vec::new(),
            command_pool,
            command_lists: Vec::new(),
            sync: Vec::new(),
        };

        let command_buffers = unsafe {
            let allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(MAX_FRAMES_IN_FLIGHT as u32);
            ctx.device.allocate_command_buffers(&allocate_info)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to allocate frame command buffers: {:?}", e))?
        };
        swapchain.command_lists = command_buffers
            .into_iter()
            .map(|cb| CommandList::new(Arc::clone(&ctx), cb))
            .collect();

        swapchain.build(width, height)?;
        swapchain.sync = swapchain.create_sync()?;

        engine_info!("lumen3d::vulkan",
            "Swapchain created: {}x{}, {} images, format {:?}",
            swapchain.extent.width, swapchain.extent.height,
            swapchain.images.len(), swapchain.surface_format.format);

        Ok(swapchain)
    }

    /// Frame render pass (for callers recording their own passes)
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Build (or rebuild, retiring the old handle) the swapchain, its image
    /// views, the depth attachment and the framebuffers
    fn build(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let capabilities = self.surface_loader
                .get_physical_device_surface_capabilities(self.ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to get surface capabilities: {:?}", e))?;

            let present_modes = self.surface_loader
                .get_physical_device_surface_present_modes(self.ctx.physical_device, self.surface)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to get surface present modes: {:?}", e))?;

            let extent = choose_extent(&capabilities, width, height);
            let present_mode = choose_present_mode(&present_modes, self.vsync);

            let queue_families = [self.ctx.graphics_queue_family, self.ctx.present_queue_family];
            let old_swapchain = self.swapchain;
            let mut create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities))
                .image_format(self.surface_format.format)
                .image_color_space(self.surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            create_info = if self.ctx.graphics_queue_family != self.ctx.present_queue_family {
                create_info
                    .image_sharing_mode(vk::SharingMode::CONCURRENT)
                    .queue_family_indices(&queue_families)
            } else {
                create_info.image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            };

            let swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create swapchain: {:?}", e))?;

            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;
            self.extent = extent;

            self.images = self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to get swapchain images: {:?}", e))?;

            for &image in &self.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(self.surface_format.format)
                    .components(vk::ComponentMapping {
                        r: vk::ComponentSwizzle::IDENTITY,
                        g: vk::ComponentSwizzle::IDENTITY,
                        b: vk::ComponentSwizzle::IDENTITY,
                        a: vk::ComponentSwizzle::IDENTITY,
                    })
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });

                let view = self.ctx.device.create_image_view(&view_info, None)
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create swapchain image view: {:?}", e))?;
                self.image_views.push(view);
            }

            let depth = Texture::create(
                Arc::clone(&self.ctx),
                "swapchain_depth",
                TextureInfo {
                    width: extent.width,
                    height: extent.height,
                    format: DEPTH_FORMAT,
                },
                texture_format_to_vk(DEPTH_FORMAT),
                vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
                vk::ImageAspectFlags::DEPTH,
            )?;

            for &color_view in &self.image_views {
                let attachments = [color_view, depth.view];
                let framebuffer_info = vk::FramebufferCreateInfo::default()
                    .render_pass(self.render_pass)
                    .attachments(&attachments)
                    .width(extent.width)
                    .height(extent.height)
                    .layers(1);

                let framebuffer = self.ctx.device.create_framebuffer(&framebuffer_info, None)
                    .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create framebuffer: {:?}", e))?;
                self.framebuffers.push(framebuffer);
            }
            self.depth = Some(depth);

            Ok(())
        }
    }

    /// Destroy framebuffers, the depth attachment and the image views
    /// (the swapchain handle itself is retired by the next `build`)
    fn destroy_images(&mut self) {
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                self.ctx.device.destroy_framebuffer(framebuffer, None);
            }
            self.depth = None;
            for view in self.image_views.drain(..) {
                self.ctx.device.destroy_image_view(view, None);
            }
        }
        self.images.clear();
    }

    /// Create one fence (signaled) and two semaphores per frame slot
    fn create_sync(&self) -> Result<Vec<FrameSync>> {
        let semaphore_info = vk::SemaphoreCreateInfo::default();
        let fence_info = vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED);

        let mut sync = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            let frame = unsafe {
                FrameSync {
                    image_available: self.ctx.device.create_semaphore(&semaphore_info, None)
                        .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create image-available semaphore: {:?}", e))?,
                    render_finished: self.ctx.device.create_semaphore(&semaphore_info, None)
                        .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create render-finished semaphore: {:?}", e))?,
                    in_flight: self.ctx.device.create_fence(&fence_info, None)
                        .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create in-flight fence: {:?}", e))?,
                }
            };
            sync.push(frame);
        }
        Ok(sync)
    }

    fn destroy_sync(&mut self) {
        unsafe {
            for frame in self.sync.drain(..) {
                self.ctx.device.destroy_semaphore(frame.image_available, None);
                self.ctx.device.destroy_semaphore(frame.render_finished, None);
                self.ctx.device.destroy_fence(frame.in_flight, None);
            }
        }
    }

    fn frame_sync(&self, slot: usize) -> Result<&FrameSync> {
        self.sync
            .get(slot)
            .ok_or_else(|| Error::InvalidResource(format!(
                "Frame slot {} out of range (frames in flight: {})", slot, MAX_FRAMES_IN_FLIGHT
            )))
    }

    fn command_list_mut(&mut self, slot: usize) -> Result<&mut CommandList> {
        self.command_lists
            .get_mut(slot)
            .ok_or_else(|| Error::InvalidResource(format!(
                "Frame slot {} out of range (frames in flight: {})", slot, MAX_FRAMES_IN_FLIGHT
            )))
    }
}

impl RendererSwapchain for Swapchain {
    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        let fence = self.frame_sync(slot)?.in_flight;
        unsafe {
            self.ctx.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to wait for in-flight fence {}: {:?}", slot, e))
        }
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        let semaphore = self.frame_sync(slot)?.image_available;
        let result = unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                semaphore,
                vk::Fence::null(),
            )
        };

        match result {
            // A suboptimal acquire still signals the semaphore; present reports it
            Ok((image_index, _suboptimal)) => Ok(AcquireOutcome::Image(image_index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                engine_debug!("lumen3d::vulkan", "Swapchain out of date during acquire");
                Ok(AcquireOutcome::OutOfDate)
            }
            Err(e) => Err(engine_err!("lumen3d::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
        }
    }

    fn begin_commands(&mut self, slot: usize, image_index: u32, clear_color: [f32; 4]) -> Result<()> {
        let framebuffer = match self.framebuffers.get(image_index as usize) {
            Some(&framebuffer) => framebuffer,
            None => engine_bail!("lumen3d::vulkan",
                "begin_commands: image_index {} out of range (count: {})",
                image_index, self.framebuffers.len()),
        };
        let render_pass = self.render_pass;
        let extent = self.extent;
        let device = self.ctx.device.clone();

        let cmd = self.command_list_mut(slot)?;
        cmd.begin()?;

        let clear_values = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let render_pass_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent,
            })
            .clear_values(&clear_values);

        unsafe {
            device.cmd_begin_render_pass(
                cmd.command_buffer(),
                &render_pass_info,
                vk::SubpassContents::INLINE,
            );
        }
        Ok(())
    }

    fn command_list(&mut self, slot: usize) -> &mut dyn RendererCommandList {
        &mut self.command_lists[slot]
    }

    fn end_commands(&mut self, slot: usize) -> Result<()> {
        let device = self.ctx.device.clone();
        let cmd = self.command_list_mut(slot)?;
        unsafe {
            device.cmd_end_render_pass(cmd.command_buffer());
        }
        cmd.end()
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        let fence = self.frame_sync(slot)?.in_flight;
        unsafe {
            self.ctx.device
                .reset_fences(&[fence])
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to reset in-flight fence {}: {:?}", slot, e))
        }
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()> {
        if image_index as usize >= self.images.len() {
            engine_bail!("lumen3d::vulkan",
                "submit: image_index {} out of range (count: {})", image_index, self.images.len());
        }

        let sync = self.frame_sync(slot)?;
        let wait_semaphores = [sync.image_available];
        let signal_semaphores = [sync.render_finished];
        let fence = sync.in_flight;
        let command_buffers = [self.command_lists[slot].command_buffer()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores);

        unsafe {
            self.ctx.device
                .queue_submit(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to submit frame {}: {:?}", slot, e))
        }
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        let wait_semaphores = [self.frame_sync(slot)?.render_finished];
        let swapchains = [self.swapchain];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let result = unsafe {
            self.swapchain_loader.queue_present(self.ctx.present_queue, &present_info)
        };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) => Ok(PresentOutcome::Suboptimal),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(PresentOutcome::OutOfDate),
            Err(e) => Err(engine_err!("lumen3d::vulkan", "Failed to present swapchain image: {:?}", e)),
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        // Semaphores may still be pending on the retired swapchain, so every
        // sync object is replaced along with the images
        self.destroy_sync();
        self.destroy_images();
        self.build(width, height)?;
        self.sync = self.create_sync()?;

        engine_info!("lumen3d::vulkan",
            "Swapchain recreated: {}x{}, {} images",
            self.extent.width, self.extent.height, self.images.len());
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        (self.extent.width, self.extent.height)
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn color_format(&self) -> TextureFormat {
        vk_to_texture_format(self.surface_format.format).unwrap_or(TextureFormat::B8G8R8A8_SRGB)
    }

    fn depth_format(&self) -> TextureFormat {
        DEPTH_FORMAT
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.device_wait_idle().ok();
        }

        self.destroy_sync();
        self.destroy_images();

        unsafe {
            self.command_lists.clear();
            self.ctx.device.destroy_command_pool(self.command_pool, None);
            self.ctx.device.destroy_render_pass(self.render_pass, None);
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
        }
    }
}

#[cfg(test)]
#[path = "vulkan_swapchain_tests.rs"]
mod tests;
