/// VulkanGraphicsDevice - Vulkan implementation of the GraphicsDevice trait
///
/// Creates the instance, picks a physical device able to present to the
/// window, and owns the fixed descriptor pool and the sampler cache. Every
/// object it creates shares the device's `GpuContext`.

use lumen_3d_renderer::lumen3d::{Error, Result, RendererConfig};
use lumen_3d_renderer::lumen3d::graphics_device::{
    GraphicsDevice, DeviceStats,
    Buffer as RendererBuffer, BufferDesc, BufferUsage, BufferFormat,
    Texture as RendererTexture, TextureDesc, TextureFormat, TextureInfo,
    Shader as RendererShader, ShaderDesc, ShaderStage,
    BindingLayout as RendererBindingLayout, BindingLayoutDesc, BindingSet as RendererBindingSet,
    BindingResource, BindingType, ShaderStageFlags, check_binding_resources,
    Pipeline as RendererPipeline, PipelineDesc,
    PrimitiveTopology, IndexType, CullMode, FrontFace, CompareOp, BlendFactor, BlendOp,
};
use lumen_3d_renderer::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator, AllocatorCreateDesc};
use gpu_allocator::MemoryLocation;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use std::ffi::{CStr, CString};
use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use winit::window::Window;

use crate::vulkan_binding::{BindingLayout, BindingSet, DescriptorPool};
use crate::vulkan_buffer::Buffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_pipeline::Pipeline;
use crate::vulkan_sampler::SamplerCache;
use crate::vulkan_shader::Shader;
use crate::vulkan_swapchain::{create_frame_render_pass, Swapchain};
use crate::vulkan_texture::Texture;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

// ============================================================================
// Format and state conversions
// ============================================================================

/// Convert TextureFormat to Vulkan format
pub(crate) fn texture_format_to_vk(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        TextureFormat::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::D32_FLOAT => vk::Format::D32_SFLOAT,
    }
}

/// Convert a Vulkan format back to a TextureFormat, None for formats the engine does not model
pub(crate) fn vk_to_texture_format(format: vk::Format) -> Option<TextureFormat> {
    match format {
        vk::Format::R8G8B8A8_SRGB => Some(TextureFormat::R8G8B8A8_SRGB),
        vk::Format::R8G8B8A8_UNORM => Some(TextureFormat::R8G8B8A8_UNORM),
        vk::Format::B8G8R8A8_SRGB => Some(TextureFormat::B8G8R8A8_SRGB),
        vk::Format::B8G8R8A8_UNORM => Some(TextureFormat::B8G8R8A8_UNORM),
        vk::Format::D32_SFLOAT => Some(TextureFormat::D32_FLOAT),
        _ => None,
    }
}

/// Convert BufferFormat to Vulkan format
pub(crate) fn buffer_format_to_vk(format: BufferFormat) -> vk::Format {
    match format {
        BufferFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        BufferFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        BufferFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        BufferFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
    }
}

pub(crate) fn buffer_usage_to_vk(usage: BufferUsage) -> vk::BufferUsageFlags {
    match usage {
        BufferUsage::Vertex => vk::BufferUsageFlags::VERTEX_BUFFER,
        BufferUsage::Index => vk::BufferUsageFlags::INDEX_BUFFER,
        BufferUsage::Uniform => vk::BufferUsageFlags::UNIFORM_BUFFER,
        BufferUsage::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
    }
}

pub(crate) fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

pub(crate) fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
    }
}

pub(crate) fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub(crate) fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub(crate) fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub(crate) fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
    }
}

pub(crate) fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
    }
}

/// Convert BindingType to Vulkan descriptor type
pub(crate) fn binding_type_to_vk(binding_type: BindingType) -> vk::DescriptorType {
    match binding_type {
        BindingType::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
        BindingType::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
        BindingType::CombinedImageSampler => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
    }
}

/// Convert ShaderStageFlags to Vulkan shader stage flags
pub(crate) fn stage_flags_to_vk(flags: ShaderStageFlags) -> vk::ShaderStageFlags {
    let mut vk_flags = vk::ShaderStageFlags::empty();
    if flags.contains(ShaderStageFlags::VERTEX) { vk_flags |= vk::ShaderStageFlags::VERTEX; }
    if flags.contains(ShaderStageFlags::FRAGMENT) { vk_flags |= vk::ShaderStageFlags::FRAGMENT; }
    vk_flags
}

pub(crate) fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

/// Physical device preference: discrete, then integrated, then anything else
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 3,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 2,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1,
        _ => 0,
    }
}

// ============================================================================
// Physical device selection
// ============================================================================

/// A physical device with the queue families the renderer needs
struct DeviceCandidate {
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    graphics_family: u32,
    present_family: u32,
}

/// Pick the best physical device that supports graphics, presentation to
/// `surface` and the swapchain extension
unsafe fn pick_physical_device(
    instance: &ash::Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> Result<DeviceCandidate> {
    let physical_devices = instance
        .enumerate_physical_devices()
        .map_err(|e| {
            engine_error!("lumen3d::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

    let mut candidates = Vec::new();
    for physical_device in physical_devices {
        let properties = instance.get_physical_device_properties(physical_device);
        let name = CStr::from_ptr(properties.device_name.as_ptr()).to_string_lossy().into_owned();

        let has_swapchain = instance
            .enumerate_device_extension_properties(physical_device)
            .map(|extensions| {
                extensions.iter().any(|ext| {
                    CStr::from_ptr(ext.extension_name.as_ptr()) == ash::khr::swapchain::NAME
                })
            })
            .unwrap_or(false);
        if !has_swapchain {
            engine_debug!("lumen3d::vulkan", "Skipping '{}': no swapchain support", name);
            continue;
        }

        let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
        let graphics_family = queue_families
            .iter()
            .position(|qf| qf.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .map(|i| i as u32);

        let supports_present = |family: u32| {
            surface_loader
                .get_physical_device_surface_support(physical_device, family, surface)
                .unwrap_or(false)
        };

        // Prefer a family that does both
        let present_family = match graphics_family {
            Some(family) if supports_present(family) => Some(family),
            _ => (0..queue_families.len() as u32).find(|&i| supports_present(i)),
        };

        match (graphics_family, present_family) {
            (Some(graphics_family), Some(present_family)) => candidates.push(DeviceCandidate {
                physical_device,
                properties,
                graphics_family,
                present_family,
            }),
            _ => engine_debug!("lumen3d::vulkan", "Skipping '{}': missing graphics or present queue", name),
        }
    }

    candidates
        .into_iter()
        .max_by_key(|c| device_type_score(c.properties.device_type))
        .ok_or_else(|| {
            engine_error!("lumen3d::vulkan", "No Vulkan GPU can present to this window");
            Error::InitializationFailed("No suitable Vulkan GPU found".to_string())
        })
}

// ============================================================================
// VulkanGraphicsDevice
// ============================================================================

/// Vulkan device implementation
///
/// Factory for buffers, textures, shaders, binding sets and pipelines.
/// Presentation lives in the `Swapchain` created by `create_swapchain`.
pub struct VulkanGraphicsDevice {
    /// Shared GPU context
    ctx: Arc<GpuContext>,

    /// Fixed-size pool every binding set is allocated from
    descriptor_pool: Arc<DescriptorPool>,

    /// One VkSampler per SamplerType
    sampler_cache: SamplerCache,

    /// Present mode preference handed to swapchains
    vsync: bool,
}

impl VulkanGraphicsDevice {
    /// Create a Vulkan device able to present to `window`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the Vulkan library cannot be loaded, no GPU
    /// can present to the window, or any core object fails to be created.
    pub fn new<W: HasDisplayHandle + HasWindowHandle>(
        window: &W,
        config: &RendererConfig,
    ) -> Result<Self> {
        unsafe {
            let entry = ash::Entry::load()
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to load Vulkan library: {:?}", e);
                    Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
                })?;

            let app_name = CString::new(config.app_name.as_str())
                .map_err(|_| Error::InitializationFailed(format!(
                    "Application name '{}' contains a NUL byte", config.app_name
                )))?;
            let (major, minor, patch) = config.app_version;
            let app_info = vk::ApplicationInfo::default()
                .application_name(&app_name)
                .application_version(vk::make_api_version(0, major, minor, patch))
                .engine_name(c"Lumen3D")
                .engine_version(vk::make_api_version(0, 0, 1, 0))
                .api_version(vk::API_VERSION_1_3);

            let display_handle = window.display_handle()
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to get display handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get display handle: {}", e))
                })?;
            let window_handle = window.window_handle()
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to get window handle: {}", e);
                    Error::InitializationFailed(format!("Failed to get window handle: {}", e))
                })?;

            let mut extension_names = ash_window::enumerate_required_extensions(display_handle.as_raw())
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to get required extensions: {}", e);
                    Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
                })?
                .to_vec();

            let validation = config.enable_validation && Self::validation_available(&entry);
            if validation {
                extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            }
            let layer_names = if validation {
                vec![VALIDATION_LAYER.as_ptr()]
            } else {
                vec![]
            };

            let create_info = vk::InstanceCreateInfo::default()
                .application_info(&app_info)
                .enabled_layer_names(&layer_names)
                .enabled_extension_names(&extension_names);

            let instance = entry
                .create_instance(&create_info, None)
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to create Vulkan instance: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
                })?;

            let debug_messenger = if validation {
                crate::debug::reset_validation_stats();
                let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
                match debug_utils.create_debug_utils_messenger(&crate::debug::messenger_create_info(), None) {
                    Ok(messenger) => {
                        engine_info!("lumen3d::vulkan", "Validation layers enabled");
                        Some((debug_utils, messenger))
                    }
                    Err(e) => {
                        engine_warn!("lumen3d::vulkan", "Failed to create debug messenger: {:?}", e);
                        None
                    }
                }
            } else {
                None
            };

            // Temporary surface, only used to check presentation support
            let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
            let surface = ash_window::create_surface(
                &entry,
                &instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("lumen3d::vulkan", "Failed to create surface: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?;

            let candidate = pick_physical_device(&instance, &surface_loader, surface);
            surface_loader.destroy_surface(surface, None);
            let candidate = candidate?;

            let device_name = CStr::from_ptr(candidate.properties.device_name.as_ptr())
                .to_string_lossy()
                .into_owned();
            engine_info!("lumen3d::vulkan", "Using GPU '{}' ({:?})",
                device_name, candidate.properties.device_type);

            let queue_priorities = [1.0];
            let mut queue_create_infos = vec![
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(candidate.graphics_family)
                    .queue_priorities(&queue_priorities),
            ];
            if candidate.present_family != candidate.graphics_family {
                queue_create_infos.push(
                    vk::DeviceQueueCreateInfo::default()
                        .queue_family_index(candidate.present_family)
                        .queue_priorities(&queue_priorities),
                );
            }

            let supported_features = instance.get_physical_device_features(candidate.physical_device);
            let anisotropy = supported_features.sampler_anisotropy == vk::TRUE;
            let device_features = vk::PhysicalDeviceFeatures::default()
                .sampler_anisotropy(anisotropy);

            let device_extension_names = [ash::khr::swapchain::NAME.as_ptr()];
            let device_create_info = vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_create_infos)
                .enabled_extension_names(&device_extension_names)
                .enabled_features(&device_features);

            let device = instance
                .create_device(candidate.physical_device, &device_create_info, None)
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to create logical device: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create device: {:?}", e))
                })?;

            let graphics_queue = device.get_device_queue(candidate.graphics_family, 0);
            let present_queue = device.get_device_queue(candidate.present_family, 0);

            let allocator = Allocator::new(&AllocatorCreateDesc {
                instance: instance.clone(),
                device: device.clone(),
                physical_device: candidate.physical_device,
                debug_settings: Default::default(),
                buffer_device_address: false,
                allocation_sizes: Default::default(),
            })
            .map_err(|e| {
                engine_error!("lumen3d::vulkan", "Failed to create GPU allocator: {:?}", e);
                Error::InitializationFailed(format!("Failed to create allocator: {:?}", e))
            })?;

            let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(candidate.graphics_family)
                .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
            let upload_command_pool = device.create_command_pool(&upload_pool_create_info, None)
                .map_err(|e| {
                    engine_error!("lumen3d::vulkan", "Failed to create upload command pool: {:?}", e);
                    Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e))
                })?;

            let ctx = Arc::new(GpuContext {
                entry,
                instance,
                physical_device: candidate.physical_device,
                device,
                allocator: ManuallyDrop::new(Mutex::new(allocator)),
                graphics_queue,
                graphics_queue_family: candidate.graphics_family,
                present_queue,
                present_queue_family: candidate.present_family,
                upload_command_pool: Mutex::new(upload_command_pool),
                max_anisotropy: anisotropy.then_some(candidate.properties.limits.max_sampler_anisotropy),
                live_buffers: AtomicU32::new(0),
                live_textures: AtomicU32::new(0),
                debug_messenger,
            });

            let descriptor_pool = Arc::new(DescriptorPool::new(Arc::clone(&ctx), config.descriptor_pool_size)?);
            engine_debug!("lumen3d::vulkan", "Descriptor pool sized for {} binding sets", config.descriptor_pool_size);

            Ok(Self {
                sampler_cache: SamplerCache::new(Arc::clone(&ctx)),
                descriptor_pool,
                ctx,
                vsync: config.vsync,
            })
        }
    }

    /// Whether validation can be turned on: the feature is compiled in and the layer is installed
    fn validation_available(entry: &ash::Entry) -> bool {
        if !cfg!(feature = "vulkan-validation") {
            engine_warn!("lumen3d::vulkan",
                "Validation requested but the 'vulkan-validation' feature is disabled");
            return false;
        }

        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let found = layers.iter().any(|layer| {
            layer.layer_name_as_c_str().map(|name| name == VALIDATION_LAYER).unwrap_or(false)
        });
        if !found {
            engine_warn!("lumen3d::vulkan",
                "Validation requested but {:?} is not installed", VALIDATION_LAYER);
        }
        found
    }

    /// Create the swapchain presenting to `window`
    ///
    /// The surface is owned by the returned swapchain.
    pub fn create_swapchain(&self, window: &Window) -> Result<Swapchain> {
        let display_handle = window.display_handle()
            .map_err(|e| {
                engine_error!("lumen3d::vulkan", "Failed to get display handle for swapchain: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
        let window_handle = window.window_handle()
            .map_err(|e| {
                engine_error!("lumen3d::vulkan", "Failed to get window handle for swapchain: {}", e);
                Error::InitializationFailed(format!("Failed to get window handle: {}", e))
            })?;

        let surface = unsafe {
            ash_window::create_surface(
                &self.ctx.entry,
                &self.ctx.instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| {
                engine_error!("lumen3d::vulkan", "Failed to create surface for swapchain: {:?}", e);
                Error::InitializationFailed(format!("Failed to create surface: {:?}", e))
            })?
        };
        let surface_loader = ash::khr::surface::Instance::new(&self.ctx.entry, &self.ctx.instance);

        let supported = unsafe {
            surface_loader
                .get_physical_device_surface_support(self.ctx.physical_device, self.ctx.present_queue_family, surface)
                .unwrap_or(false)
        };
        if !supported {
            unsafe { surface_loader.destroy_surface(surface, None); }
            engine_error!("lumen3d::vulkan", "Window surface not supported by the present queue");
            return Err(Error::InitializationFailed("Window surface not supported by the present queue".to_string()));
        }

        let size = window.inner_size();
        Swapchain::new(
            Arc::clone(&self.ctx),
            surface,
            surface_loader,
            size.width,
            size.height,
            self.vsync,
        )
    }

    /// Create a host-visible, persistently mapped buffer
    fn create_host_buffer(
        &self,
        name: &str,
        size: u64,
        usage: vk::BufferUsageFlags,
    ) -> Result<(vk::Buffer, Allocation)> {
        unsafe {
            let buffer_create_info = vk::BufferCreateInfo::default()
                .size(size)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = self.ctx.device.create_buffer(&buffer_create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create buffer '{}' of {} bytes: {:?}", name, size, e))?;

            let requirements = self.ctx.device.get_buffer_memory_requirements(buffer);

            let allocation = self.ctx.allocator().and_then(|mut allocator| {
                allocator.allocate(&AllocationCreateDesc {
                    name,
                    requirements,
                    location: MemoryLocation::CpuToGpu,
                    linear: true,
                    allocation_scheme: AllocationScheme::GpuAllocatorManaged,
                })
                .map_err(|_| {
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("lumen3d::vulkan", "Out of GPU memory for buffer '{}' (required: {:.2} MB)", name, size_mb);
                    Error::OutOfMemory
                })
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    self.ctx.device.destroy_buffer(buffer, None);
                    return Err(e);
                }
            };

            if let Err(e) = self.ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                self.destroy_host_buffer(buffer, allocation);
                return Err(engine_err!("lumen3d::vulkan", "Failed to bind memory for buffer '{}': {:?}", name, e));
            }

            Ok((buffer, allocation))
        }
    }

    fn destroy_host_buffer(&self, buffer: vk::Buffer, allocation: Allocation) {
        if let Ok(mut allocator) = self.ctx.allocator() {
            allocator.free(allocation).ok();
        }
        unsafe { self.ctx.device.destroy_buffer(buffer, None); }
    }

    /// Copy `pixels` into `texture` through a staging buffer and leave it shader-readable
    fn upload_texture(&self, texture: &Texture, name: &str, pixels: &[u8]) -> Result<()> {
        let (staging, allocation) = self.create_host_buffer(
            "texture_staging_buffer",
            pixels.len() as u64,
            vk::BufferUsageFlags::TRANSFER_SRC,
        )?;

        let result = match allocation.mapped_ptr() {
            Some(ptr) => {
                unsafe {
                    std::ptr::copy_nonoverlapping(pixels.as_ptr(), ptr.as_ptr() as *mut u8, pixels.len());
                }
                let info = *texture.info();
                let image = texture.image;
                self.ctx.submit_one_shot(|device, cmd| unsafe {
                    transition_image(device, cmd, image,
                        vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL);

                    let region = vk::BufferImageCopy::default()
                        .buffer_offset(0)
                        .buffer_row_length(0)
                        .buffer_image_height(0)
                        .image_subresource(vk::ImageSubresourceLayers {
                            aspect_mask: vk::ImageAspectFlags::COLOR,
                            mip_level: 0,
                            base_array_layer: 0,
                            layer_count: 1,
                        })
                        .image_offset(vk::Offset3D { x: 0, y: 0, z: 0 })
                        .image_extent(vk::Extent3D { width: info.width, height: info.height, depth: 1 });

                    device.cmd_copy_buffer_to_image(
                        cmd,
                        staging,
                        image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                        &[region],
                    );

                    transition_image(device, cmd, image,
                        vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                })
            }
            None => Err(engine_err!("lumen3d::vulkan", "Staging buffer for '{}' is not host-visible", name)),
        };

        self.destroy_host_buffer(staging, allocation);
        result
    }
}

/// Record a whole-image color layout transition
unsafe fn transition_image(
    device: &ash::Device,
    cmd: vk::CommandBuffer,
    image: vk::Image,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (src_access, dst_access, src_stage, dst_stage) = match (old_layout, new_layout) {
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::TRANSFER_WRITE,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::TRANSFER,
        ),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, _) => (
            vk::AccessFlags::TRANSFER_WRITE,
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TRANSFER,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
        _ => (
            vk::AccessFlags::empty(),
            vk::AccessFlags::SHADER_READ,
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::PipelineStageFlags::FRAGMENT_SHADER,
        ),
    };

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        })
        .src_access_mask(src_access)
        .dst_access_mask(dst_access);

    device.cmd_pipeline_barrier(
        cmd,
        src_stage,
        dst_stage,
        vk::DependencyFlags::empty(),
        &[],
        &[],
        &[barrier],
    );
}

/// Descriptor info for one binding slot, kept alive until the write is issued
enum DescriptorInfo {
    Buffer(vk::DescriptorBufferInfo),
    Image(vk::DescriptorImageInfo),
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn RendererBuffer>> {
        if desc.size == 0 {
            engine_warn!("lumen3d::vulkan", "Refusing to create empty buffer '{}'", desc.name);
            return Err(Error::InvalidResource(format!("Buffer '{}' has size 0", desc.name)));
        }

        let (buffer, allocation) = self.create_host_buffer(
            &desc.name,
            desc.size,
            buffer_usage_to_vk(desc.usage),
        )?;

        Ok(Arc::new(Buffer::new(
            Arc::clone(&self.ctx),
            buffer,
            allocation,
            desc.size,
        )))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn RendererTexture>> {
        if desc.width == 0 || desc.height == 0 {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' has zero extent ({}x{})", desc.name, desc.width, desc.height
            )));
        }
        if desc.format.is_depth() {
            return Err(Error::InvalidResource(format!(
                "Texture '{}' cannot be sampled with depth format {:?}", desc.name, desc.format
            )));
        }
        if let Some(data) = &desc.data {
            let expected = desc.width as usize * desc.height as usize * desc.format.bytes_per_pixel() as usize;
            if data.len() != expected {
                return Err(Error::InvalidResource(format!(
                    "Texture '{}' data is {} bytes, expected {} ({}x{} {:?})",
                    desc.name, data.len(), expected, desc.width, desc.height, desc.format
                )));
            }
        }

        let info = TextureInfo {
            width: desc.width,
            height: desc.height,
            format: desc.format,
        };

        let texture = Texture::create(
            Arc::clone(&self.ctx),
            &desc.name,
            info,
            texture_format_to_vk(desc.format),
            vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
            vk::ImageAspectFlags::COLOR,
        )?;

        match &desc.data {
            Some(pixels) => self.upload_texture(&texture, &desc.name, pixels)?,
            None => {
                let image = texture.image;
                self.ctx.submit_one_shot(|device, cmd| unsafe {
                    transition_image(device, cmd, image,
                        vk::ImageLayout::UNDEFINED, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
                })?;
            }
        }

        engine_debug!("lumen3d::vulkan", "Created texture '{}' ({}x{} {:?})",
            desc.name, desc.width, desc.height, desc.format);

        Ok(Arc::new(texture.track()))
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn RendererShader>> {
        if desc.code.is_empty() || desc.code.len() % 4 != 0 {
            engine_warn!("lumen3d::vulkan",
                "Invalid SPIR-V size for {:?} shader ({} bytes)", desc.stage, desc.code.len());
            return Err(Error::InvalidResource(format!(
                "SPIR-V size must be a non-zero multiple of 4 (got {} bytes)", desc.code.len()
            )));
        }

        let code = ash::util::read_spv(&mut std::io::Cursor::new(desc.code))
            .map_err(|e| Error::InvalidResource(format!("Invalid SPIR-V: {}", e)))?;

        let entry_point = CString::new(desc.entry_point.as_str())
            .map_err(|_| Error::InvalidResource(format!(
                "Shader entry point '{}' contains a NUL byte", desc.entry_point
            )))?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
        let module = unsafe {
            self.ctx.device.create_shader_module(&create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create {:?} shader module: {:?}", desc.stage, e))?
        };

        Ok(Arc::new(Shader::new(
            Arc::clone(&self.ctx),
            module,
            desc.stage,
            entry_point,
        )))
    }

    fn create_binding_layout(&mut self, desc: &BindingLayoutDesc) -> Result<Arc<dyn RendererBindingLayout>> {
        let bindings: Vec<vk::DescriptorSetLayoutBinding> = desc.entries
            .iter()
            .map(|entry| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(entry.binding)
                    .descriptor_type(binding_type_to_vk(entry.binding_type))
                    .descriptor_count(1)
                    .stage_flags(stage_flags_to_vk(entry.stage_flags))
            })
            .collect();

        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);

        let layout = unsafe {
            self.ctx.device.create_descriptor_set_layout(&create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create '{}' binding layout: {:?}", desc.name, e))?
        };

        Ok(Arc::new(BindingLayout::new(Arc::clone(&self.ctx), layout, desc.clone())))
    }

    fn create_binding_set(
        &mut self,
        layout: &Arc<dyn RendererBindingLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn RendererBindingSet>> {
        let desc = layout.desc();
        check_binding_resources(desc, resources)?;

        let mut infos = Vec::with_capacity(resources.len());
        for resource in resources {
            let info = match resource {
                BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                    let vk_buffer = unsafe { &*(*buffer as *const dyn RendererBuffer as *const Buffer) };
                    DescriptorInfo::Buffer(vk::DescriptorBufferInfo {
                        buffer: vk_buffer.buffer,
                        offset: 0,
                        range: vk::WHOLE_SIZE,
                    })
                }
                BindingResource::SampledTexture(texture, sampler_type) => {
                    let vk_texture = unsafe { &*(*texture as *const dyn RendererTexture as *const Texture) };
                    DescriptorInfo::Image(vk::DescriptorImageInfo {
                        sampler: self.sampler_cache.get(*sampler_type)?,
                        image_view: vk_texture.view,
                        image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                    })
                }
            };
            infos.push(info);
        }

        let vk_layout = unsafe {
            &*(layout.as_ref() as *const dyn RendererBindingLayout as *const BindingLayout)
        };
        let descriptor_set = self.descriptor_pool.allocate(vk_layout.layout, &desc.name)?;

        let writes: Vec<vk::WriteDescriptorSet> = desc.entries
            .iter()
            .zip(&infos)
            .map(|(entry, info)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(descriptor_set)
                    .dst_binding(entry.binding)
                    .dst_array_element(0)
                    .descriptor_type(binding_type_to_vk(entry.binding_type));
                match info {
                    DescriptorInfo::Buffer(buffer_info) => write.buffer_info(std::slice::from_ref(buffer_info)),
                    DescriptorInfo::Image(image_info) => write.image_info(std::slice::from_ref(image_info)),
                }
            })
            .collect();

        unsafe {
            self.ctx.device.update_descriptor_sets(&writes, &[]);
        }

        Ok(Arc::new(BindingSet::new(
            Arc::clone(&self.descriptor_pool),
            descriptor_set,
            desc.set_index,
        )))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn RendererPipeline>> {
        if desc.vertex_shader.stage() != ShaderStage::Vertex
            || desc.fragment_shader.stage() != ShaderStage::Fragment
        {
            return Err(Error::InvalidResource(format!(
                "Pipeline '{}' needs a vertex and a fragment shader", desc.name
            )));
        }

        unsafe {
            let vertex_shader = &*(desc.vertex_shader.as_ref() as *const dyn RendererShader as *const Shader);
            let fragment_shader = &*(desc.fragment_shader.as_ref() as *const dyn RendererShader as *const Shader);

            let shader_stages = [
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(vertex_shader.stage))
                    .module(vertex_shader.module)
                    .name(&vertex_shader.entry_point),
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(shader_stage_to_vk(fragment_shader.stage))
                    .module(fragment_shader.module)
                    .name(&fragment_shader.entry_point),
            ];

            let vertex_bindings: Vec<vk::VertexInputBindingDescription> = desc.vertex_layout.bindings
                .iter()
                .map(|binding| vk::VertexInputBindingDescription {
                    binding: binding.binding,
                    stride: binding.stride,
                    input_rate: vk::VertexInputRate::VERTEX,
                })
                .collect();

            let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = desc.vertex_layout.attributes
                .iter()
                .map(|attribute| vk::VertexInputAttributeDescription {
                    location: attribute.location,
                    binding: attribute.binding,
                    format: buffer_format_to_vk(attribute.format),
                    offset: attribute.offset,
                })
                .collect();

            let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
                .vertex_binding_descriptions(&vertex_bindings)
                .vertex_attribute_descriptions(&vertex_attributes);

            let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
                .topology(topology_to_vk(desc.topology))
                .primitive_restart_enable(false);

            // Viewport and scissor are dynamic
            let viewports = [vk::Viewport::default()];
            let scissors = [vk::Rect2D::default()];
            let viewport_state = vk::PipelineViewportStateCreateInfo::default()
                .viewports(&viewports)
                .scissors(&scissors);

            let rasterization_state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(vk::PolygonMode::FILL)
                .line_width(1.0)
                .cull_mode(cull_mode_to_vk(desc.rasterization.cull_mode))
                .front_face(front_face_to_vk(desc.rasterization.front_face))
                .depth_bias_enable(false);

            let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
                .depth_test_enable(desc.depth_stencil.depth_test_enable)
                .depth_write_enable(desc.depth_stencil.depth_write_enable)
                .depth_compare_op(compare_op_to_vk(desc.depth_stencil.depth_compare_op))
                .depth_bounds_test_enable(false)
                .stencil_test_enable(false);

            let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
                .sample_shading_enable(false)
                .rasterization_samples(vk::SampleCountFlags::TYPE_1);

            let blend = &desc.color_blend;
            let color_blend_attachment = vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(blend.blend_enable)
                .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
                .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
                .color_blend_op(blend_op_to_vk(blend.color_blend_op))
                .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
                .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
                .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op));

            let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
                .logic_op_enable(false)
                .attachments(std::slice::from_ref(&color_blend_attachment));

            let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
            let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
                .dynamic_states(&dynamic_states);

            // Set i of the pipeline layout is binding_layouts[i]
            let set_layouts: Vec<vk::DescriptorSetLayout> = desc.binding_layouts
                .iter()
                .map(|layout| {
                    let vk_layout = &*(layout.as_ref() as *const dyn RendererBindingLayout as *const BindingLayout);
                    vk_layout.layout
                })
                .collect();

            let layout_create_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts);
            let pipeline_layout = self.ctx.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to create layout for pipeline '{}': {:?}", desc.name, e))?;

            // Compatible with the swapchain's frame render pass (same formats)
            let render_pass = match create_frame_render_pass(
                &self.ctx.device,
                texture_format_to_vk(desc.color_format),
                texture_format_to_vk(desc.depth_format),
            ) {
                Ok(render_pass) => render_pass,
                Err(e) => {
                    self.ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                    return Err(e);
                }
            };

            let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
                .stages(&shader_stages)
                .vertex_input_state(&vertex_input_state)
                .input_assembly_state(&input_assembly_state)
                .viewport_state(&viewport_state)
                .rasterization_state(&rasterization_state)
                .depth_stencil_state(&depth_stencil_state)
                .multisample_state(&multisample_state)
                .color_blend_state(&color_blend_state)
                .dynamic_state(&dynamic_state)
                .layout(pipeline_layout)
                .render_pass(render_pass)
                .subpass(0);

            let result = self.ctx.device.create_graphics_pipelines(
                vk::PipelineCache::null(),
                &[pipeline_create_info],
                None,
            );
            self.ctx.device.destroy_render_pass(render_pass, None);

            let pipeline = match result {
                Ok(pipelines) => pipelines[0],
                Err((_, e)) => {
                    self.ctx.device.destroy_pipeline_layout(pipeline_layout, None);
                    return Err(engine_err!("lumen3d::vulkan",
                        "Failed to create graphics pipeline '{}': {:?}", desc.name, e));
                }
            };

            engine_debug!("lumen3d::vulkan", "Created pipeline '{}' ({} binding layouts)",
                desc.name, set_layouts.len());

            Ok(Arc::new(Pipeline::new(
                Arc::clone(&self.ctx),
                pipeline,
                pipeline_layout,
                set_layouts.len() as u32,
            )))
        }
    }

    fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.ctx.device.device_wait_idle()
                .map_err(|e| engine_err!("lumen3d::vulkan", "Failed to wait for device idle: {:?}", e))
        }
    }

    fn stats(&self) -> DeviceStats {
        DeviceStats {
            buffers: self.ctx.live_buffers.load(Ordering::Relaxed),
            textures: self.ctx.live_textures.load(Ordering::Relaxed),
            binding_sets_allocated: self.descriptor_pool.allocated(),
            binding_set_capacity: self.descriptor_pool.capacity(),
        }
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
