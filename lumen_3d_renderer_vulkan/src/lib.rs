/*!
# Lumen3D Renderer - Vulkan Backend

Vulkan implementation of the `lumen_3d_renderer` graphics device traits.

This crate uses the Ash library for Vulkan bindings and gpu-allocator for
memory management. `VulkanGraphicsDevice` creates GPU resources;
`VulkanSwapchain` owns presentation, the per-slot command buffers and the
frame synchronization objects.

```no_run
use lumen_3d_renderer::lumen3d::RendererConfig;
use winit::window::Window;

fn build(window: &Window) -> lumen_3d_renderer::lumen3d::Result<()> {
    let mut renderer = lumen_3d_renderer_vulkan::create_renderer(window, &RendererConfig::default())?;
    renderer.draw_frame(window)?;
    Ok(())
}
```
*/

// Vulkan implementation modules
mod vulkan;
mod vulkan_context;
mod vulkan_texture;
mod vulkan_buffer;
mod vulkan_shader;
mod vulkan_pipeline;
mod vulkan_sampler;
mod vulkan_binding;
mod vulkan_command_list;
mod vulkan_swapchain;
mod debug;

use lumen_3d_renderer::lumen3d::{Renderer, RendererConfig, Result};
use lumen_3d_renderer::lumen3d::graphics_device::GraphicsDevice;
use std::sync::{Arc, Mutex};
use winit::window::Window;

pub use vulkan::VulkanGraphicsDevice;
pub use vulkan_swapchain::Swapchain as VulkanSwapchain;
pub use vulkan_buffer::Buffer as VulkanBuffer;
pub use vulkan_texture::Texture as VulkanTexture;
pub use vulkan_shader::Shader as VulkanShader;
pub use vulkan_pipeline::Pipeline as VulkanPipeline;
pub use vulkan_command_list::CommandList as VulkanCommandList;

// Validation reporting
pub use debug::{validation_stats, reset_validation_stats, print_validation_stats_report, ValidationStats};

/// Vulkan backend namespace
pub mod lumen3d {
    pub use crate::vulkan::VulkanGraphicsDevice;
    pub use crate::vulkan_swapchain::Swapchain as VulkanSwapchain;
    pub use crate::create_renderer;
}

/// Create a Vulkan device and swapchain for `window` and build a renderer on them
///
/// # Errors
///
/// Any device, swapchain or renderer initialization error.
pub fn create_renderer(window: &Window, config: &RendererConfig) -> Result<Renderer> {
    let device = VulkanGraphicsDevice::new(window, config)?;
    let swapchain = device.create_swapchain(window)?;
    let device: Arc<Mutex<dyn GraphicsDevice>> = Arc::new(Mutex::new(device));
    Renderer::new(device, Box::new(swapchain), config)
}
