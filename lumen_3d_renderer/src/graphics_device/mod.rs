/// Graphics device module - backend-facing traits and descriptors

// Module declarations
pub mod graphics_device;
pub mod buffer;
pub mod texture;
pub mod shader;
pub mod binding;
pub mod pipeline;
pub mod command_list;
pub mod swapchain;
pub mod surface;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use buffer::*;
pub use texture::*;
pub use shader::*;
pub use binding::*;
pub use pipeline::*;
pub use command_list::*;
pub use swapchain::*;
pub use surface::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
