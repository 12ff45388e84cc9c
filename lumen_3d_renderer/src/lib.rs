/*!
# Lumen3D Renderer

Core of a real-time 3D renderer built around a small set of backend traits.

This crate owns everything above the graphics API: the scene graph, the
renderable resources, the frame-in-flight loop and the draw dispatch. A
backend crate (Vulkan) implements the `graphics_device` traits.

## Architecture

- **GraphicsDevice**: Factory trait for buffers, textures, shaders, binding sets and pipelines
- **Swapchain**: Presentable images plus per-slot command buffers and sync objects
- **Scene**: Arena-owned hierarchy of empty objects, mesh instances and cameras
- **ResourceManager**: Shared meshes, models and textures, with per-slot uniforms
- **FrameController**: Wait / acquire / record / submit / present and swapchain recreation
- **DrawDispatcher**: Opaque pass, then transparent pass sorted back-to-front
- **OverlayState**: Selection and editor window state
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod graphics_device;
pub mod render;
pub mod resource;
pub mod scene;
pub mod overlay;

// Main lumen3d namespace module
pub mod lumen3d {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Renderer facade
    pub use crate::render::{Renderer, RendererConfig, MAX_FRAMES_IN_FLIGHT};

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    // Backend traits and descriptors
    pub mod graphics_device {
        pub use crate::graphics_device::*;
    }

    // Frame loop, layouts, uniforms and dispatch
    pub mod render {
        pub use crate::render::*;
    }

    // Resource sub-module
    pub mod resource {
        pub use crate::resource::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }

    // Overlay sub-module
    pub mod overlay {
        pub use crate::overlay::*;
    }
}

// Re-export math library at crate root
pub use glam;
