/// Renderer configuration

use crate::log::LogSeverity;

/// Number of frames the CPU may record ahead of the GPU
///
/// Every per-frame resource (uniform buffers, binding sets, command buffers,
/// fences and semaphores) is allocated this many times.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Enable Vulkan validation layers
    pub enable_validation: bool,

    /// Application name reported to the driver
    pub app_name: String,

    /// Application version (major, minor, patch)
    pub app_version: (u32, u32, u32),

    /// Prefer FIFO presentation (vsync) over MAILBOX/IMMEDIATE
    pub vsync: bool,

    /// Clear color of the color attachment (RGBA)
    pub clear_color: [f32; 4],

    /// SPIR-V vertex shader file
    pub vertex_shader_path: String,

    /// SPIR-V fragment shader file
    pub fragment_shader_path: String,

    /// Maximum number of binding sets the descriptor pool can hold
    pub descriptor_pool_size: u32,

    /// Color of the 1x1 texture substituted for missing images (RGBA)
    pub fallback_color: [f32; 4],

    /// Minimum severity printed by the default logger
    pub log_severity: LogSeverity,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enable_validation: cfg!(debug_assertions),
            app_name: "Lumen3D Application".to_string(),
            app_version: (1, 0, 0),
            vsync: true,
            clear_color: [0.1, 0.1, 0.1, 1.0],
            vertex_shader_path: "Assets/Shaders/Vert.spv".to_string(),
            fragment_shader_path: "Assets/Shaders/Frag.spv".to_string(),
            descriptor_pool_size: 1000,
            fallback_color: [1.0, 1.0, 1.0, 1.0],
            log_severity: if cfg!(debug_assertions) {
                LogSeverity::Trace
            } else {
                LogSeverity::Info
            },
        }
    }
}

impl RendererConfig {
    /// Fallback color as RGBA8 bytes
    pub fn fallback_rgba8(&self) -> [u8; 4] {
        self.fallback_color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }
}
