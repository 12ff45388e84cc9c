/// Renderer - wires the device, swapchain, scene, resources and frame loop together
///
/// The renderer is driven from a single render thread: the application
/// mutates the scene and the overlay between frames, then calls
/// `draw_frame` once per event-loop iteration.

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, Swapchain, DrawableSurface, ShaderDesc, ShaderStage};
use crate::overlay::OverlayState;
use crate::render::{
    RendererConfig, BindingLayoutRegistry, DrawDispatcher, ShaderPair, FrameController, FrameStatus, FrameStats,
};
use crate::resource::ResourceManager;
use crate::scene::Scene;

pub struct Renderer {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    layouts: Arc<BindingLayoutRegistry>,
    resources: ResourceManager,
    scene: Scene,
    dispatcher: DrawDispatcher,
    frames: FrameController,
    overlay: OverlayState,
    shut_down: bool,
}

impl Renderer {
    /// Create a renderer, loading the SPIR-V shaders named in `config`
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if a shader file cannot be read, or any
    /// error raised while creating layouts, the fallback texture or pipelines.
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        swapchain: Box<dyn Swapchain>,
        config: &RendererConfig,
    ) -> Result<Self> {
        let vertex = read_shader(&config.vertex_shader_path)?;
        let fragment = read_shader(&config.fragment_shader_path)?;
        Self::with_shaders(device, swapchain, config, &vertex, &fragment)
    }

    /// Create a renderer from in-memory SPIR-V
    pub fn with_shaders(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        swapchain: Box<dyn Swapchain>,
        config: &RendererConfig,
        vertex_spirv: &[u8],
        fragment_spirv: &[u8],
    ) -> Result<Self> {
        let layouts = Arc::new(BindingLayoutRegistry::new(&device)?);

        let shaders = {
            let mut guard = device
                .lock()
                .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))?;
            ShaderPair {
                vertex: guard.create_shader(ShaderDesc {
                    code: vertex_spirv,
                    stage: ShaderStage::Vertex,
                    entry_point: "main".to_string(),
                })?,
                fragment: guard.create_shader(ShaderDesc {
                    code: fragment_spirv,
                    stage: ShaderStage::Fragment,
                    entry_point: "main".to_string(),
                })?,
            }
        };

        let dispatcher = DrawDispatcher::new(
            &device,
            &layouts,
            &shaders,
            swapchain.color_format(),
            swapchain.depth_format(),
        )?;
        let resources = ResourceManager::new(Arc::clone(&device), Arc::clone(&layouts), config)?;
        let (width, height) = swapchain.extent();
        let frames = FrameController::new(Arc::clone(&device), swapchain, config);

        crate::engine_info!("lumen3d::Renderer", "Renderer created ({}x{})", width, height);

        Ok(Self {
            device,
            layouts,
            resources,
            scene: Scene::new(),
            dispatcher,
            frames,
            overlay: OverlayState::new(),
            shut_down: false,
        })
    }

    /// Render one frame of the current scene
    pub fn draw_frame(&mut self, surface: &dyn DrawableSurface) -> Result<FrameStatus> {
        if self.shut_down {
            return Err(Error::BackendError("Renderer is shut down".to_string()));
        }
        self.frames.draw_frame(surface, &mut self.scene, &self.dispatcher)
    }

    /// Window resize notification; handled at the start of the next frame
    pub fn notify_resized(&mut self) {
        self.frames.notify_resized();
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    /// Scene and resources together, for calls that need both
    pub fn scene_and_resources(&mut self) -> (&mut Scene, &mut ResourceManager) {
        (&mut self.scene, &mut self.resources)
    }

    pub fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut OverlayState {
        &mut self.overlay
    }

    pub fn layouts(&self) -> &Arc<BindingLayoutRegistry> {
        &self.layouts
    }

    pub fn dispatcher(&self) -> &DrawDispatcher {
        &self.dispatcher
    }

    pub fn frame_stats(&self) -> FrameStats {
        self.frames.stats()
    }

    pub fn current_slot(&self) -> usize {
        self.frames.current_slot()
    }

    pub fn extent(&self) -> (u32, u32) {
        self.frames.extent()
    }

    pub fn device(&self) -> &Arc<Mutex<dyn GraphicsDevice>> {
        &self.device
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.frames.wait_idle()
    }

    /// Drain the device and drop the scene's GPU state
    ///
    /// Idempotent. The remaining GPU objects are released when the renderer
    /// is dropped, after this drain.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        if let Err(e) = self.wait_idle() {
            crate::engine_error!("lumen3d::Renderer", "Device idle wait failed during shutdown: {}", e);
        }
        self.scene = Scene::new();
        self.shut_down = true;
        crate::engine_info!("lumen3d::Renderer", "Renderer shut down");
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_shader(path: &str) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        crate::engine_error!("lumen3d::Renderer", "Failed to read shader '{}': {}", path, e);
        Error::InitializationFailed(format!("Shader '{}': {}", path, e))
    })
}

#[cfg(test)]
#[path = "renderer_tests.rs"]
mod tests;
