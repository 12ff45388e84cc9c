/// Mock graphics device for unit tests (no GPU required)
///
/// Every GPU object registers a readable name, and every recorded command,
/// buffer write and swapchain call is appended to one shared event log, so
/// tests can assert on the exact order of operations inside a frame.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, DeviceStats, Buffer, BufferDesc, Texture, TextureDesc, TextureInfo,
    Shader, ShaderDesc, ShaderStage, BindingLayout, BindingLayoutDesc, BindingSet,
    BindingResource, Pipeline, PipelineDesc, CommandList, Viewport, Rect2D, IndexType,
    Swapchain, AcquireOutcome, PresentOutcome, TextureFormat, DrawableSurface,
    check_buffer_write, check_binding_resources,
};
use crate::render::MAX_FRAMES_IN_FLIGHT;

/// Ordered log of mock events shared by the device, swapchain and command lists
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Object address -> readable name
type NameRegistry = Arc<Mutex<FxHashMap<usize, String>>>;

fn address<T: ?Sized>(ptr: *const T) -> usize {
    ptr as *const () as usize
}

fn lookup(names: &NameRegistry, addr: usize) -> String {
    names
        .lock()
        .unwrap()
        .get(&addr)
        .cloned()
        .unwrap_or_else(|| "<unknown>".to_string())
}

// ============================================================================
// Mock resources
// ============================================================================

pub struct MockBuffer {
    pub name: String,
    pub size: u64,
    data: Mutex<Vec<u8>>,
    log: EventLog,
}

impl MockBuffer {
    /// Copy of the buffer contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 {
        self.size
    }

    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        check_buffer_write(self.size, offset, data.len())?;
        let start = offset as usize;
        self.data.lock().unwrap()[start..start + data.len()].copy_from_slice(data);
        self.log.lock().unwrap().push(format!("update_buffer {}", self.name));
        Ok(())
    }
}

pub struct MockTexture {
    pub name: String,
    pub info: TextureInfo,
    pub data: Option<Vec<u8>>,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

pub struct MockShader {
    pub stage: ShaderStage,
}

impl Shader for MockShader {
    fn stage(&self) -> ShaderStage {
        self.stage
    }
}

pub struct MockBindingLayout {
    pub desc: BindingLayoutDesc,
}

impl BindingLayout for MockBindingLayout {
    fn desc(&self) -> &BindingLayoutDesc {
        &self.desc
    }
}

pub struct MockBindingSet {
    pub name: String,
    pub set_index: u32,
    state: Arc<Mutex<MockDeviceState>>,
}

impl BindingSet for MockBindingSet {
    fn set_index(&self) -> u32 {
        self.set_index
    }
}

impl Drop for MockBindingSet {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            state.binding_sets_allocated = state.binding_sets_allocated.saturating_sub(1);
        }
    }
}

pub struct MockPipeline {
    pub name: String,
    pub blend_enable: bool,
    pub layout_count: u32,
}

impl Pipeline for MockPipeline {
    fn binding_layout_count(&self) -> u32 {
        self.layout_count
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// Failure injection and pool accounting
///
/// `binding_sets_allocated` counts live sets: a dropped set gives its slot back.
#[derive(Debug, Default)]
pub struct MockDeviceState {
    pub binding_set_capacity: u32,
    pub binding_sets_allocated: u32,
    pub fail_buffer_creation: bool,
    pub fail_texture_creation: bool,
    pub fail_pipeline_creation: bool,
}

/// Mock device; clones share all state, so a test can keep one while the
/// renderer owns another
#[derive(Clone)]
pub struct MockGraphicsDevice {
    pub log: EventLog,
    pub state: Arc<Mutex<MockDeviceState>>,
    names: NameRegistry,
    buffers: Arc<Mutex<Vec<Arc<MockBuffer>>>>,
    textures: Arc<Mutex<Vec<Arc<MockTexture>>>>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self::with_binding_set_capacity(1000)
    }

    pub fn with_binding_set_capacity(capacity: u32) -> Self {
        Self {
            log: Arc::new(Mutex::new(Vec::new())),
            state: Arc::new(Mutex::new(MockDeviceState {
                binding_set_capacity: capacity,
                ..Default::default()
            })),
            names: Arc::new(Mutex::new(FxHashMap::default())),
            buffers: Arc::new(Mutex::new(Vec::new())),
            textures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Wrap a clone into the shared device handle used by the renderer
    pub fn shared(&self) -> Arc<Mutex<dyn GraphicsDevice>> {
        Arc::new(Mutex::new(self.clone()))
    }

    /// Create a swapchain that logs into the same event log
    pub fn swapchain(&self, width: u32, height: u32) -> MockSwapchain {
        MockSwapchain {
            log: Arc::clone(&self.log),
            names: Arc::clone(&self.names),
            state: Arc::new(Mutex::new(MockSwapchainState {
                extent: (width, height),
                image_count: 3,
                ..Default::default()
            })),
            command_lists: (0..MAX_FRAMES_IN_FLIGHT)
                .map(|_| MockCommandList {
                    log: Arc::clone(&self.log),
                    names: Arc::clone(&self.names),
                })
                .collect(),
        }
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_events(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Buffer created under `name`
    pub fn buffer(&self, name: &str) -> Option<Arc<MockBuffer>> {
        self.buffers.lock().unwrap().iter().find(|b| b.name == name).cloned()
    }

    pub fn buffer_names(&self) -> Vec<String> {
        self.buffers.lock().unwrap().iter().map(|b| b.name.clone()).collect()
    }

    /// Texture created under `name`
    pub fn texture(&self, name: &str) -> Option<Arc<MockTexture>> {
        self.textures.lock().unwrap().iter().find(|t| t.name == name).cloned()
    }

    /// Readable name registered for a GPU object
    pub fn name_of<T: ?Sized>(&self, object: &Arc<T>) -> String {
        lookup(&self.names, address(Arc::as_ptr(object)))
    }

    fn register<T: ?Sized>(&self, object: &Arc<T>, name: String) {
        self.names.lock().unwrap().insert(address(Arc::as_ptr(object)), name);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        if self.state.lock().unwrap().fail_buffer_creation {
            return Err(Error::OutOfMemory);
        }
        let buffer = Arc::new(MockBuffer {
            name: desc.name.clone(),
            size: desc.size,
            data: Mutex::new(vec![0; desc.size as usize]),
            log: Arc::clone(&self.log),
        });
        self.register(&buffer, desc.name);
        self.buffers.lock().unwrap().push(Arc::clone(&buffer));
        Ok(buffer)
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if self.state.lock().unwrap().fail_texture_creation {
            return Err(Error::OutOfMemory);
        }
        let texture = Arc::new(MockTexture {
            name: desc.name.clone(),
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
            },
            data: desc.data,
        });
        self.register(&texture, desc.name);
        self.textures.lock().unwrap().push(Arc::clone(&texture));
        Ok(texture)
    }

    fn create_shader(&mut self, desc: ShaderDesc) -> Result<Arc<dyn Shader>> {
        Ok(Arc::new(MockShader { stage: desc.stage }))
    }

    fn create_binding_layout(&mut self, desc: &BindingLayoutDesc) -> Result<Arc<dyn BindingLayout>> {
        Ok(Arc::new(MockBindingLayout { desc: desc.clone() }))
    }

    fn create_binding_set(
        &mut self,
        layout: &Arc<dyn BindingLayout>,
        resources: &[BindingResource],
    ) -> Result<Arc<dyn BindingSet>> {
        let desc = layout.desc();
        check_binding_resources(desc, resources)?;
        {
            let mut state = self.state.lock().unwrap();
            if state.binding_sets_allocated >= state.binding_set_capacity {
                return Err(Error::PoolExhausted(format!(
                    "binding set pool ({} sets)",
                    state.binding_set_capacity
                )));
            }
            state.binding_sets_allocated += 1;
        }

        let resource_names: Vec<String> = resources
            .iter()
            .map(|resource| match resource {
                BindingResource::UniformBuffer(buffer) | BindingResource::StorageBuffer(buffer) => {
                    lookup(&self.names, address(*buffer as *const dyn Buffer))
                }
                BindingResource::SampledTexture(texture, _) => {
                    lookup(&self.names, address(*texture as *const dyn Texture))
                }
            })
            .collect();
        let name = format!("{}({})", desc.name, resource_names.join(","));
        let set = Arc::new(MockBindingSet {
            name: name.clone(),
            set_index: desc.set_index,
            state: Arc::clone(&self.state),
        });
        self.register(&set, name);
        Ok(set)
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        if self.state.lock().unwrap().fail_pipeline_creation {
            return Err(Error::InitializationFailed(format!("pipeline '{}'", desc.name)));
        }
        let pipeline = Arc::new(MockPipeline {
            name: desc.name.clone(),
            blend_enable: desc.color_blend.blend_enable,
            layout_count: desc.binding_layouts.len() as u32,
        });
        self.register(&pipeline, desc.name);
        Ok(pipeline)
    }

    fn wait_idle(&self) -> Result<()> {
        self.log.lock().unwrap().push("wait_idle".to_string());
        Ok(())
    }

    fn stats(&self) -> DeviceStats {
        let state = self.state.lock().unwrap();
        DeviceStats {
            buffers: self.buffers.lock().unwrap().len() as u32,
            textures: self.textures.lock().unwrap().len() as u32,
            binding_sets_allocated: state.binding_sets_allocated,
            binding_set_capacity: state.binding_set_capacity,
        }
    }
}

// ============================================================================
// Mock CommandList
// ============================================================================

pub struct MockCommandList {
    log: EventLog,
    names: NameRegistry,
}

impl MockCommandList {
    fn push(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

impl CommandList for MockCommandList {
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(format!("set_viewport {}x{}", viewport.width, viewport.height));
        Ok(())
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(format!("set_scissor {}x{}", scissor.width, scissor.height));
        Ok(())
    }

    fn bind_pipeline(&mut self, pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.push(format!("bind_pipeline {}", lookup(&self.names, address(Arc::as_ptr(pipeline)))));
        Ok(())
    }

    fn bind_binding_set(
        &mut self,
        _pipeline: &Arc<dyn Pipeline>,
        set_index: u32,
        binding_set: &Arc<dyn BindingSet>,
    ) -> Result<()> {
        self.push(format!(
            "bind_binding_set {} {}",
            set_index,
            lookup(&self.names, address(Arc::as_ptr(binding_set)))
        ));
        Ok(())
    }

    fn bind_vertex_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64) -> Result<()> {
        self.push(format!("bind_vertex_buffer {}", lookup(&self.names, address(Arc::as_ptr(buffer)))));
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Arc<dyn Buffer>, _offset: u64, index_type: IndexType) -> Result<()> {
        self.push(format!(
            "bind_index_buffer {} {:?}",
            lookup(&self.names, address(Arc::as_ptr(buffer))),
            index_type
        ));
        Ok(())
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _vertex_offset: i32) -> Result<()> {
        self.push(format!("draw_indexed {}", index_count));
        Ok(())
    }
}

// ============================================================================
// Mock Swapchain
// ============================================================================

/// Scripted outcomes and failure injection
#[derive(Debug, Default)]
pub struct MockSwapchainState {
    pub extent: (u32, u32),
    pub image_count: u32,
    pub next_image: u32,
    /// Outcomes returned by successive acquires; `Image(next)` once empty
    pub acquire_script: VecDeque<Result<AcquireOutcome>>,
    /// Outcomes returned by successive presents; `Presented` once empty
    pub present_script: VecDeque<Result<PresentOutcome>>,
    pub fail_wait: bool,
    pub fail_begin: bool,
    pub fail_submit: bool,
    pub fail_recreate: bool,
    pub recreations: u32,
}

pub struct MockSwapchain {
    log: EventLog,
    names: NameRegistry,
    pub state: Arc<Mutex<MockSwapchainState>>,
    command_lists: Vec<MockCommandList>,
}

impl MockSwapchain {
    /// Handle to the scripted state, usable after the swapchain is boxed
    pub fn state_handle(&self) -> Arc<Mutex<MockSwapchainState>> {
        Arc::clone(&self.state)
    }

    fn push(&self, event: String) {
        self.log.lock().unwrap().push(event);
    }
}

impl Swapchain for MockSwapchain {
    fn wait_for_slot(&mut self, slot: usize) -> Result<()> {
        self.push(format!("wait_for_slot {}", slot));
        if self.state.lock().unwrap().fail_wait {
            return Err(Error::BackendError("fence wait failed".to_string()));
        }
        Ok(())
    }

    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome> {
        self.push(format!("acquire {}", slot));
        let mut state = self.state.lock().unwrap();
        if let Some(outcome) = state.acquire_script.pop_front() {
            return outcome;
        }
        let image = state.next_image;
        state.next_image = (image + 1) % state.image_count.max(1);
        Ok(AcquireOutcome::Image(image))
    }

    fn begin_commands(&mut self, slot: usize, image_index: u32, _clear_color: [f32; 4]) -> Result<()> {
        self.push(format!("begin_commands {} image={}", slot, image_index));
        if self.state.lock().unwrap().fail_begin {
            return Err(Error::BackendError("begin command buffer failed".to_string()));
        }
        Ok(())
    }

    fn command_list(&mut self, slot: usize) -> &mut dyn CommandList {
        &mut self.command_lists[slot]
    }

    fn end_commands(&mut self, slot: usize) -> Result<()> {
        self.push(format!("end_commands {}", slot));
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> Result<()> {
        self.push(format!("reset_slot {}", slot));
        Ok(())
    }

    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()> {
        self.push(format!("submit {} image={}", slot, image_index));
        if self.state.lock().unwrap().fail_submit {
            return Err(Error::BackendError("queue submit failed".to_string()));
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome> {
        self.push(format!("present {} image={}", slot, image_index));
        self.state
            .lock()
            .unwrap()
            .present_script
            .pop_front()
            .unwrap_or(Ok(PresentOutcome::Presented))
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.push(format!("recreate {}x{}", width, height));
        let mut state = self.state.lock().unwrap();
        if state.fail_recreate {
            return Err(Error::BackendError("swapchain creation failed".to_string()));
        }
        state.extent = (width, height);
        state.next_image = 0;
        state.recreations += 1;
        Ok(())
    }

    fn extent(&self) -> (u32, u32) {
        self.state.lock().unwrap().extent
    }

    fn image_count(&self) -> usize {
        self.state.lock().unwrap().image_count as usize
    }

    fn color_format(&self) -> TextureFormat {
        TextureFormat::B8G8R8A8_SRGB
    }

    fn depth_format(&self) -> TextureFormat {
        TextureFormat::D32_FLOAT
    }
}

// ============================================================================
// Mock surface
// ============================================================================

/// Surface whose drawable size follows a script
///
/// Each poll consumes one scripted size; the last one sticks.
pub struct MockSurface {
    sizes: RefCell<VecDeque<(u32, u32)>>,
    log: EventLog,
}

impl MockSurface {
    pub fn new(device: &MockGraphicsDevice, sizes: &[(u32, u32)]) -> Self {
        Self {
            sizes: RefCell::new(sizes.iter().copied().collect()),
            log: Arc::clone(&device.log),
        }
    }
}

impl DrawableSurface for MockSurface {
    fn drawable_size(&self) -> (u32, u32) {
        let mut sizes = self.sizes.borrow_mut();
        if sizes.len() > 1 {
            sizes.pop_front().unwrap_or((0, 0))
        } else {
            sizes.front().copied().unwrap_or((0, 0))
        }
    }

    fn wait_events(&self) {
        self.log.lock().unwrap().push("wait_events".to_string());
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
