/// Draw dispatcher - the opaque and transparent pipelines and the per-frame draw recording
///
/// Both pipelines are built once at startup against the three registry
/// layouts. Each frame the opaque pass is recorded first (any order), then
/// the transparent pass, sorted back-to-front from the main camera.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashSet;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, CommandList, Pipeline, PipelineDesc, Shader, BindingLayout, BindingSet, TextureFormat,
    PrimitiveTopology, RasterizationState, CullMode, FrontFace, DepthStencilState, CompareOp,
    ColorBlendState, IndexType, Viewport, Rect2D,
};
use crate::render::{BindingLayoutRegistry, CAMERA_SET, OBJECT_SET, MATERIAL_SET};
use crate::resource::Vertex;
use crate::scene::{Scene, DrawItem, SceneObjectKey};

/// Which of the two fixed pipelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineVariant {
    /// Depth write on, blending off
    Opaque,
    /// Depth test on but no depth write, straight alpha blending
    Transparent,
}

impl PipelineVariant {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineVariant::Opaque => "opaque",
            PipelineVariant::Transparent => "transparent",
        }
    }
}

/// Vertex and fragment shader shared by both pipelines
#[derive(Clone)]
pub struct ShaderPair {
    pub vertex: Arc<dyn Shader>,
    pub fragment: Arc<dyn Shader>,
}

/// Pipeline description of a variant
///
/// Both variants cull back faces with counter-clockwise front faces and
/// bind `layouts` at sets 0..n in order.
pub fn pipeline_desc(
    variant: PipelineVariant,
    shaders: &ShaderPair,
    layouts: Vec<Arc<dyn BindingLayout>>,
    color_format: TextureFormat,
    depth_format: TextureFormat,
) -> PipelineDesc {
    let (depth_write_enable, color_blend) = match variant {
        PipelineVariant::Opaque => (true, ColorBlendState::default()),
        PipelineVariant::Transparent => (false, ColorBlendState::alpha_blending()),
    };

    PipelineDesc {
        name: variant.name().to_string(),
        vertex_shader: Arc::clone(&shaders.vertex),
        fragment_shader: Arc::clone(&shaders.fragment),
        vertex_layout: Vertex::layout(),
        topology: PrimitiveTopology::TriangleList,
        binding_layouts: layouts,
        rasterization: RasterizationState {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
        },
        depth_stencil: DepthStencilState {
            depth_test_enable: true,
            depth_write_enable,
            depth_compare_op: CompareOp::Less,
        },
        color_blend,
        color_format,
        depth_format,
    }
}

/// Counters of one recorded frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    pub opaque_draws: u32,
    pub transparent_draws: u32,
    /// Draw items skipped because a binding set is missing
    pub skipped: u32,
}

/// Records the frame's draws with the two fixed pipelines
pub struct DrawDispatcher {
    opaque: Arc<dyn Pipeline>,
    transparent: Arc<dyn Pipeline>,
}

impl DrawDispatcher {
    pub fn new(
        device: &Arc<Mutex<dyn GraphicsDevice>>,
        layouts: &BindingLayoutRegistry,
        shaders: &ShaderPair,
        color_format: TextureFormat,
        depth_format: TextureFormat,
    ) -> Result<Self> {
        let mut device = device
            .lock()
            .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))?;

        let opaque = device.create_pipeline(pipeline_desc(
            PipelineVariant::Opaque,
            shaders,
            layouts.all(),
            color_format,
            depth_format,
        ))?;
        let transparent = device.create_pipeline(pipeline_desc(
            PipelineVariant::Transparent,
            shaders,
            layouts.all(),
            color_format,
            depth_format,
        ))?;

        crate::engine_info!("lumen3d::Dispatcher", "Created opaque and transparent pipelines");

        Ok(Self { opaque, transparent })
    }

    pub fn pipeline(&self, variant: PipelineVariant) -> &Arc<dyn Pipeline> {
        match variant {
            PipelineVariant::Opaque => &self.opaque,
            PipelineVariant::Transparent => &self.transparent,
        }
    }

    /// Record frame `slot` into `cmd`
    ///
    /// Without a main camera (or with its sets unallocated) the pass stays
    /// empty: the frame still clears and presents.
    pub fn record(
        &self,
        cmd: &mut dyn CommandList,
        scene: &Scene,
        slot: usize,
        extent: (u32, u32),
    ) -> Result<DrawStats> {
        cmd.set_viewport(Viewport::from_extent(extent.0, extent.1))?;
        cmd.set_scissor(Rect2D::from_extent(extent.0, extent.1))?;

        let mut stats = DrawStats::default();

        let Some(camera_key) = scene.main_camera() else {
            return Ok(stats);
        };
        let Some(camera_set) = scene
            .object(camera_key)
            .and_then(|object| object.as_camera())
            .and_then(|camera| camera.resources().set(slot))
        else {
            crate::engine_warn!("lumen3d::Dispatcher", "Main camera has no binding set, nothing drawn");
            return Ok(stats);
        };

        let mut warned: FxHashSet<SceneObjectKey> = FxHashSet::default();

        // Opaque pass
        if !scene.opaque_instances().is_empty() {
            cmd.bind_pipeline(&self.opaque)?;
            for item in scene.opaque_instances() {
                if Self::draw_item(cmd, &self.opaque, camera_set, scene, *item, slot, &mut warned)? {
                    stats.opaque_draws += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }

        // Transparent pass, farthest first
        if !scene.transparent_instances().is_empty() {
            let camera_position = scene.world_position(camera_key).unwrap_or_default();
            cmd.bind_pipeline(&self.transparent)?;
            for item in scene.transparent_draw_order(camera_position) {
                if Self::draw_item(cmd, &self.transparent, camera_set, scene, item, slot, &mut warned)? {
                    stats.transparent_draws += 1;
                } else {
                    stats.skipped += 1;
                }
            }
        }

        crate::engine_trace!(
            "lumen3d::Dispatcher",
            "Slot {}: {} opaque, {} transparent, {} skipped",
            slot, stats.opaque_draws, stats.transparent_draws, stats.skipped
        );

        Ok(stats)
    }

    /// Bind and draw one primitive; `false` when its sets are missing
    fn draw_item(
        cmd: &mut dyn CommandList,
        pipeline: &Arc<dyn Pipeline>,
        camera_set: &Arc<dyn BindingSet>,
        scene: &Scene,
        item: DrawItem,
        slot: usize,
        warned: &mut FxHashSet<SceneObjectKey>,
    ) -> Result<bool> {
        let Some(instance) = scene.mesh_instance(item.instance) else {
            return Ok(false);
        };
        let Some(primitive) = instance.mesh().primitive(item.primitive) else {
            return Ok(false);
        };

        let (Some(object_set), Some(material_set)) = (instance.resources().set(slot), primitive.material_set(slot))
        else {
            if warned.insert(item.instance) {
                let name = scene.object(item.instance).map(|object| object.name()).unwrap_or("?");
                crate::engine_warn!("lumen3d::Dispatcher", "Skipping '{}': binding sets not allocated", name);
            }
            return Ok(false);
        };

        cmd.bind_vertex_buffer(primitive.vertex_buffer(), 0)?;
        cmd.bind_index_buffer(primitive.index_buffer(), 0, IndexType::U32)?;
        cmd.bind_binding_set(pipeline, CAMERA_SET, camera_set)?;
        cmd.bind_binding_set(pipeline, OBJECT_SET, object_set)?;
        cmd.bind_binding_set(pipeline, MATERIAL_SET, material_set)?;
        cmd.draw_indexed(primitive.index_count(), 0, 0)?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
