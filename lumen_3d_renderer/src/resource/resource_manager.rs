/// Central resource manager for the renderer.
///
/// Owns every loaded mesh and model by name, the fallback texture, and the
/// collaborators that read model files and decode images. Loading is
/// idempotent by name: a second load with the same name returns the cached
/// `Arc` and ignores the new data.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, Texture, TextureDesc, TextureFormat, BufferDesc, BufferUsage, BindingResource, SamplerType,
};
use crate::render::{
    BindingLayoutRegistry, RendererConfig, PerFrameUniform, PerFrameBinding, CameraBinding, ObjectUniform,
    MaterialFactorsUniform, allocate_per_frame_sets, MAX_FRAMES_IN_FLIGHT,
};
use crate::resource::{
    Mesh, MeshInfo, MeshPrimitive, MeshPrimitiveInfo, PrimitiveTextures, Model, ModelData, ModelSource,
    GltfModelSource, ImageDecoder, ImageCrateDecoder,
};

/// Per-instance GPU state: one object uniform buffer and binding set per frame slot
pub type InstanceResources = PerFrameBinding<ObjectUniform>;

/// Per-camera GPU state: camera uniforms, point light blocks and one camera set per frame slot
pub type CameraResources = CameraBinding;

pub struct ResourceManager {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    layouts: Arc<BindingLayoutRegistry>,
    meshes: FxHashMap<String, Arc<Mesh>>,
    models: FxHashMap<String, Arc<Model>>,
    fallback_texture: Arc<dyn Texture>,
    model_source: Box<dyn ModelSource>,
    image_decoder: Box<dyn ImageDecoder>,
}

impl ResourceManager {
    /// Create the manager and its 1x1 fallback texture of `config.fallback_color`
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        layouts: Arc<BindingLayoutRegistry>,
        config: &RendererConfig,
    ) -> Result<Self> {
        let fallback_texture = lock_device(&device)?.create_texture(TextureDesc {
            name: "fallback".to_string(),
            width: 1,
            height: 1,
            format: TextureFormat::R8G8B8A8_UNORM,
            data: Some(config.fallback_rgba8().to_vec()),
        })?;

        Ok(Self {
            device,
            layouts,
            meshes: FxHashMap::default(),
            models: FxHashMap::default(),
            fallback_texture,
            model_source: Box::new(GltfModelSource),
            image_decoder: Box::new(ImageCrateDecoder),
        })
    }

    /// Replace the model file reader
    pub fn set_model_source(&mut self, source: Box<dyn ModelSource>) {
        self.model_source = source;
    }

    /// Replace the image decoder
    pub fn set_image_decoder(&mut self, decoder: Box<dyn ImageDecoder>) {
        self.image_decoder = decoder;
    }

    pub fn layouts(&self) -> &Arc<BindingLayoutRegistry> {
        &self.layouts
    }

    // ===== MESHES =====

    /// Load a mesh under `name`, or return the already-loaded one
    ///
    /// Creates the immutable vertex and index buffers of every primitive,
    /// its material factor buffers and its per-slot material binding sets.
    /// A material binding set that cannot be allocated leaves that primitive
    /// undrawable rather than failing the load.
    pub fn load_mesh(&mut self, name: &str, info: MeshInfo) -> Result<Arc<Mesh>> {
        if let Some(mesh) = self.meshes.get(name) {
            crate::engine_debug!("lumen3d::Resources", "Mesh '{}' already loaded, ignoring new data", name);
            return Ok(Arc::clone(mesh));
        }

        let mut device = lock_device(&self.device)?;
        let primitives = info
            .primitives
            .into_iter()
            .enumerate()
            .map(|(index, primitive)| {
                self.create_primitive(&mut *device, &format!("{}.p{}", name, index), primitive)
            })
            .collect::<Result<Vec<_>>>()?;
        drop(device);

        let mesh = Arc::new(Mesh {
            name: name.to_string(),
            primitives,
            object_layout: Arc::clone(self.layouts.object()),
        });
        self.meshes.insert(name.to_string(), Arc::clone(&mesh));

        crate::engine_info!(
            "lumen3d::Resources",
            "Loaded mesh '{}' ({} primitives)",
            name, mesh.primitive_count()
        );
        Ok(mesh)
    }

    fn create_primitive(
        &self,
        device: &mut dyn GraphicsDevice,
        label: &str,
        info: MeshPrimitiveInfo,
    ) -> Result<MeshPrimitive> {
        if info.vertices.is_empty() || info.indices.is_empty() {
            return Err(Error::InvalidResource(format!("Primitive '{}' has no geometry", label)));
        }
        let vertex_count = info.vertices.len() as u32;
        if let Some(index) = info.indices.iter().find(|i| **i >= vertex_count) {
            return Err(Error::InvalidResource(format!(
                "Primitive '{}' index {} out of range ({} vertices)",
                label, index, vertex_count
            )));
        }

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&info.vertices);
        let vertex_buffer = device.create_buffer(BufferDesc {
            name: format!("{}.vertices", label),
            size: vertex_bytes.len() as u64,
            usage: BufferUsage::Vertex,
        })?;
        vertex_buffer.update(0, vertex_bytes)?;

        let index_bytes: &[u8] = bytemuck::cast_slice(&info.indices);
        let index_buffer = device.create_buffer(BufferDesc {
            name: format!("{}.indices", label),
            size: index_bytes.len() as u64,
            usage: BufferUsage::Index,
        })?;
        index_buffer.update(0, index_bytes)?;

        let material_uniform = PerFrameUniform::<MaterialFactorsUniform>::new(device, &format!("{}.material", label))?;
        let factors_uniform = info.factors.uniform();
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            material_uniform.write(slot, &factors_uniform)?;
        }

        let textures = self.resolve_textures(info.textures);
        let material_sets = allocate_per_frame_sets(device, self.layouts.material(), label, |slot| {
            let mut resources = vec![BindingResource::UniformBuffer(material_uniform.buffers()[slot].as_ref())];
            resources.extend(
                textures
                    .iter()
                    .map(|texture| BindingResource::SampledTexture(texture.as_ref(), SamplerType::LinearRepeat)),
            );
            resources
        });

        Ok(MeshPrimitive {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count: info.indices.len() as u32,
            transparent: info.transparent,
            double_sided: info.double_sided,
            factors: info.factors,
            textures,
            material_uniform,
            material_sets,
        })
    }

    fn resolve_textures(&self, textures: PrimitiveTextures) -> [Arc<dyn Texture>; 3] {
        let or_fallback = |texture: Option<Arc<dyn Texture>>| {
            texture.unwrap_or_else(|| Arc::clone(&self.fallback_texture))
        };
        [
            or_fallback(textures.base_color),
            or_fallback(textures.metallic_roughness),
            or_fallback(textures.normal),
        ]
    }

    /// Loaded mesh by name
    pub fn mesh(&self, name: &str) -> Option<Arc<Mesh>> {
        self.meshes.get(name).cloned()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Sorted mesh names
    pub fn mesh_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.meshes.keys().cloned().collect();
        names.sort();
        names
    }

    // ===== INSTANCES / CAMERAS =====

    /// Allocate the per-slot object uniform buffers and binding sets of a new instance
    ///
    /// Binding set exhaustion is logged and leaves the sets unallocated; the
    /// dispatcher then skips the instance.
    pub fn create_instance_resources(&self, mesh: &Mesh, label: &str) -> Result<InstanceResources> {
        let mut device = lock_device(&self.device)?;
        PerFrameBinding::new(&mut *device, mesh.object_layout(), &format!("{}.object", label))
    }

    /// Allocate the per-slot camera and point light buffers and camera sets of a new camera
    pub fn create_camera_resources(&self, label: &str) -> Result<CameraResources> {
        let mut device = lock_device(&self.device)?;
        CameraBinding::new(&mut *device, self.layouts.camera(), label)
    }

    // ===== TEXTURES =====

    /// Create a sampled RGBA8 texture from tightly packed pixels
    pub fn create_texture_rgba8(
        &self,
        label: &str,
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        srgb: bool,
    ) -> Result<Arc<dyn Texture>> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || pixels.len() != expected {
            return Err(Error::InvalidResource(format!(
                "Texture '{}': {} bytes for {}x{} RGBA8 (expected {})",
                label, pixels.len(), width, height, expected
            )));
        }

        let format = if srgb {
            TextureFormat::R8G8B8A8_SRGB
        } else {
            TextureFormat::R8G8B8A8_UNORM
        };
        lock_device(&self.device)?.create_texture(TextureDesc {
            name: label.to_string(),
            width,
            height,
            format,
            data: Some(pixels),
        })
    }

    /// Decode encoded image bytes into a texture, substituting the fallback texture on any failure
    pub fn decode_texture(&self, label: &str, bytes: &[u8], srgb: bool) -> Arc<dyn Texture> {
        let texture = self
            .image_decoder
            .decode(bytes)
            .and_then(|image| self.create_texture_rgba8(label, image.pixels, image.width, image.height, srgb));

        match texture {
            Ok(texture) => texture,
            Err(e) => {
                crate::engine_warn!("lumen3d::Resources", "Texture '{}' unavailable, using fallback: {}", label, e);
                Arc::clone(&self.fallback_texture)
            }
        }
    }

    /// 1x1 texture bound wherever a material texture is missing
    pub fn fallback_texture(&self) -> &Arc<dyn Texture> {
        &self.fallback_texture
    }

    // ===== MODELS =====

    /// Load a model file under `name`, or return the already-loaded one
    ///
    /// Read, decode or GPU failures are logged and yield `None`.
    pub fn load_model(&mut self, name: &str, path: impl AsRef<Path>) -> Option<Arc<Model>> {
        if let Some(model) = self.models.get(name) {
            return Some(Arc::clone(model));
        }

        let path = path.as_ref();
        let data = match self.model_source.load(path) {
            Ok(data) => data,
            Err(e) => {
                crate::engine_error!("lumen3d::Resources", "Failed to load model '{}' from '{}': {}", name, path.display(), e);
                return None;
            }
        };

        match self.register_model(name, data) {
            Ok(model) => Some(model),
            Err(e) => {
                crate::engine_error!("lumen3d::Resources", "Failed to register model '{}': {}", name, e);
                None
            }
        }
    }

    /// Bind in-memory model data to GPU resources under `name`
    ///
    /// Meshes are loaded as `"{name}::{mesh index}"`; a model whose mesh
    /// names are already taken is rejected before anything is decoded. Each image is decoded
    /// at most once per color space (base color textures are sRGB, the others
    /// linear).
    pub fn register_model(&mut self, name: &str, data: ModelData) -> Result<Arc<Model>> {
        if let Some(model) = self.models.get(name) {
            return Ok(Arc::clone(model));
        }
        data.validate()?;
        let mesh_names: Vec<String> = (0..data.meshes.len()).map(|index| format!("{}::{}", name, index)).collect();
        if let Some(taken) = mesh_names.iter().find(|mesh_name| self.meshes.contains_key(mesh_name.as_str())) {
            return Err(Error::InvalidResource(format!(
                "model '{}' mesh name '{}' is already loaded",
                name, taken
            )));
        }

        let ModelData { meshes, images, nodes, roots } = data;
        let mut decoded: FxHashMap<(usize, bool), Arc<dyn Texture>> = FxHashMap::default();
        let mut texture = |this: &Self, image: Option<usize>, srgb: bool| -> Option<Arc<dyn Texture>> {
            let image = image?;
            let texture = decoded.entry((image, srgb)).or_insert_with(|| {
                this.decode_texture(&format!("{}.image{}", name, image), &images[image], srgb)
            });
            Some(Arc::clone(texture))
        };

        let mut loaded = Vec::with_capacity(meshes.len());
        for (mesh_name, mesh) in mesh_names.iter().zip(meshes) {
            let primitives = mesh
                .primitives
                .into_iter()
                .map(|primitive| MeshPrimitiveInfo {
                    textures: PrimitiveTextures {
                        base_color: texture(self, primitive.base_color_image, true),
                        metallic_roughness: texture(self, primitive.metallic_roughness_image, false),
                        normal: texture(self, primitive.normal_image, false),
                    },
                    vertices: primitive.vertices,
                    indices: primitive.indices,
                    transparent: primitive.transparent,
                    double_sided: primitive.double_sided,
                    factors: primitive.factors,
                })
                .collect();
            loaded.push(self.load_mesh(mesh_name, MeshInfo { primitives })?);
        }

        let model = Arc::new(Model {
            name: name.to_string(),
            meshes: loaded,
            nodes,
            roots,
        });
        self.models.insert(name.to_string(), Arc::clone(&model));

        crate::engine_info!(
            "lumen3d::Resources",
            "Registered model '{}' ({} meshes, {} nodes)",
            name, model.meshes.len(), model.nodes.len()
        );
        Ok(model)
    }

    /// Loaded model by name
    pub fn model(&self, name: &str) -> Option<Arc<Model>> {
        self.models.get(name).cloned()
    }

    /// Sorted model names
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.keys().cloned().collect();
        names.sort();
        names
    }
}

fn lock_device(device: &Arc<Mutex<dyn GraphicsDevice>>) -> Result<MutexGuard<'_, dyn GraphicsDevice + 'static>> {
    device
        .lock()
        .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
