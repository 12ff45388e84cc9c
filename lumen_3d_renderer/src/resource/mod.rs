//! Resource management module
//!
//! Meshes, models and textures, loaded once by name and shared by the scene.

mod resource_manager;
pub mod mesh;
pub mod model;
pub mod texture;
pub mod gltf_loader;

pub use resource_manager::{ResourceManager, InstanceResources, CameraResources};
pub use mesh::{
    Vertex, Mesh, MeshPrimitive, MeshInfo, MeshPrimitiveInfo, MaterialFactors, PrimitiveTextures,
};
pub use model::{
    Model, ModelNode, NodeTransform, ModelData, ModelMeshData, ModelPrimitiveData, ModelSource,
};
pub use texture::{ImageDecoder, ImageCrateDecoder, DecodedImage};
pub use gltf_loader::GltfModelSource;
