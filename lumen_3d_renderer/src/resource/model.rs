//! Model types.
//!
//! A `ModelSource` turns a file into `ModelData`: CPU-side geometry, encoded
//! images and a node tree. The resource manager binds that data to GPU
//! resources once and keeps the resulting `Model` by name; the scene
//! instantiates it as a parallel tree of scene objects.

use std::path::Path;
use std::sync::Arc;
use glam::{Mat4, Quat, Vec3};
use crate::error::{Error, Result};
use crate::resource::{Mesh, MaterialFactors, Vertex};
use crate::scene::Transform;

// ============================================================================
// NODE TREE
// ============================================================================

/// Local transform of a model node, as stored in the file
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeTransform {
    Trs {
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    },
    Matrix(Mat4),
}

impl Default for NodeTransform {
    fn default() -> Self {
        NodeTransform::Trs {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl NodeTransform {
    /// Scene transform; matrices are decomposed to TRS
    pub fn to_transform(&self) -> Transform {
        match *self {
            NodeTransform::Trs { translation, rotation, scale } => Transform {
                position: translation,
                rotation,
                scale,
            },
            NodeTransform::Matrix(matrix) => {
                let (scale, rotation, position) = matrix.to_scale_rotation_translation();
                Transform { position, rotation, scale }
            }
        }
    }
}

/// One node of a model hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    /// Index into the model's meshes
    pub mesh: Option<usize>,
    pub transform: NodeTransform,
    /// Indices into the model's nodes
    pub children: Vec<usize>,
}

// ============================================================================
// CPU-SIDE MODEL DATA
// ============================================================================

/// One primitive as read from a model file, textures referenced by image index
#[derive(Debug, Clone, Default)]
pub struct ModelPrimitiveData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub transparent: bool,
    pub double_sided: bool,
    pub factors: MaterialFactors,
    pub base_color_image: Option<usize>,
    pub metallic_roughness_image: Option<usize>,
    pub normal_image: Option<usize>,
}

impl ModelPrimitiveData {
    fn image_indices(&self) -> impl Iterator<Item = usize> {
        [self.base_color_image, self.metallic_roughness_image, self.normal_image]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelMeshData {
    pub name: String,
    pub primitives: Vec<ModelPrimitiveData>,
}

/// Everything a model file provides, before any GPU work
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub meshes: Vec<ModelMeshData>,
    /// Encoded images (PNG, JPEG, ...), decoded lazily when bound
    pub images: Vec<Vec<u8>>,
    pub nodes: Vec<ModelNode>,
    /// Indices of the top-level nodes
    pub roots: Vec<usize>,
}

impl ModelData {
    /// Check every index and that the node graph is a forest rooted at `roots`
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidResource(msg));

        for (mesh_index, mesh) in self.meshes.iter().enumerate() {
            for primitive in &mesh.primitives {
                if let Some(image) = primitive.image_indices().find(|i| *i >= self.images.len()) {
                    return invalid(format!("Mesh {} references missing image {}", mesh_index, image));
                }
            }
        }

        let mut has_parent = vec![false; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(mesh) = node.mesh {
                if mesh >= self.meshes.len() {
                    return invalid(format!("Node {} references missing mesh {}", index, mesh));
                }
            }
            for &child in &node.children {
                if child >= self.nodes.len() {
                    return invalid(format!("Node {} references missing child {}", index, child));
                }
                if child == index || has_parent[child] {
                    return invalid(format!("Node {} has more than one parent", child));
                }
                has_parent[child] = true;
            }
        }

        for &root in &self.roots {
            if root >= self.nodes.len() {
                return invalid(format!("Missing root node {}", root));
            }
            if has_parent[root] {
                return invalid(format!("Root node {} has a parent", root));
            }
        }
        Ok(())
    }
}

/// Reads model files
pub trait ModelSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<ModelData>;
}

// ============================================================================
// MODEL
// ============================================================================

/// A loaded model: GPU-bound meshes plus the node tree to instantiate
pub struct Model {
    pub(crate) name: String,
    pub(crate) meshes: Vec<Arc<Mesh>>,
    pub(crate) nodes: Vec<ModelNode>,
    pub(crate) roots: Vec<usize>,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[Arc<Mesh>] {
        &self.meshes
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&ModelNode> {
        self.nodes.get(index)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Mesh referenced by a node, if any
    pub fn node_mesh(&self, node: &ModelNode) -> Option<&Arc<Mesh>> {
        node.mesh.and_then(|index| self.meshes.get(index))
    }
}
