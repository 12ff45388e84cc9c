//! glTF model source.
//!
//! Reads `.gltf` and `.glb` files with the `gltf` crate. Geometry is read
//! into interleaved `Vertex` data, images are kept encoded (the resource
//! manager decodes them when binding), and the default scene's node tree is
//! copied as-is.
//!
//! Per primitive:
//! - positions are required, indices default to a plain triangle list
//! - each texture reads its UV set from the texture info's `texCoord`
//! - `alphaMode: BLEND` puts the primitive in the transparent pass

use std::path::Path;
use glam::{Mat4, Quat, Vec3, Vec4};
use gltf::image::Source;
use gltf::material::AlphaMode;
use gltf::mesh::Mode;
use crate::error::{Error, Result};
use crate::resource::{
    MaterialFactors, ModelData, ModelMeshData, ModelNode, ModelPrimitiveData, ModelSource,
    NodeTransform, Vertex,
};

/// Default `ModelSource` for glTF 2.0 files
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfModelSource;

impl ModelSource for GltfModelSource {
    fn load(&self, path: &Path) -> Result<ModelData> {
        let gltf::Gltf { document, blob } = gltf::Gltf::open(path).map_err(|e| {
            crate::engine_error!("lumen3d::Gltf", "Failed to open '{}': {}", path.display(), e);
            Error::InvalidResource(format!("Failed to open glTF file '{}': {}", path.display(), e))
        })?;

        let base = path.parent();
        let buffers = gltf::import_buffers(&document, base, blob).map_err(|e| {
            crate::engine_error!("lumen3d::Gltf", "Failed to read buffers of '{}': {}", path.display(), e);
            Error::InvalidResource(format!("Failed to read glTF buffers of '{}': {}", path.display(), e))
        })?;

        let images = document
            .images()
            .map(|image| read_image(&image, &buffers, base))
            .collect();

        let meshes = document
            .meshes()
            .map(|mesh| read_mesh(&mesh, &buffers))
            .collect::<Result<Vec<_>>>()?;

        let nodes = document.nodes().map(|node| read_node(&node)).collect();

        let roots = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| scene.nodes().map(|node| node.index()).collect())
            .unwrap_or_default();

        crate::engine_debug!(
            "lumen3d::Gltf",
            "Read '{}': {} meshes, {} images",
            path.display(), document.meshes().len(), document.images().len()
        );

        Ok(ModelData { meshes, images, nodes, roots })
    }
}

// ===== IMAGES =====

/// Encoded bytes of an image; empty when unavailable (the fallback texture is bound instead)
fn read_image(image: &gltf::Image, buffers: &[gltf::buffer::Data], base: Option<&Path>) -> Vec<u8> {
    match image.source() {
        Source::View { view, .. } => {
            let start = view.offset();
            let end = start + view.length();
            buffers
                .get(view.buffer().index())
                .and_then(|data| data.0.get(start..end))
                .map(|bytes| bytes.to_vec())
                .unwrap_or_default()
        }
        Source::Uri { uri, .. } => {
            if uri.starts_with("data:") {
                crate::engine_warn!("lumen3d::Gltf", "Embedded data URI images are not supported (image {})", image.index());
                return Vec::new();
            }
            let path = base.map(|dir| dir.join(uri)).unwrap_or_else(|| uri.into());
            std::fs::read(&path).unwrap_or_else(|e| {
                crate::engine_warn!("lumen3d::Gltf", "Failed to read image '{}': {}", path.display(), e);
                Vec::new()
            })
        }
    }
}

// ===== MESHES =====

fn read_mesh(mesh: &gltf::Mesh, buffers: &[gltf::buffer::Data]) -> Result<ModelMeshData> {
    let name = mesh
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Mesh{}", mesh.index()));

    let mut primitives = Vec::new();
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            crate::engine_warn!(
                "lumen3d::Gltf",
                "Skipping primitive {} of mesh '{}': mode {:?} is not a triangle list",
                primitive.index(), name, primitive.mode()
            );
            continue;
        }
        primitives.push(read_primitive(&primitive, buffers, &name)?);
    }

    Ok(ModelMeshData { name, primitives })
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    mesh_name: &str,
) -> Result<ModelPrimitiveData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or_else(|| {
            Error::InvalidResource(format!(
                "Primitive {} of mesh '{}' has no positions",
                primitive.index(), mesh_name
            ))
        })?
        .collect();

    let material = primitive.material();
    let pbr = material.pbr_metallic_roughness();
    let base_color = pbr.base_color_texture();
    let metallic_roughness = pbr.metallic_roughness_texture();
    let normal = material.normal_texture();

    let read_uvs = |set: u32| -> Vec<[f32; 2]> {
        reader
            .read_tex_coords(set)
            .map(|coords| coords.into_f32().collect())
            .unwrap_or_default()
    };
    let base_color_uvs = read_uvs(base_color.as_ref().map_or(0, |info| info.tex_coord()));
    let metallic_roughness_uvs = read_uvs(metallic_roughness.as_ref().map_or(0, |info| info.tex_coord()));
    let normal_uvs = read_uvs(normal.as_ref().map_or(0, |info| info.tex_coord()));

    let uv_at = |uvs: &[[f32; 2]], i: usize| uvs.get(i).copied().unwrap_or([0.0, 0.0]);
    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, position)| Vertex {
            position: *position,
            base_color_uv: uv_at(&base_color_uvs, i),
            metallic_roughness_uv: uv_at(&metallic_roughness_uvs, i),
            normal_uv: uv_at(&normal_uvs, i),
        })
        .collect();

    let indices = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    Ok(ModelPrimitiveData {
        vertices,
        indices,
        transparent: material.alpha_mode() == AlphaMode::Blend,
        double_sided: material.double_sided(),
        factors: MaterialFactors {
            base_color: Vec4::from_array(pbr.base_color_factor()),
            metallic: pbr.metallic_factor(),
            roughness: pbr.roughness_factor(),
        },
        base_color_image: base_color.map(|info| info.texture().source().index()),
        metallic_roughness_image: metallic_roughness.map(|info| info.texture().source().index()),
        normal_image: normal.map(|info| info.texture().source().index()),
    })
}

// ===== NODES =====

fn read_node(node: &gltf::Node) -> ModelNode {
    let transform = match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => NodeTransform::Matrix(Mat4::from_cols_array_2d(&matrix)),
        gltf::scene::Transform::Decomposed { translation, rotation, scale } => NodeTransform::Trs {
            translation: Vec3::from_array(translation),
            rotation: Quat::from_array(rotation),
            scale: Vec3::from_array(scale),
        },
    };

    ModelNode {
        name: node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Node{}", node.index())),
        mesh: node.mesh().map(|mesh| mesh.index()),
        transform,
        children: node.children().map(|child| child.index()).collect(),
    }
}

#[cfg(test)]
#[path = "gltf_loader_tests.rs"]
mod tests;
