//! Scene module
//!
//! Hierarchical scene graph: an arena of scene objects (empty nodes, mesh
//! instances, cameras) linked by parent/child keys, with world transforms
//! derived on demand.

pub mod transform;
pub mod scene_object;
pub mod scene;

pub use transform::Transform;
pub use scene_object::{SceneObjectKey, SceneObject, SceneObjectKind, MeshInstance, Camera, PointLight};
pub use scene::{Scene, DrawItem};
