/// Tests for Scene
///
/// These tests use MockGraphicsDevice through a ResourceManager, so instance
/// and camera uniforms are real (mock) buffers.

use super::*;
use glam::{Quat, Vec3, Vec4};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::graphics_device::GraphicsDevice;
use crate::render::{BindingLayoutRegistry, RendererConfig};
use crate::resource::{
    MeshInfo, MeshPrimitiveInfo, ModelData, ModelMeshData, ModelNode, ModelPrimitiveData, NodeTransform, Vertex,
};

// ============================================================================
// Helper Functions
// ============================================================================

fn setup() -> (MockGraphicsDevice, ResourceManager) {
    let mock = MockGraphicsDevice::new();
    let device = mock.shared();
    let layouts = Arc::new(BindingLayoutRegistry::new(&device).unwrap());
    let mut resources = ResourceManager::new(device, layouts, &RendererConfig::default()).unwrap();
    resources.load_mesh("Tri", MeshInfo { primitives: vec![primitive(false)] }).unwrap();
    resources.load_mesh("Glass", MeshInfo { primitives: vec![primitive(true)] }).unwrap();
    resources
        .load_mesh("Mixed", MeshInfo { primitives: vec![primitive(false), primitive(true)] })
        .unwrap();
    (mock, resources)
}

fn primitive(transparent: bool) -> MeshPrimitiveInfo {
    MeshPrimitiveInfo {
        vertices: vec![
            Vertex { position: [0.0, 0.0, 0.0], ..Default::default() },
            Vertex { position: [1.0, 0.0, 0.0], ..Default::default() },
            Vertex { position: [0.0, 1.0, 0.0], ..Default::default() },
        ],
        indices: vec![0, 1, 2],
        transparent,
        ..Default::default()
    }
}

fn read_mat4(mock: &MockGraphicsDevice, buffer: &str) -> Mat4 {
    let bytes = mock.buffer(buffer).unwrap().contents();
    bytemuck::pod_read_unaligned::<ObjectUniform>(&bytes[..std::mem::size_of::<ObjectUniform>()]).model
}

fn approx_eq(a: Mat4, b: Mat4) -> bool {
    a.abs_diff_eq(b, 1e-5)
}

// ============================================================================
// Naming Tests
// ============================================================================

#[test]
fn test_duplicate_names_get_numeric_suffix() {
    let mut scene = Scene::new();

    let a = scene.create_scene_object("Box", Transform::IDENTITY, None);
    let b = scene.create_scene_object("Box", Transform::IDENTITY, None);
    let c = scene.create_scene_object("Box", Transform::IDENTITY, None);

    assert_eq!(scene.object(a).unwrap().name(), "Box");
    assert_eq!(scene.object(b).unwrap().name(), "Box1");
    assert_eq!(scene.object(c).unwrap().name(), "Box2");
    assert_eq!(scene.find_by_name("Box1"), Some(b));
}

#[test]
fn test_empty_name_defaults_to_object() {
    let mut scene = Scene::new();
    let key = scene.create_scene_object("", Transform::IDENTITY, None);
    assert_eq!(scene.object(key).unwrap().name(), "Object");
}

#[test]
fn test_removed_name_is_reusable() {
    let mut scene = Scene::new();
    let a = scene.create_scene_object("Lamp", Transform::IDENTITY, None);
    assert!(scene.remove_object(a));

    let b = scene.create_scene_object("Lamp", Transform::IDENTITY, None);
    assert_eq!(scene.object(b).unwrap().name(), "Lamp");
}

// ============================================================================
// Hierarchy Tests
// ============================================================================

#[test]
fn test_create_with_parent_links_both_sides() {
    let mut scene = Scene::new();
    let parent = scene.create_scene_object("Parent", Transform::IDENTITY, None);
    let child = scene.create_scene_object("Child", Transform::IDENTITY, Some(parent));

    assert_eq!(scene.parent(child), Some(parent));
    assert_eq!(scene.children(parent), &[child]);
    assert_eq!(scene.root_objects(), &[parent]);
}

#[test]
fn test_invalid_parent_falls_back_to_root() {
    let mut scene = Scene::new();
    let ghost = scene.create_scene_object("Ghost", Transform::IDENTITY, None);
    scene.remove_object(ghost);

    let key = scene.create_scene_object("Orphan", Transform::IDENTITY, Some(ghost));
    assert_eq!(scene.parent(key), None);
    assert_eq!(scene.root_objects(), &[key]);
}

#[test]
fn test_set_parent_same_parent_is_noop() {
    let mut scene = Scene::new();
    let parent = scene.create_scene_object("P", Transform::IDENTITY, None);
    let child = scene.create_scene_object("C", Transform::IDENTITY, Some(parent));

    assert!(scene.set_parent(child, Some(parent)));
    assert_eq!(scene.children(parent), &[child]);
}

#[test]
fn test_set_parent_refuses_cycles() {
    let mut scene = Scene::new();
    let a = scene.create_scene_object("A", Transform::IDENTITY, None);
    let b = scene.create_scene_object("B", Transform::IDENTITY, Some(a));
    let c = scene.create_scene_object("C", Transform::IDENTITY, Some(b));

    assert!(!scene.set_parent(a, Some(a)));
    assert!(!scene.set_parent(a, Some(c)));
    assert_eq!(scene.parent(a), None);
    assert_eq!(scene.parent(c), Some(b));
}

#[test]
fn test_set_parent_moves_between_parents_and_roots() {
    let mut scene = Scene::new();
    let a = scene.create_scene_object("A", Transform::IDENTITY, None);
    let b = scene.create_scene_object("B", Transform::IDENTITY, None);
    let c = scene.create_scene_object("C", Transform::IDENTITY, Some(a));

    assert!(scene.set_parent(c, Some(b)));
    assert!(scene.children(a).is_empty());
    assert_eq!(scene.children(b), &[c]);

    assert!(scene.set_parent(c, None));
    assert!(scene.children(b).is_empty());
    assert_eq!(scene.root_objects(), &[a, b, c]);
}

#[test]
fn test_remove_orphans_children_to_root() {
    let mut scene = Scene::new();
    let parent = scene.create_scene_object("P", Transform::IDENTITY, None);
    let child = scene.create_scene_object("C", Transform::IDENTITY, Some(parent));

    assert!(scene.remove_object(parent));
    assert!(scene.object(parent).is_none());
    assert_eq!(scene.parent(child), None);
    assert_eq!(scene.root_objects(), &[child]);
    assert!(!scene.remove_object(parent));
}

// ============================================================================
// Transform Tests
// ============================================================================

#[test]
fn test_world_matrix_composes_parent_chain() {
    let mut scene = Scene::new();
    let root = scene.create_scene_object(
        "Root",
        Transform::from_trs(Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0)),
        None,
    );
    let child = scene.create_scene_object("Child", Transform::from_position(Vec3::new(1.0, 0.0, 0.0)), Some(root));

    let world = scene.world_matrix(child).unwrap();
    assert!(world.w_axis.truncate().abs_diff_eq(Vec3::new(12.0, 0.0, 0.0), 1e-5));
    assert!(approx_eq(world, scene.local_matrix(root).unwrap() * scene.local_matrix(child).unwrap()));
}

#[test]
fn test_parent_edit_visible_to_child_immediately() {
    let mut scene = Scene::new();
    let root = scene.create_scene_object("Root", Transform::IDENTITY, None);
    let child = scene.create_scene_object("Child", Transform::from_position(Vec3::X), Some(root));

    scene.object_mut(root).unwrap().transform.position = Vec3::new(0.0, 5.0, 0.0);

    assert!(scene.world_position(child).unwrap().abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-5));
}

#[test]
fn test_detached_child_world_matrix_is_local() {
    let mut scene = Scene::new();
    let root = scene.create_scene_object(
        "Root",
        Transform::from_trs(
            Vec3::new(3.0, -2.0, 7.0),
            Quat::from_rotation_y(1.0),
            Vec3::splat(4.0),
        ),
        None,
    );
    let child = scene.create_scene_object("Child", Transform::from_position(Vec3::new(1.0, 2.0, 3.0)), Some(root));
    assert!(!approx_eq(scene.world_matrix(child).unwrap(), scene.local_matrix(child).unwrap()));

    assert!(scene.set_parent(child, None));

    assert_eq!(scene.parent(child), None);
    assert!(scene.children(root).is_empty());
    assert!(scene.root_objects().contains(&child));
    assert!(approx_eq(scene.world_matrix(child).unwrap(), scene.local_matrix(child).unwrap()));
    assert!(approx_eq(scene.world_matrix(root).unwrap(), scene.local_matrix(root).unwrap()));
}

// ============================================================================
// Mesh Instance Tests
// ============================================================================

#[test]
fn test_mesh_instance_classified_per_primitive() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();

    let tri = scene.create_mesh_instance(&resources, "Tri", "Tri", Transform::IDENTITY, None).unwrap();
    let glass = scene.create_mesh_instance(&resources, "Glass", "Glass", Transform::IDENTITY, None).unwrap();
    let mixed = scene.create_mesh_instance(&resources, "Mixed", "Mixed", Transform::IDENTITY, None).unwrap();

    assert_eq!(
        scene.opaque_instances(),
        &[DrawItem { instance: tri, primitive: 0 }, DrawItem { instance: mixed, primitive: 0 }]
    );
    assert_eq!(
        scene.transparent_instances(),
        &[DrawItem { instance: glass, primitive: 0 }, DrawItem { instance: mixed, primitive: 1 }]
    );
}

#[test]
fn test_unknown_mesh_leaves_scene_unchanged() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();

    assert!(scene.create_mesh_instance(&resources, "X", "Nope", Transform::IDENTITY, None).is_none());
    assert_eq!(scene.object_count(), 0);
    assert!(scene.opaque_instances().is_empty());
}

#[test]
fn test_instance_owns_object_buffers_per_slot() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();

    let key = scene.create_mesh_instance(&resources, "Cube", "Tri", Transform::IDENTITY, None).unwrap();

    let instance = scene.mesh_instance(key).unwrap();
    assert_eq!(instance.mesh().name(), "Tri");
    assert!(instance.resources().is_bound());
    assert!(mock.buffer("Cube.object[0]").is_some());
    assert!(mock.buffer("Cube.object[1]").is_some());
}

#[test]
fn test_remove_instance_drops_draw_items() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let a = scene.create_mesh_instance(&resources, "A", "Mixed", Transform::IDENTITY, None).unwrap();
    let b = scene.create_mesh_instance(&resources, "B", "Tri", Transform::IDENTITY, None).unwrap();

    scene.remove_object(a);

    assert_eq!(scene.opaque_instances(), &[DrawItem { instance: b, primitive: 0 }]);
    assert!(scene.transparent_instances().is_empty());
}

#[test]
fn test_removed_gpu_state_released_after_frames_in_flight() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();
    let key = scene.create_mesh_instance(&resources, "Cube", "Tri", Transform::IDENTITY, None).unwrap();
    let buffer = mock.buffer("Cube.object[0]").unwrap();
    let held = Arc::strong_count(&buffer);

    scene.remove_object(key);
    assert_eq!(scene.retired_count(), 1);
    assert_eq!(Arc::strong_count(&buffer), held);

    for _ in 0..MAX_FRAMES_IN_FLIGHT - 1 {
        scene.collect_retired();
    }
    assert_eq!(scene.retired_count(), 1);

    scene.collect_retired();
    assert_eq!(scene.retired_count(), 0);
    assert_eq!(Arc::strong_count(&buffer), held - 1);
}

#[test]
fn test_camera_churn_returns_binding_sets_to_pool() {
    let mock = MockGraphicsDevice::with_binding_set_capacity(MAX_FRAMES_IN_FLIGHT as u32);
    let device = mock.shared();
    let layouts = Arc::new(BindingLayoutRegistry::new(&device).unwrap());
    let resources = ResourceManager::new(device, layouts, &RendererConfig::default()).unwrap();
    let mut scene = Scene::new();

    for round in 0..10 {
        let key = scene.create_camera(&resources, "Camera", Transform::IDENTITY, None).unwrap();
        let camera = scene.object(key).unwrap().as_camera().unwrap();
        assert!(camera.resources().is_bound(), "round {} ran out of binding sets", round);

        scene.remove_object(key);
        for _ in 0..MAX_FRAMES_IN_FLIGHT {
            scene.collect_retired();
        }
        assert_eq!(mock.stats().binding_sets_allocated, 0);
    }
}

#[test]
fn test_point_light_holds_no_gpu_state() {
    let mut scene = Scene::new();
    let key = scene.create_point_light("Lamp", Transform::IDENTITY, None, PointLight::default());

    assert_eq!(scene.object(key).unwrap().kind().label(), "PointLight");
    assert!(scene.remove_object(key));
    assert_eq!(scene.retired_count(), 0);
}

// ============================================================================
// Camera Tests
// ============================================================================

#[test]
fn test_kind_accessor_reports_variant() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let empty = scene.create_scene_object("Node", Transform::IDENTITY, None);
    let camera = scene.create_camera(&resources, "Eye", Transform::IDENTITY, None).unwrap();
    let instance = scene.create_mesh_instance(&resources, "Cube", "Tri", Transform::IDENTITY, None).unwrap();

    assert!(matches!(scene.object(empty).unwrap().kind(), SceneObjectKind::Empty));
    assert!(matches!(scene.object(camera).unwrap().kind(), SceneObjectKind::Camera(_)));
    assert!(matches!(scene.object(instance).unwrap().kind(), SceneObjectKind::MeshInstance(_)));
}

#[test]
fn test_camera_field_edit_keeps_resources_bound() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let key = scene.create_camera(&resources, "Eye", Transform::IDENTITY, None).unwrap();

    scene.object_mut(key).unwrap().as_camera_mut().unwrap().fov_degrees = 30.0;

    let camera = scene.object(key).unwrap().as_camera().unwrap();
    assert_eq!(camera.fov_degrees, 30.0);
    assert!(camera.resources().is_bound());
    assert_eq!(scene.main_camera(), Some(key));
}

#[test]
fn test_first_camera_becomes_main() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();

    let first = scene.create_camera(&resources, "Camera", Transform::IDENTITY, None).unwrap();
    let second = scene.create_camera(&resources, "Camera", Transform::IDENTITY, None).unwrap();

    assert_eq!(scene.main_camera(), Some(first));
    assert!(scene.set_main_camera(second));
    assert_eq!(scene.main_camera(), Some(second));
}

#[test]
fn test_set_main_camera_rejects_non_camera() {
    let mut scene = Scene::new();
    let empty = scene.create_scene_object("Empty", Transform::IDENTITY, None);
    assert!(!scene.set_main_camera(empty));
    assert_eq!(scene.main_camera(), None);
}

#[test]
fn test_removing_main_camera_clears_it() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let camera = scene.create_camera(&resources, "Camera", Transform::IDENTITY, None).unwrap();

    scene.remove_object(camera);
    assert_eq!(scene.main_camera(), None);
}

// ============================================================================
// Draw Order Tests
// ============================================================================

#[test]
fn test_transparent_draw_order_farthest_first() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let near = scene
        .create_mesh_instance(&resources, "Near", "Glass", Transform::from_position(Vec3::new(0.0, 0.0, 1.0)), None)
        .unwrap();
    let far = scene
        .create_mesh_instance(&resources, "Far", "Glass", Transform::from_position(Vec3::new(0.0, 0.0, 5.0)), None)
        .unwrap();
    let mid = scene
        .create_mesh_instance(&resources, "Mid", "Glass", Transform::from_position(Vec3::new(0.0, 0.0, 3.0)), None)
        .unwrap();

    let order: Vec<SceneObjectKey> = scene
        .transparent_draw_order(Vec3::ZERO)
        .into_iter()
        .map(|item| item.instance)
        .collect();

    assert_eq!(order, vec![far, mid, near]);
}

#[test]
fn test_transparent_draw_order_uses_world_position() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    let group = scene.create_scene_object("Group", Transform::from_position(Vec3::new(0.0, 0.0, 10.0)), None);
    let inside = scene.create_mesh_instance(&resources, "Inside", "Glass", Transform::IDENTITY, Some(group)).unwrap();
    let outside = scene
        .create_mesh_instance(&resources, "Outside", "Glass", Transform::from_position(Vec3::new(0.0, 0.0, 2.0)), None)
        .unwrap();

    let order: Vec<SceneObjectKey> = scene
        .transparent_draw_order(Vec3::ZERO)
        .into_iter()
        .map(|item| item.instance)
        .collect();

    assert_eq!(order, vec![inside, outside]);
}

// ============================================================================
// Uniform Refresh Tests
// ============================================================================

#[test]
fn test_update_uniform_buffers_writes_world_matrix_to_slot() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();
    let parent = scene.create_scene_object("Parent", Transform::from_position(Vec3::new(0.0, 2.0, 0.0)), None);
    let key = scene
        .create_mesh_instance(&resources, "Cube", "Tri", Transform::from_position(Vec3::X), Some(parent))
        .unwrap();

    scene.update_uniform_buffers(1, (800, 600)).unwrap();

    assert!(approx_eq(read_mat4(&mock, "Cube.object[1]"), scene.world_matrix(key).unwrap()));
    assert!(approx_eq(read_mat4(&mock, "Cube.object[0]"), Mat4::ZERO));
}

#[test]
fn test_update_uniform_buffers_writes_camera_matrices() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();
    let transform = Transform::from_position(Vec3::new(0.0, 0.0, 5.0));
    scene.create_camera(&resources, "Eye", transform, None).unwrap();

    scene.update_uniform_buffers(0, (800, 0)).unwrap();

    let bytes = mock.buffer("Eye.camera[0]").unwrap().contents();
    let uniform: CameraUniform = bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<CameraUniform>()]);
    let expected = CameraUniform::new(transform.local_matrix(), Camera::DEFAULT_FOV_DEGREES, 1.0, 0.1, 1000.0);
    assert!(approx_eq(uniform.view, expected.view));
    assert!(approx_eq(uniform.proj, expected.proj));
}

// ============================================================================
// Model Instantiation Tests
// ============================================================================

fn lamp_model() -> ModelData {
    ModelData {
        meshes: vec![ModelMeshData {
            name: "Shade".to_string(),
            primitives: vec![ModelPrimitiveData {
                vertices: primitive(false).vertices,
                indices: vec![0, 1, 2],
                ..Default::default()
            }],
        }],
        images: Vec::new(),
        nodes: vec![
            ModelNode {
                name: "Base".to_string(),
                mesh: None,
                transform: NodeTransform::Trs {
                    translation: Vec3::new(0.0, 1.0, 0.0),
                    rotation: Quat::IDENTITY,
                    scale: Vec3::ONE,
                },
                children: vec![1],
            },
            ModelNode { name: "Shade".to_string(), mesh: Some(0), transform: NodeTransform::default(), children: vec![] },
        ],
        roots: vec![0],
    }
}

#[test]
fn test_instantiate_model_builds_hierarchy() {
    let (_mock, mut resources) = setup();
    resources.register_model("Lamp", lamp_model()).unwrap();
    let mut scene = Scene::new();

    let root = scene.instantiate_model(&resources, "Lamp", Transform::IDENTITY).unwrap();

    assert_eq!(scene.object(root).unwrap().name(), "Lamp");
    let base = scene.find_by_name("Base").unwrap();
    let shade = scene.find_by_name("Shade").unwrap();
    assert_eq!(scene.parent(base), Some(root));
    assert_eq!(scene.parent(shade), Some(base));
    assert!(scene.object(base).unwrap().as_mesh_instance().is_none());
    assert_eq!(scene.mesh_instance(shade).unwrap().mesh().name(), "Lamp::0");
    assert!(scene.world_position(shade).unwrap().abs_diff_eq(Vec3::Y, 1e-5));
    assert_eq!(scene.opaque_instances().len(), 1);
}

#[test]
fn test_instantiate_model_twice_gets_unique_names() {
    let (_mock, mut resources) = setup();
    resources.register_model("Lamp", lamp_model()).unwrap();
    let mut scene = Scene::new();

    scene.instantiate_model(&resources, "Lamp", Transform::IDENTITY).unwrap();
    let second = scene.instantiate_model(&resources, "Lamp", Transform::IDENTITY).unwrap();

    assert_eq!(scene.object(second).unwrap().name(), "Lamp1");
    assert!(scene.find_by_name("Shade1").is_some());
    assert_eq!(scene.object_count(), 6);
}

#[test]
fn test_instantiate_unknown_model_returns_none() {
    let (_mock, resources) = setup();
    let mut scene = Scene::new();
    assert!(scene.instantiate_model(&resources, "Nope", Transform::IDENTITY).is_none());
    assert_eq!(scene.object_count(), 0);
}

#[test]
fn test_material_factors_flow_into_instances() {
    let (_mock, mut resources) = setup();
    let mut model = lamp_model();
    model.meshes[0].primitives[0].factors.base_color = Vec4::new(0.2, 0.4, 0.6, 1.0);
    resources.register_model("Lamp", model).unwrap();
    let mut scene = Scene::new();

    scene.instantiate_model(&resources, "Lamp", Transform::IDENTITY).unwrap();

    let shade = scene.find_by_name("Shade").unwrap();
    let mesh = scene.mesh_instance(shade).unwrap().mesh();
    assert_eq!(mesh.primitive(0).unwrap().factors().base_color, Vec4::new(0.2, 0.4, 0.6, 1.0));
}

// ============================================================================
// Point Light Tests
// ============================================================================

fn read_lights(mock: &MockGraphicsDevice, buffer: &str) -> PointLightsUniform {
    let bytes = mock.buffer(buffer).unwrap().contents();
    bytemuck::pod_read_unaligned(&bytes[..std::mem::size_of::<PointLightsUniform>()])
}

#[test]
fn test_update_uniform_buffers_writes_lights_in_world_space() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();
    scene.create_camera(&resources, "Eye", Transform::IDENTITY, None).unwrap();
    let rig = scene.create_scene_object("Rig", Transform::from_position(Vec3::new(0.0, 4.0, 0.0)), None);
    let light = PointLight { color: Vec3::new(1.0, 0.5, 0.25), radius: 6.0, intensity: 2.0 };
    scene.create_point_light("Lamp", Transform::from_position(Vec3::X), Some(rig), light);

    scene.update_uniform_buffers(0, (800, 600)).unwrap();

    let lights = read_lights(&mock, "Eye.lights[0]");
    assert_eq!(lights.count, 1);
    let data = lights.active()[0];
    assert!(data.position_radius.abs_diff_eq(Vec4::new(1.0, 4.0, 0.0, 6.0), 1e-5));
    assert!(data.color_intensity.abs_diff_eq(Vec4::new(1.0, 0.5, 0.25, 2.0), 1e-5));
    assert_eq!(read_lights(&mock, "Eye.lights[1]").count, 0);
}

#[test]
fn test_point_lights_capped_for_every_camera() {
    let (mock, resources) = setup();
    let mut scene = Scene::new();
    scene.create_camera(&resources, "Left", Transform::IDENTITY, None).unwrap();
    scene.create_camera(&resources, "Right", Transform::IDENTITY, None).unwrap();
    for _ in 0..MAX_POINT_LIGHTS + 4 {
        scene.create_point_light("Lamp", Transform::IDENTITY, None, PointLight::default());
    }

    scene.update_uniform_buffers(1, (800, 600)).unwrap();

    assert_eq!(scene.point_lights().len(), MAX_POINT_LIGHTS);
    assert_eq!(read_lights(&mock, "Left.lights[1]").count, MAX_POINT_LIGHTS as u32);
    assert_eq!(read_lights(&mock, "Right.lights[1]").count, MAX_POINT_LIGHTS as u32);
}
