/// Tests for Renderer
///
/// The renderer is assembled on MockGraphicsDevice and MockSwapchain.

use super::*;
use glam::Vec3;
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockSurface};
use crate::resource::{MeshInfo, MeshPrimitiveInfo, Vertex};
use crate::scene::Transform;

fn create_renderer(mock: &MockGraphicsDevice) -> Renderer {
    let spirv = [0u8; 8];
    Renderer::with_shaders(
        mock.shared(),
        Box::new(mock.swapchain(800, 600)),
        &RendererConfig::default(),
        &spirv,
        &spirv,
    )
    .unwrap()
}

fn assert_send<T: Send>() {}

#[test]
fn test_renderer_is_send() {
    assert_send::<Renderer>();
}

#[test]
fn test_new_fails_on_missing_shader_file() {
    let mock = MockGraphicsDevice::new();
    let config = RendererConfig {
        vertex_shader_path: "does/not/exist.spv".to_string(),
        ..Default::default()
    };

    let result = Renderer::new(mock.shared(), Box::new(mock.swapchain(800, 600)), &config);

    assert!(matches!(result, Err(Error::InitializationFailed(_))));
}

#[test]
fn test_creates_both_pipelines_and_fallback_texture() {
    let mock = MockGraphicsDevice::new();
    let renderer = create_renderer(&mock);

    assert!(mock.texture("fallback").is_some());
    let opaque = renderer.dispatcher().pipeline(crate::render::PipelineVariant::Opaque);
    assert_eq!(mock.name_of(opaque), "opaque");
    assert_eq!(renderer.extent(), (800, 600));
}

#[test]
fn test_draw_frame_renders_scene() {
    let mock = MockGraphicsDevice::new();
    let mut renderer = create_renderer(&mock);
    let surface = MockSurface::new(&mock, &[(800, 600)]);

    {
        let (scene, resources) = renderer.scene_and_resources();
        resources
            .load_mesh(
                "Tri",
                MeshInfo {
                    primitives: vec![MeshPrimitiveInfo {
                        vertices: vec![Vertex::default(); 3],
                        indices: vec![0, 1, 2],
                        ..Default::default()
                    }],
                },
            )
            .unwrap();
        scene
            .create_camera(resources, "Camera", Transform::from_position(Vec3::new(0.0, 0.0, 3.0)), None)
            .unwrap();
        scene.create_mesh_instance(resources, "Cube", "Tri", Transform::IDENTITY, None).unwrap();
    }
    mock.clear_events();

    assert_eq!(renderer.draw_frame(&surface).unwrap(), FrameStatus::Presented);

    let events = mock.events();
    assert!(events.iter().any(|e| e == "draw_indexed 3"));
    assert_eq!(renderer.frame_stats().presented, 1);
    assert_eq!(renderer.current_slot(), 1);
}

#[test]
fn test_notify_resized_recreates_on_next_frame() {
    let mock = MockGraphicsDevice::new();
    let mut renderer = create_renderer(&mock);
    let surface = MockSurface::new(&mock, &[(1280, 720)]);

    renderer.notify_resized();
    assert_eq!(renderer.draw_frame(&surface).unwrap(), FrameStatus::Recreated);
    assert_eq!(renderer.extent(), (1280, 720));
    assert_eq!(renderer.draw_frame(&surface).unwrap(), FrameStatus::Presented);
}

#[test]
fn test_shutdown_drains_device_once() {
    let mock = MockGraphicsDevice::new();
    let mut renderer = create_renderer(&mock);
    mock.clear_events();

    renderer.shutdown();
    renderer.shutdown();
    drop(renderer);

    assert_eq!(mock.events(), vec!["wait_idle"]);
}

#[test]
fn test_draw_after_shutdown_fails() {
    let mock = MockGraphicsDevice::new();
    let mut renderer = create_renderer(&mock);
    let surface = MockSurface::new(&mock, &[(800, 600)]);

    renderer.shutdown();

    assert!(renderer.draw_frame(&surface).is_err());
}

#[test]
fn test_overlay_edits_go_through_scene() {
    let mock = MockGraphicsDevice::new();
    let mut renderer = create_renderer(&mock);
    let key = renderer.scene_mut().create_scene_object("Box", Transform::IDENTITY, None);

    let Renderer { scene, overlay, .. } = &mut renderer;
    overlay.select(scene, Some(key));
    overlay.inspector.set_position(scene, key, Vec3::X);

    assert_eq!(renderer.scene().object(key).unwrap().transform.position, Vec3::X);
    assert_eq!(renderer.overlay().selected(renderer.scene()), Some(key));
}
