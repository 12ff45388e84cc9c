/// Tests for FrameController
///
/// The mock swapchain and surface log into the device event log, so each
/// test asserts on the exact call sequence of a frame.

use super::*;
use crate::graphics_device::{ShaderDesc, ShaderStage};
use crate::graphics_device::mock_graphics_device::{MockGraphicsDevice, MockSurface, MockSwapchainState};
use crate::render::{BindingLayoutRegistry, ShaderPair};
use crate::resource::{MeshInfo, MeshPrimitiveInfo, ResourceManager, Vertex};
use crate::scene::Transform;

// ============================================================================
// Helper Functions
// ============================================================================

struct Fixture {
    mock: MockGraphicsDevice,
    resources: ResourceManager,
    dispatcher: DrawDispatcher,
    scene: Scene,
    frames: FrameController,
    swapchain_state: Arc<Mutex<MockSwapchainState>>,
}

fn fixture() -> Fixture {
    let mock = MockGraphicsDevice::new();
    let device = mock.shared();
    let layouts = Arc::new(BindingLayoutRegistry::new(&device).unwrap());
    let resources = ResourceManager::new(Arc::clone(&device), Arc::clone(&layouts), &RendererConfig::default()).unwrap();

    let code = [0u8; 4];
    let shaders = {
        let mut device = device.lock().unwrap();
        ShaderPair {
            vertex: device
                .create_shader(ShaderDesc { code: &code, stage: ShaderStage::Vertex, entry_point: "main".to_string() })
                .unwrap(),
            fragment: device
                .create_shader(ShaderDesc { code: &code, stage: ShaderStage::Fragment, entry_point: "main".to_string() })
                .unwrap(),
        }
    };

    let swapchain = mock.swapchain(800, 600);
    let swapchain_state = swapchain.state_handle();
    let dispatcher = DrawDispatcher::new(
        &device,
        &layouts,
        &shaders,
        swapchain.color_format(),
        swapchain.depth_format(),
    )
    .unwrap();
    let frames = FrameController::new(device, Box::new(swapchain), &RendererConfig::default());

    mock.clear_events();
    Fixture { mock, resources, dispatcher, scene: Scene::new(), frames, swapchain_state }
}

fn draw(fx: &mut Fixture, surface: &MockSurface) -> FrameStatus {
    fx.frames.draw_frame(surface, &mut fx.scene, &fx.dispatcher).unwrap()
}

fn add_cube(fx: &mut Fixture) {
    fx.resources
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
    fx.scene.create_camera(&fx.resources, "Eye", Transform::IDENTITY, None).unwrap();
    fx.scene.create_mesh_instance(&fx.resources, "Cube", "Tri", Transform::IDENTITY, None).unwrap();
    fx.mock.clear_events();
}

fn position(events: &[String], event: &str) -> usize {
    events
        .iter()
        .position(|e| e == event)
        .unwrap_or_else(|| panic!("missing event '{}' in {:?}", event, events))
}

// ============================================================================
// Steady State Tests
// ============================================================================

#[test]
fn test_steady_state_call_order() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);

    assert_eq!(draw(&mut fx, &surface), FrameStatus::Presented);

    assert_eq!(
        fx.mock.events(),
        vec![
            "wait_for_slot 0",
            "acquire 0",
            "begin_commands 0 image=0",
            "set_viewport 800x600",
            "set_scissor 800x600",
            "end_commands 0",
            "reset_slot 0",
            "submit 0 image=0",
            "present 0 image=0",
        ]
    );
    assert_eq!(fx.frames.current_slot(), 1);
    assert_eq!(fx.frames.stats().presented, 1);
}

#[test]
fn test_slots_cycle_through_frames_in_flight() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);

    let mut slots = Vec::new();
    for _ in 0..MAX_FRAMES_IN_FLIGHT * 2 {
        slots.push(fx.frames.current_slot());
        draw(&mut fx, &surface);
    }

    assert_eq!(slots, vec![0, 1, 0, 1]);
}

#[test]
fn test_uniform_write_follows_fence_wait_of_reused_slot() {
    let mut fx = fixture();
    add_cube(&mut fx);
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);

    for _ in 0..MAX_FRAMES_IN_FLIGHT {
        draw(&mut fx, &surface);
    }
    fx.mock.clear_events();
    draw(&mut fx, &surface);

    let events = fx.mock.events();
    let wait = position(&events, "wait_for_slot 0");
    let write = position(&events, "update_buffer Cube.object[0]");
    let submit = position(&events, "submit 0 image=2");
    assert!(wait < write);
    assert!(write < submit);
    assert!(!events.iter().any(|e| e == "update_buffer Cube.object[1]"));
}

#[test]
fn test_frame_draws_scene_instances() {
    let mut fx = fixture();
    add_cube(&mut fx);
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);

    draw(&mut fx, &surface);

    let events = fx.mock.events();
    let begin = position(&events, "begin_commands 0 image=0");
    let draw_call = position(&events, "draw_indexed 3");
    let end = position(&events, "end_commands 0");
    assert!(begin < draw_call && draw_call < end);
}

// ============================================================================
// Recreate Tests
// ============================================================================

#[test]
fn test_resize_flag_recreates_before_acquire() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(1024, 768)]);

    fx.frames.notify_resized();
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);

    assert_eq!(fx.mock.events(), vec!["wait_idle", "recreate 1024x768"]);
    assert!(!fx.frames.is_surface_dirty());
    assert_eq!(fx.frames.extent(), (1024, 768));
    assert_eq!(fx.frames.stats().recreations, 1);
}

#[test]
fn test_zero_size_blocks_until_drawable() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(0, 0), (0, 0), (640, 480)]);

    fx.frames.notify_resized();
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);

    let events = fx.mock.events();
    assert_eq!(events, vec!["wait_events", "wait_events", "wait_idle", "recreate 640x480"]);
    assert!(!events.iter().any(|e| e.starts_with("acquire") || e.starts_with("submit") || e.starts_with("present")));

    // Resumes without a second resize notification
    fx.mock.clear_events();
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Presented);
    assert_eq!(fx.mock.events().last().map(String::as_str), Some("present 0 image=0"));
}

#[test]
fn test_out_of_date_acquire_recreates_without_drawing() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state.lock().unwrap().acquire_script.push_back(Ok(AcquireOutcome::OutOfDate));

    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);

    assert_eq!(fx.mock.events(), vec!["wait_for_slot 0", "acquire 0", "wait_idle", "recreate 800x600"]);
}

#[test]
fn test_suboptimal_present_recreates() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state.lock().unwrap().present_script.push_back(Ok(PresentOutcome::Suboptimal));

    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);

    let events = fx.mock.events();
    assert!(position(&events, "present 0 image=0") < position(&events, "recreate 800x600"));
    assert_eq!(fx.frames.stats().presented, 1);
    assert_eq!(fx.frames.stats().recreations, 1);
}

#[test]
fn test_resize_during_frame_recreates_after_present() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);

    fx.swapchain_state.lock().unwrap().present_script.push_back(Ok(PresentOutcome::OutOfDate));
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);
    assert_eq!(fx.frames.stats().presented, 0);
    assert_eq!(fx.mock.events().last().map(String::as_str), Some("recreate 800x600"));
}

#[test]
fn test_recreate_failure_keeps_surface_dirty() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state.lock().unwrap().fail_recreate = true;

    fx.frames.notify_resized();
    assert!(fx.frames.draw_frame(&surface, &mut fx.scene, &fx.dispatcher).is_err());
    assert!(fx.frames.is_surface_dirty());
}

// ============================================================================
// Failure Tests
// ============================================================================

#[test]
fn test_acquire_failure_drops_frame() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state
        .lock()
        .unwrap()
        .acquire_script
        .push_back(Err(Error::BackendError("device busy".to_string())));

    assert_eq!(draw(&mut fx, &surface), FrameStatus::Dropped);
    assert_eq!(fx.mock.events(), vec!["wait_for_slot 0", "acquire 0"]);
    assert_eq!(fx.frames.current_slot(), 0);
    assert_eq!(fx.frames.stats().dropped, 1);

    // The next tick retries naturally
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Presented);
}

#[test]
fn test_submit_failure_drops_frame_and_rebuilds_sync_state() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state.lock().unwrap().fail_submit = true;

    assert_eq!(draw(&mut fx, &surface), FrameStatus::Dropped);
    assert!(!fx.mock.events().iter().any(|e| e.starts_with("present")));
    assert!(fx.frames.is_surface_dirty());

    fx.swapchain_state.lock().unwrap().fail_submit = false;
    fx.mock.clear_events();
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Recreated);
    assert_eq!(draw(&mut fx, &surface), FrameStatus::Presented);
}

#[test]
fn test_fence_wait_failure_is_returned() {
    let mut fx = fixture();
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    fx.swapchain_state.lock().unwrap().fail_wait = true;

    assert!(fx.frames.draw_frame(&surface, &mut fx.scene, &fx.dispatcher).is_err());
    assert!(!fx.mock.events().iter().any(|e| e.starts_with("acquire")));
}

#[test]
fn test_removed_instance_released_after_frames_in_flight() {
    let mut fx = fixture();
    add_cube(&mut fx);
    let surface = MockSurface::new(&fx.mock, &[(800, 600)]);
    let cube = fx.scene.find_by_name("Cube").unwrap();

    fx.scene.remove_object(cube);
    for _ in 0..MAX_FRAMES_IN_FLIGHT {
        assert_eq!(fx.scene.retired_count(), 1);
        draw(&mut fx, &surface);
    }
    assert_eq!(fx.scene.retired_count(), 0);
}
