//! Unit tests for Engine singleton manager
//!
//! Tests initialization, renderer singleton management and the logging APIs.
//!
//! IMPORTANT: ENGINE_STATE is a global OnceLock shared across all tests.
//! All tests are marked with #[serial] to run sequentially and avoid RwLock poisoning.

use crate::lumen3d::{Engine, Error};
use crate::lumen3d::log::{Logger, LogEntry, LogSeverity};
use crate::graphics_device::mock_graphics_device::MockGraphicsDevice;
use crate::render::{Renderer, RendererConfig};
use std::sync::{Arc, Mutex};
use serial_test::serial;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TestLogger {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        let mut entries = self.entries.lock().unwrap();
        entries.push(format!("{:?}: {}", entry.severity, entry.message));
    }
}

/// Reset engine state before each test
///
/// ENGINE_STATE is a OnceLock, so once initialized it stays initialized.
/// initialize() is idempotent and reset_for_testing() clears the renderer.
fn setup() {
    Engine::reset_for_testing();
    let _ = Engine::initialize();
}

fn mock_renderer(mock: &MockGraphicsDevice) -> Renderer {
    let spirv = [0u8; 8];
    Renderer::with_shaders(
        mock.shared(),
        Box::new(mock.swapchain(640, 480)),
        &RendererConfig::default(),
        &spirv,
        &spirv,
    )
    .unwrap()
}

// ============================================================================
// INITIALIZATION AND SHUTDOWN TESTS
// ============================================================================

#[test]
#[serial]
fn test_engine_initialize() {
    setup();
    // Initialize is idempotent, so calling it again should succeed
    assert!(Engine::initialize().is_ok());
}

#[test]
#[serial]
fn test_initialize_with_sets_log_severity() {
    setup();
    let config = RendererConfig {
        log_severity: LogSeverity::Warn,
        ..Default::default()
    };
    assert!(Engine::initialize_with(&config).is_ok());
    Engine::reset_logger();
}

#[test]
#[serial]
fn test_shutdown_drains_and_clears_renderer() {
    setup();
    let mock = MockGraphicsDevice::new();
    Engine::create_renderer(mock_renderer(&mock)).unwrap();
    mock.clear_events();

    Engine::shutdown();

    assert!(Engine::renderer().is_err());
    assert_eq!(mock.events(), vec!["wait_idle"]);
}

#[test]
#[serial]
fn test_shutdown_idempotent() {
    setup();
    Engine::shutdown();
    Engine::shutdown();
    assert!(Engine::renderer().is_err());
}

#[test]
#[serial]
fn test_reset_for_testing() {
    setup();
    let mock = MockGraphicsDevice::new();
    Engine::create_renderer(mock_renderer(&mock)).unwrap();

    Engine::reset_for_testing();

    assert!(Engine::renderer().is_err());
}

// ============================================================================
// RENDERER API TESTS
// ============================================================================

#[test]
#[serial]
fn test_create_and_retrieve_renderer() {
    setup();
    let mock = MockGraphicsDevice::new();

    let created = Engine::create_renderer(mock_renderer(&mock)).unwrap();
    let retrieved = Engine::renderer().unwrap();

    assert!(Arc::ptr_eq(&created, &retrieved));
    assert_eq!(retrieved.lock().unwrap().extent(), (640, 480));
}

#[test]
#[serial]
fn test_create_renderer_twice_fails() {
    setup();
    let mock = MockGraphicsDevice::new();
    Engine::create_renderer(mock_renderer(&mock)).unwrap();

    let result = Engine::create_renderer(mock_renderer(&mock));

    match result {
        Err(Error::InitializationFailed(msg)) => assert!(msg.contains("already exists")),
        _ => panic!("Expected InitializationFailed error"),
    }
}

#[test]
#[serial]
fn test_renderer_before_creation_fails() {
    setup();
    match Engine::renderer() {
        Err(Error::InitializationFailed(msg)) => assert!(msg.contains("not created")),
        _ => panic!("Expected InitializationFailed error"),
    }
}

#[test]
#[serial]
fn test_destroy_renderer_then_recreate() {
    setup();
    let mock = MockGraphicsDevice::new();
    Engine::create_renderer(mock_renderer(&mock)).unwrap();

    Engine::destroy_renderer().unwrap();
    assert!(Engine::renderer().is_err());

    assert!(Engine::create_renderer(mock_renderer(&mock)).is_ok());
}

#[test]
#[serial]
fn test_destroy_without_renderer_is_ok() {
    setup();
    assert!(Engine::destroy_renderer().is_ok());
}

#[test]
#[serial]
fn test_errors_are_logged() {
    setup();
    let logger = TestLogger::new();
    let entries = Arc::clone(&logger.entries);
    Engine::set_logger(logger);

    let _ = Engine::renderer();

    {
        let entries = entries.lock().unwrap();
        assert!(entries.iter().any(|e| e.starts_with("Error") && e.contains("not created")));
    }
    Engine::reset_logger();
}

// ============================================================================
// LOGGING API TESTS
// ============================================================================

#[test]
#[serial]
fn test_log_and_log_detailed_reach_custom_logger() {
    let logger = TestLogger::new();
    let entries = Arc::clone(&logger.entries);
    Engine::set_logger(logger);

    Engine::log(LogSeverity::Info, "lumen3d::test", "plain".to_string());
    Engine::log_detailed(LogSeverity::Error, "lumen3d::test", "detailed".to_string(), "engine.rs", 1);

    assert_eq!(
        *entries.lock().unwrap(),
        vec!["Info: plain".to_string(), "Error: detailed".to_string()]
    );
    Engine::reset_logger();
}
