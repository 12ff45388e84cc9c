/// Lumen3D Engine - Singleton manager for the renderer and the logger
///
/// This module provides global singleton management for the renderer and the
/// engine-wide logger. It uses thread-safe static storage with RwLock.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use crate::render::{Renderer, RendererConfig};
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Renderer singleton (wrapped in Mutex for exclusive access from the render thread)
    renderer: RwLock<Option<Arc<Mutex<Renderer>>>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            renderer: RwLock::new(None),
        }
    }
}

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use lumen_3d_renderer::lumen3d::Engine;
/// use lumen_3d_renderer::lumen3d::render::{Renderer, RendererConfig};
/// # fn build() -> lumen_3d_renderer::lumen3d::Result<Renderer> { unimplemented!() }
///
/// Engine::initialize_with(&RendererConfig::default())?;
/// Engine::create_renderer(build()?)?;
///
/// let renderer = Engine::renderer()?;
/// // renderer.lock() from the render thread...
///
/// Engine::shutdown();
/// # Ok::<(), lumen_3d_renderer::lumen3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Log errors before returning them
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("lumen3d::Engine", "Initialization failed: {}", msg);
            }
            Error::BackendError(msg) => {
                crate::engine_error!("lumen3d::Engine", "Backend error: {}", msg);
            }
            _ => {
                crate::engine_error!("lumen3d::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before creating the renderer.
    /// Calling it again is a no-op.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Initialize the engine and install the default logger at the configured severity
    pub fn initialize_with(config: &RendererConfig) -> Result<()> {
        Self::initialize()?;
        Self::set_log_severity(config.log_severity);
        Ok(())
    }

    /// Shutdown the engine and drop the renderer singleton
    ///
    /// The renderer drains the device before its GPU objects are released.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut renderer) = state.renderer.write() {
                if let Some(existing) = renderer.take() {
                    if let Ok(mut guard) = existing.lock() {
                        guard.shutdown();
                    }
                }
            }
        }
    }

    /// Create and register the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A renderer already exists
    /// - The renderer lock is poisoned
    pub fn create_renderer(renderer: Renderer) -> Result<Arc<Mutex<Renderer>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        if lock.is_some() {
            return Err(Self::log_and_return_error(
                Error::InitializationFailed("Renderer already exists. Call Engine::destroy_renderer() first.".to_string())
            ));
        }

        let renderer = Arc::new(Mutex::new(renderer));
        *lock = Some(Arc::clone(&renderer));

        crate::engine_info!("lumen3d::Engine", "Renderer singleton created successfully");

        Ok(renderer)
    }

    /// Get the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or the renderer has not been created.
    pub fn renderer() -> Result<Arc<Mutex<Renderer>>> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))?;

        let lock = state.renderer.read()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        lock.clone()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Renderer not created. Call Engine::create_renderer() first.".to_string())
            ))
    }

    /// Destroy the renderer singleton
    ///
    /// Drains the device, then removes the singleton. Outstanding references
    /// stay valid until dropped.
    pub fn destroy_renderer() -> Result<()> {
        let state = ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized".to_string())
            ))?;

        let mut lock = state.renderer.write()
            .map_err(|_| Self::log_and_return_error(
                Error::BackendError("Renderer lock poisoned".to_string())
            ))?;

        if let Some(existing) = lock.take() {
            let mut guard = existing.lock()
                .map_err(|_| Self::log_and_return_error(
                    Error::BackendError("Renderer mutex poisoned".to_string())
                ))?;
            guard.shutdown();
        }

        crate::engine_info!("lumen3d::Engine", "Renderer singleton destroyed");

        Ok(())
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut renderer) = state.renderer.write() {
                *renderer = None;
            }
        }
    }

    // ===== LOGGING API =====

    /// Replace the global logger with a custom implementation
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Install the default console logger with the given minimum severity
    pub fn set_log_severity(min_severity: LogSeverity) {
        Self::set_logger(DefaultLogger::new(min_severity));
    }

    /// Reset logger to the default console logger
    pub fn reset_logger() {
        Self::set_logger(DefaultLogger::default());
    }

    /// Log without file:line (used by engine_trace! .. engine_warn!)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line (used by engine_error!)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
