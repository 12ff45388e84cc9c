/// Frame controller - frame-in-flight slots, acquire/submit/present and swapchain recreation
///
/// One `draw_frame` call runs one steady-state transition for the current
/// slot:
///
/// ```text
/// wait(fence[i]) -> acquire(image_available[i]) -> write uniforms[i] -> record
///   -> reset(fence[i]) -> submit -> present -> i = (i + 1) % MAX_FRAMES_IN_FLIGHT
/// ```
///
/// A stale surface (out of date, suboptimal or flagged resized) diverts into
/// the recreate sequence instead; no frame is rendered during that call.

use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::graphics_device::{GraphicsDevice, Swapchain, DrawableSurface, AcquireOutcome, PresentOutcome};
use crate::render::{RendererConfig, DrawDispatcher, MAX_FRAMES_IN_FLIGHT};
use crate::scene::Scene;

/// What one `draw_frame` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// A frame was submitted and presented
    Presented,
    /// The swapchain was rebuilt; the caller simply loops again
    Recreated,
    /// A transient failure dropped this frame
    Dropped,
}

/// Lifetime counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub presented: u64,
    pub dropped: u64,
    pub recreations: u64,
}

/// Owns the swapchain and drives the per-slot frame state machine
pub struct FrameController {
    device: Arc<Mutex<dyn GraphicsDevice>>,
    swapchain: Box<dyn Swapchain>,
    current_slot: usize,
    /// Set by the window's resize notification, consumed by the next frame
    surface_dirty: bool,
    clear_color: [f32; 4],
    stats: FrameStats,
}

impl FrameController {
    pub fn new(
        device: Arc<Mutex<dyn GraphicsDevice>>,
        swapchain: Box<dyn Swapchain>,
        config: &RendererConfig,
    ) -> Self {
        Self {
            device,
            swapchain,
            current_slot: 0,
            surface_dirty: false,
            clear_color: config.clear_color,
            stats: FrameStats::default(),
        }
    }

    /// Flag the surface as resized; the next `draw_frame` recreates first
    pub fn notify_resized(&mut self) {
        self.surface_dirty = true;
    }

    pub fn is_surface_dirty(&self) -> bool {
        self.surface_dirty
    }

    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    pub fn swapchain(&self) -> &dyn Swapchain {
        self.swapchain.as_ref()
    }

    pub fn extent(&self) -> (u32, u32) {
        self.swapchain.extent()
    }

    /// Run one frame
    ///
    /// # Errors
    ///
    /// Only fence waits and recreation failures are returned. Acquire,
    /// record, submit and present failures drop the frame and are logged.
    pub fn draw_frame(
        &mut self,
        surface: &dyn DrawableSurface,
        scene: &mut Scene,
        dispatcher: &DrawDispatcher,
    ) -> Result<FrameStatus> {
        // Checked before acquire: no point acquiring an image of a stale swapchain
        if self.surface_dirty {
            self.recreate(surface)?;
            return Ok(FrameStatus::Recreated);
        }

        let slot = self.current_slot;
        self.swapchain.wait_for_slot(slot)?;

        // The slot's previous GPU work has retired
        scene.collect_retired();

        let image_index = match self.swapchain.acquire_next_image(slot) {
            Ok(AcquireOutcome::Image(index)) => index,
            Ok(AcquireOutcome::OutOfDate) => {
                crate::engine_debug!("lumen3d::Frame", "Swapchain out of date on acquire");
                self.recreate(surface)?;
                return Ok(FrameStatus::Recreated);
            }
            Err(e) => {
                crate::engine_warn!("lumen3d::Frame", "Acquire failed, dropping frame: {}", e);
                self.stats.dropped += 1;
                return Ok(FrameStatus::Dropped);
            }
        };

        if let Err(e) = self.record_and_submit(slot, image_index, scene, dispatcher) {
            // The image-available semaphore is left signaled and the fence
            // may be unsignaled: rebuild the per-slot sync state
            crate::engine_warn!("lumen3d::Frame", "Frame {} dropped after acquire: {}", slot, e);
            self.stats.dropped += 1;
            self.surface_dirty = true;
            return Ok(FrameStatus::Dropped);
        }
        self.current_slot = (slot + 1) % MAX_FRAMES_IN_FLIGHT;

        match self.swapchain.present(slot, image_index) {
            Ok(PresentOutcome::Presented) if !self.surface_dirty => {
                self.stats.presented += 1;
                Ok(FrameStatus::Presented)
            }
            Ok(outcome) => {
                if outcome != PresentOutcome::OutOfDate {
                    self.stats.presented += 1;
                }
                crate::engine_debug!("lumen3d::Frame", "Present returned {:?}, recreating", outcome);
                self.recreate(surface)?;
                Ok(FrameStatus::Recreated)
            }
            Err(e) => {
                crate::engine_warn!("lumen3d::Frame", "Present failed, dropping frame: {}", e);
                self.stats.dropped += 1;
                self.surface_dirty = true;
                Ok(FrameStatus::Dropped)
            }
        }
    }

    /// Uniform refresh, command recording and submission of an acquired image
    fn record_and_submit(
        &mut self,
        slot: usize,
        image_index: u32,
        scene: &Scene,
        dispatcher: &DrawDispatcher,
    ) -> Result<()> {
        let extent = self.swapchain.extent();

        // Safe to overwrite: the wait on this slot's fence has completed
        scene.update_uniform_buffers(slot, extent)?;

        self.swapchain.begin_commands(slot, image_index, self.clear_color)?;
        dispatcher.record(self.swapchain.command_list(slot), scene, slot, extent)?;
        self.swapchain.end_commands(slot)?;

        self.swapchain.reset_slot(slot)?;
        self.swapchain.submit(slot, image_index)
    }

    /// Rebuild the swapchain for the surface's current drawable size
    ///
    /// Blocks while the drawable area is zero (minimized window), then drains
    /// the device before the old images and sync objects are destroyed.
    pub fn recreate(&mut self, surface: &dyn DrawableSurface) -> Result<()> {
        let (width, height) = loop {
            let (width, height) = surface.drawable_size();
            if width > 0 && height > 0 {
                break (width, height);
            }
            surface.wait_events();
        };

        self.device
            .lock()
            .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))?
            .wait_idle()?;

        self.swapchain.recreate(width, height)?;
        self.surface_dirty = false;
        self.current_slot = 0;
        self.stats.recreations += 1;

        crate::engine_info!("lumen3d::Frame", "Swapchain recreated at {}x{}", width, height);
        Ok(())
    }

    /// Wait until the device has finished all submitted work
    pub fn wait_idle(&self) -> Result<()> {
        self.device
            .lock()
            .map_err(|_| Error::BackendError("Graphics device mutex poisoned".to_string()))?
            .wait_idle()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
