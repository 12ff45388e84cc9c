/// Swapchain trait - presentation images plus the per-slot frame resources
///
/// A swapchain owns the presentable images, the depth attachment, the render
/// pass and framebuffers built on them, and one command buffer, fence and
/// pair of semaphores per frame slot. The frame controller drives it one
/// slot at a time.

use crate::error::Result;
use crate::graphics_device::{CommandList, TextureFormat};

/// Result of acquiring a presentable image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Image index ready to be rendered into
    Image(u32),
    /// The swapchain no longer matches the surface and must be recreated
    OutOfDate,
}

/// Result of presenting an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    /// Image queued for presentation
    Presented,
    /// Image presented, but the swapchain no longer matches the surface exactly
    Suboptimal,
    /// Image not presented, the swapchain must be recreated
    OutOfDate,
}

/// Swapchain for presenting rendered images to a window
pub trait Swapchain: Send {
    /// Block until the GPU has finished the previous submission of frame `slot`
    fn wait_for_slot(&mut self, slot: usize) -> Result<()>;

    /// Acquire the next presentable image, signalling the slot's image-available semaphore
    fn acquire_next_image(&mut self, slot: usize) -> Result<AcquireOutcome>;

    /// Begin recording the slot's command buffer and open the render pass on `image_index`
    ///
    /// Color is cleared to `clear_color`, depth to 1.0.
    fn begin_commands(&mut self, slot: usize, image_index: u32, clear_color: [f32; 4]) -> Result<()>;

    /// Command list of frame `slot`, valid between `begin_commands` and `end_commands`
    fn command_list(&mut self, slot: usize) -> &mut dyn CommandList;

    /// Close the render pass and finish recording
    fn end_commands(&mut self, slot: usize) -> Result<()>;

    /// Reset the slot's fence to unsignaled, right before submitting
    fn reset_slot(&mut self, slot: usize) -> Result<()>;

    /// Submit the slot's command buffer
    ///
    /// Waits on the image-available semaphore at color output, signals the
    /// render-finished semaphore and the slot's fence.
    fn submit(&mut self, slot: usize, image_index: u32) -> Result<()>;

    /// Present `image_index`, waiting on the slot's render-finished semaphore
    fn present(&mut self, slot: usize, image_index: u32) -> Result<PresentOutcome>;

    /// Recreate images, depth attachment and framebuffers for a new extent
    ///
    /// The caller guarantees the device is idle.
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Current extent (width, height) in pixels
    fn extent(&self) -> (u32, u32);

    /// Number of presentable images
    fn image_count(&self) -> usize;

    /// Color attachment format
    fn color_format(&self) -> TextureFormat;

    /// Depth attachment format
    fn depth_format(&self) -> TextureFormat;
}
