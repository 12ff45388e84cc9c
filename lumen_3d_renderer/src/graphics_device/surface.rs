/// DrawableSurface - what the frame controller needs from the window

use std::time::Duration;
use winit::window::Window;

/// The window the swapchain presents to
///
/// The frame controller polls the drawable size before rebuilding the
/// swapchain and sleeps on `wait_events` while the window is minimized.
pub trait DrawableSurface {
    /// Current drawable size in pixels, (0, 0) while minimized
    fn drawable_size(&self) -> (u32, u32);

    /// Block briefly until the window system has had a chance to deliver events
    fn wait_events(&self);
}

impl DrawableSurface for Window {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }

    fn wait_events(&self) {
        // winit delivers events on the event loop thread; yield so a
        // restored size can land before the next poll
        std::thread::sleep(Duration::from_millis(16));
    }
}
