/// Render module - frame loop, binding layouts, per-frame uniforms and draw dispatch

pub mod config;
pub mod binding_layouts;
pub mod uniform_buffer;
pub mod dispatcher;
pub mod frame;
pub mod renderer;

pub use config::*;
pub use binding_layouts::*;
pub use uniform_buffer::*;
pub use dispatcher::*;
pub use frame::*;
pub use renderer::*;
