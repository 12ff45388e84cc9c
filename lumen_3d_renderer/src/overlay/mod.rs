//! Overlay module
//!
//! Editor-overlay state without any UI toolkit: the selection, which windows
//! are open, and the per-window form state. A UI layer draws these structs
//! and calls their operations; every mutation goes through the same scene and
//! resource-manager entry points as application code.

pub mod overlay_state;
pub mod inspector;
pub mod outliner;
pub mod windows;

pub use overlay_state::{OverlayState, OverlayWindow, OverlayWindows};
pub use inspector::{InspectorState, wrap_degrees, round_dp, euler_degrees_to_quat};
pub use outliner::{OutlinerRow, outliner_rows};
pub use windows::{CreateObjectKind, CreateObjectState, LoadModelState, InstantiateModelState};
