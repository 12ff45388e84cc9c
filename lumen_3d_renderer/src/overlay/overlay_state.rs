/// Overlay state - the selected object and the window registry

use rustc_hash::FxHashSet;
use crate::overlay::{InspectorState, CreateObjectState, LoadModelState, InstantiateModelState};
use crate::scene::{Scene, SceneObjectKey};

/// Every overlay window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayWindow {
    Inspector,
    Outliner,
    CreateObject,
    LoadModel,
    InstantiateModel,
}

impl OverlayWindow {
    pub const ALL: [OverlayWindow; 5] = [
        OverlayWindow::Inspector,
        OverlayWindow::Outliner,
        OverlayWindow::CreateObject,
        OverlayWindow::LoadModel,
        OverlayWindow::InstantiateModel,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            OverlayWindow::Inspector => "Inspector",
            OverlayWindow::Outliner => "Scene Outliner",
            OverlayWindow::CreateObject => "Create Object",
            OverlayWindow::LoadModel => "Load Model",
            OverlayWindow::InstantiateModel => "Instantiate Model",
        }
    }
}

/// Open/closed flag of each window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayWindows {
    open: FxHashSet<OverlayWindow>,
}

impl Default for OverlayWindows {
    /// Inspector and outliner open, dialogs closed
    fn default() -> Self {
        let mut open = FxHashSet::default();
        open.insert(OverlayWindow::Inspector);
        open.insert(OverlayWindow::Outliner);
        Self { open }
    }
}

impl OverlayWindows {
    pub fn open(&mut self, window: OverlayWindow) {
        self.open.insert(window);
    }

    pub fn close(&mut self, window: OverlayWindow) {
        self.open.remove(&window);
    }

    pub fn is_open(&self, window: OverlayWindow) -> bool {
        self.open.contains(&window)
    }
}

/// All overlay state, owned by the renderer and passed to the UI each frame
#[derive(Debug, Default)]
pub struct OverlayState {
    selected: Option<SceneObjectKey>,
    pub windows: OverlayWindows,
    pub inspector: InspectorState,
    pub create_object: CreateObjectState,
    pub load_model: LoadModelState,
    pub instantiate_model: InstantiateModelState,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select an object (or clear the selection), refreshing the inspector cache
    pub fn select(&mut self, scene: &Scene, key: Option<SceneObjectKey>) {
        self.selected = key.filter(|key| scene.object(*key).is_some());
        self.inspector.sync(scene, self.selected);
    }

    /// Selected object, if it still exists
    pub fn selected(&self, scene: &Scene) -> Option<SceneObjectKey> {
        self.selected.filter(|key| scene.object(*key).is_some())
    }

    pub fn open(&mut self, window: OverlayWindow) {
        self.windows.open(window);
    }

    pub fn close(&mut self, window: OverlayWindow) {
        self.windows.close(window);
    }

    pub fn is_open(&self, window: OverlayWindow) -> bool {
        self.windows.is_open(window)
    }
}

#[cfg(test)]
#[path = "overlay_state_tests.rs"]
mod tests;
