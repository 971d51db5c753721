//! Presentation anchor resolution
//!
//! Interactive sign-in has to be shown on the innermost visible surface of
//! the foreground window. Hosts describe their UI as a tree of [`Surface`]s
//! through [`UiHierarchy`]; [`find_presentation_anchor`] walks it.

/// Activation state of a window scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    /// On screen and receiving input
    ForegroundActive,
    /// On screen, not receiving input
    ForegroundInactive,
    /// Off screen
    Background,
    /// Not attached
    Unattached,
}

/// How a surface hosts its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceKind {
    /// A leaf surface
    Plain,
    /// A navigation stack showing one visible child
    Navigation {
        /// The visible child, if the stack has one
        visible: Option<Box<Surface>>,
    },
    /// A tab container showing one selected child
    Tab {
        /// The selected child, if any
        selected: Option<Box<Surface>>,
    },
}

/// A node in the host's UI hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// Host-assigned identifier
    pub id: String,
    /// Container behaviour
    pub kind: SurfaceKind,
    /// Surface presented modally on top of this one
    pub presented: Option<Box<Surface>>,
}

impl Surface {
    /// A leaf surface
    pub fn plain(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: SurfaceKind::Plain,
            presented: None,
        }
    }

    /// A navigation stack with the given visible child
    pub fn navigation(id: impl Into<String>, visible: Option<Surface>) -> Self {
        Self {
            id: id.into(),
            kind: SurfaceKind::Navigation {
                visible: visible.map(Box::new),
            },
            presented: None,
        }
    }

    /// A tab container with the given selected child
    pub fn tabs(id: impl Into<String>, selected: Option<Surface>) -> Self {
        Self {
            id: id.into(),
            kind: SurfaceKind::Tab {
                selected: selected.map(Box::new),
            },
            presented: None,
        }
    }

    /// Present `surface` modally on top of this one
    pub fn presenting(mut self, surface: Surface) -> Self {
        self.presented = Some(Box::new(surface));
        self
    }

    /// Innermost visible surface below (and including) this one
    pub fn topmost(&self) -> &Surface {
        let child = match &self.kind {
            SurfaceKind::Navigation { visible } => visible.as_deref(),
            SurfaceKind::Tab { selected } => selected.as_deref(),
            SurfaceKind::Plain => None,
        };
        if let Some(child) = child {
            return child.topmost();
        }
        if let Some(presented) = self.presented.as_deref() {
            return presented.topmost();
        }
        self
    }
}

/// A window inside a scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    /// Whether this is the key window
    pub is_key: bool,
    /// Root surface
    pub root: Option<Surface>,
}

/// A window scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowScene {
    /// Scene state
    pub activation: ActivationState,
    /// Windows in the scene
    pub windows: Vec<Window>,
}

/// Host UI-hierarchy query surface
///
/// Only called on the designated context.
pub trait UiHierarchy: Send + Sync {
    /// Connected window scenes, in host order
    fn scenes(&self) -> Vec<WindowScene>;
}

/// A hierarchy with no UI at all (headless hosts, servers, tests)
#[derive(Debug, Default, Clone, Copy)]
pub struct Headless;

impl UiHierarchy for Headless {
    fn scenes(&self) -> Vec<WindowScene> {
        Vec::new()
    }
}

/// Find the surface an interactive flow should be presented on
///
/// Takes the first foreground-active scene, its key window's root, then the
/// topmost surface below it. `None` when nothing qualifies.
pub fn find_presentation_anchor(ui: &dyn UiHierarchy) -> Option<Surface> {
    let scenes = ui.scenes();
    let scene = scenes
        .iter()
        .find(|scene| scene.activation == ActivationState::ForegroundActive)?;
    let root = scene
        .windows
        .iter()
        .find(|window| window.is_key)
        .and_then(|window| window.root.as_ref())?;
    Some(root.topmost().clone())
}
