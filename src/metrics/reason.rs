//! Causes of forced (synchronous) style and layout updates.

use super::slots::ForcedLayoutCategory;
use serde::{Deserialize, Serialize};

/// Why the host forced a style and layout update outside the normal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentUpdateReason {
    /// Context menu opened
    ContextMenu,
    /// Editing commands
    Editing,
    /// Find-in-page highlighting
    FindInPage,
    /// Focus change
    Focus,
    /// Form control state
    Form,
    /// Input event handling
    Input,
    /// Developer tools
    Inspector,
    /// Print layout
    Printing,
    /// Selection change
    Selection,
    /// Spatial navigation
    SpatialNavigation,
    /// Tap highlight
    TapHighlight,
    /// Accessibility tree queries
    Accessibility,
    /// Base background color
    BaseColor,
    /// Display lock activation
    DisplayLock,
    /// Intersection observer computation
    IntersectionObservation,
    /// Overlay painting
    Overlay,
    /// Page popup
    PagePopup,
    /// Viewport or frame resize
    SizeChange,
    /// Spell checking
    SpellCheck,
    /// Canvas drawing
    Canvas,
    /// Plugin
    Plugin,
    /// SVG image rendering
    SvgImage,
    /// Scroll offset queries
    Scroll,
    /// Hit testing
    HitTest,
    /// Script reading layout
    JavaScript,
    /// Main frame lifecycle
    BeginMainFrame,
    /// Test harness
    Test,
    /// Unattributed
    Unknown,
}

impl DocumentUpdateReason {
    /// Sub-attribution bucket, or `None` for reasons that are not broken out
    pub fn category(self) -> Option<ForcedLayoutCategory> {
        use DocumentUpdateReason::*;

        match self {
            ContextMenu | Editing | FindInPage | Focus | Form | Input | Inspector | Printing
            | Selection | SpatialNavigation | TapHighlight => {
                Some(ForcedLayoutCategory::UserDriven)
            },
            Accessibility | BaseColor | DisplayLock | IntersectionObservation | Overlay
            | PagePopup | SizeChange | SpellCheck => Some(ForcedLayoutCategory::Service),
            Canvas | Plugin | SvgImage => Some(ForcedLayoutCategory::Content),
            Scroll => Some(ForcedLayoutCategory::Scroll),
            HitTest => Some(ForcedLayoutCategory::HitTest),
            JavaScript => Some(ForcedLayoutCategory::Javascript),
            BeginMainFrame | Test | Unknown => None,
        }
    }
}
