//! The metric slot table.
//!
//! A slot is one named category of work (style, layout, paint, ...) with its
//! own accumulator. Slot ids are dense and zero based so every per-slot array
//! in the aggregator is indexed directly by id.

use crate::core::{Result, UkmError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Dense index of a slot within its [`SlotTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u16);

impl SlotId {
    /// Position in per-slot arrays
    #[inline(always)]
    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Cause category of a forced style and layout update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedLayoutCategory {
    /// User interaction
    UserDriven,
    /// Browser services
    Service,
    /// Content-triggered work
    Content,
    /// Scrolling
    Scroll,
    /// Hit testing
    HitTest,
    /// Script
    Javascript,
}

impl ForcedLayoutCategory {
    /// Slot role that accumulates this category
    pub fn role(self) -> SlotRole {
        match self {
            Self::UserDriven => SlotRole::UserDrivenDocumentUpdate,
            Self::Service => SlotRole::ServiceDocumentUpdate,
            Self::Content => SlotRole::ContentDocumentUpdate,
            Self::Scroll => SlotRole::ScrollDocumentUpdate,
            Self::HitTest => SlotRole::HitTestDocumentUpdate,
            Self::Javascript => SlotRole::JavascriptDocumentUpdate,
        }
    }
}

/// What the aggregator itself uses a slot for.
///
/// Slots without a role are plain accumulators fed by timers or counts; slots
/// with a role are targeted by specific aggregator operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    /// Input event dispatch
    HandleInputEvents,
    /// Animation ticks
    Animate,
    /// Style recalculation
    Style,
    /// Layout
    Layout,
    /// Accessibility tree update
    Accessibility,
    /// Pre-paint tree walk
    PrePaint,
    /// Compositing input update
    CompositingInputs,
    /// Paint
    Paint,
    /// Compositor commit on the main thread
    CompositingCommit,
    /// Forced style and layout outside the frame
    ForcedStyleAndLayout,
    /// Commit on the compositor thread
    ImplCompositorCommit,
    /// Wait for the compositor to start the commit
    WaitForCommit,
    /// Forced updates caused by user interaction
    UserDrivenDocumentUpdate,
    /// Forced updates caused by browser services
    ServiceDocumentUpdate,
    /// Forced updates caused by content
    ContentDocumentUpdate,
    /// Forced updates caused by scrolling
    ScrollDocumentUpdate,
    /// Forced updates caused by hit testing
    HitTestDocumentUpdate,
    /// Forced updates caused by script
    JavascriptDocumentUpdate,
    /// Delay from a frame request to the frame that serves it
    VisualUpdateDelay,
}

impl SlotRole {
    /// Stable lowercase name used in errors and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HandleInputEvents => "handle_input_events",
            Self::Animate => "animate",
            Self::Style => "style",
            Self::Layout => "layout",
            Self::Accessibility => "accessibility",
            Self::PrePaint => "pre_paint",
            Self::CompositingInputs => "compositing_inputs",
            Self::Paint => "paint",
            Self::CompositingCommit => "compositing_commit",
            Self::ForcedStyleAndLayout => "forced_style_and_layout",
            Self::ImplCompositorCommit => "impl_compositor_commit",
            Self::WaitForCommit => "wait_for_commit",
            Self::UserDrivenDocumentUpdate => "user_driven_document_update",
            Self::ServiceDocumentUpdate => "service_document_update",
            Self::ContentDocumentUpdate => "content_document_update",
            Self::ScrollDocumentUpdate => "scroll_document_update",
            Self::HitTestDocumentUpdate => "hit_test_document_update",
            Self::JavascriptDocumentUpdate => "javascript_document_update",
            Self::VisualUpdateDelay => "visual_update_delay",
        }
    }
}

/// Declarative description of one slot, as found in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSpec {
    /// Metric name used for UKM fields and UMA histograms
    pub name: String,
    /// Also feed the pre/post-FCP cumulative histograms
    #[serde(default = "default_true")]
    pub has_uma: bool,
    /// Pass reported values through exponential bucketing
    #[serde(default)]
    pub bucketed: bool,
    /// Only emit UMA on sampled main frames
    #[serde(default)]
    pub intersection_observer: bool,
    /// Role the aggregator uses this slot for, if any
    #[serde(default)]
    pub role: Option<SlotRole>,
}

fn default_true() -> bool {
    true
}

impl SlotSpec {
    /// Plain timer slot with UMA
    pub fn timer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            has_uma: true,
            bucketed: false,
            intersection_observer: false,
            role: None,
        }
    }

    /// Set the role
    pub fn role(mut self, role: SlotRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Mark as bucketed
    pub fn bucketed(mut self) -> Self {
        self.bucketed = true;
        self
    }

    /// Mark as an intersection observer slot
    pub fn intersection_observer(mut self) -> Self {
        self.intersection_observer = true;
        self
    }
}

/// A validated slot with its assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSlot {
    /// Dense index into per-slot storage
    pub id: SlotId,
    /// Metric and histogram name
    pub name: String,
    /// Whether samples also go to histograms
    pub has_uma: bool,
    /// Whether reported values are bucketed
    pub bucketed: bool,
    /// Whether histogram samples are period-gated
    pub intersection_observer: bool,
    /// Operation that targets this slot, if any
    pub role: Option<SlotRole>,
}

/// Immutable, validated set of slots.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotTable {
    slots: Vec<MetricSlot>,
    roles: HashMap<SlotRole, SlotId>,
}

impl SlotTable {
    /// Build a table from specs; ids follow list order.
    pub fn from_specs(specs: &[SlotSpec]) -> Result<Self> {
        if specs.is_empty() {
            return Err(UkmError::EmptySlotTable);
        }
        let max = usize::from(u16::MAX);
        if specs.len() > max {
            return Err(UkmError::TooManySlots {
                count: specs.len(),
                max,
            });
        }

        let mut names = HashSet::with_capacity(specs.len());
        let mut roles: HashMap<SlotRole, SlotId> = HashMap::new();
        let mut slots = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(UkmError::config(format!("slot {} has an empty name", index)));
            }
            if !names.insert(spec.name.as_str()) {
                return Err(UkmError::DuplicateSlotName(spec.name.clone()));
            }

            // Bounded by the length check above.
            let id = SlotId(index as u16);
            if let Some(role) = spec.role {
                if let Some(previous) = roles.insert(role, id) {
                    return Err(UkmError::DuplicateSlotRole {
                        role: role.as_str(),
                        first: specs[previous.index()].name.clone(),
                        second: spec.name.clone(),
                    });
                }
            }

            slots.push(MetricSlot {
                id,
                name: spec.name.clone(),
                has_uma: spec.has_uma,
                bucketed: spec.bucketed,
                intersection_observer: spec.intersection_observer,
                role: spec.role,
            });
        }

        Ok(Self { slots, roles })
    }

    /// Specs of the standard rendering pipeline table.
    pub fn standard_specs() -> Vec<SlotSpec> {
        use SlotRole::*;

        vec![
            SlotSpec::timer("CompositingCommit").role(CompositingCommit),
            SlotSpec::timer("CompositingInputs").role(CompositingInputs),
            SlotSpec::timer("ImplCompositorCommit").role(ImplCompositorCommit),
            SlotSpec::timer("IntersectionObservation"),
            SlotSpec::timer("Paint").role(Paint),
            SlotSpec::timer("PrePaint").role(PrePaint),
            SlotSpec::timer("Style").role(Style),
            SlotSpec::timer("Layout").role(Layout),
            SlotSpec::timer("HandleInputEvents").role(HandleInputEvents),
            SlotSpec::timer("Animate").role(Animate),
            SlotSpec::timer("UpdateLayers"),
            SlotSpec::timer("WaitForCommit").role(WaitForCommit),
            SlotSpec::timer("Accessibility").role(Accessibility),
            SlotSpec::timer("HitTest"),
            SlotSpec::timer("ParseStyleSheet"),
            SlotSpec::timer("UpdateViewportIntersection"),
            SlotSpec::timer("DisplayLockIntersectionObserver").intersection_observer(),
            SlotSpec::timer("JavascriptIntersectionObserver").intersection_observer(),
            SlotSpec::timer("LazyLoadIntersectionObserver").intersection_observer(),
            SlotSpec::timer("MediaIntersectionObserver").intersection_observer(),
            SlotSpec::timer("AnchorElementMetricsIntersectionObserver").intersection_observer(),
            SlotSpec::timer("ForcedStyleAndLayout").role(ForcedStyleAndLayout),
            SlotSpec::timer("UserDrivenDocumentUpdate").role(UserDrivenDocumentUpdate),
            SlotSpec::timer("ServiceDocumentUpdate").role(ServiceDocumentUpdate),
            SlotSpec::timer("ContentDocumentUpdate").role(ContentDocumentUpdate),
            SlotSpec::timer("ScrollDocumentUpdate").role(ScrollDocumentUpdate),
            SlotSpec::timer("HitTestDocumentUpdate").role(HitTestDocumentUpdate),
            SlotSpec::timer("JavascriptDocumentUpdate").role(JavascriptDocumentUpdate),
            SlotSpec::timer("IntersectionObservationInternalCount").bucketed(),
            SlotSpec::timer("IntersectionObservationJavascriptCount").bucketed(),
            SlotSpec::timer("VisualUpdateDelay").role(VisualUpdateDelay),
            SlotSpec::timer("PossibleSynchronizedScrollCount2"),
        ]
    }

    /// The standard rendering pipeline table
    pub fn standard() -> Self {
        Self::from_specs(&Self::standard_specs())
            .expect("standard slot table is statically valid")
    }

    /// Number of slots; every per-slot array has this length
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Always false for a validated table
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Slot by id
    pub fn get(&self, id: SlotId) -> Option<&MetricSlot> {
        self.slots.get(id.index())
    }

    /// Slot by metric name
    pub fn find(&self, name: &str) -> Option<SlotId> {
        self.slots.iter().find(|slot| slot.name == name).map(|slot| slot.id)
    }

    /// Slot carrying `role`, if the table defines one
    pub fn slot_for(&self, role: SlotRole) -> Option<SlotId> {
        self.roles.get(&role).copied()
    }

    /// Iterate slots in id order
    pub fn iter(&self) -> std::slice::Iter<'_, MetricSlot> {
        self.slots.iter()
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'a> IntoIterator for &'a SlotTable {
    type Item = &'a MetricSlot;
    type IntoIter = std::slice::Iter<'a, MetricSlot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_is_dense() {
        let table = SlotTable::standard();
        for (index, slot) in table.iter().enumerate() {
            assert_eq!(slot.id.index(), index);
        }
        assert_eq!(table.len(), SlotTable::standard_specs().len());
    }

    #[test]
    fn test_standard_roles_resolve() {
        let table = SlotTable::standard();
        let style = table.slot_for(SlotRole::Style).unwrap();
        assert_eq!(table.get(style).unwrap().name, "Style");

        for category in [
            ForcedLayoutCategory::UserDriven,
            ForcedLayoutCategory::Service,
            ForcedLayoutCategory::Content,
            ForcedLayoutCategory::Scroll,
            ForcedLayoutCategory::HitTest,
            ForcedLayoutCategory::Javascript,
        ] {
            assert!(table.slot_for(category.role()).is_some());
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let specs = vec![SlotSpec::timer("Style"), SlotSpec::timer("Style")];
        assert!(matches!(
            SlotTable::from_specs(&specs),
            Err(UkmError::DuplicateSlotName(name)) if name == "Style"
        ));
    }

    #[test]
    fn test_duplicate_role_rejected() {
        let specs = vec![
            SlotSpec::timer("Style").role(SlotRole::Style),
            SlotSpec::timer("Restyle").role(SlotRole::Style),
        ];
        let err = SlotTable::from_specs(&specs).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Metric slot role style assigned to both 'Style' and 'Restyle'"
        );
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(SlotTable::from_specs(&[]), Err(UkmError::EmptySlotTable)));
    }

    #[test]
    fn test_missing_role_is_none() {
        let table = SlotTable::from_specs(&[SlotSpec::timer("Style")]).unwrap();
        assert_eq!(table.slot_for(SlotRole::ForcedStyleAndLayout), None);
        assert_eq!(table.find("Style"), Some(SlotId(0)));
    }
}
