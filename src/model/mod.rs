//! Editable hierarchy model shared by several views.
//!
//! ```text
//!   view A ──edit──► HierarchyModel ──rebuild──► ModelState
//!                         │                          │
//!                         └──── notify (all but A) ◄─┘
//! ```
//!
//! Every edit is applied in place and immediately followed by a full rebuild;
//! there is no incremental update. While the model is hidden, rebuilds are
//! deferred until it becomes visible again.

use std::path::Path;

use tracing::debug;

use crate::error::{ConfigurationError, HierarchyResult};
use crate::hierarchy::{GroupEdit, Hierarchy, IntervalEdit, OrderEdit};
use crate::layout::{Layout, LayoutEngine};
use crate::spec::HierarchySpec;
use crate::types::DataTypeSpec;

/// Handle returned by [`HierarchyModel::register`].
pub type ViewId = usize;

/// Receives the rebuilt state after every change.
pub trait ModelListener {
    fn model_changed(&mut self, state: &ModelState);
}

impl<F: FnMut(&ModelState)> ModelListener for F {
    fn model_changed(&mut self, state: &ModelState) {
        self(state)
    }
}

/// Everything derived from the current specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelState {
    pub hierarchy: Option<Hierarchy>,
    /// Number of distinct labels per hierarchy level.
    pub groups: Vec<usize>,
    /// Why the specification cannot be built, `None` when it can.
    pub error: Option<String>,
    pub layout: Option<Layout>,
}

pub struct HierarchyModel {
    attribute: DataTypeSpec,
    values: Vec<String>,
    spec: HierarchySpec,
    engine: LayoutEngine,
    state: ModelState,
    visible: bool,
    stale: bool,
    views: Vec<(ViewId, Box<dyn ModelListener>)>,
    next_view: ViewId,
}

impl HierarchyModel {
    /// Create a model for an attribute of type `attribute` with its raw values.
    ///
    /// The model starts hidden; nothing is built until it is made visible.
    pub fn new<I, S>(
        attribute: DataTypeSpec,
        values: I,
        spec: HierarchySpec,
    ) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        spec.check_compatible(&attribute)?;
        Ok(Self {
            attribute,
            values: values.into_iter().map(Into::into).collect(),
            spec,
            engine: LayoutEngine::default(),
            state: ModelState::default(),
            visible: false,
            stale: true,
            views: Vec::new(),
            next_view: 0,
        })
    }

    pub fn with_engine(mut self, engine: LayoutEngine) -> Self {
        self.engine = engine;
        self.stale = true;
        self
    }

    pub fn attribute(&self) -> &DataTypeSpec {
        &self.attribute
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn spec(&self) -> &HierarchySpec {
        &self.spec
    }

    pub fn state(&self) -> &ModelState {
        &self.state
    }

    pub fn hierarchy(&self) -> Option<&Hierarchy> {
        self.state.hierarchy.as_ref()
    }

    pub fn groups(&self) -> &[usize] {
        &self.state.groups
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn layout(&self) -> Option<&Layout> {
        self.state.layout.as_ref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Register a view; it is notified of every change it did not send.
    pub fn register(&mut self, view: impl ModelListener + 'static) -> ViewId {
        let id = self.next_view;
        self.next_view += 1;
        self.views.push((id, Box::new(view)));
        id
    }

    pub fn unregister(&mut self, id: ViewId) -> bool {
        let before = self.views.len();
        self.views.retain(|(view, _)| *view != id);
        self.views.len() != before
    }

    /// Show or hide the model. Showing it runs any deferred rebuild.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible && self.stale {
            self.update(None);
        }
    }

    /// Rebuild and notify every registered view except `sender`.
    pub fn update(&mut self, sender: Option<ViewId>) {
        if !self.visible {
            self.stale = true;
            return;
        }
        self.rebuild();
        self.stale = false;

        debug!(
            kind = self.spec.kind(),
            views = self.views.len(),
            error = self.state.error.as_deref().unwrap_or(""),
            "hierarchy model updated"
        );

        for (id, view) in &mut self.views {
            if Some(*id) != sender {
                view.model_changed(&self.state);
            }
        }
    }

    fn rebuild(&mut self) {
        let mut state = ModelState::default();
        if let Err(e) = self.spec.validate() {
            state.error = Some(e.to_string());
            self.state = state;
            return;
        }
        match self.spec.build(&self.values) {
            Ok(hierarchy) => {
                state.groups = hierarchy.group_counts();
                state.hierarchy = Some(hierarchy);
            }
            Err(e) => state.error = Some(e.to_string()),
        }
        match self.spec.layout(&self.engine, &self.values) {
            Ok(layout) => state.layout = layout,
            Err(e) => {
                state.error.get_or_insert_with(|| e.to_string());
            }
        }
        self.state = state;
    }

    /// Replace the specification after checking it against the attribute.
    pub fn set_spec(
        &mut self,
        spec: HierarchySpec,
        sender: Option<ViewId>,
    ) -> Result<(), ConfigurationError> {
        spec.check_compatible(&self.attribute)?;
        self.spec = spec;
        self.update(sender);
        Ok(())
    }

    pub fn edit_intervals(&mut self, edit: &IntervalEdit, sender: Option<ViewId>) -> HierarchyResult<()> {
        self.spec.edit_intervals(edit)?;
        self.update(sender);
        Ok(())
    }

    pub fn edit_groups(&mut self, edit: &GroupEdit, sender: Option<ViewId>) -> HierarchyResult<()> {
        self.spec.edit_groups(edit)?;
        self.update(sender);
        Ok(())
    }

    pub fn edit_order(&mut self, edit: &OrderEdit, sender: Option<ViewId>) -> HierarchyResult<()> {
        self.spec.edit_order(edit, &self.values)?;
        self.update(sender);
        Ok(())
    }

    /// Fit the interval ranges to the current values.
    pub fn update_ranges(&mut self, sender: Option<ViewId>) -> HierarchyResult<()> {
        self.spec.update_ranges(&self.values)?;
        self.update(sender);
        Ok(())
    }

    /// Replace the raw values, e.g. after the attribute was re-read.
    pub fn set_values<I, S>(&mut self, values: I, sender: Option<ViewId>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.values = values.into_iter().map(Into::into).collect();
        self.update(sender);
    }

    pub fn load(&mut self, path: &Path, sender: Option<ViewId>) -> Result<(), ConfigurationError> {
        let spec = HierarchySpec::load_for(path, &self.attribute)?;
        self.spec = spec;
        self.update(sender);
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigurationError> {
        self.spec.save(path)
    }
}
