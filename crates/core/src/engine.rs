use std::time::Duration;

use crossbeam_channel::Sender;

use crate::color::ColorAssigner;
use crate::config::EngineConfig;
use crate::filter::{FilterController, FilterState, ValueRange};
use crate::hierarchy;
use crate::human::format_value;
use crate::interaction::{cell_style, CellStyle, HoverState};
use crate::label::{fit_labels, FixedWidthMeasure, TextMeasure};
use crate::model::*;
use crate::render::{CellFrame, KeyAllocator, RenderCell, Scene};
use crate::search::NameQuery;
use crate::tooltip::{TooltipAnchor, TooltipContent, TooltipPanel, TooltipSurface};
use crate::treemap::{self, Layout, Padding};
use crate::zoom::{ZoomController, ZoomState, ZoomTransform};

/// Notifications for the embedding UI.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    CellClick(RenderCell),
    /// `None` when the pointer left every cell.
    CellHover(Option<RenderCell>),
    ZoomChange(ZoomState),
    FilterChange(FilterState),
    /// The working item set is empty; nothing is drawn.
    Empty,
}

/// One entry of the navigation trail. `index` is what
/// [`TreemapEngine::jump_to_breadcrumb`] expects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Breadcrumb {
    pub index: usize,
    pub name: String,
    /// `None` for the root view.
    pub node: Option<NodeRef>,
    pub is_current: bool,
}

#[derive(Debug, Default)]
struct ResizeCoalescer {
    pending: Option<(Size, Duration)>,
}

impl ResizeCoalescer {
    /// A new size re-arms the deadline; repeating the pending size keeps it.
    fn request(&mut self, size: Size, deadline: Duration) {
        match self.pending {
            Some((pending, _)) if pending == size => {}
            _ => self.pending = Some((size, deadline)),
        }
    }

    fn take_due(&mut self, now: Duration) -> Option<Size> {
        match self.pending {
            Some((size, deadline)) if now >= deadline => {
                self.pending = None;
                Some(size)
            }
            _ => None,
        }
    }

    fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// The treemap pipeline: items -> filter -> hierarchy -> layout -> zoom ->
/// render cells, plus the hover, click and tooltip handling on top.
///
/// Every operation is synchronous and absorbs bad input instead of failing.
/// Time is supplied by the caller through [`TreemapEngine::advance`] so
/// animations stay deterministic.
pub struct TreemapEngine<S: TooltipSurface = TooltipPanel> {
    config: EngineConfig,
    filter: FilterController,
    zoom: ZoomController,
    tree: Tree,
    global: Layout,
    view: Layout,
    transform: ZoomTransform,
    canvas: Size,
    scene: Scene,
    hover: HoverState,
    pointer: Option<(Point, Option<Point>)>,
    query: Option<NameQuery>,
    tooltip: S,
    events: Option<Sender<EngineEvent>>,
    resize: ResizeCoalescer,
    measure: Box<dyn TextMeasure>,
    now: Duration,
}

impl TreemapEngine<TooltipPanel> {
    /// Engine with the built-in tooltip panel.
    pub fn with_panel(config: EngineConfig) -> Self {
        let panel = TooltipPanel::new(config.tooltip.fade());
        Self::new(config, panel)
    }
}

impl<S: TooltipSurface> TreemapEngine<S> {
    pub fn new(config: EngineConfig, tooltip: S) -> Self {
        let tree = hierarchy::build(&[]);
        Self {
            scene: Scene::new(config.animation),
            config,
            filter: FilterController::new(),
            zoom: ZoomController::new(),
            tree,
            global: Layout::default(),
            view: Layout::default(),
            transform: ZoomTransform::IDENTITY,
            canvas: Size::default(),
            hover: HoverState::new(),
            pointer: None,
            query: None,
            tooltip,
            events: None,
            resize: ResizeCoalescer::default(),
            measure: Box::new(FixedWidthMeasure::default()),
            now: Duration::ZERO,
        }
    }

    pub fn with_events(mut self, tx: Sender<EngineEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_text_measure(mut self, measure: impl TextMeasure + 'static) -> Self {
        self.set_text_measure(measure);
        self
    }

    /// Swaps the text measurer and refits every label.
    pub fn set_text_measure(&mut self, measure: impl TextMeasure + 'static) {
        self.measure = Box::new(measure);
        self.render();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Applies a new configuration and redraws.
    pub fn set_config(&mut self, config: EngineConfig) {
        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "ignoring invalid engine config");
            return;
        }
        self.scene.set_animation(config.animation);
        self.config = config;
        self.relayout();
    }

    /// Replaces the data. The value range resets to the new data's full
    /// span and any zoom state is dropped.
    pub fn set_items(&mut self, items: Vec<Item>) {
        let was_zoomed = !self.zoom.state().is_root();
        self.filter.set_data(items);
        self.zoom.clear();
        self.tree = hierarchy::build(self.filter.filtered());
        self.relayout();
        self.emit(EngineEvent::FilterChange(self.filter.state().clone()));
        if was_zoomed {
            self.emit(EngineEvent::ZoomChange(self.zoom.state().clone()));
        }
    }

    /// Resizes the canvas and relayouts immediately.
    pub fn set_container_size(&mut self, size: Size) {
        self.resize.pending = None;
        if size == self.canvas {
            return;
        }
        tracing::debug!(width = size.width, height = size.height, "container resized");
        self.canvas = size;
        self.relayout();
    }

    /// Coalesces rapid resizes: the last size requested is applied once no
    /// new request arrived within the configured debounce window.
    pub fn request_resize(&mut self, size: Size) {
        let window = self.config.resize_debounce();
        if window.is_zero() {
            self.set_container_size(size);
        } else if size == self.canvas {
            // Back at the applied size; drop whatever was pending.
            self.resize.pending = None;
        } else {
            self.resize.request(size, self.now + window);
        }
    }

    pub fn set_padding(&mut self, padding: Padding) {
        if padding == self.config.padding {
            return;
        }
        self.config.padding = padding;
        self.relayout();
    }

    /// Moves the engine clock forward, applying any due resize and dropping
    /// finished exit animations.
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
        if let Some(size) = self.resize.take_due(self.now) {
            self.set_container_size(size);
        }
        self.scene.prune(self.now);
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn is_animating(&self) -> bool {
        self.scene.is_animating(self.now) || self.resize.is_pending()
    }

    pub fn set_value_range(&mut self, range: ValueRange) {
        if self.filter.set_value_range(range) {
            self.rebuild_filtered();
        }
    }

    pub fn clear_range(&mut self) {
        if self.filter.clear_range() {
            self.rebuild_filtered();
        }
    }

    /// Highlights cells whose name fuzzily matches `needle`. A blank needle
    /// clears the highlight.
    pub fn set_name_query(&mut self, needle: &str) {
        self.query = NameQuery::new(needle);
        self.render();
    }

    /// Click at a canvas position: a cell toggles its zoom target, the
    /// background resets to the root view.
    pub fn click(&mut self, p: Point) {
        match self.scene.hit_test(p).cloned() {
            Some(cell) => self.activate_cell(cell),
            None => {
                if self.zoom.zoom_reset() {
                    self.zoom_changed();
                }
            }
        }
    }

    /// Same as clicking the live cell that shows `node`. Returns false when
    /// no such cell is on screen.
    pub fn activate(&mut self, node: NodeRef) -> bool {
        let Some(cell) = self.scene.cells().find(|c| c.node == node).cloned() else {
            return false;
        };
        self.activate_cell(cell);
        true
    }

    fn activate_cell(&mut self, cell: RenderCell) {
        let node = cell.node;
        self.emit(EngineEvent::CellClick(cell));
        if self.zoom.toggle_node(&self.tree, node) {
            self.zoom_changed();
        }
    }

    /// Pointer moved. `canvas` is the position in canvas coordinates,
    /// `screen` the same position on screen for tooltip placement; `None`
    /// means the pointer left the canvas.
    pub fn hover(&mut self, canvas: Option<Point>, screen: Option<Point>) {
        self.pointer = canvas.map(|p| (p, screen));
        self.update_hover();
    }

    pub fn zoom_in(&mut self, node: NodeRef) {
        if self.zoom.zoom_in(&self.tree, node) {
            self.zoom_changed();
        }
    }

    /// Zooms along a name path from the root, as shown by the breadcrumbs.
    pub fn zoom_to_path<T: AsRef<str>>(&mut self, path: &[T]) -> bool {
        let Some(id) = self.tree.find_path(path) else {
            tracing::warn!(depth = path.len(), "zoom path not found");
            return false;
        };
        let changed = self.zoom.zoom_in(&self.tree, self.tree.node_ref(id));
        if changed {
            self.zoom_changed();
        }
        changed
    }

    pub fn zoom_out(&mut self) {
        if self.zoom.zoom_out(&self.tree) {
            self.zoom_changed();
        }
    }

    pub fn zoom_reset(&mut self) {
        if self.zoom.zoom_reset() {
            self.zoom_changed();
        }
    }

    /// Index 0 is the root view; index `i > 0` is entry `i - 1` of the
    /// back stack. The current view's own index is a no-op.
    pub fn jump_to_breadcrumb(&mut self, index: usize) {
        let changed = if index == 0 {
            self.zoom.zoom_reset()
        } else {
            self.zoom.jump_to_breadcrumb(index - 1)
        };
        if changed {
            self.zoom_changed();
        }
    }

    pub fn breadcrumbs(&self) -> Vec<Breadcrumb> {
        let state = self.zoom.state();
        let mut crumbs = vec![Breadcrumb {
            index: 0,
            name: self.tree.root_node().name.clone(),
            node: None,
            is_current: state.current.is_none(),
        }];
        let stack = state.previous.iter().chain(state.current.iter());
        for (i, node) in stack.enumerate() {
            let Some(n) = self.tree.resolve(*node) else {
                continue;
            };
            crumbs.push(Breadcrumb {
                index: i + 1,
                name: n.name.clone(),
                node: Some(*node),
                is_current: i == state.previous.len(),
            });
        }
        crumbs
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn zoom_state(&self) -> &ZoomState {
        self.zoom.state()
    }

    pub fn filter_state(&self) -> &FilterState {
        self.filter.state()
    }

    pub fn full_range(&self) -> Option<ValueRange> {
        self.filter.full_range()
    }

    /// Transform from the global layout to the current view.
    pub fn zoom_transform(&self) -> ZoomTransform {
        self.transform
    }

    /// Layout of the current view in canvas coordinates.
    pub fn view_layout(&self) -> &Layout {
        &self.view
    }

    /// Live cells of the current view in leaf order.
    pub fn cells(&self) -> impl Iterator<Item = &RenderCell> + '_ {
        self.scene.cells()
    }

    pub fn frames(&self) -> Vec<CellFrame<'_>> {
        self.scene.frames(self.now)
    }

    pub fn hovered(&self) -> Option<&RenderCell> {
        self.hover.current().and_then(|k| self.scene.get(k))
    }

    pub fn style(&self, frame: &CellFrame<'_>) -> CellStyle {
        let hovered = self.hover.is_hovered(&frame.cell.key);
        cell_style(frame.cell, hovered, frame.opacity, &self.config.hover)
    }

    pub fn tooltip(&self) -> &S {
        &self.tooltip
    }

    pub fn tooltip_mut(&mut self) -> &mut S {
        &mut self.tooltip
    }

    fn rebuild_filtered(&mut self) {
        let before = self.zoom.state().clone();
        let tree = hierarchy::build(self.filter.filtered());
        self.zoom.rebase(&self.tree, &tree);
        self.tree = tree;
        self.relayout();
        self.emit(EngineEvent::FilterChange(self.filter.state().clone()));
        if *self.zoom.state() != before {
            self.emit(EngineEvent::ZoomChange(self.zoom.state().clone()));
        }
    }

    fn zoom_changed(&mut self) {
        self.update_view();
        self.render();
        self.emit(EngineEvent::ZoomChange(self.zoom.state().clone()));
    }

    fn relayout(&mut self) {
        self.global = treemap::layout(
            &self.tree,
            self.canvas.width,
            self.canvas.height,
            self.config.padding,
        );
        self.update_view();
        self.render();
        if self.tree.is_empty() {
            self.emit(EngineEvent::Empty);
        }
    }

    // The zoomed node is laid out afresh inside its magnified rectangle
    // rather than scaling the global tiles, so leaf rounding stays exact.
    fn update_view(&mut self) {
        let zoomed = self
            .zoom
            .current()
            .and_then(|n| self.tree.resolve(n))
            .map(|n| n.id);
        let fitted = zoomed.and_then(|id| {
            let rect = self.global.rect(id)?;
            let t = ZoomTransform::fit(rect, self.canvas)?;
            Some((id, rect, t))
        });
        match fitted {
            Some((id, rect, t)) => {
                self.transform = t;
                self.view = treemap::layout_within(&self.tree, id, t.apply(rect), self.config.padding);
            }
            None => {
                if zoomed.is_some() {
                    tracing::debug!("zoomed node has no area on this canvas, showing root");
                }
                self.transform = ZoomTransform::IDENTITY;
                self.view = self.global.clone();
            }
        }
    }

    fn view_root(&self) -> NodeId {
        self.zoom
            .current()
            .and_then(|n| self.tree.resolve(n))
            .map_or(self.tree.root, |n| n.id)
    }

    fn render(&mut self) {
        let cells = self.build_cells();
        tracing::debug!(cells = cells.len(), "render pass");
        let diff = self.scene.reconcile(cells, self.now);
        tracing::trace!(
            entered = diff.entered.len(),
            updated = diff.updated.len(),
            exited = diff.exited.len(),
            "reconciled scene"
        );
        self.update_hover();
    }

    fn build_cells(&self) -> Vec<RenderCell> {
        if self.view.is_empty() {
            return Vec::new();
        }
        let root = self.view_root();
        let colors = ColorAssigner::new(self.config.color.clone(), self.tree.max_leaf_value(root));
        let inner = self.config.padding.inner;
        let mut keys = KeyAllocator::default();
        let mut cells = Vec::new();

        for id in self.tree.leaves(root) {
            let Some(rect) = self.view.rect(id) else { continue };
            if rect.is_empty() {
                continue;
            }
            let node = &self.tree.nodes[id.index()];
            let value = node.aggregate;
            let sibling_index = node
                .parent
                .and_then(|p| self.tree.get(p))
                .and_then(|p| p.children().iter().position(|c| *c == id))
                .unwrap_or(0);
            let draw_rect = rect.inset(inner / 2.0);
            let value_text = format_value(value, self.config.value_format);
            let labels = fit_labels(
                draw_rect,
                &node.name,
                &value_text,
                &self.config.labels,
                self.measure.as_ref(),
            );
            cells.push(RenderCell {
                key: keys.key(&node.name),
                node: self.tree.node_ref(id),
                name: node.name.clone(),
                value,
                depth: node.depth,
                index: cells.len(),
                rect,
                draw_rect,
                color: colors.color(sibling_index, value),
                labels,
                matched: self.query.as_ref().is_some_and(|q| q.matches(&node.name)),
            });
        }
        cells
    }

    fn update_hover(&mut self) {
        let target = self
            .pointer
            .and_then(|(p, _)| self.scene.hit_test(p))
            .cloned();
        let events = self.hover.update(target.as_ref().map(|c| c.key.clone()));
        if !events.is_empty() {
            self.emit(EngineEvent::CellHover(target.clone()));
        }
        match target {
            Some(cell) => {
                let content = TooltipContent {
                    value: format_value(cell.value, self.config.value_format),
                    name: cell.name,
                };
                let anchor = TooltipAnchor {
                    cell: cell.rect,
                    pointer: self.pointer.and_then(|(_, screen)| screen),
                };
                self.tooltip.show(content, anchor, self.now);
            }
            None => self.tooltip.hide(self.now),
        }
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(tx) = &self.events {
            if tx.send(event).is_err() {
                tracing::debug!("event receiver dropped");
            }
        }
    }
}
