#![forbid(unsafe_code)]

//! One mounted diagram.
//!
//! A [`VectorVis`] owns everything needed to draw one vector: the current
//! view tree, the sprites on screen, the last computed layout and the hover
//! state of the split affordance. It never talks to the store; the session
//! feeds it snapshots and acts on the split requests it emits.
//!
//! Every pass goes through the same pipeline:
//!
//! 1. collect the visible nodes of the view tree (parents first),
//! 2. lay them out,
//! 3. colour them by address,
//! 4. hand the targets to the reconciler with the transition source.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use rrbvis_core::geometry::{Point, Rect};
use rrbvis_core::hover::{HoverAffordance, HoverEvent};
use rrbvis_layout::{LayoutConfig, LayoutTree, NodeId, NodeShape, TreeLayout};
use web_time::Instant;

use crate::color::ColorTracker;
use crate::config::VisConfig;
use crate::error::VisError;
use crate::expansion::select_expanded;
use crate::reconcile::{LinkTarget, NodeTarget, NodeVisual, Reconciler, RenderPass, RenderReport};
use crate::snapshot::{RawSnapshot, Snapshot};
use crate::store::VectorId;
use crate::surface::{Frame, FrameArray};
use crate::view::{ViewId, ViewKind, ViewNode, ViewTree};

/// A cell of a leaf array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub node_key: String,
    pub cell: usize,
    /// Position of the cell's element in the whole vector.
    pub element_index: usize,
}

/// Emitted when the split affordance is clicked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitRequest {
    pub vector: VectorId,
    /// Elements `index..` move to the new vector.
    pub index: usize,
}

/// Emitted after a node was opened or closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleEvent {
    pub key: String,
    pub expanded: bool,
}

/// The split affordance as currently shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Affordance {
    pub rect: Rect,
    pub cell: CellRef,
}

/// What sits under a point.
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Affordance { index: usize },
    Cell(CellRef),
    Node { key: String },
}

type SplitListener = Box<dyn FnMut(&SplitRequest)>;
type ToggleListener = Box<dyn FnMut(&ToggleEvent)>;

/// Layout of the last pass plus the view node behind each layout node.
#[derive(Debug, Clone, Default)]
struct Placement {
    layout: TreeLayout,
    views: Vec<ViewId>,
    by_view: HashMap<ViewId, NodeId>,
}

pub struct VectorVis {
    vector: VectorId,
    config: VisConfig,
    layout_config: LayoutConfig,
    view: ViewTree,
    reconciler: Reconciler,
    placement: Placement,
    hover: HoverAffordance<CellRef>,
    split_listeners: Vec<SplitListener>,
    toggle_listeners: Vec<ToggleListener>,
}

impl fmt::Debug for VectorVis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorVis")
            .field("vector", &self.vector)
            .field("nodes", &self.view.len())
            .field("sprites", &self.reconciler.sprite_count())
            .field("hover", self.hover.state())
            .finish_non_exhaustive()
    }
}

impl VectorVis {
    pub fn new(vector: VectorId, config: VisConfig) -> Self {
        Self {
            vector,
            layout_config: config.layout(),
            hover: HoverAffordance::new(config.hover()),
            config,
            view: ViewTree::default(),
            reconciler: Reconciler::new(),
            placement: Placement::default(),
            split_listeners: Vec::new(),
            toggle_listeners: Vec::new(),
        }
    }

    pub fn vector(&self) -> VectorId {
        self.vector
    }

    pub fn view(&self) -> &ViewTree {
        &self.view
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Layout of the last pass.
    pub fn layout(&self) -> &TreeLayout {
        &self.placement.layout
    }

    pub fn on_split_requested(&mut self, listener: impl FnMut(&SplitRequest) + 'static) {
        self.split_listeners.push(Box::new(listener));
    }

    pub fn on_expand_toggled(&mut self, listener: impl FnMut(&ToggleEvent) + 'static) {
        self.toggle_listeners.push(Box::new(listener));
    }

    /// Replace the displayed tree.
    ///
    /// The expansion policy is re-run on the new tree and the root is the
    /// transition source. A snapshot that fails to normalize leaves the
    /// current picture untouched.
    pub fn set_tree_snapshot(
        &mut self,
        raw: &RawSnapshot,
        colors: &mut ColorTracker,
    ) -> Result<RenderReport, VisError> {
        let snapshot = match Snapshot::from_raw(raw, self.config.branching_factor) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(vector = %self.vector, error = %err, "snapshot rejected");
                return Err(err.into());
            }
        };
        let expansion = select_expanded(snapshot.root.as_ref());
        let mut view = ViewTree::build(&snapshot);
        view.apply(&expansion);
        view.carry_positions(&self.view);
        self.view = view;
        Ok(self.render(None, self.config.transition, colors))
    }

    /// Open or close `key`'s children with the node as transition source.
    ///
    /// Unknown keys, nodes that are not on screen, and nodes without
    /// children are ignored.
    pub fn toggle(
        &mut self,
        key: &str,
        slow_motion: bool,
        colors: &mut ColorTracker,
    ) -> Option<RenderReport> {
        let id = self.view.id_of(key)?;
        if !self.placement.by_view.contains_key(&id) {
            tracing::trace!(vector = %self.vector, key, "toggle on hidden node ignored");
            return None;
        }
        let Some(expanded) = self.view.toggle(key) else {
            tracing::trace!(vector = %self.vector, key, "toggle ignored");
            return None;
        };
        let event = ToggleEvent {
            key: key.to_string(),
            expanded,
        };
        for listener in &mut self.toggle_listeners {
            listener(&event);
        }
        let duration = self.config.transition_for(slow_motion);
        Some(self.render(Some(id), duration, colors))
    }

    /// Re-render the current tree (e.g. after the palette was reset).
    pub fn rerender(&mut self, colors: &mut ColorTracker) -> RenderReport {
        self.render(None, self.config.transition, colors)
    }

    fn render(
        &mut self,
        source: Option<ViewId>,
        duration: Duration,
        colors: &mut ColorTracker,
    ) -> RenderReport {
        let span = tracing::debug_span!("rrbvis.render", vector = %self.vector);
        let _guard = span.enter();

        let visible = self.view.visible();
        let mut tree = LayoutTree::new();
        let mut by_view = HashMap::with_capacity(visible.len());
        for &vid in &visible {
            let Some(node) = self.view.node(vid) else {
                continue;
            };
            let shape = shape_of(&node.kind);
            let parent = node.parent.and_then(|p| by_view.get(&p).copied());
            let lid = match parent {
                Some(parent) => tree.add_child_at(parent, shape, node.cells, node.slot),
                None => tree.push_root(shape, node.cells),
            };
            by_view.insert(vid, lid);
        }
        tree.set_tail(self.view.tail().len());
        let layout = rrbvis_layout::layout(&tree, &self.layout_config);

        let mut nodes = Vec::with_capacity(visible.len());
        for (lid, &vid) in visible.iter().enumerate() {
            let position = layout.positions.get(lid).copied().unwrap_or(Point::ZERO);
            let Some(node) = self.view.node_mut(vid) else {
                continue;
            };
            node.position = position;
            let color = match (&node.kind, node.address) {
                (ViewKind::Value { .. }, _) | (_, None) => None,
                (_, Some(address)) => Some(colors.color_for(address)),
            };
            node.color = color;
            nodes.push(NodeTarget {
                key: node.key.clone(),
                position,
                visual: visual_of(node),
            });
        }

        let links = layout
            .links
            .iter()
            .filter_map(|link| {
                let vid = *visible.get(link.target)?;
                Some(LinkTarget {
                    key: self.view.node(vid)?.key.clone(),
                    from: link.from,
                    to: link.to,
                    kind: link.kind,
                })
            })
            .collect();

        let source = source.or_else(|| self.view.root());
        let (source_from, source_to) = source
            .and_then(|id| self.view.node(id))
            .map_or((Point::ZERO, Point::ZERO), |n| {
                (n.previous_position, n.position)
            });

        let report = self.reconciler.render(RenderPass {
            nodes,
            links,
            source_from,
            source_to,
            viewport: layout.viewport,
            duration,
        });
        self.view.stamp_positions();
        self.placement = Placement {
            layout,
            views: visible,
            by_view,
        };

        let view = &self.view;
        let by_view = &self.placement.by_view;
        self.hover.forget(|cell| {
            view.id_of(&cell.node_key)
                .is_none_or(|id| !by_view.contains_key(&id))
        });

        tracing::debug!(
            vector = %self.vector,
            visible = self.placement.views.len(),
            entered = report.entered.len(),
            exited = report.exited.len(),
            "render pass"
        );
        report
    }

    /// Resolve a cell of a visible leaf.
    pub fn cell(&self, node_key: &str, cell: usize) -> Option<CellRef> {
        let id = self.view.id_of(node_key)?;
        self.placement.by_view.get(&id)?;
        let node = self.view.node(id)?;
        if !node.is_leaf() || cell >= node.cells {
            return None;
        }
        Some(CellRef {
            node_key: node.key.clone(),
            cell,
            element_index: node.element_offset + cell,
        })
    }

    fn cell_rect(&self, cell: &CellRef) -> Option<Rect> {
        let id = self.view.id_of(&cell.node_key)?;
        let lid = *self.placement.by_view.get(&id)?;
        let node = self.view.node(id)?;
        self.placement.layout.cell_rect(lid, node.cells, cell.cell)
    }

    /// Pointer entered a leaf cell. Cells that are not on screen are ignored.
    pub fn pointer_enter_cell(
        &mut self,
        cell: CellRef,
        now: Instant,
    ) -> Option<HoverEvent<CellRef>> {
        if self.cell(&cell.node_key, cell.cell).as_ref() != Some(&cell) {
            return None;
        }
        let event = self.hover.enter(cell, now);
        tracing::trace!(vector = %self.vector, state = ?self.hover.state(), "hover enter");
        event
    }

    pub fn pointer_leave_cell(&mut self, cell: &CellRef, now: Instant) {
        self.hover.leave(cell, now);
    }

    pub fn affordance_enter(&mut self) {
        self.hover.overlay_enter();
    }

    pub fn affordance_leave(&mut self, now: Instant) {
        self.hover.overlay_leave(now);
    }

    /// Fire a due hover timer.
    pub fn poll(&mut self, now: Instant) -> Option<HoverEvent<CellRef>> {
        let event = self.hover.poll(now);
        if let Some(event) = &event {
            tracing::debug!(vector = %self.vector, ?event, "hover transition");
        }
        event
    }

    /// Earliest instant at which [`poll`](Self::poll) has work.
    pub fn deadline(&self) -> Option<Instant> {
        self.hover.deadline()
    }

    pub fn dismiss_affordance(&mut self) -> Option<HoverEvent<CellRef>> {
        self.hover.dismiss()
    }

    /// The split affordance, floating one row above its cell.
    pub fn affordance(&self) -> Option<Affordance> {
        let cell = self.hover.shown()?;
        let rect = self.cell_rect(cell)?;
        Some(Affordance {
            rect: Rect::new(
                rect.x,
                rect.y - self.config.cell_height,
                rect.width,
                self.config.cell_height,
            ),
            cell: cell.clone(),
        })
    }

    /// Click on the affordance: hide it and ask for a split before its cell.
    pub fn click_affordance(&mut self) -> Option<SplitRequest> {
        let cell = self.hover.shown()?.clone();
        self.hover.dismiss();
        let request = SplitRequest {
            vector: self.vector,
            index: cell.element_index,
        };
        tracing::debug!(vector = %self.vector, index = request.index, "split requested");
        for listener in &mut self.split_listeners {
            listener(&request);
        }
        Some(request)
    }

    /// What lies under `point` in the last layout.
    pub fn hit_test(&self, point: Point) -> Option<Hit> {
        if let Some(affordance) = self.affordance()
            && affordance.rect.contains(point)
        {
            return Some(Hit::Affordance {
                index: affordance.cell.element_index,
            });
        }
        // Later nodes are deeper and drawn on top.
        for (lid, &vid) in self.placement.views.iter().enumerate().rev() {
            let Some(rect) = self.placement.layout.rects.get(lid) else {
                continue;
            };
            if !rect.contains(point) {
                continue;
            }
            let node = self.view.node(vid)?;
            if node.is_leaf() && node.cells > 0 {
                let width = rect.width / node.cells as f64;
                let cell = (((point.x - rect.x) / width) as usize).min(node.cells - 1);
                return self.cell(&node.key, cell).map(Hit::Cell);
            }
            return Some(Hit::Node {
                key: node.key.clone(),
            });
        }
        None
    }

    pub fn tick(&mut self, dt: Duration) {
        self.reconciler.tick(dt);
    }

    pub fn is_animating(&self) -> bool {
        self.reconciler.is_animating()
    }

    /// The picture at the current animation instant.
    pub fn frame(&self) -> Frame {
        let mut frame = self.reconciler.frame();
        frame.tail = self.placement.layout.tail.map(|rect| FrameArray {
            rect,
            cells: self.view.tail().to_vec(),
        });
        frame.affordance = self.affordance().map(|a| a.rect);
        frame.cell_width = self.config.cell_width;
        frame.cell_height = self.config.cell_height;
        frame
    }

    /// Drop every sprite; the next pass enters everything from the source.
    pub fn reset_frame(&mut self) {
        self.reconciler.clear();
    }
}

fn shape_of(kind: &ViewKind) -> NodeShape {
    match kind {
        ViewKind::Dense | ViewKind::Relaxed { .. } => NodeShape::Branch,
        ViewKind::Leaf { .. } => NodeShape::Leaf,
        ViewKind::SizeTable { .. } => NodeShape::SizeTable,
        ViewKind::Value { .. } => NodeShape::Value,
    }
}

fn visual_of(node: &ViewNode) -> NodeVisual {
    let cells = match &node.kind {
        ViewKind::SizeTable { sizes } => sizes.iter().map(u64::to_string).collect(),
        ViewKind::Value { label } => vec![label.clone()],
        ViewKind::Leaf { values } if !node.expanded => values.clone(),
        _ => vec![String::new(); node.cells],
    };
    NodeVisual {
        shape: shape_of(&node.kind),
        cells,
        color: node.color,
        shared: node.refs > 1,
        collapsed: !node.expanded && !node.children.is_empty(),
    }
}
