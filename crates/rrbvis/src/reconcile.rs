#![forbid(unsafe_code)]

//! Reconciler and animator.
//!
//! Each render pass lists the nodes and links that should be on screen.
//! Sprites are matched by key against the previous pass:
//!
//! - **enter**: only in the new pass. Starts at the source node's previous
//!   position with opacity 0.
//! - **update**: in both. Moves from wherever it currently is to the new target.
//! - **exit**: only in the previous pass. Moves toward the source node's new
//!   position while fading out, then is dropped.
//!
//! Links are keyed by their target node and collapse to a point at the source.
//! A sprite never runs two transitions: a new pass retargets it from its
//! current animated state.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use rrbvis_core::animation::{Animation, Tween};
use rrbvis_core::geometry::{Point, Rect};
use rrbvis_layout::{LinkKind, NodeShape};

use crate::color::Color;
use crate::surface::{Frame, FrameLink, FrameNode};

/// How a node is drawn, independent of where.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub shape: NodeShape,
    /// Text per cell; empty strings for bare cells.
    pub cells: Vec<String>,
    pub color: Option<Color>,
    /// Shared by more than one parent or vector.
    pub shared: bool,
    /// Has hidden children that a click would show.
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeTarget {
    pub key: String,
    pub position: Point,
    pub visual: NodeVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkTarget {
    /// Key of the target node.
    pub key: String,
    pub from: Point,
    pub to: Point,
    pub kind: LinkKind,
}

/// Everything one render pass needs.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPass {
    pub nodes: Vec<NodeTarget>,
    pub links: Vec<LinkTarget>,
    /// Where the transition source was drawn before this pass.
    pub source_from: Point,
    /// Where the transition source is drawn after this pass.
    pub source_to: Point,
    pub viewport: Rect,
    pub duration: Duration,
}

/// Keys classified by a render pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub entered: Vec<String>,
    pub updated: Vec<String>,
    pub exited: Vec<String>,
    pub links_entered: Vec<String>,
    pub links_updated: Vec<String>,
    pub links_exited: Vec<String>,
    pub duration: Duration,
}

impl RenderReport {
    /// Nothing entered or exited.
    pub fn is_stable(&self) -> bool {
        self.entered.is_empty()
            && self.exited.is_empty()
            && self.links_entered.is_empty()
            && self.links_exited.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Present,
    Exiting,
}

#[derive(Debug, Clone)]
struct NodeSprite {
    key: String,
    position: Tween<Point>,
    opacity: Tween<f64>,
    visual: NodeVisual,
    phase: Phase,
}

#[derive(Debug, Clone)]
struct LinkSprite {
    key: String,
    from: Tween<Point>,
    to: Tween<Point>,
    opacity: Tween<f64>,
    kind: LinkKind,
    phase: Phase,
}

impl NodeSprite {
    fn is_settled(&self) -> bool {
        self.position.is_complete() && self.opacity.is_complete()
    }
}

impl LinkSprite {
    fn is_settled(&self) -> bool {
        self.from.is_complete() && self.to.is_complete() && self.opacity.is_complete()
    }
}

/// Retarget unless the tween is already heading to `to`.
fn steer<T>(tween: &mut Tween<T>, to: T, duration: Duration, same: impl Fn(T, T) -> bool)
where
    T: rrbvis_core::animation::Lerp,
{
    if !same(tween.target(), to) {
        tween.retarget(to, duration);
    }
}

fn same_point(a: Point, b: Point) -> bool {
    a.approx_eq(b, 1e-9)
}

fn same_f64(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9
}

/// Owns the on-screen sprites of one diagram.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    nodes: Vec<NodeSprite>,
    links: Vec<LinkSprite>,
    visible: HashSet<String>,
    visible_links: HashSet<String>,
    viewport: Option<Tween<Rect>>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `pass` against the previous pass and start the transitions.
    pub fn render(&mut self, pass: RenderPass) -> RenderReport {
        let duration = pass.duration;
        let mut report = RenderReport {
            duration,
            ..RenderReport::default()
        };

        let mut old: HashMap<String, NodeSprite> = self
            .nodes
            .drain(..)
            .map(|sprite| (sprite.key.clone(), sprite))
            .collect();
        let mut nodes = Vec::with_capacity(pass.nodes.len());
        let mut visible = HashSet::with_capacity(pass.nodes.len());
        for target in pass.nodes {
            let sprite = match old.remove(&target.key) {
                Some(mut sprite) => {
                    if sprite.phase == Phase::Present && self.visible.contains(&target.key) {
                        report.updated.push(target.key.clone());
                    } else {
                        report.entered.push(target.key.clone());
                    }
                    steer(&mut sprite.position, target.position, duration, same_point);
                    steer(&mut sprite.opacity, 1.0, duration, same_f64);
                    sprite.visual = target.visual;
                    sprite.phase = Phase::Present;
                    sprite
                }
                None => {
                    report.entered.push(target.key.clone());
                    NodeSprite {
                        key: target.key,
                        position: Tween::new(pass.source_from, target.position, duration),
                        opacity: Tween::new(0.0, 1.0, duration),
                        visual: target.visual,
                        phase: Phase::Present,
                    }
                }
            };
            visible.insert(sprite.key.clone());
            nodes.push(sprite);
        }
        let mut leftovers: Vec<NodeSprite> = old.into_values().collect();
        leftovers.sort_by(|a, b| a.key.cmp(&b.key));
        for mut sprite in leftovers {
            if sprite.phase == Phase::Present {
                report.exited.push(sprite.key.clone());
                sprite.phase = Phase::Exiting;
            }
            steer(&mut sprite.position, pass.source_to, duration, same_point);
            steer(&mut sprite.opacity, 0.0, duration, same_f64);
            nodes.push(sprite);
        }
        self.nodes = nodes;
        self.visible = visible;

        let mut old: HashMap<String, LinkSprite> = self
            .links
            .drain(..)
            .map(|sprite| (sprite.key.clone(), sprite))
            .collect();
        let mut links = Vec::with_capacity(pass.links.len());
        let mut visible = HashSet::with_capacity(pass.links.len());
        for target in pass.links {
            let sprite = match old.remove(&target.key) {
                Some(mut sprite) => {
                    if sprite.phase == Phase::Present && self.visible_links.contains(&target.key)
                    {
                        report.links_updated.push(target.key.clone());
                    } else {
                        report.links_entered.push(target.key.clone());
                    }
                    steer(&mut sprite.from, target.from, duration, same_point);
                    steer(&mut sprite.to, target.to, duration, same_point);
                    steer(&mut sprite.opacity, 1.0, duration, same_f64);
                    sprite.kind = target.kind;
                    sprite.phase = Phase::Present;
                    sprite
                }
                None => {
                    report.links_entered.push(target.key.clone());
                    LinkSprite {
                        key: target.key,
                        from: Tween::new(pass.source_from, target.from, duration),
                        to: Tween::new(pass.source_from, target.to, duration),
                        opacity: Tween::new(0.0, 1.0, duration),
                        kind: target.kind,
                        phase: Phase::Present,
                    }
                }
            };
            visible.insert(sprite.key.clone());
            links.push(sprite);
        }
        let mut leftovers: Vec<LinkSprite> = old.into_values().collect();
        leftovers.sort_by(|a, b| a.key.cmp(&b.key));
        for mut sprite in leftovers {
            if sprite.phase == Phase::Present {
                report.links_exited.push(sprite.key.clone());
                sprite.phase = Phase::Exiting;
            }
            steer(&mut sprite.from, pass.source_to, duration, same_point);
            steer(&mut sprite.to, pass.source_to, duration, same_point);
            steer(&mut sprite.opacity, 0.0, duration, same_f64);
            links.push(sprite);
        }
        self.links = links;
        self.visible_links = visible;

        match &mut self.viewport {
            Some(tween) => steer(tween, pass.viewport, duration, |a, b| a == b),
            None => self.viewport = Some(Tween::settled(pass.viewport)),
        }

        tracing::debug!(
            entered = report.entered.len(),
            updated = report.updated.len(),
            exited = report.exited.len(),
            duration_ms = duration.as_millis() as u64,
            "render pass reconciled"
        );
        report
    }

    /// Advance every transition; exiting sprites are dropped once done.
    pub fn tick(&mut self, dt: Duration) {
        for sprite in &mut self.nodes {
            sprite.position.tick(dt);
            sprite.opacity.tick(dt);
        }
        for sprite in &mut self.links {
            sprite.from.tick(dt);
            sprite.to.tick(dt);
            sprite.opacity.tick(dt);
        }
        if let Some(viewport) = &mut self.viewport {
            viewport.tick(dt);
        }
        self.nodes
            .retain(|s| !(s.phase == Phase::Exiting && s.is_settled()));
        self.links
            .retain(|s| !(s.phase == Phase::Exiting && s.is_settled()));
    }

    /// Whether any transition is still running.
    pub fn is_animating(&self) -> bool {
        self.nodes.iter().any(|s| !s.is_settled())
            || self.links.iter().any(|s| !s.is_settled())
            || self.viewport.as_ref().is_some_and(|v| !v.is_complete())
    }

    /// Forget the previous frame; the next pass enters everything.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.links.clear();
        self.visible.clear();
        self.visible_links.clear();
        self.viewport = None;
    }

    /// Number of sprites on screen, exiting ones included.
    pub fn sprite_count(&self) -> usize {
        self.nodes.len()
    }

    /// Current animated position of a node sprite.
    pub fn position_of(&self, key: &str) -> Option<Point> {
        self.nodes
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.position.current())
    }

    /// Current animated state as a drawable frame (tail and overlay empty).
    pub fn frame(&self) -> Frame {
        Frame {
            viewport: self
                .viewport
                .as_ref()
                .map(Tween::current)
                .unwrap_or_default(),
            nodes: self
                .nodes
                .iter()
                .map(|s| FrameNode {
                    key: s.key.clone(),
                    position: s.position.current(),
                    opacity: s.opacity.current(),
                    visual: s.visual.clone(),
                })
                .collect(),
            links: self
                .links
                .iter()
                .map(|s| FrameLink {
                    key: s.key.clone(),
                    d: s.kind.path(s.from.current(), s.to.current()),
                    opacity: s.opacity.current(),
                    kind: s.kind,
                })
                .collect(),
            ..Frame::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_250: Duration = Duration::from_millis(250);

    fn visual() -> NodeVisual {
        NodeVisual {
            shape: NodeShape::Leaf,
            cells: vec![String::new(); 4],
            color: None,
            shared: false,
            collapsed: false,
        }
    }

    fn pass(keys: &[(&str, f64)], source_from: Point, source_to: Point) -> RenderPass {
        RenderPass {
            nodes: keys
                .iter()
                .map(|&(key, x)| NodeTarget {
                    key: key.to_string(),
                    position: Point::new(x, 50.0),
                    visual: visual(),
                })
                .collect(),
            links: keys
                .iter()
                .map(|&(key, x)| LinkTarget {
                    key: key.to_string(),
                    from: Point::ZERO,
                    to: Point::new(x, 50.0),
                    kind: LinkKind::Vertical,
                })
                .collect(),
            source_from,
            source_to,
            viewport: Rect::new(0.0, 0.0, 100.0, 100.0),
            duration: MS_250,
        }
    }

    #[test]
    fn diff_classifies_keys() {
        let mut rec = Reconciler::new();
        rec.render(pass(&[("a", 0.0), ("b", 10.0), ("c", 20.0)], Point::ZERO, Point::ZERO));
        rec.tick(MS_250);
        let report = rec.render(pass(
            &[("b", 10.0), ("c", 20.0), ("d", 30.0)],
            Point::ZERO,
            Point::ZERO,
        ));
        assert_eq!(report.entered, vec!["d"]);
        assert_eq!(report.updated, vec!["b", "c"]);
        assert_eq!(report.exited, vec!["a"]);
        assert_eq!(report.links_exited, vec!["a"]);
    }

    #[test]
    fn exit_removed_after_duration() {
        let mut rec = Reconciler::new();
        rec.render(pass(&[("a", 0.0), ("b", 10.0)], Point::ZERO, Point::ZERO));
        rec.tick(MS_250);
        rec.render(pass(&[("b", 10.0)], Point::ZERO, Point::new(5.0, 5.0)));
        assert_eq!(rec.sprite_count(), 2);
        rec.tick(Duration::from_millis(100));
        assert_eq!(rec.sprite_count(), 2);
        rec.tick(Duration::from_millis(200));
        assert_eq!(rec.sprite_count(), 1);
        assert!(rec.position_of("a").is_none());
    }

    #[test]
    fn enter_starts_at_source() {
        let mut rec = Reconciler::new();
        let origin = Point::new(-7.0, 3.0);
        rec.render(pass(&[("a", 40.0)], origin, origin));
        assert_eq!(rec.position_of("a"), Some(origin));
        rec.tick(MS_250);
        assert_eq!(rec.position_of("a"), Some(Point::new(40.0, 50.0)));
    }

    #[test]
    fn same_pass_twice_is_idempotent() {
        let mut rec = Reconciler::new();
        let p = pass(&[("a", 0.0), ("b", 10.0)], Point::ZERO, Point::ZERO);
        rec.render(p.clone());
        rec.tick(MS_250);
        let report = rec.render(p);
        assert!(report.is_stable());
        assert_eq!(report.updated.len(), 2);
        assert!(!rec.is_animating());
    }

    #[test]
    fn retarget_continues_from_current_state() {
        let mut rec = Reconciler::new();
        rec.render(pass(&[("a", 0.0)], Point::ZERO, Point::ZERO));
        rec.tick(MS_250);
        rec.render(pass(&[("a", 100.0)], Point::ZERO, Point::ZERO));
        rec.tick(Duration::from_millis(125));
        let mid = rec.position_of("a").unwrap();
        rec.render(pass(&[("a", -100.0)], Point::ZERO, Point::ZERO));
        assert_eq!(rec.position_of("a"), Some(mid));
    }

    #[test]
    fn exiting_sprite_is_revived() {
        let mut rec = Reconciler::new();
        rec.render(pass(&[("a", 0.0), ("b", 10.0)], Point::ZERO, Point::ZERO));
        rec.tick(MS_250);
        rec.render(pass(&[("b", 10.0)], Point::ZERO, Point::ZERO));
        rec.tick(Duration::from_millis(100));
        let report = rec.render(pass(&[("a", 0.0), ("b", 10.0)], Point::ZERO, Point::ZERO));
        assert_eq!(report.entered, vec!["a"]);
        assert_eq!(rec.sprite_count(), 2);
        rec.tick(MS_250);
        assert_eq!(rec.sprite_count(), 2);
    }

    #[test]
    fn clear_reenters_everything() {
        let mut rec = Reconciler::new();
        let p = pass(&[("a", 0.0)], Point::ZERO, Point::ZERO);
        rec.render(p.clone());
        rec.clear();
        let report = rec.render(p);
        assert_eq!(report.entered, vec!["a"]);
    }

    #[test]
    fn frame_reports_opacity() {
        let mut rec = Reconciler::new();
        rec.render(pass(&[("a", 0.0)], Point::ZERO, Point::ZERO));
        assert_eq!(rec.frame().nodes[0].opacity, 0.0);
        rec.tick(MS_250);
        let frame = rec.frame();
        assert_eq!(frame.nodes[0].opacity, 1.0);
        assert_eq!(frame.links.len(), 1);
        assert_eq!(frame.viewport, Rect::new(0.0, 0.0, 100.0, 100.0));
    }
}
