#![forbid(unsafe_code)]

//! Display surfaces.
//!
//! A [`Frame`] is the fully resolved picture at one instant: every sprite at
//! its current animated position and opacity. Hosts implement [`Surface`]
//! to put it on screen; [`SvgSurface`] renders it to an SVG document.

use std::fmt::Write as _;

use rrbvis_core::geometry::{Point, Rect};
use rrbvis_layout::{LinkKind, NodeShape};

use crate::reconcile::NodeVisual;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameNode {
    pub key: String,
    /// Top centre of the node's array.
    pub position: Point,
    pub opacity: f64,
    pub visual: NodeVisual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameLink {
    /// Key of the target node.
    pub key: String,
    /// SVG path data.
    pub d: String,
    pub opacity: f64,
    pub kind: LinkKind,
}

/// A fixed-position array such as the tail buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameArray {
    pub rect: Rect,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub viewport: Rect,
    pub nodes: Vec<FrameNode>,
    pub links: Vec<FrameLink>,
    pub tail: Option<FrameArray>,
    /// The "split here" affordance, when shown.
    pub affordance: Option<Rect>,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl Frame {
    pub fn node(&self, key: &str) -> Option<&FrameNode> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.tail.is_none()
    }
}

/// Something that can show frames.
pub trait Surface {
    fn present(&mut self, frame: &Frame);
}

/// Keeps the last presented frame. Handy for tests and headless hosts.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    pub frames: Vec<Frame>,
}

impl Surface for RecordingSurface {
    fn present(&mut self, frame: &Frame) {
        self.frames.push(frame.clone());
    }
}

/// Renders frames to SVG markup.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    pub font_family: String,
    pub font_size: f64,
    pub link_color: String,
    pub cell_stroke: String,
    /// The most recent document.
    document: String,
}

impl Default for SvgSurface {
    fn default() -> Self {
        Self {
            font_family: "sans-serif".into(),
            font_size: 10.0,
            link_color: "#555".into(),
            cell_stroke: "#555".into(),
            document: String::new(),
        }
    }
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last rendered document.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Render `frame` to a standalone SVG document.
    pub fn render(&self, frame: &Frame) -> String {
        let mut out = String::with_capacity(256 + frame.nodes.len() * 200);
        let vb = frame.viewport;
        let _ = write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"{} {} {} {}\" \
             font-family=\"{}\" font-size=\"{}\">",
            fmt(vb.x),
            fmt(vb.y),
            fmt(vb.width),
            fmt(vb.height),
            self.font_family,
            fmt(self.font_size)
        );

        let _ = write!(
            out,
            "<g fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\">",
            self.link_color
        );
        for link in &frame.links {
            let _ = write!(
                out,
                "<path data-key=\"{}\" d=\"{}\" stroke-opacity=\"{}\"/>",
                escape(&link.key),
                link.d,
                fmt(link.opacity * 0.4)
            );
        }
        out.push_str("</g>");

        for node in &frame.nodes {
            self.node_into(&mut out, node, frame);
        }

        if let Some(tail) = &frame.tail {
            out.push_str("<g class=\"tail\">");
            self.cells_into(&mut out, tail.rect, &tail.cells, None);
            out.push_str("</g>");
        }

        if let Some(rect) = frame.affordance {
            let _ = write!(
                out,
                "<g class=\"split\"><rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" \
                 fill=\"#d62728\" fill-opacity=\"0.3\"/></g>",
                fmt(rect.x),
                fmt(rect.y),
                fmt(rect.width),
                fmt(rect.height)
            );
        }

        out.push_str("</svg>");
        out
    }

    fn node_into(&self, out: &mut String, node: &FrameNode, frame: &Frame) {
        let visual = &node.visual;
        let _ = write!(
            out,
            "<g data-key=\"{}\" opacity=\"{}\">",
            escape(&node.key),
            fmt(node.opacity)
        );
        if visual.shape == NodeShape::Value {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" dy=\"0.31em\">",
                fmt(node.position.x),
                fmt(node.position.y + frame.cell_height / 2.0)
            );
            if let Some(label) = visual.cells.first() {
                escape_into(out, label);
            }
            out.push_str("</text>");
        } else {
            let width = frame.cell_width * visual.cells.len().max(1) as f64;
            let rect = Rect::centered_below(node.position, width, frame.cell_height);
            let fill = visual.color.map(|c| c.to_string());
            self.cells_into(out, rect, &visual.cells, fill.as_deref());
            if visual.collapsed {
                let _ = write!(
                    out,
                    "<circle cx=\"{}\" cy=\"{}\" r=\"2.5\" fill=\"{}\"/>",
                    fmt(node.position.x),
                    fmt(rect.bottom() + 4.0),
                    self.cell_stroke
                );
            }
            if visual.shared {
                let _ = write!(
                    out,
                    "<circle cx=\"{}\" cy=\"{}\" r=\"3\" fill=\"#ff7f0e\"/>",
                    fmt(rect.right() + 4.0),
                    fmt(rect.top())
                );
            }
        }
        out.push_str("</g>");
    }

    fn cells_into(
        &self,
        out: &mut String,
        rect: Rect,
        cells: &[String],
        fill: Option<&str>,
    ) {
        let count = cells.len().max(1);
        let width = rect.width / count as f64;
        for i in 0..count {
            let x = rect.x + width * i as f64;
            let _ = write!(
                out,
                "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" stroke=\"{}\" fill=\"{}\" fill-opacity=\"0.35\"/>",
                fmt(x),
                fmt(rect.y),
                fmt(width),
                fmt(rect.height),
                self.cell_stroke,
                fill.unwrap_or("none"),
            );
            if let Some(text) = cells.get(i).filter(|t| !t.is_empty()) {
                let _ = write!(
                    out,
                    "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" dy=\"0.31em\">",
                    fmt(x + width / 2.0),
                    fmt(rect.y + rect.height / 2.0)
                );
                escape_into(out, text);
                out.push_str("</text>");
            }
        }
    }
}

impl Surface for SvgSurface {
    fn present(&mut self, frame: &Frame) {
        self.document = self.render(frame);
    }
}

fn fmt(v: f64) -> String {
    let rounded = (v * 100.0).round() / 100.0;
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{rounded}")
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    escape_into(&mut out, s);
    out
}

/// SVG-escape a string into the output buffer.
fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;

    fn frame() -> Frame {
        Frame {
            viewport: Rect::new(-512.0, -32.0, 1392.0, 200.0),
            nodes: vec![
                FrameNode {
                    key: "3:8".into(),
                    position: Point::ZERO,
                    opacity: 1.0,
                    visual: NodeVisual {
                        shape: NodeShape::Branch,
                        cells: vec![String::new(); 2],
                        color: Some(Color(0x1f77b4)),
                        shared: true,
                        collapsed: false,
                    },
                },
                FrameNode {
                    key: "1:4#0".into(),
                    position: Point::new(-20.0, 100.0),
                    opacity: 0.5,
                    visual: NodeVisual {
                        shape: NodeShape::Value,
                        cells: vec!["<0>".into()],
                        color: None,
                        shared: false,
                        collapsed: false,
                    },
                },
            ],
            links: vec![FrameLink {
                key: "1:4".into(),
                d: "M0,20L0,60".into(),
                opacity: 1.0,
                kind: LinkKind::Vertical,
            }],
            tail: Some(FrameArray {
                rect: Rect::new(-480.0, 0.0, 32.0, 20.0),
                cells: vec!["8".into(), "9".into()],
            }),
            affordance: None,
            cell_width: 16.0,
            cell_height: 20.0,
        }
    }

    #[test]
    fn svg_has_viewbox_and_nodes() {
        let svg = SvgSurface::new().render(&frame());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("viewBox=\"-512 -32 1392 200\""));
        assert!(svg.contains("data-key=\"3:8\""));
        assert!(svg.contains("fill=\"#1f77b4\""));
        assert!(svg.contains("d=\"M0,20L0,60\""));
        assert!(svg.contains("class=\"tail\""));
        assert!(!svg.contains("class=\"split\""));
    }

    #[test]
    fn labels_are_escaped() {
        let svg = SvgSurface::new().render(&frame());
        assert!(svg.contains("&lt;0&gt;"));
        assert!(!svg.contains("<0>"));
    }

    #[test]
    fn present_keeps_document() {
        let mut surface = SvgSurface::new();
        let mut f = frame();
        f.affordance = Some(Rect::new(0.0, 0.0, 16.0, 20.0));
        surface.present(&f);
        assert!(surface.document().contains("class=\"split\""));
    }

    #[test]
    fn recording_surface_collects() {
        let mut surface = RecordingSurface::default();
        surface.present(&frame());
        surface.present(&Frame::default());
        assert_eq!(surface.frames.len(), 2);
        assert!(surface.frames[1].is_empty());
    }
}
