//! Split a slot-tagged SVG glyph into one document per palette slot.
//!
//! Shapes name their slot with a `data-slot` attribute; the nearest tagged
//! ancestor wins. Each slot gets a pruned copy of the document that keeps
//! the shapes of that slot plus the containers leading to them.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};

use crate::{FontBuildError, PaletteSlot};

/// Attribute carrying the slot tag.
pub const SLOT_ATTR: &str = "data-slot";

const SHAPES: &[&str] = &[
    "path", "rect", "circle", "ellipse", "line", "polyline", "polygon", "text", "use", "image",
];

/// Resource elements copied into every slot when they carry no tag.
const RESOURCES: &[&str] = &[
    "defs",
    "style",
    "title",
    "desc",
    "metadata",
    "linearGradient",
    "radialGradient",
    "pattern",
    "clipPath",
    "mask",
    "filter",
    "symbol",
    "marker",
];

/// How a document was turned into layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decomposition {
    /// No recognized tag anywhere: the original is the primary layer.
    Untagged,
    /// Tags were present but no slot kept a shape: same fallback.
    NoSlotShapes,
    /// At least one slot produced a pruned document.
    Split,
}

/// Per-slot SVG documents of one glyph, in palette order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotLayers {
    pub mode: Decomposition,
    pub layers: BTreeMap<PaletteSlot, String>,
}

impl SlotLayers {
    fn primary_only(original: &str, mode: Decomposition) -> Self {
        let mut layers = BTreeMap::new();
        layers.insert(PaletteSlot::Primary, original.to_string());
        Self { mode, layers }
    }

    /// Slots in palette order.
    pub fn slots(&self) -> impl Iterator<Item = PaletteSlot> + '_ {
        self.layers.keys().copied()
    }

    /// The slot used as the base glyph: primary when present, else the
    /// first present slot in palette order.
    pub fn base_slot(&self) -> Option<PaletteSlot> {
        self.layers.keys().next().copied()
    }

    pub fn get(&self, slot: PaletteSlot) -> Option<&str> {
        self.layers.get(&slot).map(String::as_str)
    }
}

/// Per-letter decomposition of a color build.
pub type SlotAssignment = BTreeMap<char, SlotLayers>;

/// Decompose one SVG document.
pub fn decompose_svg(text: &str) -> Result<SlotLayers, roxmltree::Error> {
    // Tracer output usually carries a DOCTYPE.
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, opts)?;
    let root = doc.root_element();

    if !doc.descendants().any(|n| slot_tag(n).is_some()) {
        return Ok(SlotLayers::primary_only(text, Decomposition::Untagged));
    }

    let mut layers = BTreeMap::new();
    for slot in PaletteSlot::ALL {
        let mut pruner = Pruner {
            slot,
            shapes: 0,
            out: String::with_capacity(text.len()),
        };
        pruner.element(root, None, None);
        if pruner.shapes > 0 {
            layers.insert(slot, pruner.out);
        }
    }

    if layers.is_empty() {
        log::debug!("tagged SVG produced no slot shapes; using it as primary");
        return Ok(SlotLayers::primary_only(text, Decomposition::NoSlotShapes));
    }
    Ok(SlotLayers {
        mode: Decomposition::Split,
        layers,
    })
}

/// Read and decompose an SVG file.
pub fn decompose_file(path: &Path) -> Result<SlotLayers, FontBuildError> {
    if !path.is_file() {
        return Err(FontBuildError::InputNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|e| FontBuildError::io(path, e))?;
    decompose_svg(&text).map_err(|e| FontBuildError::InvalidSvg {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn slot_tag(node: Node<'_, '_>) -> Option<PaletteSlot> {
    if !node.is_element() {
        return None;
    }
    node.attribute(SLOT_ATTR).and_then(PaletteSlot::parse)
}

fn is_shape(node: Node<'_, '_>) -> bool {
    SHAPES.contains(&node.tag_name().name())
}

fn is_resource(node: Node<'_, '_>) -> bool {
    RESOURCES.contains(&node.tag_name().name())
}

struct Pruner {
    slot: PaletteSlot,
    shapes: usize,
    out: String,
}

impl Pruner {
    /// Append `node` to the output if it belongs in this slot's document.
    /// Returns whether anything was written.
    fn element(
        &mut self,
        node: Node<'_, '_>,
        parent: Option<Node<'_, '_>>,
        inherited: Option<PaletteSlot>,
    ) -> bool {
        let own_tag = slot_tag(node);
        let effective = own_tag.or(inherited);
        let is_root = parent.is_none();

        if !is_root && effective.is_none() {
            if is_resource(node) {
                write_subtree(&mut self.out, node, parent);
                return true;
            }
            if !node.descendants().any(|d| slot_tag(d) == Some(self.slot)) {
                return false;
            }
        }
        if !is_root && effective.is_some() && effective != Some(self.slot) {
            // A differently tagged subtree may still hold shapes re-tagged
            // for this slot further down.
            if !node.descendants().skip(1).any(|d| slot_tag(d) == Some(self.slot)) {
                return false;
            }
        }

        let mine = effective == Some(self.slot);
        let mark = self.out.len();
        write_start_tag(&mut self.out, node, parent);
        let body_start = self.out.len();

        let mut kept_child = false;
        for child in node.children() {
            if child.is_element() {
                kept_child |= self.element(child, Some(node), effective);
            } else if mine && child.is_text() {
                escape_text(&mut self.out, child.text().unwrap_or_default());
            }
        }

        if !(mine || kept_child || is_root) {
            self.out.truncate(mark);
            return false;
        }
        if mine && is_shape(node) {
            self.shapes += 1;
        }
        close_element(&mut self.out, node, body_start);
        true
    }
}

/// Copy a whole subtree verbatim (minus slot tags).
fn write_subtree(out: &mut String, node: Node<'_, '_>, parent: Option<Node<'_, '_>>) {
    write_start_tag(out, node, parent);
    let body_start = out.len();
    for child in node.children() {
        if child.is_element() {
            write_subtree(out, child, Some(node));
        } else if child.is_text() {
            escape_text(out, child.text().unwrap_or_default());
        }
    }
    close_element(out, node, body_start);
}

fn qualified_name(node: Node<'_, '_>, ns: Option<&str>, local: &str) -> String {
    match ns.and_then(|uri| node.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
        _ => local.to_string(),
    }
}

fn write_start_tag(out: &mut String, node: Node<'_, '_>, parent: Option<Node<'_, '_>>) {
    let tag = node.tag_name();
    let _ = write!(out, "<{}", qualified_name(node, tag.namespace(), tag.name()));

    for ns in node.namespaces() {
        let inherited = parent.is_some_and(|p| {
            p.namespaces()
                .any(|pns| pns.name() == ns.name() && pns.uri() == ns.uri())
        });
        if inherited || ns.name() == Some("xml") {
            continue;
        }
        match ns.name() {
            Some(prefix) => {
                let _ = write!(out, " xmlns:{prefix}=\"");
                escape_attr(out, ns.uri());
            }
            None => {
                out.push_str(" xmlns=\"");
                escape_attr(out, ns.uri());
            }
        }
        out.push('"');
    }

    for attr in node.attributes() {
        if attr.namespace().is_none() && attr.name() == SLOT_ATTR {
            continue;
        }
        let _ = write!(out, " {}=\"", qualified_name(node, attr.namespace(), attr.name()));
        escape_attr(out, attr.value());
        out.push('"');
    }
    out.push('>');
}

/// Close the element opened by `write_start_tag`; an empty body collapses
/// into a self-closing tag.
fn close_element(out: &mut String, node: Node<'_, '_>, body_start: usize) {
    if out.len() == body_start {
        out.pop();
        out.push_str("/>");
    } else {
        let tag = node.tag_name();
        let _ = write!(out, "</{}>", qualified_name(node, tag.namespace(), tag.name()));
    }
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn escape_attr(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAGGED: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
  <defs><linearGradient id="g"/></defs>
  <g data-slot="primary">
    <path d="M0 0 L10 0 L10 10 Z"/>
    <rect x="1" y="1" width="2" height="2" data-slot=" Accent "/>
  </g>
  <circle cx="50" cy="50" r="5" data-slot="secondary"/>
  <path d="M5 5 L6 6" data-slot="accent"/>
</svg>"##;

    fn shape_ids(doc: &str) -> Vec<String> {
        let parsed = Document::parse(doc).expect("layer parses");
        parsed
            .descendants()
            .filter(|n| n.is_element() && is_shape(*n))
            .map(|n| {
                n.attributes()
                    .filter(|a| a.name() != SLOT_ATTR)
                    .map(|a| format!("{}={}", a.name(), a.value()))
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect()
    }

    #[test]
    fn untagged_document_is_primary_verbatim() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg"><path d="M0 0"/></svg>"#;
        let layers = decompose_svg(svg).expect("parse");
        assert_eq!(layers.mode, Decomposition::Untagged);
        assert_eq!(layers.layers.len(), 1);
        assert_eq!(layers.get(PaletteSlot::Primary), Some(svg));
    }

    #[test]
    fn unknown_tags_count_as_untagged() {
        let svg = r#"<svg><path d="M0 0" data-slot="gold"/></svg>"#;
        let layers = decompose_svg(svg).expect("parse");
        assert_eq!(layers.mode, Decomposition::Untagged);
    }

    #[test]
    fn tagged_document_splits_by_nearest_tag() {
        let layers = decompose_svg(TAGGED).expect("parse");
        assert_eq!(layers.mode, Decomposition::Split);
        assert_eq!(
            layers.slots().collect::<Vec<_>>(),
            vec![PaletteSlot::Primary, PaletteSlot::Accent, PaletteSlot::Secondary]
        );

        let primary = layers.get(PaletteSlot::Primary).expect("primary");
        assert_eq!(shape_ids(primary), vec!["d=M0 0 L10 0 L10 10 Z"]);
        assert!(!primary.contains(SLOT_ATTR));
        assert!(primary.contains("linearGradient"));

        let accent = layers.get(PaletteSlot::Accent).expect("accent");
        assert_eq!(
            shape_ids(accent),
            vec!["x=1,y=1,width=2,height=2", "d=M5 5 L6 6"]
        );
        assert!(accent.contains("<g>"));

        let secondary = layers.get(PaletteSlot::Secondary).expect("secondary");
        assert_eq!(shape_ids(secondary), vec!["cx=50,cy=50,r=5"]);
        assert!(!secondary.contains("<g"));
    }

    #[test]
    fn union_of_slots_is_the_original_shape_set() {
        let layers = decompose_svg(TAGGED).expect("parse");
        let mut union: Vec<String> = layers
            .layers
            .values()
            .flat_map(|doc| shape_ids(doc))
            .collect();
        let mut original = shape_ids(TAGGED);
        union.sort();
        original.sort();
        assert_eq!(union, original);
    }

    #[test]
    fn first_present_slot_becomes_the_base() {
        let svg = r#"<svg><path d="M1 1" data-slot="secondary"/><path d="M2 2" data-slot="accent"/></svg>"#;
        let layers = decompose_svg(svg).expect("parse");
        assert_eq!(layers.base_slot(), Some(PaletteSlot::Accent));
        assert!(layers.get(PaletteSlot::Primary).is_none());
    }

    #[test]
    fn tags_without_shapes_fall_back_to_primary() {
        let svg = r#"<svg><g data-slot="accent"/></svg>"#;
        let layers = decompose_svg(svg).expect("parse");
        assert_eq!(layers.mode, Decomposition::NoSlotShapes);
        assert_eq!(layers.get(PaletteSlot::Primary), Some(svg));
    }

    #[test]
    fn prefixed_attributes_and_text_survive() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"><use xlink:href="#a" data-slot="accent"/><text data-slot="primary">A &amp; B</text></svg>"##;
        let layers = decompose_svg(svg).expect("parse");
        let accent = layers.get(PaletteSlot::Accent).expect("accent");
        assert!(accent.contains(r##"xlink:href="#a""##), "{accent}");
        assert!(accent.contains(r#"xmlns:xlink="http://www.w3.org/1999/xlink""#));
        let primary = layers.get(PaletteSlot::Primary).expect("primary");
        assert!(primary.contains("<text>A &amp; B</text>"), "{primary}");
    }

    #[test]
    fn malformed_svg_is_an_error() {
        assert!(decompose_svg("<svg><path></svg>").is_err());
    }
}
