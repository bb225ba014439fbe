use crate::cascade::resolve_color;
use crate::model::{DecorativeShape, ShapeKind, ThemeInfo};

use super::placeholder::{placeholder_info, shape_name, shape_rect};
use super::styles::solid_fill_color;
use super::{PML_NS, pml};

fn shape_kind(node: roxmltree::Node) -> Option<ShapeKind> {
    if node.tag_name().namespace() != Some(PML_NS) {
        return None;
    }
    match node.tag_name().name() {
        "sp" => Some(ShapeKind::Shape),
        "pic" => Some(ShapeKind::Picture),
        "cxnSp" => Some(ShapeKind::Connector),
        "grpSp" => Some(ShapeKind::Group),
        "graphicFrame" => Some(ShapeKind::GraphicFrame),
        _ => None,
    }
}

/// The shape tree (`p:cSld/p:spTree`) of a master, layout or slide part.
pub fn shape_tree<'a>(doc: &'a roxmltree::Document<'a>) -> Option<roxmltree::Node<'a, 'a>> {
    pml(doc.root_element(), "cSld").and_then(|c| pml(c, "spTree"))
}

/// Top-level shapes of a tree, in drawing order.
pub fn top_level_shapes<'a>(
    tree: roxmltree::Node<'a, 'a>,
) -> impl Iterator<Item = roxmltree::Node<'a, 'a>> {
    tree.children().filter(|n| shape_kind(*n).is_some())
}

/// Shapes that are drawn but carry no placeholder.
pub fn decorative_shapes(tree: roxmltree::Node, theme: &ThemeInfo) -> Vec<DecorativeShape> {
    top_level_shapes(tree)
        .filter(|n| placeholder_info(*n).is_none())
        .filter_map(|node| {
            let kind = shape_kind(node)?;
            let fill_color = pml(node, "spPr")
                .and_then(solid_fill_color)
                .and_then(|c| resolve_color(&c, theme));
            Some(DecorativeShape {
                kind,
                name: shape_name(node),
                position: shape_rect(node),
                fill_color,
            })
        })
        .collect()
}
