//! `brush` and `brushProperty` elements.

use roxmltree::Node;

use crate::element::annotation::read_annotations;
use crate::envelope::BrushEnvelope;
use crate::ink::AnnotatedProperty;
use crate::xml;
use crate::Cx;

/// Reads a `brush` element into an envelope; the `brushRef` parent
/// reference is resolved later.
pub(crate) fn read_brush(node: Node<'_, '_>, cx: &mut Cx<'_>) -> BrushEnvelope {
    let mut envelope = BrushEnvelope::default();

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            envelope.id = id.to_string();
        }
    }

    if let Some(parent_ref) = node.attribute("brushRef") {
        if !parent_ref.is_empty() {
            envelope.parent_ref = parent_ref.to_string();
        }
    }

    for property_node in xml::find_children(node, "brushProperty") {
        if let Some((name, property)) = read_brush_property(property_node, cx) {
            envelope.properties.insert(name, property);
        }
    }

    envelope.annotations = read_annotations(node, cx);

    envelope
}

fn read_brush_property(
    node: Node<'_, '_>,
    cx: &mut Cx<'_>,
) -> Option<(String, AnnotatedProperty)> {
    let Some(name) = node.attribute("name") else {
        cx.sink
            .warn("Attribute \"name\" is required for brushProperty element");
        return None;
    };
    let Some(value) = node.attribute("value") else {
        cx.sink
            .warn("Attribute \"value\" is required for brushProperty element");
        return None;
    };

    let property = AnnotatedProperty {
        value: value.to_string(),
        units: node.attribute("units").map(str::to_string),
        annotations: read_annotations(node, cx),
    };
    Some((name.to_string(), property))
}
