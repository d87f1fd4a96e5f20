//! `context` elements.

use std::rc::Rc;

use roxmltree::Node;

use crate::element::brush::read_brush;
use crate::element::format::read_trace_format;
use crate::element::source::read_ink_source;
use crate::element::timestamp::read_timestamp;
use crate::envelope::{ContextEnvelope, Slot};
use crate::xml;
use crate::Cx;

/// Reads a `context` element into an envelope.
///
/// Each content (ink source, trace format, brush, timestamp) may be given
/// as a `*Ref` attribute or as a nested element; the nested element wins
/// when both are present.
pub(crate) fn read_context(node: Node<'_, '_>, cx: &mut Cx<'_>) -> ContextEnvelope {
    let mut envelope = ContextEnvelope::default();

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            envelope.id = id.to_string();
        }
    }

    if let Some(parent_ref) = node.attribute("contextRef") {
        if !parent_ref.is_empty() {
            envelope.parent_ref = parent_ref.to_string();
        }
    }

    if let Some(reference) = node.attribute("traceFormatRef") {
        if !reference.is_empty() {
            envelope.trace_format = Slot::Ref(reference.to_string());
        }
    }
    if let Some(reference) = node.attribute("inkSourceRef") {
        if !reference.is_empty() {
            envelope.ink_source = Slot::Ref(reference.to_string());
        }
    }
    if let Some(reference) = node.attribute("brushRef") {
        if !reference.is_empty() {
            envelope.brush = Slot::Ref(reference.to_string());
        }
    }
    if let Some(reference) = node.attribute("timestampRef") {
        if !reference.is_empty() {
            envelope.timestamp = Slot::Ref(reference.to_string());
        }
    }

    if let Some(format_node) = xml::find_child(node, "traceFormat") {
        envelope.trace_format = Slot::Value(Rc::new(read_trace_format(format_node, cx)));
    }
    if let Some(source_node) = xml::find_child(node, "inkSource") {
        if let Some(ink_source) = read_ink_source(source_node, cx) {
            envelope.ink_source = Slot::Value(ink_source);
        }
    }
    if let Some(brush_node) = xml::find_child(node, "brush") {
        envelope.brush = Slot::Value(read_brush(brush_node, cx));
    }
    if let Some(timestamp_node) = xml::find_child(node, "timestamp") {
        if let Some(timestamp) = read_timestamp(timestamp_node, cx) {
            envelope.timestamp = Slot::Value(timestamp);
        }
    }

    envelope
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::CollectSink;
    use roxmltree::Document;

    fn read(source: &str) -> ContextEnvelope {
        let document = Document::parse(source).expect("test document");
        let mut sink = CollectSink::default();
        let mut cx = Cx {
            assume_local_refs: false,
            sink: &mut sink,
        };
        read_context(document.root_element(), &mut cx)
    }

    #[test]
    fn reference_attributes_fill_the_slots() {
        let envelope = read(
            r##"<context xmlns="http://www.w3.org/2003/InkML"
                    xmlns:xml="http://www.w3.org/XML/1998/namespace"
                    xml:id="ctx" contextRef="#parent" traceFormatRef="#fmt"
                    inkSourceRef="#pen" brushRef="#b" timestampRef="#t"/>"##,
        );
        assert_eq!(envelope.id, "ctx");
        assert_eq!(envelope.parent_ref, "#parent");
        assert!(matches!(&envelope.trace_format, Slot::Ref(r) if r == "#fmt"));
        assert!(matches!(&envelope.ink_source, Slot::Ref(r) if r == "#pen"));
        assert!(matches!(&envelope.brush, Slot::Ref(r) if r == "#b"));
        assert!(matches!(&envelope.timestamp, Slot::Ref(r) if r == "#t"));
    }

    #[test]
    fn nested_elements_win_over_reference_attributes() {
        let envelope = read(
            r##"<context xmlns="http://www.w3.org/2003/InkML"
                    xmlns:xml="http://www.w3.org/XML/1998/namespace"
                    xml:id="ctx" traceFormatRef="#fmt" brushRef="#b">
                <traceFormat><channel name="X"/></traceFormat>
                <brush xml:id="inline"/>
            </context>"##,
        );
        match &envelope.trace_format {
            Slot::Value(format) => assert_eq!(format.regular_channels.len(), 1),
            Slot::Empty | Slot::Ref(_) => panic!("nested traceFormat expected"),
        }
        match &envelope.brush {
            Slot::Value(brush) => assert_eq!(brush.id, "inline"),
            Slot::Empty | Slot::Ref(_) => panic!("nested brush expected"),
        }
    }

    #[test]
    fn empty_reference_attributes_are_ignored() {
        let envelope = read(
            r#"<context xmlns="http://www.w3.org/2003/InkML" brushRef=""/>"#,
        );
        assert!(envelope.id.is_empty());
        assert!(matches!(envelope.brush, Slot::Empty));
    }
}
