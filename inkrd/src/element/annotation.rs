//! `annotation` and `annotationXML` elements.

use roxmltree::Node;

use crate::ink::{Annotation, AnnotationContentType};
use crate::xml;
use crate::Cx;

/// Reads all annotation children of `container`, in document order.
pub(crate) fn read_annotations(container: Node<'_, '_>, cx: &mut Cx<'_>) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for child in container.children() {
        if xml::is_inkml(child, "annotation") || xml::is_inkml(child, "annotationXML") {
            if let Some(annotation) = read_annotation(child, cx) {
                annotations.push(annotation);
            }
        }
    }
    annotations
}

/// Reads one `annotation` or `annotationXML` element.
///
/// An `annotationXML` without content falls back to its `href` attribute;
/// with neither it is dropped.
pub(crate) fn read_annotation(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<Annotation> {
    let (content, content_type) = if xml::is_inkml(node, "annotation") {
        (
            node.text().unwrap_or("").to_string(),
            AnnotationContentType::Text,
        )
    } else {
        let inner = xml::inner_text(node);
        if !inner.is_empty() {
            (inner, AnnotationContentType::Xml)
        } else if let Some(href) = node.attribute("href") {
            (href.to_string(), AnnotationContentType::HRef)
        } else {
            cx.sink
                .warn("Neither content, nor href is provided for annotationXML element");
            return None;
        }
    };

    let mut annotation = Annotation {
        content,
        content_type,
        ..Annotation::default()
    };

    if let Some(annotation_type) = node.attribute("type") {
        annotation.annotation_type = annotation_type.to_string();
    }
    if let Some(encoding) = node.attribute("encoding") {
        annotation.encoding = encoding.to_string();
    }

    for attribute in node.attributes() {
        let name = attribute.name();
        if name == "href" || name == "type" || name == "encoding" {
            continue;
        }
        annotation
            .attributes
            .insert(name.to_string(), attribute.value().to_string());
    }

    Some(annotation)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::CollectSink;
    use roxmltree::Document;

    fn read_first(source: &str) -> (Option<Annotation>, Vec<String>) {
        let document = Document::parse(source).expect("test document");
        let node = document
            .root_element()
            .first_element_child()
            .expect("one child");
        let mut sink = CollectSink::default();
        let annotation = {
            let mut cx = Cx {
                assume_local_refs: false,
                sink: &mut sink,
            };
            read_annotation(node, &mut cx)
        };
        (annotation, sink.warnings())
    }

    #[test]
    fn text_annotation() {
        let (annotation, warnings) = read_first(
            r#"<ink xmlns="http://www.w3.org/2003/InkML">
                <annotation type="writer" alias="w1">John</annotation>
            </ink>"#,
        );
        let annotation = annotation.expect("annotation");
        assert!(warnings.is_empty());
        assert_eq!(annotation.content, "John");
        assert_eq!(annotation.content_type, AnnotationContentType::Text);
        assert_eq!(annotation.annotation_type, "writer");
        assert_eq!(annotation.attributes.get("alias").map(String::as_str), Some("w1"));
        assert!(!annotation.attributes.contains_key("type"));
    }

    #[test]
    fn xml_annotation_flattens_content() {
        let (annotation, _) = read_first(
            r#"<ink xmlns="http://www.w3.org/2003/InkML">
                <annotationXML encoding="custom"><a>one</a>two</annotationXML>
            </ink>"#,
        );
        let annotation = annotation.expect("annotation");
        assert_eq!(annotation.content, "onetwo");
        assert_eq!(annotation.content_type, AnnotationContentType::Xml);
        assert_eq!(annotation.encoding, "custom");
    }

    #[test]
    fn empty_annotation_xml_falls_back_to_href() {
        let (annotation, _) = read_first(
            r#"<ink xmlns="http://www.w3.org/2003/InkML">
                <annotationXML href="meta.xml"/>
            </ink>"#,
        );
        let annotation = annotation.expect("annotation");
        assert_eq!(annotation.content, "meta.xml");
        assert_eq!(annotation.content_type, AnnotationContentType::HRef);
        // href is a standard attribute, not an extra
        assert!(annotation.attributes.is_empty());
    }

    #[test]
    fn annotation_xml_without_content_or_href_is_dropped() {
        let (annotation, warnings) = read_first(
            r#"<ink xmlns="http://www.w3.org/2003/InkML"><annotationXML/></ink>"#,
        );
        assert!(annotation.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Neither content, nor href"));
    }
}
