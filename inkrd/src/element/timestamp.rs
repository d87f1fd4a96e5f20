//! `timestamp` elements.

use roxmltree::Node;

use crate::envelope::TimestampEnvelope;
use crate::xml;
use crate::Cx;

/// Reads a `timestamp` element into an envelope.
///
/// Attribute priority: an absolute `time` wins over everything else; a
/// `timeString` wins over the parent reference and offset. A `time` value
/// that does not parse as a decimal falls through to the next branch.
pub(crate) fn read_timestamp(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<TimestampEnvelope> {
    let id = match xml::id_of(node) {
        Some(id) => id.to_string(),
        None => {
            cx.sink
                .warn("Attribute \"xml:id\" is required for timestamp element");
            return None;
        }
    };

    let mut envelope = TimestampEnvelope {
        id,
        ..TimestampEnvelope::default()
    };

    if let Some(time) = node.attribute("time") {
        if let Ok(time) = time.parse::<f64>() {
            envelope.time = Some(time);
            return Some(envelope);
        }
    }

    if let Some(time_string) = node.attribute("timeString") {
        envelope.time_string = time_string.to_string();
        return Some(envelope);
    }

    if let Some(parent_ref) = node.attribute("timestampRef") {
        envelope.parent_ref = parent_ref.to_string();
    }

    if let Some(time_offset) = node.attribute("timeOffset") {
        if let Ok(time_offset) = time_offset.parse::<f64>() {
            envelope.time_offset = time_offset;
        }
    }

    Some(envelope)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::CollectSink;
    use roxmltree::Document;

    fn read(element: &str) -> (Option<TimestampEnvelope>, Vec<String>) {
        let source = format!(
            r#"<ink xmlns="http://www.w3.org/2003/InkML"
                    xmlns:xml="http://www.w3.org/XML/1998/namespace">{element}</ink>"#
        );
        let document = Document::parse(&source).expect("test document");
        let node = document
            .root_element()
            .first_element_child()
            .expect("one child");
        let mut sink = CollectSink::default();
        let envelope = {
            let mut cx = Cx {
                assume_local_refs: false,
                sink: &mut sink,
            };
            read_timestamp(node, &mut cx)
        };
        (envelope, sink.warnings())
    }

    #[test]
    fn absolute_time_wins() {
        let (envelope, _) = read(
            r##"<timestamp xml:id="t0" time="12000" timeString="noon"
                          timestampRef="#other" timeOffset="5"/>"##,
        );
        let envelope = envelope.expect("envelope");
        assert_eq!(envelope.time, Some(12000.0));
        assert!(envelope.time_string.is_empty());
        assert!(envelope.parent_ref.is_empty());
        assert_eq!(envelope.time_offset, 0.0);
    }

    #[test]
    fn unparseable_time_falls_through_to_time_string() {
        let (envelope, _) = read(r#"<timestamp xml:id="t0" time="noon" timeString="12:00"/>"#);
        let envelope = envelope.expect("envelope");
        assert_eq!(envelope.time, None);
        assert_eq!(envelope.time_string, "12:00");
    }

    #[test]
    fn relative_timestamp_keeps_parent_and_offset() {
        let (envelope, _) = read(r##"<timestamp xml:id="t1" timestampRef="#t0" timeOffset="250"/>"##);
        let envelope = envelope.expect("envelope");
        assert_eq!(envelope.parent_ref, "#t0");
        assert_eq!(envelope.time_offset, 250.0);
    }

    #[test]
    fn missing_id_drops_the_timestamp() {
        let (envelope, warnings) = read(r#"<timestamp time="100"/>"#);
        assert!(envelope.is_none());
        assert!(warnings[0].contains("\"xml:id\" is required"));
    }
}
