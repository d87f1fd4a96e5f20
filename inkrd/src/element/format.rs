//! `traceFormat` and `channel` elements.

use roxmltree::Node;

use crate::ink::{Channel, ChannelDefault, ChannelOrientation, ChannelType, TraceFormat};
use crate::xml;
use crate::Cx;

/// Reads a `traceFormat` element: regular `channel` children plus the
/// channels of an optional `intermittentChannels` wrapper.
pub(crate) fn read_trace_format(node: Node<'_, '_>, cx: &mut Cx<'_>) -> TraceFormat {
    let mut trace_format = TraceFormat::default();

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            trace_format.id = id.to_string();
        }
    }

    for channel_node in xml::find_children(node, "channel") {
        if let Some(channel) = read_channel(channel_node, cx) {
            trace_format.regular_channels.push(channel);
        }
    }

    if let Some(wrapper) = xml::find_child(node, "intermittentChannels") {
        for channel_node in xml::find_children(wrapper, "channel") {
            if let Some(channel) = read_channel(channel_node, cx) {
                trace_format.intermittent_channels.push(channel);
            }
        }
    }

    trace_format
}

/// Reads a `channel` element. A channel without a name is dropped.
pub(crate) fn read_channel(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<Channel> {
    let Some(name) = node.attribute("name") else {
        cx.sink
            .warn("Attribute \"name\" is required for channel element");
        return None;
    };

    let mut channel = Channel::new(name);

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            channel.id = id.to_string();
        }
    }

    match node.attribute("type") {
        Some("integer") => channel.kind = ChannelType::Integer,
        Some("decimal") => channel.kind = ChannelType::Decimal,
        Some("double") => channel.kind = ChannelType::Double,
        Some("boolean") => channel.kind = ChannelType::Boolean,
        Some(_) | None => {}
    }

    if let Some(default) = node.attribute("default") {
        if channel.kind == ChannelType::Boolean {
            let default = default.to_ascii_lowercase();
            channel.default =
                ChannelDefault::Boolean(default == "true" || default == "t" || default == "1");
        } else {
            channel.default = ChannelDefault::Number(default.parse().unwrap_or(0.0));
        }
    }

    channel.min = node.attribute("min").and_then(|value| value.parse().ok());
    channel.max = node.attribute("max").and_then(|value| value.parse().ok());

    match node.attribute("orientation") {
        Some("+ve") => channel.orientation = ChannelOrientation::Positive,
        Some("-ve") => channel.orientation = ChannelOrientation::Negative,
        Some(_) | None => {}
    }

    if let Some(respect_to) = node.attribute("respectTo") {
        channel.respect_to = respect_to.to_string();
    }
    if let Some(units) = node.attribute("units") {
        channel.units = units.to_string();
    }

    // <mapping> children are not decoded

    Some(channel)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::CollectSink;
    use roxmltree::Document;

    fn read(source: &str) -> (TraceFormat, Vec<String>) {
        let document = Document::parse(source).expect("test document");
        let mut sink = CollectSink::default();
        let format = {
            let mut cx = Cx {
                assume_local_refs: false,
                sink: &mut sink,
            };
            read_trace_format(document.root_element(), &mut cx)
        };
        (format, sink.warnings())
    }

    #[test]
    fn channels_keep_declaration_order() {
        let (format, warnings) = read(
            r##"<traceFormat xmlns="http://www.w3.org/2003/InkML"
                    xmlns:xml="http://www.w3.org/XML/1998/namespace" xml:id="f0">
                <channel name="X" type="decimal" units="cm"/>
                <channel name="Y" type="decimal"/>
                <channel name="T" type="integer" respectTo="#ts0"/>
                <intermittentChannels>
                    <channel name="F" type="decimal"/>
                </intermittentChannels>
            </traceFormat>"##,
        );
        assert!(warnings.is_empty());
        assert_eq!(format.id, "f0");
        let names: Vec<&str> = format
            .regular_channels
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, ["X", "Y", "T"]);
        assert_eq!(format.regular_channels[2].kind, ChannelType::Integer);
        assert_eq!(format.regular_channels[2].respect_to, "#ts0");
        assert_eq!(format.regular_channels[0].units, "cm");
        assert_eq!(format.intermittent_channels.len(), 1);
    }

    #[test]
    fn nameless_channel_is_dropped() {
        let (format, warnings) = read(
            r#"<traceFormat xmlns="http://www.w3.org/2003/InkML">
                <channel type="decimal"/>
                <channel name="Y"/>
            </traceFormat>"#,
        );
        assert_eq!(format.regular_channels.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("\"name\" is required"));
    }

    #[test]
    fn attribute_parsing_and_fallbacks() {
        let (format, _) = read(
            r#"<traceFormat xmlns="http://www.w3.org/2003/InkML">
                <channel name="X" type="sideways" default="oops" min="bad" max="10"
                         orientation="-ve"/>
                <channel name="P" type="boolean" default="T"/>
            </traceFormat>"#,
        );
        let x = &format.regular_channels[0];
        // unknown type falls back to decimal, unparseable default to zero
        assert_eq!(x.kind, ChannelType::Decimal);
        assert_eq!(x.default, ChannelDefault::Number(0.0));
        assert_eq!(x.min, None);
        assert_eq!(x.max, Some(10.0));
        assert_eq!(x.orientation, ChannelOrientation::Negative);

        let p = &format.regular_channels[1];
        assert_eq!(p.default, ChannelDefault::Boolean(true));
    }
}
