//! `inkSource` elements and their nested descriptions.

use std::collections::HashMap;
use std::rc::Rc;

use roxmltree::Node;

use crate::element::format::read_trace_format;
use crate::ink::{ActiveArea, InkSource, Latency, Property, SampleRate};
use crate::xml;
use crate::Cx;

/// Content of a `channelProperty` element, held until it is attached to
/// its target channel.
#[derive(Debug)]
struct ChannelProperty {
    channel: String,
    name: String,
    value: String,
    units: Option<String>,
}

/// Reads an `inkSource` element.
///
/// An ink source without an `xml:id` or without a nested `traceFormat` is
/// dropped. `channelProperty` children are grouped by their target channel
/// name and attached to the matching channel of the nested format.
pub(crate) fn read_ink_source(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<Rc<InkSource>> {
    let id = match xml::id_of(node) {
        Some(id) => id.to_string(),
        None => {
            cx.sink
                .warn("Attribute \"xml:id\" is required for inkSource element");
            return None;
        }
    };

    let Some(format_node) = xml::find_child(node, "traceFormat") else {
        cx.sink
            .warn("Nested traceFormat element is required for inkSource elements");
        return None;
    };
    let mut trace_format = read_trace_format(format_node, cx);

    let sample_rate = xml::find_child(node, "sampleRate").and_then(|n| read_sample_rate(n, cx));
    let latency = xml::find_child(node, "latency").and_then(|n| read_latency(n, cx));
    let active_area = xml::find_child(node, "activeArea").and_then(|n| read_active_area(n, cx));

    let mut properties = HashMap::new();
    for property_node in xml::find_children(node, "sourceProperty") {
        if let Some((name, property)) = read_source_property(property_node, cx) {
            properties.insert(name, property);
        }
    }

    let mut channel_properties: HashMap<String, Vec<ChannelProperty>> = HashMap::new();
    if let Some(wrapper) = xml::find_child(node, "channelProperties") {
        for property_node in xml::find_children(wrapper, "channelProperty") {
            if let Some(property) = read_channel_property(property_node, cx) {
                channel_properties
                    .entry(property.channel.clone())
                    .or_default()
                    .push(property);
            }
        }
    }

    // attach grouped properties to the matching channels, regular and
    // intermittent alike
    for channel in trace_format
        .regular_channels
        .iter_mut()
        .chain(trace_format.intermittent_channels.iter_mut())
    {
        if let Some(group) = channel_properties.get(&channel.name) {
            for property in group {
                channel.properties.insert(
                    property.name.clone(),
                    Property {
                        value: property.value.clone(),
                        units: property.units.clone(),
                    },
                );
            }
        }
    }

    Some(Rc::new(InkSource {
        id,
        trace_format: Rc::new(trace_format),
        sample_rate,
        latency,
        active_area,
        manufacturer: node.attribute("manufacturer").map(str::to_string),
        model: node.attribute("model").map(str::to_string),
        serial_no: node.attribute("serialNo").map(str::to_string),
        specification_ref: node.attribute("specificationRef").map(str::to_string),
        description: node.attribute("description").map(str::to_string),
        properties,
    }))
}

fn read_sample_rate(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<SampleRate> {
    let Some(value) = node.attribute("value") else {
        cx.sink
            .warn("Attribute \"value\" is required for sampleRate element");
        return None;
    };
    let Ok(value) = value.parse::<f64>() else {
        cx.sink
            .warn("Attribute \"value\" of sampleRate element is expected to be decimal");
        return None;
    };

    let uniform = node.attribute("uniform").map_or(true, |u| u == "true");
    Some(SampleRate { value, uniform })
}

fn read_latency(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<Latency> {
    let Some(value) = node.attribute("value") else {
        cx.sink
            .warn("Attribute \"value\" is required for latency element");
        return None;
    };
    let Ok(value) = value.parse::<f64>() else {
        cx.sink
            .warn("Attribute \"value\" of latency element is expected to be decimal");
        return None;
    };
    Some(Latency { value })
}

fn read_active_area(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<ActiveArea> {
    let Some(width) = node.attribute("width") else {
        cx.sink
            .warn("Attribute \"width\" is required for activeArea element");
        return None;
    };
    let Ok(width) = width.parse::<f64>() else {
        cx.sink
            .warn("Attribute \"width\" of activeArea element is expected to be decimal");
        return None;
    };

    let Some(height) = node.attribute("height") else {
        cx.sink
            .warn("Attribute \"height\" is required for activeArea element");
        return None;
    };
    let Ok(height) = height.parse::<f64>() else {
        cx.sink
            .warn("Attribute \"height\" of activeArea element is expected to be decimal");
        return None;
    };

    Some(ActiveArea {
        width,
        height,
        units: node.attribute("units").map(str::to_string),
        size: node.attribute("size").map(str::to_string),
    })
}

fn read_source_property(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<(String, Property)> {
    let Some(name) = node.attribute("name") else {
        cx.sink
            .warn("Attribute \"name\" is required for sourceProperty element");
        return None;
    };
    let Some(value) = node.attribute("value") else {
        cx.sink
            .warn("Attribute \"value\" is required for sourceProperty element");
        return None;
    };

    let property = Property {
        value: value.to_string(),
        units: node.attribute("units").map(str::to_string),
    };
    Some((name.to_string(), property))
}

fn read_channel_property(node: Node<'_, '_>, cx: &mut Cx<'_>) -> Option<ChannelProperty> {
    let Some(channel) = node.attribute("channel") else {
        cx.sink
            .warn("Attribute \"channel\" is required for channelProperty element");
        return None;
    };
    let Some(name) = node.attribute("name") else {
        cx.sink
            .warn("Attribute \"name\" is required for channelProperty element");
        return None;
    };
    let Some(value) = node.attribute("value") else {
        cx.sink
            .warn("Attribute \"value\" is required for channelProperty element");
        return None;
    };

    Some(ChannelProperty {
        channel: channel.to_string(),
        name: name.to_string(),
        value: value.to_string(),
        units: node.attribute("units").map(str::to_string),
    })
}
