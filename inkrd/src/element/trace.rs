//! `trace`, `traceGroup` and `traceView` elements.

use std::rc::Rc;

use indexmap::IndexMap;
use roxmltree::Node;

use crate::element::annotation::read_annotations;
use crate::envelope::Tables;
use crate::ids::{is_local, to_local};
use crate::ink::{
    default_trace_format, Context, Trace, TraceContinuation, TraceFormat, TraceGroup, TraceItem,
    TraceType, TraceView,
};
use crate::points::decode_trace_text;
use crate::xml;
use crate::Cx;

/// Reads all trace items among the children of `container`.
///
/// Identified traces, groups and views are registered in the tables as
/// they are read, so later `priorRef` and `traceDataRef` attributes can
/// find them. A group's context becomes the ambient context for its
/// children.
pub(crate) fn read_traces(
    container: Node<'_, '_>,
    cx: &mut Cx<'_>,
    tables: &mut Tables,
    ambient: Option<&Rc<Context>>,
) -> Vec<TraceItem> {
    let mut items = Vec::new();

    for child in container.children() {
        if xml::is_inkml(child, "trace") {
            match read_trace(child, cx, tables, ambient, true) {
                Some(trace) => {
                    if !trace.id.is_empty() {
                        tables.traces.insert(trace.id.clone(), Rc::clone(&trace));
                    }
                    items.push(TraceItem::Trace(trace));
                }
                None => cx.sink.warn("Could not read trace"),
            }
        } else if xml::is_inkml(child, "traceGroup") {
            match read_trace_group(child, cx, tables, true) {
                Some(mut group) => {
                    let group_context = group.context.clone();
                    group.traces =
                        read_traces(child, cx, tables, group_context.as_ref().or(ambient));
                    let group = Rc::new(group);
                    if !group.id.is_empty() {
                        tables
                            .trace_groups
                            .insert(group.id.clone(), Rc::clone(&group));
                    }
                    items.push(TraceItem::Group(group));
                }
                None => cx.sink.warn("Could not read traceGroup"),
            }
        } else if xml::is_inkml(child, "traceView") {
            match read_trace_view(child, cx, tables) {
                Some(view) => {
                    if !view.id.is_empty() {
                        tables
                            .trace_views
                            .insert(view.id.clone(), Rc::clone(&view));
                    }
                    items.push(TraceItem::View(view));
                }
                None => cx.sink.warn("Could not read traceView"),
            }
        }
    }

    items
}

/// Reads one `trace` element.
///
/// With `require_refs`, a trace whose `contextRef`, `brushRef` or
/// `priorRef` names a missing local definition is dropped. A body that
/// fails to decode yields the trace with empty channel maps.
pub(crate) fn read_trace(
    node: Node<'_, '_>,
    cx: &mut Cx<'_>,
    tables: &mut Tables,
    ambient: Option<&Rc<Context>>,
    require_refs: bool,
) -> Option<Rc<Trace>> {
    let mut trace = Trace::default();

    if let Some(reference) = node.attribute("contextRef") {
        match find_definition(&tables.contexts, reference, "context", "a trace", cx) {
            Ok(found) => trace.context = found,
            Err(MissingLocal) => {
                if require_refs {
                    return None;
                }
            }
        }
    }

    if let Some(reference) = node.attribute("brushRef") {
        match find_definition(&tables.brushes, reference, "brush", "a trace", cx) {
            Ok(found) => trace.brush = found,
            Err(MissingLocal) => {
                if require_refs {
                    return None;
                }
            }
        }
    }

    let continuation_attr = node.attribute("continuation");
    match continuation_attr {
        Some("begin") => trace.continuation = TraceContinuation::Begin,
        Some("middle") => trace.continuation = TraceContinuation::Middle,
        Some("end") => trace.continuation = TraceContinuation::End,
        Some(other) => cx.sink.warn(&format!(
            "Unexpected value of continuation attribute: \"{other}\""
        )),
        None => {}
    }

    // a middle or end continuation names the trace it continues; the prior
    // trace's forward link is set once this one is built
    let mut prior: Option<Rc<Trace>> = None;
    if matches!(
        trace.continuation,
        TraceContinuation::Middle | TraceContinuation::End
    ) {
        let continuation = continuation_attr.unwrap_or("");
        let reference = node.attribute("priorRef").unwrap_or("");
        if reference.is_empty() {
            cx.sink.warn(&format!(
                "Attribute priorRef is required because continuation is set to \"{continuation}\""
            ));
            return None;
        }
        if !is_local(reference) && !cx.assume_local_refs {
            cx.sink.warn(&format!(
                "External references are not yet supported: \"{reference}\""
            ));
            return None;
        }
        match tables.traces.get(to_local(reference)) {
            Some(found) => prior = Some(Rc::clone(found)),
            None => {
                cx.sink.warn(&format!(
                    "Could not find prior trace \"{reference}\" referenced by a trace"
                ));
                if require_refs {
                    return None;
                }
            }
        }
    }

    if let Some(text) = node.text() {
        let format = effective_trace_format(trace.context.as_ref(), ambient);
        match decode_trace_text(text, &format, cx.sink) {
            Some((regular, intermittent)) => {
                for channel in regular {
                    trace.channels.insert(channel.name, channel.values);
                }
                for channel in intermittent {
                    trace
                        .intermittent_channels
                        .insert(channel.name, channel.samples);
                }
            }
            None => cx.sink.warn("Could not parse trace content"),
        }
    }

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            trace.id = id.to_string();
        }
    }
    if trace.id.is_empty()
        && matches!(
            trace.continuation,
            TraceContinuation::Begin | TraceContinuation::Middle
        )
    {
        cx.sink.warn(&format!(
            "Continuation is set to \"{}\" but xml:id is missing",
            continuation_attr.unwrap_or("")
        ));
    }

    match node.attribute("type") {
        Some("penDown") => trace.kind = TraceType::PenDown,
        Some("penUp") => trace.kind = TraceType::PenUp,
        Some("indeterminate") => trace.kind = TraceType::Indeterminate,
        Some(_) | None => {}
    }

    if let Some(duration) = node.attribute("duration") {
        if let Ok(duration) = duration.parse::<i64>() {
            trace.duration = Some(duration);
        }
    }
    if let Some(time_offset) = node.attribute("timeOffset") {
        if let Ok(time_offset) = time_offset.parse::<i64>() {
            trace.time_offset = Some(time_offset);
        }
    }

    let trace = Rc::new(trace);
    if let Some(prior) = prior {
        let _ = prior.next.set(Rc::clone(&trace));
    }
    Some(trace)
}

/// Reads the attributes and annotations of a `traceGroup` element. The
/// caller reads the children and fills `traces`.
fn read_trace_group(
    node: Node<'_, '_>,
    cx: &mut Cx<'_>,
    tables: &Tables,
    require_refs: bool,
) -> Option<TraceGroup> {
    let mut group = TraceGroup::default();

    if let Some(reference) = node.attribute("contextRef") {
        match find_definition(&tables.contexts, reference, "context", "a traceGroup", cx) {
            Ok(found) => group.context = found,
            Err(MissingLocal) => {
                if require_refs {
                    return None;
                }
            }
        }
    }

    if let Some(reference) = node.attribute("brushRef") {
        match find_definition(&tables.brushes, reference, "brush", "a traceGroup", cx) {
            Ok(found) => group.brush = found,
            Err(MissingLocal) => {
                if require_refs {
                    return None;
                }
            }
        }
    }

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            group.id = id.to_string();
        }
    }

    group.annotations = read_annotations(node, cx);

    Some(group)
}

/// Reads a `traceView` element. The referenced trace data must already be
/// registered.
fn read_trace_view(
    node: Node<'_, '_>,
    cx: &mut Cx<'_>,
    tables: &Tables,
) -> Option<Rc<TraceView>> {
    let Some(reference) = node.attribute("traceDataRef") else {
        cx.sink
            .warn("Attribute \"traceDataRef\" is required for traceView element");
        return None;
    };

    if !is_local(reference) && !cx.assume_local_refs {
        cx.sink.warn(&format!(
            "External references are not yet supported: \"{reference}\""
        ));
        return None;
    }

    let key = to_local(reference);
    let trace_data = if let Some(trace) = tables.traces.get(key) {
        TraceItem::Trace(Rc::clone(trace))
    } else if let Some(group) = tables.trace_groups.get(key) {
        TraceItem::Group(Rc::clone(group))
    } else if let Some(view) = tables.trace_views.get(key) {
        TraceItem::View(Rc::clone(view))
    } else {
        cx.sink.warn(&format!(
            "Could not find trace data \"{reference}\" referenced by a traceView"
        ));
        return None;
    };

    let mut view = TraceView {
        id: String::new(),
        trace_data,
        begin: Vec::new(),
        end: Vec::new(),
    };

    if let Some(id) = xml::id_of(node) {
        if !id.is_empty() {
            view.id = id.to_string();
        }
    }

    view.begin = read_index_list(node.attribute("from"), "from", cx);
    view.end = read_index_list(node.attribute("to"), "to", cx);

    Some(Rc::new(view))
}

/// Parses a `:`-separated list of integers; a malformed list warns and
/// yields an empty one.
fn read_index_list(attribute: Option<&str>, name: &str, cx: &mut Cx<'_>) -> Vec<i64> {
    let Some(text) = attribute else {
        return Vec::new();
    };
    if text.is_empty() {
        return Vec::new();
    }
    let parsed: Result<Vec<i64>, _> = text.split(':').map(str::parse).collect();
    match parsed {
        Ok(values) => values,
        Err(_) => {
            cx.sink.warn(&format!(
                "Could not convert \"{name}\" values to integers: {text}"
            ));
            Vec::new()
        }
    }
}

/// The trace format in effect for a trace: its own context if it names
/// one, the ambient (group) context otherwise, the built-in default as the
/// last resort.
fn effective_trace_format(
    context: Option<&Rc<Context>>,
    ambient: Option<&Rc<Context>>,
) -> Rc<TraceFormat> {
    match context.or(ambient) {
        Some(context) => context
            .resolved_trace_format()
            .unwrap_or_else(default_trace_format),
        None => default_trace_format(),
    }
}

/// Marker for a local reference that names no registered definition.
struct MissingLocal;

/// Looks up a `contextRef`/`brushRef` attribute of a trace or group.
///
/// An external reference warns and resolves to nothing; a missing local
/// reference warns and is returned as an error so the caller can drop the
/// element.
fn find_definition<T>(
    table: &IndexMap<String, Rc<T>>,
    reference: &str,
    what: &str,
    referrer: &str,
    cx: &mut Cx<'_>,
) -> Result<Option<Rc<T>>, MissingLocal> {
    if is_local(reference) || cx.assume_local_refs {
        match table.get(to_local(reference)) {
            Some(found) => Ok(Some(Rc::clone(found))),
            None => {
                cx.sink.warn(&format!(
                    "Could not find {what} \"{reference}\" referenced by {referrer}"
                ));
                Err(MissingLocal)
            }
        }
    } else {
        cx.sink.warn(&format!(
            "External references are not yet supported: \"{reference}\""
        ));
        Ok(None)
    }
}
