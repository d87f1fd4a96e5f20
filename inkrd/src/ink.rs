//! The in-memory ink document model.
//!
//! Everything in this module is produced by [`Reader::read`](crate::Reader::read)
//! and is not mutated afterwards. Entities that can be referenced from more
//! than one place (contexts, brushes, ink sources, trace formats,
//! timestamps, traces) are shared through [`Rc`]; the reader is
//! single-threaded and so is the finished document.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A decoded InkML document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Ink {
    /// Top-level traces, trace groups and trace views, in document order.
    pub traces: Vec<TraceItem>,

    /// Top-level annotations, in document order.
    pub annotations: Vec<Annotation>,

    /// Reusable definitions collected from the whole document.
    pub definitions: Definitions,
}

/// Deduplicated definition collections.
///
/// Identifiers are unique within each collection; when the document defines
/// the same id twice, the later definition wins. Order follows first
/// appearance in the document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Definitions {
    /// All identified contexts that survived reference resolution.
    pub contexts: Vec<Rc<Context>>,

    /// All identified brushes that survived reference resolution.
    pub brushes: Vec<Rc<Brush>>,

    /// All identified ink sources.
    pub ink_sources: Vec<Rc<InkSource>>,

    /// All identified trace formats, including formats nested in ink
    /// sources and contexts.
    pub trace_formats: Vec<Rc<TraceFormat>>,

    /// All identified timestamps that survived reference resolution.
    pub timestamps: Vec<Rc<Timestamp>>,
}

/// One entry of the document's trace sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceItem {
    /// A single stroke.
    Trace(Rc<Trace>),

    /// A group of trace items sharing a context and brush.
    Group(Rc<TraceGroup>),

    /// A selection inside another trace item.
    View(Rc<TraceView>),
}

/// A sequence of sampled points forming one pen stroke.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Trace {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Decoded samples per regular channel, keyed by channel name.
    ///
    /// Every sequence has one entry per parsed point. Integer channels hold
    /// exact whole numbers, boolean channels hold 0 or 1.
    pub channels: HashMap<String, Vec<f64>>,

    /// Decoded samples per intermittent channel, keyed by channel name.
    ///
    /// Each entry anchors a value to the index of the point at which it was
    /// sampled.
    pub intermittent_channels: HashMap<String, Vec<IndexValue>>,

    /// How this trace relates to a stroke split over several traces.
    pub continuation: TraceContinuation,

    /// The continuation of this trace, set when a later trace names this
    /// one in its `priorRef` attribute.
    pub next: OnceCell<Rc<Trace>>,

    /// Context this trace was captured under.
    pub context: Option<Rc<Context>>,

    /// Brush used for this trace.
    pub brush: Option<Rc<Brush>>,

    /// Duration of this trace, in milliseconds.
    pub duration: Option<i64>,

    /// Relative timestamp of this trace, in milliseconds.
    pub time_offset: Option<i64>,

    /// Pen contact state of this trace.
    pub kind: TraceType,
}

/// Continuation marker of a [`Trace`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TraceContinuation {
    /// A complete stroke.
    #[default]
    None,

    /// First part of a stroke continued by other traces.
    Begin,

    /// Middle part, links a prior trace to a later one.
    Middle,

    /// Final part of a continued stroke.
    End,
}

/// Pen contact state of a [`Trace`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TraceType {
    /// Recorded with the pen touching the surface.
    #[default]
    PenDown,

    /// Recorded with the pen lifted.
    PenUp,

    /// Contact state is unknown.
    Indeterminate,
}

/// A value of an intermittent channel, anchored to a point of the trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexValue {
    /// Index into the regular-channel sample sequences.
    pub index: usize,

    /// The sampled value.
    pub value: f64,
}

/// A group of trace items sharing a context and brush.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraceGroup {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Context applying to all nested traces that do not name their own.
    pub context: Option<Rc<Context>>,

    /// Brush applying to nested traces.
    pub brush: Option<Rc<Brush>>,

    /// Nested traces, groups and views, in document order.
    pub traces: Vec<TraceItem>,

    /// Annotations attached to the group.
    pub annotations: Vec<Annotation>,
}

/// A selection inside another trace item.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceView {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// The trace, group or view this view selects from.
    pub trace_data: TraceItem,

    /// Hierarchical start index into `trace_data` (`from` attribute,
    /// `:`-separated).
    pub begin: Vec<i64>,

    /// Hierarchical end index into `trace_data` (`to` attribute).
    pub end: Vec<i64>,
}

/// A reusable bundle of capture circumstances.
///
/// Contexts inherit: a property not set here is looked up along the parent
/// chain. Parent chains are acyclic by construction; cyclic definitions are
/// dropped while reading.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Context {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Context this one inherits from.
    pub parent: Option<Rc<Context>>,

    /// Capture device of this context.
    pub ink_source: Option<Rc<InkSource>>,

    /// Trace format of this context.
    pub trace_format: Option<Rc<TraceFormat>>,

    /// Brush of this context.
    pub brush: Option<Rc<Brush>>,

    /// Timestamp of this context.
    pub timestamp: Option<Rc<Timestamp>>,
}

impl Context {
    /// Trace format in effect for this context.
    ///
    /// Walks the parent chain for an explicit trace format first; if none is
    /// found, walks it again for an ink source and uses its format.
    pub fn resolved_trace_format(&self) -> Option<Rc<TraceFormat>> {
        let mut context = Some(self);
        while let Some(ctx) = context {
            if let Some(format) = &ctx.trace_format {
                return Some(Rc::clone(format));
            }
            context = ctx.parent.as_deref();
        }

        let mut context = Some(self);
        while let Some(ctx) = context {
            if let Some(source) = &ctx.ink_source {
                return Some(Rc::clone(&source.trace_format));
            }
            context = ctx.parent.as_deref();
        }

        None
    }
}

/// A capture device description.
#[derive(Debug, Clone, PartialEq)]
pub struct InkSource {
    /// Unique identifier (required for ink sources).
    pub id: String,

    /// Format of the traces captured by this source (required).
    pub trace_format: Rc<TraceFormat>,

    /// Sampling rate of the source.
    pub sample_rate: Option<SampleRate>,

    /// Latency from physical action to digitized sample, in milliseconds.
    pub latency: Option<Latency>,

    /// The capture surface dimensions.
    pub active_area: Option<ActiveArea>,

    /// Manufacturer of the capture device.
    pub manufacturer: Option<String>,

    /// Device model.
    pub model: Option<String>,

    /// Device serial number.
    pub serial_no: Option<String>,

    /// Reference to the device specification.
    pub specification_ref: Option<String>,

    /// Free-form device description.
    pub description: Option<String>,

    /// Named source properties.
    pub properties: HashMap<String, Property>,
}

/// Declared ordering and typing of trace channels.
///
/// Channel order is significant: it defines the token positions within each
/// point of a trace body.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TraceFormat {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Channels sampled at every point, in declaration order.
    pub regular_channels: Vec<Channel>,

    /// Channels sampled only at selected points, in declaration order.
    pub intermittent_channels: Vec<Channel>,
}

/// One channel of a trace format.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Case-sensitive channel name (required), e.g. `X`, `Y`, `F`, `T`.
    pub name: String,

    /// Value type of the channel's samples.
    pub kind: ChannelType,

    /// Value to assume when the channel is not sampled.
    pub default: ChannelDefault,

    /// Minimal value, if bounded.
    pub min: Option<f64>,

    /// Maximal value, if bounded.
    pub max: Option<f64>,

    /// Direction of increasing values.
    pub orientation: ChannelOrientation,

    /// Local id of the channel this one's values are measured against.
    pub respect_to: String,

    /// Units of the channel's values.
    pub units: String,

    /// Named channel properties, filled from `channelProperties` of the
    /// enclosing ink source.
    pub properties: HashMap<String, Property>,
    // <mapping> child elements are not decoded
}

impl Channel {
    /// Creates a channel with the given name and all defaults.
    pub fn new(name: impl Into<String>) -> Channel {
        Channel {
            id: String::new(),
            name: name.into(),
            kind: ChannelType::default(),
            default: ChannelDefault::default(),
            min: None,
            max: None,
            orientation: ChannelOrientation::default(),
            respect_to: String::new(),
            units: String::new(),
            properties: HashMap::new(),
        }
    }
}

/// Value type of a [`Channel`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    /// Whole numbers; decoded values are rounded to the nearest integer.
    Integer,

    /// Decimal numbers.
    #[default]
    Decimal,

    /// Double-precision numbers. Decoded exactly like `Decimal`.
    Double,

    /// `T`/`F` literals, decoded as 1/0.
    Boolean,
}

/// Default value of a [`Channel`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelDefault {
    /// Default for numeric channels.
    Number(f64),

    /// Default for boolean channels.
    Boolean(bool),
}

impl Default for ChannelDefault {
    fn default() -> Self {
        ChannelDefault::Number(0.0)
    }
}

/// Direction of increasing values of a [`Channel`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrientation {
    /// `+ve`, values grow along the axis.
    #[default]
    Positive,

    /// `-ve`, values grow against the axis.
    Negative,
}

/// Sampling rate of an ink source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRate {
    /// Samples per second.
    pub value: f64,

    /// Whether the rate is uniform, with no dropped points.
    pub uniform: bool,
}

/// Latency of an ink source, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Latency {
    /// Milliseconds from pen action to sample.
    pub value: f64,
}

/// Capture surface dimensions of an ink source.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveArea {
    /// Width of the active area.
    pub width: f64,

    /// Height of the active area.
    pub height: f64,

    /// Units of width and height.
    pub units: Option<String>,

    /// ISO paper-size name of the area, e.g. `A4`.
    pub size: Option<String>,
}

/// A drawing tool description.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Brush {
    /// Unique identifier, empty if the element had none.
    pub id: String,

    /// Brush this one inherits from.
    pub parent: Option<Rc<Brush>>,

    /// Named brush properties, each optionally annotated.
    pub properties: HashMap<String, AnnotatedProperty>,

    /// Annotations attached to the brush.
    pub annotations: Vec<Annotation>,
}

/// A point in time traces can be measured against.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Timestamp {
    /// Unique identifier (required for timestamps).
    pub id: String,

    /// Timestamp this one is relative to.
    pub parent: Option<Rc<Timestamp>>,

    /// Absolute time, in milliseconds since 1 January 1970 00:00:00 UTC.
    ///
    /// When set, `time_string`, `parent` and `time_offset` are unset.
    pub time: Option<f64>,

    /// Absolute time in a human-readable format. When set, `parent` and
    /// `time_offset` are unset.
    pub time_string: String,

    /// Offset against the parent timestamp, in milliseconds.
    pub time_offset: f64,
}

/// Application-defined metadata attached to ink elements.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Annotation {
    /// Text content, flattened embedded XML, or an href, depending on
    /// `content_type`.
    pub content: String,

    /// What `content` holds.
    pub content_type: AnnotationContentType,

    /// The `type` attribute.
    pub annotation_type: String,

    /// The `encoding` attribute.
    pub encoding: String,

    /// All further attributes of the annotation element.
    pub attributes: HashMap<String, String>,
}

/// Content kind of an [`Annotation`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationContentType {
    /// Plain text of an `annotation` element.
    #[default]
    Text,

    /// Flattened inner text of an `annotationXML` element.
    Xml,

    /// The `href` attribute of an `annotationXML` element without content.
    HRef,
}

/// A named value with optional units.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Property {
    /// Attribute text of the value.
    pub value: String,

    /// Units of the value.
    pub units: Option<String>,
}

/// A named value with optional units and annotations.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct AnnotatedProperty {
    /// Attribute text of the value.
    pub value: String,

    /// Units of the value.
    pub units: Option<String>,

    /// Annotations attached to the property element.
    pub annotations: Vec<Annotation>,
}

/// The format assumed for traces that reach no format through their
/// context: regular decimal channels `X` and `Y`.
pub fn default_trace_format() -> Rc<TraceFormat> {
    Rc::new(TraceFormat {
        id: "DefaultTraceFormat".to_string(),
        regular_channels: vec![Channel::new("X"), Channel::new("Y")],
        intermittent_channels: Vec::new(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_format_is_x_then_y() {
        let format = default_trace_format();
        assert_eq!(format.id, "DefaultTraceFormat");
        let names: Vec<&str> = format.regular_channels.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["X", "Y"]);
        assert!(format.intermittent_channels.is_empty());
        assert_eq!(format.regular_channels[0].kind, ChannelType::Decimal);
    }

    #[test]
    fn trace_format_lookup_walks_parents() {
        let format = Rc::new(TraceFormat {
            id: "f".to_string(),
            regular_channels: vec![Channel::new("X")],
            intermittent_channels: Vec::new(),
        });
        let root = Rc::new(Context {
            id: "root".to_string(),
            trace_format: Some(Rc::clone(&format)),
            ..Context::default()
        });
        let child = Context {
            id: "child".to_string(),
            parent: Some(Rc::clone(&root)),
            ..Context::default()
        };
        let found = child.resolved_trace_format().expect("inherited format");
        assert!(Rc::ptr_eq(&found, &format));
    }

    #[test]
    fn trace_format_lookup_falls_back_to_ink_source() {
        let format = Rc::new(TraceFormat::default());
        let source = Rc::new(InkSource {
            id: "s".to_string(),
            trace_format: Rc::clone(&format),
            sample_rate: None,
            latency: None,
            active_area: None,
            manufacturer: None,
            model: None,
            serial_no: None,
            specification_ref: None,
            description: None,
            properties: HashMap::new(),
        });
        let context = Context {
            id: "c".to_string(),
            ink_source: Some(source),
            ..Context::default()
        };
        let found = context.resolved_trace_format().expect("source format");
        assert!(Rc::ptr_eq(&found, &format));

        let bare = Context::default();
        assert_eq!(bare.resolved_trace_format(), None);
    }
}
