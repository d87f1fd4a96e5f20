//! Transient reading state.
//!
//! Element readers cannot finish entities that reference sibling
//! definitions (`brushRef`, `contextRef`, `timestampRef`, ...): the target
//! may appear later in the document. They return *envelopes* instead,
//! pairing the data read so far with the unresolved reference strings. The
//! resolver turns a [`Harvest`] of envelopes into the [`Tables`] of
//! finished, shared entities; the envelopes are discarded afterwards.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ink::{
    AnnotatedProperty, Annotation, Brush, Context, InkSource, Timestamp, Trace, TraceFormat,
    TraceGroup, TraceView,
};

/// A value-or-reference field of a context envelope.
///
/// `Ref` holds an unresolved reference attribute; `Value` a nested element
/// that was read in place. A nested element wins over a reference
/// attribute on the same context.
#[derive(Debug, Clone)]
pub(crate) enum Slot<T> {
    /// Neither attribute nor nested element present.
    Empty,

    /// Unresolved reference attribute.
    Ref(String),

    /// Nested element, already read.
    Value(T),
}

// manual impl: deriving would bound T: Default
impl<T> Default for Slot<T> {
    fn default() -> Self {
        Slot::Empty
    }
}

/// A brush with its parent reference still unresolved.
#[derive(Debug, Default, Clone)]
pub(crate) struct BrushEnvelope {
    pub(crate) id: String,
    pub(crate) parent_ref: String,
    pub(crate) properties: HashMap<String, AnnotatedProperty>,
    pub(crate) annotations: Vec<Annotation>,
}

/// A timestamp with its parent reference still unresolved.
#[derive(Debug, Default, Clone)]
pub(crate) struct TimestampEnvelope {
    pub(crate) id: String,
    pub(crate) parent_ref: String,
    pub(crate) time: Option<f64>,
    pub(crate) time_string: String,
    pub(crate) time_offset: f64,
}

/// A context with parent and content references still unresolved.
#[derive(Debug, Default, Clone)]
pub(crate) struct ContextEnvelope {
    pub(crate) id: String,
    pub(crate) parent_ref: String,
    pub(crate) ink_source: Slot<Rc<InkSource>>,
    pub(crate) trace_format: Slot<Rc<TraceFormat>>,
    pub(crate) brush: Slot<BrushEnvelope>,
    pub(crate) timestamp: Slot<TimestampEnvelope>,
}

/// Definition tables filled by the harvesting pass, id-keyed with
/// last-wins overwrite semantics.
#[derive(Debug, Default)]
pub(crate) struct Harvest {
    pub(crate) contexts: IndexMap<String, ContextEnvelope>,
    pub(crate) brushes: IndexMap<String, BrushEnvelope>,
    pub(crate) ink_sources: IndexMap<String, Rc<InkSource>>,
    pub(crate) trace_formats: IndexMap<String, Rc<TraceFormat>>,
    pub(crate) timestamps: IndexMap<String, TimestampEnvelope>,
}

impl Harvest {
    /// Registers identified items that were read nested inside contexts, so
    /// they can be referenced like top-level definitions. An existing
    /// definition under the same id is kept.
    pub(crate) fn register_nested(&mut self) {
        for envelope in self.contexts.values() {
            if let Slot::Value(source) = &envelope.ink_source {
                if !source.id.is_empty() && !self.ink_sources.contains_key(&source.id) {
                    self.ink_sources.insert(source.id.clone(), Rc::clone(source));
                }
            }
            if let Slot::Value(format) = &envelope.trace_format {
                if !format.id.is_empty() && !self.trace_formats.contains_key(&format.id) {
                    self.trace_formats.insert(format.id.clone(), Rc::clone(format));
                }
            }
            if let Slot::Value(brush) = &envelope.brush {
                if !brush.id.is_empty() && !self.brushes.contains_key(&brush.id) {
                    self.brushes.insert(brush.id.clone(), brush.clone());
                }
            }
            if let Slot::Value(timestamp) = &envelope.timestamp {
                if !timestamp.id.is_empty() && !self.timestamps.contains_key(&timestamp.id) {
                    self.timestamps.insert(timestamp.id.clone(), timestamp.clone());
                }
            }
        }
    }
}

/// Resolved definition tables used while reading traces.
///
/// The trace, group and view tables start empty and are filled as
/// identified trace items are read, for `priorRef` and `traceDataRef`
/// lookups.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) contexts: IndexMap<String, Rc<Context>>,
    pub(crate) brushes: IndexMap<String, Rc<Brush>>,
    pub(crate) ink_sources: IndexMap<String, Rc<InkSource>>,
    pub(crate) trace_formats: IndexMap<String, Rc<TraceFormat>>,
    pub(crate) timestamps: IndexMap<String, Rc<Timestamp>>,
    pub(crate) traces: IndexMap<String, Rc<Trace>>,
    pub(crate) trace_groups: IndexMap<String, Rc<TraceGroup>>,
    pub(crate) trace_views: IndexMap<String, Rc<TraceView>>,
}
