#![doc = include_str!("lib.md")]

use core::fmt::{Debug, Display, Formatter};
use std::error;
use std::rc::Rc;

use roxmltree::{Document, Node};
use tracing::instrument;

pub mod diag;
pub mod ids;
pub mod ink;
pub mod testing;

mod element;
mod envelope;
mod points;
mod resolve;
mod xml;

use crate::diag::{DiagnosticSink, LogSink};
use crate::element::{annotation, brush, context, format, source, timestamp, trace};
use crate::envelope::Harvest;
use crate::ink::{Definitions, Ink};

/// InkML reading errors.
///
/// Only conditions that leave nothing to return are errors. Every other
/// problem (a missing attribute, an unresolved reference, a malformed
/// trace body) is reported through the [`DiagnosticSink`] and reading
/// continues with a possibly partial document.
#[derive(Debug)]
pub enum InkError {
    /// The input is not well-formed XML.
    Xml(roxmltree::Error),

    /// The root element is not `{http://www.w3.org/2003/InkML}ink`.
    UnexpectedRoot {
        /// Qualified name of the root element that was found.
        found: String,
    },
}

impl error::Error for InkError {}

impl Display for InkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            InkError::Xml(err) => write!(f, "Xml: {}", err),
            InkError::UnexpectedRoot { found } => {
                write!(f, "UnexpectedRoot: expected {{{}}}ink, found: {}", xml::INKML_NS, found)
            }
        }
    }
}

impl From<roxmltree::Error> for InkError {
    fn from(err: roxmltree::Error) -> Self {
        InkError::Xml(err)
    }
}

/// Configuration of a [`Reader`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReaderOptions {
    /// Treat every id reference as local, even without a leading `#`.
    ///
    /// Some producers write `brushRef="b0"` where the format requires
    /// `brushRef="#b0"`; this option resolves such references in the same
    /// document instead of warning about an external reference.
    pub assume_local_refs: bool,
}

/// Shared state of one reading pass: options plus the diagnostic sink.
pub(crate) struct Cx<'a> {
    pub(crate) assume_local_refs: bool,
    pub(crate) sink: &'a mut dyn DiagnosticSink,
}

/// InkML document reader.
///
/// A reader is reusable; each [`Reader::read`] call decodes one document
/// and shares no state with previous calls.
pub struct Reader {
    options: ReaderOptions,
    sink: Box<dyn DiagnosticSink>,
}

impl Debug for Reader {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reader").field("options", &self.options).finish()
    }
}

impl Default for Reader {
    fn default() -> Self {
        Reader::new(ReaderOptions::default())
    }
}

impl Reader {
    /// Creates a reader that reports diagnostics through `tracing`.
    pub fn new(options: ReaderOptions) -> Reader {
        Reader {
            options,
            sink: Box::new(LogSink),
        }
    }

    /// Creates a reader with a custom diagnostic sink.
    pub fn with_sink(options: ReaderOptions, sink: Box<dyn DiagnosticSink>) -> Reader {
        Reader { options, sink }
    }

    /// Decodes one InkML document.
    ///
    /// Reading happens in three passes: definitions are harvested from the
    /// whole document, references between them are resolved, and the
    /// root's trace items are read against the resolved definitions.
    #[instrument(skip(self, content))]
    pub fn read(&mut self, content: &str) -> Result<Ink, InkError> {
        let document = Document::parse(content)?;
        let root = document.root_element();
        if !xml::is_inkml(root, "ink") {
            let name = root.tag_name();
            let found = match name.namespace() {
                Some(ns) => format!("{{{ns}}}{}", name.name()),
                None => name.name().to_string(),
            };
            return Err(InkError::UnexpectedRoot { found });
        }

        let mut cx = Cx {
            assume_local_refs: self.options.assume_local_refs,
            sink: self.sink.as_mut(),
        };

        let harvest = harvest_definitions(root, &mut cx);
        let mut tables = resolve::resolve(harvest, &mut cx);

        // identified traces inside <definitions> register for priorRef and
        // traceDataRef lookups but stay out of the document root
        for definitions in xml::find_children(root, "definitions") {
            let _ = trace::read_traces(definitions, &mut cx, &mut tables, None);
        }

        let traces = trace::read_traces(root, &mut cx, &mut tables, None);
        let annotations = annotation::read_annotations(root, &mut cx);

        let definitions = Definitions {
            contexts: tables.contexts.into_values().collect(),
            brushes: tables.brushes.into_values().collect(),
            ink_sources: tables.ink_sources.into_values().collect(),
            trace_formats: tables.trace_formats.into_values().collect(),
            timestamps: tables.timestamps.into_values().collect(),
        };

        Ok(Ink {
            traces,
            annotations,
            definitions,
        })
    }
}

/// First pass: reads every definition in the document into id-keyed
/// envelope tables, without resolving anything.
fn harvest_definitions(root: Node<'_, '_>, cx: &mut Cx<'_>) -> Harvest {
    let mut harvest = Harvest::default();
    let definition_elements = xml::find_children(root, "definitions");

    for element in &definition_elements {
        for node in xml::find_children(*element, "inkSource") {
            if let Some(ink_source) = source::read_ink_source(node, cx) {
                let trace_format = Rc::clone(&ink_source.trace_format);
                harvest
                    .ink_sources
                    .insert(ink_source.id.clone(), ink_source);
                if !trace_format.id.is_empty() {
                    harvest
                        .trace_formats
                        .insert(trace_format.id.clone(), trace_format);
                }
            }
        }
        for node in xml::find_children(*element, "brush") {
            let envelope = brush::read_brush(node, cx);
            if !envelope.id.is_empty() {
                harvest.brushes.insert(envelope.id.clone(), envelope);
            }
        }
        for node in xml::find_children(*element, "traceFormat") {
            let trace_format = format::read_trace_format(node, cx);
            if !trace_format.id.is_empty() {
                harvest
                    .trace_formats
                    .insert(trace_format.id.clone(), Rc::new(trace_format));
            }
        }
        for node in xml::find_children(*element, "timestamp") {
            if let Some(envelope) = timestamp::read_timestamp(node, cx) {
                harvest.timestamps.insert(envelope.id.clone(), envelope);
            }
        }
    }

    for element in &definition_elements {
        for node in xml::find_children(*element, "context") {
            let envelope = context::read_context(node, cx);
            if !envelope.id.is_empty() {
                harvest.contexts.insert(envelope.id.clone(), envelope);
            }
        }
    }

    // top-level contexts; archival readers ignore the id-less "current
    // context" mechanism
    for node in xml::find_children(root, "context") {
        let envelope = context::read_context(node, cx);
        if !envelope.id.is_empty() {
            harvest.contexts.insert(envelope.id.clone(), envelope);
        }
    }

    harvest.register_nested();
    harvest
}
