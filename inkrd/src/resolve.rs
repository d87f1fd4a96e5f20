//! Reference resolution across definition tables.
//!
//! Parent references of brushes, timestamps and contexts may point at
//! definitions that appear later in the document, and may form cycles.
//! Each category is resolved with an iterative fixed-point pass: entities
//! whose parent is already resolved are materialized, until a round makes
//! no progress. Whatever remains is cyclic or dangling and is dropped with
//! one consolidated warning per category. Context contents (ink source,
//! trace format, brush, timestamp) are attached when the context itself is
//! materialized.

use std::collections::HashMap;
use std::rc::Rc;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::envelope::{BrushEnvelope, ContextEnvelope, Harvest, Slot, Tables, TimestampEnvelope};
use crate::ids::{is_local, to_local};
use crate::ink::{Brush, Context, Timestamp};
use crate::Cx;

/// Resolves every reference of the harvested definitions, consuming the
/// envelopes.
pub(crate) fn resolve(harvest: Harvest, cx: &mut Cx<'_>) -> Tables {
    let Harvest {
        contexts,
        brushes,
        ink_sources,
        trace_formats,
        timestamps,
    } = harvest;

    let mut tables = Tables {
        brushes: resolve_brush_parents(brushes, cx),
        timestamps: resolve_timestamp_parents(timestamps, cx),
        ink_sources,
        trace_formats,
        ..Tables::default()
    };
    tables.contexts = resolve_contexts(contexts, &tables, cx);
    tables
}

/// Brushes referencing the reserved `#DefaultBrush` inherit nothing.
const DEFAULT_BRUSH_REF: &str = "#DefaultBrush";

fn resolve_brush_parents(
    envelopes: IndexMap<String, BrushEnvelope>,
    cx: &mut Cx<'_>,
) -> IndexMap<String, Rc<Brush>> {
    let order: Vec<String> = envelopes.keys().cloned().collect();
    let mut pending = envelopes;
    let mut resolved: HashMap<String, Rc<Brush>> = HashMap::new();

    loop {
        let terminal = |env: &BrushEnvelope| {
            env.parent_ref.is_empty() || env.parent_ref == DEFAULT_BRUSH_REF
        };
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, env)| terminal(env) || resolved.contains_key(to_local(&env.parent_ref)))
            .map(|(id, _)| id.clone())
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in ready {
            if let Some(env) = pending.shift_remove(&id) {
                let parent = if terminal(&env) {
                    None
                } else {
                    resolved.get(to_local(&env.parent_ref)).map(Rc::clone)
                };
                let brush = Brush {
                    id: env.id,
                    parent,
                    properties: env.properties,
                    annotations: env.annotations,
                };
                resolved.insert(id, Rc::new(brush));
            }
        }
    }

    if !pending.is_empty() {
        cx.sink.warn(&format!(
            "Some brush references are either cyclic or incorrect and could not be resolved. \
             Following brushes will be ignored: {}",
            pending.keys().join(", ")
        ));
    }

    ordered(&order, &resolved)
}

fn resolve_timestamp_parents(
    envelopes: IndexMap<String, TimestampEnvelope>,
    cx: &mut Cx<'_>,
) -> IndexMap<String, Rc<Timestamp>> {
    let order: Vec<String> = envelopes.keys().cloned().collect();
    let mut pending = envelopes;
    let mut resolved: HashMap<String, Rc<Timestamp>> = HashMap::new();

    loop {
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, env)| {
                env.parent_ref.is_empty() || resolved.contains_key(to_local(&env.parent_ref))
            })
            .map(|(id, _)| id.clone())
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in ready {
            if let Some(env) = pending.shift_remove(&id) {
                let parent = if env.parent_ref.is_empty() {
                    None
                } else {
                    resolved.get(to_local(&env.parent_ref)).map(Rc::clone)
                };
                let timestamp = Timestamp {
                    id: env.id,
                    parent,
                    time: env.time,
                    time_string: env.time_string,
                    time_offset: env.time_offset,
                };
                resolved.insert(id, Rc::new(timestamp));
            }
        }
    }

    if !pending.is_empty() {
        cx.sink.warn(&format!(
            "Some timestamp references are either cyclic or incorrect and could not be resolved. \
             Following timestamps will be ignored: {}",
            pending.keys().join(", ")
        ));
    }

    ordered(&order, &resolved)
}

fn resolve_contexts(
    envelopes: IndexMap<String, ContextEnvelope>,
    tables: &Tables,
    cx: &mut Cx<'_>,
) -> IndexMap<String, Rc<Context>> {
    let order: Vec<String> = envelopes.keys().cloned().collect();
    let mut pending = envelopes;
    let mut resolved: HashMap<String, Rc<Context>> = HashMap::new();

    loop {
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, env)| {
                env.parent_ref.is_empty() || resolved.contains_key(to_local(&env.parent_ref))
            })
            .map(|(id, _)| id.clone())
            .collect();
        if ready.is_empty() {
            break;
        }
        for id in ready {
            if let Some(env) = pending.shift_remove(&id) {
                let parent = if env.parent_ref.is_empty() {
                    None
                } else {
                    resolved.get(to_local(&env.parent_ref)).map(Rc::clone)
                };
                let context = materialize_context(env, parent, tables, cx);
                resolved.insert(id, Rc::new(context));
            }
        }
    }

    if !pending.is_empty() {
        cx.sink.warn(&format!(
            "Some context references are either cyclic or incorrect and could not be resolved. \
             Following contexts will be ignored: {}",
            pending.keys().join(", ")
        ));
    }

    ordered(&order, &resolved)
}

/// Attaches the content references of a context.
fn materialize_context(
    envelope: ContextEnvelope,
    parent: Option<Rc<Context>>,
    tables: &Tables,
    cx: &mut Cx<'_>,
) -> Context {
    let ContextEnvelope {
        id,
        parent_ref: _,
        ink_source,
        trace_format,
        brush,
        timestamp,
    } = envelope;

    let ink_source = match ink_source {
        Slot::Empty => None,
        Slot::Value(source) => Some(source),
        Slot::Ref(reference) => {
            find_content(&tables.ink_sources, &reference, "inkSource", &id, cx)
        }
    };

    let trace_format = match trace_format {
        Slot::Empty => None,
        Slot::Value(format) => Some(format),
        Slot::Ref(reference) => {
            find_content(&tables.trace_formats, &reference, "traceFormat", &id, cx)
        }
    };

    let brush = match brush {
        Slot::Empty => None,
        Slot::Ref(reference) => find_content(&tables.brushes, &reference, "brush", &id, cx),
        Slot::Value(inline) if inline.id.is_empty() => {
            // An id-less nested brush skipped the parent pass; resolve its
            // parent reference here and attach it in place.
            let parent = if inline.parent_ref.is_empty() {
                None
            } else if let Some(found) = tables.brushes.get(to_local(&inline.parent_ref)) {
                Some(Rc::clone(found))
            } else {
                cx.sink.warn(&format!(
                    "Could not find brush \"{}\" referenced by a nested brush",
                    inline.parent_ref
                ));
                None
            };
            Some(Rc::new(Brush {
                id: inline.id,
                parent,
                properties: inline.properties,
                annotations: inline.annotations,
            }))
        }
        Slot::Value(inline) => match tables.brushes.get(&inline.id) {
            Some(found) => Some(Rc::clone(found)),
            None => {
                cx.sink
                    .warn(&format!("Context \"{id}\" references a brush that was ignored"));
                None
            }
        },
    };

    let timestamp = match timestamp {
        Slot::Empty => None,
        Slot::Ref(reference) => find_content(&tables.timestamps, &reference, "timestamp", &id, cx),
        Slot::Value(inline) if inline.id.is_empty() => {
            let parent = if inline.parent_ref.is_empty() {
                None
            } else if let Some(found) = tables.timestamps.get(to_local(&inline.parent_ref)) {
                Some(Rc::clone(found))
            } else {
                cx.sink.warn(&format!(
                    "Could not find timestamp \"{}\" referenced by a nested timestamp",
                    inline.parent_ref
                ));
                None
            };
            Some(Rc::new(Timestamp {
                id: inline.id,
                parent,
                time: inline.time,
                time_string: inline.time_string,
                time_offset: inline.time_offset,
            }))
        }
        Slot::Value(inline) => match tables.timestamps.get(&inline.id) {
            Some(found) => Some(Rc::clone(found)),
            None => {
                cx.sink.warn(&format!(
                    "Context \"{id}\" references a timestamp that was ignored"
                ));
                None
            }
        },
    };

    Context {
        id,
        parent,
        ink_source,
        trace_format,
        brush,
        timestamp,
    }
}

/// Looks up a context content reference, warning on misses and on external
/// references.
fn find_content<T>(
    table: &IndexMap<String, Rc<T>>,
    reference: &str,
    what: &str,
    context_id: &str,
    cx: &mut Cx<'_>,
) -> Option<Rc<T>> {
    if is_local(reference) || cx.assume_local_refs {
        match table.get(to_local(reference)) {
            Some(found) => Some(Rc::clone(found)),
            None => {
                cx.sink.warn(&format!(
                    "Could not find {what} \"{reference}\" referenced by context \"{context_id}\""
                ));
                None
            }
        }
    } else {
        cx.sink.warn(&format!(
            "External references are not yet supported: \"{reference}\""
        ));
        None
    }
}

/// Rebuilds the surviving entries in first-definition order.
fn ordered<T>(order: &[String], resolved: &HashMap<String, Rc<T>>) -> IndexMap<String, Rc<T>> {
    order
        .iter()
        .filter_map(|id| resolved.get(id).map(|item| (id.clone(), Rc::clone(item))))
        .collect()
}
