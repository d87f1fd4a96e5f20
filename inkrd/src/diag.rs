//! Diagnostic channel for non-fatal reading problems.
//!
//! The reader never aborts on a recoverable problem (a missing attribute,
//! an unresolved reference, a malformed trace body). It reports the
//! condition through a [`DiagnosticSink`] and continues, returning a
//! possibly partial document. Only malformed XML and a wrong root element
//! surface as errors.

use tracing::{info, warn};

/// Receiver for non-fatal reader diagnostics.
///
/// Implementations must not panic from either method; the reader assumes
/// reporting always succeeds.
pub trait DiagnosticSink {
    /// Report a recoverable problem with the document being read.
    fn warn(&mut self, message: &str);

    /// Report progress or context that is not a problem.
    fn info(&mut self, message: &str);
}

/// Default sink, forwarding to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn warn(&mut self, message: &str) {
        warn!("{message}");
    }

    fn info(&mut self, message: &str) {
        info!("{message}");
    }
}
