// Diagnostic routing
//
// Library code never writes to a fixed stream. Every operation that can
// produce human-readable diagnostics takes a caller-supplied sink; callers
// that want silence pass `NullSink`.

/// Receives diagnostic text from pipeline parsing and registration.
pub trait DiagnosticSink {
    fn report(&mut self, message: &str);
}

/// Discards every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _message: &str) {}
}

/// Accumulates diagnostics for later inspection.
#[derive(Debug, Default)]
pub struct CollectedDiagnostics {
    messages: Vec<String>,
}

impl CollectedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl DiagnosticSink for CollectedDiagnostics {
    fn report(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}
