//! Explicit per-run state shared by the components of a copy

use crate::config::RetryPolicy;
use crate::event::{Event, EventSink, Level};

/// State owned by one run: the event sink and the retry policy.
///
/// Components receive this by reference instead of reaching for process-wide
/// logging configuration.
pub struct RunContext {
    sink: Box<dyn EventSink>,
    policy: RetryPolicy,
    sink_failures: u64,
}

impl RunContext {
    /// Create a context writing events to `sink`
    pub fn new(sink: Box<dyn EventSink>, policy: RetryPolicy) -> Self {
        Self {
            sink,
            policy,
            sink_failures: 0,
        }
    }

    /// Retry policy for this run
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Record an event in the run log and mirror it to `tracing`.
    ///
    /// A sink failure is reported through `tracing` and counted but does not
    /// interrupt the copy; the affected entry will simply be redone on resume.
    pub fn record(&mut self, event: Event) {
        match event.level {
            Level::Info => tracing::debug!("{}", event.message),
            Level::Error => tracing::warn!("{}", event.message),
        }
        if let Err(e) = self.sink.record(&event) {
            self.sink_failures += 1;
            tracing::warn!("Failed to write run log: {}", e);
        }
    }

    /// Record an Info event
    pub fn info(&mut self, message: impl Into<String>) {
        self.record(Event::info(message));
    }

    /// Record an Error event
    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Event::error(message));
    }

    /// Number of events the sink failed to persist
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures
    }
}
