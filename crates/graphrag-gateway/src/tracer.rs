//! Tool-call tracing seam (spec §C of SPEC_FULL.md), grounded on
//! `original_source/src/mcp/utils/tracing.py::trace_tool`: a span wrapping
//! each tool invocation, silently disabled when the backend is unavailable.
//!
//! No Langfuse SDK exists in this workspace's dependency pack, so only the
//! seam survives: a no-op tracer by default, or a tracing-crate-backed one
//! that logs start/success/error the way the original logs around a
//! disabled Langfuse client.

pub trait ToolTracer: Send + Sync {
    fn on_start(&self, tool_name: &str);
    fn on_success(&self, tool_name: &str, output: &str);
    fn on_error(&self, tool_name: &str, error: &str);
}

/// Used when `GRAPHRAG_TRACING_ENABLED` is unset, matching the original's
/// behavior when Langfuse is disabled or fails to initialize.
pub struct NoopTracer;

impl ToolTracer for NoopTracer {
    fn on_start(&self, _tool_name: &str) {}
    fn on_success(&self, _tool_name: &str, _output: &str) {}
    fn on_error(&self, _tool_name: &str, _error: &str) {}
}

/// Emits `tracing` events instead of Langfuse spans, truncating long output
/// the same way the original truncates before attaching it to a span.
pub struct LoggingTracer {
    pub service_name: String,
}

impl ToolTracer for LoggingTracer {
    fn on_start(&self, tool_name: &str) {
        tracing::debug!(service = %self.service_name, tool_name, "tool invocation started");
    }

    fn on_success(&self, tool_name: &str, output: &str) {
        let truncated: String = output.chars().take(1000).collect();
        tracing::info!(service = %self.service_name, tool_name, output = %truncated, "tool invocation succeeded");
    }

    fn on_error(&self, tool_name: &str, error: &str) {
        tracing::warn!(service = %self.service_name, tool_name, error, "tool invocation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_tracer_does_nothing_observable() {
        let tracer = NoopTracer;
        tracer.on_start("query_codebase");
        tracer.on_success("query_codebase", "ok");
        tracer.on_error("query_codebase", "boom");
    }
}
