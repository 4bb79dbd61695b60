//! Operation tracing.
//!
//! - [`level`]: [`TraceLevel`] severities
//! - [`tracer`]: trace records, writers, and the begin/end helpers that wrap
//!   synchronous and task-returning operations

pub mod level;
pub mod tracer;

pub use level::TraceLevel;
pub use tracer::{
    MemoryTraceWriter, TraceKind, TraceRecord, TraceScope, TraceWriter, TracingWriter,
    trace_begin_end, trace_begin_end_async,
};
