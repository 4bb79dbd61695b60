//! Begin/end tracing around synchronous and task-returning operations.
//!
//! A [`TraceScope`] names the operation being traced. [`trace_begin_end`]
//! and [`trace_begin_end_async`] bracket it with a `Begin` record and an
//! `End` record; the end record reflects how the operation finished:
//!
//! | finish    | end level     | status           | fault text |
//! |-----------|---------------|------------------|------------|
//! | success   | scope level   | ran-to-completion| none       |
//! | fault     | `Error`       | faulted          | the fault  |
//! | cancelled | `Warn`        | cancelled        | none       |
//!
//! Records go to a [`TraceWriter`]. [`TracingWriter`] forwards them to
//! structured logging; [`MemoryTraceWriter`] keeps them for inspection.

use super::level::TraceLevel;
use crate::config::TracerConfig;
use crate::error::{Fault, PanicError};
use crate::runtime::{IntoTask, Task};
use crate::tracing_compat::{debug, error, info, warn};
use crate::types::{CancelToken, Outcome, TaskStatus};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;

/// Position of a record within a traced operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceKind {
    /// The operation is starting.
    Begin,
    /// The operation finished.
    End,
    /// A standalone record.
    Trace,
}

impl TraceKind {
    /// Returns the kind name as a static string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
            Self::Trace => "trace",
        }
    }
}

/// Names an operation for tracing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceScope {
    /// Record category, used for filtering.
    pub category: String,
    /// Level of the begin record and of a successful end record.
    pub level: TraceLevel,
    /// The component performing the operation.
    pub operator: String,
    /// The operation name.
    pub operation: String,
}

impl TraceScope {
    /// Creates a scope at `Info` level.
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        operator: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            level: TraceLevel::Info,
            operator: operator.into(),
            operation: operation.into(),
        }
    }

    /// Sets the level.
    #[must_use]
    pub fn with_level(mut self, level: TraceLevel) -> Self {
        self.level = level;
        self
    }

    fn record(&self, kind: TraceKind) -> TraceRecord {
        TraceRecord {
            category: self.category.clone(),
            level: self.level,
            kind,
            operator: self.operator.clone(),
            operation: self.operation.clone(),
            message: None,
            status: None,
            fault: None,
        }
    }
}

/// A single trace record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceRecord {
    /// Record category.
    pub category: String,
    /// Severity.
    pub level: TraceLevel,
    /// Begin, end or standalone.
    pub kind: TraceKind,
    /// The component performing the operation.
    pub operator: String,
    /// The operation name.
    pub operation: String,
    /// Free-form message filled in by begin/end callbacks.
    pub message: Option<String>,
    /// Terminal status, on end records.
    pub status: Option<TaskStatus>,
    /// Rendered fault, on failed end records.
    pub fault: Option<String>,
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {}.{}",
            self.level,
            self.category,
            self.kind.as_str(),
            self.operator,
            self.operation
        )?;
        if let Some(status) = self.status {
            write!(f, " status={status}")?;
        }
        if let Some(message) = &self.message {
            write!(f, " message={message:?}")?;
        }
        if let Some(fault) = &self.fault {
            write!(f, " fault={fault:?}")?;
        }
        Ok(())
    }
}

/// A sink for trace records.
pub trait TraceWriter: Send + Sync {
    /// Returns true if records in `category` at `level` would be kept.
    fn is_enabled(&self, category: &str, level: TraceLevel) -> bool;

    /// Writes one record. Callers check [`is_enabled`](Self::is_enabled) first.
    fn trace(&self, record: TraceRecord);
}

/// Drops the value-bearing message of End records when values are excluded.
fn strip_values(config: &TracerConfig, record: &mut TraceRecord) {
    if !config.include_values && record.kind == TraceKind::End {
        record.message = None;
    }
}

fn emit(writer: &dyn TraceWriter, record: TraceRecord) {
    if writer.is_enabled(&record.category, record.level) {
        writer.trace(record);
    }
}

/// Forwards records to structured logging, filtered by a [`TracerConfig`].
#[derive(Debug, Clone, Default)]
pub struct TracingWriter {
    config: TracerConfig,
}

impl TracingWriter {
    /// Creates a writer with the given filter.
    #[must_use]
    pub fn new(config: TracerConfig) -> Self {
        Self { config }
    }

    /// Returns the filter.
    #[must_use]
    pub fn config(&self) -> &TracerConfig {
        &self.config
    }
}

impl TraceWriter for TracingWriter {
    fn is_enabled(&self, category: &str, level: TraceLevel) -> bool {
        self.config.allows(category, level)
    }

    #[cfg_attr(not(feature = "tracing-integration"), allow(unused_variables))]
    fn trace(&self, mut record: TraceRecord) {
        strip_values(&self.config, &mut record);
        let category = record.category.as_str();
        let kind = record.kind.as_str();
        let operator = record.operator.as_str();
        let operation = record.operation.as_str();
        let message = record.message.as_deref().unwrap_or("");
        let status = record.status.map_or("", TaskStatus::as_str);
        let fault = record.fault.as_deref().unwrap_or("");
        match record.level {
            TraceLevel::Debug => {
                debug!(category, kind, operator, operation, status, fault, "{message}");
            }
            TraceLevel::Info => {
                info!(category, kind, operator, operation, status, fault, "{message}");
            }
            TraceLevel::Warn => {
                warn!(category, kind, operator, operation, status, fault, "{message}");
            }
            TraceLevel::Error | TraceLevel::Fatal => {
                error!(
                    category,
                    kind,
                    operator,
                    operation,
                    status,
                    fault,
                    fatal = record.level == TraceLevel::Fatal,
                    "{message}"
                );
            }
            TraceLevel::Off => {}
        }
    }
}

/// Collects records in memory.
#[derive(Debug, Default)]
pub struct MemoryTraceWriter {
    config: Option<TracerConfig>,
    records: Mutex<Vec<TraceRecord>>,
}

impl MemoryTraceWriter {
    /// Creates a writer that keeps every record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a writer that keeps records passing `config`.
    ///
    /// End messages are dropped when `config.include_values` is false.
    #[must_use]
    pub fn with_config(config: TracerConfig) -> Self {
        Self {
            config: Some(config),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Returns a copy of the collected records.
    #[must_use]
    pub fn records(&self) -> Vec<TraceRecord> {
        self.records.lock().clone()
    }

    /// Removes and returns the collected records.
    pub fn take(&self) -> Vec<TraceRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

impl TraceWriter for MemoryTraceWriter {
    fn is_enabled(&self, category: &str, level: TraceLevel) -> bool {
        self.config
            .as_ref()
            .map_or(level != TraceLevel::Off, |config| config.allows(category, level))
    }

    fn trace(&self, mut record: TraceRecord) {
        if let Some(config) = &self.config {
            strip_values(config, &mut record);
        }
        self.records.lock().push(record);
    }
}

fn end_record<T>(scope: &TraceScope, outcome: &Outcome<T>) -> TraceRecord {
    let mut record = scope.record(TraceKind::End);
    record.status = Some(outcome.status());
    match outcome {
        Outcome::Ok(_) => {}
        Outcome::Faulted(fault) => {
            record.level = TraceLevel::Error;
            record.fault = Some(fault.to_string());
        }
        Outcome::Cancelled => record.level = TraceLevel::Warn,
    }
    record
}

/// Traces a synchronous operation.
///
/// Emits a begin record (filled in by `begin`), runs `execute`, and emits an
/// end record. On success `end` sees the value; on failure the end record
/// carries the fault at `Error` level and the error is returned. A panic in
/// `execute` is traced as a fault and then resumed.
pub fn trace_begin_end<T, E, B, X, N>(
    writer: &dyn TraceWriter,
    scope: &TraceScope,
    begin: B,
    execute: X,
    end: N,
) -> Result<T, Fault>
where
    E: Into<Fault>,
    B: FnOnce(&mut TraceRecord),
    X: FnOnce() -> Result<T, E>,
    N: FnOnce(&mut TraceRecord, &T),
{
    let mut record = scope.record(TraceKind::Begin);
    begin(&mut record);
    emit(writer, record);

    let result = match catch_unwind(AssertUnwindSafe(execute)) {
        Ok(result) => result.map_err(Into::into),
        Err(payload) => {
            let panic = PanicError::from_payload(payload.as_ref());
            let outcome = Outcome::<T>::Faulted(Fault::new(panic.clone()));
            let mut record = end_record(scope, &outcome);
            record.fault = Some(format!("operation panicked: {}", panic.message()));
            emit(writer, record);
            resume_unwind(payload);
        }
    };

    match &result {
        Ok(value) => {
            let mut record = end_record(scope, &Outcome::Ok(()));
            end(&mut record, value);
            emit(writer, record);
        }
        Err(fault) => emit(writer, end_record::<T>(scope, &Outcome::Faulted(fault.clone()))),
    }
    result
}

/// Traces a task-returning operation.
///
/// Emits a begin record, calls `execute` (an error return or panic becomes a
/// faulted task), and emits the end record when the task completes. The
/// returned task mirrors the executed one.
pub fn trace_begin_end_async<T, R, B, X, N>(
    writer: Arc<dyn TraceWriter>,
    scope: TraceScope,
    begin: B,
    execute: X,
    end: N,
) -> Task<T>
where
    T: Clone + Send + Sync + 'static,
    R: IntoTask<Output = T>,
    B: FnOnce(&mut TraceRecord),
    X: FnOnce() -> R,
    N: FnOnce(&mut TraceRecord, &T) + Send + 'static,
{
    let mut record = scope.record(TraceKind::Begin);
    begin(&mut record);
    emit(writer.as_ref(), record);

    Task::run_synchronously(execute, &CancelToken::none()).inspect(move |outcome| {
        let mut record = end_record(&scope, outcome);
        if let Outcome::Ok(value) = outcome {
            end(&mut record, value);
        }
        emit(writer.as_ref(), record);
    })
}
