use crate::formatter::{JsonFormatter, OutputFilter};
use crate::record::{ExceptionInfo, Frame, LogEvent, Message};
use crate::redact::Redactor;
use crate::value::FieldValue;
use std::error::Error;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that renders every event through a
/// [`JsonFormatter`] and writes it as one line to a [`MakeWriter`].
///
/// Formatting happens on the thread that emitted the event. The layer never
/// emits `tracing` events of its own; write failures are counted and
/// reported on stderr.
pub struct JsonLogLayer<F = Redactor, W = fn() -> io::Stderr> {
    formatter: JsonFormatter<F>,
    make_writer: W,
    min_level: Level,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Lines successfully written.
    pub written_events: Arc<AtomicU64>,
    /// Lines lost because the writer failed.
    pub write_errors: Arc<AtomicU64>,
}

impl<F: OutputFilter> JsonLogLayer<F> {
    /// Create a layer writing to stderr and accepting every level.
    pub fn new(formatter: JsonFormatter<F>) -> Self {
        Self {
            formatter,
            make_writer: io::stderr,
            min_level: Level::TRACE,
            total_events: Arc::new(AtomicU64::new(0)),
            written_events: Arc::new(AtomicU64::new(0)),
            write_errors: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<F, W> JsonLogLayer<F, W> {
    /// Replace the destination of formatted lines.
    pub fn with_writer<W2>(self, make_writer: W2) -> JsonLogLayer<F, W2>
    where
        W2: for<'w> MakeWriter<'w> + 'static,
    {
        JsonLogLayer {
            formatter: self.formatter,
            make_writer,
            min_level: self.min_level,
            total_events: self.total_events,
            written_events: self.written_events,
            write_errors: self.write_errors,
        }
    }

    /// Skip events more verbose than `level`.
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    pub fn formatter(&self) -> &JsonFormatter<F> {
        &self.formatter
    }
}

impl<S, F, W> Layer<S> for JsonLogLayer<F, W>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
    F: OutputFilter + 'static,
    W: for<'w> MakeWriter<'w> + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        let meta = event.metadata();
        if *meta.level() > self.min_level {
            return;
        }

        let log_event = to_log_event(event);
        let mut line = self.formatter.format(&log_event);
        line.push('\n');

        let mut writer = self.make_writer.make_writer_for(meta);
        match writer.write_all(line.as_bytes()).and_then(|()| writer.flush()) {
            Ok(()) => {
                self.written_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.write_errors.fetch_add(1, Ordering::Relaxed);
                eprintln!("error writing log line: {}", e);
            }
        }
    }
}

/// Convert a `tracing` event into a [`LogEvent`].
///
/// The target becomes the logger name and the module path stands in for the
/// function name. The `message` field is the text message; fields named
/// `error` or `exception` recorded as errors become the captured exception;
/// every other field is an extra, in declaration order.
///
/// A captured exception gets a single frame at the event's file and line.
/// `tracing` metadata carries no source text, so that frame has no source
/// line and the rendered traceback omits it. Build the [`LogEvent`] by hand
/// with [`Frame::with_source`] when the source line must appear.
pub fn to_log_event(event: &Event<'_>) -> LogEvent {
    let meta = event.metadata();
    let mut extras = Vec::new();
    let mut message: Option<String> = None;
    let mut exception: Option<ExceptionInfo> = None;

    let mut visitor = FieldVisitor {
        extras: &mut extras,
        message: &mut message,
        exception: &mut exception,
    };
    event.record(&mut visitor);

    let message = message.map_or(Message::Structured(FieldValue::Null), Message::Text);
    let func_name = meta.module_path().unwrap_or("<unknown>");
    let line = meta.line().unwrap_or(0);

    let mut log_event = LogEvent::new(*meta.level(), meta.target(), message).at(func_name, line);
    log_event.extras = extras;
    log_event.exception = exception.map(|info| {
        info.with_frame(Frame::new(meta.file().unwrap_or("<unknown>"), line, func_name))
    });
    log_event
}

pub struct FieldVisitor<'a> {
    pub extras: &'a mut Vec<(String, FieldValue)>,
    pub message: &'a mut Option<String>,
    pub exception: &'a mut Option<ExceptionInfo>,
}

impl FieldVisitor<'_> {
    fn push(&mut self, field: &Field, value: FieldValue) {
        self.extras.push((field.name().to_string(), value));
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, FieldValue::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, FieldValue::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, FieldValue::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, FieldValue::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, FieldValue::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if matches!(field.name(), "error" | "exception") && self.exception.is_none() {
            *self.exception = Some(ExceptionInfo::from_dyn_error(value));
        } else {
            self.push(field, FieldValue::from(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{:?}", value);
        if field.name() == "message" {
            *self.message = Some(rendered);
        } else {
            self.push(field, FieldValue::from(rendered));
        }
    }
}
