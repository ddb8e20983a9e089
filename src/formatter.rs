use crate::context::RequestContext;
use crate::error::ConfigError;
use crate::interpolate::{interpolate, InterpolationError};
use crate::record::{LogEvent, Message};
use crate::redact::{RedactionPolicy, Redactor, DEFAULT_REDACT_KEYS};
use crate::trace::{self, parse_trace_header, TraceIdProvider};
use crate::value::FieldValue;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Message written when a record cannot be serialized.
pub const FALLBACK_MESSAGE: &str = "ERROR: could not serialize log message";

/// Attribute names owned by the logging framework. Extras using one of these
/// names are dropped.
pub const RESERVED_ATTRS: &[&str] = &[
    "name",
    "msg",
    "message",
    "args",
    "level",
    "levelname",
    "levelno",
    "pathname",
    "filename",
    "module",
    "exc_info",
    "exc_text",
    "stack_info",
    "lineno",
    "funcName",
    "created",
    "msecs",
    "relativeCreated",
    "thread",
    "threadName",
    "processName",
    "process",
    "asctime",
    "location",
    "timestamp",
];

/// Names the formatter always writes itself. Same-named extras are dropped
/// even when the event has no exception.
const EXCEPTION_ATTRS: &[&str] = &["exception", "exception_name"];

/// Names written by a bound [`RequestContext`]. Same-named extras are dropped
/// only when a context is bound.
const CONTEXT_ATTRS: &[&str] = &["context", "xray_trace_id"];

/// Post-processing hook applied to every assembled record before encoding.
pub trait OutputFilter: Send + Sync {
    fn filter(&self, record: Map<String, Value>) -> Map<String, Value>;
}

/// Identity filter used by the plain [`JsonFormatter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl OutputFilter for PassThrough {
    fn filter(&self, record: Map<String, Value>) -> Map<String, Value> {
        record
    }
}

/// Reasons the extraction stage gives up on an event.
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("value is not JSON serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("message interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// Renders [`LogEvent`]s as single-line JSON records.
///
/// Records carry `level`, `timestamp`, `name` and `location`, then `message`,
/// then the event's extra fields in the order they were supplied, then
/// `exception` / `exception_name` when an exception was captured, and finally
/// `context` / `xray_trace_id` when the formatter is bound to a
/// [`RequestContext`]. Keys with null values are dropped. Extras named like
/// the exception fields are always dropped, and extras named like the context
/// fields are dropped while a context is bound.
///
/// The formatter is immutable after construction and can be shared between
/// threads.
pub struct JsonFormatter<F = PassThrough> {
    context: Option<RequestContext>,
    trace_ids: TraceIdProvider,
    filter: F,
}

/// Formatter that redacts sensitive keys before encoding.
pub type SanitizedJsonFormatter = JsonFormatter<Redactor>;

impl JsonFormatter<PassThrough> {
    pub fn new() -> Self {
        Self::with_filter(PassThrough)
    }
}

impl Default for JsonFormatter<PassThrough> {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFormatter<Redactor> {
    pub fn sanitized(policy: RedactionPolicy) -> Self {
        Self::with_filter(Redactor::new(policy))
    }
}

impl<F> fmt::Debug for JsonFormatter<F>
where
    F: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFormatter")
            .field("context", &self.context)
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl<F: OutputFilter> JsonFormatter<F> {
    /// Formatter running `filter` over each record. Trace ids are read from
    /// the process environment unless replaced with
    /// [`with_trace_id_provider`](Self::with_trace_id_provider).
    pub fn with_filter(filter: F) -> Self {
        Self {
            context: None,
            trace_ids: trace::from_env(),
            filter,
        }
    }

    /// Bind the formatter to a request context. Fails if the context is
    /// missing its request id.
    pub fn with_context(mut self, context: RequestContext) -> Result<Self, ConfigError> {
        context.validate()?;
        self.context = Some(context);
        Ok(self)
    }

    pub fn with_trace_id_provider(mut self, provider: TraceIdProvider) -> Self {
        self.trace_ids = provider;
        self
    }

    pub fn context(&self) -> Option<&RequestContext> {
        self.context.as_ref()
    }

    pub fn output_filter(&self) -> &F {
        &self.filter
    }

    /// Format one event. Never fails: any value that cannot be represented
    /// degrades the record to the fallback shape carrying [`FALLBACK_MESSAGE`].
    pub fn format(&self, event: &LogEvent) -> String {
        let fixed = FixedFields::from_event(event);
        let context = self.context_fields();
        self.encode(event, &fixed, context.as_ref())
            .unwrap_or_else(|_| fallback_line(&fixed, context.as_ref()))
    }

    /// Like [`format`](Self::format), but a failure of the final encoding
    /// pass is returned instead of being replaced by the fallback record.
    /// Extraction failures still produce the fallback record.
    pub fn try_format(&self, event: &LogEvent) -> Result<String, serde_json::Error> {
        let fixed = FixedFields::from_event(event);
        let context = self.context_fields();
        self.encode(event, &fixed, context.as_ref())
    }

    fn encode(
        &self,
        event: &LogEvent,
        fixed: &FixedFields,
        context: Option<&ContextFields>,
    ) -> Result<String, serde_json::Error> {
        match extract(event, fixed, context.is_some()) {
            Ok(mut record) => {
                if let Some(context) = context {
                    context.append_to(&mut record);
                }
                serde_json::to_string(&self.filter.filter(record))
            }
            Err(_) => Ok(fallback_line(fixed, context)),
        }
    }

    fn context_fields(&self) -> Option<ContextFields> {
        let context = self.context.as_ref()?;
        Some(ContextFields {
            context: context.to_json(),
            trace_id: (self.trace_ids)().as_deref().and_then(parse_trace_header),
        })
    }
}

struct FixedFields {
    level: String,
    timestamp: String,
    name: String,
    location: String,
}

impl FixedFields {
    fn from_event(event: &LogEvent) -> Self {
        Self {
            level: event.level.as_str().to_string(),
            timestamp: event.created.format("%Y-%m-%d %H:%M:%S%.3fZ").to_string(),
            name: event.name.clone(),
            location: format!(
                "{}:{}",
                event.func_name.as_deref().unwrap_or("<unknown>"),
                event.line.unwrap_or(0)
            ),
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("level".into(), Value::String(self.level.clone()));
        map.insert("timestamp".into(), Value::String(self.timestamp.clone()));
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("location".into(), Value::String(self.location.clone()));
        map
    }
}

struct ContextFields {
    context: Value,
    trace_id: Option<String>,
}

impl ContextFields {
    fn append_to(&self, record: &mut Map<String, Value>) {
        record.insert("context".into(), self.context.clone());
        if let Some(trace_id) = &self.trace_id {
            record.insert("xray_trace_id".into(), Value::String(trace_id.clone()));
        }
    }
}

/// Extras not owned by the formatter, serialized in supplied order.
struct Extras<'a> {
    entries: &'a [(String, FieldValue)],
    context_bound: bool,
}

impl Extras<'_> {
    fn is_owned(&self, key: &str) -> bool {
        RESERVED_ATTRS.contains(&key)
            || EXCEPTION_ATTRS.contains(&key)
            || (self.context_bound && CONTEXT_ATTRS.contains(&key))
    }
}

impl Serialize for Extras<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in self.entries {
            if !self.is_owned(key) {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

fn extract(
    event: &LogEvent,
    fixed: &FixedFields,
    context_bound: bool,
) -> Result<Map<String, Value>, ExtractionError> {
    // Detach extras from the caller's values before anything downstream sees them.
    let extras = Extras {
        entries: &event.extras,
        context_bound,
    };
    let extras = match serde_json::to_value(extras)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    let message = normalize_message(event)?;

    let mut record = fixed.to_map();
    insert_present(&mut record, "message".into(), message);
    for (key, value) in extras {
        insert_present(&mut record, key, value);
    }
    if let Some(exception) = &event.exception {
        record.insert("exception".into(), Value::String(exception.render()));
        record.insert("exception_name".into(), Value::String(exception.type_name.clone()));
    }
    Ok(record)
}

/// Structured messages are kept, errors become their display string, text
/// with arguments is interpolated, and remaining text is used as parsed JSON
/// when it parses.
fn normalize_message(event: &LogEvent) -> Result<Value, ExtractionError> {
    match &event.message {
        Message::Structured(value) => Ok(serde_json::to_value(value)?),
        Message::Error(err) => Ok(Value::String(err.display.clone())),
        Message::Text(template) if !event.args.is_empty() => {
            Ok(Value::String(interpolate(template, &event.args)?))
        }
        Message::Text(text) => {
            Ok(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone())))
        }
    }
}

fn insert_present(record: &mut Map<String, Value>, key: String, value: Value) {
    if !value.is_null() {
        record.insert(key, value);
    }
}

fn fallback_record(fixed: &FixedFields, context: Option<&ContextFields>) -> Map<String, Value> {
    let mut record = fixed.to_map();
    record.insert("message".into(), Value::String(FALLBACK_MESSAGE.to_string()));
    if let Some(context) = context {
        context.append_to(&mut record);
    }
    record
}

fn fallback_line(fixed: &FixedFields, context: Option<&ContextFields>) -> String {
    serde_json::to_string(&fallback_record(fixed, context))
        .unwrap_or_else(|_| format!("{{\"message\":\"{}\"}}", FALLBACK_MESSAGE))
}

/// Construction-time options for a [`SanitizedJsonFormatter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormatterConfig {
    pub context: Option<RequestContext>,
    pub redact_keys: Vec<String>,
    pub case_insensitive_redaction: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            context: None,
            redact_keys: DEFAULT_REDACT_KEYS.iter().map(|k| k.to_string()).collect(),
            case_insensitive_redaction: true,
        }
    }
}

impl FormatterConfig {
    pub fn build(self) -> Result<SanitizedJsonFormatter, ConfigError> {
        let policy = RedactionPolicy::new(self.redact_keys, self.case_insensitive_redaction)?;
        let formatter = JsonFormatter::sanitized(policy);
        match self.context {
            Some(context) => formatter.with_context(context),
            None => Ok(formatter),
        }
    }
}
