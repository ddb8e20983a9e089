use crate::value::{short_type_name, FieldValue};
use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt;
use std::panic::Location;
use tracing::Level;

/// One log event as handed to the formatter.
///
/// The formatter only ever borrows an event; nothing in it is mutated or
/// retained after a call to [`JsonFormatter::format`](crate::formatter::JsonFormatter::format).
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: Level,
    /// Logger name (the `tracing` target when built by the layer).
    pub name: String,
    pub message: Message,
    /// Positional arguments for a `%`-style message template.
    pub args: Vec<FieldValue>,
    pub func_name: Option<String>,
    pub line: Option<u32>,
    pub created: DateTime<Utc>,
    /// Caller-supplied fields, in the order they were supplied.
    pub extras: Vec<(String, FieldValue)>,
    pub exception: Option<ExceptionInfo>,
}

impl LogEvent {
    pub fn new(level: Level, name: impl Into<String>, message: impl Into<Message>) -> Self {
        Self {
            level,
            name: name.into(),
            message: message.into(),
            args: Vec::new(),
            func_name: None,
            line: None,
            created: Utc::now(),
            extras: Vec::new(),
            exception: None,
        }
    }

    pub fn with_args<I, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extras.push((key.into(), value.into()));
        self
    }

    pub fn at(mut self, func_name: impl Into<String>, line: u32) -> Self {
        self.func_name = Some(func_name.into());
        self.line = Some(line);
        self
    }

    pub fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }
}

/// The raw message of an event, resolved once into one of three shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Plain text, a `%` template, or a pre-serialized JSON document.
    Text(String),
    /// A ready-made map or sequence.
    Structured(FieldValue),
    /// An error logged directly as the message.
    Error(ErrorValue),
}

impl Message {
    pub fn error<E: fmt::Display + ?Sized>(err: &E) -> Self {
        Message::Error(ErrorValue::new(err))
    }
}

impl From<&str> for Message {
    fn from(value: &str) -> Self {
        Message::Text(value.to_string())
    }
}

impl From<String> for Message {
    fn from(value: String) -> Self {
        Message::Text(value)
    }
}

impl From<FieldValue> for Message {
    fn from(value: FieldValue) -> Self {
        Message::Structured(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    pub type_name: String,
    pub display: String,
}

impl ErrorValue {
    pub fn new<E: fmt::Display + ?Sized>(err: &E) -> Self {
        Self {
            type_name: short_type_name::<E>(),
            display: err.to_string(),
        }
    }
}

/// A captured exception: its type, message, the frames leading to it and
/// the messages of any underlying causes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub type_name: String,
    pub message: String,
    pub frames: Vec<Frame>,
    pub causes: Vec<String>,
}

impl ExceptionInfo {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            frames: Vec::new(),
            causes: Vec::new(),
        }
    }

    /// Capture `err` with the caller's location as the innermost frame.
    #[track_caller]
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        let location = Location::caller();
        let mut info = Self::new(short_type_name::<E>(), err.to_string())
            .with_frame(Frame::new(location.file(), location.line(), "<unknown>"));
        info.causes = source_chain(err.source());
        info
    }

    /// Capture a type-erased error. The type name is recovered from the
    /// leading identifier of its `Debug` output.
    pub fn from_dyn_error(err: &(dyn Error + 'static)) -> Self {
        let mut info = Self::new(debug_type_name(err), err.to_string());
        info.causes = source_chain(err.source());
        info
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Render as a multi-line traceback.
    pub fn render(&self) -> String {
        let mut out = String::from("Traceback (most recent call last):");
        for frame in &self.frames {
            out.push_str(&format!(
                "\n  File \"{}\", line {}, in {}",
                frame.file, frame.line, frame.function
            ));
            if let Some(source) = &frame.source {
                out.push_str("\n    ");
                out.push_str(source.trim());
            }
        }
        out.push('\n');
        out.push_str(&self.type_name);
        if !self.message.is_empty() {
            out.push_str(": ");
            out.push_str(&self.message);
        }
        for cause in &self.causes {
            out.push_str("\nCaused by: ");
            out.push_str(cause);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub file: String,
    pub line: u32,
    pub function: String,
    /// Literal text of the source line, when known.
    pub source: Option<String>,
}

impl Frame {
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

fn source_chain(mut next: Option<&(dyn Error + 'static)>) -> Vec<String> {
    let mut causes = Vec::new();
    while let Some(err) = next {
        causes.push(err.to_string());
        next = err.source();
    }
    causes
}

fn debug_type_name(err: &dyn Error) -> String {
    let debug = format!("{:?}", err);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    match name.rsplit("::").next() {
        Some(short) if !short.is_empty() => short.to_string(),
        _ => "Error".to_string(),
    }
}
