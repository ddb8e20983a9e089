pub mod value;
pub mod record;
pub mod interpolate;
pub mod context;
pub mod trace;
pub mod redact;
pub mod formatter;
pub mod layer;

pub mod env;
pub mod error;
pub mod init;

pub use context::{InvocationContext, RequestContext};
pub use error::{ConfigError, InitError};
pub use formatter::{FormatterConfig, JsonFormatter, OutputFilter, SanitizedJsonFormatter};
pub use layer::JsonLogLayer;
pub use record::{ExceptionInfo, Frame, LogEvent, Message};
pub use redact::{redact, RedactionPolicy, Redactor};
pub use value::FieldValue;
