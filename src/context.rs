use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution context a formatter is bound to, attached to every record it
/// formats as the `context` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    request_id: String,
    #[serde(default)]
    function_name: String,
    #[serde(default)]
    function_version: String,
}

impl RequestContext {
    /// Build a context. The request id must be non-blank; the function name
    /// and version may be empty (e.g. for test runs).
    pub fn new(
        request_id: impl Into<String>,
        function_name: impl Into<String>,
        function_version: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let context = Self {
            request_id: request_id.into(),
            function_name: function_name.into(),
            function_version: function_version.into(),
        };
        context.validate()?;
        Ok(context)
    }

    /// Adapt the invocation context handed to a serverless handler.
    pub fn from_invocation<C: InvocationContext + ?Sized>(ctx: &C) -> Result<Self, ConfigError> {
        Self::new(ctx.aws_request_id(), ctx.function_name(), ctx.function_version())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_id.trim().is_empty() {
            return Err(ConfigError::MissingRequestId);
        }
        Ok(())
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    pub fn function_version(&self) -> &str {
        &self.function_version
    }

    /// The `context` object as written into each record.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("request_id".into(), Value::String(self.request_id.clone()));
        map.insert("function_name".into(), Value::String(self.function_name.clone()));
        map.insert("function_version".into(), Value::String(self.function_version.clone()));
        Value::Object(map)
    }
}

/// Per-invocation metadata exposed by a serverless runtime.
pub trait InvocationContext {
    fn aws_request_id(&self) -> &str;
    fn function_name(&self) -> &str;
    fn function_version(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockContext;

    impl InvocationContext for MockContext {
        fn aws_request_id(&self) -> &str {
            "some_req_id"
        }
        fn function_name(&self) -> &str {
            "some_func_name"
        }
        fn function_version(&self) -> &str {
            "some_func_version"
        }
    }

    #[test]
    fn blank_request_id_is_rejected() {
        assert_eq!(RequestContext::new("", "f", "1"), Err(ConfigError::MissingRequestId));
        assert_eq!(RequestContext::new("  ", "f", "1"), Err(ConfigError::MissingRequestId));
    }

    #[test]
    fn function_fields_may_be_empty() {
        let ctx = RequestContext::new("local-run", "", "").unwrap();
        assert_eq!(ctx.to_json(), json!({"request_id": "local-run", "function_name": "", "function_version": ""}));
    }

    #[test]
    fn adapts_invocation_context_in_field_order() {
        let ctx = RequestContext::from_invocation(&MockContext).unwrap();
        let encoded = serde_json::to_string(&ctx.to_json()).unwrap();
        assert_eq!(
            encoded,
            r#"{"request_id":"some_req_id","function_name":"some_func_name","function_version":"some_func_version"}"#
        );
    }
}
