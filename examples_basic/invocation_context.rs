use chrono::Utc;
use tracing::Level;
use uuid::Uuid;

use tracing_jsonlog::context::{InvocationContext, RequestContext};
use tracing_jsonlog::formatter::FormatterConfig;
use tracing_jsonlog::record::LogEvent;
use tracing_jsonlog::value::FieldValue;

struct LambdaContext {
    request_id: String,
}

impl InvocationContext for LambdaContext {
    fn aws_request_id(&self) -> &str {
        &self.request_id
    }

    fn function_name(&self) -> &str {
        "orders-api"
    }

    fn function_version(&self) -> &str {
        "$LATEST"
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let invocation = LambdaContext {
        request_id: Uuid::new_v4().to_string(),
    };

    let formatter = FormatterConfig {
        context: Some(RequestContext::from_invocation(&invocation)?),
        ..FormatterConfig::default()
    }
    .build()?;

    let event = LogEvent::new(Level::INFO, "orders", "order %s accepted for %d items")
        .with_args(["A-1001".into(), FieldValue::from(3)])
        .at("handle_order", 88)
        .with_extra("received_at", Utc::now())
        .with_extra(
            "headers",
            FieldValue::map([("Cookie", "sid=abc"), ("Accept", "application/json")]),
        );

    println!("{}", formatter.format(&event));
    Ok(())
}
