mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{keys, parse};
use serde_json::json;
use tracing::Level;
use tracing_jsonlog::formatter::FALLBACK_MESSAGE;
use tracing_jsonlog::redact::DEFAULT_REDACT_KEYS;
use tracing_jsonlog::trace;
use tracing_jsonlog::{
    ExceptionInfo, FieldValue, Frame, JsonFormatter, LogEvent, Message, RedactionPolicy, RequestContext,
};
use uuid::Uuid;

fn warning(message: impl Into<Message>) -> LogEvent {
    LogEvent::new(Level::WARN, "root", message).at("test_fn", 10)
}

#[test]
fn plain_string_message_is_kept() {
    let record = parse(&JsonFormatter::new().format(&warning("this is a warning")));
    assert_eq!(record["level"], "WARN");
    assert_eq!(record["message"], "this is a warning");
}

#[test]
fn printf_template_is_interpolated() {
    let event = warning("foo %s, %d%%").with_args(["bar".into(), FieldValue::from(50)]);
    let record = parse(&JsonFormatter::new().format(&event));
    assert_eq!(record["message"], "foo bar, 50%");
}

#[test]
fn json_string_message_is_parsed() {
    let record = parse(&JsonFormatter::new().format(&warning(r#"{"a":1}"#)));
    assert_eq!(record["message"], json!({"a": 1}));
}

#[test]
fn error_message_uses_display_string() {
    let err = std::io::Error::new(std::io::ErrorKind::Other, "oh no");
    let record = parse(&JsonFormatter::new().format(&warning(Message::error(&err))));
    assert_eq!(record["level"], "WARN");
    assert_eq!(record["message"], "oh no");
}

#[test]
fn key_order_with_extras() {
    let event = warning("this is a warning")
        .with_extra("first_key", "first_value")
        .with_extra("second_key", "second_value");
    let line = JsonFormatter::new().format(&event);
    let record = parse(&line);
    assert_eq!(
        keys(&record),
        ["level", "timestamp", "name", "location", "message", "first_key", "second_key"]
    );
    assert!(!line.contains('\n'));
}

#[test]
fn unserializable_message_and_extras_fall_back() {
    struct Unserializable;
    let event = warning(FieldValue::map([("unserializable_thing_1", FieldValue::opaque::<Unserializable>())]))
        .with_extra("unserializable_thing_2", FieldValue::opaque::<Unserializable>());

    let record = parse(&JsonFormatter::new().format(&event));
    assert_eq!(keys(&record), ["level", "timestamp", "name", "location", "message"]);
    assert_eq!(record["message"], FALLBACK_MESSAGE);
}

#[test]
fn unserializable_extras_fall_back_with_context() {
    struct Unserializable;
    let formatter = JsonFormatter::new()
        .with_context(RequestContext::new("req", "fn", "1").unwrap())
        .unwrap()
        .with_trace_id_provider(trace::fixed("Root=1-trace;Parent=2"));
    let event = warning("m").with_extra("bad", FieldValue::list([FieldValue::opaque::<Unserializable>()]));

    let record = parse(&formatter.format(&event));
    assert_eq!(
        keys(&record),
        ["level", "timestamp", "name", "location", "message", "context", "xray_trace_id"]
    );
    assert_eq!(record["message"], FALLBACK_MESSAGE);
    assert_eq!(record["xray_trace_id"], "1-trace");
}

#[test]
fn exceptions_render_traceback_and_name() {
    let exception = ExceptionInfo::new("CustomError", "some exception").with_frame(
        Frame::new("src/jobs.rs", 31, "run_job").with_source(r#"return Err(CustomError::new("some exception"));"#),
    );
    let event = LogEvent::new(Level::ERROR, "root", "fatal error").with_exception(exception);

    let record = parse(&JsonFormatter::new().format(&event));
    assert_eq!(record["level"], "ERROR");
    assert_eq!(record["message"], "fatal error");
    assert_eq!(record["exception_name"], "CustomError");
    let text = record["exception"].as_str().unwrap();
    assert!(text.starts_with("Traceback"));
    assert!(text.contains(r#"return Err(CustomError::new("some exception"));"#));
}

#[test]
fn events_without_exception_have_no_exception_keys() {
    let record = parse(&JsonFormatter::new().format(&warning("m")));
    assert!(!record.contains_key("exception"));
    assert!(!record.contains_key("exception_name"));
}

#[test]
fn default_keys_are_redacted_in_any_case_and_depth() {
    let keys = [
        "password",
        "Authorization",
        "authorization",
        "Cookie",
        "cookie",
        "Set-Cookie",
        "set-cookie",
        "access_token",
        "refresh_token",
        "token",
        "X-Api-Key",
    ];
    let formatter = JsonFormatter::sanitized(RedactionPolicy::default());

    for key in keys {
        let event = LogEvent::new(Level::DEBUG, "root", "this is some debug")
            .with_extra(key, "some value")
            .with_extra("nested", FieldValue::map([(key, "some value")]))
            .with_extra("listed", FieldValue::list([FieldValue::map([(key, "some value")])]))
            .with_extra("other_key", "other value")
            .with_extra("other_nested", FieldValue::map([("other_key", "other value")]));

        let record = parse(&formatter.format(&event));
        assert_eq!(record[key], "REDACTED", "key {}", key);
        assert_eq!(record["nested"], json!({ key: "REDACTED" }));
        assert_eq!(record["listed"], json!([{ key: "REDACTED" }]));
        assert_eq!(record["other_key"], "other value");
        assert_eq!(record["other_nested"], json!({"other_key": "other value"}));
    }
}

#[test]
fn redaction_does_not_touch_caller_data() {
    let nested = FieldValue::map([
        ("password", FieldValue::from("some value")),
        ("double_nested", FieldValue::map([("password", "some value")])),
    ]);
    let event = LogEvent::new(Level::DEBUG, "root", "log")
        .with_extra("password", "some value")
        .with_extra("nested", nested.clone());

    let record = parse(&JsonFormatter::sanitized(RedactionPolicy::default()).format(&event));

    assert_eq!(record["nested"]["password"], "REDACTED");
    assert_eq!(record["nested"]["double_nested"]["password"], "REDACTED");
    assert_eq!(event.extras[1].1, nested);
}

#[test]
fn structured_messages_are_redacted_too() {
    let message = FieldValue::map([("action", "login"), ("password", "hunter2")]);
    let record = parse(&JsonFormatter::sanitized(RedactionPolicy::default()).format(&warning(message)));
    assert_eq!(record["message"], json!({"action": "login", "password": "REDACTED"}));
}

#[test]
fn custom_case_sensitive_policy() {
    let policy = RedactionPolicy::new(["ssn"], false).unwrap();
    let event = warning("m").with_extra("ssn", "123").with_extra("SSN", "456").with_extra("password", "p");
    let record = parse(&JsonFormatter::sanitized(policy).format(&event));
    assert_eq!(record["ssn"], "REDACTED");
    assert_eq!(record["SSN"], "456");
    assert_eq!(record["password"], "p");
    assert_eq!(DEFAULT_REDACT_KEYS.len(), 8);
}

#[test]
fn uuids_in_extras_are_stringified() {
    let id = Uuid::new_v4();
    let event = warning("m")
        .with_extra("uuid", id)
        .with_extra("nested", FieldValue::map([("key", id)]));
    let record = parse(&JsonFormatter::new().format(&event));
    assert_eq!(record["uuid"], id.to_string());
    assert_eq!(record["nested"], json!({"key": id.to_string()}));
}

#[test]
fn datetimes_in_extras_are_stringified() {
    let aware = Utc.with_ymd_and_hms(2024, 5, 1, 8, 30, 0).unwrap();
    let naive = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_micro_opt(8, 30, 0, 250))
        .unwrap();
    let event = warning("m")
        .with_extra("time", aware)
        .with_extra("nested", FieldValue::map([("key", naive)]));
    let record = parse(&JsonFormatter::new().format(&event));
    assert_eq!(record["time"], aware.to_string());
    assert_eq!(record["nested"], json!({"key": naive.to_string()}));
}

#[test]
fn context_is_attached_to_every_record() {
    let formatter = JsonFormatter::sanitized(RedactionPolicy::default())
        .with_context(RequestContext::new("some_req_id", "some_func_name", "some_func_version").unwrap())
        .unwrap()
        .with_trace_id_provider(trace::none());

    for message in ["first", "second"] {
        let record = parse(&formatter.format(&warning(message)));
        assert_eq!(
            record["context"],
            json!({
                "request_id": "some_req_id",
                "function_name": "some_func_name",
                "function_version": "some_func_version",
            })
        );
        assert!(!record.contains_key("xray_trace_id"));
    }
}

#[test]
fn timestamp_has_millisecond_precision() {
    let created = Utc.timestamp_millis_opt(1_714_552_200_007).unwrap();
    let record = parse(&JsonFormatter::new().format(&warning("m").created_at(created)));
    assert_eq!(record["timestamp"], "2024-05-01 08:30:00.007Z");
}

#[test]
fn final_encoding_of_extracted_records_succeeds() {
    // Everything reaching the final encode has already been converted to JSON.
    let formatter = JsonFormatter::sanitized(RedactionPolicy::default());
    let event = warning("m")
        .with_extra("when", Utc::now())
        .with_extra("id", Uuid::new_v4())
        .with_extra("raw", json!({"token": "t"}));
    let line = formatter.try_format(&event).unwrap();
    assert_eq!(parse(&line)["raw"], json!({"token": "REDACTED"}));
}

#[test]
fn formatter_is_shareable_across_threads() {
    let formatter = std::sync::Arc::new(JsonFormatter::sanitized(RedactionPolicy::default()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let formatter = std::sync::Arc::clone(&formatter);
            std::thread::spawn(move || formatter.format(&warning("worker %d").with_args([i])))
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let record = parse(&handle.join().unwrap());
        assert_eq!(record["message"], format!("worker {}", i));
    }
}
