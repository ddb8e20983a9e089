#![allow(dead_code)]

use serde_json::{Map, Value};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// In-memory writer collecting every formatted line.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn text(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn records(&self) -> Vec<Map<String, Value>> {
        self.text().lines().map(parse).collect()
    }
}

pub fn parse(line: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(line).unwrap() {
        Value::Object(map) => map,
        other => panic!("not a JSON object: {}", other),
    }
}

pub fn keys(record: &Map<String, Value>) -> Vec<&str> {
    record.keys().map(String::as_str).collect()
}
