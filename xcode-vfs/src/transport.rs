use std::io::{self, Write};

use serde::Serialize;

use crate::protocol::{JsonRpcErrorBody, JsonRpcResponse};

/// NDJSON writer for JSON-RPC 2.0 frames: one JSON object per line.
///
/// Writes to stdout unless built with another sink. Logging must never go
/// to the same sink.
pub struct NdjsonTransport {
    out: Box<dyn Write + Send>,
}

impl Default for NdjsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl NdjsonTransport {
    pub fn new() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self { out }
    }

    pub fn write_response(&mut self, id: u64, result: serde_json::Value) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        });
    }

    pub fn write_error(
        &mut self,
        id: u64,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorBody {
                code,
                message: message.into(),
                data,
            }),
        });
    }

    fn write_line(&mut self, value: &impl Serialize) {
        if let Err(e) = serde_json::to_writer(&mut self.out, value) {
            tracing::error!("Failed to serialize response: {}", e);
            return;
        }
        if let Err(e) = writeln!(self.out) {
            tracing::error!("Failed to write newline: {}", e);
        }
        if let Err(e) = self.out.flush() {
            tracing::error!("Failed to flush output: {}", e);
        }
    }
}
