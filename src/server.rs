//! JSON-RPC 2.0 tool server over newline-delimited stdio frames.
//!
//! Supports `initialize`, `tools/list`, `tools/call` and `ping`. Requests without an
//! `id` are notifications and get no response.

use crate::error::Result;
use crate::tools::{ToolContext, schema};
use serde_json::{Map, Value, json};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

const JSONRPC_VERSION: &str = "2.0";
const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "threadvault";
const CONTENT_TYPE_TEXT: &str = "text";

const ERROR_PARSE: i64 = -32700;
const ERROR_INVALID_REQUEST: i64 = -32600;
const ERROR_METHOD_NOT_FOUND: i64 = -32601;
const ERROR_INVALID_PARAMS: i64 = -32602;
const ERROR_INTERNAL: i64 = -32603;

/// Counters reported when the input stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeReport {
    /// Non-blank lines read.
    pub processed_frames: usize,

    /// Error responses written.
    pub error_count: usize,
}

#[derive(Debug)]
struct Request {
    id: Option<Value>,
    method: String,
    params: Map<String, Value>,
}

#[derive(Debug)]
struct DispatchError {
    id: Value,
    code: i64,
    message: String,
}

type Dispatched<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    fn new(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            code,
            message: message.into(),
        }
    }
}

/// Serve requests from `reader` until end of input.
///
/// # Errors
///
/// Returns an error only if reading input or writing a response fails.
pub fn serve<R, W>(mut reader: R, writer: &mut W, context: &ToolContext) -> Result<ServeReport>
where
    R: BufRead,
    W: Write,
{
    let mut report = ServeReport::default();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.trim_ascii().is_empty() {
            continue;
        }
        report.processed_frames += 1;

        let response = match serde_json::from_slice::<Value>(&line) {
            Ok(frame) => handle_frame(&frame, context),
            Err(e) => Some(Err(DispatchError::new(
                Value::Null,
                ERROR_PARSE,
                format!("failed to parse frame: {e}"),
            ))),
        };

        let frame = match response {
            None => continue,
            Some(Ok((id, result))) => result_frame(id, result),
            Some(Err(error)) => {
                report.error_count += 1;
                debug!(code = error.code, message = %error.message, "request failed");
                error_frame(error.id, error.code, error.message)
            }
        };
        write_frame(writer, &frame)?;
    }

    debug!(
        processed = report.processed_frames,
        errors = report.error_count,
        "input closed"
    );
    Ok(report)
}

/// Returns `None` for notifications.
fn handle_frame(frame: &Value, context: &ToolContext) -> Option<Dispatched<(Value, Value)>> {
    let request = match parse_request(frame) {
        Ok(request) => request,
        Err(error) => return Some(Err(error)),
    };

    let Some(id) = request.id.clone() else {
        debug!(method = %request.method, "notification");
        return None;
    };

    Some(dispatch(&request, id.clone(), context).map(|result| (id, result)))
}

fn parse_request(value: &Value) -> Dispatched<Request> {
    let Some(object) = value.as_object() else {
        return Err(DispatchError::new(
            Value::Null,
            ERROR_INVALID_REQUEST,
            "request must be an object",
        ));
    };
    let id = object.get("id").cloned();
    let error_id = id.clone().unwrap_or(Value::Null);

    if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(DispatchError::new(
            error_id,
            ERROR_INVALID_REQUEST,
            format!("jsonrpc must be '{JSONRPC_VERSION}'"),
        ));
    }

    let method = object
        .get("method")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| {
            DispatchError::new(
                error_id.clone(),
                ERROR_INVALID_REQUEST,
                "request must include a non-empty method",
            )
        })?;

    let params = match object.get("params") {
        Some(Value::Object(params)) => params.clone(),
        None | Some(Value::Null) => Map::new(),
        Some(_) => {
            return Err(DispatchError::new(
                error_id,
                ERROR_INVALID_PARAMS,
                "params must be an object",
            ));
        }
    };

    Ok(Request {
        id,
        method: method.to_string(),
        params,
    })
}

fn dispatch(request: &Request, id: Value, context: &ToolContext) -> Dispatched<Value> {
    match request.method.as_str() {
        "initialize" => Ok(handle_initialize()),
        "tools/list" => Ok(handle_tools_list()),
        "tools/call" => handle_tools_call(&request.params, id, context),
        "ping" => Ok(json!({})),
        other => Err(DispatchError::new(
            id,
            ERROR_METHOD_NOT_FOUND,
            format!("unsupported method '{other}'"),
        )),
    }
}

fn handle_initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
        "capabilities": {
            "tools": {"listChanged": false},
        },
    })
}

fn handle_tools_list() -> Value {
    let tools: Vec<Value> = schema::all_tools()
        .iter()
        .map(schema::ToolDescriptor::to_json)
        .collect();
    json!({"tools": tools})
}

fn handle_tools_call(
    params: &Map<String, Value>,
    id: Value,
    context: &ToolContext,
) -> Dispatched<Value> {
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            DispatchError::new(
                id.clone(),
                ERROR_INVALID_PARAMS,
                "tools/call requires a non-empty 'name'",
            )
        })?;
    if !ToolContext::has_tool(name) {
        return Err(DispatchError::new(
            id,
            ERROR_INVALID_PARAMS,
            format!("unknown tool '{name}'"),
        ));
    }

    let arguments = match params.get("arguments") {
        Some(Value::Object(arguments)) => Value::Object(arguments.clone()),
        None | Some(Value::Null) => Value::Object(Map::new()),
        Some(_) => {
            return Err(DispatchError::new(
                id,
                ERROR_INVALID_PARAMS,
                "tools/call 'arguments' must be an object",
            ));
        }
    };

    match context.call(name, arguments) {
        Ok(content) => {
            let is_error = content.get("success").and_then(Value::as_bool) == Some(false);
            Ok(tool_call_result(content, is_error))
        }
        Err(e) => {
            warn!(tool = name, error = %e, "tool call failed");
            Err(DispatchError::new(id, ERROR_INTERNAL, e.to_string()))
        }
    }
}

fn tool_call_result(content: Value, is_error: bool) -> Value {
    let text = serde_json::to_string_pretty(&content)
        .unwrap_or_else(|_| "{\"success\":false,\"error\":\"unserializable result\"}".to_string());
    json!({
        "content": [{"type": CONTENT_TYPE_TEXT, "text": text}],
        "isError": is_error,
        "structuredContent": content,
    })
}

fn result_frame(id: Value, result: Value) -> Value {
    json!({"jsonrpc": JSONRPC_VERSION, "id": id, "result": result})
}

fn error_frame(id: Value, code: i64, message: String) -> Value {
    json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": {"code": code, "message": message},
    })
}

fn write_frame<W: Write>(writer: &mut W, frame: &Value) -> Result<()> {
    serde_json::to_writer(&mut *writer, frame)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn run(input: &str) -> (Vec<Value>, ServeReport) {
        let context = ToolContext::new(Box::new(MemoryStore::new()));
        let mut output = Vec::new();
        let report = serve(input.as_bytes(), &mut output, &context).unwrap();
        let frames = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (frames, report)
    }

    fn request(id: u64, method: &str, params: Value) -> String {
        format!(
            "{}\n",
            json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
        )
    }

    #[test]
    fn initialize_reports_protocol_and_name() {
        let (frames, report) = run(&request(1, "initialize", json!({})));
        assert_eq!(report.processed_frames, 1);
        assert_eq!(frames[0]["id"], 1);
        assert_eq!(frames[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(frames[0]["result"]["serverInfo"]["name"], "threadvault");
    }

    #[test]
    fn notifications_get_no_response() {
        let input = format!(
            "{}\n\n{}",
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            request(2, "tools/list", json!({}))
        );
        let (frames, report) = run(&input);
        assert_eq!(report.processed_frames, 2);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0]["id"], 2);
        assert_eq!(frames[0]["result"]["tools"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn malformed_line_is_parse_error_and_serving_continues() {
        let input = format!("{{not json\n{}", request(3, "ping", json!({})));
        let (frames, report) = run(&input);
        assert_eq!(frames[0]["error"]["code"], ERROR_PARSE);
        assert_eq!(frames[0]["id"], Value::Null);
        assert_eq!(frames[1]["id"], 3);
        assert_eq!(report.error_count, 1);
    }

    #[test]
    fn invalid_utf8_is_parse_error_and_serving_continues() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}\n".to_vec();
        input.extend_from_slice(request(2, "ping", json!({})).as_bytes());

        let context = ToolContext::new(Box::new(MemoryStore::new()));
        let mut output = Vec::new();
        let report = serve(input.as_slice(), &mut output, &context).unwrap();
        let frames: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0]["error"]["code"], ERROR_PARSE);
        assert_eq!(frames[1]["id"], 2);
        assert_eq!(frames[1]["result"], json!({}));
        assert_eq!(report.processed_frames, 2);
        assert_eq!(report.error_count, 1);
    }

    #[test]
    fn protocol_errors() {
        let input = [
            format!("{}\n", json!({"jsonrpc": "1.0", "id": 1, "method": "ping"})),
            request(2, "resources/list", json!({})),
            request(3, "tools/call", json!({"name": "no_such_tool"})),
            format!("{}\n", json!({"jsonrpc": "2.0", "id": 4, "method": "tools/call", "params": [1]})),
        ]
        .concat();
        let (frames, report) = run(&input);
        let codes: Vec<_> = frames.iter().map(|f| f["error"]["code"].clone()).collect();
        assert_eq!(
            codes,
            vec![
                json!(ERROR_INVALID_REQUEST),
                json!(ERROR_METHOD_NOT_FOUND),
                json!(ERROR_INVALID_PARAMS),
                json!(ERROR_INVALID_PARAMS)
            ]
        );
        assert_eq!(report.error_count, 4);
    }

    #[test]
    fn tool_call_round_trip() {
        let input = [
            request(
                1,
                "tools/call",
                json!({
                    "name": "save_conversation",
                    "arguments": {
                        "id": "t-1",
                        "title": "Over the wire",
                        "messages": [{"role": "user", "content": "hello"}]
                    }
                }),
            ),
            request(
                2,
                "tools/call",
                json!({"name": "get_conversation", "arguments": {"id": "t-1"}}),
            ),
            request(
                3,
                "tools/call",
                json!({"name": "get_conversation", "arguments": {}}),
            ),
        ]
        .concat();
        let (frames, _) = run(&input);

        let saved = &frames[0]["result"];
        assert_eq!(saved["isError"], false);
        assert_eq!(saved["structuredContent"]["conversation"]["id"], "t-1");

        let got = &frames[1]["result"]["structuredContent"];
        assert_eq!(got["conversation"]["messages"][0]["content"], "hello");
        let text = frames[1]["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Over the wire"));

        let invalid = &frames[2]["result"];
        assert_eq!(invalid["isError"], true);
        assert_eq!(
            invalid["structuredContent"]["error"],
            "Either id or title must be provided"
        );
    }
}
