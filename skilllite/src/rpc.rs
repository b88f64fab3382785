//! RPC Dispatch: newline-delimited JSON-RPC over stdio.
//!
//! Grounded on `stdio_rpc::serve_stdio` for the transport loop (rayon pool +
//! mpsc + single writer thread, size-limited line reader) and `mcp::mod` for
//! the error-code taxonomy and two-channel result wrapping that
//! `stdio_rpc.rs` itself collapsed into a single `anyhow::Result<Value>` —
//! this module keeps the two-channel shape but unifies both teacher modules
//! into one dispatcher instead of two parallel, partially-redundant ones.

use anyhow::Result;
use serde_json::{json, Value};
use skilllite_agent::ToolRegistry;
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio_util::sync::CancellationToken;

/// 1 MiB initial read buffer, 10 MiB hard cap per line (§4.10).
const INITIAL_BUFFER_BYTES: usize = 1024 * 1024;
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

const CODE_PARSE: i64 = -32700;
const CODE_METHOD_NOT_FOUND: i64 = -32601;
const CODE_AGENT_ALREADY_RUNNING: i64 = -32001;
const CODE_NO_ACTIVE_SESSION: i64 = -32002;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum SessionStatus {
    Idle,
    Running,
    Paused,
}

struct Session {
    model: String,
    status: SessionStatus,
    cancel: CancellationToken,
}

struct AppState {
    registry: Arc<ToolRegistry>,
    sessions: Mutex<HashMap<String, Session>>,
}

/// A JSON-RPC application error: `{code, message}`.
#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
    fn to_json(&self) -> Value {
        json!({"code": self.code, "message": self.message})
    }
}

fn dispatch(state: &AppState, method: &str, params: &Value) -> std::result::Result<Value, RpcError> {
    match method {
        "prompt" => handle_prompt(state, params),
        "abort" => handle_abort(state, params),
        "get_session" => handle_get_session(state, params),
        "set_model" => handle_set_model(state, params),
        "get_status" => handle_get_status(state, params),
        "list_tools" => handle_list_tools(state),
        "list_sessions" => handle_list_sessions(state),
        "pause" => handle_pause(state, params),
        "cancel" => handle_cancel(state, params),
        _ => Err(RpcError::new(CODE_METHOD_NOT_FOUND, format!("method not found: {method}"))),
    }
}

fn session_id_of(params: &Value) -> Option<String> {
    params.get("session_id").and_then(|v| v.as_str()).map(str::to_string)
}

fn require_session_id(params: &Value) -> std::result::Result<String, RpcError> {
    session_id_of(params).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, "session_id is required"))
}

fn session_json(id: &str, session: &Session) -> Value {
    json!({"session_id": id, "model": session.model, "status": session.status})
}

fn handle_prompt(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = session_id_of(params).unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let model = params.get("model").and_then(|v| v.as_str()).unwrap_or("default").to_string();
    let mut sessions = state.sessions.lock().unwrap();
    if let Some(existing) = sessions.get(&id) {
        if existing.status == SessionStatus::Running {
            return Err(RpcError::new(CODE_AGENT_ALREADY_RUNNING, format!("session {id} is already running")));
        }
    }
    sessions.insert(
        id.clone(),
        Session { model, status: SessionStatus::Running, cancel: CancellationToken::new() },
    );
    let session = sessions.get(&id).unwrap();
    Ok(json!({"accepted": true, "session": session_json(&id, session)}))
}

fn handle_abort(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let mut sessions = state.sessions.lock().unwrap();
    let session = sessions.get_mut(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    session.cancel.cancel();
    session.status = SessionStatus::Idle;
    Ok(json!({"aborted": true}))
}

fn handle_get_session(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let sessions = state.sessions.lock().unwrap();
    let session = sessions.get(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    Ok(session_json(&id, session))
}

fn handle_set_model(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let model = params.get("model").and_then(|v| v.as_str()).unwrap_or("default").to_string();
    let mut sessions = state.sessions.lock().unwrap();
    let session = sessions.get_mut(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    session.model = model;
    Ok(session_json(&id, session))
}

fn handle_get_status(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let sessions = state.sessions.lock().unwrap();
    let session = sessions.get(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    Ok(json!({"status": session.status}))
}

fn handle_list_tools(state: &AppState) -> std::result::Result<Value, RpcError> {
    let tools: Vec<Value> = state
        .registry
        .all()
        .map(|d| {
            json!({
                "name": d.name,
                "label": d.label,
                "description": d.description,
                "parameter_schema": d.parameter_schema,
                "read_only": d.read_only,
            })
        })
        .collect();
    Ok(json!({"tools": tools}))
}

fn handle_list_sessions(state: &AppState) -> std::result::Result<Value, RpcError> {
    let sessions = state.sessions.lock().unwrap();
    let out: Vec<Value> = sessions.iter().map(|(id, s)| session_json(id, s)).collect();
    Ok(json!({"sessions": out}))
}

fn handle_pause(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let mut sessions = state.sessions.lock().unwrap();
    let session = sessions.get_mut(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    session.status = SessionStatus::Paused;
    Ok(json!({"paused": true}))
}

fn handle_cancel(state: &AppState, params: &Value) -> std::result::Result<Value, RpcError> {
    let id = require_session_id(params)?;
    let mut sessions = state.sessions.lock().unwrap();
    let session = sessions.get_mut(&id).ok_or_else(|| RpcError::new(CODE_NO_ACTIVE_SESSION, format!("no active session: {id}")))?;
    session.cancel.cancel();
    session.status = SessionStatus::Idle;
    Ok(json!({"cancelled": true}))
}

/// Run the RPC dispatch loop over stdio. One request per line in, one
/// response per line out; responses need not preserve request order.
pub fn serve_stdio(registry: Arc<ToolRegistry>) -> Result<()> {
    let state = Arc::new(AppState { registry, sessions: Mutex::new(HashMap::new()) });

    let (tx, rx) = mpsc::channel::<Value>();
    let writer_handle = thread::spawn(move || -> Result<()> {
        let mut stdout = io::stdout();
        for response in rx {
            writeln!(stdout, "{response}")?;
            stdout.flush()?;
        }
        Ok(())
    });

    let stdin = io::stdin();
    let mut reader = BufReader::with_capacity(INITIAL_BUFFER_BYTES, stdin.lock());
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let mut pending = 0usize;

    loop {
        let line = match read_line_limited(&mut reader) {
            Ok(None) => break,
            Ok(Some(l)) => l,
            Err(e) => {
                let _ = tx.send(json!({"id": Value::Null, "error": {"code": CODE_PARSE, "message": e.to_string()}}));
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                let _ = tx.send(json!({"id": Value::Null, "error": {"code": CODE_PARSE, "message": format!("parse error: {e}")}}));
                continue;
            }
        };

        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("").to_string();
        let params = request.get("params").cloned().unwrap_or_else(|| json!({}));

        pending += 1;
        let tx = tx.clone();
        let done_tx = done_tx.clone();
        let state = state.clone();
        rayon::spawn(move || {
            let response = match dispatch(&state, &method, &params) {
                Ok(result) => json!({"id": id, "result": result}),
                Err(e) => json!({"id": id, "error": e.to_json()}),
            };
            let _ = tx.send(response);
            let _ = done_tx.send(());
        });
    }

    for _ in 0..pending {
        let _ = done_rx.recv();
    }
    drop(tx);
    writer_handle.join().map_err(|_| anyhow::anyhow!("writer thread panicked"))??;

    Ok(())
}

fn read_line_limited(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(b) => b,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return if buf.is_empty() {
                Ok(None)
            } else {
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                String::from_utf8(buf).map(Some).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-8"))
            };
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if buf.len() + pos > MAX_LINE_BYTES {
                    reader.consume(pos + 1);
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "request exceeds 10 MiB line limit"));
                }
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                if buf.last() == Some(&b'\r') {
                    buf.pop();
                }
                return String::from_utf8(buf).map(Some).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-8"));
            }
            None => {
                let len = available.len();
                if buf.len() + len > MAX_LINE_BYTES {
                    reader.consume(len);
                    skip_until_newline(reader);
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "request exceeds 10 MiB line limit"));
                }
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

fn skip_until_newline(reader: &mut impl BufRead) {
    loop {
        match reader.fill_buf() {
            Ok([]) => break,
            Ok(b) => {
                if let Some(pos) = b.iter().position(|&c| c == b'\n') {
                    reader.consume(pos + 1);
                    break;
                }
                let len = b.len();
                reader.consume(len);
            }
            Err(_) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skilllite_core::Sandbox;

    fn test_state() -> AppState {
        AppState {
            registry: Arc::new(ToolRegistry::new(Some(Arc::new(Sandbox::unrestricted())))),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let state = test_state();
        let err = dispatch(&state, "nope", &json!({})).unwrap_err();
        assert_eq!(err.code, CODE_METHOD_NOT_FOUND);
    }

    #[test]
    fn get_session_without_prompt_is_no_active_session() {
        let state = test_state();
        let err = dispatch(&state, "get_session", &json!({"session_id": "x"})).unwrap_err();
        assert_eq!(err.code, CODE_NO_ACTIVE_SESSION);
    }

    #[test]
    fn second_prompt_while_running_is_agent_already_running() {
        let state = test_state();
        let first = dispatch(&state, "prompt", &json!({"session_id": "a"})).unwrap();
        let id = first["session"]["session_id"].as_str().unwrap().to_string();
        let err = dispatch(&state, "prompt", &json!({"session_id": id})).unwrap_err();
        assert_eq!(err.code, CODE_AGENT_ALREADY_RUNNING);
    }

    #[test]
    fn cancel_then_prompt_succeeds_again() {
        let state = test_state();
        let first = dispatch(&state, "prompt", &json!({"session_id": "a"})).unwrap();
        let id = first["session"]["session_id"].as_str().unwrap().to_string();
        dispatch(&state, "cancel", &json!({"session_id": id})).unwrap();
        let second = dispatch(&state, "prompt", &json!({"session_id": id}));
        assert!(second.is_ok());
    }

    #[test]
    fn list_tools_reports_registered_descriptors() {
        let state = test_state();
        let result = dispatch(&state, "list_tools", &json!({})).unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert!(tools.iter().any(|t| t["name"] == "bash"));
    }
}
