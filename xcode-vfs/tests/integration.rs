// ---------------------------------------------------------------------------
// Integration tests for xcode-vfs
//
// Each test spawns the binary with an in-memory store, talks JSON-RPC 2.0 over
// NDJSON stdio, and checks the responses.
// ---------------------------------------------------------------------------

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

struct VfsProcess {
    child: Child,
    reader: BufReader<std::process::ChildStdout>,
    next_id: AtomicU64,
}

impl VfsProcess {
    fn spawn() -> Self {
        Self::spawn_with(&[])
    }

    fn spawn_with(extra: &[&str]) -> Self {
        let bin = env!("CARGO_BIN_EXE_xcode-vfs");
        let mut child = Command::new(bin)
            .arg("--in-memory")
            .args(["--python", "xcode-no-such-python"])
            .args(extra)
            .env_remove("RUST_LOG")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn xcode-vfs");

        let stdout = child.stdout.take().expect("no stdout");
        Self {
            child,
            reader: BufReader::new(stdout),
            next_id: AtomicU64::new(1),
        }
    }

    fn write_raw(&mut self, line: &str) {
        let stdin = self.child.stdin.as_mut().expect("no stdin");
        stdin.write_all(line.as_bytes()).unwrap();
        stdin.write_all(b"\n").unwrap();
        stdin.flush().unwrap();
    }

    fn read_frame(&mut self) -> Value {
        let mut buf = String::new();
        let n = self.reader.read_line(&mut buf).expect("failed to read stdout");
        assert!(n > 0, "unexpected EOF from xcode-vfs");
        serde_json::from_str(buf.trim())
            .unwrap_or_else(|e| panic!("invalid JSON from server: {e}\nline: {buf}"))
    }

    fn send(&mut self, method: &str, params: Value) -> RpcResponse {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        self.write_raw(&request.to_string());

        let frame = self.read_frame();
        assert_eq!(frame["jsonrpc"], "2.0");
        assert_eq!(frame["id"].as_u64(), Some(id), "response id mismatch");
        if let Some(error) = frame.get("error") {
            return RpcResponse::Error(error.clone());
        }
        RpcResponse::Ok(frame.get("result").cloned().unwrap_or(Value::Null))
    }

    fn call(&mut self, method: &str, params: Value) -> Value {
        match self.send(method, params) {
            RpcResponse::Ok(v) => v,
            RpcResponse::Error(e) => panic!("expected success, got error: {e}"),
        }
    }

    fn call_err(&mut self, method: &str, params: Value) -> Value {
        match self.send(method, params) {
            RpcResponse::Error(e) => e,
            RpcResponse::Ok(v) => panic!("expected error, got success: {v}"),
        }
    }

    fn shell(&mut self, line: &str) -> Value {
        self.call("shell/execute", json!({ "line": line }))
    }
}

impl Drop for VfsProcess {
    fn drop(&mut self) {
        drop(self.child.stdin.take());
        let _ = self.child.wait();
    }
}

#[derive(Debug)]
enum RpcResponse {
    Ok(Value),
    Error(Value),
}

fn lines(v: &Value) -> Vec<String> {
    v["lines"]
        .as_array()
        .expect("lines array")
        .iter()
        .map(|l| l.as_str().unwrap_or_default().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[test]
fn fresh_workspace_is_seeded() {
    let mut proc = VfsProcess::spawn();
    let init = proc.call("initialize", json!({}));
    assert_eq!(init["rootName"], "workspace");
    assert_eq!(init["prompt"], "xcode:~/workspace$");

    let tree = proc.call("tree/get", json!({}));
    assert_eq!(tree["type"], "folder");
    assert_eq!(tree["id"], init["rootId"]);
    let children = tree["children"].as_array().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0]["name"], "welcome.txt");
    assert_eq!(children[0]["type"], "file");
}

#[test]
fn custom_root_name() {
    let mut proc = VfsProcess::spawn_with(&["--root-name", "proj"]);
    let tree = proc.call("tree/get", json!({}));
    assert_eq!(tree["name"], "proj");
}

#[test]
fn root_delete_is_rejected() {
    let mut proc = VfsProcess::spawn();
    let init = proc.call("initialize", json!({}));
    let err = proc.call_err("node/delete", json!({ "id": init["rootId"] }));
    assert_eq!(err["code"], -32000);
    assert_eq!(err["message"], "Cannot delete root.");
    assert_eq!(err["data"]["vfsCode"], "VFS_ROOT_DELETION");

    let tree = proc.call("tree/get", json!({}));
    assert_eq!(tree["children"].as_array().unwrap().len(), 1);
}

#[test]
fn move_folder_into_itself_is_rejected() {
    let mut proc = VfsProcess::spawn();
    let a = proc.call("node/create", json!({ "kind": "folder", "name": "a" }))["id"].clone();
    proc.call("node/select", json!({ "id": a }));
    let b = proc.call("node/create", json!({ "kind": "folder", "name": "b" }))["id"].clone();

    let err = proc.call_err("node/move", json!({ "draggedId": a, "targetId": b }));
    assert_eq!(err["data"]["vfsCode"], "VFS_INVALID_MOVE");

    let root = init_root(&mut proc);
    let moved = proc.call("node/move", json!({ "draggedId": b, "targetId": root }));
    assert_eq!(moved["moved"], true);
}

fn init_root(proc: &mut VfsProcess) -> Value {
    proc.call("initialize", json!({}))["rootId"].clone()
}

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[test]
fn edit_and_replace_all() {
    let mut proc = VfsProcess::spawn();
    let id = proc.call("node/create", json!({ "kind": "file", "name": "x.txt" }))["id"].clone();
    proc.call("editor/open", json!({ "id": id }));
    proc.call("editor/set", json!({ "content": "aXbXc" }));

    let r = proc.call("editor/replaceAll", json!({ "query": "x", "replacement": "-" }));
    assert_eq!(r["count"], 2);
    assert_eq!(r["status"], "2 occurrence(s) replaced.");

    let found = proc.call("tree/find", json!({ "id": id }));
    assert_eq!(found["node"]["content"], "a-b-c");
}

#[test]
fn folder_download_is_rejected() {
    let mut proc = VfsProcess::spawn();
    let root = init_root(&mut proc);
    let err = proc.call_err("node/download", json!({ "id": root }));
    assert_eq!(err["message"], "Folder download is not supported.");
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

#[test]
fn shell_session() {
    let mut proc = VfsProcess::spawn();
    assert!(lines(&proc.shell("mkdir src")).is_empty());
    let out = proc.shell("cd src");
    assert_eq!(out["prompt"], "xcode:~/workspace/src$");
    proc.shell("touch main.py");
    assert_eq!(lines(&proc.shell("ls")), vec!["main.py"]);
    assert_eq!(lines(&proc.shell("pwd")), vec!["/workspace/src"]);
    proc.shell("cd ..");
    assert_eq!(lines(&proc.shell("ls")), vec!["welcome.txt  src"]);
    assert_eq!(lines(&proc.shell("frobnicate")), vec!["frobnicate: command not found"]);
}

#[test]
fn shell_python_without_interpreter() {
    let mut proc = VfsProcess::spawn();
    proc.call(
        "files/upload",
        json!({ "files": [{ "name": "hi.py", "content": "print('hi')" }] }),
    );
    let out = lines(&proc.shell("python hi.py"));
    assert_eq!(out.first().map(String::as_str), Some("Installing Python runtime... 0%"));
    assert!(out
        .last()
        .is_some_and(|l| l.starts_with("Failed to initialize runtime: xcode-no-such-python")));
}

#[test]
fn exit_returns_to_explorer() {
    let mut proc = VfsProcess::spawn();
    proc.call("panel/switch", json!({ "panel": "terminal" }));
    let out = proc.shell("exit");
    assert_eq!(out["panel"], "explorer");
}

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_method() {
    let mut proc = VfsProcess::spawn();
    let err = proc.call_err("vfs/nope", json!({}));
    assert_eq!(err["code"], -32601);
}

#[test]
fn invalid_params() {
    let mut proc = VfsProcess::spawn();
    let err = proc.call_err("node/create", json!({ "kind": "symlink", "name": "x" }));
    assert_eq!(err["code"], -32602);
}

#[test]
fn malformed_line_gets_error_frame() {
    let mut proc = VfsProcess::spawn();
    proc.write_raw("{not json");
    let frame = proc.read_frame();
    assert_eq!(frame["id"], 0);
    assert_eq!(frame["error"]["code"], -32603);

    // The server keeps going.
    let init = proc.call("initialize", json!({}));
    assert_eq!(init["rootName"], "workspace");
}
