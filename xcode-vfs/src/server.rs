use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::VfsError;
use crate::protocol::*;
use crate::session::Session;
use crate::transport::NdjsonTransport;

/// Why a request produced an error frame instead of a result.
#[derive(Debug)]
pub enum DispatchError {
    MethodNotFound(String),
    InvalidParams(String),
    Vfs(VfsError),
}

impl From<VfsError> for DispatchError {
    fn from(e: VfsError) -> Self {
        Self::Vfs(e)
    }
}

fn parse<T: DeserializeOwned>(params: Value) -> Result<T, DispatchError> {
    serde_json::from_value(params).map_err(|e| DispatchError::InvalidParams(e.to_string()))
}

fn to_value(value: impl serde::Serialize) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::Vfs(VfsError::Json(e)))
}

/// JSON-RPC server: dispatches incoming requests to session operations.
pub struct VfsServer {
    session: Session,
    transport: NdjsonTransport,
}

impl VfsServer {
    pub fn new(session: Session, transport: NdjsonTransport) -> Self {
        Self { session, transport }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Main loop: one request per input line until EOF. Requests are handled
    /// strictly in order.
    pub async fn run<R: AsyncRead + Unpin>(&mut self, input: R) -> Result<(), VfsError> {
        let mut lines = BufReader::new(input).lines();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            self.handle_line(trimmed).await;
        }
        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    pub async fn handle_line(&mut self, line: &str) {
        let req: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Parse error: {}", e);
                self.transport
                    .write_error(0, INTERNAL_ERROR, "Parse error: invalid JSON", None);
                return;
            }
        };

        match self.dispatch(&req.method, req.params).await {
            Ok(result) => self.transport.write_response(req.id, result),
            Err(DispatchError::MethodNotFound(m)) => self.transport.write_error(
                req.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", m),
                None,
            ),
            Err(DispatchError::InvalidParams(msg)) => self.transport.write_error(
                req.id,
                INVALID_PARAMS,
                format!("Invalid params: {}", msg),
                None,
            ),
            Err(DispatchError::Vfs(e)) => {
                tracing::debug!(method = %req.method, code = e.code(), "Request rejected");
                self.transport
                    .write_error(req.id, VFS_ERROR, e.to_string(), Some(e.to_json_rpc_error()));
            }
        }
    }

    pub async fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, DispatchError> {
        let s = &mut self.session;
        match method {
            "initialize" => {
                let prompt = s.prompt();
                let root = s.workspace().root();
                Ok(json!({
                    "rootId": root.id(),
                    "rootName": root.name(),
                    "storageKey": s.store().key(),
                    "prompt": prompt,
                }))
            }

            // -- tree --
            "tree/get" => to_value(s.workspace().to_record()),
            "tree/find" => {
                let p: IdParams = parse(params)?;
                let found = s.workspace().find_with_parent(&p.id);
                Ok(json!({
                    "node": found.and_then(|(n, _)| s.workspace().record_of(n.id())),
                    "parentId": found.and_then(|(_, parent)| parent.map(|pn| pn.id().clone())),
                }))
            }

            // -- explorer --
            "node/select" => {
                let p: SelectParams = parse(params)?;
                s.select(p.id)?;
                Ok(json!({ "selection": s.selection() }))
            }
            "node/create" => {
                let p: CreateParams = parse(params)?;
                let id = match p.kind {
                    crate::node::NodeType::File => s.new_file(&p.name)?,
                    crate::node::NodeType::Folder => s.new_folder(&p.name)?,
                };
                Ok(json!({ "id": id, "status": s.status() }))
            }
            "node/rename" => {
                let p: RenameParams = parse(params)?;
                let renamed = s.rename(&p.id, &p.name)?;
                Ok(json!({ "renamed": renamed }))
            }
            "node/delete" => {
                let p: IdParams = parse(params)?;
                let removed = s.delete(&p.id)?;
                Ok(json!({ "removed": removed, "status": s.status() }))
            }
            "node/move" => {
                let p: MoveParams = parse(params)?;
                let moved = s.move_node(&p.dragged_id, &p.target_id)?;
                Ok(json!({ "moved": moved }))
            }
            "node/download" => {
                let p: IdParams = parse(params)?;
                to_value(s.download(&p.id)?)
            }
            "files/upload" => {
                let p: UploadParams = parse(params)?;
                let ids = s.upload(p.files)?;
                Ok(json!({ "ids": ids }))
            }

            // -- editor --
            "editor/open" => {
                let p: IdParams = parse(params)?;
                s.open_file(&p.id)?;
                Ok(json!({ "content": s.editor().get_value(), "status": s.status() }))
            }
            "editor/get" => {
                let sel = s.editor().selection();
                Ok(json!({
                    "content": s.editor().get_value(),
                    "selection": [sel.start, sel.end],
                    "currentFile": s.current_file(),
                }))
            }
            "editor/set" => {
                let p: SetContentParams = parse(params)?;
                s.editor_mut().set_value(&p.content);
                let saved = s.update_current_file_content()?;
                Ok(json!({ "saved": saved }))
            }
            "editor/findNext" => {
                let p: QueryParams = parse(params)?;
                let found = s.find_next(&p.query);
                Ok(json!({
                    "match": found.map(|r| [r.start, r.end]),
                    "status": s.status(),
                }))
            }
            "editor/replace" => {
                let p: ReplaceParams = parse(params)?;
                let found = s.replace(&p.query, &p.replacement)?;
                Ok(json!({ "replaced": found.is_some(), "status": s.status() }))
            }
            "editor/replaceAll" => {
                let p: ReplaceParams = parse(params)?;
                let count = s.replace_all(&p.query, &p.replacement)?;
                Ok(json!({ "count": count, "status": s.status() }))
            }
            "editor/save" => {
                let saved = s.save()?;
                Ok(json!({ "saved": saved, "status": s.status() }))
            }
            "editor/upper" => {
                let converted = s.to_uppercase()?;
                Ok(json!({ "converted": converted, "content": s.editor().get_value(), "status": s.status() }))
            }
            "editor/lower" => {
                let converted = s.to_lowercase()?;
                Ok(json!({ "converted": converted, "content": s.editor().get_value(), "status": s.status() }))
            }

            // -- terminal --
            "shell/execute" => {
                let p: ExecuteParams = parse(params)?;
                to_value(s.execute(&p.line).await)
            }
            "shell/prompt" => Ok(json!({ "prompt": s.prompt() })),
            "run/current" => to_value(s.run_current_file().await?),
            "panel/switch" => {
                let p: PanelParams = parse(params)?;
                s.switch_panel(p.panel);
                Ok(json!({ "panel": s.panel() }))
            }

            other => Err(DispatchError::MethodNotFound(other.to_string())),
        }
    }
}
