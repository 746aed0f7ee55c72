// ---------------------------------------------------------------------------
// Session: one workspace plus the editing state around it
// ---------------------------------------------------------------------------

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::editor::TextBuffer;
use crate::error::VfsError;
use crate::exec::ExecutionBridge;
use crate::node::{NodeId, NodeRecord, NodeType};
use crate::persistence::TreeStore;
use crate::shell::{Shell, ShellAction};
use crate::tree::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
	Explorer,
	Search,
	Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
	pub name: String,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Download {
	pub name: String,
	pub content: String,
}

/// Result of one terminal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
	pub lines: Vec<String>,
	pub prompt: String,
	pub panel: Panel,
}

/// What the "Run" button produced for the current file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RunOutcome {
	Preview { name: String, html: String },
	Terminal { lines: Vec<String> },
}

pub struct Session {
	workspace: Workspace,
	store: TreeStore,
	shell: Shell,
	bridge: ExecutionBridge,
	editor: TextBuffer,
	current_file: Option<NodeId>,
	selection: Option<NodeId>,
	panel: Panel,
	status: String,
}

impl Session {
	pub fn new(workspace: Workspace, store: TreeStore, bridge: ExecutionBridge) -> Self {
		let shell = Shell::new(workspace.root_id());
		Self {
			workspace,
			store,
			shell,
			bridge,
			editor: TextBuffer::new(),
			current_file: None,
			selection: None,
			panel: Panel::Explorer,
			status: String::new(),
		}
	}

	/// Loads the stored workspace (seeding the default one when the store
	/// is empty) and starts a session on it.
	pub fn open(
		mut store: TreeStore,
		root_name: &str,
		bridge: ExecutionBridge,
	) -> Result<Self, VfsError> {
		let workspace = store.load_or_seed(root_name)?;
		Ok(Self::new(workspace, store, bridge))
	}

	// -- Accessors --------------------------------------------------------

	pub fn workspace(&self) -> &Workspace {
		&self.workspace
	}

	pub fn store(&self) -> &TreeStore {
		&self.store
	}

	pub fn shell(&self) -> &Shell {
		&self.shell
	}

	pub fn bridge(&self) -> &ExecutionBridge {
		&self.bridge
	}

	pub fn editor(&self) -> &TextBuffer {
		&self.editor
	}

	pub fn editor_mut(&mut self) -> &mut TextBuffer {
		&mut self.editor
	}

	pub fn current_file(&self) -> Option<&NodeId> {
		self.current_file.as_ref()
	}

	pub fn selection(&self) -> Option<&NodeId> {
		self.selection.as_ref()
	}

	pub fn panel(&self) -> Panel {
		self.panel
	}

	pub fn status(&self) -> &str {
		&self.status
	}

	pub fn switch_panel(&mut self, panel: Panel) {
		self.panel = panel;
	}

	pub fn prompt(&mut self) -> String {
		self.shell.resync(&self.workspace);
		self.shell.prompt(&self.workspace)
	}

	fn persist(&mut self) -> Result<(), VfsError> {
		self.store.save(&self.workspace).map_err(|e| {
			tracing::warn!(error = %e, "Failed to save workspace");
			VfsError::from(e)
		})
	}

	/// Saves the tree. When the save fails the tree is put back to `before`,
	/// so memory never holds changes the store does not.
	fn commit(&mut self, before: NodeRecord) -> Result<(), VfsError> {
		let Err(e) = self.persist() else {
			return Ok(());
		};
		match Workspace::from_record(before) {
			Ok(ws) => self.workspace = ws,
			Err(restore) => tracing::error!(error = %restore, "Failed to restore workspace"),
		}
		Err(e)
	}

	fn set_status(&mut self, text: impl Into<String>) {
		self.status = text.into();
	}

	/// Drops references to nodes that are no longer in the tree.
	fn forget_missing(&mut self) {
		if self
			.current_file
			.as_ref()
			.is_some_and(|id| self.workspace.find(id).is_none())
		{
			self.current_file = None;
			self.editor.set_value("");
		}
		if self
			.selection
			.as_ref()
			.is_some_and(|id| self.workspace.find(id).is_none())
		{
			self.selection = None;
		}
	}

	// -- Explorer ---------------------------------------------------------

	pub fn select(&mut self, id: Option<NodeId>) -> Result<(), VfsError> {
		if let Some(id) = &id {
			if self.workspace.find(id).is_none() {
				return Err(VfsError::NotFound(id.clone()));
			}
		}
		self.selection = id;
		Ok(())
	}

	pub fn new_file(&mut self, name: &str) -> Result<Option<NodeId>, VfsError> {
		self.create(NodeType::File, name)
	}

	pub fn new_folder(&mut self, name: &str) -> Result<Option<NodeId>, VfsError> {
		self.create(NodeType::Folder, name)
	}

	fn create(&mut self, kind: NodeType, name: &str) -> Result<Option<NodeId>, VfsError> {
		let before = self.workspace.to_record();
		let Some(id) = self.workspace.create(self.selection.as_ref(), kind, name) else {
			return Ok(None);
		};
		self.commit(before)?;
		let label = match kind {
			NodeType::File => "File",
			NodeType::Folder => "Folder",
		};
		self.set_status(format!("{} \"{}\" created.", label, name));
		Ok(Some(id))
	}

	pub fn open_file(&mut self, id: &NodeId) -> Result<(), VfsError> {
		let node = self
			.workspace
			.find(id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?;
		let Some(content) = node.content() else {
			return Err(VfsError::NotAFile(node.name().to_string()));
		};
		self.editor.set_value(content);
		let status = format!("File \"{}\" opened.", node.name());
		self.current_file = Some(id.clone());
		self.selection = Some(id.clone());
		self.set_status(status);
		Ok(())
	}

	/// Editor change notification: copies the editor text into the current
	/// file. Returns `false` when no file is open.
	pub fn update_current_file_content(&mut self) -> Result<bool, VfsError> {
		let Some(id) = self.current_file.clone() else {
			return Ok(false);
		};
		let before = self.workspace.to_record();
		self.workspace.set_content(&id, self.editor.get_value())?;
		self.commit(before)?;
		Ok(true)
	}

	pub fn rename(&mut self, id: &NodeId, new_name: &str) -> Result<bool, VfsError> {
		let before = self.workspace.to_record();
		if !self.workspace.rename(id, new_name)? {
			return Ok(false);
		}
		self.commit(before)?;
		self.set_status(format!("Renamed to \"{}\".", new_name));
		Ok(true)
	}

	pub fn delete(&mut self, id: &NodeId) -> Result<usize, VfsError> {
		let before = self.workspace.to_record();
		let removed = self.workspace.delete(id)?;
		self.commit(before)?;
		self.forget_missing();
		self.set_status("Item deleted.");
		Ok(removed.len())
	}

	pub fn move_node(&mut self, dragged: &NodeId, target: &NodeId) -> Result<bool, VfsError> {
		let before = self.workspace.to_record();
		if !self.workspace.move_node(dragged, target)? {
			return Ok(false);
		}
		self.commit(before)?;
		Ok(true)
	}

	/// Each file becomes a new root-level file, saved one at a time.
	pub fn upload(&mut self, files: Vec<UploadedFile>) -> Result<Vec<NodeId>, VfsError> {
		let root = self.workspace.root_id().clone();
		let mut created = Vec::with_capacity(files.len());
		for file in files {
			let before = self.workspace.to_record();
			let id = self
				.workspace
				.insert_child(&root, NodeType::File, &file.name, file.content)?;
			self.commit(before)?;
			self.set_status(format!("File \"{}\" uploaded.", file.name));
			created.push(id);
		}
		Ok(created)
	}

	pub fn download(&mut self, id: &NodeId) -> Result<Download, VfsError> {
		let node = self
			.workspace
			.find(id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?;
		let Some(content) = node.content() else {
			return Err(VfsError::FolderDownloadUnsupported);
		};
		let download = Download {
			name: node.name().to_string(),
			content: content.to_string(),
		};
		self.set_status(format!("File \"{}\" downloaded.", download.name));
		Ok(download)
	}

	// -- Editor search ----------------------------------------------------

	pub fn find_next(&mut self, query: &str) -> Option<Range<usize>> {
		if query.is_empty() {
			return None;
		}
		let found = self.editor.find_next(query);
		self.set_status(if found.is_some() { "Match found." } else { "No match found." });
		found
	}

	pub fn replace(&mut self, query: &str, replacement: &str) -> Result<Option<Range<usize>>, VfsError> {
		if query.is_empty() {
			return Ok(None);
		}
		let saved = self.editor.clone();
		let Some(found) = self.editor.replace(query, replacement) else {
			self.set_status("No match found.");
			return Ok(None);
		};
		if let Err(e) = self.update_current_file_content() {
			self.editor = saved;
			return Err(e);
		}
		self.set_status("One occurrence replaced.");
		Ok(Some(found))
	}

	pub fn replace_all(&mut self, query: &str, replacement: &str) -> Result<usize, VfsError> {
		if query.is_empty() {
			return Ok(0);
		}
		let saved = self.editor.clone();
		let count = self.editor.replace_all(query, replacement);
		if let Err(e) = self.update_current_file_content() {
			self.editor = saved;
			return Err(e);
		}
		self.set_status(format!("{} occurrence(s) replaced.", count));
		Ok(count)
	}

	// -- Editor commands --------------------------------------------------

	/// Writes the editor text into the current file. `false` when no file
	/// is open.
	pub fn save(&mut self) -> Result<bool, VfsError> {
		if !self.update_current_file_content()? {
			return Ok(false);
		}
		self.set_status("Changes saved.");
		Ok(true)
	}

	pub fn to_uppercase(&mut self) -> Result<bool, VfsError> {
		self.convert_case(str::to_uppercase, "Converted to uppercase.")
	}

	pub fn to_lowercase(&mut self) -> Result<bool, VfsError> {
		self.convert_case(str::to_lowercase, "Converted to lowercase.")
	}

	fn convert_case(&mut self, convert: fn(&str) -> String, status: &str) -> Result<bool, VfsError> {
		if self.current_file.is_none() {
			return Ok(false);
		}
		let saved = self.editor.clone();
		let converted = convert(self.editor.get_value());
		self.editor.set_value(&converted);
		if let Err(e) = self.update_current_file_content() {
			self.editor = saved;
			return Err(e);
		}
		self.set_status(status);
		Ok(true)
	}

	// -- Terminal ---------------------------------------------------------

	pub async fn execute(&mut self, line: &str) -> CommandOutput {
		let before = self.workspace.to_record();
		let outcome = self.shell.execute(&mut self.workspace, line);
		let mut lines = outcome.lines;

		if outcome.mutated {
			if let Err(e) = self.commit(before) {
				self.shell.resync(&self.workspace);
				lines.push(format!("xcode: workspace not saved: {}", e));
			}
			self.forget_missing();
		}

		match outcome.action {
			Some(ShellAction::Exit) => self.panel = Panel::Explorer,
			Some(ShellAction::Run { name, source }) => {
				tracing::debug!(file = %name, "Running script from shell");
				lines.extend(self.run_script(&source).await);
			}
			None => {}
		}

		CommandOutput {
			lines,
			prompt: self.shell.prompt(&self.workspace),
			panel: self.panel,
		}
	}

	/// "Run" button: previews HTML, runs Python in the terminal panel.
	pub async fn run_current_file(&mut self) -> Result<RunOutcome, VfsError> {
		let id = self.current_file.clone().ok_or(VfsError::NoFileSelected)?;
		let node = self
			.workspace
			.find(&id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?;
		let name = node.name().to_string();
		let source = node.content().unwrap_or_default().to_string();
		let ext = name.rsplit('.').next().unwrap_or_default().to_lowercase();

		if ext == "html" {
			return Ok(RunOutcome::Preview { name, html: source });
		}

		self.panel = Panel::Terminal;
		let lines = if ext == "py" {
			let mut lines = vec![format!("Running {}", name)];
			lines.extend(self.run_script(&source).await);
			lines
		} else {
			vec!["Cannot run this file type.".to_string()]
		};
		Ok(RunOutcome::Terminal { lines })
	}

	/// Progress is rendered the way a terminal line is updated in place:
	/// one line tracking the latest tick, then a final 100% line.
	async fn run_script(&self, source: &str) -> Vec<String> {
		let mut lines: Vec<String> = Vec::new();
		let mut on_progress = |pct: u8| {
			let text = format!("Installing Python runtime... {}%", pct);
			if pct != 100 {
				if let Some(last) = lines.last_mut() {
					*last = text;
					return;
				}
			}
			lines.push(text);
		};
		let output = self.bridge.run(source, &mut on_progress).await;
		lines.extend(output.trim_end_matches('\n').lines().map(str::to_string));
		lines
	}
}
