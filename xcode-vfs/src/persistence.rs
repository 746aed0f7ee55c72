// ---------------------------------------------------------------------------
// Persistence: whole-tree snapshots in a key-value slot
// ---------------------------------------------------------------------------
//
// Every mutation rewrites the full tree under one fixed key. The stored value
// is the JSON form of `NodeRecord`:
//
//   { "type": "folder", "name": ..., "id": ..., "children": [ ... ] }
//   { "type": "file",   "name": ..., "id": ..., "content": ... }
//
// There is no schema version and no incremental write.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::node::{NodeRecord, NodeType};
use crate::tree::Workspace;

pub const DEFAULT_STORAGE_KEY: &str = "xcode_fs";

pub const WELCOME_FILE_NAME: &str = "welcome.txt";
pub const WELCOME_FILE_CONTENT: &str = "Welcome to X Code!\n\nTry commands like ls, cd, pwd, echo, mkdir, touch, rm, mv, or run a Python file with: python welcome.txt";

// ---------------------------------------------------------------------------
// Key-value backends
// ---------------------------------------------------------------------------

pub trait KeyValueStore: Send {
	fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
	fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
}

/// Volatile store; contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: HashMap<String, String>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
		Ok(self.entries.get(key).cloned())
	}

	fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
		self.entries.insert(key.to_string(), value.to_string());
		Ok(())
	}
}

/// One file per key inside a directory. Writes go to a sibling temp file
/// and are renamed into place.
#[derive(Debug)]
pub struct FileStore {
	dir: PathBuf,
}

impl FileStore {
	pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
		let dir = dir.into();
		fs::create_dir_all(&dir)?;
		Ok(Self { dir })
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path_for(&self, key: &str) -> PathBuf {
		let safe: String = key
			.chars()
			.map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
			.collect();
		self.dir.join(format!("{}.json", safe))
	}
}

impl KeyValueStore for FileStore {
	fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
		match fs::read_to_string(self.path_for(key)) {
			Ok(s) => Ok(Some(s)),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
			Err(e) => Err(PersistenceError::Io(e)),
		}
	}

	fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
		let path = self.path_for(key);
		let tmp = path.with_extension("json.tmp");
		{
			let mut file = fs::File::create(&tmp)?;
			file.write_all(value.as_bytes())?;
			file.sync_all()?;
		}
		fs::rename(&tmp, &path)?;
		Ok(())
	}
}

// ---------------------------------------------------------------------------
// Tree adapter
// ---------------------------------------------------------------------------

pub struct TreeStore {
	backend: Box<dyn KeyValueStore>,
	key: String,
}

impl TreeStore {
	pub fn new(backend: Box<dyn KeyValueStore>, key: impl Into<String>) -> Self {
		Self {
			backend,
			key: key.into(),
		}
	}

	pub fn in_memory() -> Self {
		Self::new(Box::new(MemoryStore::new()), DEFAULT_STORAGE_KEY)
	}

	pub fn key(&self) -> &str {
		&self.key
	}

	pub fn save(&mut self, workspace: &Workspace) -> Result<(), PersistenceError> {
		let json = serde_json::to_string(&workspace.to_record())?;
		self.backend.set(&self.key, &json)?;
		tracing::debug!(key = %self.key, bytes = json.len(), nodes = workspace.len(), "Tree saved");
		Ok(())
	}

	pub fn load(&self) -> Result<Option<Workspace>, PersistenceError> {
		let Some(json) = self.backend.get(&self.key)? else {
			return Ok(None);
		};
		let record: NodeRecord = serde_json::from_str(&json)?;
		Workspace::from_record(record).map(Some)
	}

	/// Loads the stored tree, or seeds a workspace holding only the welcome
	/// file and stores it.
	pub fn load_or_seed(&mut self, root_name: &str) -> Result<Workspace, PersistenceError> {
		if let Some(ws) = self.load()? {
			tracing::info!(key = %self.key, nodes = ws.len(), "Loaded workspace");
			return Ok(ws);
		}

		let mut ws = Workspace::new(root_name);
		let root = ws.root_id().clone();
		ws.insert_child(
			&root,
			NodeType::File,
			WELCOME_FILE_NAME,
			WELCOME_FILE_CONTENT.to_string(),
		)
		.map_err(|e| PersistenceError::Corruption(e.to_string()))?;
		self.save(&ws)?;
		tracing::info!(key = %self.key, "Seeded default workspace");
		Ok(ws)
	}
}
