// ---------------------------------------------------------------------------
// Node model: files and folders of the workspace tree
// ---------------------------------------------------------------------------

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque node identity. Assigned once at creation and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
	pub fn generate() -> Self {
		Self(format!("id-{}", Uuid::new_v4().simple()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for NodeId {
	fn from(s: &str) -> Self {
		Self(s.to_string())
	}
}

impl From<String> for NodeId {
	fn from(s: String) -> Self {
		Self(s)
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Discriminant of a node, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
	File,
	Folder,
}

impl NodeType {
	pub fn as_str(&self) -> &str {
		match self {
			Self::File => "file",
			Self::Folder => "folder",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
	File { content: String },
	/// Children in insertion order.
	Folder { children: Vec<NodeId> },
}

/// A node as held by the workspace arena. The parent link is kept in sync
/// with the parent's `children` sequence by the tree operations.
#[derive(Debug, Clone)]
pub struct Node {
	pub(crate) id: NodeId,
	pub(crate) name: String,
	pub(crate) parent: Option<NodeId>,
	pub(crate) kind: NodeKind,
}

impl Node {
	pub(crate) fn new_file(name: &str, content: String, parent: Option<NodeId>) -> Self {
		Self {
			id: NodeId::generate(),
			name: name.to_string(),
			parent,
			kind: NodeKind::File { content },
		}
	}

	pub(crate) fn new_folder(name: &str, parent: Option<NodeId>) -> Self {
		Self {
			id: NodeId::generate(),
			name: name.to_string(),
			parent,
			kind: NodeKind::Folder {
				children: Vec::new(),
			},
		}
	}

	pub fn id(&self) -> &NodeId {
		&self.id
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn parent(&self) -> Option<&NodeId> {
		self.parent.as_ref()
	}

	pub fn kind(&self) -> &NodeKind {
		&self.kind
	}

	pub fn node_type(&self) -> NodeType {
		match self.kind {
			NodeKind::File { .. } => NodeType::File,
			NodeKind::Folder { .. } => NodeType::Folder,
		}
	}

	pub fn is_folder(&self) -> bool {
		matches!(self.kind, NodeKind::Folder { .. })
	}

	pub fn is_file(&self) -> bool {
		matches!(self.kind, NodeKind::File { .. })
	}

	/// File text, `None` for folders.
	pub fn content(&self) -> Option<&str> {
		match &self.kind {
			NodeKind::File { content } => Some(content),
			NodeKind::Folder { .. } => None,
		}
	}

	/// Child ids in order; empty for files.
	pub fn children(&self) -> &[NodeId] {
		match &self.kind {
			NodeKind::Folder { children } => children,
			NodeKind::File { .. } => &[],
		}
	}
}

// ---------------------------------------------------------------------------
// Serialized shape
// ---------------------------------------------------------------------------

/// Recursive, self-contained form of a subtree. This is the shape written to
/// the key-value store and sent over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeRecord {
	File {
		name: String,
		id: NodeId,
		#[serde(default)]
		content: String,
	},
	Folder {
		name: String,
		id: NodeId,
		#[serde(default)]
		children: Vec<NodeRecord>,
	},
}

impl NodeRecord {
	pub fn id(&self) -> &NodeId {
		match self {
			Self::File { id, .. } | Self::Folder { id, .. } => id,
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::File { name, .. } | Self::Folder { name, .. } => name,
		}
	}
}
