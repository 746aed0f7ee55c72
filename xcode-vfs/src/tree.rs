// ---------------------------------------------------------------------------
// Workspace tree: id-indexed arena of nodes under one fixed root folder
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use crate::error::{PersistenceError, VfsError};
use crate::node::{Node, NodeId, NodeKind, NodeRecord, NodeType};

pub struct Workspace {
	root: NodeId,
	nodes: HashMap<NodeId, Node>,
}

impl Workspace {
	// -- Constructor ------------------------------------------------------

	pub fn new(root_name: &str) -> Self {
		let root = Node::new_folder(root_name, None);
		let root_id = root.id.clone();
		let mut nodes = HashMap::new();
		nodes.insert(root_id.clone(), root);
		Self {
			root: root_id,
			nodes,
		}
	}

	// -- Queries ----------------------------------------------------------

	pub fn root_id(&self) -> &NodeId {
		&self.root
	}

	pub fn root(&self) -> &Node {
		// The root entry is inserted at construction and never removed.
		&self.nodes[&self.root]
	}

	/// Number of nodes reachable from the root, root included.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// True when only the root is present.
	pub fn is_empty(&self) -> bool {
		self.nodes.len() == 1
	}

	pub fn find(&self, id: &NodeId) -> Option<&Node> {
		self.nodes.get(id)
	}

	/// The node and its immediate parent (`None` for the root).
	pub fn find_with_parent(&self, id: &NodeId) -> Option<(&Node, Option<&Node>)> {
		let node = self.nodes.get(id)?;
		let parent = node.parent.as_ref().and_then(|p| self.nodes.get(p));
		Some((node, parent))
	}

	/// Children of a folder in order. Files and unknown ids yield nothing.
	pub fn children_of<'a>(&'a self, folder: &NodeId) -> impl Iterator<Item = &'a Node> + 'a {
		self.nodes
			.get(folder)
			.map(|n| n.children())
			.unwrap_or(&[])
			.iter()
			.filter_map(move |c| self.nodes.get(c))
	}

	/// First child of `folder` with the given name, any type.
	pub fn child_by_name(&self, folder: &NodeId, name: &str) -> Option<&Node> {
		self.children_of(folder).find(|n| n.name == name)
	}

	/// True when `ancestor` lies on the parent chain of `id` (or is `id`).
	pub fn is_ancestor_or_self(&self, ancestor: &NodeId, id: &NodeId) -> bool {
		let mut cursor = Some(id);
		while let Some(current) = cursor {
			if current == ancestor {
				return true;
			}
			cursor = self.nodes.get(current).and_then(|n| n.parent.as_ref());
		}
		false
	}

	/// Ids from the root down to `id`, inclusive. Empty when `id` is unknown.
	pub fn ancestry(&self, id: &NodeId) -> Vec<NodeId> {
		let mut chain = Vec::new();
		let mut cursor = self.nodes.get(id);
		while let Some(node) = cursor {
			chain.push(node.id.clone());
			cursor = node.parent.as_ref().and_then(|p| self.nodes.get(p));
		}
		chain.reverse();
		chain
	}

	// -- Mutations --------------------------------------------------------

	/// Creates a node relative to the explorer selection: inside a selected
	/// folder, next to a selected file, or under the root when nothing (or
	/// an unknown id) is selected. An empty name is a silent no-op.
	pub fn create(
		&mut self,
		selection: Option<&NodeId>,
		kind: NodeType,
		name: &str,
	) -> Option<NodeId> {
		if name.is_empty() {
			return None;
		}
		let parent = match selection.and_then(|id| self.nodes.get(id)) {
			Some(node) if node.is_folder() => node.id.clone(),
			Some(node) => node.parent.clone().unwrap_or_else(|| self.root.clone()),
			None => {
				if let Some(id) = selection {
					tracing::warn!(selection = %id, "Selection not found, creating under root");
				}
				self.root.clone()
			}
		};
		self.insert_child(&parent, kind, name, String::new()).ok()
	}

	/// Appends a new node to the children of `parent`.
	pub fn insert_child(
		&mut self,
		parent: &NodeId,
		kind: NodeType,
		name: &str,
		content: String,
	) -> Result<NodeId, VfsError> {
		let parent_node = self
			.nodes
			.get(parent)
			.ok_or_else(|| VfsError::NotFound(parent.clone()))?;
		if !parent_node.is_folder() {
			return Err(VfsError::NotAFolder(parent_node.name.clone()));
		}

		let node = match kind {
			NodeType::File => Node::new_file(name, content, Some(parent.clone())),
			NodeType::Folder => Node::new_folder(name, Some(parent.clone())),
		};
		let id = node.id.clone();
		self.nodes.insert(id.clone(), node);
		if let Some(children) = self.children_mut(parent) {
			children.push(id.clone());
		}

		tracing::debug!(id = %id, parent = %parent, kind = kind.as_str(), name, "Node created");
		Ok(id)
	}

	/// Renames in place. Returns `false` (no change) for an empty name.
	pub fn rename(&mut self, id: &NodeId, new_name: &str) -> Result<bool, VfsError> {
		let node = self
			.nodes
			.get_mut(id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?;
		if new_name.is_empty() {
			return Ok(false);
		}
		tracing::debug!(id = %id, from = %node.name, to = new_name, "Node renamed");
		node.name = new_name.to_string();
		Ok(true)
	}

	pub fn set_content(&mut self, id: &NodeId, text: &str) -> Result<(), VfsError> {
		let node = self
			.nodes
			.get_mut(id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?;
		match &mut node.kind {
			NodeKind::File { content } => {
				*content = text.to_string();
				Ok(())
			}
			NodeKind::Folder { .. } => Err(VfsError::NotAFile(node.name.clone())),
		}
	}

	/// Detaches a node from its parent and releases its whole subtree.
	/// Returns every removed id, the node itself first.
	pub fn delete(&mut self, id: &NodeId) -> Result<Vec<NodeId>, VfsError> {
		if *id == self.root {
			return Err(VfsError::RootDeletion);
		}
		let parent = self
			.nodes
			.get(id)
			.ok_or_else(|| VfsError::NotFound(id.clone()))?
			.parent
			.clone();

		if let Some(children) = parent.as_ref().and_then(|p| self.children_mut(p)) {
			children.retain(|c| c != id);
		}

		let mut removed = Vec::new();
		let mut pending = vec![id.clone()];
		while let Some(next) = pending.pop() {
			if let Some(node) = self.nodes.remove(&next) {
				pending.extend(node.children().iter().rev().cloned());
				removed.push(next);
			}
		}

		tracing::debug!(id = %id, removed = removed.len(), "Node deleted");
		Ok(removed)
	}

	/// Drag-and-drop move. Dropping onto a folder appends into it; dropping
	/// onto a file appends next to it. Returns `false` when either id is
	/// unknown. Moving the root, or a folder into itself or one of its
	/// descendants, is rejected.
	pub fn move_node(&mut self, dragged: &NodeId, target: &NodeId) -> Result<bool, VfsError> {
		let (Some(dragged_node), Some(target_node)) =
			(self.nodes.get(dragged), self.nodes.get(target))
		else {
			return Ok(false);
		};

		if *dragged == self.root {
			return Err(VfsError::InvalidMove("Cannot move root.".to_string()));
		}

		let destination = if target_node.is_folder() {
			target_node.id.clone()
		} else {
			match &target_node.parent {
				Some(p) => p.clone(),
				None => return Ok(false),
			}
		};

		if dragged_node.is_folder() && self.is_ancestor_or_self(dragged, &destination) {
			return Err(VfsError::InvalidMove(format!(
				"Cannot move '{}' into itself or one of its subfolders.",
				dragged_node.name
			)));
		}

		let old_parent = dragged_node.parent.clone();
		if let Some(children) = old_parent.as_ref().and_then(|p| self.children_mut(p)) {
			children.retain(|c| c != dragged);
		}
		if let Some(children) = self.children_mut(&destination) {
			children.push(dragged.clone());
		}
		if let Some(node) = self.nodes.get_mut(dragged) {
			node.parent = Some(destination.clone());
		}

		tracing::debug!(id = %dragged, to = %destination, "Node moved");
		Ok(true)
	}

	fn children_mut(&mut self, folder: &NodeId) -> Option<&mut Vec<NodeId>> {
		match self.nodes.get_mut(folder).map(|n| &mut n.kind) {
			Some(NodeKind::Folder { children }) => Some(children),
			_ => None,
		}
	}

	// -- Conversion -------------------------------------------------------

	pub fn to_record(&self) -> NodeRecord {
		self.record_of(&self.root)
			.unwrap_or_else(|| NodeRecord::Folder {
				name: String::new(),
				id: self.root.clone(),
				children: Vec::new(),
			})
	}

	/// Recursive form of the subtree rooted at `id`.
	pub fn record_of(&self, id: &NodeId) -> Option<NodeRecord> {
		let node = self.nodes.get(id)?;
		Some(match &node.kind {
			NodeKind::File { content } => NodeRecord::File {
				name: node.name.clone(),
				id: node.id.clone(),
				content: content.clone(),
			},
			NodeKind::Folder { children } => NodeRecord::Folder {
				name: node.name.clone(),
				id: node.id.clone(),
				children: children.iter().filter_map(|c| self.record_of(c)).collect(),
			},
		})
	}

	/// Rebuilds a workspace from its recursive form. The root must be a
	/// folder and ids must be unique.
	pub fn from_record(record: NodeRecord) -> Result<Self, PersistenceError> {
		let root_id = match &record {
			NodeRecord::Folder { id, .. } => id.clone(),
			NodeRecord::File { name, .. } => {
				return Err(PersistenceError::Corruption(format!(
					"Root must be a folder, found file '{}'",
					name
				)));
			}
		};

		let mut nodes = HashMap::new();
		let mut pending = vec![(record, None::<NodeId>)];
		while let Some((rec, parent)) = pending.pop() {
			let node = match rec {
				NodeRecord::File { name, id, content } => Node {
					id,
					name,
					parent,
					kind: NodeKind::File { content },
				},
				NodeRecord::Folder { name, id, children } => {
					let ids = children.iter().map(|c| c.id().clone()).collect();
					for child in children {
						pending.push((child, Some(id.clone())));
					}
					Node {
						id,
						name,
						parent,
						kind: NodeKind::Folder { children: ids },
					}
				}
			};
			if nodes.contains_key(&node.id) {
				return Err(PersistenceError::Corruption(format!(
					"Duplicate node id: {}",
					node.id
				)));
			}
			nodes.insert(node.id.clone(), node);
		}

		Ok(Self {
			root: root_id,
			nodes,
		})
	}
}
