//! Handles to nodes in the target's scene tree.

use std::fmt;

use playgodot_protocol::NodeInfo;

/// A node as it was when it was looked up.
///
/// A `NodeRef` is a snapshot, not a live binding: the target may free or
/// reinstantiate the node at any time (a scene reload does both). Use
/// [`Godot::resolve`](crate::Godot::resolve) to check that the handle still
/// names the same instance before relying on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
	info: NodeInfo,
}

impl NodeRef {
	/// Absolute path at lookup time.
	pub fn path(&self) -> &str {
		&self.info.path
	}

	pub fn name(&self) -> &str {
		&self.info.name
	}

	/// Engine class, e.g. `Button`.
	pub fn class(&self) -> &str {
		&self.info.class
	}

	/// Target-assigned object id.
	pub fn instance_id(&self) -> u64 {
		self.info.instance_id
	}

	pub fn info(&self) -> &NodeInfo {
		&self.info
	}
}

impl From<NodeInfo> for NodeRef {
	fn from(info: NodeInfo) -> Self {
		Self { info }
	}
}

impl fmt::Display for NodeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({}#{})", self.info.path, self.info.class, self.info.instance_id)
	}
}
