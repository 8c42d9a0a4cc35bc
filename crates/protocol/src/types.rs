//! Structured payloads returned by the target.

use serde::{Deserialize, Serialize};

/// A node as reported by the target at lookup time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
	/// Absolute, slash-delimited path rooted at the scene root (`/root/Game`).
	pub path: String,
	/// Node name (last path segment).
	pub name: String,
	/// Engine class of the node (`Control`, `Button`, ...).
	pub class: String,
	/// Target-assigned object id; a reinstantiated node gets a new one.
	pub instance_id: u64,
}

/// The scene currently loaded in the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDescriptor {
	/// Resource path of the scene (`res://scenes/main.tscn`).
	pub path: String,
	/// Name of the scene's root node.
	pub name: String,
}

/// Screen-space position in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
	pub x: f64,
	pub y: f64,
}

impl Vector2 {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// True when both components are finite and non-negative.
	pub fn is_valid_screen_position(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() && self.x >= 0.0 && self.y >= 0.0
	}
}

impl From<(f64, f64)> for Vector2 {
	fn from((x, y): (f64, f64)) -> Self {
		Self { x, y }
	}
}

impl From<(i32, i32)> for Vector2 {
	fn from((x, y): (i32, i32)) -> Self {
		Self {
			x: x.into(),
			y: y.into(),
		}
	}
}

/// Mouse button for synthetic pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
	#[default]
	Left,
	Right,
	Middle,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_node_info_wire_shape() {
		let info: NodeInfo = serde_json::from_value(serde_json::json!({
			"path": "/root/Game",
			"name": "Game",
			"class": "Control",
			"instance_id": 27
		}))
		.unwrap();
		assert_eq!(info.name, "Game");
		assert_eq!(info.instance_id, 27);
	}

	#[test]
	fn test_screen_position_validation() {
		assert!(Vector2::new(370.0, 525.0).is_valid_screen_position());
		assert!(!Vector2::new(-1.0, 10.0).is_valid_screen_position());
		assert!(!Vector2::new(f64::NAN, 10.0).is_valid_screen_position());
	}
}
