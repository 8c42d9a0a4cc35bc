//! Synthetic mouse and keyboard input for [`Godot`].

use playgodot_protocol::methods::{CLICK, PRESS_KEY};
use playgodot_protocol::{MouseButton, Vector2, key_code};
use playgodot_runtime::{Error, Result};
use serde_json::json;

use super::Godot;
use super::remote::{Subject, classify};
use crate::node::NodeRef;

/// Where a click lands.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickTarget {
	/// Centre of the node at this path.
	Node(String),
	/// Viewport position in pixels.
	Position(Vector2),
}

impl From<&str> for ClickTarget {
	fn from(path: &str) -> Self {
		Self::Node(path.to_string())
	}
}

impl From<String> for ClickTarget {
	fn from(path: String) -> Self {
		Self::Node(path)
	}
}

impl From<&NodeRef> for ClickTarget {
	fn from(node: &NodeRef) -> Self {
		Self::Node(node.path().to_string())
	}
}

impl From<Vector2> for ClickTarget {
	fn from(position: Vector2) -> Self {
		Self::Position(position)
	}
}

impl Godot {
	/// Left-clicks a node (by path) or a viewport position.
	///
	/// Returns once the target has queued the press and release; it does not
	/// wait for their effects.
	pub async fn click(&self, target: impl Into<ClickTarget>) -> Result<()> {
		self.click_with(target, MouseButton::Left).await
	}

	/// Left-clicks the viewport position `(x, y)`.
	pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
		self.click(Vector2::new(x, y)).await
	}

	/// Clicks with a specific mouse button.
	///
	/// # Errors
	///
	/// Returns `Error::InvalidArgument` for an empty path or a position that
	/// is negative or not finite, without contacting the target.
	/// Returns `Error::NodeNotFound` if the path form names no node.
	pub async fn click_with(&self, target: impl Into<ClickTarget>, button: MouseButton) -> Result<()> {
		match target.into() {
			ClickTarget::Node(path) => {
				if path.is_empty() {
					return Err(Error::InvalidArgument("click path must not be empty".to_string()));
				}
				self.request(CLICK, json!({ "path": path, "button": button }))
					.await
					.map_err(|e| classify(e, Subject::Node(&path)))?;
			}
			ClickTarget::Position(position) => {
				if !position.is_valid_screen_position() {
					return Err(Error::InvalidArgument(format!(
						"click position ({}, {}) must be finite and non-negative",
						position.x, position.y
					)));
				}
				self.request(
					CLICK,
					json!({ "x": position.x, "y": position.y, "button": button }),
				)
				.await
				.map_err(|e| classify(e, Subject::Scene))?;
			}
		}
		Ok(())
	}

	/// Presses and releases the named key (`"r"`, `"enter"`, `"f5"`, ...).
	///
	/// # Errors
	///
	/// Returns `Error::UnknownKey` for names outside the key table, without
	/// contacting the target.
	pub async fn press_key(&self, name: &str) -> Result<()> {
		let code = key_code(name).ok_or_else(|| Error::UnknownKey(name.to_string()))?;
		self.request(PRESS_KEY, json!({ "key": name, "keycode": code }))
			.await
			.map_err(|e| classify(e, Subject::Key(name)))?;
		Ok(())
	}
}
