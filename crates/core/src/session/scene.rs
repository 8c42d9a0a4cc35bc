//! Scene management for [`Godot`].

use std::time::Instant;

use playgodot_protocol::methods::{GET_CURRENT_SCENE, RELOAD_SCENE};
use playgodot_protocol::{SceneDescriptor, Variant};
use playgodot_runtime::{CallContext, Error, Result};
use serde_json::json;

use super::Godot;
use super::remote::{Subject, classify};

impl Godot {
	/// Describes the scene currently loaded in the target.
	///
	/// # Errors
	///
	/// Returns `Error::NoActiveScene` when nothing is loaded, and
	/// `Error::ProtocolError` when the reply is not a `{path, name}` mapping.
	pub async fn get_current_scene(&self) -> Result<SceneDescriptor> {
		let started = Instant::now();
		let params = json!({});
		let value = self
			.request(GET_CURRENT_SCENE, params.clone())
			.await
			.map_err(|e| classify(e, Subject::Scene))?;

		if value.is_nil() {
			return Err(Error::NoActiveScene {
				context: Box::new(CallContext::new(
					GET_CURRENT_SCENE,
					&params,
					None,
					started.elapsed(),
				)),
			});
		}
		scene_descriptor(&value)
	}

	/// Discards the current scene's state and reinstantiates it.
	///
	/// Returns once the target accepted the reload. Nodes looked up before
	/// the call are stale afterwards; wait for the new tree with
	/// [`wait_for_node`](Self::wait_for_node).
	pub async fn reload_scene(&self) -> Result<()> {
		self.request(RELOAD_SCENE, json!({}))
			.await
			.map_err(|e| classify(e, Subject::Scene))?;
		Ok(())
	}
}

fn scene_descriptor(value: &Variant) -> Result<SceneDescriptor> {
	let field = |key: &str| value.get(key).and_then(Variant::as_str).map(str::to_string);
	match (field("path"), field("name")) {
		(Some(path), Some(name)) => Ok(SceneDescriptor { path, name }),
		_ => Err(Error::ProtocolError(format!(
			"get_current_scene: expected {{path, name}} mapping, got {value}"
		))),
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;

	#[test]
	fn test_descriptor_from_mapping() {
		let value: Variant = serde_json::from_value(json!({
			"path": "res://scenes/main.tscn",
			"name": "Game"
		}))
		.unwrap();

		let scene = scene_descriptor(&value).unwrap();
		assert_eq!(scene.path, "res://scenes/main.tscn");
		assert_eq!(scene.name, "Game");
	}

	#[test]
	fn test_bare_string_is_rejected() {
		let err = scene_descriptor(&Variant::from("res://scenes/main.tscn")).unwrap_err();
		assert!(matches!(err, Error::ProtocolError(_)));
	}

	#[test]
	fn test_incomplete_mapping_is_rejected() {
		let mut map = BTreeMap::new();
		map.insert("path".to_string(), Variant::from("res://scenes/main.tscn"));
		assert!(scene_descriptor(&Variant::from(map)).is_err());
	}
}
