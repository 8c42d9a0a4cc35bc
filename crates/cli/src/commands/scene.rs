use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use playgodot::Godot;
use serde_json::{Value, json};

use crate::config::GAME_ROOT;

pub async fn screenshot(game: &Godot, output: Option<&Path>) -> Result<Value> {
	let png = game.screenshot(output).await?;
	Ok(match output {
		Some(path) => json!({ "path": path, "bytes": png.len() }),
		None => json!({ "bytes": png.len() }),
	})
}

pub async fn current(game: &Godot) -> Result<Value> {
	let scene = game.get_current_scene().await?;
	Ok(serde_json::to_value(scene)?)
}

/// Reloads and, when the scene has the usual root, waits for it to come back.
pub async fn reload(game: &Godot) -> Result<Value> {
	let had_root = game.node_exists(GAME_ROOT).await?;
	game.reload_scene().await?;
	if had_root {
		game.wait_for_node(GAME_ROOT, Duration::from_secs(5)).await?;
	}
	current(game).await
}
