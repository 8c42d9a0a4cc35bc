use anyhow::Result;
use playgodot::{ClickTarget, Godot, Vector2};
use serde_json::Value;

use crate::cli::ClickArgs;

pub async fn click(game: &Godot, args: ClickArgs) -> Result<Value> {
	let target = match (args.path, args.at) {
		(Some(path), _) => ClickTarget::Node(path),
		(None, Some((x, y))) => ClickTarget::Position(Vector2::new(x, y)),
		(None, None) => anyhow::bail!("click needs a node path or --at x,y"),
	};
	game.click(target).await?;
	Ok(Value::Null)
}

pub async fn key(game: &Godot, name: &str) -> Result<Value> {
	game.press_key(name).await?;
	Ok(Value::Null)
}
