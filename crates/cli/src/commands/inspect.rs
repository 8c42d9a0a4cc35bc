use anyhow::{Context, Result};
use playgodot::{Godot, Variant};
use serde_json::{Value, json};

/// Reads one command-line argument as JSON, falling back to a plain string so
/// `call /root/Game greet Alice` works without quoting.
pub(crate) fn parse_arg(raw: &str) -> Result<Variant> {
	let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
	serde_json::from_value(value).with_context(|| format!("argument '{raw}' is not a valid value"))
}

pub async fn call(game: &Godot, path: &str, method: &str, raw_args: &[String]) -> Result<Value> {
	let args = raw_args
		.iter()
		.map(|raw| parse_arg(raw))
		.collect::<Result<Vec<_>>>()?;
	let result = game.call(path, method, &args).await?;
	Ok(serde_json::to_value(result)?)
}

pub async fn get(game: &Godot, path: &str, property: &str) -> Result<Value> {
	let value = game.get_property(path, property).await?;
	Ok(serde_json::to_value(value)?)
}

pub async fn query(game: &Godot, pattern: &str, count_only: bool) -> Result<Value> {
	if count_only {
		return Ok(json!(game.count_nodes(pattern).await?));
	}
	Ok(json!(game.query_nodes(pattern).await?))
}
