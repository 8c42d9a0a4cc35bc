//! Guided tour of every automation feature against the tic-tac-toe project.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use colored::Colorize;
use playgodot::{Error, Godot, PNG_SIGNATURE, Variant};
use serde_json::{Value, json};

use crate::config::GAME_ROOT;
use crate::output::OutputFormat;

const STATUS_LABEL: &str = "/root/Game/VBoxContainer/StatusLabel";
const CELL_PATH: &str = "/root/Game/VBoxContainer/GameBoard/GridContainer/Cell";
/// Viewport centre of the bottom-right cell.
const CELL8_POSITION: (f64, f64) = (370.0, 525.0);
const WAIT: Duration = Duration::from_secs(2);

/// Narration goes to stdout in text mode; in json mode stdout carries only
/// the final envelope, so it goes to the log instead.
struct Tour {
	format: OutputFormat,
	screenshots: Vec<PathBuf>,
}

impl Tour {
	fn header(&self, title: &str) {
		match self.format {
			OutputFormat::Text => {
				let rule = "=".repeat(60);
				println!("\n{rule}\n  {}\n{rule}\n", title.bold());
			}
			OutputFormat::Json => tracing::info!("== {title} =="),
		}
	}

	fn say(&self, line: impl Display) {
		match self.format {
			OutputFormat::Text => println!("{line}"),
			OutputFormat::Json => tracing::info!("{line}"),
		}
	}

	fn show(&self, label: &str, value: impl Display) {
		self.say(format!("  {}: {value}", label.dimmed()));
	}
}

fn cell(index: usize) -> String {
	format!("{CELL_PATH}{index}")
}

async fn board(game: &Godot) -> Result<Variant> {
	Ok(game.call(GAME_ROOT, "get_board_state", &[]).await?)
}

async fn make_move(game: &Godot, index: i64) -> Result<()> {
	game.call(GAME_ROOT, "make_move", &[Variant::from(index)]).await?;
	Ok(())
}

/// Reloads the scene and waits until the game root is back.
async fn fresh_scene(game: &Godot) -> Result<()> {
	game.reload_scene().await?;
	game.wait_for_node(GAME_ROOT, WAIT).await?;
	Ok(())
}

pub async fn run(game: &Godot, out: &Path, format: OutputFormat) -> Result<Value> {
	let mut tour = Tour {
		format,
		screenshots: Vec::new(),
	};
	tokio::fs::create_dir_all(out)
		.await
		.with_context(|| format!("cannot create screenshot directory {}", out.display()))?;

	node_interaction(game, &tour).await?;
	node_queries(game, &tour).await?;
	input_simulation(game, &tour).await?;
	screenshots(game, &mut tour, out).await?;
	scene_management(game, &tour).await?;
	game_state(game, &tour).await?;
	waiting(game, &tour).await?;
	let winner = game_play(game, &mut tour, out).await?;

	tour.header("TOUR COMPLETE");
	tour.say(format!("{} every feature exercised", "ok".green().bold()));
	tour.show("screenshots", out.display());

	Ok(json!({ "winner": winner, "screenshots": tour.screenshots }))
}

async fn node_interaction(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("NODE INTERACTION");

	let node = game.get_node(GAME_ROOT).await?;
	tour.show("get_node", format!("{} (class: {})", node.name(), node.class()));

	tour.show("/root/Game exists", game.node_exists(GAME_ROOT).await?);
	tour.show("/root/NonExistent exists", game.node_exists("/root/NonExistent").await?);

	tour.show("/root/Game visible", game.get_property(GAME_ROOT, "visible").await?);
	tour.show("board", board(game).await?);
	tour.show("current player", game.call(GAME_ROOT, "get_current_player", &[]).await?);
	Ok(())
}

async fn node_queries(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("NODE QUERIES");

	let cells = game.query_nodes("*Cell*").await?;
	tour.say(format!("  {} nodes match '*Cell*':", cells.len()));
	for path in cells.iter().take(5) {
		tour.say(format!("    - {path}"));
	}
	if cells.len() > 5 {
		tour.say(format!("    ... and {} more", cells.len() - 5));
	}

	tour.show("buttons", game.count_nodes("*Button*").await?);
	tour.show("labels", game.count_nodes("*Label*").await?);
	Ok(())
}

async fn input_simulation(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("INPUT SIMULATION");

	game.click(cell(0)).await?;
	tour.show("after clicking Cell0", board(game).await?);

	let (x, y) = CELL8_POSITION;
	game.click_at(x, y).await?;
	tour.show(&format!("after clicking ({x}, {y})"), board(game).await?);

	game.press_key("r").await?;
	tour.show("after pressing R", board(game).await?);
	Ok(())
}

async fn screenshots(game: &Godot, tour: &mut Tour, out: &Path) -> Result<()> {
	tour.header("SCREENSHOTS");

	for index in [0, 4, 8] {
		make_move(game, index).await?;
	}

	let path = out.join("game_state.png");
	let png = game.screenshot(Some(&path)).await?;
	tour.show("saved", format!("{} ({} bytes)", path.display(), png.len()));
	tour.screenshots.push(path);

	let png = game.screenshot(None).await?;
	tour.show("in memory", format!("{} bytes", png.len()));
	if !png.is_empty() {
		tour.show("PNG signature", png.starts_with(&PNG_SIGNATURE));
	}
	Ok(())
}

async fn scene_management(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("SCENE MANAGEMENT");

	let scene = game.get_current_scene().await?;
	tour.show("current scene", format!("{} ({})", scene.name, scene.path));

	let before = game.get_node(GAME_ROOT).await?;
	make_move(game, 4).await?;
	fresh_scene(game).await?;
	tour.show("board after reload", board(game).await?);

	match game.resolve(&before).await {
		Err(Error::NodeNotFound { .. }) => tour.say("  handle taken before the reload is stale"),
		Ok(_) => tour.say("  handle taken before the reload still resolves"),
		Err(e) => return Err(e.into()),
	}
	Ok(())
}

async fn game_state(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("GAME STATE CONTROL");

	game.pause().await?;
	tour.show("paused", game.is_paused().await?);
	game.unpause().await?;
	tour.show("paused", game.is_paused().await?);

	for scale in [0.5, 2.0, 1.0] {
		game.set_time_scale(scale).await?;
		tour.show("time scale", game.get_time_scale().await?);
	}
	Ok(())
}

async fn waiting(game: &Godot, tour: &Tour) -> Result<()> {
	tour.header("WAITING");

	let node = game.wait_for_node(GAME_ROOT, WAIT).await?;
	tour.show("wait_for_node", node.name());

	game.wait_for_visible(STATUS_LABEL, WAIT).await?;
	tour.say("  StatusLabel is visible");

	make_move(game, 2).await?;
	game.reload_scene().await?;
	game.wait_for_condition(
		|| async {
			let cells: Vec<String> = game.call_as(GAME_ROOT, "get_board_state", &[]).await?;
			Ok::<_, Error>(cells.iter().all(String::is_empty))
		},
		Duration::from_secs(5),
	)
	.await?;
	tour.say("  board is empty after reload");
	Ok(())
}

async fn game_play(game: &Godot, tour: &mut Tour, out: &Path) -> Result<String> {
	tour.header("COMPLETE GAME");

	fresh_scene(game).await?;
	for (index, player) in [(0, "X"), (3, "O"), (1, "X"), (4, "O"), (2, "X")] {
		make_move(game, index).await?;
		tour.show(&format!("{player} plays {index}"), board(game).await?);
	}

	let active: bool = game.call_as(GAME_ROOT, "is_game_active", &[]).await?;
	let winner: String = game.call_as(GAME_ROOT, "get_winner", &[]).await?;
	tour.show("game active", active);
	tour.show("winner", &winner);
	ensure!(winner == "X", "expected X to win the top row, target reports '{winner}'");

	let path = out.join("game_won.png");
	game.screenshot(Some(&path)).await?;
	tour.show("final screenshot", path.display());
	tour.screenshots.push(path);
	Ok(winner)
}
