//! Command execution: open a session, run one command, tear down.

mod demo;
mod inspect;
mod interact;
mod scene;

use std::time::Instant;

use anyhow::{Context, Result, bail};
use playgodot::{Godot, LaunchOptions};
use serde_json::Value;

use crate::cli::{Cli, Commands, SessionArgs};
use crate::config::{self, GAME_ROOT};
use crate::output::{self, OutputFormat};

/// Wire-facing name of a command, used in output envelopes.
pub fn command_name(command: &Commands) -> &'static str {
	match command {
		Commands::Call { .. } => "call",
		Commands::Get { .. } => "get",
		Commands::Query { .. } => "query",
		Commands::Click(_) => "click",
		Commands::Key { .. } => "key",
		Commands::Screenshot { .. } => "screenshot",
		Commands::Scene => "scene",
		Commands::Reload => "reload",
		Commands::Demo { .. } => "demo",
	}
}

/// Runs the parsed command line. Returns whether it succeeded; failures have
/// already been reported.
pub async fn dispatch(cli: Cli) -> bool {
	let name = command_name(&cli.command);
	let format = cli.format;
	let started = Instant::now();

	match execute(cli).await {
		Ok(data) => {
			output::print_success(name, data, started.elapsed(), format);
			true
		}
		Err(err) => {
			output::print_failure(name, &err, format);
			false
		}
	}
}

/// Launch options for `cli`; the demo waits for the game root unless told
/// otherwise.
fn session_options(cli: &Cli) -> Result<LaunchOptions> {
	let mut options = config::resolve(&cli.session, cli.verbose)?;
	if matches!(cli.command, Commands::Demo { .. }) && options.ready_node.is_none() {
		options.ready_node = Some(GAME_ROOT.to_string());
	}
	Ok(options)
}

async fn execute(cli: Cli) -> Result<Value> {
	let options = session_options(&cli)?;
	let game = open(&cli.session, options).await?;
	let result = run(&game, cli.command, cli.format).await;
	if let Err(e) = game.close().await {
		tracing::warn!("session teardown failed: {e}");
	}
	result
}

async fn open(args: &SessionArgs, options: LaunchOptions) -> Result<Godot> {
	if let Some(endpoint) = &args.attach {
		tracing::info!(%endpoint, "attaching");
		return Godot::attach(endpoint, options)
			.await
			.with_context(|| format!("could not attach to {endpoint}"));
	}
	if options.binary.is_none() {
		bail!("no engine binary: pass --godot-path, set GODOT_PATH, or name one in --config");
	}
	tracing::info!(project = %args.project.display(), "launching");
	Ok(Godot::launch(&args.project, options).await?)
}

async fn run(game: &Godot, command: Commands, format: OutputFormat) -> Result<Value> {
	match command {
		Commands::Call { path, method, args } => inspect::call(game, &path, &method, &args).await,
		Commands::Get { path, property } => inspect::get(game, &path, &property).await,
		Commands::Query { pattern, count } => inspect::query(game, &pattern, count).await,
		Commands::Click(args) => interact::click(game, args).await,
		Commands::Key { name } => interact::key(game, &name).await,
		Commands::Screenshot { output } => scene::screenshot(game, output.as_deref()).await,
		Commands::Scene => scene::current(game).await,
		Commands::Reload => scene::reload(game).await,
		Commands::Demo { out } => demo::run(game, &out, format).await,
	}
}
