//! Command-line surface.

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Args, Parser, Subcommand};
use playgodot::TransportMode;

use crate::output::OutputFormat;

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default().bold())
		.usage(AnsiColor::Yellow.on_default().bold())
		.literal(AnsiColor::Blue.on_default().bold())
		.placeholder(AnsiColor::Blue.on_default())
		.valid(AnsiColor::Green.on_default())
}

#[derive(Parser, Debug)]
#[command(name = "playgodot")]
#[command(about = "Drive an automation-enabled Godot build from the command line")]
#[command(version)]
#[command(styles = styles())]
pub struct Cli {
	/// Increase verbosity (-v info, -vv every protocol message)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Output format for command results
	#[arg(short = 'f', long, global = true, value_enum, default_value = "text")]
	pub format: OutputFormat,

	#[command(flatten)]
	pub session: SessionArgs,

	#[command(subcommand)]
	pub command: Commands,
}

/// How to reach the target. Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct SessionArgs {
	/// Automation-enabled engine binary
	#[arg(long, global = true, env = "GODOT_PATH", value_name = "PATH")]
	pub godot_path: Option<PathBuf>,

	/// Project directory to run
	#[arg(long, global = true, value_name = "DIR", default_value = ".")]
	pub project: PathBuf,

	/// Run with or without a window (`--headless=false` shows it)
	#[arg(
		long,
		global = true,
		num_args = 0..=1,
		require_equals = true,
		default_missing_value = "true",
		value_name = "BOOL"
	)]
	pub headless: Option<bool>,

	/// Launch and handshake deadline in milliseconds
	#[arg(long, global = true, value_name = "MS")]
	pub timeout: Option<u64>,

	/// Debug channel: pipe, tcp or tcp:<port>
	#[arg(long, global = true, value_name = "MODE")]
	pub transport: Option<TransportMode>,

	/// Attach to a target already listening at host:port instead of launching
	#[arg(long, global = true, value_name = "HOST:PORT")]
	pub attach: Option<String>,

	/// JSON file with launch options
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Call a method on a node; arguments are JSON (bare words become strings)
	Call {
		path: String,
		method: String,
		args: Vec<String>,
	},

	/// Read a node property
	Get { path: String, property: String },

	/// List node paths matching a glob pattern
	Query {
		pattern: String,

		/// Print only the number of matches
		#[arg(long)]
		count: bool,
	},

	/// Click a node, or a viewport position with --at
	Click(ClickArgs),

	/// Press and release a key by name
	Key { name: String },

	/// Capture the viewport as PNG
	Screenshot {
		/// Output file (prints the byte count when omitted)
		output: Option<PathBuf>,
	},

	/// Show the current scene
	Scene,

	/// Reload the current scene
	Reload,

	/// Walk through every automation feature on the tic-tac-toe project
	Demo {
		/// Directory for the screenshots taken along the way
		#[arg(long, value_name = "DIR", default_value = "screenshots")]
		out: PathBuf,
	},
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ClickArgs {
	/// Node to click
	pub path: Option<String>,

	/// Viewport position as x,y
	#[arg(long, value_name = "X,Y", value_parser = parse_position)]
	pub at: Option<(f64, f64)>,
}

fn parse_position(s: &str) -> Result<(f64, f64), String> {
	let (x, y) = s
		.split_once(',')
		.ok_or_else(|| format!("expected x,y but got '{s}'"))?;
	let parse = |v: &str| {
		v.trim()
			.parse::<f64>()
			.map_err(|e| format!("invalid coordinate '{v}': {e}"))
	};
	Ok((parse(x)?, parse(y)?))
}
