//! Resolves [`LaunchOptions`] from `--config` and command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use playgodot::LaunchOptions;

use crate::cli::SessionArgs;

/// Root of the tic-tac-toe scene. `demo` waits for it before starting and
/// `reload` waits for it to come back.
pub const GAME_ROOT: &str = "/root/Game";

pub fn load_file(path: &Path) -> Result<LaunchOptions> {
	let raw = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read config file {}", path.display()))?;
	serde_json::from_str(&raw).with_context(|| format!("invalid config file {}", path.display()))
}

/// File values first, then every flag that was given.
pub fn resolve(args: &SessionArgs, verbose: u8) -> Result<LaunchOptions> {
	let mut options = match &args.config {
		Some(path) => load_file(path)?,
		None => LaunchOptions::default(),
	};

	if let Some(binary) = &args.godot_path {
		options.binary = Some(binary.clone());
	}
	if let Some(headless) = args.headless {
		options.headless = headless;
	}
	if let Some(ms) = args.timeout {
		options.timeout = Duration::from_millis(ms);
	}
	if let Some(transport) = args.transport {
		options.transport = transport;
	}
	if verbose > 0 {
		options.verbose = true;
	}
	Ok(options)
}
