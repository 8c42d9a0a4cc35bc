//! Result printing.
//!
//! In `json` mode every command prints one envelope on stdout:
//!
//! ```json
//! { "ok": true, "command": "get", "data": "X's Turn", "duration_ms": 12 }
//! ```
//!
//! and on failure:
//!
//! ```json
//! { "ok": false, "command": "get", "error": { "code": "NODE_NOT_FOUND", "message": "..." } }
//! ```
//!
//! `text` mode prints only the data, in a shell-friendly form.

use std::time::Duration;

use colored::Colorize;
use playgodot::Error;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
	/// Plain values, one per line
	#[default]
	Text,
	/// One JSON envelope per command
	Json,
}

#[derive(Debug, Serialize)]
pub struct CommandResult<'a> {
	pub ok: bool,
	pub command: &'a str,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub data: Option<Value>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<CommandError>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub duration_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CommandError {
	pub code: &'static str,
	pub message: String,
}

impl CommandError {
	pub fn from_anyhow(err: &anyhow::Error) -> Self {
		Self {
			code: err.downcast_ref::<Error>().map_or("INTERNAL_ERROR", error_code),
			message: format!("{err:#}"),
		}
	}
}

/// Stable machine-readable code for each error kind.
pub fn error_code(err: &Error) -> &'static str {
	match err {
		Error::LaunchFailed { .. } => "LAUNCH_FAILED",
		Error::ConnectFailed { .. } => "CONNECT_FAILED",
		Error::ConnectionClosed | Error::SessionClosed => "SESSION_CLOSED",
		Error::ProtocolMismatch { .. } => "PROTOCOL_MISMATCH",
		Error::SessionLost(_) => "SESSION_LOST",
		Error::NodeNotFound { .. } => "NODE_NOT_FOUND",
		Error::PropertyNotFound { .. } => "PROPERTY_NOT_FOUND",
		Error::MethodError { .. } => "METHOD_ERROR",
		Error::UnknownKey(_) => "UNKNOWN_KEY",
		Error::NoActiveScene { .. } => "NO_ACTIVE_SCENE",
		Error::ReloadFailed { .. } => "RELOAD_FAILED",
		Error::InvalidTimeScale(_) | Error::InvalidArgument(_) => "INVALID_INPUT",
		Error::WaitTimeout { .. } | Error::Timeout(_) => "TIMEOUT",
		Error::ScreenshotWrite { .. } | Error::Io(_) => "IO_ERROR",
		Error::Remote { .. } => "REMOTE_ERROR",
		Error::ProtocolError(_) | Error::TransportError(_) | Error::Json(_) => "PROTOCOL_ERROR",
	}
}

pub fn print_success(command: &str, data: Value, elapsed: Duration, format: OutputFormat) {
	match format {
		OutputFormat::Json => {
			let result = CommandResult {
				ok: true,
				command,
				data: Some(data),
				error: None,
				duration_ms: Some(elapsed.as_millis() as u64),
			};
			if let Ok(json) = serde_json::to_string_pretty(&result) {
				println!("{json}");
			}
		}
		OutputFormat::Text => print_text(&data),
	}
}

pub fn print_failure(command: &str, err: &anyhow::Error, format: OutputFormat) {
	let error = CommandError::from_anyhow(err);
	eprintln!("{} [{}]: {}", "error".red().bold(), error.code, error.message);

	if format == OutputFormat::Json {
		let result = CommandResult {
			ok: false,
			command,
			data: None,
			error: Some(error),
			duration_ms: None,
		};
		if let Ok(json) = serde_json::to_string_pretty(&result) {
			println!("{json}");
		}
	}
}

fn print_text(data: &Value) {
	match data {
		Value::Null => {}
		Value::String(s) => println!("{s}"),
		Value::Array(items) if items.iter().all(Value::is_string) => {
			for item in items {
				if let Some(s) = item.as_str() {
					println!("{s}");
				}
			}
		}
		other => match serde_json::to_string_pretty(other) {
			Ok(json) => println!("{json}"),
			Err(_) => println!("{other}"),
		},
	}
}
