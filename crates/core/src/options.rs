//! Launch and session configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default deadline for launch + handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default deadline for a single command.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default delay between condition checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Default time the target gets to exit on its own during teardown.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Debug channel variant used to reach the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TransportMode {
	/// Framed messages over the target's stdin/stdout.
	#[default]
	Pipe,
	/// The target dials back into a local listener. Port 0 picks a free port.
	Tcp {
		#[serde(default)]
		port: u16,
	},
}

impl TransportMode {
	/// Command-line flag telling the target which channel to open.
	pub(crate) fn flag(&self, bound_port: Option<u16>) -> Vec<String> {
		match self {
			Self::Pipe => vec!["--automation-pipe".to_string()],
			Self::Tcp { port } => vec![
				"--remote-debug".to_string(),
				format!("tcp://127.0.0.1:{}", bound_port.unwrap_or(*port)),
			],
		}
	}
}

impl fmt::Display for TransportMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Pipe => f.write_str("pipe"),
			Self::Tcp { port: 0 } => f.write_str("tcp"),
			Self::Tcp { port } => write!(f, "tcp:{port}"),
		}
	}
}

impl FromStr for TransportMode {
	type Err = String;

	/// Parses `pipe`, `tcp` or `tcp:<port>`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.split_once(':') {
			None if s.eq_ignore_ascii_case("pipe") => Ok(Self::Pipe),
			None if s.eq_ignore_ascii_case("tcp") => Ok(Self::Tcp { port: 0 }),
			Some((mode, port)) if mode.eq_ignore_ascii_case("tcp") => port
				.parse()
				.map(|port| Self::Tcp { port })
				.map_err(|e| format!("invalid port '{port}': {e}")),
			_ => Err(format!(
				"unknown transport '{s}' (expected pipe, tcp or tcp:<port>)"
			)),
		}
	}
}

/// Options controlling how a target is launched and how the session behaves.
///
/// Deserializable from JSON; durations are given in milliseconds and every
/// field is optional:
///
/// ```json
/// { "binary": "/opt/godot-automation", "headless": true, "timeout_ms": 15000,
///   "transport": { "mode": "tcp", "port": 6007 }, "ready_node": "/root/Game" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchOptions {
	/// Path of the automation-enabled engine binary.
	pub binary: Option<PathBuf>,
	/// Suppress windowed output.
	pub headless: bool,
	/// Enable engine diagnostics and forward its stderr.
	pub verbose: bool,
	/// Deadline for launch, connection and handshake.
	#[serde(rename = "timeout_ms", with = "duration_ms")]
	pub timeout: Duration,
	/// Per-command deadline.
	#[serde(rename = "call_timeout_ms", with = "duration_ms")]
	pub call_timeout: Duration,
	/// Delay between condition checks.
	#[serde(rename = "poll_interval_ms", with = "duration_ms")]
	pub poll_interval: Duration,
	/// How long teardown waits for the target to exit before killing it.
	#[serde(rename = "grace_period_ms", with = "duration_ms")]
	pub grace_period: Duration,
	pub transport: TransportMode,
	/// Node that must exist before the session is handed out.
	pub ready_node: Option<String>,
	/// Extra arguments appended after the generated ones.
	pub extra_args: Vec<String>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			binary: None,
			headless: true,
			verbose: false,
			timeout: DEFAULT_TIMEOUT,
			call_timeout: DEFAULT_CALL_TIMEOUT,
			poll_interval: DEFAULT_POLL_INTERVAL,
			grace_period: DEFAULT_GRACE_PERIOD,
			transport: TransportMode::default(),
			ready_node: None,
			extra_args: Vec::new(),
		}
	}
}

impl LaunchOptions {
	/// Creates a new builder for configuring launch options.
	pub fn builder() -> LaunchOptionsBuilder {
		LaunchOptionsBuilder::default()
	}
}

/// Builder for [`LaunchOptions`].
#[derive(Debug, Clone, Default)]
pub struct LaunchOptionsBuilder {
	options: LaunchOptions,
}

impl LaunchOptionsBuilder {
	/// Sets the engine binary.
	pub fn binary(mut self, path: impl Into<PathBuf>) -> Self {
		self.options.binary = Some(path.into());
		self
	}

	pub fn headless(mut self, value: bool) -> Self {
		self.options.headless = value;
		self
	}

	pub fn verbose(mut self, value: bool) -> Self {
		self.options.verbose = value;
		self
	}

	/// Sets the launch + handshake deadline.
	pub fn timeout(mut self, value: Duration) -> Self {
		self.options.timeout = value;
		self
	}

	pub fn call_timeout(mut self, value: Duration) -> Self {
		self.options.call_timeout = value;
		self
	}

	pub fn poll_interval(mut self, value: Duration) -> Self {
		self.options.poll_interval = value;
		self
	}

	pub fn grace_period(mut self, value: Duration) -> Self {
		self.options.grace_period = value;
		self
	}

	pub fn transport(mut self, value: TransportMode) -> Self {
		self.options.transport = value;
		self
	}

	/// Waits for this node after the handshake before returning the session.
	pub fn ready_node(mut self, path: impl Into<String>) -> Self {
		self.options.ready_node = Some(path.into());
		self
	}

	pub fn arg(mut self, arg: impl Into<String>) -> Self {
		self.options.extra_args.push(arg.into());
		self
	}

	/// Builds the options.
	pub fn build(self) -> LaunchOptions {
		self.options
	}
}

mod duration_ms {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_u64(value.as_millis() as u64)
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
		u64::deserialize(deserializer).map(Duration::from_millis)
	}
}
