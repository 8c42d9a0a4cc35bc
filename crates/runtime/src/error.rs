//! Error types for the PlayGodot runtime.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Longest rendering of call parameters kept in a [`CallContext`].
const MAX_PARAMS_LEN: usize = 200;

/// Diagnostic context attached to errors raised by a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
	/// Wire operation name.
	pub method: String,
	/// Compact rendering of the call parameters.
	pub params: String,
	/// Correlation id, absent for checks that never reached the wire.
	pub id: Option<u32>,
	/// Time from issuing the request to observing the failure.
	pub elapsed: Duration,
}

impl CallContext {
	pub fn new(
		method: impl Into<String>,
		params: &serde_json::Value,
		id: Option<u32>,
		elapsed: Duration,
	) -> Self {
		let mut params = params.to_string();
		if params.len() > MAX_PARAMS_LEN {
			let mut cut = MAX_PARAMS_LEN;
			while !params.is_char_boundary(cut) {
				cut -= 1;
			}
			params.truncate(cut);
			params.push_str("...");
		}
		Self {
			method: method.into(),
			params,
			id,
			elapsed,
		}
	}
}

impl fmt::Display for CallContext {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}({})", self.method, self.params)?;
		match self.id {
			Some(id) => write!(f, " [id={id}, {}ms]", self.elapsed.as_millis()),
			None => write!(f, " [{}ms]", self.elapsed.as_millis()),
		}
	}
}

/// Errors that can occur while automating a target.
///
/// Variants fall into three groups:
/// - terminal: the session is unusable afterwards ([`Error::is_terminal`])
/// - operation-level: local to one call, the session stays usable
/// - polling: [`Error::WaitTimeout`] from the condition waiter
#[derive(Debug, Error)]
pub enum Error {
	/// Target binary missing, not executable, or exited before becoming ready.
	#[error("Failed to launch target '{}': {reason}", binary.display())]
	LaunchFailed { binary: PathBuf, reason: String },

	/// Debug endpoint refused the connection or did not answer in time.
	#[error("Failed to connect to {endpoint}: {reason}")]
	ConnectFailed { endpoint: String, reason: String },

	/// The connection was closed locally while the call was in flight.
	#[error("Connection closed")]
	ConnectionClosed,

	/// Handshake reported an incompatible protocol version.
	#[error("Protocol mismatch (client speaks v{client}): {reason}")]
	ProtocolMismatch { client: u32, reason: String },

	/// Transport dropped or delivered a malformed frame.
	#[error("Session lost: {0}")]
	SessionLost(String),

	/// Request issued on a session that is closing or closed.
	#[error("Session closed")]
	SessionClosed,

	#[error("Node not found: {path} ({context})")]
	NodeNotFound {
		path: String,
		context: Box<CallContext>,
	},

	#[error("Property '{property}' not found on {path} ({context})")]
	PropertyNotFound {
		path: String,
		property: String,
		context: Box<CallContext>,
	},

	/// Target-side failure while invoking a method.
	#[error("Method '{method}' failed on {path}: {message} ({context})")]
	MethodError {
		path: String,
		method: String,
		message: String,
		context: Box<CallContext>,
	},

	#[error("Unknown key: '{0}'")]
	UnknownKey(String),

	#[error("No active scene ({context})")]
	NoActiveScene { context: Box<CallContext> },

	#[error("Scene reload failed: {message} ({context})")]
	ReloadFailed {
		message: String,
		context: Box<CallContext>,
	},

	#[error("Invalid time scale {0}: must be finite and greater than zero")]
	InvalidTimeScale(f64),

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	/// Condition did not hold before the deadline.
	#[error(
		"Timed out after {}ms waiting for {condition} (waited {}ms); last observed: {last_state}",
		timeout.as_millis(),
		elapsed.as_millis()
	)]
	WaitTimeout {
		condition: String,
		timeout: Duration,
		elapsed: Duration,
		last_state: String,
	},

	/// No reply to a single call within its deadline.
	#[error("Timeout: {0}")]
	Timeout(String),

	#[error("Failed to write screenshot to '{}': {source}", path.display())]
	ScreenshotWrite {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// Error reply whose kind has no dedicated variant.
	#[error("{kind}: {message} ({context})")]
	Remote {
		kind: String,
		message: String,
		detail: Option<String>,
		context: Box<CallContext>,
	},

	/// Reply payload did not have the expected shape.
	#[error("Protocol error: {0}")]
	ProtocolError(String),

	#[error("Transport error: {0}")]
	TransportError(String),

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("JSON error: {0}")]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// True for failures that end the session; retrying on the same session
	/// cannot succeed.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self,
			Error::ConnectFailed { .. }
				| Error::ConnectionClosed
				| Error::ProtocolMismatch { .. }
				| Error::SessionLost(_)
				| Error::SessionClosed
		)
	}

	/// Returns true if this is a timeout error.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_) | Error::WaitTimeout { .. })
	}

	/// Returns the target-reported error kind if this is a remote error.
	pub fn remote_kind(&self) -> Option<&str> {
		match self {
			Error::Remote { kind, .. } => Some(kind),
			_ => None,
		}
	}

	/// Returns the call context for errors that carry one.
	pub fn context(&self) -> Option<&CallContext> {
		match self {
			Error::NodeNotFound { context, .. }
			| Error::PropertyNotFound { context, .. }
			| Error::MethodError { context, .. }
			| Error::NoActiveScene { context }
			| Error::ReloadFailed { context, .. }
			| Error::Remote { context, .. } => Some(context),
			_ => None,
		}
	}
}
