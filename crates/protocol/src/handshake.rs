//! Capability/version exchange performed once per connection.
//!
//! ```text
//! Client                                         Target
//!   |  -- handshake { protocol_version, client } -->  |
//!   |  <-- { protocol_version, server, capabilities } |
//! ```
//!
//! The versions must match exactly; anything else closes the session.

use serde::{Deserialize, Serialize};

/// Protocol version spoken by this client.
pub const PROTOCOL_VERSION: u32 = 1;

/// First request sent after the connection is established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
	pub protocol_version: u32,
	/// Client identifier, e.g. `playgodot-rs/0.3.0`.
	pub client: String,
}

impl Hello {
	pub fn new(client: impl Into<String>) -> Self {
		Self {
			protocol_version: PROTOCOL_VERSION,
			client: client.into(),
		}
	}
}

/// Target reply to [`Hello`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloAck {
	pub protocol_version: u32,
	/// Target identifier, e.g. `godot/4.3-automation`.
	#[serde(default)]
	pub server: String,
	#[serde(default)]
	pub capabilities: Vec<String>,
}

impl HelloAck {
	pub fn is_compatible(&self) -> bool {
		self.protocol_version == PROTOCOL_VERSION
	}
}
