//! Protocol version exchange.

use std::sync::atomic::Ordering;
use std::time::Duration;

use playgodot_protocol::methods::HANDSHAKE;
use playgodot_protocol::{Hello, HelloAck, PROTOCOL_VERSION};

use super::Connection;
use crate::error::{Error, Result};
use crate::lifecycle::SessionState;

impl Connection {
	/// Performs the version handshake. Must run once, before any command.
	///
	/// On success the session becomes [`SessionState::Ready`]. An error reply,
	/// an unreadable acknowledgement or a version mismatch closes the
	/// connection and fails with [`Error::ProtocolMismatch`].
	pub async fn handshake(&self, client: &str, timeout: Duration) -> Result<HelloAck> {
		if self.handshake_started.swap(true, Ordering::AcqRel) {
			return Err(Error::ProtocolError(
				"handshake already performed on this connection".to_string(),
			));
		}
		self.lifecycle.advance(SessionState::Handshaking);

		let hello = serde_json::to_value(Hello::new(client))?;
		let reply = match self.send_message(HANDSHAKE, hello, Some(timeout)).await {
			Ok(reply) => reply,
			Err(Error::Remote { kind, message, .. }) => {
				return Err(self.reject(format!("target refused handshake: {kind}: {message}")));
			}
			Err(e) => {
				self.close();
				return Err(e);
			}
		};

		let ack: HelloAck = match serde_json::from_value(reply) {
			Ok(ack) => ack,
			Err(e) => return Err(self.reject(format!("unreadable handshake reply: {e}"))),
		};

		if !ack.is_compatible() {
			return Err(self.reject(format!(
				"target '{}' speaks v{}",
				ack.server, ack.protocol_version
			)));
		}

		self.lifecycle.advance(SessionState::Ready);
		tracing::info!(
			server = %ack.server,
			version = ack.protocol_version,
			capabilities = ?ack.capabilities,
			"handshake complete"
		);
		Ok(ack)
	}

	fn reject(&self, reason: String) -> Error {
		tracing::error!(%reason, "handshake rejected");
		self.close();
		Error::ProtocolMismatch {
			client: PROTOCOL_VERSION,
			reason,
		}
	}
}
