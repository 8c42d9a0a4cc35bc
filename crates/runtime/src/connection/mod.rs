//! Request/response correlation layer for the automation protocol.
//!
//! This module implements the protocol session on top of the transport.
//! It handles:
//! - Generating unique request IDs
//! - Correlating responses with pending requests
//! - Distinguishing events from responses and routing them to subscribers
//! - Failing every outstanding call when the transport goes away
//!
//! # Message Flow
//!
//! 1. Client calls `send_message()` with a method and params
//! 2. Connection generates unique ID and creates a pending slot
//! 3. Request is serialized and queued for the writer task
//! 4. Client awaits on the slot
//! 5. Message loop receives a response from the transport
//! 6. Response is correlated by ID and the slot is filled
//! 7. Client receives result

mod events;
mod handshake;
mod pending;


use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex as ParkingLotMutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

pub use self::events::EventStream;
use self::events::Subscribers;
use self::pending::{CancelGuard, PendingCalls, Reply};
use crate::error::{CallContext, Error, Result};
use crate::lifecycle::{Lifecycle, SessionState};
use crate::transport::{Transport, TransportParts, TransportReceiver};

/// Protocol request message sent to the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	/// Unique request ID for correlating responses
	pub id: u32,
	/// Operation name
	pub method: String,
	/// Operation parameters as JSON object
	#[serde(default)]
	pub params: Value,
}

/// Protocol response message from the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	/// Request ID this response correlates to
	pub id: u32,
	/// Success result (mutually exclusive with error)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub result: Option<Value>,
	/// Error result (mutually exclusive with result)
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<ErrorPayload>,
}

/// Target-reported error details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
	/// Error kind (`NodeNotFound`, `MethodError`, ...)
	#[serde(default = "default_error_kind")]
	pub kind: String,
	/// Human-readable message
	pub message: String,
	/// Target-side detail such as a script backtrace
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub detail: Option<String>,
}

fn default_error_kind() -> String {
	"Error".to_string()
}

/// Unsolicited message from the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
	/// Event category (`scene_changed`, ...)
	pub event: String,
	/// Event parameters
	#[serde(default)]
	pub params: Value,
}

/// Discriminated union of inbound protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Message {
	/// Response message (has `id` field)
	Response(Response),
	/// Event message (has `event` field, no `id`)
	Event(Event),
	/// Unknown message type (forward-compatible catch-all)
	Unknown(Value),
}

/// Client identifier sent during the handshake.
pub const CLIENT_INFO: &str = concat!("playgodot-rs/", env!("CARGO_PKG_VERSION"));

/// One-shot pieces consumed by [`Connection::run`].
struct RunParts {
	sender: Box<dyn Transport>,
	receiver: Box<dyn TransportReceiver>,
	message_rx: mpsc::UnboundedReceiver<Value>,
	outbound_rx: mpsc::UnboundedReceiver<Value>,
}

/// Protocol session over one transport.
///
/// Manages request/response correlation and event dispatch.
/// Uses sequential request IDs and oneshot channels for correlation.
pub struct Connection {
	/// Sequential request ID counter
	last_id: AtomicU32,
	/// Pending request slots keyed by request ID
	pending: Arc<PendingCalls>,
	/// Event subscribers
	subscribers: Subscribers,
	/// Channel for sending outbound messages to the writer task
	outbound_tx: mpsc::UnboundedSender<Value>,
	/// Transport halves and queues, taken by run()
	run_parts: TokioMutex<Option<RunParts>>,
	/// Reader/writer tasks, aborted on close
	tasks: ParkingLotMutex<Vec<AbortHandle>>,
	/// Shared session state
	lifecycle: Arc<Lifecycle>,
	/// Set once the handshake has been attempted
	handshake_started: AtomicBool,
}

impl Connection {
	/// Create a new Connection with the given transport.
	pub fn new(parts: TransportParts) -> Self {
		Self::with_lifecycle(parts, Arc::new(Lifecycle::new(SessionState::Handshaking)))
	}

	/// Create a Connection that reports into an existing lifecycle.
	pub fn with_lifecycle(parts: TransportParts, lifecycle: Arc<Lifecycle>) -> Self {
		let TransportParts {
			sender,
			receiver,
			message_rx,
		} = parts;

		let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

		Self {
			last_id: AtomicU32::new(1),
			pending: Arc::new(PendingCalls::default()),
			subscribers: Subscribers::default(),
			outbound_tx,
			run_parts: TokioMutex::new(Some(RunParts {
				sender,
				receiver,
				message_rx,
				outbound_rx,
			})),
			tasks: ParkingLotMutex::new(Vec::new()),
			lifecycle,
			handshake_started: AtomicBool::new(false),
		}
	}

	pub fn lifecycle(&self) -> &Arc<Lifecycle> {
		&self.lifecycle
	}

	pub fn state(&self) -> SessionState {
		self.lifecycle.current()
	}

	/// Number of requests still awaiting a response.
	pub fn pending_count(&self) -> usize {
		self.pending.len()
	}

	/// Subscribe to events of one category.
	pub fn subscribe(&self, category: impl Into<String>) -> EventStream {
		self.subscribers.add(Some(category.into()))
	}

	/// Subscribe to every event.
	pub fn subscribe_all(&self) -> EventStream {
		self.subscribers.add(None)
	}

	/// Sends a request to the target and awaits its response.
	///
	/// Fails immediately with [`Error::SessionClosed`] once the session is
	/// closing, without touching the transport. With a `timeout`, an
	/// unanswered call fails with [`Error::Timeout`] and its slot is released.
	pub async fn send_message(
		&self,
		method: &str,
		params: Value,
		timeout: Option<Duration>,
	) -> Result<Value> {
		if self.state().is_shutting_down() {
			return Err(Error::SessionClosed);
		}

		let id = self.last_id.fetch_add(1, Ordering::SeqCst);
		let started = Instant::now();
		let rx = self.pending.insert(id);
		let mut guard = CancelGuard::new(id, &self.pending);

		// close() may have drained the table between the check and the insert.
		if self.state().is_shutting_down() {
			return Err(Error::SessionClosed);
		}

		let request = Request {
			id,
			method: method.to_string(),
			params,
		};
		let request_value = serde_json::to_value(&request)?;
		tracing::debug!(id, method, "sending request");

		if self.outbound_tx.send(request_value).is_err() {
			tracing::error!("Failed to queue message: outbound channel closed");
			return Err(Error::SessionClosed);
		}

		let context =
			|| Box::new(CallContext::new(method, &request.params, Some(id), started.elapsed()));

		let reply = match timeout {
			Some(limit) => match tokio::time::timeout(limit, rx).await {
				Ok(reply) => reply,
				Err(_) => {
					return Err(Error::Timeout(format!(
						"no reply within {}ms to {}",
						limit.as_millis(),
						context()
					)));
				}
			},
			None => rx.await,
		};
		guard.complete();

		match reply {
			Ok(Reply::Value(value)) => {
				tracing::debug!(id, method, elapsed_ms = started.elapsed().as_millis() as u64, "received reply");
				Ok(value)
			}
			Ok(Reply::Remote(payload)) => Err(Error::Remote {
				kind: payload.kind,
				message: payload.message,
				detail: payload.detail,
				context: context(),
			}),
			Ok(Reply::Failed(error)) => Err(error),
			Err(_) => Err(Error::SessionLost(format!(
				"pending slot dropped for {}",
				context()
			))),
		}
	}

	/// Sends a request with serializable params and decodes the result.
	pub async fn send<P: Serialize, R: DeserializeOwned>(
		&self,
		method: &str,
		params: P,
		timeout: Option<Duration>,
	) -> Result<R> {
		let params_value = serde_json::to_value(params)?;
		let response = self.send_message(method, params_value, timeout).await?;
		serde_json::from_value(response).map_err(Into::into)
	}

	/// Run the message dispatch loop.
	///
	/// Returns once the transport has ended, after every outstanding call has
	/// been failed and the session marked closed.
	pub async fn run(self: &Arc<Self>) {
		let Some(parts) = self.run_parts.lock().await.take() else {
			tracing::warn!("Connection::run called more than once; ignoring");
			return;
		};
		let RunParts {
			mut sender,
			receiver,
			mut message_rx,
			mut outbound_rx,
		} = parts;

		let reader_handle = tokio::spawn(receiver.run());

		let writer_conn = Arc::clone(self);
		let writer_handle = tokio::spawn(async move {
			while let Some(message) = outbound_rx.recv().await {
				if let Err(e) = sender.send(message).await {
					tracing::error!("Transport write error: {}", e);
					writer_conn.lose(format!("write failed: {e}"));
					break;
				}
			}
		});

		{
			let mut tasks = self.tasks.lock();
			tasks.push(reader_handle.abort_handle());
			tasks.push(writer_handle.abort_handle());
		}
		// close() could have run before the tasks were registered.
		if self.state().is_shutting_down() {
			reader_handle.abort();
			writer_handle.abort();
		}

		while let Some(message_value) = message_rx.recv().await {
			match serde_json::from_value::<Message>(message_value) {
				Ok(message) => self.dispatch_internal(message),
				Err(e) => tracing::warn!("Failed to parse message: {}", e),
			}
		}

		let reason = match reader_handle.await {
			Ok(Ok(())) => "target closed the connection".to_string(),
			Ok(Err(e)) => e.to_string(),
			Err(e) if e.is_cancelled() => "connection closed".to_string(),
			Err(e) => format!("transport reader failed: {e}"),
		};
		writer_handle.abort();
		self.lose(reason);
	}

	/// Dispatch an incoming message (test-only public version)
	#[cfg(test)]
	pub fn dispatch(&self, message: Message) {
		self.dispatch_internal(message)
	}

	fn dispatch_internal(&self, message: Message) {
		match message {
			Message::Response(response) => {
				let id = response.id;
				let reply = match response.error {
					Some(error) => Reply::Remote(error),
					None => Reply::Value(response.result.unwrap_or(Value::Null)),
				};
				if !self.pending.complete(id, reply) {
					tracing::warn!(id, "Response for unknown or cancelled request (ignored)");
				}
			}
			Message::Event(event) => {
				let delivered = self.subscribers.publish(&event);
				if delivered == 0 {
					tracing::debug!(event = %event.event, "Event with no subscriber (dropped)");
				} else {
					tracing::debug!(event = %event.event, delivered, "Event delivered");
				}
			}
			Message::Unknown(value) => {
				tracing::debug!(
					"Unknown message type (forward-compatible, ignored): {}",
					value
				);
			}
		}
	}

	/// Closes the connection. Idempotent.
	///
	/// In-flight calls fail with [`Error::ConnectionClosed`], later calls with
	/// [`Error::SessionClosed`].
	pub fn close(&self) {
		if !self.lifecycle.advance(SessionState::Closing) {
			return;
		}
		tracing::debug!("closing connection");
		self.teardown(|| Error::ConnectionClosed);
	}

	/// Transport failure path: fails everything with [`Error::SessionLost`].
	fn lose(&self, reason: String) {
		if !self.lifecycle.advance(SessionState::Closing) {
			return;
		}
		tracing::warn!(%reason, "session lost");
		self.teardown(|| Error::SessionLost(reason.clone()));
	}

	fn teardown(&self, make_error: impl Fn() -> Error) {
		for handle in self.tasks.lock().drain(..) {
			handle.abort();
		}
		let failed = self.pending.fail_all(make_error);
		if failed > 0 {
			tracing::debug!(failed, "failed outstanding requests");
		}
		self.subscribers.clear();
		self.lifecycle.advance(SessionState::Closed);
	}
}
