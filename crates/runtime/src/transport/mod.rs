//! Framed message transport to the target's debug channel.
//!
//! Every frame is a 4-byte little-endian length prefix followed by that many
//! bytes of UTF-8 JSON:
//!
//! ```text
//! [len: u32 LE][json bytes ...]
//! ```
//!
//! The same framing runs over the target's stdio pipes or a TCP socket; both
//! are driven by [`PipeTransport`], which only needs an `AsyncWrite` half and
//! an `AsyncRead` half. Binary payloads travel inside the JSON as base64 (see
//! `playgodot_protocol::Variant`).

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};


/// Frames above this size are treated as corruption.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Sending half of a transport.
pub trait Transport: Send {
	/// Encodes and writes one frame.
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Receiving half of a transport.
pub trait TransportReceiver: Send {
	/// Reads frames until the stream ends, forwarding each decoded message.
	///
	/// Returns `Ok(())` on a clean end of stream at a frame boundary and an
	/// error on a truncated or malformed frame.
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Both transport halves plus the stream of decoded inbound messages.
pub struct TransportParts {
	pub sender: Box<dyn Transport>,
	pub receiver: Box<dyn TransportReceiver>,
	pub message_rx: mpsc::UnboundedReceiver<Value>,
}

/// Length-prefixed JSON transport over a pair of byte streams.
pub struct PipeTransport<W, R> {
	stdin: W,
	stdout: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<W, R> PipeTransport<W, R>
where
	W: AsyncWrite + Unpin + Send + 'static,
	R: AsyncRead + Unpin + Send + 'static,
{
	/// Creates a transport writing to `stdin` and reading from `stdout`.
	///
	/// Decoded inbound messages are delivered on the returned receiver while
	/// [`run`](Self::run) is driven.
	pub fn new(stdin: W, stdout: R) -> (Self, mpsc::UnboundedReceiver<Value>) {
		let (message_tx, message_rx) = mpsc::unbounded_channel();
		(
			Self {
				stdin,
				stdout,
				message_tx,
			},
			message_rx,
		)
	}

	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.stdin, &message).await
	}

	pub async fn run(&mut self) -> Result<()> {
		read_loop(&mut self.stdout, &self.message_tx).await
	}

	/// Splits into independently owned halves.
	pub fn into_parts(self) -> (PipeTransportSender<W>, PipeTransportReceiver<R>) {
		(
			PipeTransportSender { stdin: self.stdin },
			PipeTransportReceiver {
				stdout: self.stdout,
				message_tx: self.message_tx,
			},
		)
	}

	/// Boxes both halves for a [`Connection`](crate::Connection).
	pub fn into_transport_parts(self, message_rx: mpsc::UnboundedReceiver<Value>) -> TransportParts {
		let (sender, receiver) = self.into_parts();
		TransportParts {
			sender: Box::new(sender),
			receiver: Box::new(receiver),
			message_rx,
		}
	}
}

pub struct PipeTransportSender<W> {
	stdin: W,
}

impl<W> PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	pub async fn send(&mut self, message: Value) -> Result<()> {
		write_frame(&mut self.stdin, &message).await
	}
}

impl<W> Transport for PipeTransportSender<W>
where
	W: AsyncWrite + Unpin + Send,
{
	fn send(&mut self, message: Value) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
		Box::pin(async move { write_frame(&mut self.stdin, &message).await })
	}
}

pub struct PipeTransportReceiver<R> {
	stdout: R,
	message_tx: mpsc::UnboundedSender<Value>,
}

impl<R> TransportReceiver for PipeTransportReceiver<R>
where
	R: AsyncRead + Unpin + Send + 'static,
{
	fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
		let PipeTransportReceiver {
			mut stdout,
			message_tx,
		} = *self;
		Box::pin(async move { read_loop(&mut stdout, &message_tx).await })
	}
}

/// Connects to a target already listening at `endpoint` (`host:port`).
pub async fn connect_tcp(endpoint: &str, timeout: Duration) -> Result<TransportParts> {
	let stream = match tokio::time::timeout(timeout, TcpStream::connect(endpoint)).await {
		Ok(Ok(stream)) => stream,
		Ok(Err(e)) => {
			return Err(Error::ConnectFailed {
				endpoint: endpoint.to_string(),
				reason: e.to_string(),
			});
		}
		Err(_) => {
			return Err(Error::ConnectFailed {
				endpoint: endpoint.to_string(),
				reason: format!("no answer within {}ms", timeout.as_millis()),
			});
		}
	};
	debug!(endpoint, "connected to target");
	Ok(tcp_parts(stream))
}

/// Waits for the target to dial back into `listener`.
pub async fn accept_tcp(listener: &TcpListener, timeout: Duration) -> Result<TransportParts> {
	let endpoint = listener
		.local_addr()
		.map(|addr| addr.to_string())
		.unwrap_or_else(|_| "<unbound>".to_string());

	match tokio::time::timeout(timeout, listener.accept()).await {
		Ok(Ok((stream, peer))) => {
			debug!(%peer, "target connected");
			Ok(tcp_parts(stream))
		}
		Ok(Err(e)) => Err(Error::ConnectFailed {
			endpoint,
			reason: e.to_string(),
		}),
		Err(_) => Err(Error::ConnectFailed {
			endpoint,
			reason: format!("target did not connect within {}ms", timeout.as_millis()),
		}),
	}
}

fn tcp_parts(stream: TcpStream) -> TransportParts {
	let _ = stream.set_nodelay(true);
	let (read_half, write_half) = stream.into_split();
	let (transport, message_rx) = PipeTransport::new(write_half, read_half);
	transport.into_transport_parts(message_rx)
}

/// Encodes `message` as one frame.
pub fn encode_frame(message: &Value) -> Result<Vec<u8>> {
	let json = serde_json::to_vec(message)?;
	if json.len() > MAX_FRAME_SIZE {
		return Err(Error::ProtocolError(format!(
			"Outbound frame of {} bytes exceeds {MAX_FRAME_SIZE} byte limit",
			json.len()
		)));
	}
	let mut frame = Vec::with_capacity(4 + json.len());
	frame.extend_from_slice(&(json.len() as u32).to_le_bytes());
	frame.extend_from_slice(&json);
	Ok(frame)
}

async fn write_frame<W>(writer: &mut W, message: &Value) -> Result<()>
where
	W: AsyncWrite + Unpin,
{
	let frame = encode_frame(message)?;
	writer
		.write_all(&frame)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to write frame: {e}")))?;
	writer
		.flush()
		.await
		.map_err(|e| Error::TransportError(format!("Failed to flush frame: {e}")))
}

/// Reads one frame body. `Ok(None)` means the stream ended cleanly between
/// frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
	R: AsyncRead + Unpin,
{
	let mut len_buf = [0u8; 4];
	let mut filled = 0;
	while filled < len_buf.len() {
		let n = reader
			.read(&mut len_buf[filled..])
			.await
			.map_err(|e| Error::TransportError(format!("Failed to read length prefix: {e}")))?;
		if n == 0 {
			if filled == 0 {
				return Ok(None);
			}
			return Err(Error::TransportError(format!(
				"Failed to read length prefix: stream ended after {filled} of 4 bytes"
			)));
		}
		filled += n;
	}

	let length = u32::from_le_bytes(len_buf) as usize;
	if length > MAX_FRAME_SIZE {
		return Err(Error::ProtocolError(format!(
			"Inbound frame of {length} bytes exceeds {MAX_FRAME_SIZE} byte limit"
		)));
	}

	// read_exact loops internally, so large frames arriving in pieces are
	// reassembled before decoding.
	let mut body = vec![0u8; length];
	reader
		.read_exact(&mut body)
		.await
		.map_err(|e| Error::TransportError(format!("Failed to read frame body ({length} bytes): {e}")))?;
	Ok(Some(body))
}

async fn read_loop<R>(reader: &mut R, message_tx: &mpsc::UnboundedSender<Value>) -> Result<()>
where
	R: AsyncRead + Unpin,
{
	while let Some(body) = read_frame(reader).await? {
		let message: Value = serde_json::from_slice(&body)
			.map_err(|e| Error::ProtocolError(format!("Malformed frame ({} bytes): {e}", body.len())))?;

		if message_tx.send(message).is_err() {
			debug!("message receiver dropped; stopping transport reader");
			return Ok(());
		}
	}
	debug!("transport reached end of stream");
	Ok(())
}
