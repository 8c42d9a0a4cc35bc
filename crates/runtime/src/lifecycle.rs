//! Session lifecycle state.
//!
//! States only move forward:
//! `Launching -> Handshaking -> Ready -> Closing -> Closed`. Skipping ahead is
//! allowed (a launch failure goes straight to `Closed`), going back is not.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SessionState {
	Launching = 0,
	Handshaking = 1,
	Ready = 2,
	Closing = 3,
	Closed = 4,
}

impl SessionState {
	fn from_u8(value: u8) -> Self {
		match value {
			0 => Self::Launching,
			1 => Self::Handshaking,
			2 => Self::Ready,
			3 => Self::Closing,
			_ => Self::Closed,
		}
	}

	/// True once teardown has started; no new requests are accepted.
	pub fn is_shutting_down(self) -> bool {
		self >= Self::Closing
	}
}

impl fmt::Display for SessionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::Launching => "launching",
			Self::Handshaking => "handshaking",
			Self::Ready => "ready",
			Self::Closing => "closing",
			Self::Closed => "closed",
		};
		f.write_str(name)
	}
}

/// Shared, monotonic session state cell.
#[derive(Debug)]
pub struct Lifecycle {
	state: AtomicU8,
}

impl Lifecycle {
	pub fn new(initial: SessionState) -> Self {
		Self {
			state: AtomicU8::new(initial as u8),
		}
	}

	pub fn current(&self) -> SessionState {
		SessionState::from_u8(self.state.load(Ordering::Acquire))
	}

	/// Moves to `next` if it is ahead of the current state.
	///
	/// Returns true only for the caller that performed the transition, so
	/// concurrent callers racing to the same state see exactly one winner.
	pub fn advance(&self, next: SessionState) -> bool {
		let previous = self.state.fetch_max(next as u8, Ordering::AcqRel);
		let advanced = previous < next as u8;
		if advanced {
			tracing::debug!(
				from = %SessionState::from_u8(previous),
				to = %next,
				"session state changed"
			);
		}
		advanced
	}
}

impl Default for Lifecycle {
	fn default() -> Self {
		Self::new(SessionState::Launching)
	}
}
