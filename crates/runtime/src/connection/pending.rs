//! Correlation table of in-flight requests.

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::connection::ErrorPayload;
use crate::error::Error;

/// What a pending call eventually resolves to.
#[derive(Debug)]
pub(crate) enum Reply {
	/// Successful response payload.
	Value(Value),
	/// Error response from the target.
	Remote(ErrorPayload),
	/// The session ended before a response arrived.
	Failed(Error),
}

/// Pending-result slots keyed by correlation id.
///
/// Concurrent inserts from callers and completions from the dispatch loop
/// touch different shards, so pipelined calls do not contend on one lock.
#[derive(Default)]
pub(crate) struct PendingCalls {
	slots: DashMap<u32, oneshot::Sender<Reply>>,
}

impl PendingCalls {
	pub(crate) fn insert(&self, id: u32) -> oneshot::Receiver<Reply> {
		let (tx, rx) = oneshot::channel();
		self.slots.insert(id, tx);
		rx
	}

	/// Fills the slot for `id` and wakes its waiter. Returns false when no
	/// call is waiting on that id.
	pub(crate) fn complete(&self, id: u32, reply: Reply) -> bool {
		match self.slots.remove(&id) {
			Some((_, tx)) => {
				if tx.send(reply).is_err() {
					tracing::debug!(id, "caller stopped waiting before reply arrived");
				}
				true
			}
			None => false,
		}
	}

	pub(crate) fn remove(&self, id: u32) -> bool {
		self.slots.remove(&id).is_some()
	}

	/// Fails every outstanding slot with an error built by `make_error`.
	pub(crate) fn fail_all(&self, make_error: impl Fn() -> Error) -> usize {
		let ids: Vec<u32> = self.slots.iter().map(|entry| *entry.key()).collect();
		let mut failed = 0;
		for id in ids {
			if let Some((_, tx)) = self.slots.remove(&id) {
				let _ = tx.send(Reply::Failed(make_error()));
				failed += 1;
			}
		}
		failed
	}

	pub(crate) fn len(&self) -> usize {
		self.slots.len()
	}
}

/// Releases a pending slot if the request future is dropped before its
/// reply arrives (timeout or caller cancellation).
pub(crate) struct CancelGuard<'a> {
	id: u32,
	pending: &'a PendingCalls,
	completed: bool,
}

impl<'a> CancelGuard<'a> {
	pub(crate) fn new(id: u32, pending: &'a PendingCalls) -> Self {
		Self {
			id,
			pending,
			completed: false,
		}
	}

	pub(crate) fn complete(&mut self) {
		self.completed = true;
	}
}

impl Drop for CancelGuard<'_> {
	fn drop(&mut self) {
		if !self.completed && self.pending.remove(self.id) {
			tracing::debug!(id = self.id, "CancelGuard: removed orphaned callback");
		}
	}
}
