//! `wait_for_*` operations for [`Godot`], all built on [`Waiter`].

use std::future::Future;
use std::time::Duration;

use playgodot_runtime::{Error, Result};

use super::Godot;
use crate::node::NodeRef;
use crate::waiter::{Check, Waiter};

impl Godot {
	/// A waiter with this session's poll interval.
	pub fn waiter(&self, timeout: Duration) -> Waiter {
		Waiter::new(timeout, self.inner.options.poll_interval)
	}

	/// Waits until a node exists at `path`.
	///
	/// # Errors
	///
	/// Returns `Error::WaitTimeout` if it does not appear in time; terminal
	/// session errors are returned as soon as they occur.
	pub async fn wait_for_node(&self, path: &str, timeout: Duration) -> Result<NodeRef> {
		self.waiter(timeout)
			.poll_until(&format!("node {path}"), || async move {
				match self.get_node(path).await {
					Ok(node) => Ok(Check::Done(node)),
					Err(Error::NodeNotFound { .. }) => Ok(Check::Pending(format!("{path} not found"))),
					Err(e) => Err(e),
				}
			})
			.await
	}

	/// Waits until the node at `path` reports `visible == true`.
	pub async fn wait_for_visible(&self, path: &str, timeout: Duration) -> Result<()> {
		self.waiter(timeout)
			.poll_until(&format!("{path} to become visible"), || async move {
				let visible = self.get_property(path, "visible").await?;
				Ok(match visible.as_bool() {
					Some(true) => Check::Done(()),
					_ => Check::Pending(format!("visible = {visible}")),
				})
			})
			.await
	}

	/// Waits until `predicate` resolves to `true`.
	///
	/// The predicate runs from scratch on every poll and may issue commands
	/// on this session.
	pub async fn wait_for_condition<F, Fut>(&self, mut predicate: F, timeout: Duration) -> Result<()>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<bool>>,
	{
		self.waiter(timeout)
			.poll_until("condition", || {
				let evaluation = predicate();
				async move {
					Ok(if evaluation.await? {
						Check::Done(())
					} else {
						Check::Pending("predicate returned false".to_string())
					})
				}
			})
			.await
	}
}
