//! Event subscriptions.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::connection::Event;

struct Subscriber {
	/// `None` receives every category.
	category: Option<String>,
	tx: mpsc::UnboundedSender<Event>,
}

/// Registry of event subscribers, keyed by category.
#[derive(Default)]
pub(crate) struct Subscribers {
	inner: Mutex<Vec<Subscriber>>,
}

impl Subscribers {
	pub(crate) fn add(&self, category: Option<String>) -> EventStream {
		let (tx, rx) = mpsc::unbounded_channel();
		self.inner.lock().push(Subscriber { category, tx });
		EventStream { rx }
	}

	/// Delivers `event` to every matching subscriber without blocking.
	/// Returns the number of subscribers reached.
	pub(crate) fn publish(&self, event: &Event) -> usize {
		let mut subscribers = self.inner.lock();
		subscribers.retain(|s| !s.tx.is_closed());

		let mut delivered = 0;
		for subscriber in subscribers.iter() {
			let matches = subscriber
				.category
				.as_deref()
				.is_none_or(|category| category == event.event);
			if matches && subscriber.tx.send(event.clone()).is_ok() {
				delivered += 1;
			}
		}
		delivered
	}

	/// Drops every subscriber, ending their streams.
	pub(crate) fn clear(&self) {
		self.inner.lock().clear();
	}
}

/// Stream of events for one subscription. Ends when the session closes.
pub struct EventStream {
	rx: mpsc::UnboundedReceiver<Event>,
}

impl EventStream {
	/// Waits for the next event; `None` once the session has closed.
	pub async fn recv(&mut self) -> Option<Event> {
		self.rx.recv().await
	}

	/// Returns an already-delivered event without waiting.
	pub fn try_recv(&mut self) -> Option<Event> {
		self.rx.try_recv().ok()
	}
}
