use crate::error::{Result, TransportError};
use crate::traits::{EventReceiver, Transport};
use async_broadcast::{broadcast, Receiver, RecvError, Sender, TryRecvError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// In-process transport over lock-free broadcast channels.
///
/// Serves single-process sessions and the test suite. Channels run with
/// overflow enabled: a slow receiver drops the oldest buffered events
/// instead of back-pressuring the host, which matches the wire contract
/// (lost snapshots are never retried, only superseded).
#[derive(Clone)]
pub struct InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	main_sender: Sender<E>,
	_keep_alive: Receiver<E>, // Keep channel open
	participants: Arc<DashMap<String, Sender<E>>>,
	buffer_size: usize,
}

impl<E> InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	/// Creates a transport whose channels buffer `buffer_size` events each.
	#[must_use]
	pub fn new(buffer_size: usize) -> Self {
		let (mut main_sender, keep_alive) = broadcast::<E>(buffer_size);
		main_sender.set_await_active(false);
		main_sender.set_overflow(true);

		Self {
			main_sender,
			_keep_alive: keep_alive,
			participants: Arc::new(DashMap::new()),
			buffer_size,
		}
	}

	/// Creates a transport and an already-subscribed receiver.
	#[must_use]
	pub fn with_receiver(buffer_size: usize) -> (Self, InMemReceiver<E>) {
		let transport = Self::new(buffer_size);
		let receiver = transport.subscribe();
		(transport, receiver)
	}
}

#[async_trait]
impl<E> Transport<E> for InMemTransport<E>
where
	E: Clone + Send + Sync + 'static,
{
	type Receiver = InMemReceiver<E>;

	async fn attach(&self, participant_key: &str) -> Self::Receiver {
		let (mut sender, receiver) = broadcast::<E>(self.buffer_size);
		sender.set_await_active(false);
		sender.set_overflow(true);
		self.participants.insert(participant_key.to_string(), sender);

		InMemReceiver::new(receiver)
	}

	async fn detach(&self, participant_key: &str) -> Result<()> {
		self.participants.remove(participant_key);
		Ok(())
	}

	async fn send_to(&self, participant_key: &str, event: E) -> Result<()> {
		if let Some(sender) = self.participants.get(participant_key) {
			sender.broadcast(event).await.map(|_| ()).map_err(|e| TransportError::SendFailed(e.to_string()))
		} else {
			Err(TransportError::ParticipantNotFound(participant_key.to_string()))
		}
	}

	async fn broadcast(&self, event: E) -> Result<usize> {
		self
			.main_sender
			.broadcast(event)
			.await
			.map(|res| usize::from(res.is_some()))
			.map_err(|e| TransportError::BroadcastFailed(e.to_string()))
	}

	fn subscribe(&self) -> InMemReceiver<E> {
		InMemReceiver::new(self.main_sender.new_receiver())
	}

	fn participant_count(&self) -> usize {
		self.participants.len()
	}

	fn is_closed(&self) -> bool {
		self.main_sender.is_closed()
	}
}

/// Receiver half of [`InMemTransport`]
#[derive(Clone)]
pub struct InMemReceiver<E>(Receiver<E>);

impl<E> InMemReceiver<E> {
	pub fn new(receiver: Receiver<E>) -> Self {
		Self(receiver)
	}
}

#[async_trait]
impl<E> EventReceiver<E> for InMemReceiver<E>
where
	E: Clone + Send + Sync + 'static,
{
	async fn recv(&mut self) -> Result<E> {
		match self.0.recv().await {
			Ok(event) => Ok(event),
			Err(RecvError::Closed) => Err(TransportError::Closed),
			Err(RecvError::Overflowed(n)) => Err(TransportError::Overflowed(n)),
		}
	}

	fn try_recv(&mut self) -> Result<E> {
		match self.0.try_recv() {
			Ok(event) => Ok(event),
			Err(TryRecvError::Closed) => Err(TransportError::Closed),
			Err(TryRecvError::Overflowed(n)) => Err(TransportError::Overflowed(n)),
			Err(TryRecvError::Empty) => Err(TransportError::Empty),
		}
	}
}
