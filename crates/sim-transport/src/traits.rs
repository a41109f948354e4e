use crate::error::Result;
use async_trait::async_trait;

/// Receiving half of a transport channel.
#[async_trait]
pub trait EventReceiver<E>: Send
where
	E: Clone + Send + Sync + 'static,
{
	/// Waits for and receives the next event.
	async fn recv(&mut self) -> Result<E>;

	/// Attempts to receive an event immediately.
	fn try_recv(&mut self) -> Result<E>;
}

/// Core transport interface the session layer is written against.
///
/// A participant attaches under a stable key and gets a dedicated channel;
/// the host broadcasts to everyone or targets one key. Implementations make
/// no delivery or ordering promises across event codes.
#[async_trait]
pub trait Transport<E>: Clone + Send + Sync + 'static
where
	E: Clone + Send + Sync + 'static,
{
	/// Associated type for the receiver this transport produces
	type Receiver: EventReceiver<E> + Send + 'static;

	/// Opens a dedicated channel for one participant.
	async fn attach(&self, participant_key: &str) -> Self::Receiver;

	/// Closes a participant's dedicated channel.
	async fn detach(&self, participant_key: &str) -> Result<()>;

	/// Sends an event to a single participant.
	async fn send_to(&self, participant_key: &str, event: E) -> Result<()>;

	/// Broadcasts an event to every subscriber of the shared stream.
	/// Returns the number of receivers it reached.
	async fn broadcast(&self, event: E) -> Result<usize>;

	/// Subscribes to the shared broadcast stream.
	fn subscribe(&self) -> Self::Receiver;

	/// Number of currently attached participant channels.
	fn participant_count(&self) -> usize;

	/// Whether the transport has shut down.
	fn is_closed(&self) -> bool;
}
