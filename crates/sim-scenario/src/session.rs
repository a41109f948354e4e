use crate::runtime::ScenarioRuntime;
use crate::sync::SyncReconciler;
use chrono::Utc;
use sim_events::{ChangeOrigin, EventCode, PropertyUpdate, ScenarioEvent, SyncSnapshot, TimeMs, WireEvent};
use sim_transport::{EventReceiver, Transport, TransportError};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Current wall clock, epoch milliseconds
pub fn now_ms() -> TimeMs {
	Utc::now().timestamp_millis()
}

/// Authoritative side of a session.
///
/// Ticks on the configured sync interval, stamping and broadcasting a
/// [`SyncSnapshot`] while a scenario is loaded, and rebroadcasts live
/// property edits (`ValueSet` origin only; everything else is local
/// bootstrap or replayed remote state, and rebroadcasting it would loop).
pub struct HostSession<T>
where
	T: Transport<WireEvent>,
{
	runtime: ScenarioRuntime,
	transport: T,
	cancel: CancellationToken,
}

impl<T> HostSession<T>
where
	T: Transport<WireEvent>,
{
	pub fn new(runtime: ScenarioRuntime, transport: T) -> Self {
		Self {
			runtime,
			transport,
			cancel: CancellationToken::new(),
		}
	}

	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub async fn run(self) {
		let mut ticker = tokio::time::interval(self.runtime.config().sync_interval());
		let mut events = self.runtime.bus().subscribe();

		info!("host session started");

		loop {
			tokio::select! {
				_ = ticker.tick() => {
					if let Some(snapshot) = self.runtime.snapshot(now_ms()).await {
						self.broadcast_snapshot(snapshot).await;
					}
				}
				event = events.recv() => match event {
					Ok(ScenarioEvent::PropertyChanged { asset_id, property, value, origin: ChangeOrigin::ValueSet, .. }) => {
						self.broadcast_property(asset_id, property, value).await;
					}
					Ok(_) => {}
					Err(RecvError::Lagged(missed)) => warn!("host session lagged, {missed} events missed"),
					Err(RecvError::Closed) => break,
				},
				_ = self.cancel.cancelled() => break,
			}
		}

		info!("host session stopped");
	}

	async fn broadcast_snapshot(&self, snapshot: SyncSnapshot) {
		match serde_json::to_value(&snapshot) {
			Ok(payload) => {
				if let Err(err) = self.transport.broadcast(WireEvent::new(EventCode::StatusSync, payload)).await {
					warn!("status sync dropped: {err}");
				}
			}
			Err(err) => warn!("snapshot serialization failed: {err}"),
		}
	}

	async fn broadcast_property(&self, asset_id: String, property: String, value: sim_events::PropertyValue) {
		let update = PropertyUpdate {
			asset_id,
			property,
			value,
			origin: ChangeOrigin::ValueSet,
		};
		match serde_json::to_value(&update) {
			Ok(payload) => {
				if let Err(err) = self.transport.broadcast(WireEvent::new(EventCode::PropertySet, payload)).await {
					warn!("property update dropped: {err}");
				}
			}
			Err(err) => warn!("property update serialization failed: {err}"),
		}
	}
}

/// Remote side of a session.
///
/// Feeds status snapshots into the [`SyncReconciler`] and applies inbound
/// property edits with `RuleSet` origin, so they never bounce back over the
/// wire.
pub struct ParticipantSession<T>
where
	T: Transport<WireEvent>,
{
	reconciler: SyncReconciler,
	transport: T,
	cancel: CancellationToken,
}

impl<T> ParticipantSession<T>
where
	T: Transport<WireEvent>,
{
	pub fn new(runtime: ScenarioRuntime, transport: T) -> Self {
		Self {
			reconciler: SyncReconciler::new(runtime),
			transport,
			cancel: CancellationToken::new(),
		}
	}

	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	pub async fn run(self) {
		let mut receiver = self.transport.subscribe();

		info!("participant session started");

		loop {
			tokio::select! {
				event = receiver.recv() => match event {
					Ok(event) => self.handle(event).await,
					Err(TransportError::Overflowed(missed)) => warn!("participant lagged, {missed} events dropped"),
					Err(TransportError::Closed) => break,
					Err(err) => warn!("transport receive failed: {err}"),
				},
				_ = self.cancel.cancelled() => break,
			}
		}

		info!("participant session stopped");
	}

	async fn handle(&self, event: WireEvent) {
		match event.code {
			EventCode::StatusSync => match serde_json::from_value::<SyncSnapshot>(event.payload) {
				Ok(snapshot) => self.reconciler.try_sync(now_ms(), snapshot).await,
				Err(err) => warn!("malformed status sync payload: {err}"),
			},
			EventCode::PropertySet => match serde_json::from_value::<PropertyUpdate>(event.payload) {
				Ok(update) => {
					let result = self
						.reconciler
						.runtime()
						.set_property(&update.asset_id, &update.property, update.value, ChangeOrigin::RuleSet)
						.await;
					if let Err(err) = result {
						warn!("remote property update rejected: {err}");
					}
				}
				Err(err) => warn!("malformed property update payload: {err}"),
			},
			_ => {}
		}
	}
}
