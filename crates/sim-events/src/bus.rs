use crate::types::{AssetId, ChangeOrigin, ChangedField, PropertyName, ScenarioStatus, StageId, TimeMs};
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// In-process lifecycle and property notifications.
///
/// Play deliberately fans out in three phases: `PlayStarting` fires before
/// interactivity is enabled, `PlayStarted` once the status has flipped, and
/// `PlaySettled` only after the transition guard has been released. Listeners
/// that mutate properties from `PlaySettled` are therefore attributable as
/// live edits rather than bootstrap noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScenarioEvent {
	StatusChanged { status: ScenarioStatus },
	ScenarioLoaded,
	PlayStarting,
	PlayStarted,
	PlaySettled,
	ScenarioPaused,
	ScenarioStopped,
	ScenarioReset,
	ScenarioUnloaded,
	#[serde(rename_all = "camelCase")]
	StageSwitched {
		from: Option<StageId>,
		to: StageId,
		elapsed_in_previous: TimeMs,
	},
	#[serde(rename_all = "camelCase")]
	PropertyChanged {
		asset_id: AssetId,
		property: PropertyName,
		field: ChangedField,
		value: PropertyValue,
		origin: ChangeOrigin,
	},
}

/// Owned publish/subscribe channel for [`ScenarioEvent`]s.
///
/// Created by whichever component owns the scenario lifecycle and handed
/// down to collaborators; it dies with its owner. Slow subscribers lag and
/// miss events rather than blocking publishers.
#[derive(Debug, Clone)]
pub struct EventBus {
	tx: broadcast::Sender<ScenarioEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (tx, _rx) = broadcast::channel(capacity);
		Self { tx }
	}

	/// Publish to all current subscribers. No subscribers is not an error.
	pub fn publish(&self, event: ScenarioEvent) {
		if let Err(err) = self.tx.send(event) {
			tracing::trace!("event dropped, no subscribers: {:?}", err.0);
		}
	}

	pub fn subscribe(&self) -> broadcast::Receiver<ScenarioEvent> {
		self.tx.subscribe()
	}

	pub fn subscriber_count(&self) -> usize {
		self.tx.receiver_count()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(256)
	}
}
