use crate::runtime::ScenarioRuntime;
use sim_events::{ScenarioStatus, SyncSnapshot, TimeMs};
use tracing::debug;

/// Applies inbound host snapshots to a participant's runtime.
///
/// Idempotent and monotonic: only a snapshot with a strictly newer
/// timestamp than the last applied one has any effect, so duplicated,
/// re-ordered, or lost-and-resent deliveries are all safe. Gaps are
/// permitted; a lost snapshot is simply superseded by the next one.
pub struct SyncReconciler {
	runtime: ScenarioRuntime,
}

impl SyncReconciler {
	pub fn new(runtime: ScenarioRuntime) -> Self {
		Self { runtime }
	}

	pub fn runtime(&self) -> &ScenarioRuntime {
		&self.runtime
	}

	/// Adopt a host snapshot: adjust the local clocks for network delay and
	/// replay the host's lifecycle transition. Stale snapshots are dropped
	/// silently.
	pub async fn try_sync(&self, local_clock_ms: TimeMs, snapshot: SyncSnapshot) {
		if !self.runtime.adopt_watermark(snapshot.timestamp) {
			debug!("stale sync snapshot dropped (timestamp {})", snapshot.timestamp);
			return;
		}

		// clocks that are not advancing need no delay compensation
		let latency = if snapshot.status == ScenarioStatus::Playing {
			(local_clock_ms - snapshot.timestamp).abs()
		} else {
			0
		};

		self.runtime.apply_sync_offsets(&snapshot, latency).await;

		match snapshot.status {
			ScenarioStatus::Playing => {
				self.runtime.play().await;
			}
			ScenarioStatus::Paused => {
				self.runtime.pause().await;
			}
			ScenarioStatus::Stopped => {
				self.runtime.stop().await;
			}
			// load and unload are never triggered remotely
			_ => {}
		}
	}
}
