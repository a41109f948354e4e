use crate::types::{ScenarioStatus, TimeMs};
use serde::{Deserialize, Serialize};

/// Timestamped summary of host-side scenario state.
///
/// Produced by the authoritative host and applied by participants.
/// Acceptance is monotonic: a snapshot only takes effect when its
/// timestamp is strictly greater than the last applied one, so
/// duplicated or re-ordered delivery is harmless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
	/// Host wall clock, epoch milliseconds
	pub timestamp: TimeMs,
	pub status: ScenarioStatus,
	pub total_ms_in_simulation: TimeMs,
	pub total_ms_in_scenario: TimeMs,
	pub total_ms_in_current_stage: TimeMs,
}

impl SyncSnapshot {
	pub fn new(timestamp: TimeMs, status: ScenarioStatus) -> Self {
		Self {
			timestamp,
			status,
			total_ms_in_simulation: 0,
			total_ms_in_scenario: 0,
			total_ms_in_current_stage: 0,
		}
	}

	/// Whether this snapshot should be applied over the given watermark
	pub fn is_newer_than(&self, watermark: Option<TimeMs>) -> bool {
		match watermark {
			Some(last) => self.timestamp > last,
			None => true,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_newer_than_empty_watermark() {
		let snapshot = SyncSnapshot::new(1, ScenarioStatus::Playing);
		assert!(snapshot.is_newer_than(None));
	}

	#[test]
	fn test_monotonic_acceptance() {
		let snapshot = SyncSnapshot::new(100, ScenarioStatus::Playing);

		assert!(snapshot.is_newer_than(Some(99)));
		assert!(!snapshot.is_newer_than(Some(100)));
		assert!(!snapshot.is_newer_than(Some(150)));
	}

	#[test]
	fn test_wire_shape() {
		let snapshot = SyncSnapshot {
			timestamp: 5,
			status: ScenarioStatus::Paused,
			total_ms_in_simulation: 1,
			total_ms_in_scenario: 2,
			total_ms_in_current_stage: 3,
		};

		let json = serde_json::to_value(&snapshot).unwrap();
		assert_eq!(json["status"], "paused");
		assert_eq!(json["totalMsInSimulation"], 1);
		assert_eq!(json["totalMsInCurrentStage"], 3);
	}
}
