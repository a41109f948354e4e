use serde::{Deserialize, Serialize};

/// Time in milliseconds
pub type TimeMs = i64;

/// Stage identifier, stable across save/load
pub type StageId = String;

/// Asset instance identifier
pub type AssetId = String;

/// Asset type identifier, resolved by the asset provider
pub type AssetTypeId = String;

/// Property name within an asset
pub type PropertyName = String;

/// Lifecycle status of the scenario aggregate.
///
/// Exactly one status is active at a time. Legal movement between
/// statuses is encoded in [`ScenarioStatus::can_transition_to`]; the
/// runtime consults it before every switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScenarioStatus {
	Unloaded,
	Loading,
	Loaded,
	Playing,
	Paused,
	Stopped,
	Unloading,
}

impl ScenarioStatus {
	/// Pure transition legality check
	pub fn can_transition_to(self, next: ScenarioStatus) -> bool {
		use ScenarioStatus::*;

		match (self, next) {
			(Unloaded, Loading) => true,
			// load failure unwinds straight back
			(Loading, Loaded) | (Loading, Unloaded) => true,
			(Loaded, Playing) | (Playing, Paused) | (Paused, Playing) => true,
			(Loaded, Stopped) | (Playing, Stopped) | (Paused, Stopped) => true,
			// a scenario that was never played can be unloaded directly
			(Loaded, Unloading) | (Stopped, Unloading) => true,
			(Unloading, Unloaded) => true,
			_ => false,
		}
	}

	/// True while a scenario occupies the runtime (anything between load and unload)
	pub fn is_loaded(self) -> bool {
		!matches!(self, ScenarioStatus::Unloaded | ScenarioStatus::Loading | ScenarioStatus::Unloading)
	}

	/// True while session clocks may be advancing
	pub fn is_in_session(self) -> bool {
		matches!(self, ScenarioStatus::Playing | ScenarioStatus::Paused)
	}
}

impl Default for ScenarioStatus {
	fn default() -> Self {
		ScenarioStatus::Unloaded
	}
}

/// Why a property value changed.
///
/// Observers branch on this to decide what is network-worthy: only
/// `ValueSet` mutations are live edits that get rebroadcast; everything
/// else is bootstrapping, stage movement, or the automation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeOrigin {
	Initialization,
	StageChange,
	RuleSet,
	ValueSet,
}

/// Which slot of a property absorbed a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangedField {
	Shared,
	Local,
}
