use async_trait::async_trait;
use sim_events::{PropertyKind, PropertyValue};
use sim_props::{PropertyState, StageEntryState};
use sim_scenario::{AssetProvider, AssetState, Scenario, ScenarioError, ScenarioRuntime, SessionConfig, Stage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Provider that records what the runtime asks of it
#[derive(Default)]
pub struct RecordingProvider {
	pub fail_type_load: AtomicBool,
	pub enable_interactive_calls: AtomicUsize,
	pub disable_interactive_calls: AtomicUsize,
	pub destroy_calls: AtomicUsize,
	pub instantiated: Mutex<Vec<String>>,
	pub visible: AtomicBool,
}

impl RecordingProvider {
	pub fn instantiated_ids(&self) -> Vec<String> {
		self.instantiated.lock().unwrap().clone()
	}
}

#[async_trait]
impl AssetProvider for RecordingProvider {
	async fn load_asset_types(&self, _type_ids: &[String]) -> sim_scenario::Result<()> {
		if self.fail_type_load.load(Ordering::SeqCst) {
			return Err(ScenarioError::AssetTypeLoad("asset bundle unavailable".into()));
		}
		Ok(())
	}

	async fn release_asset_types(&self, _type_ids: &[String]) -> sim_scenario::Result<()> {
		Ok(())
	}

	async fn instantiate(&self, asset: &AssetState) -> sim_scenario::Result<()> {
		self.instantiated.lock().unwrap().push(asset.id.clone());
		Ok(())
	}

	async fn destroy_all(&self) -> sim_scenario::Result<()> {
		self.destroy_calls.fetch_add(1, Ordering::SeqCst);
		Ok(())
	}

	async fn set_interactive(&self, enabled: bool) -> sim_scenario::Result<()> {
		if enabled {
			self.enable_interactive_calls.fetch_add(1, Ordering::SeqCst);
		} else {
			self.disable_interactive_calls.fetch_add(1, Ordering::SeqCst);
		}
		// suspension point, as a real provider would have
		tokio::task::yield_now().await;
		Ok(())
	}

	async fn set_all_visible(&self, visible: bool) -> sim_scenario::Result<()> {
		self.visible.store(visible, Ordering::SeqCst);
		Ok(())
	}
}

/// Two stages, one asset, one int property:
/// default 0, stage s0 holds a local 5, stage s1 follows the shared 10.
pub fn two_stage_scenario() -> Scenario {
	Scenario {
		stages: vec![Stage::new("s0", "Arrival", 0), Stage::new("s1", "Deterioration", 1)],
		assets: vec![AssetState {
			id: "patient".into(),
			type_id: "manikin".into(),
			preset_id: None,
			runtime_only: false,
			properties: vec![PropertyState {
				name: "vital".into(),
				kind: PropertyKind::Int,
				default_value: PropertyValue::Int(0),
				shared_value: PropertyValue::Int(10),
				stage_entries: vec![
					StageEntryState {
						stage_id: "s0".into(),
						use_shared: false,
						reset_on_stage_change: false,
						local_value: PropertyValue::Int(5),
					},
					StageEntryState {
						stage_id: "s1".into(),
						use_shared: true,
						reset_on_stage_change: false,
						local_value: PropertyValue::Int(0),
					},
				],
			}],
			data: serde_json::Value::Null,
		}],
		pathways: vec![],
		asset_types: vec![],
	}
}

pub fn fresh_runtime() -> (ScenarioRuntime, Arc<RecordingProvider>) {
	let provider = Arc::new(RecordingProvider::default());
	(ScenarioRuntime::new(provider.clone(), SessionConfig::default()), provider)
}
