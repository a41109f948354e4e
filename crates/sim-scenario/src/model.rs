use crate::error::Result;
use serde::{Deserialize, Serialize};
use sim_events::{AssetId, AssetTypeId, ChangeOrigin, PropertyValue, StageId};
use sim_props::{PropertyDefinition, PropertyError, PropertyState, ValueCommit};
use std::collections::HashSet;

/// One ordered phase of a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
	pub id: StageId,
	pub title: String,
	pub ordinal: u32,
}

impl Stage {
	pub fn new(id: impl Into<StageId>, title: impl Into<String>, ordinal: u32) -> Self {
		Self {
			id: id.into(),
			title: title.into(),
			ordinal,
		}
	}
}

/// An alternate ordering of a scenario's stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pathway {
	pub id: String,
	pub title: String,
	pub stage_order: Vec<StageId>,
}

/// Serialized form of one asset, as persisted and as sent over the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetState {
	pub id: AssetId,
	pub type_id: AssetTypeId,
	#[serde(default)]
	pub preset_id: Option<String>,
	/// Spawned during a session; excluded from persisted scenario data
	#[serde(default)]
	pub runtime_only: bool,
	#[serde(default)]
	pub properties: Vec<PropertyState>,
	/// Free-form payload owned by the asset's own systems
	#[serde(default)]
	pub data: serde_json::Value,
}

/// The aggregate a load consumes and a save produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
	#[serde(default)]
	pub stages: Vec<Stage>,
	#[serde(default)]
	pub assets: Vec<AssetState>,
	#[serde(default)]
	pub pathways: Vec<Pathway>,
	/// Asset type hints, merged with the types the assets reference
	#[serde(default)]
	pub asset_types: Vec<AssetTypeId>,
}

impl Scenario {
	pub fn validate(&self) -> std::result::Result<(), String> {
		if self.stages.is_empty() {
			return Err("scenario has no stages".to_string());
		}

		let mut stage_ids = HashSet::new();
		for stage in &self.stages {
			if stage.id.is_empty() {
				return Err("stage with empty id".to_string());
			}
			if !stage_ids.insert(&stage.id) {
				return Err(format!("duplicate stage id: {}", stage.id));
			}
		}

		let mut asset_ids = HashSet::new();
		for asset in &self.assets {
			if !asset_ids.insert(&asset.id) {
				return Err(format!("duplicate asset id: {}", asset.id));
			}
		}

		for pathway in &self.pathways {
			for stage_id in &pathway.stage_order {
				if !stage_ids.contains(stage_id) {
					return Err(format!("pathway {} references unknown stage {}", pathway.id, stage_id));
				}
			}
		}

		Ok(())
	}

	/// Every asset type this scenario needs materialized, deduplicated,
	/// hint list first
	pub fn unique_asset_types(&self) -> Vec<AssetTypeId> {
		let mut seen = HashSet::new();
		let mut types = Vec::new();
		for type_id in self.asset_types.iter().chain(self.assets.iter().map(|a| &a.type_id)) {
			if seen.insert(type_id.clone()) {
				types.push(type_id.clone());
			}
		}
		types
	}
}

/// A live asset: identity plus the bag of property definitions it owns.
///
/// Definitions carry their own per-property locks, so a shared reference is
/// enough to read and write through.
pub struct Asset {
	id: AssetId,
	type_id: AssetTypeId,
	preset_id: Option<String>,
	runtime_only: bool,
	properties: Vec<PropertyDefinition>,
	data: serde_json::Value,
}

impl Asset {
	pub fn from_state(state: &AssetState) -> Result<Self> {
		let mut properties = Vec::with_capacity(state.properties.len());
		for property in &state.properties {
			properties.push(PropertyDefinition::from_state(property)?);
		}

		Ok(Self {
			id: state.id.clone(),
			type_id: state.type_id.clone(),
			preset_id: state.preset_id.clone(),
			runtime_only: state.runtime_only,
			properties,
			data: state.data.clone(),
		})
	}

	pub fn to_state(&self) -> AssetState {
		AssetState {
			id: self.id.clone(),
			type_id: self.type_id.clone(),
			preset_id: self.preset_id.clone(),
			runtime_only: self.runtime_only,
			properties: self.properties.iter().map(PropertyDefinition::to_state).collect(),
			data: self.data.clone(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn type_id(&self) -> &str {
		&self.type_id
	}

	pub fn runtime_only(&self) -> bool {
		self.runtime_only
	}

	pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
		self.properties.iter().find(|p| p.name() == name)
	}

	pub fn properties(&self) -> impl Iterator<Item = &PropertyDefinition> {
		self.properties.iter()
	}

	/// Validate and commit a write to one named property
	pub fn set_property(&self, name: &str, value: PropertyValue, origin: ChangeOrigin) -> std::result::Result<ValueCommit, PropertyError> {
		let property = self.property(name).ok_or_else(|| PropertyError::UnknownProperty(name.to_string()))?;
		property.set_value(value, origin)
	}

	/// Rescope every property to the given stage; returns what each one
	/// resolved to so the owner can notify
	pub fn enter_stage(&self, stage_id: &str) -> Vec<(String, ValueCommit)> {
		self
			.properties
			.iter()
			.map(|property| (property.name().to_string(), property.set_stage(stage_id)))
			.collect()
	}

	pub fn remove_stage(&self, stage_id: &str) {
		for property in &self.properties {
			property.remove_stage(stage_id);
		}
	}
}
