use crate::error::{PropertyError, Result};
use crate::store::{StageEntry, Validation, ValidatorId, ValueCommit, ValueStore};
use serde::{Deserialize, Serialize};
use sim_events::{ChangeOrigin, PropertyKind, PropertyName, PropertyValue, StageId};
use tracing::debug;

/// Serialized form of one stage entry.
///
/// The initial value is not persisted; it is recaptured from the local
/// value when the property is materialized at load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageEntryState {
	pub stage_id: StageId,
	pub use_shared: bool,
	pub reset_on_stage_change: bool,
	pub local_value: PropertyValue,
}

/// Serialized form of one property, embedded in asset data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyState {
	pub name: PropertyName,
	pub kind: PropertyKind,
	pub default_value: PropertyValue,
	pub shared_value: PropertyValue,
	#[serde(default)]
	pub stage_entries: Vec<StageEntryState>,
}

/// Binds a [`ValueStore`] to a property name.
///
/// This is the only surface owners touch: get and set by [`PropertyValue`],
/// no generics, no reflection. The store behind it carries the stage
/// scoping and validation.
pub struct PropertyDefinition {
	name: PropertyName,
	store: ValueStore,
}

impl PropertyDefinition {
	pub fn new(name: impl Into<PropertyName>, default_value: PropertyValue) -> Self {
		Self {
			name: name.into(),
			store: ValueStore::new(default_value),
		}
	}

	/// Materialize a definition from its serialized state.
	///
	/// Every embedded value must match the declared kind; local values
	/// double as the initial values runtime resets fall back to.
	pub fn from_state(state: &PropertyState) -> Result<Self> {
		if state.default_value.kind() != state.kind {
			return Err(PropertyError::MalformedState(format!(
				"property {} declares kind {} but its default is {}",
				state.name,
				state.kind,
				state.default_value.kind()
			)));
		}

		let def = Self::new(state.name.clone(), state.default_value.clone());
		def.store.seed_shared(state.shared_value.clone())?;

		for entry in &state.stage_entries {
			def.store.configure_entry(StageEntry {
				stage_id: entry.stage_id.clone(),
				use_shared: entry.use_shared,
				reset_on_stage_change: entry.reset_on_stage_change,
				local_value: entry.local_value.clone(),
				initial_value: entry.local_value.clone(),
			})?;
		}

		Ok(def)
	}

	/// Serialize the current state back into the shape [`Self::from_state`] accepts
	pub fn to_state(&self) -> PropertyState {
		PropertyState {
			name: self.name.clone(),
			kind: self.store.kind(),
			default_value: self.store.default_value(),
			shared_value: self.store.shared_value(),
			stage_entries: self
				.store
				.entries()
				.into_iter()
				.map(|e| StageEntryState {
					stage_id: e.stage_id,
					use_shared: e.use_shared,
					reset_on_stage_change: e.reset_on_stage_change,
					local_value: e.local_value,
				})
				.collect(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn kind(&self) -> PropertyKind {
		self.store.kind()
	}

	/// Resolved value for the current stage
	pub fn value(&self) -> PropertyValue {
		self.store.resolved()
	}

	/// Resolved value for a specific stage
	pub fn value_in(&self, stage_id: &str) -> PropertyValue {
		self.store.value_in(stage_id)
	}

	/// Typed read of the resolved value; `None` when the kind does not match
	pub fn get_as<T>(&self) -> Option<T>
	where
		T: TryFrom<PropertyValue>,
	{
		T::try_from(self.store.resolved()).ok()
	}

	/// Validate and commit a write. The origin is the caller's claim about
	/// why this write happened; it travels with the change notification.
	pub fn set_value(&self, value: PropertyValue, origin: ChangeOrigin) -> Result<ValueCommit> {
		let commit = self.store.set_value(value)?;
		debug!("property {} <- {} ({:?}, {:?})", self.name, commit.value, commit.field, origin);
		Ok(commit)
	}

	/// Make a stage's entry authoritative; see [`ValueStore::set_stage`]
	pub fn set_stage(&self, stage_id: &str) -> ValueCommit {
		self.store.set_stage(stage_id)
	}

	pub fn remove_stage(&self, stage_id: &str) {
		self.store.remove_stage(stage_id);
	}

	pub fn set_value_persistence(&self, persist: bool) {
		self.store.set_value_persistence(persist);
	}

	pub fn register_validator<F>(&self, validator: F) -> ValidatorId
	where
		F: Fn(&PropertyValue) -> Validation + Send + Sync + 'static,
	{
		self.store.register_validator(validator)
	}

	pub fn unregister_validator(&self, id: ValidatorId) -> bool {
		self.store.unregister_validator(id)
	}
}
