use crate::error::{PropertyError, Result};
use sim_events::{ChangedField, PropertyKind, PropertyValue, StageId};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

/// Outcome of a single validator run
pub enum Validation {
	/// The value is acceptable as proposed
	Accept,
	/// The value is acceptable after being rewritten
	Replace(PropertyValue),
	/// The write is vetoed
	Reject(String),
}

type ValidatorFn = Box<dyn Fn(&PropertyValue) -> Validation + Send + Sync>;

/// Handle returned by [`ValueStore::register_validator`], used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidatorId(u64);

/// One stage's view of a property.
///
/// `initial_value` is captured when the entry is created (scenario load or
/// first visit) and is never touched by runtime writes; it is what
/// `local_value` snaps back to when `reset_on_stage_change` is set and the
/// stage becomes current again.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEntry {
	pub stage_id: StageId,
	pub use_shared: bool,
	pub reset_on_stage_change: bool,
	pub local_value: PropertyValue,
	pub initial_value: PropertyValue,
}

/// What a committed write changed, for the owner's change notification
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCommit {
	pub field: ChangedField,
	pub value: PropertyValue,
}

struct StoreInner {
	default_value: PropertyValue,
	shared_value: PropertyValue,
	entries: Vec<StageEntry>,
	current_stage: Option<StageId>,
	/// Applied to entries created after a persistence flip
	reset_new_entries: bool,
	validators: Vec<(ValidatorId, ValidatorFn)>,
	next_validator: u64,
}

impl StoreInner {
	fn entry_index(&self, stage_id: &str) -> Option<usize> {
		self.entries.iter().position(|e| e.stage_id == stage_id)
	}

	/// Resolve the authoritative value for a stage: shared wins whenever the
	/// entry says so or the stage has never been materialized.
	fn value_in(&self, stage_id: &str) -> PropertyValue {
		match self.entry_index(stage_id) {
			Some(idx) if !self.entries[idx].use_shared => self.entries[idx].local_value.clone(),
			_ => self.shared_value.clone(),
		}
	}

	fn resolved(&self) -> PropertyValue {
		match &self.current_stage {
			Some(stage) => self.value_in(stage),
			None => self.shared_value.clone(),
		}
	}
}

/// Per-property versioned value holder.
///
/// All reads and writes serialize on one exclusive lock; validators run
/// inside that lock and must neither block nor call back into the store.
pub struct ValueStore {
	kind: PropertyKind,
	inner: Mutex<StoreInner>,
}

impl ValueStore {
	pub fn new(default_value: PropertyValue) -> Self {
		let kind = default_value.kind();
		Self {
			kind,
			inner: Mutex::new(StoreInner {
				shared_value: default_value.clone(),
				default_value,
				entries: Vec::new(),
				current_stage: None,
				reset_new_entries: false,
				validators: Vec::new(),
				next_validator: 0,
			}),
		}
	}

	fn lock(&self) -> MutexGuard<'_, StoreInner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}

	pub fn kind(&self) -> PropertyKind {
		self.kind
	}

	pub fn default_value(&self) -> PropertyValue {
		self.lock().default_value.clone()
	}

	pub fn shared_value(&self) -> PropertyValue {
		self.lock().shared_value.clone()
	}

	pub fn current_stage(&self) -> Option<StageId> {
		self.lock().current_stage.clone()
	}

	/// Value a given stage observes right now
	pub fn value_in(&self, stage_id: &str) -> PropertyValue {
		self.lock().value_in(stage_id)
	}

	/// Value the current stage observes (shared value while no stage is set)
	pub fn resolved(&self) -> PropertyValue {
		self.lock().resolved()
	}

	/// Snapshot of all stage entries, for serialization
	pub fn entries(&self) -> Vec<StageEntry> {
		self.lock().entries.clone()
	}

	/// Validate and commit a new value.
	///
	/// The write lands in the shared slot or the current stage's local slot
	/// depending on that stage's `use_shared` flag. A rejection leaves the
	/// store untouched.
	pub fn set_value(&self, proposed: PropertyValue) -> Result<ValueCommit> {
		let mut inner = self.lock();

		if proposed.kind() != self.kind {
			return Err(PropertyError::KindMismatch {
				expected: self.kind,
				actual: proposed.kind(),
			});
		}

		let settled = run_pipeline(&inner.validators, proposed)?;

		let target = inner.current_stage.clone().and_then(|stage| inner.entry_index(&stage));
		let field = match target {
			Some(idx) if !inner.entries[idx].use_shared => {
				inner.entries[idx].local_value = settled.clone();
				ChangedField::Local
			}
			_ => {
				// shared is global: it refreshes every stage's local slot too,
				// so stages holding a local override observe the write. Initial
				// values stay untouched and stage-reentry resets still restore them.
				inner.shared_value = settled.clone();
				for entry in &mut inner.entries {
					entry.local_value = settled.clone();
				}
				ChangedField::Shared
			}
		};

		Ok(ValueCommit { field, value: settled })
	}

	/// Switch which stage entry is authoritative.
	///
	/// A stage seen for the first time gets an entry initialized from the
	/// design-time default. When the entry asks for it, the local value is
	/// restored from its initial value before the stage becomes current.
	pub fn set_stage(&self, stage_id: &str) -> ValueCommit {
		let mut inner = self.lock();

		let idx = match inner.entry_index(stage_id) {
			Some(idx) => idx,
			None => {
				let entry = StageEntry {
					stage_id: stage_id.to_string(),
					use_shared: true,
					reset_on_stage_change: inner.reset_new_entries,
					local_value: inner.default_value.clone(),
					initial_value: inner.default_value.clone(),
				};
				inner.entries.push(entry);
				inner.entries.len() - 1
			}
		};

		if inner.entries[idx].reset_on_stage_change {
			inner.entries[idx].local_value = inner.entries[idx].initial_value.clone();
		}

		inner.current_stage = Some(stage_id.to_string());

		let field = if inner.entries[idx].use_shared { ChangedField::Shared } else { ChangedField::Local };
		ValueCommit {
			field,
			value: inner.value_in(stage_id),
		}
	}

	/// Drop the entry for a stage that left the sequencer
	pub fn remove_stage(&self, stage_id: &str) {
		let mut inner = self.lock();
		if let Some(idx) = inner.entry_index(stage_id) {
			inner.entries.remove(idx);
		}
		if inner.current_stage.as_deref() == Some(stage_id) {
			inner.current_stage = None;
		}
	}

	/// Control whether local edits survive stage re-entry.
	///
	/// `persist = false` flips `reset_on_stage_change` on for every entry,
	/// current and future; `persist = true` flips it off.
	pub fn set_value_persistence(&self, persist: bool) {
		let mut inner = self.lock();
		inner.reset_new_entries = !persist;
		for entry in &mut inner.entries {
			entry.reset_on_stage_change = !persist;
		}
	}

	/// Insert an authored stage entry, capturing its initial value.
	/// Used when materializing a property from scenario data.
	pub fn configure_entry(&self, entry: StageEntry) -> Result<()> {
		if entry.local_value.kind() != self.kind {
			return Err(PropertyError::KindMismatch {
				expected: self.kind,
				actual: entry.local_value.kind(),
			});
		}

		let mut inner = self.lock();
		match inner.entry_index(&entry.stage_id) {
			Some(idx) => inner.entries[idx] = entry,
			None => inner.entries.push(entry),
		}
		Ok(())
	}

	/// Overwrite the shared slot without running validators.
	/// Load-time only; runtime writes go through [`ValueStore::set_value`].
	pub fn seed_shared(&self, value: PropertyValue) -> Result<()> {
		if value.kind() != self.kind {
			return Err(PropertyError::KindMismatch {
				expected: self.kind,
				actual: value.kind(),
			});
		}
		self.lock().shared_value = value;
		Ok(())
	}

	pub fn register_validator<F>(&self, validator: F) -> ValidatorId
	where
		F: Fn(&PropertyValue) -> Validation + Send + Sync + 'static,
	{
		let mut inner = self.lock();
		let id = ValidatorId(inner.next_validator);
		inner.next_validator += 1;
		inner.validators.push((id, Box::new(validator)));
		id
	}

	pub fn unregister_validator(&self, id: ValidatorId) -> bool {
		let mut inner = self.lock();
		match inner.validators.iter().position(|(vid, _)| *vid == id) {
			Some(idx) => {
				inner.validators.remove(idx);
				true
			}
			None => false,
		}
	}

	pub fn validator_count(&self) -> usize {
		self.lock().validators.len()
	}
}

/// Two-pass validator pipeline.
///
/// Pass one folds the proposed value through every validator in
/// registration order; a veto short-circuits the whole write. Pass two
/// re-runs every validator against the settled value and requires
/// bit-for-bit agreement: any further rewrite or veto means the validators
/// contradict each other, and the write is rejected outright.
fn run_pipeline(validators: &[(ValidatorId, ValidatorFn)], proposed: PropertyValue) -> Result<PropertyValue> {
	let mut value = proposed;

	for (_, validator) in validators {
		match validator(&value) {
			Validation::Accept => {}
			Validation::Replace(next) => value = next,
			Validation::Reject(reason) => return Err(PropertyError::Rejected(reason)),
		}
	}

	for (id, validator) in validators {
		match validator(&value) {
			Validation::Accept => {}
			Validation::Replace(other) if other.same_bits(&value) => {}
			Validation::Replace(other) => {
				warn!("validator {:?} rewrote an already-settled value ({} -> {})", id, value, other);
				return Err(PropertyError::ValidatorConflict(format!("validator rewrote settled value {} to {}", value, other)));
			}
			Validation::Reject(reason) => {
				warn!("validator {:?} vetoed a value that passed the first pass: {}", id, reason);
				return Err(PropertyError::ValidatorConflict(reason));
			}
		}
	}

	Ok(value)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn int_store(default: i64) -> ValueStore {
		ValueStore::new(PropertyValue::Int(default))
	}

	#[test]
	fn test_uninitialized_stage_reads_shared() {
		let store = int_store(7);
		assert_eq!(store.value_in("s0"), PropertyValue::Int(7));
		assert_eq!(store.resolved(), PropertyValue::Int(7));
	}

	#[test]
	fn test_set_value_without_stage_writes_shared() {
		let store = int_store(0);
		let commit = store.set_value(PropertyValue::Int(5)).unwrap();

		assert_eq!(commit.field, ChangedField::Shared);
		assert_eq!(store.shared_value(), PropertyValue::Int(5));
	}

	#[test]
	fn test_local_slot_respected() {
		let store = int_store(0);
		store
			.configure_entry(StageEntry {
				stage_id: "s0".into(),
				use_shared: false,
				reset_on_stage_change: false,
				local_value: PropertyValue::Int(5),
				initial_value: PropertyValue::Int(5),
			})
			.unwrap();

		assert_eq!(store.value_in("s0"), PropertyValue::Int(5));

		store.set_stage("s0");
		let commit = store.set_value(PropertyValue::Int(9)).unwrap();

		assert_eq!(commit.field, ChangedField::Local);
		assert_eq!(store.value_in("s0"), PropertyValue::Int(9));
		// the shared slot is untouched by local writes
		assert_eq!(store.shared_value(), PropertyValue::Int(0));
	}

	#[test]
	fn test_shared_write_is_global() {
		let store = int_store(0);
		store
			.configure_entry(StageEntry {
				stage_id: "s0".into(),
				use_shared: false,
				reset_on_stage_change: false,
				local_value: PropertyValue::Int(5),
				initial_value: PropertyValue::Int(5),
			})
			.unwrap();
		store
			.configure_entry(StageEntry {
				stage_id: "s1".into(),
				use_shared: true,
				reset_on_stage_change: false,
				local_value: PropertyValue::Int(0),
				initial_value: PropertyValue::Int(0),
			})
			.unwrap();

		store.set_stage("s1");
		store.set_value(PropertyValue::Int(99)).unwrap();

		// every stage observes a shared write, local overrides included
		assert_eq!(store.value_in("s1"), PropertyValue::Int(99));
		assert_eq!(store.value_in("s0"), PropertyValue::Int(99));
		assert_eq!(store.value_in("never-seen"), PropertyValue::Int(99));

		// but authored initial values survive for stage-reentry resets
		assert_eq!(store.entries()[0].initial_value, PropertyValue::Int(5));
	}

	#[test]
	fn test_lazy_entry_from_default() {
		let store = int_store(42);
		store.set_value(PropertyValue::Int(1)).unwrap(); // shared now 1

		let commit = store.set_stage("fresh");
		// new entries default to the shared slot
		assert_eq!(commit.field, ChangedField::Shared);
		assert_eq!(commit.value, PropertyValue::Int(1));

		let entries = store.entries();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].local_value, PropertyValue::Int(42));
		assert_eq!(entries[0].initial_value, PropertyValue::Int(42));
	}

	#[test]
	fn test_reset_on_stage_reentry() {
		let store = int_store(0);
		store
			.configure_entry(StageEntry {
				stage_id: "s0".into(),
				use_shared: false,
				reset_on_stage_change: true,
				local_value: PropertyValue::Int(5),
				initial_value: PropertyValue::Int(5),
			})
			.unwrap();

		store.set_stage("s0");
		store.set_value(PropertyValue::Int(77)).unwrap();
		assert_eq!(store.value_in("s0"), PropertyValue::Int(77));

		store.set_stage("other");
		store.set_stage("s0");
		assert_eq!(store.value_in("s0"), PropertyValue::Int(5));

		// idempotent: leaving and re-entering again still lands on the initial value
		store.set_stage("other");
		store.set_stage("s0");
		assert_eq!(store.value_in("s0"), PropertyValue::Int(5));
	}

	#[test]
	fn test_persistence_flip_covers_all_entries() {
		let store = int_store(0);
		store
			.configure_entry(StageEntry {
				stage_id: "s0".into(),
				use_shared: false,
				reset_on_stage_change: false,
				local_value: PropertyValue::Int(1),
				initial_value: PropertyValue::Int(1),
			})
			.unwrap();

		store.set_stage("s0");
		store.set_value(PropertyValue::Int(50)).unwrap();

		store.set_value_persistence(false);
		store.set_stage("s1");
		store.set_stage("s0");

		assert_eq!(store.value_in("s0"), PropertyValue::Int(1));

		// and new entries inherit the flag
		let entries = store.entries();
		assert!(entries.iter().all(|e| e.reset_on_stage_change));
	}

	#[test]
	fn test_kind_mismatch_rejected_before_validators() {
		let store = int_store(0);
		let ran = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
		let ran_clone = ran.clone();
		store.register_validator(move |_| {
			ran_clone.store(true, std::sync::atomic::Ordering::SeqCst);
			Validation::Accept
		});

		let err = store.set_value(PropertyValue::Bool(true)).unwrap_err();
		assert!(matches!(err, PropertyError::KindMismatch { .. }));
		assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
	}

	#[test]
	fn test_validator_transform_chain() {
		let store = int_store(0);
		store.register_validator(|v| match v {
			PropertyValue::Int(n) if *n > 100 => Validation::Replace(PropertyValue::Int(100)),
			_ => Validation::Accept,
		});

		let commit = store.set_value(PropertyValue::Int(250)).unwrap();
		assert_eq!(commit.value, PropertyValue::Int(100));
	}

	#[test]
	fn test_validator_veto_leaves_store_untouched() {
		let store = int_store(3);
		store.register_validator(|v| match v {
			PropertyValue::Int(n) if *n < 0 => Validation::Reject("negative".into()),
			_ => Validation::Accept,
		});

		let err = store.set_value(PropertyValue::Int(-1)).unwrap_err();
		assert!(matches!(err, PropertyError::Rejected(_)));
		assert_eq!(store.shared_value(), PropertyValue::Int(3));
	}

	#[test]
	fn test_conflicting_validators_reject_and_commit_nothing() {
		let store = int_store(0);
		// clamps up to 10
		store.register_validator(|v| match v {
			PropertyValue::Int(n) if *n < 10 => Validation::Replace(PropertyValue::Int(10)),
			_ => Validation::Accept,
		});
		// clamps down to 5 -- cannot agree with the first on anything in between
		store.register_validator(|v| match v {
			PropertyValue::Int(n) if *n > 5 => Validation::Replace(PropertyValue::Int(5)),
			_ => Validation::Accept,
		});

		let err = store.set_value(PropertyValue::Int(7)).unwrap_err();
		assert!(matches!(err, PropertyError::ValidatorConflict(_)));
		assert_eq!(store.shared_value(), PropertyValue::Int(0));
	}

	#[test]
	fn test_unregister_validator() {
		let store = int_store(0);
		let id = store.register_validator(|_| Validation::Reject("always".into()));

		assert!(store.set_value(PropertyValue::Int(1)).is_err());
		assert!(store.unregister_validator(id));
		assert!(!store.unregister_validator(id));
		assert!(store.set_value(PropertyValue::Int(1)).is_ok());
	}

	#[test]
	fn test_remove_stage_drops_entry() {
		let store = int_store(0);
		store.set_stage("s0");
		assert_eq!(store.entries().len(), 1);

		store.remove_stage("s0");
		assert!(store.entries().is_empty());
		assert_eq!(store.current_stage(), None);
	}

	#[test]
	fn test_float_validator_consensus_uses_bits() {
		let store = ValueStore::new(PropertyValue::Float(0.0));
		// normalizes NaN to itself; pass two must treat the identical NaN as agreement
		store.register_validator(|v| match v {
			PropertyValue::Float(f) if f.is_nan() => Validation::Replace(PropertyValue::Float(f64::NAN)),
			_ => Validation::Accept,
		});

		let commit = store.set_value(PropertyValue::Float(f64::NAN)).unwrap();
		assert!(matches!(commit.value, PropertyValue::Float(f) if f.is_nan()));
	}
}
