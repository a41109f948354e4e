//! Shared event vocabulary for the scenario runtime.
//!
//! Holds the types every other crate speaks in: scenario status, change
//! origins, property values, sync snapshots, wire event codes, and the
//! owned [`EventBus`] used for in-process lifecycle notifications.

pub mod bus;
pub mod snapshot;
pub mod types;
pub mod value;
pub mod wire;

pub use bus::{EventBus, ScenarioEvent};
pub use snapshot::SyncSnapshot;
pub use types::{AssetId, AssetTypeId, ChangeOrigin, ChangedField, PropertyName, ScenarioStatus, StageId, TimeMs};
pub use value::{PropertyKind, PropertyValue, WrongKind};
pub use wire::{EventCode, PropertyUpdate, WireEvent};
