use crate::types::{AssetId, ChangeOrigin, PropertyName};
use crate::value::PropertyValue;
use serde::{Deserialize, Serialize};

/// Closed set of wire event codes.
///
/// Dispatch on inbound traffic is a plain `match` on this tag; there is no
/// runtime probing for a payload handler. Codes are stable u8 values on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum EventCode {
	StatusSync = 1,
	PropertySet = 2,
	StageSwitch = 3,
	AssetSpawn = 4,
}

/// Envelope for everything that crosses the transport.
///
/// The payload stays opaque JSON here; each code has exactly one payload
/// shape and the receiving side deserializes against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
	pub code: EventCode,
	pub payload: serde_json::Value,
}

impl WireEvent {
	pub fn new(code: EventCode, payload: serde_json::Value) -> Self {
		Self { code, payload }
	}
}

/// Payload for [`EventCode::PropertySet`]: one live property edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyUpdate {
	pub asset_id: AssetId,
	pub property: PropertyName,
	pub value: PropertyValue,
	pub origin: ChangeOrigin,
}
