use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tag for the supported property value kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
	Bool,
	Int,
	Float,
	Text,
}

impl fmt::Display for PropertyKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			PropertyKind::Bool => "bool",
			PropertyKind::Int => "int",
			PropertyKind::Float => "float",
			PropertyKind::Text => "text",
		};
		f.write_str(name)
	}
}

/// A property value, closed over the kinds the simulation supports.
///
/// Storage and iteration stay reflection-free: owners hold these directly
/// and dispatch on the tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PropertyValue {
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(String),
}

impl PropertyValue {
	pub fn kind(&self) -> PropertyKind {
		match self {
			PropertyValue::Bool(_) => PropertyKind::Bool,
			PropertyValue::Int(_) => PropertyKind::Int,
			PropertyValue::Float(_) => PropertyKind::Float,
			PropertyValue::Text(_) => PropertyKind::Text,
		}
	}

	/// Bit-for-bit equality. Floats compare by raw bits, so NaN == NaN
	/// and +0.0 != -0.0; validator consensus relies on this being exact.
	pub fn same_bits(&self, other: &PropertyValue) -> bool {
		match (self, other) {
			(PropertyValue::Float(a), PropertyValue::Float(b)) => a.to_bits() == b.to_bits(),
			(a, b) => a == b,
		}
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			PropertyValue::Bool(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			PropertyValue::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_float(&self) -> Option<f64> {
		match self {
			PropertyValue::Float(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&str> {
		match self {
			PropertyValue::Text(v) => Some(v),
			_ => None,
		}
	}
}

impl fmt::Display for PropertyValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PropertyValue::Bool(v) => write!(f, "{}", v),
			PropertyValue::Int(v) => write!(f, "{}", v),
			PropertyValue::Float(v) => write!(f, "{}", v),
			PropertyValue::Text(v) => f.write_str(v),
		}
	}
}

/// Conversion failure from a [`PropertyValue`] to a concrete type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wrong property kind: expected {expected}, got {actual}")]
pub struct WrongKind {
	pub expected: PropertyKind,
	pub actual: PropertyKind,
}

impl From<bool> for PropertyValue {
	fn from(v: bool) -> Self {
		PropertyValue::Bool(v)
	}
}

impl From<i64> for PropertyValue {
	fn from(v: i64) -> Self {
		PropertyValue::Int(v)
	}
}

impl From<f64> for PropertyValue {
	fn from(v: f64) -> Self {
		PropertyValue::Float(v)
	}
}

impl From<String> for PropertyValue {
	fn from(v: String) -> Self {
		PropertyValue::Text(v)
	}
}

impl From<&str> for PropertyValue {
	fn from(v: &str) -> Self {
		PropertyValue::Text(v.to_string())
	}
}

impl TryFrom<PropertyValue> for bool {
	type Error = WrongKind;

	fn try_from(v: PropertyValue) -> Result<Self, WrongKind> {
		v.as_bool().ok_or(WrongKind {
			expected: PropertyKind::Bool,
			actual: v.kind(),
		})
	}
}

impl TryFrom<PropertyValue> for i64 {
	type Error = WrongKind;

	fn try_from(v: PropertyValue) -> Result<Self, WrongKind> {
		v.as_int().ok_or(WrongKind {
			expected: PropertyKind::Int,
			actual: v.kind(),
		})
	}
}

impl TryFrom<PropertyValue> for f64 {
	type Error = WrongKind;

	fn try_from(v: PropertyValue) -> Result<Self, WrongKind> {
		v.as_float().ok_or(WrongKind {
			expected: PropertyKind::Float,
			actual: v.kind(),
		})
	}
}

impl TryFrom<PropertyValue> for String {
	type Error = WrongKind;

	fn try_from(v: PropertyValue) -> Result<Self, WrongKind> {
		match v {
			PropertyValue::Text(s) => Ok(s),
			other => Err(WrongKind {
				expected: PropertyKind::Text,
				actual: other.kind(),
			}),
		}
	}
}
