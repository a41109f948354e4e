use sim_events::PropertyKind;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PropertyError>;

#[derive(Debug, Error)]
pub enum PropertyError {
	/// A registered validator vetoed the proposed value
	#[error("validation rejected: {0}")]
	Rejected(String),

	/// Validators disagreed on the settled value during the consensus pass
	#[error("validator conflict: {0}")]
	ValidatorConflict(String),

	#[error("kind mismatch: expected {expected}, got {actual}")]
	KindMismatch { expected: PropertyKind, actual: PropertyKind },

	#[error("unknown property: {0}")]
	UnknownProperty(String),

	#[error("malformed property state: {0}")]
	MalformedState(String),
}

impl PropertyError {
	/// Rejections are an expected outcome the rule layer handles;
	/// everything else signals broken wiring or data.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, Self::Rejected(_))
	}
}
