use sim_props::PropertyError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScenarioError>;

#[derive(Debug, Error)]
pub enum ScenarioError {
	#[error("invalid scenario: {0}")]
	InvalidScenario(String),

	#[error("no scenario loaded")]
	NotLoaded,

	#[error("asset {0} not found")]
	AssetNotFound(String),

	/// Asset type materialization failed during load; the load unwinds
	#[error("asset type load failed: {0}")]
	AssetTypeLoad(String),

	#[error("asset instantiation failed: {0}")]
	Instantiation(String),

	#[error("provider failure: {0}")]
	Provider(String),

	#[error(transparent)]
	Property(#[from] PropertyError),
}

impl ScenarioError {
	pub fn is_recoverable(&self) -> bool {
		match self {
			Self::NotLoaded | Self::AssetNotFound(_) => true,
			Self::Property(err) => err.is_recoverable(),
			_ => false,
		}
	}
}
