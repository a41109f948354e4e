use crate::error::Result;
use crate::model::AssetState;
use async_trait::async_trait;
use sim_events::AssetTypeId;

/// Narrow contract to whatever materializes asset content.
///
/// The runtime drives it and never looks inside: type resolution,
/// addressable resources, and the visual representation of assets all live
/// behind this seam.
#[async_trait]
pub trait AssetProvider: Send + Sync {
	/// Resolve and materialize the given asset types. Failure here is the
	/// one error that aborts a scenario load.
	async fn load_asset_types(&self, type_ids: &[AssetTypeId]) -> Result<()>;

	/// Release previously materialized asset types and their resources.
	async fn release_asset_types(&self, type_ids: &[AssetTypeId]) -> Result<()>;

	/// Bring one asset instance to life from its serialized state.
	async fn instantiate(&self, asset: &AssetState) -> Result<()>;

	/// Tear down every live asset instance.
	async fn destroy_all(&self) -> Result<()>;

	/// Toggle interactivity on all live assets.
	async fn set_interactive(&self, enabled: bool) -> Result<()>;

	/// Show or hide all live assets.
	async fn set_all_visible(&self, visible: bool) -> Result<()>;
}

/// Provider that materializes nothing. Suits headless hosts and tests
/// where only the lifecycle and property graph matter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

#[async_trait]
impl AssetProvider for NullProvider {
	async fn load_asset_types(&self, _type_ids: &[AssetTypeId]) -> Result<()> {
		Ok(())
	}

	async fn release_asset_types(&self, _type_ids: &[AssetTypeId]) -> Result<()> {
		Ok(())
	}

	async fn instantiate(&self, _asset: &AssetState) -> Result<()> {
		Ok(())
	}

	async fn destroy_all(&self) -> Result<()> {
		Ok(())
	}

	async fn set_interactive(&self, _enabled: bool) -> Result<()> {
		Ok(())
	}

	async fn set_all_visible(&self, _visible: bool) -> Result<()> {
		Ok(())
	}
}
