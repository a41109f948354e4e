use std::collections::HashMap;

/// Well-known flag names
pub mod features {
	/// Skip the deferred post-load reveal and show content immediately
	pub const INSTANT_REVEAL: &str = "instantReveal";
}

/// Read-only boolean lookups gating optional behavior.
///
/// Never consulted for correctness; an implementation that answers `false`
/// to everything is always valid.
pub trait FeatureFlags: Send + Sync {
	fn is_enabled(&self, flag: &str) -> bool;
}

/// Everything off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFlags;

impl FeatureFlags for NoFlags {
	fn is_enabled(&self, _flag: &str) -> bool {
		false
	}
}

/// Fixed flag set, resolved once at startup
#[derive(Debug, Clone, Default)]
pub struct StaticFlags {
	flags: HashMap<String, bool>,
}

impl StaticFlags {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn enable(mut self, flag: impl Into<String>) -> Self {
		self.flags.insert(flag.into(), true);
		self
	}

	pub fn set(mut self, flag: impl Into<String>, enabled: bool) -> Self {
		self.flags.insert(flag.into(), enabled);
		self
	}
}

impl FeatureFlags for StaticFlags {
	fn is_enabled(&self, flag: &str) -> bool {
		self.flags.get(flag).copied().unwrap_or(false)
	}
}
