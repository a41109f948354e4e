use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
	/// Interval between host sync snapshots (ms)
	#[serde(default = "default_sync_interval")]
	pub sync_interval_ms: u64,

	/// Delay between load completing and revealing instantiated content (ms),
	/// so late-joining presentation can catch up
	#[serde(default = "default_reveal_delay")]
	pub reveal_delay_ms: u64,

	/// Capacity of the in-process event bus
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

fn default_sync_interval() -> u64 {
	100 // 100ms snapshot rate
}

fn default_reveal_delay() -> u64 {
	2000 // 2 seconds
}

fn default_event_capacity() -> usize {
	256
}

impl SessionConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_sync_interval(mut self, interval_ms: u64) -> Self {
		self.sync_interval_ms = interval_ms;
		self
	}

	pub fn with_reveal_delay(mut self, delay_ms: u64) -> Self {
		self.reveal_delay_ms = delay_ms;
		self
	}

	pub fn with_event_capacity(mut self, capacity: usize) -> Self {
		self.event_capacity = capacity;
		self
	}

	pub fn sync_interval(&self) -> Duration {
		Duration::from_millis(self.sync_interval_ms)
	}

	pub fn reveal_delay(&self) -> Duration {
		Duration::from_millis(self.reveal_delay_ms)
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.sync_interval_ms == 0 {
			return Err("sync interval must be greater than zero".to_string());
		}
		if self.event_capacity == 0 {
			return Err("event capacity must be greater than zero".to_string());
		}
		Ok(())
	}
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			sync_interval_ms: default_sync_interval(),
			reveal_delay_ms: default_reveal_delay(),
			event_capacity: default_event_capacity(),
		}
	}
}
