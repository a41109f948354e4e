use sim_events::TimeMs;
use tokio::time::Instant;

/// Session clock bookkeeping.
///
/// Two clocks with different pause behavior: scenario play time is
/// wall-clock time spent playing and freezes while paused; simulation time
/// is the fold of per-stage elapsed time and drives simulated processes.
/// Both accept explicit totals so a late joiner reads the same logical time
/// as the host.
#[derive(Debug)]
pub struct ScenarioTimer {
	play_started: Option<Instant>,
	accumulated_play: TimeMs,
	folded_stage_ms: TimeMs,
}

impl ScenarioTimer {
	pub fn new() -> Self {
		Self {
			play_started: None,
			accumulated_play: 0,
			folded_stage_ms: 0,
		}
	}

	pub fn start_play(&mut self) {
		if self.play_started.is_none() {
			self.play_started = Some(Instant::now());
		}
	}

	pub fn pause_play(&mut self) {
		if let Some(started) = self.play_started.take() {
			self.accumulated_play += started.elapsed().as_millis() as TimeMs;
		}
	}

	pub fn is_running(&self) -> bool {
		self.play_started.is_some()
	}

	/// Wall-clock time spent in the playing state
	pub fn total_ms_in_scenario(&self) -> TimeMs {
		let live = self.play_started.map_or(0, |started| started.elapsed().as_millis() as TimeMs);
		self.accumulated_play + live
	}

	/// Fold the elapsed time of a stage that was just left
	pub fn fold_stage_time(&mut self, elapsed: TimeMs) {
		self.folded_stage_ms += elapsed;
	}

	/// Cumulative stage time: completed stages plus the live current stage
	pub fn total_ms_in_simulation(&self, current_stage_elapsed: TimeMs) -> TimeMs {
		self.folded_stage_ms + current_stage_elapsed
	}

	/// Adopt a play-time total from the host
	pub fn set_scenario_total(&mut self, total: TimeMs) {
		self.accumulated_play = total;
		if self.play_started.is_some() {
			self.play_started = Some(Instant::now());
		}
	}

	/// Adopt a simulation-time total from the host, given what the current
	/// stage's clock will read
	pub fn set_simulation_total(&mut self, total: TimeMs, current_stage_elapsed: TimeMs) {
		self.folded_stage_ms = (total - current_stage_elapsed).max(0);
	}

	pub fn reset(&mut self) {
		self.play_started = None;
		self.accumulated_play = 0;
		self.folded_stage_ms = 0;
	}
}

impl Default for ScenarioTimer {
	fn default() -> Self {
		Self::new()
	}
}
