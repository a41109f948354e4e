use crate::model::Stage;
use sim_events::{StageId, TimeMs};
use tokio::time::Instant;

/// Record of a completed stage switch, delivered after the pointer moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSwitch {
	pub from: Option<StageId>,
	pub to: StageId,
	/// Elapsed time of the stage just left, for the timer to fold into
	/// cumulative simulation time
	pub elapsed_in_previous: TimeMs,
}

/// Ordered stage list with a current-stage pointer and per-stage clock.
///
/// Exactly one stage is current while a scenario is loaded, none while the
/// sequencer is empty. The clock counts elapsed time in the current stage;
/// it starts on play, stops on pause, and rebases to zero on every switch.
#[derive(Debug)]
pub struct StageSequencer {
	stages: Vec<Stage>,
	current: Option<usize>,
	clock_started: Option<Instant>,
	accumulated: TimeMs,
}

impl StageSequencer {
	pub fn new() -> Self {
		Self {
			stages: Vec::new(),
			current: None,
			clock_started: None,
			accumulated: 0,
		}
	}

	/// Build from authored stages, ordered by ordinal, first stage current
	pub fn from_stages(mut stages: Vec<Stage>) -> Self {
		stages.sort_by_key(|s| s.ordinal);
		let current = if stages.is_empty() { None } else { Some(0) };
		Self {
			stages,
			current,
			clock_started: None,
			accumulated: 0,
		}
	}

	pub fn stages(&self) -> &[Stage] {
		&self.stages
	}

	pub fn len(&self) -> usize {
		self.stages.len()
	}

	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}

	pub fn current_stage(&self) -> Option<&Stage> {
		self.current.map(|idx| &self.stages[idx])
	}

	pub fn current_stage_id(&self) -> Option<StageId> {
		self.current_stage().map(|s| s.id.clone())
	}

	/// Elapsed time in the current stage
	pub fn elapsed_in_current(&self) -> TimeMs {
		let live = self.clock_started.map_or(0, |started| started.elapsed().as_millis() as TimeMs);
		self.accumulated + live
	}

	pub fn start_clock(&mut self) {
		if self.clock_started.is_none() {
			self.clock_started = Some(Instant::now());
		}
	}

	pub fn stop_clock(&mut self) {
		if let Some(started) = self.clock_started.take() {
			self.accumulated += started.elapsed().as_millis() as TimeMs;
		}
	}

	/// Overwrite the current stage's elapsed time; used when adopting the
	/// host's clocks on late join
	pub fn set_elapsed(&mut self, elapsed: TimeMs) {
		self.accumulated = elapsed;
		if self.clock_started.is_some() {
			self.clock_started = Some(Instant::now());
		}
	}

	/// Switch to a stage by id. `None` when the id is unknown or already
	/// current; the pointer has moved by the time the record is returned.
	pub fn switch_to(&mut self, stage_id: &str) -> Option<StageSwitch> {
		let idx = self.stages.iter().position(|s| s.id == stage_id)?;
		if self.current == Some(idx) {
			return None;
		}
		Some(self.move_to(idx))
	}

	/// Switch to the next stage in order
	pub fn advance(&mut self) -> Option<StageSwitch> {
		let next = self.current.map_or(0, |idx| idx + 1);
		if next >= self.stages.len() {
			return None;
		}
		Some(self.move_to(next))
	}

	/// Switch to the previous stage in order
	pub fn retreat(&mut self) -> Option<StageSwitch> {
		let idx = self.current?;
		if idx == 0 {
			return None;
		}
		Some(self.move_to(idx - 1))
	}

	fn move_to(&mut self, idx: usize) -> StageSwitch {
		let from = self.current_stage_id();
		let elapsed_in_previous = self.elapsed_in_current();

		self.current = Some(idx);
		self.accumulated = 0;
		if self.clock_started.is_some() {
			self.clock_started = Some(Instant::now());
		}

		StageSwitch {
			from,
			to: self.stages[idx].id.clone(),
			elapsed_in_previous,
		}
	}

	/// Apply an alternate stage ordering. Every stage must appear exactly
	/// once; the current stage stays current under its id.
	pub fn reorder(&mut self, order: &[StageId]) -> bool {
		if order.len() != self.stages.len() {
			return false;
		}

		let mut reordered = Vec::with_capacity(order.len());
		for stage_id in order {
			match self.stages.iter().find(|s| &s.id == stage_id) {
				Some(stage) => reordered.push(stage.clone()),
				None => return false,
			}
		}

		let current_id = self.current_stage_id();
		self.stages = reordered;
		self.current = current_id.and_then(|id| self.stages.iter().position(|s| s.id == id));
		true
	}

	pub fn clear(&mut self) {
		self.stages.clear();
		self.current = None;
		self.clock_started = None;
		self.accumulated = 0;
	}
}

impl Default for StageSequencer {
	fn default() -> Self {
		Self::new()
	}
}
