use crate::config::SessionConfig;
use crate::error::{Result, ScenarioError};
use crate::flags::{features, FeatureFlags, NoFlags};
use crate::model::{Asset, AssetState, Pathway, Scenario};
use crate::provider::AssetProvider;
use crate::sequencer::{StageSequencer, StageSwitch};
use crate::timer::ScenarioTimer;
use sim_events::{AssetTypeId, ChangeOrigin, EventBus, PropertyValue, ScenarioEvent, ScenarioStatus, SyncSnapshot, TimeMs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything that exists only while a scenario is loaded
struct LoadedSession {
	assets: Vec<Asset>,
	sequencer: StageSequencer,
	timer: ScenarioTimer,
	pathways: Vec<Pathway>,
	asset_types: Vec<AssetTypeId>,
	/// Reset target: the scenario as last saved
	saved: Scenario,
}

struct RuntimeInner {
	provider: Arc<dyn AssetProvider>,
	flags: Arc<dyn FeatureFlags>,
	config: SessionConfig,
	bus: EventBus,
	status_tx: watch::Sender<ScenarioStatus>,
	/// Advisory non-reentrant transition lock: a transition attempted while
	/// one is in flight is dropped, never queued
	is_switching: AtomicBool,
	is_saving: AtomicBool,
	session: Mutex<Option<LoadedSession>>,
	play_cancel: StdMutex<Option<CancellationToken>>,
	load_cancel: StdMutex<Option<CancellationToken>>,
	sync_watermark: StdMutex<Option<TimeMs>>,
}

/// Clears the switching flag when a transition finishes, however it exits
struct SwitchGuard<'a> {
	flag: &'a AtomicBool,
}

impl Drop for SwitchGuard<'_> {
	fn drop(&mut self) {
		self.flag.store(false, Ordering::Release);
	}
}

fn lock_std<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The scenario lifecycle state machine.
///
/// Cheap to clone; every clone drives the same scenario. Transitions return
/// `false` when rejected (another transition in flight, wrong current
/// status, or a plain no-op) and perform no partial effects in that case;
/// callers treat `false` as "try again later". Only [`ScenarioRuntime::load`]
/// can fail hard, because a scenario must never be left half-loaded.
#[derive(Clone)]
pub struct ScenarioRuntime {
	inner: Arc<RuntimeInner>,
}

impl ScenarioRuntime {
	pub fn new(provider: Arc<dyn AssetProvider>, config: SessionConfig) -> Self {
		Self::with_flags(provider, Arc::new(NoFlags), config)
	}

	pub fn with_flags(provider: Arc<dyn AssetProvider>, flags: Arc<dyn FeatureFlags>, config: SessionConfig) -> Self {
		let (status_tx, _status_rx) = watch::channel(ScenarioStatus::Unloaded);
		let bus = EventBus::new(config.event_capacity);

		Self {
			inner: Arc::new(RuntimeInner {
				provider,
				flags,
				config,
				bus,
				status_tx,
				is_switching: AtomicBool::new(false),
				is_saving: AtomicBool::new(false),
				session: Mutex::new(None),
				play_cancel: StdMutex::new(None),
				load_cancel: StdMutex::new(None),
				sync_watermark: StdMutex::new(None),
			}),
		}
	}

	pub fn status(&self) -> ScenarioStatus {
		*self.inner.status_tx.borrow()
	}

	pub fn subscribe_status(&self) -> watch::Receiver<ScenarioStatus> {
		self.inner.status_tx.subscribe()
	}

	pub fn bus(&self) -> &EventBus {
		&self.inner.bus
	}

	pub fn config(&self) -> &SessionConfig {
		&self.inner.config
	}

	pub fn is_switching_status(&self) -> bool {
		self.inner.is_switching.load(Ordering::Acquire)
	}

	pub fn is_saving_scenario(&self) -> bool {
		self.inner.is_saving.load(Ordering::Acquire)
	}

	pub async fn is_loaded(&self) -> bool {
		self.inner.session.lock().await.is_some()
	}

	/// Cancellation scope of the running play session, if one is active.
	/// Everything long-running started during play hangs off this token.
	pub fn play_cancellation(&self) -> Option<CancellationToken> {
		lock_std(&self.inner.play_cancel).clone()
	}

	pub fn last_sync_timestamp(&self) -> Option<TimeMs> {
		*lock_std(&self.inner.sync_watermark)
	}

	fn begin_switch(&self) -> Option<SwitchGuard<'_>> {
		if self.inner.is_saving.load(Ordering::Acquire) {
			debug!("transition dropped: save in progress");
			return None;
		}
		if self.inner.is_switching.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
			debug!("transition dropped: another transition in flight");
			return None;
		}
		Some(SwitchGuard {
			flag: &self.inner.is_switching,
		})
	}

	fn set_status(&self, next: ScenarioStatus) {
		self.inner.status_tx.send_replace(next);
		self.inner.bus.publish(ScenarioEvent::StatusChanged { status: next });
	}

	/// Load a scenario. `Ok(false)` means rejected (a scenario is already
	/// loaded or a transition is in flight); an error means asset
	/// materialization failed and the runtime has unwound to `Unloaded`.
	pub async fn load(&self, scenario: Scenario) -> Result<bool> {
		let _switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return Ok(false),
		};

		if self.status() != ScenarioStatus::Unloaded {
			info!("load rejected: a scenario is already loaded");
			return Ok(false);
		}
		if let Err(reason) = scenario.validate() {
			return Err(ScenarioError::InvalidScenario(reason));
		}

		self.set_status(ScenarioStatus::Loading);
		let type_ids = scenario.unique_asset_types();

		match self.materialize(&scenario, &type_ids).await {
			Ok(session) => {
				*self.inner.session.lock().await = Some(session);

				let load_scope = CancellationToken::new();
				*lock_std(&self.inner.load_cancel) = Some(load_scope.clone());

				self.set_status(ScenarioStatus::Loaded);
				self.inner.bus.publish(ScenarioEvent::ScenarioLoaded);
				self.schedule_reveal(load_scope);

				info!("scenario loaded: {} stages, {} assets", scenario.stages.len(), scenario.assets.len());
				Ok(true)
			}
			Err(err) => {
				error!("scenario load failed, unwinding: {err}");
				let _ = self.inner.provider.destroy_all().await;
				let _ = self.inner.provider.release_asset_types(&type_ids).await;
				*self.inner.session.lock().await = None;
				self.set_status(ScenarioStatus::Unloaded);
				Err(err)
			}
		}
	}

	async fn materialize(&self, scenario: &Scenario, type_ids: &[AssetTypeId]) -> Result<LoadedSession> {
		self.inner.provider.load_asset_types(type_ids).await?;

		let sequencer = StageSequencer::from_stages(scenario.stages.clone());
		let mut assets = Vec::with_capacity(scenario.assets.len());
		for state in &scenario.assets {
			self.inner.provider.instantiate(state).await?;
			assets.push(Asset::from_state(state)?);
		}

		// every property starts scoped to the opening stage
		if let Some(stage_id) = sequencer.current_stage_id() {
			for asset in &assets {
				self.publish_stage_entry(asset, &stage_id, ChangeOrigin::Initialization);
			}
		}

		Ok(LoadedSession {
			assets,
			sequencer,
			timer: ScenarioTimer::new(),
			pathways: scenario.pathways.clone(),
			asset_types: type_ids.to_vec(),
			saved: scenario.clone(),
		})
	}

	fn publish_stage_entry(&self, asset: &Asset, stage_id: &str, origin: ChangeOrigin) {
		for (property, commit) in asset.enter_stage(stage_id) {
			self.inner.bus.publish(ScenarioEvent::PropertyChanged {
				asset_id: asset.id().to_string(),
				property,
				field: commit.field,
				value: commit.value,
				origin,
			});
		}
	}

	/// Content stays hidden for a moment after load so late-joining
	/// presentation catches up; unloading cancels the reveal.
	fn schedule_reveal(&self, scope: CancellationToken) {
		let provider = Arc::clone(&self.inner.provider);

		if self.inner.flags.is_enabled(features::INSTANT_REVEAL) {
			tokio::spawn(async move {
				if let Err(err) = provider.set_all_visible(true).await {
					warn!("reveal failed: {err}");
				}
			});
			return;
		}

		let delay = self.inner.config.reveal_delay();
		tokio::spawn(async move {
			tokio::select! {
				biased;
				_ = scope.cancelled() => {}
				_ = tokio::time::sleep(delay) => {
					if let Err(err) = provider.set_all_visible(true).await {
						warn!("deferred reveal failed: {err}");
					}
				}
			}
		});
	}

	/// Start or resume playing. No-op (`false`) when already playing.
	pub async fn play(&self) -> bool {
		let switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return false,
		};

		let current = self.status();
		if current == ScenarioStatus::Playing || !current.can_transition_to(ScenarioStatus::Playing) {
			return false;
		}

		self.inner.bus.publish(ScenarioEvent::PlayStarting);

		if let Err(err) = self.inner.provider.set_interactive(true).await {
			warn!("could not enable interactivity: {err}");
		}

		self.set_status(ScenarioStatus::Playing);
		*lock_std(&self.inner.play_cancel) = Some(CancellationToken::new());

		{
			let mut session = self.inner.session.lock().await;
			if let Some(s) = session.as_mut() {
				s.sequencer.start_clock();
				s.timer.start_play();
			}
		}

		self.inner.bus.publish(ScenarioEvent::PlayStarted);

		// listeners reacting from here on are making live edits, not bootstrapping
		drop(switching);
		self.inner.bus.publish(ScenarioEvent::PlaySettled);

		info!("scenario playing");
		true
	}

	/// Pause a playing scenario. No-op (`false`) when already paused.
	pub async fn pause(&self) -> bool {
		let _switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return false,
		};

		let current = self.status();
		if current == ScenarioStatus::Paused || !current.can_transition_to(ScenarioStatus::Paused) {
			return false;
		}

		if let Err(err) = self.inner.provider.set_interactive(false).await {
			warn!("could not disable interactivity: {err}");
		}

		self.set_status(ScenarioStatus::Paused);

		{
			let mut session = self.inner.session.lock().await;
			if let Some(s) = session.as_mut() {
				s.sequencer.stop_clock();
				s.timer.pause_play();
			}
		}

		self.inner.bus.publish(ScenarioEvent::ScenarioPaused);

		info!("scenario paused");
		true
	}

	/// End the play session and revert to the last saved snapshot.
	pub async fn stop(&self) -> bool {
		let _switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return false,
		};

		let current = self.status();
		if current == ScenarioStatus::Stopped || !current.can_transition_to(ScenarioStatus::Stopped) {
			return false;
		}

		// the play scope dies before any reset work, so automation started
		// during the session cannot mutate state mid-reset
		if let Some(token) = lock_std(&self.inner.play_cancel).take() {
			token.cancel();
		}

		// a save that slipped in after the guard was taken finishes first
		while self.inner.is_saving.load(Ordering::Acquire) {
			tokio::time::sleep(Duration::from_millis(10)).await;
		}

		self.reset_session().await;
		self.set_status(ScenarioStatus::Stopped);
		self.inner.bus.publish(ScenarioEvent::ScenarioStopped);

		info!("scenario stopped");
		true
	}

	/// Revert stages, assets, and properties to the last saved snapshot
	/// without changing status.
	pub async fn reset(&self) -> bool {
		let _switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return false,
		};

		if !self.status().is_loaded() {
			return false;
		}

		self.reset_session().await;
		self.inner.bus.publish(ScenarioEvent::ScenarioReset);

		info!("scenario reset to last saved state");
		true
	}

	async fn reset_session(&self) {
		if let Err(err) = self.inner.provider.set_interactive(false).await {
			warn!("could not disable interactivity: {err}");
		}

		let mut session = self.inner.session.lock().await;
		let Some(s) = session.as_mut() else { return };

		let saved = s.saved.clone();
		if let Err(err) = self.inner.provider.destroy_all().await {
			warn!("teardown before reset failed: {err}");
		}

		let sequencer = StageSequencer::from_stages(saved.stages.clone());
		let mut assets = Vec::with_capacity(saved.assets.len());
		for state in &saved.assets {
			if let Err(err) = self.inner.provider.instantiate(state).await {
				warn!("reinstantiation of asset {} failed: {err}", state.id);
				continue;
			}
			match Asset::from_state(state) {
				Ok(asset) => assets.push(asset),
				Err(err) => warn!("asset {} state is no longer loadable: {err}", state.id),
			}
		}

		if let Some(stage_id) = sequencer.current_stage_id() {
			for asset in &assets {
				self.publish_stage_entry(asset, &stage_id, ChangeOrigin::Initialization);
			}
		}

		s.assets = assets;
		s.sequencer = sequencer;
		s.timer.reset();

		// a mid-play reset keeps playing from the top of the reloaded state
		if self.status() == ScenarioStatus::Playing {
			s.sequencer.start_clock();
			s.timer.start_play();
		}
	}

	/// Tear the scenario down completely. `false` when nothing is loaded
	/// or the session has not been stopped.
	pub async fn unload(&self) -> bool {
		let _switching = match self.begin_switch() {
			Some(guard) => guard,
			None => return false,
		};

		if !self.status().can_transition_to(ScenarioStatus::Unloading) {
			debug!("unload rejected from {:?}", self.status());
			return false;
		}

		self.set_status(ScenarioStatus::Unloading);

		if let Err(err) = self.inner.provider.destroy_all().await {
			warn!("asset teardown failed during unload: {err}");
		}

		let taken = self.inner.session.lock().await.take();
		if let Some(s) = taken {
			if let Err(err) = self.inner.provider.release_asset_types(&s.asset_types).await {
				warn!("asset type release failed during unload: {err}");
			}
		}

		if let Some(token) = lock_std(&self.inner.load_cancel).take() {
			token.cancel();
		}
		*lock_std(&self.inner.sync_watermark) = None;

		self.set_status(ScenarioStatus::Unloaded);
		self.inner.bus.publish(ScenarioEvent::ScenarioUnloaded);

		info!("scenario unloaded");
		true
	}

	/// Serialize the live state into the loadable aggregate shape and make
	/// it the new reset target. `None` when nothing is loaded or a
	/// transition is in flight.
	pub async fn save(&self) -> Option<Scenario> {
		if self.inner.is_switching.load(Ordering::Acquire) {
			return None;
		}
		if self.inner.is_saving.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_err() {
			return None;
		}

		let result = {
			let mut session = self.inner.session.lock().await;
			session.as_mut().map(|s| {
				let snapshot = snapshot_scenario(s);
				s.saved = snapshot.clone();
				snapshot
			})
		};

		self.inner.is_saving.store(false, Ordering::Release);
		result
	}

	/// Serialize the live state without touching the reset target
	pub async fn export(&self) -> Option<Scenario> {
		let session = self.inner.session.lock().await;
		session.as_ref().map(snapshot_scenario)
	}

	/// Switch the current stage by id
	pub async fn switch_stage(&self, stage_id: &str) -> bool {
		let mut session = self.inner.session.lock().await;
		let Some(s) = session.as_mut() else { return false };
		let Some(switch) = s.sequencer.switch_to(stage_id) else { return false };
		self.finish_stage_switch(s, &switch);
		true
	}

	pub async fn next_stage(&self) -> bool {
		let mut session = self.inner.session.lock().await;
		let Some(s) = session.as_mut() else { return false };
		let Some(switch) = s.sequencer.advance() else { return false };
		self.finish_stage_switch(s, &switch);
		true
	}

	pub async fn previous_stage(&self) -> bool {
		let mut session = self.inner.session.lock().await;
		let Some(s) = session.as_mut() else { return false };
		let Some(switch) = s.sequencer.retreat() else { return false };
		self.finish_stage_switch(s, &switch);
		true
	}

	fn finish_stage_switch(&self, s: &mut LoadedSession, switch: &StageSwitch) {
		s.timer.fold_stage_time(switch.elapsed_in_previous);

		// notify strictly after the pointer has moved
		self.inner.bus.publish(ScenarioEvent::StageSwitched {
			from: switch.from.clone(),
			to: switch.to.clone(),
			elapsed_in_previous: switch.elapsed_in_previous,
		});

		for asset in &s.assets {
			self.publish_stage_entry(asset, &switch.to, ChangeOrigin::StageChange);
		}

		debug!("stage switched: {:?} -> {}", switch.from, switch.to);
	}

	/// Reorder stages along one of the scenario's authored pathways
	pub async fn apply_pathway(&self, pathway_id: &str) -> bool {
		let mut session = self.inner.session.lock().await;
		let Some(s) = session.as_mut() else { return false };
		let Some(order) = s.pathways.iter().find(|p| p.id == pathway_id).map(|p| p.stage_order.clone()) else {
			return false;
		};
		s.sequencer.reorder(&order)
	}

	pub async fn current_stage_id(&self) -> Option<String> {
		let session = self.inner.session.lock().await;
		session.as_ref().and_then(|s| s.sequencer.current_stage_id())
	}

	/// Validate and commit a property write, then notify
	pub async fn set_property(&self, asset_id: &str, property: &str, value: PropertyValue, origin: ChangeOrigin) -> Result<()> {
		let session = self.inner.session.lock().await;
		let s = session.as_ref().ok_or(ScenarioError::NotLoaded)?;
		let asset = s.assets.iter().find(|a| a.id() == asset_id).ok_or_else(|| ScenarioError::AssetNotFound(asset_id.to_string()))?;

		let commit = asset.set_property(property, value, origin)?;

		self.inner.bus.publish(ScenarioEvent::PropertyChanged {
			asset_id: asset_id.to_string(),
			property: property.to_string(),
			field: commit.field,
			value: commit.value,
			origin,
		});
		Ok(())
	}

	/// Resolved value of a property for the current stage
	pub async fn property_value(&self, asset_id: &str, property: &str) -> Result<PropertyValue> {
		let session = self.inner.session.lock().await;
		let s = session.as_ref().ok_or(ScenarioError::NotLoaded)?;
		let asset = s.assets.iter().find(|a| a.id() == asset_id).ok_or_else(|| ScenarioError::AssetNotFound(asset_id.to_string()))?;
		let definition = asset.property(property).ok_or_else(|| sim_props::PropertyError::UnknownProperty(property.to_string()))?;
		Ok(definition.value())
	}

	/// Resolved value of a property for a specific stage
	pub async fn property_value_in(&self, asset_id: &str, property: &str, stage_id: &str) -> Result<PropertyValue> {
		let session = self.inner.session.lock().await;
		let s = session.as_ref().ok_or(ScenarioError::NotLoaded)?;
		let asset = s.assets.iter().find(|a| a.id() == asset_id).ok_or_else(|| ScenarioError::AssetNotFound(asset_id.to_string()))?;
		let definition = asset.property(property).ok_or_else(|| sim_props::PropertyError::UnknownProperty(property.to_string()))?;
		Ok(definition.value_in(stage_id))
	}

	/// Bring a new asset to life mid-session. It is marked runtime-only:
	/// saves skip it and a reload will not bring it back.
	pub async fn spawn_runtime_asset(&self, mut state: AssetState) -> Result<String> {
		let mut session = self.inner.session.lock().await;
		let s = session.as_mut().ok_or(ScenarioError::NotLoaded)?;

		if state.id.is_empty() {
			state.id = Uuid::new_v4().to_string();
		}
		state.runtime_only = true;
		warn!("asset {} instantiated outside the load window; it will not survive a reload", state.id);

		self.inner.provider.instantiate(&state).await?;
		let asset = Asset::from_state(&state)?;

		if let Some(stage_id) = s.sequencer.current_stage_id() {
			self.publish_stage_entry(&asset, &stage_id, ChangeOrigin::Initialization);
		}

		let id = state.id.clone();
		s.assets.push(asset);
		Ok(id)
	}

	/// Build the sync snapshot the host broadcasts
	pub async fn snapshot(&self, timestamp: TimeMs) -> Option<SyncSnapshot> {
		let session = self.inner.session.lock().await;
		let s = session.as_ref()?;
		let stage_elapsed = s.sequencer.elapsed_in_current();

		Some(SyncSnapshot {
			timestamp,
			status: self.status(),
			total_ms_in_simulation: s.timer.total_ms_in_simulation(stage_elapsed),
			total_ms_in_scenario: s.timer.total_ms_in_scenario(),
			total_ms_in_current_stage: stage_elapsed,
		})
	}

	/// Accept a snapshot timestamp if it is strictly newer than the last
	/// one applied
	pub(crate) fn adopt_watermark(&self, timestamp: TimeMs) -> bool {
		let mut watermark = lock_std(&self.inner.sync_watermark);
		match *watermark {
			Some(last) if timestamp <= last => false,
			_ => {
				*watermark = Some(timestamp);
				true
			}
		}
	}

	/// Push the host's clock totals (already latency-adjusted) into the
	/// local timer and sequencer
	pub(crate) async fn apply_sync_offsets(&self, snapshot: &SyncSnapshot, latency: TimeMs) {
		let mut session = self.inner.session.lock().await;
		if let Some(s) = session.as_mut() {
			let stage_elapsed = snapshot.total_ms_in_current_stage + latency;
			s.timer.set_scenario_total(snapshot.total_ms_in_scenario + latency);
			s.timer.set_simulation_total(snapshot.total_ms_in_simulation + latency, stage_elapsed);
			s.sequencer.set_elapsed(stage_elapsed);
		}
	}
}

fn snapshot_scenario(session: &LoadedSession) -> Scenario {
	Scenario {
		stages: session.sequencer.stages().to_vec(),
		assets: session.assets.iter().filter(|a| !a.runtime_only()).map(Asset::to_state).collect(),
		pathways: session.pathways.clone(),
		asset_types: session.asset_types.clone(),
	}
}
