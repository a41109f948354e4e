//! Scenario lifecycle and synchronization runtime.
//!
//! A scenario is an ordered set of stages plus the assets that live through
//! them. This crate owns the lifecycle state machine
//! (load/play/pause/stop/reset/unload), the stage sequencer and session
//! clocks, the timestamp-ordered sync reconciler that keeps remote
//! participants in line with the host, and the host/participant session
//! loops that move snapshots and live edits over a [`sim_transport::Transport`].

pub mod config;
pub mod error;
pub mod flags;
pub mod model;
pub mod provider;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod sync;
pub mod timer;

pub use config::SessionConfig;
pub use error::{Result, ScenarioError};
pub use flags::{features, FeatureFlags, NoFlags, StaticFlags};
pub use model::{Asset, AssetState, Pathway, Scenario, Stage};
pub use provider::{AssetProvider, NullProvider};
pub use runtime::ScenarioRuntime;
pub use sequencer::{StageSequencer, StageSwitch};
pub use session::{now_ms, HostSession, ParticipantSession};
pub use sync::SyncReconciler;
pub use timer::ScenarioTimer;
