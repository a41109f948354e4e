mod common;

use common::{fresh_runtime, two_stage_scenario};
use sim_events::{ScenarioStatus, SyncSnapshot};
use sim_scenario::SyncReconciler;

fn playing_snapshot(timestamp: i64) -> SyncSnapshot {
	SyncSnapshot {
		timestamp,
		status: ScenarioStatus::Playing,
		total_ms_in_simulation: 5000,
		total_ms_in_scenario: 4000,
		total_ms_in_current_stage: 2000,
	}
}

#[tokio::test]
async fn test_snapshot_replays_host_status() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(100, playing_snapshot(100)).await;

	assert_eq!(runtime.status(), ScenarioStatus::Playing);
	assert_eq!(runtime.last_sync_timestamp(), Some(100));
}

#[tokio::test]
async fn test_stale_snapshot_dropped() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(100, playing_snapshot(100)).await;

	let mut stale = playing_snapshot(50);
	stale.status = ScenarioStatus::Paused;
	reconciler.try_sync(150, stale).await;

	// out-of-order delivery has no effect whatsoever
	assert_eq!(runtime.status(), ScenarioStatus::Playing);
	assert_eq!(runtime.last_sync_timestamp(), Some(100));
}

#[tokio::test]
async fn test_duplicate_snapshot_dropped() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(100, playing_snapshot(100)).await;
	reconciler.try_sync(300, playing_snapshot(100)).await;

	assert_eq!(runtime.last_sync_timestamp(), Some(100));
}

#[tokio::test]
async fn test_watermark_is_nondecreasing() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	for (arrival, stamp) in [(10, 10), (40, 30), (50, 20), (60, 45)] {
		reconciler.try_sync(arrival, playing_snapshot(stamp)).await;
	}

	assert_eq!(runtime.last_sync_timestamp(), Some(45));
}

#[tokio::test(start_paused = true)]
async fn test_latency_compensation_while_playing() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	// snapshot stamped 1000, observed at local time 1250: 250ms in flight
	reconciler.try_sync(1250, playing_snapshot(1000)).await;

	let observed = runtime.snapshot(0).await.unwrap();
	assert_eq!(observed.total_ms_in_scenario, 4250);
	assert_eq!(observed.total_ms_in_current_stage, 2250);
	assert_eq!(observed.total_ms_in_simulation, 5250);
}

#[tokio::test(start_paused = true)]
async fn test_no_compensation_when_not_advancing() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(100, playing_snapshot(100)).await;

	let mut paused = playing_snapshot(200);
	paused.status = ScenarioStatus::Paused;
	// arrives 900ms late, but a paused clock needs no compensation
	reconciler.try_sync(1100, paused).await;

	assert_eq!(runtime.status(), ScenarioStatus::Paused);
	let observed = runtime.snapshot(0).await.unwrap();
	assert_eq!(observed.total_ms_in_scenario, 4000);
	assert_eq!(observed.total_ms_in_current_stage, 2000);
}

#[tokio::test]
async fn test_stop_replayed() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(100, playing_snapshot(100)).await;

	let mut stopped = playing_snapshot(200);
	stopped.status = ScenarioStatus::Stopped;
	reconciler.try_sync(200, stopped).await;

	assert_eq!(runtime.status(), ScenarioStatus::Stopped);
}

#[tokio::test]
async fn test_load_statuses_not_remotely_triggerable() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());

	let mut unloaded = playing_snapshot(100);
	unloaded.status = ScenarioStatus::Unloaded;
	reconciler.try_sync(100, unloaded).await;

	// the watermark advances, the lifecycle does not follow
	assert_eq!(runtime.status(), ScenarioStatus::Loaded);
	assert_eq!(runtime.last_sync_timestamp(), Some(100));
	assert!(runtime.is_loaded().await);
}

#[tokio::test]
async fn test_unload_clears_watermark() {
	let (runtime, _provider) = fresh_runtime();
	runtime.load(two_stage_scenario()).await.unwrap();

	let reconciler = SyncReconciler::new(runtime.clone());
	reconciler.try_sync(500, playing_snapshot(500)).await;
	assert_eq!(runtime.last_sync_timestamp(), Some(500));

	runtime.stop().await;
	runtime.unload().await;
	assert_eq!(runtime.last_sync_timestamp(), None);

	// a fresh session accepts earlier timestamps again
	runtime.load(two_stage_scenario()).await.unwrap();
	reconciler.try_sync(10, playing_snapshot(10)).await;
	assert_eq!(runtime.last_sync_timestamp(), Some(10));
}
