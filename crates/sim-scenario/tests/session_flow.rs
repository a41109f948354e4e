mod common;

use common::{two_stage_scenario, RecordingProvider};
use sim_events::{ChangeOrigin, PropertyValue, ScenarioEvent, ScenarioStatus, WireEvent};
use sim_scenario::{HostSession, ParticipantSession, ScenarioRuntime, SessionConfig};
use sim_transport::InMemTransport;
use std::sync::Arc;
use std::time::Duration;

fn session_runtime() -> ScenarioRuntime {
	ScenarioRuntime::new(Arc::new(RecordingProvider::default()), SessionConfig::default().with_sync_interval(20))
}

async fn wait_for_status(runtime: &ScenarioRuntime, expected: ScenarioStatus) {
	let mut status_rx = runtime.subscribe_status();
	tokio::time::timeout(Duration::from_secs(5), async {
		while *status_rx.borrow() != expected {
			status_rx.changed().await.unwrap();
		}
	})
	.await
	.unwrap_or_else(|_| panic!("runtime never reached {expected:?}"));
}

#[tokio::test]
async fn test_host_drives_participant_status() {
	let transport = InMemTransport::<WireEvent>::new(64);

	let host_runtime = session_runtime();
	host_runtime.load(two_stage_scenario()).await.unwrap();
	let participant_runtime = session_runtime();
	participant_runtime.load(two_stage_scenario()).await.unwrap();

	let host = HostSession::new(host_runtime.clone(), transport.clone());
	let host_cancel = host.cancellation();
	let participant = ParticipantSession::new(participant_runtime.clone(), transport.clone());
	let participant_cancel = participant.cancellation();

	let host_task = tokio::spawn(host.run());
	let participant_task = tokio::spawn(participant.run());

	host_runtime.play().await;
	wait_for_status(&participant_runtime, ScenarioStatus::Playing).await;

	host_runtime.pause().await;
	wait_for_status(&participant_runtime, ScenarioStatus::Paused).await;

	host_cancel.cancel();
	participant_cancel.cancel();
	host_task.await.unwrap();
	participant_task.await.unwrap();
}

#[tokio::test]
async fn test_live_edit_reaches_participant_without_echo() {
	let transport = InMemTransport::<WireEvent>::new(64);

	let host_runtime = session_runtime();
	host_runtime.load(two_stage_scenario()).await.unwrap();
	let participant_runtime = session_runtime();
	participant_runtime.load(two_stage_scenario()).await.unwrap();

	let host = HostSession::new(host_runtime.clone(), transport.clone());
	let host_cancel = host.cancellation();
	let participant = ParticipantSession::new(participant_runtime.clone(), transport.clone());
	let participant_cancel = participant.cancellation();

	let host_task = tokio::spawn(host.run());
	let participant_task = tokio::spawn(participant.run());

	host_runtime.play().await;
	wait_for_status(&participant_runtime, ScenarioStatus::Playing).await;

	let mut participant_events = participant_runtime.bus().subscribe();
	host_runtime.set_property("patient", "vital", PropertyValue::Int(180), ChangeOrigin::ValueSet).await.unwrap();

	// the edit arrives, applied through the rule layer rather than as a live edit
	let received = tokio::time::timeout(Duration::from_secs(5), async {
		loop {
			if let ScenarioEvent::PropertyChanged { property, value, origin, .. } = participant_events.recv().await.unwrap() {
				if property == "vital" && origin == ChangeOrigin::RuleSet {
					break value;
				}
			}
		}
	})
	.await
	.expect("participant never saw the edit");

	assert_eq!(received, PropertyValue::Int(180));
	assert_eq!(participant_runtime.property_value("patient", "vital").await.unwrap(), PropertyValue::Int(180));

	host_cancel.cancel();
	participant_cancel.cancel();
	host_task.await.unwrap();
	participant_task.await.unwrap();
}
