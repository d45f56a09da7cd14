use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tungstenite::protocol::Message as WsMessage;

use super::ChannelRegistry;
use crate::messages::SimulationSynchronizationEvent;
use crate::participant::SimulationParticipant;
use crate::transport::{SessionRegistry, TransportSession};

fn connect(
    id: &str,
    sessions: &Arc<SessionRegistry>,
    channels: &Arc<ChannelRegistry>,
) -> (Arc<SimulationParticipant>, UnboundedReceiver<WsMessage>) {
    let (tx, outbound) = tokio::sync::mpsc::unbounded_channel();
    let session = TransportSession::new(id.to_string(), tx, sessions.clone());
    let participant = SimulationParticipant::new(session, channels.clone());
    (participant, outbound)
}

#[tokio::test]
async fn test_add_member_is_idempotent() {
    let sessions = Arc::new(SessionRegistry::default());
    let channels = Arc::new(ChannelRegistry::default());
    let (participant, _outbound) = connect("session-1", &sessions, &channels);

    let channel = channels.get_or_create("sim-1");
    channel.add_member(participant.clone());
    channel.add_member(participant.clone());

    assert_eq!(channel.member_count(), 1);
    assert_eq!(participant.current_channel().as_deref(), Some("sim-1"));
}

#[tokio::test]
async fn test_remove_member_ignores_non_members() {
    let channels = Arc::new(ChannelRegistry::default());
    let channel = channels.get_or_create("sim-1");

    channel.remove_member("nobody");
    assert!(channel.is_empty());
}

#[tokio::test]
async fn test_broadcast_reaches_the_member_set_at_call_time() {
    let sessions = Arc::new(SessionRegistry::default());
    let channels = Arc::new(ChannelRegistry::default());
    let (early, mut early_outbound) = connect("session-1", &sessions, &channels);
    let (late, mut late_outbound) = connect("session-2", &sessions, &channels);

    let channel = channels.get_or_create("sim-1");
    channel.add_member(early);
    channel.broadcast_to_members(
        SimulationSynchronizationEvent::SimulationOutput,
        Some(json!({"measurements": []})),
    );
    channel.add_member(late);

    assert!(early_outbound.try_recv().is_ok());
    // joined after the broadcast, receives nothing
    assert!(late_outbound.try_recv().is_err());
}

#[tokio::test]
async fn test_concurrent_joins_share_one_channel() {
    let sessions = Arc::new(SessionRegistry::default());
    let channels = Arc::new(ChannelRegistry::default());
    let (first, _a) = connect("session-1", &sessions, &channels);
    let (second, _b) = connect("session-2", &sessions, &channels);

    let registry_a = channels.clone();
    let join_a = tokio::spawn(async move { registry_a.get_or_create("sim-1") });
    let registry_b = channels.clone();
    let join_b = tokio::spawn(async move { registry_b.get_or_create("sim-1") });

    let channel_a = join_a.await.unwrap();
    let channel_b = join_b.await.unwrap();
    assert!(Arc::ptr_eq(&channel_a, &channel_b));

    channel_a.add_member(first);
    channel_b.add_member(second);
    assert_eq!(channels.len(), 1);
    assert_eq!(channel_a.member_count(), 2);
}

#[tokio::test]
async fn test_registry_reclaims_an_emptied_channel() {
    let sessions = Arc::new(SessionRegistry::default());
    let channels = Arc::new(ChannelRegistry::default());
    let (participant, mut outbound) = connect("session-1", &sessions, &channels);
    let participant_id = participant.id().to_string();

    let channel = channels.get_or_create("sim-1");
    channel.add_member(participant);
    channel.broadcast_to_members(
        SimulationSynchronizationEvent::SimulationStatus,
        Some(json!({"status": "STOPPED", "simulationId": "sim-1"})),
    );

    channels.remove_member("sim-1", &participant_id);
    assert!(channels.get("sim-1").is_none());

    // reclamation does not drop the delivery enqueued before removal
    assert!(outbound.try_recv().is_ok());
}
