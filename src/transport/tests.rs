use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::message::EventFrame;
use super::session::{SessionRegistry, TransportSession};
use crate::messages::SimulationSynchronizationEvent;

fn new_session(
    id: &str,
    registry: &Arc<SessionRegistry>,
) -> (Arc<TransportSession>, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = TransportSession::new(id.to_string(), tx, registry.clone());
    (session, rx)
}

fn decode_frame(message: WsMessage) -> EventFrame {
    match message {
        WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[test]
fn test_dispatch_reaches_every_listener() {
    let registry = Arc::new(SessionRegistry::default());
    let (session, _rx) = new_session("session-1", &registry);

    let mut first = session.listen(SimulationSynchronizationEvent::SimulationOutput);
    let mut second = session.listen(SimulationSynchronizationEvent::SimulationOutput);
    let mut other = session.listen(SimulationSynchronizationEvent::SimulationControl);

    session.dispatch(
        SimulationSynchronizationEvent::SimulationOutput,
        json!({"value": 1}),
    );

    assert_eq!(first.try_recv().unwrap(), json!({"value": 1}));
    assert_eq!(second.try_recv().unwrap(), json!({"value": 1}));
    assert!(other.try_recv().is_err());
}

#[test]
fn test_send_enqueues_a_tagged_frame() {
    let registry = Arc::new(SessionRegistry::default());
    let (session, mut rx) = new_session("session-1", &registry);

    session.send(
        SimulationSynchronizationEvent::SimulationStatus,
        Some(json!({"status": "RUNNING", "simulationId": "sim-1"})),
    );

    let frame = decode_frame(rx.try_recv().unwrap());
    assert_eq!(frame.event, SimulationSynchronizationEvent::SimulationStatus);
    assert_eq!(frame.payload.unwrap()["simulationId"], json!("sim-1"));
}

#[test]
fn test_broadcast_skips_the_sending_session() {
    let registry = Arc::new(SessionRegistry::default());
    let (sender, mut sender_rx) = new_session("session-1", &registry);
    let (_other, mut other_rx) = new_session("session-2", &registry);

    sender.broadcast(
        SimulationSynchronizationEvent::SimulationControl,
        Some(json!("resume")),
    );

    let frame = decode_frame(other_rx.try_recv().unwrap());
    assert_eq!(frame.event, SimulationSynchronizationEvent::SimulationControl);
    assert!(sender_rx.try_recv().is_err());
}

#[test]
fn test_disconnect_completes_listeners_and_leaves_the_registry() {
    let registry = Arc::new(SessionRegistry::default());
    let (session, _rx) = new_session("session-1", &registry);
    let mut listener = session.listen(SimulationSynchronizationEvent::SimulationOutput);
    assert_eq!(registry.len(), 1);

    session.disconnect();

    assert!(session.is_disconnected());
    assert!(registry.is_empty());
    // completed: no value, no error
    assert!(listener.blocking_recv().is_none());
    // dispatch and send after disconnect are no-ops
    session.dispatch(SimulationSynchronizationEvent::SimulationOutput, Value::Null);
    session.send(SimulationSynchronizationEvent::SimulationOutput, None);
}

#[test]
fn test_listen_after_disconnect_is_already_completed() {
    let registry = Arc::new(SessionRegistry::default());
    let (session, _rx) = new_session("session-1", &registry);
    session.disconnect();

    let mut listener = session.listen(SimulationSynchronizationEvent::SimulationOutput);
    assert!(listener.blocking_recv().is_none());
}

#[tokio::test]
async fn test_on_disconnected_fires_exactly_once() {
    let registry = Arc::new(SessionRegistry::default());
    let (session, _rx) = new_session("session-1", &registry);

    let waiting = session.clone();
    let waiter = tokio::spawn(async move {
        waiting.on_disconnected().await;
    });

    session.disconnect();
    // a second disconnect has no further effect
    session.disconnect();

    waiter.await.unwrap();
    // resolves immediately once already disconnected
    session.on_disconnected().await;
}
