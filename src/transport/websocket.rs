use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tracing::{info, warn};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::control::SimulationControlService;
use crate::transport::message::EventFrame;
use crate::transport::session::{SessionRegistry, TransportSession};
use crate::utils::GridError;

/// Accept client connections and attach each one to the coordination
/// layer as a participant.
pub async fn start_websocket_server(
    addr: &str,
    service: Arc<SimulationControlService>,
) -> Result<(), GridError> {
    let listener = TcpListener::bind(addr).await?;
    let registry = Arc::new(SessionRegistry::default());

    info!("websocket server listening on ws://{addr}");

    while let Ok((stream, _)) = listener.accept().await {
        let service = service.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            handle_connection(stream, service, registry).await;
        });
    }
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    service: Arc<SimulationControlService>,
    registry: Arc<SessionRegistry>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("websocket handshake error: {e}");
            return;
        }
    };

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let session_id = format!("session-{}", Uuid::new_v4());
    let session = TransportSession::new(session_id.clone(), tx, registry);

    // the participant lives for the duration of the connection; its
    // teardown is driven by the session's disconnect signal
    let _participant = service.attach_participant(session.clone());

    // coordination → client send loop
    let writer_session_id = session_id.clone();
    tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Err(e) = ws_sender.send(message).await {
                warn!("send loop closed for {writer_session_id}: {e}");
                break;
            }
        }
    });

    // client → coordination read loop
    while let Some(Ok(message)) = ws_receiver.next().await {
        if message.is_text() {
            if let Ok(text) = message.to_text() {
                match serde_json::from_str::<EventFrame>(text) {
                    Ok(frame) => {
                        session.dispatch(frame.event, frame.payload.unwrap_or(Value::Null));
                    }
                    Err(e) => warn!("invalid frame from {session_id}: {e}"),
                }
            }
        }
    }

    info!("{session_id} disconnected");
    session.disconnect();
}
