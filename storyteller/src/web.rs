use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt, future};
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

use crate::multiplexer::{Frame, Multiplexer};
use crate::pipeline::{StorySession, Storyteller};
use crate::request::{RequestDefaults, StoryRequest};

/// State shared across HTTP handlers and WebSocket tasks.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no generation credentials are configured.
    pub storyteller: Option<Arc<Storyteller>>,
    pub defaults: Arc<RequestDefaults>,
    pub static_dir: Option<PathBuf>,
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("websocket upgrade initiated");
    ws.on_upgrade(move |socket| async move { handle_socket(socket, state).await })
}

fn ws_message(frame: Frame) -> WsMessage {
    match frame {
        Frame::Text(text) => WsMessage::Text(text.into()),
        Frame::Binary(bytes) => WsMessage::Binary(bytes.into()),
    }
}

/// Serve requests on one connection, one story at a time.
async fn handle_socket(socket: WebSocket, state: AppState) {
    info!("websocket connected");
    let (sender, mut receiver) = socket.split();
    let mux = Multiplexer::from_sink(
        sender.with(|frame: Frame| future::ready(Ok::<_, axum::Error>(ws_message(frame)))),
    );
    let mut session = state
        .storyteller
        .clone()
        .map(|storyteller| StorySession::new(storyteller, mux));
    while let Some(msg) = receiver.next().await {
        let payload = match msg {
            Ok(WsMessage::Text(text)) => text.as_str().as_bytes().to_vec(),
            Ok(WsMessage::Binary(bytes)) => bytes.to_vec(),
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                error!(error = %e, "websocket read failed");
                break;
            }
        };
        let request = StoryRequest::parse(&payload, &state.defaults);
        info!(topic = %request.topic, "story requested");
        let Some(session) = session.as_mut() else {
            warn!("story generation disabled; set GEMINI_API_KEY");
            continue;
        };
        if let Err(e) = session.tell(request).await {
            error!(error = %e, "story failed");
            if e.is_transport() {
                break;
            }
        }
    }
    info!("websocket disconnected");
}

/// Build the application router with the provided state.
pub fn app(state: AppState) -> Router {
    let router = Router::new().route("/ws", get(ws_handler));
    let router = match &state.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.with_state(state)
}
