use crate::agent::{Agent, AgentError, TurnEvent, TurnOutcome};
use crate::model::ModelProvider;
use crate::tooling::{ToolRegistry, ToolSession};
use crate::types::Transcript;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use axum::routing::post;
use axum::{Json, Router};
use futures::stream::Stream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const STUCK_REPLY: &str = "I got stuck in a loop sorry!";
const ERROR_REPLY: &str =
    "I encountered an error while processing your request. Check the logs for details.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Process-wide conversation state. The transcript mutex serializes
/// concurrent chat requests: one writer at a time, appends never
/// interleave.
pub struct SessionState<P: ModelProvider> {
    agent: Agent<P>,
    session: Arc<dyn ToolSession>,
    transcript: Mutex<Transcript>,
}

impl<P: ModelProvider> SessionState<P> {
    pub fn new(agent: Agent<P>, session: Arc<dyn ToolSession>, transcript: Transcript) -> Self {
        Self {
            agent,
            session,
            transcript: Mutex::new(transcript),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    message: String,
}

/// One frame of the `/chat` event stream: progress or the single
/// terminal reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
enum ChatFrame {
    Status { status: String },
    Reply { reply: String },
}

pub async fn serve<P>(state: Arc<SessionState<P>>, addr: SocketAddr) -> Result<(), ServerError>
where
    P: ModelProvider + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/chat", post(chat_handler::<P>))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "Chat server ready to accept connections");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "Failed to listen for shutdown signal");
    }
}

async fn chat_handler<P: ModelProvider + 'static>(
    State(state): State<Arc<SessionState<P>>>,
    Json(body): Json<ChatBody>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Received /chat request");

    let (frames, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        run_request(state, body.message, &frames, request_id).await;
    });

    let stream = UnboundedReceiverStream::new(rx).map(|frame| {
        let event = Event::default()
            .json_data(&frame)
            .unwrap_or_else(|_| Event::default().data("{}"));
        Ok::<_, Infallible>(event)
    });
    Sse::new(stream)
}

async fn run_request<P: ModelProvider>(
    state: Arc<SessionState<P>>,
    message: String,
    frames: &mpsc::UnboundedSender<ChatFrame>,
    request_id: Uuid,
) {
    // Exactly one reply frame per request, whatever happens below.
    let reply = match answer_request(&state, message, frames).await {
        Ok(TurnOutcome::Answered(answer)) => answer,
        Ok(TurnOutcome::Exhausted) => {
            warn!(%request_id, "Agent ran out of iterations");
            STUCK_REPLY.to_string()
        }
        Err(err) => {
            error!(%request_id, %err, "Chat request failed");
            send_frame(
                frames,
                ChatFrame::Status {
                    status: format!("Error: {}", err.user_message()),
                },
            );
            ERROR_REPLY.to_string()
        }
    };
    send_frame(frames, ChatFrame::Reply { reply });
    info!(%request_id, "Chat request finished");
}

async fn answer_request<P: ModelProvider>(
    state: &SessionState<P>,
    message: String,
    frames: &mpsc::UnboundedSender<ChatFrame>,
) -> Result<TurnOutcome, AgentError> {
    // Holding the lock for the whole turn keeps the shared transcript
    // single-writer across concurrent requests.
    let mut transcript = state.transcript.lock().await;

    let registry = ToolRegistry::snapshot(state.session.as_ref())
        .await
        .map_err(AgentError::Registry)?;

    state
        .agent
        .run_turn(&mut transcript, &registry, message, |event| {
            let status = match event {
                TurnEvent::Thinking => "Thinking...".to_string(),
                TurnEvent::CallingTool { name } => format!("Calling tool: {name}..."),
            };
            send_frame(frames, ChatFrame::Status { status });
        })
        .await
}

fn send_frame(frames: &mpsc::UnboundedSender<ChatFrame>, frame: ChatFrame) {
    // A closed receiver just means the client went away mid-stream.
    if frames.send(frame).is_err() {
        debug!("Client disconnected before the stream finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_frame_serializes_to_status_key() {
        let frame = ChatFrame::Status {
            status: "Thinking...".into(),
        };
        assert_eq!(
            serde_json::to_string(&frame).expect("serialize"),
            r#"{"status":"Thinking..."}"#
        );
    }

    #[test]
    fn reply_frame_serializes_to_reply_key() {
        let frame = ChatFrame::Reply {
            reply: "It's sunny.".into(),
        };
        assert_eq!(
            serde_json::to_string(&frame).expect("serialize"),
            r#"{"reply":"It's sunny."}"#
        );
    }
}
